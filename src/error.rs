//! Error types for the ocrstamp library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`OcrStampError`] — **Fatal**: the run cannot proceed at all (input
//!   folder missing, output folder cannot be created, invalid configuration,
//!   single-image mode failures). Returned as `Err(OcrStampError)` from the
//!   top-level entry points.
//!
//! * [`FileError`] — **Non-fatal**: a single image failed (corrupt file,
//!   transport error) but the rest of the batch is fine. Stored inside
//!   [`crate::output::FileResult`] so callers can inspect partial success
//!   rather than losing the whole batch to one bad file.
//!
//! The separation lets callers decide their own tolerance: abort on the
//! first file failure, log and continue, or collect all errors for a
//! post-run report.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the ocrstamp library.
///
/// File-level failures use [`FileError`] and are stored in
/// [`crate::output::FileResult`] rather than propagated here.
#[derive(Debug, Error)]
pub enum OcrStampError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input path was not found.
    #[error("Input path not found: '{path}'\nCheck the path exists and is readable.")]
    InputNotFound { path: PathBuf },

    /// Process does not have read permission on the input path.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// Reading an input file failed for a reason other than the above.
    #[error("Failed to read '{path}': {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Listing the input folder's entries failed.
    #[error("Failed to list input folder '{path}': {source}")]
    ReadDirFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Single-image mode was given a file whose type cannot be sent inline.
    #[error("'{path}' is not a recognised image type\nThe MIME type is guessed from the file extension.")]
    NotAnImage { path: PathBuf },

    // ── Endpoint errors ───────────────────────────────────────────────────
    /// The HTTP request to the OCR endpoint could not be completed.
    #[error("OCR endpoint request failed: {detail}\nCheck the endpoint is reachable (see --base-url).")]
    RequestFailed { detail: String },

    /// The endpoint answered with an error body instead of choices.
    #[error("OCR endpoint returned an error: {message}")]
    ApiError { message: String },

    /// The endpoint answered 200 but the response carried no choices.
    #[error("OCR endpoint returned no choices in its response")]
    EmptyResponse,

    // ── Batch errors ──────────────────────────────────────────────────────
    /// Some files succeeded but at least one failed.
    ///
    /// Returned by [`crate::output::BatchOutput::into_result`] when the
    /// caller wants to treat any file failure as an error.
    #[error("{failed}/{total} files failed during the batch")]
    PartialFailure {
        success: usize,
        failed: usize,
        total: usize,
    },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create the output folder.
    #[error("Failed to create output folder '{path}': {source}")]
    OutputDirFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// A non-fatal error for a single file in a batch.
///
/// Stored inside [`crate::output::FileResult`] when a file fails.
/// The overall batch continues regardless of how many files fail.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum FileError {
    /// The file could not be decoded as an image.
    #[error("{file}: image decode failed: {detail}")]
    Decode { file: String, detail: String },

    /// Re-encoding the normalized image for transport failed.
    #[error("{file}: image encode failed: {detail}")]
    Encode { file: String, detail: String },

    /// The OCR endpoint call failed (network, auth, malformed response).
    #[error("{file}: OCR request failed: {detail}")]
    Transport { file: String, detail: String },

    /// Writing the annotated composite to the output folder failed.
    #[error("{file}: saving composite failed: {detail}")]
    Save { file: String, detail: String },
}

impl FileError {
    /// File name this error belongs to.
    pub fn file(&self) -> &str {
        match self {
            FileError::Decode { file, .. }
            | FileError::Encode { file, .. }
            | FileError::Transport { file, .. }
            | FileError::Save { file, .. } => file,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_not_found_display() {
        let e = OcrStampError::InputNotFound {
            path: PathBuf::from("/missing/folder"),
        };
        let msg = e.to_string();
        assert!(msg.contains("/missing/folder"), "got: {msg}");
    }

    #[test]
    fn api_error_display() {
        let e = OcrStampError::ApiError {
            message: "model not loaded".into(),
        };
        assert!(e.to_string().contains("model not loaded"));
    }

    #[test]
    fn invalid_config_display() {
        let e = OcrStampError::InvalidConfig("max_attempts must be >= 1".into());
        assert!(e.to_string().contains("max_attempts"));
    }

    #[test]
    fn file_error_display_and_accessor() {
        let e = FileError::Decode {
            file: "broken.png".into(),
            detail: "unexpected EOF".into(),
        };
        assert!(e.to_string().contains("broken.png"));
        assert!(e.to_string().contains("unexpected EOF"));
        assert_eq!(e.file(), "broken.png");
    }

    #[test]
    fn file_error_round_trips_through_json() {
        let e = FileError::Transport {
            file: "a.png".into(),
            detail: "connection refused".into(),
        };
        let json = serde_json::to_string(&e).unwrap();
        let back: FileError = serde_json::from_str(&json).unwrap();
        assert_eq!(back.file(), "a.png");
    }
}
