//! Output types for batch runs.
//!
//! A batch never aborts because one file failed, so the interesting question
//! is always "which files made it?". [`BatchOutput`] answers it: one
//! [`FileResult`] per attempted file, in input order, with any per-file error
//! stored inside the result rather than thrown. Everything serialises so a
//! run can be dumped as JSON and diffed against a previous one.

use crate::error::{FileError, OcrStampError};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Outcome of one file's trip through the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileResult {
    /// Bare file name, no directory.
    pub file_name: String,

    /// Recognized text stamped onto the composite. Empty when the file
    /// failed; the sentinel `"problem img"` when every attempt returned a
    /// degenerate response.
    pub text: String,

    /// OCR calls consumed (0 when the file failed).
    pub attempts: u32,

    /// Wall-clock time for the whole file pipeline.
    pub duration_ms: u64,

    /// Where the composite was written; `None` when the file failed.
    pub output_path: Option<PathBuf>,

    /// The per-file error, if any. `None` means the composite was written.
    pub error: Option<FileError>,
}

impl FileResult {
    /// True when the composite was written without error.
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Aggregate counters for a batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchStats {
    /// Files attempted (non-file directory entries are not counted).
    pub total_files: usize,
    /// Files whose composite was written.
    pub processed_files: usize,
    /// Files that failed at some pipeline stage.
    pub failed_files: usize,
    /// Wall-clock time for the whole batch.
    pub total_duration_ms: u64,
}

/// Everything a batch run produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchOutput {
    /// Per-file outcomes, in input order.
    pub files: Vec<FileResult>,
    /// Aggregate counters.
    pub stats: BatchStats,
}

impl BatchOutput {
    /// Treat any file failure as an error.
    ///
    /// The batch driver itself returns `Ok` as long as the run completed;
    /// callers that want strict all-or-nothing semantics can chain this.
    pub fn into_result(self) -> Result<BatchOutput, OcrStampError> {
        if self.stats.failed_files == 0 {
            Ok(self)
        } else {
            Err(OcrStampError::PartialFailure {
                success: self.stats.processed_files,
                failed: self.stats.failed_files,
                total: self.stats.total_files,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result_failed(name: &str) -> FileResult {
        FileResult {
            file_name: name.to_string(),
            text: String::new(),
            attempts: 0,
            duration_ms: 5,
            output_path: None,
            error: Some(FileError::Decode {
                file: name.to_string(),
                detail: "truncated".to_string(),
            }),
        }
    }

    #[test]
    fn into_result_passes_clean_batches() {
        let output = BatchOutput {
            files: vec![],
            stats: BatchStats {
                total_files: 2,
                processed_files: 2,
                failed_files: 0,
                total_duration_ms: 10,
            },
        };
        assert!(output.into_result().is_ok());
    }

    #[test]
    fn into_result_rejects_partial_failures() {
        let output = BatchOutput {
            files: vec![result_failed("a.png")],
            stats: BatchStats {
                total_files: 2,
                processed_files: 1,
                failed_files: 1,
                total_duration_ms: 10,
            },
        };
        let err = output.into_result().unwrap_err();
        assert!(err.to_string().contains("1/2"));
    }

    #[test]
    fn file_result_serialises_with_embedded_error() {
        let r = result_failed("a.png");
        let json = serde_json::to_string(&r).unwrap();
        assert!(json.contains("a.png"));
        let back: FileResult = serde_json::from_str(&json).unwrap();
        assert!(!back.is_success());
    }
}
