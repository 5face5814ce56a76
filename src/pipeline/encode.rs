//! Image encoding: in-memory image → base64 data URI.
//!
//! The endpoint accepts images as data URIs embedded in the JSON request
//! body. PNG is used for batch images because it is lossless — text
//! crispness matters far more than payload size for OCR accuracy.
//!
//! Single-image mode ([`encode_file`]) sends the file's raw bytes instead,
//! tagged with the MIME type guessed from its extension, so the payload is
//! exactly what sits on disk.

use crate::error::{FileError, OcrStampError};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::DynamicImage;
use std::io::Cursor;
use std::path::Path;
use tracing::debug;

/// Encode a normalized image as a `data:image/png;base64,…` URI.
///
/// Called once per OCR attempt; the PNG encoder is deterministic, so every
/// attempt transmits identical payload bytes.
pub fn encode_image(img: &DynamicImage, file_name: &str) -> Result<String, FileError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .map_err(|e| FileError::Encode {
            file: file_name.to_string(),
            detail: e.to_string(),
        })?;

    let b64 = STANDARD.encode(&buf);
    debug!("Encoded image → {} bytes base64", b64.len());

    Ok(format!("data:image/png;base64,{b64}"))
}

/// Encode a file's raw bytes as a data URI with its guessed MIME type.
///
/// No decode, no resize — single-image mode transmits the file verbatim.
/// Extensions that do not map to an `image/*` type are rejected.
pub fn encode_file(path: &Path) -> Result<String, OcrStampError> {
    let mime = mime_guess::from_path(path)
        .first()
        .filter(|m| m.type_() == mime_guess::mime::IMAGE)
        .ok_or_else(|| OcrStampError::NotAnImage {
            path: path.to_path_buf(),
        })?;

    let bytes = std::fs::read(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => OcrStampError::InputNotFound {
            path: path.to_path_buf(),
        },
        std::io::ErrorKind::PermissionDenied => OcrStampError::PermissionDenied {
            path: path.to_path_buf(),
        },
        _ => OcrStampError::ReadFailed {
            path: path.to_path_buf(),
            source: e,
        },
    })?;

    let b64 = STANDARD.encode(&bytes);
    debug!("Encoded {} ({}) → {} bytes base64", path.display(), mime, b64.len());

    Ok(format!("data:{mime};base64,{b64}"))
}
