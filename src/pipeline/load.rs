//! Image loading and normalization.
//!
//! Vision transformers tile their input into fixed-size patches; an image
//! smaller than one patch per axis produces unstable transcriptions. This
//! stage decodes the file and upscales anything below the configured minimum
//! footprint before it reaches the encoder.

use crate::error::FileError;
use image::imageops::FilterType;
use image::DynamicImage;
use std::path::Path;
use tracing::debug;

/// Decode an image file, sniffing the format from content when the
/// extension lies or is absent.
pub fn load_image(path: &Path, file_name: &str) -> Result<DynamicImage, FileError> {
    let reader = image::ImageReader::open(path)
        .and_then(|r| r.with_guessed_format())
        .map_err(|e| FileError::Decode {
            file: file_name.to_string(),
            detail: e.to_string(),
        })?;
    reader.decode().map_err(|e| FileError::Decode {
        file: file_name.to_string(),
        detail: e.to_string(),
    })
}

/// Upscale the image so both dimensions meet the given minimums.
///
/// Images already at or above both minimums pass through untouched. An
/// undersized image is scaled on both axes by the single factor
/// `max(min_width / width, min_height / height)`, rounded to the nearest
/// pixel, and resampled with Lanczos3.
///
/// Applying the larger of the two ratios uniformly guarantees both minimums
/// are met in one pass. When the ratios differ the result is slightly larger
/// than necessary along the non-binding axis; relative proportions between
/// the axes are kept, as both use the same factor.
pub fn ensure_min_dimensions(img: DynamicImage, min_width: u32, min_height: u32) -> DynamicImage {
    let (width, height) = (img.width(), img.height());
    if width >= min_width && height >= min_height {
        return img;
    }

    let factor = (min_width as f64 / width as f64).max(min_height as f64 / height as f64);
    let new_width = (width as f64 * factor).round() as u32;
    let new_height = (height as f64 * factor).round() as u32;
    debug!(
        "Upscaling {}x{} → {}x{} (factor {:.3})",
        width, height, new_width, new_height, factor
    );

    img.resize_exact(new_width, new_height, FilterType::Lanczos3)
}
