//! Batch driver and single-image entry points.
//!
//! [`process_folder`] runs the whole pipeline over a flat folder of images,
//! strictly one file at a time. Every attempted file yields a
//! [`FileResult`] whether it succeeded or not; per-file errors are recorded
//! inside the result and logged, never propagated, so one corrupt image
//! cannot abort the rest of the batch. Fatal errors are reserved for
//! problems with the run itself (missing input folder, unwritable output
//! folder).
//!
//! [`recognize_file`] is the single-image debugging mode: one OCR call on
//! one file, no retry, no annotation, text straight back to the caller.

use crate::client::{ChatTransport, HttpChatClient};
use crate::config::OcrConfig;
use crate::error::{FileError, OcrStampError};
use crate::output::{BatchOutput, BatchStats, FileResult};
use crate::pipeline::annotate::{self, HeaderFont};
use crate::pipeline::{encode, load, ocr};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Process every image in `input_dir`, writing annotated composites under
/// the same file names to `output_dir`.
///
/// This is the primary entry point for the library.
///
/// # Returns
/// `Ok(BatchOutput)` whenever the run completes, even if every file failed
/// (check `output.stats.failed_files`).
///
/// # Errors
/// Returns `Err(OcrStampError)` only for fatal problems:
/// - Input folder missing or unreadable
/// - Output folder cannot be created
pub async fn process_folder(
    input_dir: impl AsRef<Path>,
    output_dir: impl AsRef<Path>,
    config: &OcrConfig,
) -> Result<BatchOutput, OcrStampError> {
    let total_start = Instant::now();
    let input_dir = input_dir.as_ref();
    let output_dir = output_dir.as_ref();
    info!(
        "Starting batch: {} → {}",
        input_dir.display(),
        output_dir.display()
    );

    // ── Step 1: Resolve the transport ────────────────────────────────────
    let transport = resolve_transport(config)?;

    // ── Step 2: Create the output folder ─────────────────────────────────
    std::fs::create_dir_all(output_dir).map_err(|e| OcrStampError::OutputDirFailed {
        path: output_dir.to_path_buf(),
        source: e,
    })?;

    // ── Step 3: List input files ─────────────────────────────────────────
    let files = list_image_files(input_dir)?;
    let total = files.len();
    info!("Found {} files in {}", total, input_dir.display());

    if let Some(ref cb) = config.progress_callback {
        cb.on_batch_start(total);
    }

    // ── Step 4: Load the header font once for the whole batch ────────────
    let font = HeaderFont::load(&config.font_path, config.font_size);

    // ── Step 5: Per-file pipeline, one file at a time ────────────────────
    let mut results: Vec<FileResult> = Vec::with_capacity(total);
    for (idx, path) in files.iter().enumerate() {
        let index = idx + 1;
        let file_name = display_name(path);
        if let Some(ref cb) = config.progress_callback {
            cb.on_file_start(index, total, &file_name);
        }

        let result =
            process_file(transport.as_ref(), &font, path, file_name, output_dir, config).await;

        if let Some(ref cb) = config.progress_callback {
            match &result.error {
                None => cb.on_file_complete(
                    index,
                    total,
                    &result.file_name,
                    &result.text,
                    result.duration_ms,
                ),
                Some(e) => cb.on_file_error(index, total, &result.file_name, &e.to_string()),
            }
        }

        results.push(result);
    }

    // ── Step 6: Compute stats ────────────────────────────────────────────
    let processed = results.iter().filter(|r| r.error.is_none()).count();
    let failed = results.len() - processed;
    let stats = BatchStats {
        total_files: total,
        processed_files: processed,
        failed_files: failed,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
    };

    info!(
        "Batch complete: {}/{} files, {}ms total",
        processed, total, stats.total_duration_ms
    );

    if let Some(ref cb) = config.progress_callback {
        cb.on_batch_complete(total, processed);
    }

    Ok(BatchOutput {
        files: results,
        stats,
    })
}

/// Recognize one image file without annotating it.
///
/// The raw file bytes are transmitted with their guessed MIME type, exactly
/// as they sit on disk — no decode, no upscaling, and a single call with no
/// degenerate-echo retry. What the endpoint answers (trimmed) is what you
/// get.
pub async fn recognize_file(
    path: impl AsRef<Path>,
    config: &OcrConfig,
) -> Result<String, OcrStampError> {
    let path = path.as_ref();
    let transport = resolve_transport(config)?;
    let data_uri = encode::encode_file(path)?;
    ocr::perform_ocr(transport.as_ref(), config, data_uri).await
}

/// Default output folder for an input folder: a sibling named
/// `<input>_output`.
pub fn default_output_dir(input_dir: impl AsRef<Path>) -> PathBuf {
    let input_dir = input_dir.as_ref();
    let mut name = input_dir
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| OsString::from("ocr"));
    name.push("_output");
    input_dir.with_file_name(name)
}

// ── Internal helpers ─────────────────────────────────────────────────────

/// Resolve the transport, most-specific first.
///
/// 1. **Pre-built client** (`config.client`) — the caller constructed the
///    transport entirely; used as-is. This is also the test seam for
///    substituting a scripted endpoint.
/// 2. **HTTP client from the endpoint fields** — built from `base_url`,
///    `api_key`, and `request_timeout_secs`.
fn resolve_transport(config: &OcrConfig) -> Result<Arc<dyn ChatTransport>, OcrStampError> {
    if let Some(ref client) = config.client {
        return Ok(Arc::clone(client));
    }

    let client = match config.request_timeout_secs {
        Some(secs) => HttpChatClient::with_timeout(&config.base_url, &config.api_key, secs)?,
        None => HttpChatClient::new(&config.base_url, &config.api_key),
    };
    Ok(Arc::new(client))
}

/// Regular files in `dir`, sorted by name. Subfolders and other non-file
/// entries are skipped.
fn list_image_files(dir: &Path) -> Result<Vec<PathBuf>, OcrStampError> {
    let entries = std::fs::read_dir(dir).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => OcrStampError::InputNotFound {
            path: dir.to_path_buf(),
        },
        std::io::ErrorKind::PermissionDenied => OcrStampError::PermissionDenied {
            path: dir.to_path_buf(),
        },
        _ => OcrStampError::ReadDirFailed {
            path: dir.to_path_buf(),
            source: e,
        },
    })?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| OcrStampError::ReadDirFailed {
            path: dir.to_path_buf(),
            source: e,
        })?;
        let path = entry.path();
        if path.is_file() {
            files.push(path);
        } else {
            debug!("Skipping non-file entry {}", path.display());
        }
    }
    files.sort();
    Ok(files)
}

/// Bare file name for logs and results, lossily decoded.
fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Run one file through load → normalize → OCR → annotate → save.
///
/// Always returns a `FileResult` — any stage failure is caught here,
/// logged, and stored in the result so the batch loop can move on.
async fn process_file(
    transport: &dyn ChatTransport,
    font: &HeaderFont,
    path: &Path,
    file_name: String,
    output_dir: &Path,
    config: &OcrConfig,
) -> FileResult {
    let start = Instant::now();

    let outcome = run_file_pipeline(transport, font, path, &file_name, output_dir, config).await;
    let duration_ms = start.elapsed().as_millis() as u64;

    match outcome {
        Ok((recognition, output_path)) => {
            info!(
                "{}: \"{}\" ({} attempt(s), {}ms)",
                file_name, recognition.text, recognition.attempts, duration_ms
            );
            FileResult {
                file_name,
                text: recognition.text,
                attempts: recognition.attempts,
                duration_ms,
                output_path: Some(output_path),
                error: None,
            }
        }
        Err(e) => {
            warn!("{} ({}ms)", e, duration_ms);
            FileResult {
                file_name,
                text: String::new(),
                attempts: 0,
                duration_ms,
                output_path: None,
                error: Some(e),
            }
        }
    }
}

async fn run_file_pipeline(
    transport: &dyn ChatTransport,
    font: &HeaderFont,
    path: &Path,
    file_name: &str,
    output_dir: &Path,
    config: &OcrConfig,
) -> Result<(ocr::Recognition, PathBuf), FileError> {
    let image = load::load_image(path, file_name)?;
    let image = load::ensure_min_dimensions(image, config.min_width, config.min_height);
    let recognition = ocr::recognize_with_retry(transport, config, &image, file_name).await?;
    let composite = annotate::annotate(&image, &recognition.text, font, config);
    // Join the on-disk OsStr name; `file_name` is lossy and for display only.
    let output_path = match path.file_name() {
        Some(name) => output_dir.join(name),
        None => output_dir.join(file_name),
    };
    annotate::save_composite(&composite, &output_path, file_name)?;
    Ok((recognition, output_path))
}
