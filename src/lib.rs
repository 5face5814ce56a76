//! # ocrstamp
//!
//! Annotate image folders with VLM-recognized text headers.
//!
//! ## Why this crate?
//!
//! When a vision-language model transcribes thousands of images, judging the
//! output means flipping between the image and a text file. This crate stamps
//! each image's transcription directly above the image itself — one glance at
//! the output folder shows what the model read and what it was looking at.
//! Degenerate model responses are retried and, failing that, marked with a
//! placeholder so every input still yields an annotated output.
//!
//! ## Pipeline Overview
//!
//! ```text
//! folder/*.png
//!  │
//!  ├─ 1. Load      decode; upscale below-minimum images (Lanczos)
//!  ├─ 2. Encode    PNG → base64 data URI
//!  ├─ 3. OCR       chat-completions call with degenerate-echo retry
//!  ├─ 4. Annotate  word-wrapped text header drawn above the image
//!  └─ 5. Persist   same file name in the output folder + per-file stats
//! ```
//!
//! Files are processed strictly one at a time; a failure in one file is
//! recorded in its [`FileResult`] and the batch moves on.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ocrstamp::{process_folder, OcrConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = OcrConfig::builder()
//!         .base_url("http://localhost:8000/v1")
//!         .build()?;
//!     let output = process_folder("scans", "scans_output", &config).await?;
//!     eprintln!(
//!         "{}/{} files annotated",
//!         output.stats.processed_files, output.stats.total_files
//!     );
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `ocrstamp` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library to avoid pulling in CLI-only deps:
//! ```toml
//! ocrstamp = { version = "0.3", default-features = false }
//! ```
//!
//! ## Endpoint
//!
//! Any OpenAI-compatible `/chat/completions` server with a vision model
//! works (vLLM, LMDeploy, llama.cpp server, …). The default configuration
//! targets `http://10.10.7.3:37000/v1` with the `Qwen2-VL-7B-Instruct`
//! model; the port half of the default can be moved with the `API_PORT`
//! environment variable, and everything else through [`OcrConfig`].

// ── Modules ──────────────────────────────────────────────────────────────

pub mod client;
pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod process;
pub mod progress;
pub mod prompts;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use client::{ChatTransport, HttpChatClient};
pub use config::{default_base_url, InvalidResponsePredicate, OcrConfig, OcrConfigBuilder};
pub use error::{FileError, OcrStampError};
pub use output::{BatchOutput, BatchStats, FileResult};
pub use process::{default_output_dir, process_folder, recognize_file};
pub use progress::{BatchProgressCallback, NoopProgressCallback, ProgressCallback};
