//! Pipeline stages for OCR annotation.
//!
//! Each submodule implements exactly one transformation step.
//! Keeping stages separate makes each independently testable and lets us
//! swap implementations (e.g. a different text renderer) without touching
//! other stages.
//!
//! ## Data Flow
//!
//! ```text
//! load ──▶ encode ──▶ ocr ──▶ annotate
//! (decode + (base64    (VLM +   (text header
//!  upscale)  data URI)  retry)   + save)
//! ```
//!
//! 1. [`load`]     — decode the file and upscale below-minimum images
//! 2. [`encode`]   — PNG-encode and base64-wrap for the request body
//! 3. [`ocr`]      — drive the VLM call with the degenerate-echo retry; the
//!    only stage with network I/O
//! 4. [`annotate`] — render the recognized text above the image and persist
//!    the composite

pub mod annotate;
pub mod encode;
pub mod load;
pub mod ocr;
