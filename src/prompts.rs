//! Prompt text for the VLM OCR call.
//!
//! Centralising every prompt here serves two purposes:
//!
//! 1. **Single source of truth** — the degenerate-echo check in the OCR retry
//!    loop compares against [`DEFAULT_USER_PROMPT`]; keeping the prompt and
//!    the check keyed to the same constant means they cannot drift apart.
//!
//! 2. **Testability** — unit tests can import and inspect prompts directly
//!    without spinning up a real VLM.
//!
//! Callers can override both prompts via [`crate::config::OcrConfig`]; the
//! constants here are used only when no override is provided.

/// Default system prompt: instructs the model to perform OCR and return
/// text only.
///
/// Used when `OcrConfig::system_prompt` is not overridden.
pub const DEFAULT_SYSTEM_PROMPT: &str = "请对以下图片进行OCR识别，仅提取文字。";

/// Default user prompt accompanying the embedded image.
///
/// Some vision models occasionally echo this exact string back instead of
/// producing a transcription; the retry loop treats such an echo as an
/// invalid response. See [`crate::config::OcrConfig::invalid_response`].
pub const DEFAULT_USER_PROMPT: &str = "这是一张图片，请提取其中的文字内容。";

/// Sentinel text substituted when every OCR attempt returns a degenerate
/// response. The annotated output is still produced, stamped with this
/// marker instead of a transcription.
pub const FAILED_RECOGNITION_TEXT: &str = "problem img";
