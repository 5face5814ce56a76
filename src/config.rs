//! Configuration types for the OCR annotation pipeline.
//!
//! All behaviour is controlled through [`OcrConfig`], built via its
//! [`OcrConfigBuilder`]. Keeping every knob in one struct makes it trivial to
//! share a config across the batch, log it once at startup, and diff two runs
//! to understand why their outputs differ.
//!
//! # Design choice: builder over constructor
//! A fifteen-field constructor is unreadable and breaks on every new field.
//! The builder pattern lets callers set only what they care about and rely on
//! well-documented defaults for the rest.

use crate::client::ChatTransport;
use crate::error::OcrStampError;
use crate::progress::ProgressCallback;
use crate::prompts;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Predicate deciding whether a model response is invalid and should be
/// retried. Receives the trimmed response text.
pub type InvalidResponsePredicate = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// Default port of the inference endpoint, overridable at runtime with the
/// `API_PORT` environment variable.
const DEFAULT_API_PORT: u16 = 37000;

/// Base URL used when none is configured.
///
/// Honours the `API_PORT` environment variable so a relocated endpoint can be
/// targeted without rebuilding: `http://10.10.7.3:{API_PORT}/v1`.
pub fn default_base_url() -> String {
    let port = std::env::var("API_PORT")
        .ok()
        .and_then(|p| p.parse::<u16>().ok())
        .unwrap_or(DEFAULT_API_PORT);
    format!("http://10.10.7.3:{port}/v1")
}

/// Configuration for a batch OCR-and-annotate run.
///
/// Built via [`OcrConfig::builder()`] or using [`OcrConfig::default()`].
///
/// # Example
/// ```rust
/// use ocrstamp::OcrConfig;
///
/// let config = OcrConfig::builder()
///     .base_url("http://localhost:8000/v1")
///     .model("Qwen2-VL-7B-Instruct")
///     .max_attempts(3)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct OcrConfig {
    /// Base URL of the chat-completions endpoint, without the
    /// `/chat/completions` suffix. Default: `http://10.10.7.3:37000/v1`
    /// (port taken from `API_PORT` if set).
    pub base_url: String,

    /// API key sent as a bearer token. Default: `"0"`.
    ///
    /// Self-hosted endpoints usually ignore the value but still require the
    /// header to be present, so a placeholder is accepted.
    pub api_key: String,

    /// Vision model identifier. Default: `"Qwen2-VL-7B-Instruct"`.
    pub model: String,

    /// Maximum tokens the model may generate per image. Default: 300.
    ///
    /// OCR transcriptions are short; 300 tokens covers a dense label or
    /// formula while keeping degenerate rambling responses cheap.
    pub max_tokens: u32,

    /// Total OCR calls allowed per image, including the first. Default: 3.
    ///
    /// Retries fire only on an invalid response (see
    /// [`invalid_response`](Self::invalid_response)); transport errors are
    /// never retried here and surface as per-file failures instead.
    pub max_attempts: u32,

    /// System instruction sent with every request.
    pub system_prompt: String,

    /// User-turn text accompanying the embedded image.
    ///
    /// Also the reference string for the default invalid-response check:
    /// some models occasionally echo this prompt back verbatim instead of
    /// transcribing, and such an echo triggers a retry.
    pub user_prompt: String,

    /// Custom invalid-response predicate. If `None`, a response is invalid
    /// exactly when it equals [`user_prompt`](Self::user_prompt).
    pub invalid_response: Option<InvalidResponsePredicate>,

    /// Minimum image width in pixels before OCR. Default: 28.
    ///
    /// Vision transformers tile the input into patches (typically 28 px);
    /// images below one patch per axis produce unstable transcriptions, so
    /// anything smaller is upscaled first.
    pub min_width: u32,

    /// Minimum image height in pixels before OCR. Default: 28.
    pub min_height: u32,

    /// Maximum characters per wrapped text line in the header. Default: 60.
    pub wrap_width: usize,

    /// Cap on the number of wrapped lines drawn above the image.
    /// Range: 1–10000. Default: 120.
    ///
    /// Bounds the composite's height when the model returns pathologically
    /// long text; lines past the cap are dropped with a warning.
    pub max_text_lines: usize,

    /// TrueType font file tried first for the header text. Default: `arial.ttf`.
    ///
    /// When the file is missing or unparseable the renderer falls back to a
    /// built-in bitmap font rather than failing the file.
    pub font_path: PathBuf,

    /// Font size in pixels for the header text. Range: 1–512. Default: 20.0.
    pub font_size: f32,

    /// Padding in pixels applied above and below the text block, and to the
    /// left of each line. Range: 0–1024. Default: 10.
    pub padding: u32,

    /// Per-request timeout in seconds. Default: `None` (transport default).
    pub request_timeout_secs: Option<u64>,

    /// Pre-constructed transport. Takes precedence over building an HTTP
    /// client from `base_url`/`api_key`; lets tests inject a mock endpoint.
    pub client: Option<Arc<dyn ChatTransport>>,

    /// Observer for batch progress events. If `None`, events are dropped.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: "0".to_string(),
            model: "Qwen2-VL-7B-Instruct".to_string(),
            max_tokens: 300,
            max_attempts: 3,
            system_prompt: prompts::DEFAULT_SYSTEM_PROMPT.to_string(),
            user_prompt: prompts::DEFAULT_USER_PROMPT.to_string(),
            invalid_response: None,
            min_width: 28,
            min_height: 28,
            wrap_width: 60,
            max_text_lines: 120,
            font_path: PathBuf::from("arial.ttf"),
            font_size: 20.0,
            padding: 10,
            request_timeout_secs: None,
            client: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for OcrConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OcrConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("max_attempts", &self.max_attempts)
            .field("min_width", &self.min_width)
            .field("min_height", &self.min_height)
            .field("wrap_width", &self.wrap_width)
            .field("max_text_lines", &self.max_text_lines)
            .field("font_path", &self.font_path)
            .field("font_size", &self.font_size)
            .field("padding", &self.padding)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field(
                "invalid_response",
                &self.invalid_response.as_ref().map(|_| "<predicate>"),
            )
            .field("client", &self.client.as_ref().map(|_| "<dyn ChatTransport>"))
            .finish()
    }
}

impl OcrConfig {
    /// Create a new builder for `OcrConfig`.
    pub fn builder() -> OcrConfigBuilder {
        OcrConfigBuilder {
            config: Self::default(),
        }
    }

    /// Whether `text` counts as an invalid response for retry purposes.
    ///
    /// Uses the injected [`invalid_response`](Self::invalid_response)
    /// predicate when present, otherwise exact equality with
    /// [`user_prompt`](Self::user_prompt) (the known degenerate echo).
    pub fn is_invalid_response(&self, text: &str) -> bool {
        match &self.invalid_response {
            Some(pred) => pred(text),
            None => text == self.user_prompt,
        }
    }
}

/// Builder for [`OcrConfig`].
pub struct OcrConfigBuilder {
    config: OcrConfig,
}

impl OcrConfigBuilder {
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into();
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = key.into();
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn max_tokens(mut self, n: u32) -> Self {
        self.config.max_tokens = n.max(1);
        self
    }

    pub fn max_attempts(mut self, n: u32) -> Self {
        self.config.max_attempts = n.max(1);
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = prompt.into();
        self
    }

    pub fn user_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.user_prompt = prompt.into();
        self
    }

    pub fn invalid_response(mut self, pred: InvalidResponsePredicate) -> Self {
        self.config.invalid_response = Some(pred);
        self
    }

    pub fn min_width(mut self, px: u32) -> Self {
        self.config.min_width = px.max(1);
        self
    }

    pub fn min_height(mut self, px: u32) -> Self {
        self.config.min_height = px.max(1);
        self
    }

    pub fn wrap_width(mut self, chars: usize) -> Self {
        self.config.wrap_width = chars.max(1);
        self
    }

    pub fn max_text_lines(mut self, n: usize) -> Self {
        self.config.max_text_lines = n.clamp(1, 10_000);
        self
    }

    pub fn font_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.font_path = path.into();
        self
    }

    pub fn font_size(mut self, px: f32) -> Self {
        self.config.font_size = px.clamp(1.0, 512.0);
        self
    }

    pub fn padding(mut self, px: u32) -> Self {
        self.config.padding = px.min(1024);
        self
    }

    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.request_timeout_secs = Some(secs);
        self
    }

    pub fn client(mut self, client: Arc<dyn ChatTransport>) -> Self {
        self.config.client = Some(client);
        self
    }

    pub fn progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.config.progress_callback = Some(callback);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<OcrConfig, OcrStampError> {
        let c = &self.config;
        if c.base_url.trim().is_empty() {
            return Err(OcrStampError::InvalidConfig(
                "base_url must not be empty".into(),
            ));
        }
        if c.model.trim().is_empty() {
            return Err(OcrStampError::InvalidConfig(
                "model must not be empty".into(),
            ));
        }
        if c.max_attempts == 0 {
            return Err(OcrStampError::InvalidConfig(
                "max_attempts must be >= 1".into(),
            ));
        }
        if c.min_width == 0 || c.min_height == 0 {
            return Err(OcrStampError::InvalidConfig(
                "minimum dimensions must be >= 1".into(),
            ));
        }
        if c.wrap_width == 0 {
            return Err(OcrStampError::InvalidConfig(
                "wrap_width must be >= 1".into(),
            ));
        }
        if !(c.font_size > 0.0) {
            return Err(OcrStampError::InvalidConfig(
                "font_size must be positive".into(),
            ));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn oversized_layout_values_are_clamped() {
        let config = OcrConfig::builder()
            .padding(u32::MAX)
            .font_size(1e9)
            .max_text_lines(usize::MAX)
            .build()
            .expect("valid config");

        assert_eq!(config.padding, 1024);
        assert_eq!(config.font_size, 512.0);
        assert_eq!(config.max_text_lines, 10_000);
    }

    #[test]
    fn nan_font_size_is_rejected() {
        let err = OcrConfig::builder().font_size(f32::NAN).build();
        assert!(matches!(err, Err(OcrStampError::InvalidConfig(_))));
    }

    #[test]
    fn empty_base_url_is_rejected() {
        let err = OcrConfig::builder().base_url("  ").build();
        assert!(matches!(err, Err(OcrStampError::InvalidConfig(_))));
    }
}
