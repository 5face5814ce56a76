//! VLM interaction: build the vision conversation and drive the retry loop.
//!
//! This module is intentionally thin — prompt text lives in
//! [`crate::prompts`] and the HTTP round trip in [`crate::client`], so the
//! retry policy here can be read in isolation.
//!
//! ## Retry Strategy
//!
//! The endpoint occasionally answers with a verbatim echo of the user prompt
//! instead of a transcription. Such a response is detected by the config's
//! invalid-response predicate and retried, up to `max_attempts` total calls,
//! re-encoding the payload from the same normalized image each time. When
//! every attempt comes back degenerate the result downgrades to the
//! [`crate::prompts::FAILED_RECOGNITION_TEXT`] placeholder — never an error,
//! so the file still gets an annotated output. Transport failures are a
//! different animal: they are not retried and surface as per-file errors.

use crate::client::{ChatMessage, ChatRequest, ChatTransport};
use crate::config::OcrConfig;
use crate::error::{FileError, OcrStampError};
use crate::pipeline::encode;
use crate::prompts::FAILED_RECOGNITION_TEXT;
use image::DynamicImage;
use tracing::{debug, warn};

/// Outcome of the OCR stage for one image.
#[derive(Debug, Clone)]
pub struct Recognition {
    /// Recognized text, or the placeholder after exhausted attempts.
    pub text: String,
    /// Calls made, `1..=max_attempts`.
    pub attempts: u32,
}

/// One chat-completions round trip.
///
/// Sends the two-message conversation (system instruction, then the user
/// prompt paired with the embedded image) and returns the first choice's
/// content trimmed of surrounding whitespace.
pub async fn perform_ocr(
    transport: &dyn ChatTransport,
    config: &OcrConfig,
    data_uri: String,
) -> Result<String, OcrStampError> {
    let request = build_request(config, data_uri);
    let response = transport.complete(&request).await?;
    let text = response.into_text()?;
    Ok(text.trim().to_string())
}

/// OCR with the degenerate-echo retry policy.
///
/// Always returns `Ok(Recognition)` unless encoding or transport fails: an
/// image whose every attempt was judged invalid resolves to the placeholder
/// text rather than an error, so the batch can still stamp and save it.
pub async fn recognize_with_retry(
    transport: &dyn ChatTransport,
    config: &OcrConfig,
    image: &DynamicImage,
    file_name: &str,
) -> Result<Recognition, FileError> {
    for attempt in 1..=config.max_attempts {
        let data_uri = encode::encode_image(image, file_name)?;
        let text = perform_ocr(transport, config, data_uri)
            .await
            .map_err(|e| FileError::Transport {
                file: file_name.to_string(),
                detail: e.to_string(),
            })?;

        if config.is_invalid_response(&text) {
            warn!(
                "{}: attempt {}/{} returned an invalid response",
                file_name, attempt, config.max_attempts
            );
            continue;
        }

        debug!("{}: recognized on attempt {}", file_name, attempt);
        return Ok(Recognition {
            text,
            attempts: attempt,
        });
    }

    warn!(
        "{}: all {} attempts invalid, using placeholder text",
        file_name, config.max_attempts
    );
    Ok(Recognition {
        text: FAILED_RECOGNITION_TEXT.to_string(),
        attempts: config.max_attempts,
    })
}

/// Build the chat-completions request for one attempt.
fn build_request(config: &OcrConfig, data_uri: String) -> ChatRequest {
    ChatRequest {
        model: config.model.clone(),
        messages: vec![
            ChatMessage::system(config.system_prompt.clone()),
            ChatMessage::user_with_image(config.user_prompt.clone(), data_uri),
        ],
        max_tokens: config.max_tokens,
    }
}
