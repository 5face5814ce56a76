//! Chat-completions client for the remote OCR endpoint.
//!
//! The endpoint speaks the OpenAI-compatible `/chat/completions` dialect:
//! role-tagged messages whose content is a list of typed parts (text or an
//! `image_url` carrying a data URI). Only the fields this pipeline needs are
//! modelled; unknown response fields are ignored.
//!
//! The HTTP layer sits behind [`ChatTransport`] so tests can substitute a
//! scripted endpoint. Production code uses [`HttpChatClient`], constructed
//! once per batch and passed into the pipeline explicitly.

use crate::error::OcrStampError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tracing::debug;

// ── Wire types ───────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
}

#[derive(Debug, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: MessageContent,
}

/// Message content, matching the two shapes the endpoint accepts: a bare
/// string (system instruction) or a list of typed parts (user turn mixing
/// text with an embedded image).
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Serialize)]
#[serde(tag = "type")]
pub enum ContentPart {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "image_url")]
    ImageUrl { image_url: ImageUrl },
}

impl ChatMessage {
    /// System message carrying a plain instruction string.
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: MessageContent::Text(text.into()),
        }
    }

    /// User message pairing a text prompt with an embedded image.
    pub fn user_with_image(text: impl Into<String>, data_uri: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: MessageContent::Parts(vec![
                ContentPart::Text { text: text.into() },
                ContentPart::ImageUrl {
                    image_url: ImageUrl {
                        url: data_uri.into(),
                    },
                },
            ]),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ImageUrl {
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct ChatResponse {
    pub choices: Option<Vec<ChatChoice>>,
    pub error: Option<ApiErrorBody>,
}

#[derive(Debug, Deserialize)]
pub struct ChatChoice {
    pub message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
pub struct ResponseMessage {
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct ApiErrorBody {
    pub message: String,
}

impl ChatResponse {
    /// Extract the first choice's message content.
    ///
    /// An error body wins over any choices; a response with neither is
    /// [`OcrStampError::EmptyResponse`].
    pub fn into_text(self) -> Result<String, OcrStampError> {
        if let Some(err) = self.error {
            return Err(OcrStampError::ApiError {
                message: err.message,
            });
        }
        self.choices
            .and_then(|mut choices| {
                if choices.is_empty() {
                    None
                } else {
                    Some(choices.remove(0).message.content)
                }
            })
            .ok_or(OcrStampError::EmptyResponse)
    }
}

// ── Transport seam ───────────────────────────────────────────────────────

/// One round trip to a chat-completions endpoint.
///
/// Implementations must be `Send + Sync`; the batch holds one behind an
/// `Arc` for its whole run. Tests inject their own implementation via
/// [`crate::config::OcrConfigBuilder::client`].
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse, OcrStampError>;
}

// ── HTTP implementation ──────────────────────────────────────────────────

/// Production [`ChatTransport`] backed by [`reqwest`].
pub struct HttpChatClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl HttpChatClient {
    /// Client with the transport's default timeouts.
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: normalize_base_url(base_url.into()),
            api_key: api_key.into(),
        }
    }

    /// Client with an explicit per-request timeout.
    pub fn with_timeout(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout_secs: u64,
    ) -> Result<Self, OcrStampError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| OcrStampError::RequestFailed {
                detail: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self {
            http,
            base_url: normalize_base_url(base_url.into()),
            api_key: api_key.into(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

impl fmt::Debug for HttpChatClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpChatClient")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

#[async_trait]
impl ChatTransport for HttpChatClient {
    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse, OcrStampError> {
        let url = self.endpoint();
        debug!(model = %request.model, "POST {url}");

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| OcrStampError::RequestFailed {
                detail: request_error_detail(&e),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            // Error bodies from OpenAI-style servers still parse as a
            // ChatResponse with only `error` populated.
            if let Ok(parsed) = serde_json::from_str::<ChatResponse>(&body) {
                if let Some(err) = parsed.error {
                    return Err(OcrStampError::ApiError {
                        message: err.message,
                    });
                }
            }
            let snippet: String = body.chars().take(200).collect();
            return Err(OcrStampError::ApiError {
                message: format!("HTTP {status}: {snippet}"),
            });
        }

        response
            .json::<ChatResponse>()
            .await
            .map_err(|e| OcrStampError::RequestFailed {
                detail: format!("malformed response body: {e}"),
            })
    }
}

fn normalize_base_url(url: String) -> String {
    url.trim_end_matches('/').to_string()
}

fn request_error_detail(e: &reqwest::Error) -> String {
    if e.is_timeout() {
        format!("timed out: {e}")
    } else if e.is_connect() {
        format!("connection failed: {e}")
    } else {
        e.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_serialises_to_openai_shape() {
        let request = ChatRequest {
            model: "Qwen2-VL-7B-Instruct".to_string(),
            messages: vec![
                ChatMessage::system("extract the text"),
                ChatMessage::user_with_image("describe", "data:image/png;base64,AAAA"),
            ],
            max_tokens: 300,
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "Qwen2-VL-7B-Instruct");
        assert_eq!(json["max_tokens"], 300);
        // System content is a bare string, user content a typed part list.
        assert_eq!(json["messages"][0]["content"], "extract the text");
        assert_eq!(json["messages"][1]["content"][0]["type"], "text");
        assert_eq!(json["messages"][1]["content"][1]["type"], "image_url");
        assert_eq!(
            json["messages"][1]["content"][1]["image_url"]["url"],
            "data:image/png;base64,AAAA"
        );
    }

    #[test]
    fn response_text_extraction() {
        let response: ChatResponse = serde_json::from_str(
            r#"{"choices":[{"message":{"role":"assistant","content":"  HELLO  "}}]}"#,
        )
        .unwrap();
        assert_eq!(response.into_text().unwrap(), "  HELLO  ");
    }

    #[test]
    fn response_error_body_wins() {
        let response: ChatResponse =
            serde_json::from_str(r#"{"error":{"message":"model not loaded"}}"#).unwrap();
        match response.into_text() {
            Err(OcrStampError::ApiError { message }) => {
                assert_eq!(message, "model not loaded");
            }
            other => panic!("expected ApiError, got {other:?}"),
        }
    }

    #[test]
    fn response_without_choices_is_empty() {
        let response: ChatResponse = serde_json::from_str(r#"{"choices":[]}"#).unwrap();
        assert!(matches!(
            response.into_text(),
            Err(OcrStampError::EmptyResponse)
        ));
    }

    #[test]
    fn base_url_trailing_slash_is_stripped() {
        let client = HttpChatClient::new("http://localhost:8000/v1/", "0");
        assert_eq!(client.endpoint(), "http://localhost:8000/v1/chat/completions");
    }
}
