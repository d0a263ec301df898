/// LLM Client: the single point of entry for all Claude API calls.
///
/// ARCHITECTURAL RULE: No other module may call the Anthropic API directly.
/// The operation executor talks to the model through the `LanguageModel` trait,
/// which `LlmClient` implements; tests substitute scripted fakes.
///
/// Model: claude-sonnet-4-5 (hardcoded)
use async_trait::async_trait;
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::schema::DataUri;

pub mod prompts;

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
/// The model used for all LLM calls.
/// Hardcoded; every operation runs against the same model.
pub const MODEL: &str = "claude-sonnet-4-5";
const MAX_TOKENS: u32 = 8192;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("LLM returned empty content")]
    EmptyContent,
}

impl LlmError {
    /// The provider answered, but not with usable JSON.
    pub fn is_malformed_output(&self) -> bool {
        matches!(self, LlmError::Parse(_) | LlmError::EmptyContent)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Capability boundary
// ────────────────────────────────────────────────────────────────────────────

/// One structured-output request: prompt text, optional media, and the JSON
/// Schema the answer must follow.
#[derive(Debug, Clone)]
pub struct ModelRequest {
    pub system: String,
    pub prompt: String,
    pub attachments: Vec<DataUri>,
    pub output_schema: Value,
}

/// Black-box LLM capability: given a prompt and an output shape, returns
/// structured data or fails. Carried in `AppState` as `Arc<dyn LanguageModel>`.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn generate(&self, request: &ModelRequest) -> Result<Value, LlmError>;
}

// ────────────────────────────────────────────────────────────────────────────
// Anthropic wire types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: Vec<AnthropicMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage<'a> {
    role: &'a str,
    content: Vec<RequestBlock<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum RequestBlock<'a> {
    Text { text: &'a str },
    Image { source: Base64Source<'a> },
    Document { source: Base64Source<'a> },
}

#[derive(Debug, Serialize)]
struct Base64Source<'a> {
    #[serde(rename = "type")]
    source_type: &'static str,
    media_type: &'a str,
    data: &'a str,
}

impl<'a> RequestBlock<'a> {
    fn from_attachment(media: &'a DataUri) -> Self {
        let source = Base64Source {
            source_type: "base64",
            media_type: &media.mime_type,
            data: &media.data,
        };
        if media.mime_type.starts_with("image/") {
            RequestBlock::Image { source }
        } else {
            RequestBlock::Document { source }
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LlmResponse {
    pub content: Vec<ContentBlock>,
    pub usage: Usage,
}

#[derive(Debug, Deserialize)]
pub struct ContentBlock {
    #[serde(rename = "type")]
    pub block_type: String,
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl LlmResponse {
    /// Extracts the text content from the first text block.
    pub fn text(&self) -> Option<&str> {
        self.content
            .iter()
            .find(|b| b.block_type == "text")
            .and_then(|b| b.text.as_deref())
    }
}

#[derive(Debug, Deserialize)]
struct AnthropicError {
    error: AnthropicErrorBody,
}

#[derive(Debug, Deserialize)]
struct AnthropicErrorBody {
    message: String,
}

// ────────────────────────────────────────────────────────────────────────────
// Client
// ────────────────────────────────────────────────────────────────────────────

/// Wraps the Anthropic Messages API with structured output helpers.
///
/// Failed calls are not retried: a transport or API failure is reported to the
/// caller as-is and the user decides whether to try again.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    api_key: String,
}

impl LlmClient {
    pub fn new(api_key: String) -> Result<Self, LlmError> {
        Ok(Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(120))
                .build()?,
            api_key,
        })
    }

    /// Makes a single call to the Claude API, returning the full response object.
    pub async fn call(
        &self,
        prompt: &str,
        attachments: &[DataUri],
        system: &str,
    ) -> Result<LlmResponse, LlmError> {
        let mut content: Vec<RequestBlock<'_>> =
            attachments.iter().map(RequestBlock::from_attachment).collect();
        content.push(RequestBlock::Text { text: prompt });

        let request_body = AnthropicRequest {
            model: MODEL,
            max_tokens: MAX_TOKENS,
            system,
            messages: vec![AnthropicMessage {
                role: "user",
                content,
            }],
        };

        let response = self
            .client
            .post(ANTHROPIC_API_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&request_body)
            .send()
            .await?;

        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("LLM API returned {}: {}", status, body);
            let message = serde_json::from_str::<AnthropicError>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let llm_response: LlmResponse = response.json().await?;

        debug!(
            "LLM call succeeded: input_tokens={}, output_tokens={}",
            llm_response.usage.input_tokens, llm_response.usage.output_tokens
        );

        Ok(llm_response)
    }

    /// Calls the LLM and deserializes the text response as JSON.
    /// The system prompt must instruct the model to return valid JSON.
    pub async fn call_json<T: DeserializeOwned>(
        &self,
        prompt: &str,
        attachments: &[DataUri],
        system: &str,
    ) -> Result<T, LlmError> {
        let response = self.call(prompt, attachments, system).await?;

        let text = response.text().ok_or(LlmError::EmptyContent)?;

        // Strip markdown code fences if the model wraps JSON in them
        let text = strip_json_fences(text);

        serde_json::from_str(text).map_err(LlmError::Parse)
    }
}

#[async_trait]
impl LanguageModel for LlmClient {
    async fn generate(&self, request: &ModelRequest) -> Result<Value, LlmError> {
        let system = prompts::structured_output_system(&request.system, &request.output_schema);
        self.call_json(&request.prompt, &request.attachments, &system)
            .await
    }
}

/// Strips ```json ... ``` or ``` ... ``` code fences from LLM output.
fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    if let Some(stripped) = text.strip_prefix("```json") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else if let Some(stripped) = text.strip_prefix("```") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_json_fences_with_json_tag() {
        let input = "```json\n{\"key\": \"value\"}\n```";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_strip_json_fences_without_tag() {
        let input = "```\n{\"key\": \"value\"}\n```";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_strip_json_fences_no_fences() {
        let input = "{\"key\": \"value\"}";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_attachment_blocks_pick_image_or_document() {
        let pdf = DataUri::parse("data:application/pdf;base64,JVBERi0xLjQ=").unwrap();
        let png = DataUri::parse("data:image/png;base64,iVBORw0KGgo=").unwrap();

        let pdf_block = serde_json::to_value(RequestBlock::from_attachment(&pdf)).unwrap();
        assert_eq!(pdf_block["type"], "document");
        assert_eq!(pdf_block["source"]["type"], "base64");
        assert_eq!(pdf_block["source"]["media_type"], "application/pdf");

        let png_block = serde_json::to_value(RequestBlock::from_attachment(&png)).unwrap();
        assert_eq!(png_block["type"], "image");
        assert_eq!(png_block["source"]["data"], "iVBORw0KGgo=");
    }

    #[test]
    fn test_text_block_shape() {
        let block = serde_json::to_value(RequestBlock::Text { text: "hi" }).unwrap();
        assert_eq!(block, serde_json::json!({"type": "text", "text": "hi"}));
    }

    #[test]
    fn test_malformed_output_classification() {
        assert!(LlmError::EmptyContent.is_malformed_output());
        let parse = serde_json::from_str::<Value>("not json").unwrap_err();
        assert!(LlmError::Parse(parse).is_malformed_output());
        assert!(!LlmError::Api {
            status: 529,
            message: "overloaded".into()
        }
        .is_malformed_output());
    }

    #[test]
    fn test_response_text_picks_first_text_block() {
        let response: LlmResponse = serde_json::from_value(serde_json::json!({
            "content": [
                {"type": "thinking", "text": null},
                {"type": "text", "text": "{\"ok\":true}"}
            ],
            "usage": {"input_tokens": 10, "output_tokens": 3}
        }))
        .unwrap();
        assert_eq!(response.text(), Some("{\"ok\":true}"));
    }
}
