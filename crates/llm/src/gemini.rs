//! Gemini Provider
//!
//! Implementation of the LlmProvider trait for the Google Generative Language
//! REST API (`generateContent` / `streamGenerateContent`). Supports structured
//! JSON output via `responseSchema` and grounding with the `googleSearch` tool.

use async_trait::async_trait;
use futures_util::StreamExt;
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{debug, instrument, warn};

use super::provider::{missing_api_key_error, parse_http_error, LlmProvider};
use super::types::{
    LlmError, LlmRequestOptions, LlmResponse, LlmResult, Message, MessageRole, ProviderConfig,
    StopReason, UsageStats,
};
use crate::http_client::build_http_client;
use crate::streaming_adapters::GeminiAdapter;
use politisight_core::report::GroundingSource;
use politisight_core::streaming::{StreamAdapter, UnifiedStreamEvent};

/// Default Generative Language API endpoint
const GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Gemini provider
pub struct GeminiProvider {
    config: ProviderConfig,
    client: reqwest::Client,
}

impl GeminiProvider {
    /// Create a new Gemini provider with the given configuration
    pub fn new(config: ProviderConfig) -> LlmResult<Self> {
        let client = build_http_client(config.proxy.as_ref())?;
        Ok(Self { config, client })
    }

    /// Get the API base URL
    fn base_url(&self) -> &str {
        self.config
            .base_url
            .as_deref()
            .unwrap_or(GEMINI_API_URL)
            .trim_end_matches('/')
    }

    fn endpoint(&self, model: &str, stream: bool) -> String {
        let method = if stream {
            "streamGenerateContent?alt=sse"
        } else {
            "generateContent"
        };
        format!("{}/models/{}:{}", self.base_url(), model, method)
    }

    fn api_key(&self) -> LlmResult<&str> {
        self.config
            .api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| missing_api_key_error("gemini"))
    }

    /// Whether `model` accepts a response schema while a tool is enabled.
    ///
    /// Gemini 2.x rejects `responseMimeType: application/json` together with
    /// `googleSearch`; for those models the schema travels in the system
    /// instruction instead.
    fn schema_with_tools_supported(model: &str) -> bool {
        let model = model.to_lowercase();
        !(model.starts_with("gemini-1") || model.starts_with("gemini-2"))
    }

    /// Build the request body for the API
    fn build_request_body(
        &self,
        model: &str,
        messages: &[Message],
        system: Option<&str>,
        request_options: &LlmRequestOptions,
    ) -> serde_json::Value {
        let contents: Vec<serde_json::Value> = messages
            .iter()
            .map(|m| {
                let role = match m.role {
                    MessageRole::User => "user",
                    MessageRole::Assistant => "model",
                };
                serde_json::json!({ "role": role, "parts": [{ "text": m.content }] })
            })
            .collect();

        let mut generation_config = serde_json::json!({
            "temperature": request_options
                .temperature_override
                .unwrap_or(self.config.temperature),
            "maxOutputTokens": self.config.max_tokens,
        });

        let mut system_text = system.map(|s| s.to_string());

        if let Some(schema) = &request_options.response_schema {
            if !request_options.enable_search || Self::schema_with_tools_supported(model) {
                generation_config["responseMimeType"] = serde_json::json!("application/json");
                generation_config["responseSchema"] = serde_json::json!(schema);
            } else {
                let schema_json = serde_json::to_string(schema).unwrap_or_default();
                let instruction = format!(
                    "Respond with a single JSON object and nothing else. \
                     It must conform to this schema:\n{}",
                    schema_json
                );
                system_text = Some(match system_text {
                    Some(s) => format!("{}\n\n{}", s, instruction),
                    None => instruction,
                });
            }
        }

        let mut body = serde_json::json!({
            "contents": contents,
            "generationConfig": generation_config,
        });

        if let Some(sys) = system_text {
            body["systemInstruction"] = serde_json::json!({ "parts": [{ "text": sys }] });
        }

        if request_options.enable_search {
            body["tools"] = serde_json::json!([{ "googleSearch": {} }]);
        }

        body
    }

    /// Parse a complete response from the API
    fn parse_response(&self, response: &GenerateContentResponse, model: &str) -> LlmResult<LlmResponse> {
        if let Some(reason) = response.block_reason() {
            return Err(LlmError::Blocked {
                reason: reason.to_string(),
            });
        }

        let text = response.text();
        Ok(LlmResponse {
            content: if text.is_empty() { None } else { Some(text) },
            grounding: response.grounding_sources(),
            stop_reason: response
                .finish_reason()
                .map(StopReason::from)
                .unwrap_or(StopReason::EndTurn),
            usage: response.usage(),
            model: response
                .model_version
                .clone()
                .unwrap_or_else(|| model.to_string()),
        })
    }

    async fn post(&self, url: &str, api_key: &str, body: &serde_json::Value) -> LlmResult<reqwest::Response> {
        let response = self
            .client
            .post(url)
            .header("x-goog-api-key", api_key)
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| LlmError::NetworkError {
                message: e.to_string(),
            })?;

        let status = response.status().as_u16();
        if status != 200 {
            let body_text = response.text().await.unwrap_or_default();
            return Err(parse_http_error(status, &body_text, "gemini"));
        }
        Ok(response)
    }
}

/// Remove the first complete line from `buffer` and decode it.
///
/// Returns `None` until a newline has arrived.
fn take_line(buffer: &mut Vec<u8>) -> LlmResult<Option<String>> {
    let Some(line_end) = buffer.iter().position(|&b| b == b'\n') else {
        return Ok(None);
    };
    let rest = buffer.split_off(line_end + 1);
    let mut line = std::mem::replace(buffer, rest);
    line.truncate(line_end);
    String::from_utf8(line)
        .map(Some)
        .map_err(|e| LlmError::ParseError {
            message: format!("stream line is not valid UTF-8: {}", e),
        })
}

#[async_trait]
impl LlmProvider for GeminiProvider {
    fn name(&self) -> &'static str {
        "gemini"
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    fn has_credential(&self) -> bool {
        self.api_key().is_ok()
    }

    fn supports_native_search(&self) -> bool {
        true
    }

    #[instrument(skip(self, messages, system, request_options), fields(provider = "gemini"))]
    async fn send_message(
        &self,
        messages: Vec<Message>,
        system: Option<String>,
        request_options: LlmRequestOptions,
    ) -> LlmResult<LlmResponse> {
        let api_key = self.api_key()?;
        let model = request_options
            .model_override
            .clone()
            .unwrap_or_else(|| self.config.model.clone());

        let body = self.build_request_body(&model, &messages, system.as_deref(), &request_options);
        debug!(model = %model, search = request_options.enable_search, "gemini: generateContent");

        let response = self.post(&self.endpoint(&model, false), api_key, &body).await?;
        let body_text = response.text().await.map_err(|e| LlmError::NetworkError {
            message: e.to_string(),
        })?;

        let parsed: GenerateContentResponse =
            serde_json::from_str(&body_text).map_err(|e| LlmError::ParseError {
                message: format!("Failed to parse response: {}", e),
            })?;

        self.parse_response(&parsed, &model)
    }

    #[instrument(skip(self, messages, system, tx, request_options), fields(provider = "gemini"))]
    async fn stream_message(
        &self,
        messages: Vec<Message>,
        system: Option<String>,
        tx: mpsc::Sender<UnifiedStreamEvent>,
        request_options: LlmRequestOptions,
    ) -> LlmResult<LlmResponse> {
        let api_key = self.api_key()?;
        let model = request_options
            .model_override
            .clone()
            .unwrap_or_else(|| self.config.model.clone());

        let body = self.build_request_body(&model, &messages, system.as_deref(), &request_options);
        debug!(model = %model, turns = messages.len(), "gemini: streamGenerateContent");

        let response = self.post(&self.endpoint(&model, true), api_key, &body).await?;

        let mut adapter = GeminiAdapter::new();
        let mut accumulated_content = String::new();
        let mut grounding = Vec::new();
        let mut usage = UsageStats::default();
        let mut stop_reason = StopReason::EndTurn;

        let mut stream = response.bytes_stream();
        let mut buffer: Vec<u8> = Vec::new();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| LlmError::NetworkError {
                message: e.to_string(),
            })?;

            buffer.extend_from_slice(&chunk);

            // Decode only complete lines; a code point may span two chunks
            while let Some(line) = take_line(&mut buffer)? {
                if line.trim().is_empty() {
                    continue;
                }

                let events = adapter.adapt(&line).map_err(|e| LlmError::ParseError {
                    message: e.to_string(),
                })?;

                for event in events {
                    match &event {
                        UnifiedStreamEvent::TextDelta { content } => {
                            accumulated_content.push_str(content);
                        }
                        UnifiedStreamEvent::GroundingCitations { sources } => {
                            grounding.extend(sources.iter().cloned());
                        }
                        UnifiedStreamEvent::Usage {
                            input_tokens,
                            output_tokens,
                            thinking_tokens,
                        } => {
                            usage.input_tokens = *input_tokens;
                            usage.output_tokens = *output_tokens;
                            usage.thinking_tokens = *thinking_tokens;
                        }
                        UnifiedStreamEvent::Complete {
                            stop_reason: Some(reason),
                        } => {
                            stop_reason = StopReason::from(reason.as_str());
                        }
                        UnifiedStreamEvent::Error { message, code } => {
                            warn!(code = ?code, "gemini: error inside stream");
                            return Err(match code.as_deref() {
                                Some("blocked") => LlmError::Blocked {
                                    reason: message.clone(),
                                },
                                _ => LlmError::ServerError {
                                    message: message.clone(),
                                    status: None,
                                },
                            });
                        }
                        _ => {}
                    }

                    if matches!(
                        &event,
                        UnifiedStreamEvent::TextDelta { .. }
                            | UnifiedStreamEvent::GroundingCitations { .. }
                    ) && tx.send(event).await.is_err()
                    {
                        return Err(LlmError::Other {
                            message: "stream receiver dropped".to_string(),
                        });
                    }
                }
            }
        }

        Ok(LlmResponse {
            content: if accumulated_content.is_empty() {
                None
            } else {
                Some(accumulated_content)
            },
            grounding,
            stop_reason,
            usage,
            model,
        })
    }

    async fn health_check(&self) -> LlmResult<()> {
        let api_key = self.api_key()?;
        let url = format!("{}/models/{}", self.base_url(), self.config.model);

        let response = self
            .client
            .get(url)
            .header("x-goog-api-key", api_key)
            .send()
            .await
            .map_err(|e| LlmError::NetworkError {
                message: e.to_string(),
            })?;

        let status = response.status().as_u16();
        if status == 200 {
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(parse_http_error(status, &body, "gemini"))
        }
    }

    fn config(&self) -> &ProviderConfig {
        &self.config
    }
}

// ============================================================================
// Wire format
// ============================================================================

/// `GenerateContentResponse`, also the payload of each SSE chunk.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    #[serde(default)]
    pub usage_metadata: Option<UsageMetadata>,
    #[serde(default)]
    pub prompt_feedback: Option<PromptFeedback>,
    #[serde(default)]
    pub model_version: Option<String>,
    #[serde(default)]
    pub error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Candidate {
    #[serde(default)]
    pub content: Option<CandidateContent>,
    #[serde(default)]
    pub finish_reason: Option<String>,
    #[serde(default)]
    pub grounding_metadata: Option<GroundingMetadata>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CandidateContent {
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Part {
    #[serde(default)]
    pub text: Option<String>,
    /// Thought summaries are not part of the answer.
    #[serde(default)]
    pub thought: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GroundingMetadata {
    #[serde(default)]
    pub grounding_chunks: Vec<GroundingChunk>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GroundingChunk {
    #[serde(default)]
    pub web: Option<WebChunk>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WebChunk {
    #[serde(default)]
    pub uri: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct UsageMetadata {
    #[serde(default)]
    pub prompt_token_count: u32,
    #[serde(default)]
    pub candidates_token_count: u32,
    #[serde(default)]
    pub thoughts_token_count: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PromptFeedback {
    #[serde(default)]
    pub block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiError {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub status: Option<String>,
}

impl GenerateContentResponse {
    /// Concatenated answer text of the first candidate.
    pub fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter(|p| !p.thought)
                    .filter_map(|p| p.text.as_deref())
                    .collect::<String>()
            })
            .unwrap_or_default()
    }

    /// Web grounding chunks in provider order. Missing titles fall back to the URI.
    pub fn grounding_sources(&self) -> Vec<GroundingSource> {
        self.candidates
            .iter()
            .filter_map(|c| c.grounding_metadata.as_ref())
            .flat_map(|m| m.grounding_chunks.iter())
            .filter_map(|chunk| chunk.web.as_ref())
            .filter_map(|web| {
                let uri = web.uri.clone()?;
                let title = web.title.clone().unwrap_or_else(|| uri.clone());
                Some(GroundingSource { title, uri })
            })
            .collect()
    }

    pub fn finish_reason(&self) -> Option<&str> {
        self.candidates
            .first()
            .and_then(|c| c.finish_reason.as_deref())
    }

    pub fn block_reason(&self) -> Option<&str> {
        self.prompt_feedback
            .as_ref()
            .and_then(|f| f.block_reason.as_deref())
    }

    pub fn usage(&self) -> UsageStats {
        self.usage_metadata
            .as_ref()
            .map(|u| UsageStats {
                input_tokens: u.prompt_token_count,
                output_tokens: u.candidates_token_count,
                thinking_tokens: u.thoughts_token_count,
            })
            .unwrap_or_default()
    }
}
