//! LLM Provider Trait
//!
//! Defines the common interface for generative model providers.

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::types::{LlmError, LlmRequestOptions, LlmResponse, LlmResult, Message, ProviderConfig};
use politisight_core::streaming::UnifiedStreamEvent;

/// Trait that all model providers must implement.
///
/// Provides a unified interface for:
/// - Single request/response generation (send_message)
/// - Streaming generation (stream_message)
/// - Health checking
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Returns the provider name for identification.
    fn name(&self) -> &'static str;

    /// Returns the current model being used.
    fn model(&self) -> &str;

    /// Whether an API credential is configured.
    ///
    /// Absence is not an error until a request is made.
    fn has_credential(&self) -> bool {
        true
    }

    /// Returns whether this provider can ground answers with native web search.
    fn supports_native_search(&self) -> bool {
        false
    }

    /// Send a conversation and get a complete response.
    ///
    /// # Arguments
    /// * `messages` - Conversation history, oldest first
    /// * `system` - Optional system instruction
    /// * `request_options` - Schema, search, and sampling overrides
    async fn send_message(
        &self,
        messages: Vec<Message>,
        system: Option<String>,
        request_options: LlmRequestOptions,
    ) -> LlmResult<LlmResponse>;

    /// Stream a response via a channel.
    ///
    /// Text deltas are forwarded on `tx` in arrival order. The returned
    /// response carries the accumulated text once the stream ends.
    async fn stream_message(
        &self,
        messages: Vec<Message>,
        system: Option<String>,
        tx: mpsc::Sender<UnifiedStreamEvent>,
        request_options: LlmRequestOptions,
    ) -> LlmResult<LlmResponse>;

    /// Check if the provider is reachable and the key is accepted.
    async fn health_check(&self) -> LlmResult<()>;

    /// Get the configuration for this provider.
    fn config(&self) -> &ProviderConfig;
}

/// Helper function to create an error for missing API key
pub fn missing_api_key_error(provider: &str) -> LlmError {
    LlmError::MissingApiKey {
        provider: provider.to_string(),
    }
}

/// Helper function to parse HTTP error status codes
pub fn parse_http_error(status: u16, body: &str, provider: &str) -> LlmError {
    let message = extract_error_message(body).unwrap_or_else(|| body.to_string());
    match status {
        401 => LlmError::AuthenticationFailed {
            message: format!("{}: Invalid API key", provider),
        },
        403 => LlmError::AuthenticationFailed {
            message: format!("{}: Access denied ({})", provider, message),
        },
        404 => LlmError::ModelNotFound { model: message },
        429 => LlmError::RateLimited {
            message,
            retry_after: None,
        },
        400 => {
            // Gemini reports a bad key as 400 INVALID_ARGUMENT
            if message.contains("API key not valid") {
                LlmError::AuthenticationFailed {
                    message: format!("{}: Invalid API key", provider),
                }
            } else {
                LlmError::InvalidRequest { message }
            }
        }
        500..=599 => LlmError::ServerError {
            message,
            status: Some(status),
        },
        _ => LlmError::Other {
            message: format!("HTTP {}: {}", status, message),
        },
    }
}

/// Pull `error.message` out of a Google-style JSON error body.
fn extract_error_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value["error"]["message"].as_str().map(|s| s.to_string())
}
