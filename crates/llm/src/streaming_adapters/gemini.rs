//! Gemini SSE Stream Adapter
//!
//! `streamGenerateContent?alt=sse` emits one `data:` line per chunk, each a
//! complete `GenerateContentResponse`. Usage metadata is cumulative, so the
//! last `Usage` event wins. Grounding chunks usually arrive with the final
//! chunk but may be split across several.

use politisight_core::streaming::{AdapterError, StreamAdapter, UnifiedStreamEvent};

use crate::gemini::GenerateContentResponse;

/// Adapter for the Gemini SSE format
#[derive(Debug, Default)]
pub struct GeminiAdapter {
    completed: bool,
}

impl GeminiAdapter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StreamAdapter for GeminiAdapter {
    fn provider_name(&self) -> &'static str {
        "gemini"
    }

    fn adapt(&mut self, input: &str) -> Result<Vec<UnifiedStreamEvent>, AdapterError> {
        let trimmed = input.trim();

        // SSE comments and non-data fields carry nothing for us
        if trimmed.is_empty() || trimmed.starts_with(':') {
            return Ok(vec![]);
        }
        let json_str = match trimmed.strip_prefix("data:") {
            Some(rest) => rest.trim_start(),
            None if trimmed.starts_with('{') => trimmed,
            None => return Ok(vec![]),
        };
        if json_str.is_empty() || json_str == "[DONE]" {
            return Ok(vec![]);
        }

        let chunk: GenerateContentResponse =
            serde_json::from_str(json_str).map_err(|e| AdapterError::ParseError(e.to_string()))?;

        if let Some(error) = chunk.error {
            return Ok(vec![UnifiedStreamEvent::Error {
                message: error.message,
                code: error.status,
            }]);
        }

        if let Some(reason) = chunk.block_reason() {
            return Ok(vec![UnifiedStreamEvent::Error {
                message: reason.to_string(),
                code: Some("blocked".to_string()),
            }]);
        }

        let mut events = vec![];

        let text = chunk.text();
        if !text.is_empty() {
            events.push(UnifiedStreamEvent::TextDelta { content: text });
        }

        let sources = chunk.grounding_sources();
        if !sources.is_empty() {
            events.push(UnifiedStreamEvent::GroundingCitations { sources });
        }

        if chunk.usage_metadata.is_some() {
            let usage = chunk.usage();
            events.push(UnifiedStreamEvent::Usage {
                input_tokens: usage.input_tokens,
                output_tokens: usage.output_tokens,
                thinking_tokens: usage.thinking_tokens,
            });
        }

        if let Some(reason) = chunk.finish_reason() {
            if !self.completed {
                self.completed = true;
                events.push(UnifiedStreamEvent::Complete {
                    stop_reason: Some(reason.to_string()),
                });
            }
        }

        Ok(events)
    }

    fn reset(&mut self) {
        self.completed = false;
    }
}
