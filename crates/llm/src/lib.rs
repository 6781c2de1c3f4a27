//! PolitiSight LLM
//!
//! Provider abstraction over generative model backends. Ships the Gemini
//! provider (structured JSON output, Google Search grounding, SSE streaming),
//! its stream adapter, and the HTTP client factory.

pub mod gemini;
pub mod http_client;
pub mod provider;
pub mod streaming_adapters;
pub mod types;

// Re-export main types
pub use gemini::GeminiProvider;
pub use http_client::build_http_client;
pub use provider::LlmProvider;
pub use types::*;

pub use streaming_adapters::GeminiAdapter;
