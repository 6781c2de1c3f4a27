//! Error Handling
//!
//! Unified error types for the application.
//! Uses thiserror for ergonomic error definitions.

use politisight_llm::LlmError;
use thiserror::Error;

/// Application-wide error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Not found errors
    #[error("Not found: {0}")]
    NotFound(String),

    /// Model provider errors
    #[error("Provider error: {0}")]
    Provider(#[from] LlmError),

    /// Report generation errors
    #[error(transparent)]
    Generation(#[from] GenerationError),

    /// Chat errors
    #[error(transparent)]
    Chat(#[from] ChatError),

    /// Generic internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for application errors
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a not found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Text safe to show to the user.
    ///
    /// Generation failures collapse to a retry prompt; everything else keeps
    /// its message.
    pub fn user_message(&self) -> String {
        match self {
            AppError::Generation(e) => e.user_message(),
            other => other.to_string(),
        }
    }
}

/// Convert AppError to a string suitable for command responses
impl From<AppError> for String {
    fn from(err: AppError) -> String {
        err.user_message()
    }
}

/// Failure of a single report generation request.
///
/// None of these are retried automatically.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GenerationError {
    /// No API credential configured. Fatal until the user configures one.
    #[error("Missing API credential: {0}")]
    MissingCredential(String),

    /// The model answered with no usable text
    #[error("The model returned an empty response")]
    EmptyResponse,

    /// The answer did not parse as a report, or failed validation
    #[error("Failed to parse report: {0}")]
    Parse(String),

    /// Transport, HTTP, or provider-side failure
    #[error("Request failed: {0}")]
    Network(String),
}

impl GenerationError {
    /// Message shown to the user.
    pub fn user_message(&self) -> String {
        match self {
            GenerationError::MissingCredential(_) => {
                "API key is not configured. Set GEMINI_API_KEY and try again.".to_string()
            }
            _ => "Failed to generate the report. Please try again.".to_string(),
        }
    }
}

impl From<LlmError> for GenerationError {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::MissingApiKey { provider } => {
                GenerationError::MissingCredential(format!("no API key for {}", provider))
            }
            LlmError::Blocked { .. } => GenerationError::EmptyResponse,
            LlmError::ParseError { message } => GenerationError::Parse(message),
            other => GenerationError::Network(other.to_string()),
        }
    }
}

/// Failure while sending a chat message.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ChatError {
    /// A reply is still streaming; only one send may be outstanding
    #[error("A reply is already in progress")]
    Busy,

    #[error("Message is empty")]
    EmptyMessage,

    /// No session has been created yet
    #[error("Chat session is not initialized")]
    NoSession,

    /// The streamed call failed before or during the reply
    #[error("Chat stream failed: {0}")]
    Stream(String),
}

impl From<LlmError> for ChatError {
    fn from(err: LlmError) -> Self {
        ChatError::Stream(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AppError::config("model must not be empty");
        assert_eq!(err.to_string(), "Configuration error: model must not be empty");
    }

    #[test]
    fn test_error_conversion() {
        let err = AppError::validation("topic is empty");
        let msg: String = err.into();
        assert!(msg.contains("Validation error"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let app_err: AppError = io_err.into();
        assert!(matches!(app_err, AppError::Io(_)));
    }

    #[test]
    fn test_generation_error_mapping() {
        let err: GenerationError = LlmError::MissingApiKey {
            provider: "gemini".to_string(),
        }
        .into();
        assert!(matches!(err, GenerationError::MissingCredential(_)));
        assert!(err.user_message().contains("GEMINI_API_KEY"));

        let err: GenerationError = LlmError::NetworkError {
            message: "connection reset".to_string(),
        }
        .into();
        assert!(matches!(err, GenerationError::Network(_)));
        assert_eq!(
            err.user_message(),
            "Failed to generate the report. Please try again."
        );

        let err: GenerationError = LlmError::RateLimited {
            message: "quota".to_string(),
            retry_after: None,
        }
        .into();
        assert!(matches!(err, GenerationError::Network(_)));

        let err: GenerationError = LlmError::Blocked {
            reason: "SAFETY".to_string(),
        }
        .into();
        assert_eq!(err, GenerationError::EmptyResponse);
    }

    #[test]
    fn test_generation_errors_hide_details_from_user() {
        let app_err: AppError = GenerationError::Parse("expected value at line 1".to_string()).into();
        let msg: String = app_err.into();
        assert!(!msg.contains("line 1"));
    }
}
