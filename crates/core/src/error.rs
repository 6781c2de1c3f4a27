//! Core Error Types
//!
//! Foundational error type shared by the PolitiSight workspace crates.
//! Kept dependency-free (thiserror + serde_json only) so the schema contract
//! can be used without pulling in the network or storage stack.
//!
//! The application crate maps these into its own generation errors.

use thiserror::Error;

/// Core error type for the PolitiSight workspace.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    /// A value that parsed but violates the report contract
    #[error("Validation error: {0}")]
    Validation(String),

    /// Model output that could not be turned into a report
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Result type alias for core errors
pub type CoreResult<T> = Result<T, CoreError>;

impl CoreError {
    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a parse error
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }
}

impl From<CoreError> for String {
    fn from(err: CoreError) -> String {
        err.to_string()
    }
}
