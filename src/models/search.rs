//! Search State
//!
//! Ephemeral progress state for one report generation request. Never persisted.

use serde::{Deserialize, Serialize};

/// Coarse progress label shown while a report is generated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchStage {
    #[default]
    Idle,
    Researching,
    Analyzing,
    Formatting,
    Complete,
}

impl SearchStage {
    /// Human-readable label for progress display
    pub fn label(self) -> &'static str {
        match self {
            SearchStage::Idle => "Idle",
            SearchStage::Researching => "Researching latest developments",
            SearchStage::Analyzing => "Analyzing political data",
            SearchStage::Formatting => "Formatting report",
            SearchStage::Complete => "Complete",
        }
    }
}

/// Progress of the current generation request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchState {
    pub is_searching: bool,
    pub stage: SearchStage,
    pub query: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SearchState {
    /// Start a new request, clearing any previous error
    pub fn begin(&mut self, query: impl Into<String>) {
        *self = Self {
            is_searching: true,
            stage: SearchStage::Researching,
            query: query.into(),
            error: None,
        };
    }

    /// Move to `stage` if a request is running
    pub fn advance(&mut self, stage: SearchStage) {
        if self.is_searching {
            self.stage = stage;
        }
    }

    pub fn complete(&mut self) {
        self.is_searching = false;
        self.stage = SearchStage::Complete;
    }

    /// End the request with a user-facing error, back at idle
    pub fn fail(&mut self, message: impl Into<String>) {
        self.is_searching = false;
        self.stage = SearchStage::Idle;
        self.error = Some(message.into());
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
