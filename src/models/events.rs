//! Application Events
//!
//! Notifications pushed to the front end while long-running commands work.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::models::chat::ChatMessage;
use crate::models::search::SearchStage;

/// Event emitted by commands and services.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AppEvent {
    /// Report generation moved to a new stage
    StageChanged { stage: SearchStage },
    /// A report finished generating and was stored
    ReportReady { report_id: String, title: String },
    /// A chat message was added to the list
    ChatMessageAppended { message: ChatMessage },
    /// The in-progress assistant message grew; `text` is the full text so far
    ChatMessageUpdated { id: String, text: String },
    /// The assistant started or stopped typing
    TypingChanged { typing: bool },
}

/// Receiver of application events.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: AppEvent);
}

/// Discards every event
impl EventSink for () {
    fn emit(&self, _event: AppEvent) {}
}

/// Forwards events to a channel; a closed receiver is ignored
impl EventSink for mpsc::UnboundedSender<AppEvent> {
    fn emit(&self, event: AppEvent) {
        let _ = self.send(event);
    }
}
