//! Services
//!
//! Business logic services for the application.
//! Services handle the core functionality and are called by commands.

pub mod chat;
pub mod history;
pub mod prompt;
pub mod report_generator;

pub use chat::{drive_reply, ChatSession, ChatSessionManager, PendingReply, ReplyStream};
pub use history::{HistoryEntry, HistoryStore, HISTORY_KEY};
pub use report_generator::{GeneratorOptions, ReportGenerator};
