//! Commands
//!
//! Front-end entry points. Every command takes the application state and
//! returns a `CommandResponse`; failures become user-readable text.

pub mod chat;
pub mod health;
pub mod history;
pub mod report;
pub mod settings;

pub use chat::{clear_chat, get_chat_messages, send_chat_message};
pub use health::get_health;
pub use history::{delete_report, list_history, view_report};
pub use report::generate_report;
pub use settings::{get_settings, update_settings};
