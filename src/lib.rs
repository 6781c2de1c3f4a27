//! PolitiSight - Rust Backend Library
//!
//! Generates structured political-analysis reports with a search-grounded
//! Gemini model, keeps them in a local history, and runs a streaming chat
//! assistant that knows about the report on screen.
//! It includes:
//! - Command handlers for the front end
//! - Report generation, chat, and history services
//! - Storage layer (config file, key-value store)
//! - Data models, terminal rendering, and utilities

pub mod commands;
pub mod models;
pub mod render;
pub mod services;
pub mod state;
pub mod storage;
pub mod utils;

pub use commands::{
    // Report commands
    generate_report,
    // History commands
    delete_report, list_history, view_report,
    // Chat commands
    clear_chat, get_chat_messages, send_chat_message,
    // Settings commands
    get_settings, update_settings,
    // Health commands
    get_health,
};
pub use models::response::*;
pub use models::settings::{AppConfig, SettingsUpdate};
pub use state::AppState;
pub use utils::error::{AppError, AppResult};
