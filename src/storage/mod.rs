//! Storage Layer
//!
//! Handles all data persistence: the JSON config file and the local
//! key-value store that holds report history.

pub mod config;
pub mod local;

pub use config::*;
pub use local::*;
