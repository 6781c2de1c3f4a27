//! Data Models
//!
//! Data structures shared by commands, services, and the front end.

pub mod chat;
pub mod events;
pub mod response;
pub mod search;
pub mod settings;

pub use chat::*;
pub use events::*;
pub use response::*;
pub use search::*;
pub use settings::*;
