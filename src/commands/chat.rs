//! Chat Commands
//!
//! Send messages to the assistant and read or reset the conversation.

use crate::models::chat::ChatMessage;
use crate::models::events::EventSink;
use crate::models::response::CommandResponse;
use crate::services::chat::drive_reply;
use crate::state::AppState;

/// Send `text` and stream the reply into the message list.
///
/// Resolves once the reply is complete. A failed reply is not an error
/// response: the apology message is already in the list.
pub async fn send_chat_message(
    state: &AppState,
    text: &str,
    sink: &dyn EventSink,
) -> CommandResponse<Vec<ChatMessage>> {
    let manager = match state.chat_manager().await {
        Ok(manager) => manager,
        Err(e) => return CommandResponse::err(e.user_message()),
    };

    let pending = match manager.lock().await.begin_send(text) {
        Ok(pending) => pending,
        Err(e) => return CommandResponse::err(e.to_string()),
    };

    // A failed reply has already left an apology in the list
    let _ = drive_reply(&manager, pending, sink).await;

    let messages = manager.lock().await.messages().to_vec();
    CommandResponse::ok(messages)
}

/// Current chat messages, oldest first
pub async fn get_chat_messages(state: &AppState) -> CommandResponse<Vec<ChatMessage>> {
    match state.chat_manager().await {
        Ok(manager) => CommandResponse::ok(manager.lock().await.messages().to_vec()),
        Err(e) => CommandResponse::err(e.user_message()),
    }
}

/// Start a fresh conversation
pub async fn clear_chat(state: &AppState) -> CommandResponse<Vec<ChatMessage>> {
    match state.chat_manager().await {
        Ok(manager) => {
            let mut manager = manager.lock().await;
            manager.clear();
            CommandResponse::ok(manager.messages().to_vec())
        }
        Err(e) => CommandResponse::err(e.user_message()),
    }
}
