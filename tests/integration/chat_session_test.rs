//! Chat Integration Tests
//!
//! Streaming replies, greetings, failures, and context refresh through the
//! chat commands.

use std::sync::Arc;

use politisight::models::chat::ChatRole;
use politisight::models::events::AppEvent;
use politisight::services::chat::CHAT_FAILURE_MESSAGE;
use politisight::storage::local::MemoryStore;
use politisight::{clear_chat, generate_report, get_chat_messages, send_chat_message};
use tokio::sync::mpsc;

use crate::support::{drain, response, state_with, ScriptedProvider, REPORT_JSON};

#[tokio::test]
async fn test_greeting_present_once() {
    let (state, _dir) = state_with(Arc::new(ScriptedProvider::new()), Arc::new(MemoryStore::new())).await;

    let messages = get_chat_messages(&state).await.data.unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].role, ChatRole::Model);
    assert!(messages[0].text.starts_with("Namaste"));

    state.sync_chat_context().await.unwrap();
    assert_eq!(get_chat_messages(&state).await.data.unwrap().len(), 1);
}

#[tokio::test]
async fn test_streamed_reply() {
    let provider = Arc::new(ScriptedProvider::new().with_reply(&["Hi", " there"]));
    let (state, _dir) = state_with(provider, Arc::new(MemoryStore::new())).await;
    let before = get_chat_messages(&state).await.data.unwrap().len();
    let (tx, mut rx) = mpsc::unbounded_channel();

    let messages = send_chat_message(&state, "hello", &tx).await.data.unwrap();
    assert_eq!(messages.len(), before + 2);
    assert_eq!(messages[before].role, ChatRole::User);
    assert_eq!(messages[before].text, "hello");
    assert_eq!(messages[before + 1].role, ChatRole::Model);
    assert_eq!(messages[before + 1].text, "Hi there");

    let events = drain(&mut rx);
    assert_eq!(events.first(), Some(&AppEvent::ChatMessageAppended { message: messages[before].clone() }));
    assert_eq!(events.last(), Some(&AppEvent::TypingChanged { typing: false }));
    assert!(events.iter().any(|e| matches!(
        e,
        AppEvent::ChatMessageUpdated { text, .. } if text == "Hi there"
    )));
}

#[tokio::test]
async fn test_failed_reply_appends_apology() {
    let (state, _dir) = state_with(Arc::new(ScriptedProvider::new()), Arc::new(MemoryStore::new())).await;

    let result = send_chat_message(&state, "hello", &()).await;
    assert!(result.success);
    let messages = result.data.unwrap();
    assert_eq!(messages.last().unwrap().text, CHAT_FAILURE_MESSAGE);
    assert_eq!(messages[messages.len() - 2].text, "hello");
}

#[tokio::test]
async fn test_blank_message_rejected() {
    let (state, _dir) = state_with(Arc::new(ScriptedProvider::new()), Arc::new(MemoryStore::new())).await;

    let result = send_chat_message(&state, "  ", &()).await;
    assert!(!result.success);
    assert_eq!(get_chat_messages(&state).await.data.unwrap().len(), 1);
}

#[tokio::test]
async fn test_new_report_refreshes_chat_context() {
    let provider = Arc::new(
        ScriptedProvider::new()
            .with_report(Ok(response(REPORT_JSON, vec![])))
            .with_reply(&["Sure."]),
    );
    let (state, _dir) = state_with(Arc::clone(&provider), Arc::new(MemoryStore::new())).await;

    generate_report(&state, "Maharashtra", &()).await.data.unwrap();
    send_chat_message(&state, "Who leads?", &()).await.data.unwrap();

    let instructions = provider.chat_instructions.lock().unwrap().clone();
    let instruction = instructions[0].clone().unwrap();
    assert!(instruction.contains("Maharashtra Assembly Outlook"));
    assert!(instruction.contains("BJP vote share rising"));
}

#[tokio::test]
async fn test_clear_restores_greeting() {
    let provider = Arc::new(ScriptedProvider::new().with_reply(&["Ok"]));
    let (state, _dir) = state_with(provider, Arc::new(MemoryStore::new())).await;
    send_chat_message(&state, "hello", &()).await.data.unwrap();

    let messages = clear_chat(&state).await.data.unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].role, ChatRole::Model);
}
