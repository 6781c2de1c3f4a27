//! Chat Sessions
//!
//! `ChatSession` is one conversational context with the model: a fixed system
//! instruction plus the transcript of completed turns. Each `send` runs on a
//! spawned task that forwards text deltas through a channel and can be
//! cancelled with the session.
//!
//! `ChatSessionManager` owns the displayed message list and decides when the
//! underlying session must be rebuilt. Every reply is tagged with an epoch;
//! deltas or completions carrying anything but the in-flight epoch are
//! dropped, so a reply abandoned by a context change can never touch the list.

use std::sync::Arc;

use futures_util::StreamExt;
use politisight_core::{Report, UnifiedStreamEvent};
use politisight_llm::{LlmError, LlmProvider, LlmRequestOptions, LlmResult, Message};
use tokio::sync::{mpsc, Mutex};
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::models::chat::ChatMessage;
use crate::models::events::{AppEvent, EventSink};
use crate::services::prompt::{build_chat_context, chat_greeting, chat_system_instruction};
use crate::utils::error::ChatError;

/// Assistant message appended when a reply fails
pub const CHAT_FAILURE_MESSAGE: &str =
    "Sorry, I couldn't respond just now. Please try sending your message again.";

const REPLY_CHANNEL_CAPACITY: usize = 64;

/// Ordered text deltas of one reply. Ends after the last delta, or after a
/// single `Err` item if the call failed.
pub type ReplyStream = ReceiverStream<LlmResult<String>>;

// ============================================================================
// Session
// ============================================================================

/// One conversational context with the model.
pub struct ChatSession {
    id: String,
    provider: Arc<dyn LlmProvider>,
    system_instruction: String,
    options: LlmRequestOptions,
    /// Completed user/model turns, oldest first
    transcript: Arc<Mutex<Vec<Message>>>,
    cancel: CancellationToken,
}

impl ChatSession {
    pub fn new(provider: Arc<dyn LlmProvider>, context: &str, options: LlmRequestOptions) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            provider,
            system_instruction: chat_system_instruction(context),
            options,
            transcript: Arc::new(Mutex::new(Vec::new())),
            cancel: CancellationToken::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn system_instruction(&self) -> &str {
        &self.system_instruction
    }

    pub async fn transcript(&self) -> Vec<Message> {
        self.transcript.lock().await.clone()
    }

    /// Abort any reply still running for this session
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Send `text` and stream the reply.
    ///
    /// The user and model turns join the transcript only when the reply
    /// completes successfully. Must be called within a Tokio runtime.
    pub fn send(&self, text: &str) -> ReplyStream {
        let (out_tx, out_rx) = mpsc::channel(REPLY_CHANNEL_CAPACITY);

        let provider = Arc::clone(&self.provider);
        let transcript = Arc::clone(&self.transcript);
        let system = self.system_instruction.clone();
        let options = self.options.clone();
        let cancel = self.cancel.child_token();
        let session_id = self.id.clone();
        let text = text.to_string();

        tokio::spawn(async move {
            let mut messages = transcript.lock().await.clone();
            messages.push(Message::user(text.clone()));

            let (event_tx, mut event_rx) = mpsc::channel::<UnifiedStreamEvent>(REPLY_CHANNEL_CAPACITY);
            let delta_tx = out_tx.clone();
            let forward = async move {
                while let Some(event) = event_rx.recv().await {
                    if let UnifiedStreamEvent::TextDelta { content } = event {
                        if delta_tx.send(Ok(content)).await.is_err() {
                            break;
                        }
                    }
                }
            };
            let request = provider.stream_message(messages, Some(system), event_tx, options);
            let work = async move { tokio::join!(request, forward).0 };

            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!(session_id = %session_id, "chat: reply cancelled");
                }
                result = work => {
                    let outcome = result.and_then(|response| {
                        response.text().map(str::to_string).ok_or_else(|| LlmError::Other {
                            message: "model returned an empty reply".to_string(),
                        })
                    });
                    match outcome {
                        Ok(reply) => {
                            let mut transcript = transcript.lock().await;
                            transcript.push(Message::user(text));
                            transcript.push(Message::assistant(reply));
                        }
                        Err(e) => {
                            warn!(session_id = %session_id, error = %e, "chat: reply failed");
                            let _ = out_tx.send(Err(e)).await;
                        }
                    }
                }
            }
        });

        ReceiverStream::new(out_rx)
    }
}

impl Drop for ChatSession {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

// ============================================================================
// Manager
// ============================================================================

/// What a session was built for. A change in either part rebuilds it.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ContextKey {
    active_report: Option<String>,
    history_len: usize,
}

/// A reply that has been requested but not yet consumed.
pub struct PendingReply {
    pub epoch: u64,
    pub user_message: ChatMessage,
    pub stream: ReplyStream,
}

/// Chat state machine behind the chat panel.
pub struct ChatSessionManager {
    provider: Arc<dyn LlmProvider>,
    options: LlmRequestOptions,
    session: Option<ChatSession>,
    context_key: Option<ContextKey>,
    context: String,
    greeting: String,
    messages: Vec<ChatMessage>,
    typing: bool,
    epoch: u64,
    in_flight: Option<u64>,
    /// Id of the assistant message the in-flight reply is growing
    placeholder: Option<String>,
}

impl ChatSessionManager {
    pub fn new(provider: Arc<dyn LlmProvider>, options: LlmRequestOptions) -> Self {
        Self {
            provider,
            options,
            session: None,
            context_key: None,
            context: String::new(),
            greeting: chat_greeting(None),
            messages: Vec::new(),
            typing: false,
            epoch: 0,
            in_flight: None,
            placeholder: None,
        }
    }

    /// Rebuild the session if the active report or the history length changed.
    ///
    /// Returns whether a new session was created. Reordering history without
    /// changing its length does not count as a change.
    pub fn sync_context(&mut self, active: Option<&Report>, history: &[Report]) -> bool {
        let key = ContextKey {
            active_report: active.map(|r| r.id.clone()),
            history_len: history.len(),
        };
        if self.session.is_some() && self.context_key.as_ref() == Some(&key) {
            return false;
        }

        debug!(
            active = ?key.active_report,
            history_len = key.history_len,
            "chat: context changed, recreating session"
        );
        self.context = build_chat_context(active, history);
        self.greeting = chat_greeting(active);
        self.context_key = Some(key);
        self.recreate_session();
        true
    }

    fn recreate_session(&mut self) {
        if let Some(old) = self.session.take() {
            old.cancel();
        }
        if self.in_flight.take().is_some() {
            debug!("chat: abandoning in-flight reply");
        }
        self.typing = false;
        self.placeholder = None;

        self.session = Some(ChatSession::new(
            Arc::clone(&self.provider),
            &self.context,
            self.options.clone(),
        ));

        if self.messages.is_empty() {
            self.messages.push(ChatMessage::model(self.greeting.clone()));
        }
    }

    /// Swap the provider, e.g. after a settings change.
    ///
    /// An existing session is rebuilt with the same context.
    pub fn replace_provider(&mut self, provider: Arc<dyn LlmProvider>, options: LlmRequestOptions) {
        self.provider = provider;
        self.options = options;
        if self.session.is_some() {
            self.recreate_session();
        }
    }

    /// Append the user's message and start streaming the reply.
    pub fn begin_send(&mut self, text: &str) -> Result<PendingReply, ChatError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ChatError::EmptyMessage);
        }
        if self.typing {
            return Err(ChatError::Busy);
        }
        let session = self.session.as_ref().ok_or(ChatError::NoSession)?;

        let stream = session.send(text);
        let user_message = ChatMessage::user(text);
        self.messages.push(user_message.clone());
        self.typing = true;
        self.epoch += 1;
        self.in_flight = Some(self.epoch);
        self.placeholder = None;

        Ok(PendingReply {
            epoch: self.epoch,
            user_message,
            stream,
        })
    }

    /// Apply one text delta of the reply tagged `epoch`.
    ///
    /// The first delta creates the assistant message; later ones grow it in
    /// place. Returns `None` for stale epochs and empty deltas.
    pub fn apply_delta(&mut self, epoch: u64, delta: &str) -> Option<AppEvent> {
        if self.in_flight != Some(epoch) {
            debug!(epoch, current = ?self.in_flight, "chat: dropping stale delta");
            return None;
        }
        if delta.is_empty() {
            return None;
        }

        match &self.placeholder {
            Some(id) => {
                let message = self.messages.iter_mut().rev().find(|m| &m.id == id)?;
                message.text.push_str(delta);
                Some(AppEvent::ChatMessageUpdated {
                    id: message.id.clone(),
                    text: message.text.clone(),
                })
            }
            None => {
                let message = ChatMessage::model(delta);
                self.placeholder = Some(message.id.clone());
                self.messages.push(message.clone());
                Some(AppEvent::ChatMessageAppended { message })
            }
        }
    }

    /// End the reply tagged `epoch`.
    ///
    /// On failure one apology is appended as a new assistant message; a
    /// partial reply already shown is left as it is.
    pub fn finish(&mut self, epoch: u64, outcome: Result<(), ChatError>) -> Vec<AppEvent> {
        if self.in_flight != Some(epoch) {
            return Vec::new();
        }
        self.in_flight = None;
        self.typing = false;
        self.placeholder = None;

        let mut events = Vec::new();
        if let Err(e) = outcome {
            warn!(error = %e, "chat: reply ended with an error");
            let apology = ChatMessage::model(CHAT_FAILURE_MESSAGE);
            self.messages.push(apology.clone());
            events.push(AppEvent::ChatMessageAppended { message: apology });
        }
        events.push(AppEvent::TypingChanged { typing: false });
        events
    }

    /// Start a fresh conversation with the current context.
    pub fn clear(&mut self) {
        self.messages.clear();
        self.recreate_session();
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn is_typing(&self) -> bool {
        self.typing
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn session(&self) -> Option<&ChatSession> {
        self.session.as_ref()
    }
}

/// Consume a pending reply, feeding every delta into `manager` and every
/// resulting change into `sink`.
///
/// The manager lock is held only per delta, never across an await on the
/// stream.
pub async fn drive_reply(
    manager: &Mutex<ChatSessionManager>,
    pending: PendingReply,
    sink: &dyn EventSink,
) -> Result<(), ChatError> {
    let PendingReply {
        epoch,
        user_message,
        mut stream,
    } = pending;

    sink.emit(AppEvent::ChatMessageAppended {
        message: user_message,
    });
    sink.emit(AppEvent::TypingChanged { typing: true });

    let mut outcome = Ok(());
    while let Some(item) = stream.next().await {
        match item {
            Ok(delta) => {
                let event = manager.lock().await.apply_delta(epoch, &delta);
                if let Some(event) = event {
                    sink.emit(event);
                }
            }
            Err(e) => {
                outcome = Err(ChatError::from(e));
                break;
            }
        }
    }

    let events = manager.lock().await.finish(epoch, outcome.clone());
    for event in events {
        sink.emit(event);
    }
    outcome
}
