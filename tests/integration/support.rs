//! Shared test fixtures.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use politisight::models::events::AppEvent;
use politisight::storage::config::ConfigService;
use politisight::storage::local::KeyValueStore;
use politisight::AppState;
use politisight_core::{GroundingSource, UnifiedStreamEvent};
use politisight_llm::{
    LlmError, LlmProvider, LlmRequestOptions, LlmResponse, LlmResult, Message, ProviderConfig,
    StopReason, UsageStats,
};
use tempfile::TempDir;
use tokio::sync::mpsc;

pub const REPORT_JSON: &str = r#"{
    "title": "Maharashtra Assembly Outlook",
    "date": "October 2026",
    "executiveSummary": "The Mahayuti holds an edge going into the polls.",
    "keyInsights": [
        {"icon": "trend-up", "text": "BJP vote share rising", "value": "+3%"},
        {"icon": "alert", "text": "Urban turnout remains low"}
    ],
    "sections": [
        {"id": "overview", "title": "Overview", "type": "TEXT", "content": "Background."},
        {"id": "seats", "title": "Projected seats", "type": "BAR_CHART", "content": "Seats.",
         "chartData": [{"name": "Mahayuti", "value": 160}, {"name": "MVA", "value": "110"}]},
        {"id": "share", "title": "Vote share", "type": "PIE_CHART", "content": "Shares.",
         "chartData": [{"name": "Mahayuti", "value": 47}, {"name": "MVA", "value": 43}]},
        {"id": "trend", "title": "Turnout trend", "type": "LINE_CHART", "content": "Turnout.",
         "chartData": [{"name": "2014", "value": 63}, {"name": "2019", "value": 61}]}
    ]
}"#;

pub fn source(uri: &str, title: &str) -> GroundingSource {
    GroundingSource {
        title: title.to_string(),
        uri: uri.to_string(),
    }
}

pub fn response(text: &str, grounding: Vec<GroundingSource>) -> LlmResponse {
    LlmResponse {
        content: Some(text.to_string()),
        grounding,
        stop_reason: StopReason::EndTurn,
        usage: UsageStats::default(),
        model: "scripted".to_string(),
    }
}

/// Replays queued report responses and streams queued chat replies.
pub struct ScriptedProvider {
    reports: Mutex<VecDeque<LlmResult<LlmResponse>>>,
    replies: Mutex<VecDeque<Vec<String>>>,
    /// System instructions seen by chat requests
    pub chat_instructions: Mutex<Vec<Option<String>>>,
    config: ProviderConfig,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self {
            reports: Mutex::new(VecDeque::new()),
            replies: Mutex::new(VecDeque::new()),
            chat_instructions: Mutex::new(Vec::new()),
            config: ProviderConfig::default(),
        }
    }

    pub fn with_report(self, result: LlmResult<LlmResponse>) -> Self {
        self.reports.lock().unwrap().push_back(result);
        self
    }

    pub fn with_reply(self, deltas: &[&str]) -> Self {
        self.replies
            .lock()
            .unwrap()
            .push_back(deltas.iter().map(|d| d.to_string()).collect());
        self
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn model(&self) -> &str {
        "scripted-model"
    }

    fn config(&self) -> &ProviderConfig {
        &self.config
    }

    async fn send_message(
        &self,
        _messages: Vec<Message>,
        _system: Option<String>,
        _request_options: LlmRequestOptions,
    ) -> LlmResult<LlmResponse> {
        self.reports
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| {
                Err(LlmError::Other {
                    message: "no scripted report left".to_string(),
                })
            })
    }

    async fn stream_message(
        &self,
        _messages: Vec<Message>,
        system: Option<String>,
        tx: mpsc::Sender<UnifiedStreamEvent>,
        _request_options: LlmRequestOptions,
    ) -> LlmResult<LlmResponse> {
        self.chat_instructions.lock().unwrap().push(system);
        let deltas = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| LlmError::NetworkError {
                message: "connection refused".to_string(),
            })?;
        for delta in &deltas {
            let _ = tx
                .send(UnifiedStreamEvent::TextDelta {
                    content: delta.clone(),
                })
                .await;
        }
        Ok(response(&deltas.concat(), vec![]))
    }

    async fn health_check(&self) -> LlmResult<()> {
        Ok(())
    }
}

/// An initialized state over a temporary config file and the given store.
pub async fn state_with(
    provider: Arc<ScriptedProvider>,
    store: Arc<dyn KeyValueStore>,
) -> (AppState, TempDir) {
    let dir = TempDir::new().unwrap();
    let config = ConfigService::open(dir.path().join("config.json")).unwrap();
    let state = AppState::new();
    state.initialize_with(config, store, provider).await.unwrap();
    (state, dir)
}

/// Drain every event already sent on the channel.
pub fn drain(rx: &mut mpsc::UnboundedReceiver<AppEvent>) -> Vec<AppEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
