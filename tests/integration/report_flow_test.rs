//! Report Generation Integration Tests
//!
//! Drives `generate_report` end to end over a scripted provider.

use std::sync::Arc;

use politisight::models::events::AppEvent;
use politisight::models::search::SearchStage;
use politisight::storage::local::MemoryStore;
use politisight::{generate_report, list_history};
use politisight_core::SectionType;
use politisight_llm::LlmError;
use tokio::sync::mpsc;

use crate::support::{drain, response, source, state_with, ScriptedProvider, REPORT_JSON};

// ============================================================================
// Success
// ============================================================================

#[tokio::test]
async fn test_generate_report_success() {
    let provider = Arc::new(ScriptedProvider::new().with_report(Ok(response(REPORT_JSON, vec![]))));
    let (state, _dir) = state_with(provider, Arc::new(MemoryStore::new())).await;
    let (tx, mut rx) = mpsc::unbounded_channel();

    let result = generate_report(&state, "Maharashtra elections", &tx).await;
    assert!(result.success, "{:?}", result.error);
    let report = result.data.unwrap();

    assert!(!report.title.is_empty());
    assert!(!report.executive_summary.is_empty());
    assert!(!report.id.is_empty());
    assert!(report.created_at > 0);
    assert_eq!(report.key_insights.len(), 2);
    assert_eq!(report.sections[1].render_kind(), SectionType::BarChart);
    assert_eq!(report.sections[1].chart_data.as_ref().unwrap()[1].value, 110.0);

    let search = state.search_state();
    assert!(!search.is_searching);
    assert_eq!(search.stage, SearchStage::Complete);
    assert_eq!(state.active_report().await.map(|r| r.id), Some(report.id.clone()));

    let stages: Vec<SearchStage> = drain(&mut rx)
        .into_iter()
        .filter_map(|e| match e {
            AppEvent::StageChanged { stage } => Some(stage),
            _ => None,
        })
        .collect();
    assert_eq!(
        stages,
        vec![
            SearchStage::Researching,
            SearchStage::Analyzing,
            SearchStage::Formatting,
            SearchStage::Complete,
        ]
    );
}

#[tokio::test]
async fn test_generate_report_rejected_while_running() {
    let provider = Arc::new(ScriptedProvider::new().with_report(Ok(response(REPORT_JSON, vec![]))));
    let (state, _dir) = state_with(provider, Arc::new(MemoryStore::new())).await;
    assert!(state.try_begin_search("in flight"));

    let result = generate_report(&state, "second topic", &()).await;
    assert!(!result.success);
    assert_eq!(result.error.as_deref(), Some("A report is already being generated."));
    assert_eq!(state.search_state().query, "in flight");
}

#[tokio::test]
async fn test_generated_report_goes_to_history_front() {
    let provider = Arc::new(
        ScriptedProvider::new()
            .with_report(Ok(response(REPORT_JSON, vec![])))
            .with_report(Ok(response(
                &REPORT_JSON.replace("Maharashtra Assembly Outlook", "Second"),
                vec![],
            ))),
    );
    let (state, _dir) = state_with(provider, Arc::new(MemoryStore::new())).await;

    let first = generate_report(&state, "first", &()).await.data.unwrap();
    let second = generate_report(&state, "second", &()).await.data.unwrap();

    let ids: Vec<String> = list_history(&state)
        .await
        .data
        .unwrap()
        .into_iter()
        .map(|e| e.id)
        .collect();
    assert_eq!(ids, vec![second.id, first.id]);
}

#[tokio::test]
async fn test_sources_dedupe_last_title_wins() {
    let grounding = vec![
        source("https://a.example", "T1"),
        source("https://b.example", "T2"),
        source("https://a.example", "T3"),
    ];
    let provider = Arc::new(ScriptedProvider::new().with_report(Ok(response(REPORT_JSON, grounding))));
    let (state, _dir) = state_with(provider, Arc::new(MemoryStore::new())).await;

    let report = generate_report(&state, "topic", &()).await.data.unwrap();
    assert_eq!(
        report.sources,
        vec![source("https://a.example", "T3"), source("https://b.example", "T2")]
    );
}

// ============================================================================
// Failures
// ============================================================================

#[tokio::test]
async fn test_blank_topic_rejected() {
    let provider = Arc::new(ScriptedProvider::new());
    let (state, _dir) = state_with(provider, Arc::new(MemoryStore::new())).await;

    let result = generate_report(&state, "   ", &()).await;
    assert!(!result.success);
    assert!(!state.search_state().is_searching);
}

#[tokio::test]
async fn test_missing_credential_is_reported() {
    let provider = Arc::new(ScriptedProvider::new().with_report(Err(LlmError::MissingApiKey {
        provider: "gemini".to_string(),
    })));
    let (state, _dir) = state_with(provider, Arc::new(MemoryStore::new())).await;
    let (tx, mut rx) = mpsc::unbounded_channel();

    let result = generate_report(&state, "topic", &tx).await;
    assert!(!result.success);
    assert!(result.error.unwrap().contains("API key"));

    let search = state.search_state();
    assert!(!search.is_searching);
    assert_eq!(search.stage, SearchStage::Idle);
    assert!(search.error.is_some());
    assert!(list_history(&state).await.data.unwrap().is_empty());
    assert!(drain(&mut rx)
        .iter()
        .all(|e| !matches!(e, AppEvent::ReportReady { .. })));
}

#[tokio::test]
async fn test_malformed_json_is_a_failure() {
    let provider = Arc::new(ScriptedProvider::new().with_report(Ok(response("{not json", vec![]))));
    let (state, _dir) = state_with(provider, Arc::new(MemoryStore::new())).await;

    let result = generate_report(&state, "topic", &()).await;
    assert!(!result.success);
    assert!(state.active_report().await.is_none());
    assert!(list_history(&state).await.data.unwrap().is_empty());
}
