//! History Integration Tests
//!
//! Persistence across reloads with the file and memory stores, deletion,
//! and recovery from a corrupt slot.

use std::sync::Arc;

use politisight::services::history::{HistoryStore, HISTORY_KEY};
use politisight::storage::local::{FileStore, KeyValueStore, MemoryStore};
use politisight::{delete_report, generate_report, list_history, view_report};
use politisight_core::Report;
use tempfile::TempDir;

use crate::support::{response, state_with, ScriptedProvider, REPORT_JSON};

fn report(id: &str, title: &str) -> Report {
    Report {
        id: id.to_string(),
        created_at: 1_760_000_000_000,
        title: title.to_string(),
        date: "October 2026".to_string(),
        executive_summary: format!("{} summary", title),
        key_insights: vec![],
        sections: vec![],
        sources: vec![],
    }
}

// ============================================================================
// Persistence
// ============================================================================

#[test]
fn test_file_store_round_trip_across_reload() {
    let dir = TempDir::new().unwrap();
    let store: Arc<dyn KeyValueStore> = Arc::new(FileStore::at(dir.path()).unwrap());

    let mut history = HistoryStore::load(Arc::clone(&store));
    history.append(report("r1", "Bihar")).unwrap();
    history.append(report("r2", "Kerala")).unwrap();
    drop(history);

    let reloaded = HistoryStore::load(Arc::new(FileStore::at(dir.path()).unwrap()));
    assert_eq!(reloaded.load_all(), vec![report("r2", "Kerala"), report("r1", "Bihar")]);
    assert!(dir.path().join(format!("{}.json", HISTORY_KEY)).exists());
}

#[test]
fn test_memory_store_round_trip_and_delete() {
    let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());

    let mut history = HistoryStore::load(Arc::clone(&store));
    history.append(report("r1", "Bihar")).unwrap();
    history.append(report("r2", "Kerala")).unwrap();
    assert!(history.remove("r1").unwrap());

    let reloaded = HistoryStore::load(store);
    assert_eq!(reloaded.load_all(), vec![report("r2", "Kerala")]);
}

#[test]
fn test_corrupt_slot_loads_empty() {
    let store = Arc::new(MemoryStore::with_value(HISTORY_KEY, "{not json"));
    let history = HistoryStore::load(store);
    assert!(history.is_empty());
}

#[tokio::test]
async fn test_state_with_corrupt_history_still_initializes() {
    let store = Arc::new(MemoryStore::with_value(HISTORY_KEY, "{not json"));
    let (state, _dir) = state_with(Arc::new(ScriptedProvider::new()), store).await;
    assert!(state.is_history_loaded());
    assert!(list_history(&state).await.data.unwrap().is_empty());
}

// ============================================================================
// Commands
// ============================================================================

#[tokio::test]
async fn test_generated_report_survives_restart() {
    let dir = TempDir::new().unwrap();
    let provider = Arc::new(ScriptedProvider::new().with_report(Ok(response(REPORT_JSON, vec![]))));
    let (state, _config_dir) =
        state_with(provider, Arc::new(FileStore::at(dir.path()).unwrap())).await;
    let report = generate_report(&state, "Maharashtra", &()).await.data.unwrap();
    drop(state);

    let (restarted, _config_dir) = state_with(
        Arc::new(ScriptedProvider::new()),
        Arc::new(FileStore::at(dir.path()).unwrap()),
    )
    .await;
    let viewed = view_report(&restarted, &report.id).await.data.unwrap();
    assert_eq!(viewed, report);
}

#[tokio::test]
async fn test_view_unknown_report_fails() {
    let (state, _dir) = state_with(Arc::new(ScriptedProvider::new()), Arc::new(MemoryStore::new())).await;
    let result = view_report(&state, "missing").await;
    assert!(!result.success);
    assert!(result.error.is_some());
}

#[tokio::test]
async fn test_delete_active_report_clears_view() {
    let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
    {
        let mut history = HistoryStore::load(Arc::clone(&store));
        history.append(report("r1", "Bihar")).unwrap();
        history.append(report("r2", "Kerala")).unwrap();
    }
    let (state, _dir) = state_with(Arc::new(ScriptedProvider::new()), store).await;

    view_report(&state, "r1").await.data.unwrap();
    assert_eq!(state.active_report().await.map(|r| r.id), Some("r1".to_string()));

    assert!(delete_report(&state, "r1").await.data.unwrap());
    assert!(state.active_report().await.is_none());
    assert!(!delete_report(&state, "r1").await.data.unwrap());

    let ids: Vec<String> = list_history(&state)
        .await
        .data
        .unwrap()
        .into_iter()
        .map(|e| e.id)
        .collect();
    assert_eq!(ids, vec!["r2".to_string()]);
}
