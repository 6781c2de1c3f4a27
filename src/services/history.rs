//! Report History
//!
//! Most-recent-first list of generated reports, persisted as one JSON array
//! under a single storage key. The slot is read once at load time; after that
//! this store is the only writer and every change rewrites the whole array.

use std::sync::Arc;

use politisight_core::Report;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::storage::local::KeyValueStore;
use crate::utils::error::AppResult;

/// Storage key holding the serialized history
pub const HISTORY_KEY: &str = "politisight_history";

/// Compact listing entry for a stored report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub id: String,
    pub title: String,
    pub date: String,
    pub created_at: i64,
    pub section_count: usize,
}

impl From<&Report> for HistoryEntry {
    fn from(report: &Report) -> Self {
        Self {
            id: report.id.clone(),
            title: report.title.clone(),
            date: report.date.clone(),
            created_at: report.created_at,
            section_count: report.sections.len(),
        }
    }
}

/// Persisted report history.
pub struct HistoryStore {
    store: Arc<dyn KeyValueStore>,
    reports: Vec<Report>,
}

impl HistoryStore {
    /// Read the history slot.
    ///
    /// A missing slot is an empty history. So is an unreadable or corrupt
    /// one; that case is logged and never surfaced to the user.
    pub fn load(store: Arc<dyn KeyValueStore>) -> Self {
        let reports = match store.get(HISTORY_KEY) {
            Ok(Some(raw)) => match serde_json::from_str::<Vec<Report>>(&raw) {
                Ok(reports) => reports,
                Err(e) => {
                    warn!(error = %e, "history: stored payload is corrupt, starting empty");
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!(error = %e, "history: failed to read storage, starting empty");
                Vec::new()
            }
        };
        debug!(count = reports.len(), "history: loaded");
        Self { store, reports }
    }

    /// Rewrite the slot. An empty history clears it.
    fn persist(&self, reports: &[Report]) -> AppResult<()> {
        if reports.is_empty() {
            return self.store.remove(HISTORY_KEY);
        }
        let raw = serde_json::to_string(reports)?;
        self.store.set(HISTORY_KEY, &raw)
    }

    /// Prepend `report` and rewrite the slot.
    ///
    /// On a write failure the in-memory list is left unchanged.
    pub fn append(&mut self, report: Report) -> AppResult<()> {
        let mut next = Vec::with_capacity(self.reports.len() + 1);
        next.push(report);
        next.extend(self.reports.iter().cloned());
        self.persist(&next)?;
        self.reports = next;
        Ok(())
    }

    /// Drop every report with this id. Returns whether anything was removed.
    pub fn remove(&mut self, id: &str) -> AppResult<bool> {
        let next: Vec<Report> = self
            .reports
            .iter()
            .filter(|r| r.id != id)
            .cloned()
            .collect();
        if next.len() == self.reports.len() {
            return Ok(false);
        }
        self.persist(&next)?;
        self.reports = next;
        Ok(true)
    }

    /// All reports, most recent first
    pub fn load_all(&self) -> Vec<Report> {
        self.reports.clone()
    }

    pub fn reports(&self) -> &[Report] {
        &self.reports
    }

    pub fn get(&self, id: &str) -> Option<&Report> {
        self.reports.iter().find(|r| r.id == id)
    }

    /// Titles of the `n` most recent reports
    pub fn recent_titles(&self, n: usize) -> Vec<String> {
        self.reports.iter().take(n).map(|r| r.title.clone()).collect()
    }

    pub fn entries(&self) -> Vec<HistoryEntry> {
        self.reports.iter().map(HistoryEntry::from).collect()
    }

    pub fn len(&self) -> usize {
        self.reports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reports.is_empty()
    }
}
