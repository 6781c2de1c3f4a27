//! History Commands
//!
//! List, open, and delete stored reports.

use politisight_core::Report;

use crate::models::response::CommandResponse;
use crate::services::history::HistoryEntry;
use crate::state::AppState;
use crate::utils::error::{AppError, AppResult};

/// List stored reports, most recent first
pub async fn list_history(state: &AppState) -> CommandResponse<Vec<HistoryEntry>> {
    state.with_history(|h| Ok(h.entries())).await.into()
}

/// Open a stored report, making it the active report
pub async fn view_report(state: &AppState, id: &str) -> CommandResponse<Report> {
    let result: AppResult<Report> = async {
        let report = state
            .with_history(|h| {
                h.get(id)
                    .cloned()
                    .ok_or_else(|| AppError::not_found(format!("report {}", id)))
            })
            .await?;
        state.set_active_report(Some(report.clone())).await;
        state.sync_chat_context().await?;
        Ok(report)
    }
    .await;
    result.into()
}

/// Delete a stored report. Returns whether it existed.
pub async fn delete_report(state: &AppState, id: &str) -> CommandResponse<bool> {
    let result: AppResult<bool> = async {
        let removed = state.with_history_mut(|h| h.remove(id)).await?;
        if removed {
            if state.active_report().await.is_some_and(|r| r.id == id) {
                state.set_active_report(None).await;
            }
            state.sync_chat_context().await?;
        }
        Ok(removed)
    }
    .await;
    result.into()
}
