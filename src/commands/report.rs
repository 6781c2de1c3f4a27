//! Report Commands
//!
//! Generate a report for a topic. The report is stored in history, becomes
//! the active report, and the chat context follows it.

use politisight_core::Report;
use tracing::{info, warn};

use crate::models::events::{AppEvent, EventSink};
use crate::models::response::CommandResponse;
use crate::models::search::SearchStage;
use crate::services::prompt::RECENT_TOPIC_LIMIT;
use crate::state::AppState;

/// Generate a report on `topic`, emitting stage changes to `sink`
pub async fn generate_report(
    state: &AppState,
    topic: &str,
    sink: &dyn EventSink,
) -> CommandResponse<Report> {
    let topic = topic.trim();
    if topic.is_empty() {
        return CommandResponse::err("Please enter a topic to analyze.");
    }

    let generator = match state.report_generator().await {
        Ok(generator) => generator,
        Err(e) => return CommandResponse::err(e.user_message()),
    };
    let recent = state
        .with_history(|h| Ok(h.recent_titles(RECENT_TOPIC_LIMIT)))
        .await
        .unwrap_or_default();

    if !state.try_begin_search(topic) {
        return CommandResponse::err("A report is already being generated.");
    }
    sink.emit(AppEvent::StageChanged {
        stage: SearchStage::Researching,
    });

    let on_progress = |stage: SearchStage| {
        state.update_search(|s| s.advance(stage));
        if stage != SearchStage::Researching {
            sink.emit(AppEvent::StageChanged { stage });
        }
    };

    let report = match generator.generate(topic, &recent, on_progress).await {
        Ok(report) => report,
        Err(e) => {
            let message = e.user_message();
            state.update_search(|s| s.fail(message.clone()));
            sink.emit(AppEvent::StageChanged {
                stage: SearchStage::Idle,
            });
            return CommandResponse::err(message);
        }
    };

    if let Err(e) = state
        .with_history_mut(|h| h.append(report.clone()))
        .await
    {
        warn!(error = %e, report_id = %report.id, "failed to persist report");
    }
    state.set_active_report(Some(report.clone())).await;
    if let Err(e) = state.sync_chat_context().await {
        warn!(error = %e, "failed to refresh chat context");
    }

    state.update_search(|s| s.complete());
    sink.emit(AppEvent::StageChanged {
        stage: SearchStage::Complete,
    });
    sink.emit(AppEvent::ReportReady {
        report_id: report.id.clone(),
        title: report.title.clone(),
    });
    info!(report_id = %report.id, "report generated");

    CommandResponse::ok(report)
}
