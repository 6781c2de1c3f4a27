//! Health Check Commands
//!
//! Commands for checking the health status of backend services.

use tracing::warn;

use crate::models::response::{CommandResponse, HealthResponse};
use crate::state::AppState;

/// Get the health status of all backend services.
///
/// With `check_provider`, also makes one live call to the model endpoint.
pub async fn get_health(state: &AppState, check_provider: bool) -> CommandResponse<HealthResponse> {
    let mut health = HealthResponse {
        config: state.is_config_healthy(),
        history: state.is_history_loaded(),
        credential: state.has_credential().await,
        ..Default::default()
    };

    if let Ok(provider) = state.provider().await {
        health.model = provider.model().to_string();
        if check_provider && health.credential {
            let reachable = match provider.health_check().await {
                Ok(()) => true,
                Err(e) => {
                    warn!(error = %e, "provider health check failed");
                    false
                }
            };
            health.provider_reachable = Some(reachable);
        }
    }

    let provider_ok = health.provider_reachable.unwrap_or(true);
    health.status = if health.config && health.history && health.credential && provider_ok {
        "healthy".to_string()
    } else {
        "degraded".to_string()
    };

    CommandResponse::ok(health)
}
