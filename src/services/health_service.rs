use tracing::warn;

use crate::{dto::health::HealthResponse, state::SharedState};

/// Probe the storage backend and report whether matches can be served.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    let backend = match state.require_match_store().await {
        Ok(store) => {
            if let Err(err) = store.health_check().await {
                warn!(error = %err, "storage health check failed");
            }
            store.backend_name()
        }
        Err(_) => {
            warn!("storage unavailable (degraded mode)");
            return HealthResponse::degraded();
        }
    };

    if state.is_degraded().await {
        HealthResponse::degraded()
    } else {
        HealthResponse::ok(backend)
    }
}
