use axum::{extract::State, http::StatusCode};
use tracing::warn;

use crate::state::AppState;

pub async fn liveness(State(state): State<AppState>) -> StatusCode {
    match state.run(|db| Ok(db.ping()?)).await {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            warn!("Liveness check failed: {}", e);
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
