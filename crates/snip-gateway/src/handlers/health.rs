use crate::model::HealthResponse;
use crate::state::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use tracing::warn;

pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

/// Reports whether the store is reachable.
pub async fn ping_handler(State(state): State<AppState>) -> StatusCode {
    match state.shortener().ping().await {
        Ok(()) => StatusCode::OK,
        Err(err) => {
            warn!(error = %err, "store ping failed");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}
