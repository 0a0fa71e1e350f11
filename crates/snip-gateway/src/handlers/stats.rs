use axum::extract::State;
use axum::Json;
use snip_core::Stats;

use crate::error::Result;
use crate::state::AppState;

pub async fn stats_handler(State(state): State<AppState>) -> Result<Json<Stats>> {
    Ok(Json(state.shortener().stats().await?))
}
