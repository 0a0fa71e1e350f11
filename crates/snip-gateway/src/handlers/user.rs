use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use snip_core::StoreError;
use snip_shortener::ShortenerError;

use crate::error::Result;
use crate::extract::UserId;
use crate::state::AppState;

pub async fn user_urls_handler(
    State(state): State<AppState>,
    UserId(user_id): UserId,
) -> Result<Response> {
    match state.shortener().user_urls(&user_id).await {
        Ok(urls) => Ok(Json(urls).into_response()),
        Err(ShortenerError::Store(StoreError::NotFound)) => Ok(StatusCode::NO_CONTENT.into_response()),
        Err(err) => Err(err.into()),
    }
}

/// Accepts a JSON array of codes and deletes them in the background.
pub async fn delete_user_urls_handler(
    State(state): State<AppState>,
    UserId(user_id): UserId,
    Json(codes): Json<Vec<String>>,
) -> Result<StatusCode> {
    // The handle is dropped: the client only learns that the request was taken.
    state.shortener().delete(&user_id, codes)?;
    Ok(StatusCode::ACCEPTED)
}
