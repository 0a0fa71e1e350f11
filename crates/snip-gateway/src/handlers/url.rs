use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Redirect, Response};
use axum::Json;
use snip_core::Upsert;
use snip_shortener::BatchRequest;

use crate::error::Result;
use crate::extract::UserId;
use crate::model::{ShortenRequest, ShortenResponse};
use crate::state::AppState;

/// 201 for a fresh write, 409 when the URL was already shortened.
fn creation_status<T>(outcome: &Upsert<T>) -> StatusCode {
    if outcome.is_conflict() {
        StatusCode::CONFLICT
    } else {
        StatusCode::CREATED
    }
}

pub async fn create_text_handler(
    State(state): State<AppState>,
    UserId(user_id): UserId,
    body: String,
) -> Result<Response> {
    let outcome = state.shortener().create(body.trim(), &user_id).await?;
    let status = creation_status(&outcome);

    Ok((
        status,
        [(header::CONTENT_TYPE, "text/plain")],
        outcome.into_inner(),
    )
        .into_response())
}

pub async fn create_json_handler(
    State(state): State<AppState>,
    UserId(user_id): UserId,
    Json(request): Json<ShortenRequest>,
) -> Result<Response> {
    let outcome = state.shortener().create(&request.url, &user_id).await?;
    let status = creation_status(&outcome);

    Ok((
        status,
        Json(ShortenResponse {
            result: outcome.into_inner(),
        }),
    )
        .into_response())
}

pub async fn create_batch_handler(
    State(state): State<AppState>,
    UserId(user_id): UserId,
    Json(requests): Json<Vec<BatchRequest>>,
) -> Result<Response> {
    let outcome = state.shortener().create_batch(&requests, &user_id).await?;
    let status = creation_status(&outcome);

    Ok((status, Json(outcome.into_inner())).into_response())
}

pub async fn redirect_handler(
    Path(code): Path<String>,
    State(state): State<AppState>,
) -> Result<Redirect> {
    let original_url = state.shortener().resolve(&code).await?;
    Ok(Redirect::temporary(&original_url))
}
