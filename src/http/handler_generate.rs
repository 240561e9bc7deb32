//! Handles POST /generate and POST /generate/stream

use std::convert::Infallible;

use axum::{
    Json,
    body::Body,
    extract::{State, rejection::JsonRejection},
    http::header::CONTENT_TYPE,
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use futures::StreamExt;

use super::context::AppState;
use crate::errors::ApiError;
use crate::inference::GenerateRequest;

/// Newline-delimited JSON, one inference chunk per line.
pub async fn handle_generate(
    State(state): State<AppState>,
    request: Result<Json<GenerateRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = request?;
    tracing::info!(
        context_keys = request.prediction_data.len(),
        "generation requested"
    );

    let chunks = state.inference.generate(&request.input_text).await?;
    let lines = chunks.map(|chunk| Ok::<_, Infallible>(Bytes::from(format!("{chunk}\n"))));

    Ok((
        [(CONTENT_TYPE, "application/x-ndjson")],
        Body::from_stream(lines),
    )
        .into_response())
}

/// Server-sent events relayed from the inference endpoint as they arrive.
///
/// Upstream failures before the first byte become a normal error response.
/// A failure mid-stream ends the body early.
pub async fn handle_generate_stream(
    State(state): State<AppState>,
    request: Result<Json<GenerateRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = request?;
    tracing::info!(
        context_keys = request.prediction_data.len(),
        "streaming generation requested"
    );

    let relay = state
        .inference
        .generate_stream(&request.input_text, &request.prediction_data)
        .await?;

    Ok((
        [(CONTENT_TYPE, "text/event-stream")],
        Body::from_stream(relay),
    )
        .into_response())
}
