//! Handles POST /predict

use axum::{
    Extension, Json,
    extract::{State, rejection::JsonRejection},
};
use serde_json::Value;

use super::context::AppState;
use crate::errors::ApiError;
use crate::inference::PredictRequest;
use crate::oauth::UserInfo;

/// Run the model once and return its JSON result unchanged.
pub async fn handle_predict(
    State(state): State<AppState>,
    user: Option<Extension<UserInfo>>,
    request: Result<Json<PredictRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(request) = request?;
    tracing::info!(
        user = user.as_ref().map(|Extension(u)| u.display_name()),
        "prediction requested"
    );

    let result = state.inference.predict(&request.input_text).await?;
    Ok(Json(result))
}
