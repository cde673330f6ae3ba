// Shift CRUD handlers and the daily rollup read.
// Bodies are validated here; nothing malformed reaches the store.

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use super::AppState;
use crate::models::{InputRejected, ShiftPatch, ShiftRecord};
use crate::store::StoreError;

pub(super) enum ApiError {
    /// Body was not a JSON document with a JSON content type.
    InvalidBody(JsonRejection),
    BadRequest(InputRejected),
    NotFound(String),
    Store(StoreError),
}

impl From<InputRejected> for ApiError {
    fn from(e: InputRejected) -> Self {
        ApiError::BadRequest(e)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(e: JsonRejection) -> Self {
        ApiError::InvalidBody(e)
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        ApiError::Store(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::InvalidBody(e) => (
                StatusCode::BAD_REQUEST,
                format!("Invalid data provided: {}", e.body_text()),
            ),
            ApiError::BadRequest(e) => (StatusCode::BAD_REQUEST, e.to_string()),
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, message),
            ApiError::Store(e) => {
                tracing::warn!(error = %e, "store request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "storage error".to_string())
            }
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

/// POST /add: insert or replace a shift, then evaluate its day.
pub(super) async fn add_shift(
    State(state): State<AppState>,
    payload: Result<Json<serde_json::Value>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(body) = payload?;
    let record = ShiftRecord::from_json(body)?;
    state.service.record_shift(&record).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Data inserted successfully!" })),
    ))
}

/// GET /get: every stored shift.
pub(super) async fn get_all_shifts(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.service.read_all_shifts().await?))
}

/// GET /get/{date}/{shift}
pub(super) async fn get_shift(
    State(state): State<AppState>,
    Path((date, shift)): Path<(String, u32)>,
) -> Result<impl IntoResponse, ApiError> {
    match state.service.read_shift(&date, shift).await? {
        Some(record) => Ok(Json(record)),
        None => Err(ApiError::NotFound(
            "No data found for the given date and shift".to_string(),
        )),
    }
}

/// GET /get-daily-max/{date}: the stored rollup; never a partial one.
pub(super) async fn get_daily_max(
    State(state): State<AppState>,
    Path(date): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    match state.service.read_rollup(&date).await? {
        Some(rollup) => Ok(Json(rollup)),
        None => Err(ApiError::NotFound(format!(
            "No max metrics found for the given date: {}",
            date
        ))),
    }
}

/// PUT /update/{date}/{shift}: replace the given maps of an existing shift.
pub(super) async fn update_shift(
    State(state): State<AppState>,
    Path((date, shift)): Path<(String, u32)>,
    payload: Result<Json<serde_json::Value>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(body) = payload?;
    let patch = ShiftPatch::from_json(body)?;
    match state.service.update_shift(&date, shift, patch).await? {
        Some(_) => Ok(Json(json!({ "message": "Data updated successfully!" }))),
        None => Err(ApiError::NotFound(
            "No data found to update for the given date and shift".to_string(),
        )),
    }
}

/// DELETE /delete/{date}/{shift}
pub(super) async fn delete_shift(
    State(state): State<AppState>,
    Path((date, shift)): Path<(String, u32)>,
) -> Result<impl IntoResponse, ApiError> {
    if state.service.delete_shift(&date, shift).await? {
        Ok(Json(json!({ "message": "Data deleted successfully!" })))
    } else {
        Err(ApiError::NotFound(
            "No data found to delete for the given date and shift".to_string(),
        ))
    }
}
