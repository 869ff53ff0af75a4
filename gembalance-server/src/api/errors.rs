//! Health-state handlers: inspect, clear and purge errored keys.

use axum::{
    extract::{Path, State},
    response::Json,
};
use gembalance_types::ErroredKey;

use super::{key_error, ApiError};
use crate::state::AppState;

pub async fn list_errored(
    State(state): State<AppState>,
) -> Result<Json<Vec<ErroredKey>>, ApiError> {
    let errored = state.pool().list_errored().await.map_err(key_error)?;
    Ok(Json(errored))
}

/// Clear one key's marker. `true` when state actually changed.
pub async fn clear_one(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<bool>, ApiError> {
    let changed = state.pool().clear_failure(&id).await.map_err(key_error)?;
    Ok(Json(changed))
}

/// Clear every marker; responds with the ids that changed.
pub async fn clear_all(State(state): State<AppState>) -> Result<Json<Vec<String>>, ApiError> {
    let cleared = state.pool().clear_all_errors().await.map_err(key_error)?;
    Ok(Json(cleared))
}

/// Remove every errored key outright; responds with the removed ids.
pub async fn delete_errored(
    State(state): State<AppState>,
) -> Result<Json<Vec<String>>, ApiError> {
    let deleted = state.pool().delete_errored().await.map_err(key_error)?;
    Ok(Json(deleted))
}
