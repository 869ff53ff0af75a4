//! Key CRUD handlers.

use axum::{
    extract::{Path, State},
    response::Json,
};
use gembalance_core::KeySummary;
use gembalance_types::{DayBucket, KeyError};
use serde::{Deserialize, Serialize};

use super::{key_error, ApiError};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct NewKey {
    pub secret: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub daily_quota: Option<u64>,
}

/// Single or batch add in one shape.
#[derive(Deserialize)]
pub struct AddKeysRequest {
    pub keys: Vec<NewKey>,
}

#[derive(Serialize)]
pub struct AddedKey {
    pub id: String,
    pub name: Option<String>,
}

pub async fn add_keys(
    State(state): State<AppState>,
    Json(payload): Json<AddKeysRequest>,
) -> Result<Json<Vec<AddedKey>>, ApiError> {
    let mut added = Vec::with_capacity(payload.keys.len());
    for entry in payload.keys {
        let key = state
            .pool()
            .add_key(&entry.secret, entry.name, entry.daily_quota)
            .await
            .map_err(key_error)?;
        added.push(AddedKey { id: key.id, name: key.name });
    }
    Ok(Json(added))
}

pub async fn list_keys(
    State(state): State<AppState>,
) -> Result<Json<Vec<KeySummary>>, ApiError> {
    let summaries = state.pool().summaries(&DayBucket::today()).await.map_err(key_error)?;
    Ok(Json(summaries))
}

pub async fn delete_key(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<bool>, ApiError> {
    let removed = state.pool().delete_key(&id).await.map_err(key_error)?;
    if !removed {
        return Err(key_error(KeyError::NotFound { id }));
    }
    Ok(Json(true))
}
