//! Manual verification and upstream model listing.

use axum::{
    extract::{Path, State},
    response::Json,
};
use gembalance_core::{FailoverError, VerifyReport};
use serde::Deserialize;

use super::{key_error, ApiError};
use crate::state::AppState;

#[derive(Deserialize, Default)]
#[serde(default)]
pub struct VerifyRequest {
    /// Model to dispatch; defaults to the configured listing gate model.
    pub model: Option<String>,
}

/// One real dispatch through the chosen key, feeding quota and health state
/// exactly like live traffic.
pub async fn verify_key(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Option<Json<VerifyRequest>>,
) -> Result<Json<VerifyReport>, ApiError> {
    let requested = payload.and_then(|Json(p)| p.model);
    let model = requested.as_deref().unwrap_or_else(|| state.config().listing_gate_model());

    let report =
        state.pool().verify_key(state.dispatcher(), &id, model).await.map_err(key_error)?;
    Ok(Json(report))
}

/// Upstream model listing through failover. Aggregate failure degrades to an
/// empty list rather than an error: a pool with no working key still answers.
pub async fn list_models(State(state): State<AppState>) -> Result<Json<Vec<String>>, ApiError> {
    let gate = state.config().listing_gate_model();
    let attempts = state.config().failover_attempts;
    match state.pool().list_models(state.dispatcher(), gate, attempts).await {
        Ok(models) => Ok(Json(models)),
        Err(FailoverError::Exhausted { attempted, .. }) => {
            tracing::warn!(attempted, "model listing failover exhausted, serving empty list");
            Ok(Json(Vec::new()))
        },
        Err(FailoverError::Storage(e)) => Err(key_error(e)),
    }
}
