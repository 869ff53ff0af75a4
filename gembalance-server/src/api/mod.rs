//! REST API routes.

mod check;
mod config;
mod errors;
mod keys;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{delete, get, post},
    Router,
};
use gembalance_types::{KeyError, TypedError};
use serde::Serialize;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        // Status
        .route("/status", get(get_status))
        // Keys
        .route("/keys", post(keys::add_keys).get(keys::list_keys))
        .route("/keys/:id", delete(keys::delete_key))
        // Health state
        .route("/keys/errored", get(errors::list_errored).delete(errors::delete_errored))
        .route("/keys/errored/clear", post(errors::clear_all))
        .route("/keys/:id/clear", post(errors::clear_one))
        .route("/keys/:id/verify", post(check::verify_key))
        // Quota config
        .route("/config/models", get(config::get_models).put(config::put_models))
        .route("/config/categories", get(config::get_categories).put(config::put_categories))
        // Upstream
        .route("/models", get(check::list_models))
        // API fallback: unknown endpoints answer 404, not the outer fallback
        .fallback(api_not_found)
}

async fn api_not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, Json(serde_json::json!({"error": "Not found"})))
}

/// Handler error shape: status code plus the serialized typed error.
pub(crate) type ApiError = (StatusCode, Json<TypedError>);

pub(crate) fn key_error(err: KeyError) -> ApiError {
    let status = match &err {
        KeyError::NotFound { .. } => StatusCode::NOT_FOUND,
        KeyError::Validation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        KeyError::Storage { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(TypedError::Key(err)))
}

#[derive(Serialize)]
struct StatusResponse {
    version: String,
    pool_size: usize,
    errored_count: usize,
    scheduler: crate::scheduler::SchedulerStatus,
}

async fn get_status(State(state): State<AppState>) -> Result<Json<StatusResponse>, ApiError> {
    let keys = state.pool().store().list_keys().await.map_err(key_error)?;
    let errored_count = keys.iter().filter(|k| k.is_errored()).count();
    let scheduler = state.inner.scheduler.read().await.clone();

    Ok(Json(StatusResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
        pool_size: keys.len(),
        errored_count,
        scheduler,
    }))
}
