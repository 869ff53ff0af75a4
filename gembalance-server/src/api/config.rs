//! Quota configuration handlers.
//!
//! Submissions arrive as raw strings/numbers and are validated here before
//! touching the pool: category names must parse, quota values must be
//! positive. Failures come back as 422 with the typed error.

use axum::{extract::State, http::StatusCode, response::Json};
use gembalance_types::{
    CategoryQuotas, ConfigError, ModelCategory, ModelConfig, TypedError,
};
use serde::Deserialize;
use std::collections::HashMap;

use super::ApiError;
use crate::state::AppState;

fn config_error(err: ConfigError) -> ApiError {
    (StatusCode::UNPROCESSABLE_ENTITY, Json(TypedError::Config(err)))
}

fn require_positive(field: &str, value: Option<u64>) -> Result<(), ApiError> {
    if value == Some(0) {
        return Err(config_error(ConfigError::InvalidQuota {
            field: field.to_string(),
            value: 0,
        }));
    }
    Ok(())
}

pub async fn get_models(
    State(state): State<AppState>,
) -> Json<HashMap<String, ModelConfig>> {
    Json(state.pool().settings().await.models)
}

/// Raw model mapping as submitted; the category is a free-form name until
/// validated.
#[derive(Deserialize)]
pub struct ModelConfigSubmission {
    pub category: String,
    #[serde(default)]
    pub daily_quota: Option<u64>,
}

pub async fn put_models(
    State(state): State<AppState>,
    Json(payload): Json<HashMap<String, ModelConfigSubmission>>,
) -> Result<Json<HashMap<String, ModelConfig>>, ApiError> {
    let mut models = HashMap::with_capacity(payload.len());
    for (model, submission) in payload {
        let category = ModelCategory::parse(&submission.category).ok_or_else(|| {
            config_error(ConfigError::UnknownCategory { name: submission.category.clone() })
        })?;
        require_positive(&format!("models.{model}.daily_quota"), submission.daily_quota)?;
        models.insert(model, ModelConfig { category, daily_quota: submission.daily_quota });
    }
    state.pool().set_model_configs(models).await;
    Ok(Json(state.pool().settings().await.models))
}

pub async fn get_categories(State(state): State<AppState>) -> Json<CategoryQuotas> {
    Json(state.pool().settings().await.categories)
}

pub async fn put_categories(
    State(state): State<AppState>,
    Json(payload): Json<CategoryQuotas>,
) -> Result<Json<CategoryQuotas>, ApiError> {
    require_positive("categories.pro", payload.pro)?;
    require_positive("categories.flash", payload.flash)?;
    state.pool().set_category_quotas(payload.clone()).await;
    Ok(Json(payload))
}
