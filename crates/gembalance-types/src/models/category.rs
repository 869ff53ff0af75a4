//! Model category classification and quota configuration.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Coarse billing/quota class a model belongs to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ModelCategory {
    /// Pro-tier models
    Pro,
    /// Flash-tier models (also the fallback class)
    Flash,
    /// Explicitly configured custom models
    Custom,
}

impl ModelCategory {
    /// Infer a category from a model identifier.
    ///
    /// This is the single point of truth for the substring fallback used when
    /// a model has no explicit mapping. Clients may probe unlisted models and
    /// must still receive best-effort service, so the rules are deliberately
    /// loose: "flash" wins over "pro", and anything else defaults to Flash.
    /// The exact rules are load-bearing for compatibility; do not tighten.
    pub fn infer(model: &str) -> Self {
        let lower = model.to_lowercase();
        if lower.contains("flash") {
            Self::Flash
        } else if lower.contains("pro") {
            Self::Pro
        } else {
            Self::Flash
        }
    }

    /// Counter dimension name for this category.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pro => "pro",
            Self::Flash => "flash",
            Self::Custom => "custom",
        }
    }

    /// Parse a category name as submitted through the admin surface.
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "pro" => Some(Self::Pro),
            "flash" => Some(Self::Flash),
            "custom" => Some(Self::Custom),
            _ => None,
        }
    }
}

impl std::fmt::Display for ModelCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Explicit configuration for one model identifier.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ModelConfig {
    /// Category the model is billed under
    pub category: ModelCategory,
    /// Per-key daily quota for this model; `None` means unlimited
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub daily_quota: Option<u64>,
}

/// Category-level aggregate daily caps across all keys.
///
/// `None` means unlimited. Custom models carry no aggregate cap; their limits
/// are per-key only.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CategoryQuotas {
    /// Daily cap for Pro-category usage summed across the pool
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pro: Option<u64>,
    /// Daily cap for Flash-category usage summed across the pool
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flash: Option<u64>,
}

impl CategoryQuotas {
    /// Aggregate cap for a category, if configured.
    pub const fn cap_for(&self, category: ModelCategory) -> Option<u64> {
        match category {
            ModelCategory::Pro => self.pro,
            ModelCategory::Flash => self.flash,
            ModelCategory::Custom => None,
        }
    }
}

/// Full quota configuration consumed by the quota policy.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct QuotaSettings {
    /// Explicit model → category/quota mappings
    #[serde(default)]
    pub models: HashMap<String, ModelConfig>,
    /// Category-level aggregate caps
    #[serde(default)]
    pub categories: CategoryQuotas,
}

impl QuotaSettings {
    /// Resolve a model identifier to its category: explicit mapping first,
    /// substring inference otherwise.
    pub fn category_of(&self, model: &str) -> ModelCategory {
        self.models.get(model).map_or_else(|| ModelCategory::infer(model), |cfg| cfg.category)
    }

    /// Per-key daily quota configured for a model, if any.
    pub fn model_quota(&self, model: &str) -> Option<u64> {
        self.models.get(model).and_then(|cfg| cfg.daily_quota)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_infer_flash_wins_over_pro() {
        assert_eq!(ModelCategory::infer("gemini-2.5-flash"), ModelCategory::Flash);
        assert_eq!(ModelCategory::infer("gemini-2.5-pro"), ModelCategory::Pro);
        // "flash" substring takes precedence when both appear
        assert_eq!(ModelCategory::infer("pro-flash-exp"), ModelCategory::Flash);
    }

    #[test]
    fn test_infer_defaults_to_flash() {
        assert_eq!(ModelCategory::infer("imagen-3"), ModelCategory::Flash);
        assert_eq!(ModelCategory::infer(""), ModelCategory::Flash);
    }

    #[test]
    fn test_explicit_mapping_beats_inference() {
        let mut settings = QuotaSettings::default();
        settings.models.insert(
            "gemini-2.5-flash".to_string(),
            ModelConfig { category: ModelCategory::Custom, daily_quota: Some(10) },
        );
        assert_eq!(settings.category_of("gemini-2.5-flash"), ModelCategory::Custom);
        assert_eq!(settings.model_quota("gemini-2.5-flash"), Some(10));
        assert_eq!(settings.category_of("gemini-2.5-pro"), ModelCategory::Pro);
    }

    #[test]
    fn test_custom_category_has_no_aggregate_cap() {
        let quotas = CategoryQuotas { pro: Some(100), flash: Some(200) };
        assert_eq!(quotas.cap_for(ModelCategory::Pro), Some(100));
        assert_eq!(quotas.cap_for(ModelCategory::Flash), Some(200));
        assert_eq!(quotas.cap_for(ModelCategory::Custom), None);
    }
}
