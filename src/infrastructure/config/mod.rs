//! Settings for the pipeline: completion endpoint, executor limits, catalog
//! preset and optional template overrides.
//!
//! Sources, later ones winning: `queryloom.toml`, then `QUERYLOOM_*`
//! environment variables (`__` separates nesting, e.g.
//! `QUERYLOOM_LLM__MODEL`). A `.env` file is honored via dotenvy before
//! loading.

use crate::domain::error::{AppError, Result};
use crate::domain::llm_config::{LLMConfig, LLMProvider};
use figment::providers::{Env, Format, Toml};
use figment::Figment;
use serde::Deserialize;
use std::path::PathBuf;

fn default_query_timeout() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct ExecutorSettings {
    /// Hard upper bound on a single generated-query execution, in seconds.
    #[serde(default = "default_query_timeout")]
    pub query_timeout_secs: u64,
    /// SQLite database file holding the pre-loaded tables. When unset, the
    /// CLI seeds an in-memory demo session for the chosen catalog.
    #[serde(default)]
    pub database: Option<String>,
}

impl Default for ExecutorSettings {
    fn default() -> Self {
        Self {
            query_timeout_secs: default_query_timeout(),
            database: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct TemplateSettings {
    pub schema_selector: Option<PathBuf>,
    pub code_generator: Option<PathBuf>,
}

fn default_catalog() -> String {
    "ecommerce".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    #[serde(default)]
    pub llm: LLMConfig,
    #[serde(default)]
    pub executor: ExecutorSettings,
    #[serde(default)]
    pub templates: TemplateSettings,
    /// Catalog preset name: "ecommerce" or "card_authorizations".
    #[serde(default = "default_catalog")]
    pub catalog: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            llm: LLMConfig::default(),
            executor: ExecutorSettings::default(),
            templates: TemplateSettings::default(),
            catalog: default_catalog(),
        }
    }
}

pub fn load() -> Result<Settings> {
    Figment::new()
        .merge(Toml::file("queryloom.toml"))
        .merge(Env::prefixed("QUERYLOOM_").split("__"))
        .extract()
        .map_err(|e| AppError::ValidationError(format!("Invalid configuration: {}", e)))
}

/// Fill the API key from the provider's conventional environment variable
/// when the settings leave it unset.
pub fn resolve_api_key(config: &mut LLMConfig) {
    if config.api_key.is_some() {
        return;
    }
    let var = match config.provider {
        LLMProvider::Gemini => "GEMINI_API_KEY",
        LLMProvider::OpenAI => "OPENAI_API_KEY",
    };
    if let Ok(key) = std::env::var(var) {
        if !key.is_empty() {
            config.api_key = Some(key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.executor.query_timeout_secs, 30);
        assert_eq!(settings.catalog, "ecommerce");
        assert_eq!(settings.llm.max_tokens, Some(400));
    }
}
