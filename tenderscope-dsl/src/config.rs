//! Configuration for the DSL compiler
//!
//! Default config location: ./tenderscope.toml

use crate::error::{DslError, ErrorMode};
use crate::Result;
use chrono::Datelike;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Main configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct DslConfig {
    #[serde(default)]
    pub query: QueryConfig,
    #[serde(default)]
    pub errors: ErrorsConfig,
    #[serde(default)]
    pub registry: RegistryConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct QueryConfig {
    /// Known nested scopes in priority order, most specific first
    #[serde(default = "default_nested_scopes")]
    pub nested_scopes: Vec<String>,
    #[serde(default = "default_sort_field")]
    pub default_sort_field: String,
    /// Bucket size of terms aggregations that don't ask for one
    #[serde(default = "default_bucket_size")]
    pub default_bucket_size: u32,
    #[serde(default = "default_country_field")]
    pub country_field: String,
}

pub fn default_nested_scopes() -> Vec<String> {
    [
        "lots.bids.bidders",
        "lots.bids",
        "lots.cpvs",
        "lots",
        "buyers",
        "cpvs",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_sort_field() -> String {
    "modified".to_string()
}

fn default_bucket_size() -> u32 {
    5
}

fn default_country_field() -> String {
    "country".to_string()
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            nested_scopes: default_nested_scopes(),
            default_sort_field: default_sort_field(),
            default_bucket_size: default_bucket_size(),
            country_field: default_country_field(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ErrorsConfig {
    #[serde(default)]
    pub mode: ErrorMode,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RegistryConfig {
    #[serde(default = "default_min_year")]
    pub min_year: i32,
    /// Upper bound of accepted histogram years; current UTC year when unset
    #[serde(default)]
    pub max_year: Option<i32>,
    /// Language tag handed to the classification-name lookup
    #[serde(default = "default_language")]
    pub language: String,
}

fn default_min_year() -> i32 {
    2006
}

fn default_language() -> String {
    "EN".to_string()
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            min_year: default_min_year(),
            max_year: None,
            language: default_language(),
        }
    }
}

impl RegistryConfig {
    /// Inclusive range of years kept by the award-date histogram parsers
    pub fn valid_years(&self) -> std::ops::RangeInclusive<i32> {
        let max = self
            .max_year
            .unwrap_or_else(|| chrono::Utc::now().year());
        self.min_year..=max
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_level")]
    pub level: String,
}

fn default_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
        }
    }
}

impl DslConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: DslConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load config from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Load config, falling back to defaults when the file doesn't exist
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            tracing::debug!("Config {:?} not found, using defaults", path);
            Ok(Self::default())
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content =
            toml::to_string_pretty(self).map_err(|e| DslError::Config(e.to_string()))?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, content)?;
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if let Some(scope) = self
            .query
            .nested_scopes
            .iter()
            .find(|s| s.is_empty() || s.starts_with('.') || s.ends_with('.'))
        {
            return Err(DslError::Config(format!(
                "invalid nested scope path '{}'",
                scope
            )));
        }
        if self.query.default_sort_field.is_empty() {
            return Err(DslError::Config(
                "default_sort_field must not be empty".to_string(),
            ));
        }
        if let Some(max) = self.registry.max_year {
            if max < self.registry.min_year {
                return Err(DslError::Config(format!(
                    "registry.max_year {} is before min_year {}",
                    max, self.registry.min_year
                )));
            }
        }
        Ok(())
    }
}
