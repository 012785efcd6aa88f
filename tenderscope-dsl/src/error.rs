//! Error types and the condition reporting channel

use serde::{Deserialize, Serialize};

/// DSL compiler errors
#[derive(Debug, thiserror::Error)]
pub enum DslError {
    #[error("Unknown aggregation id: {0}")]
    UnknownAggregationId(String),

    #[error("Unsupported filter kind: {0}")]
    UnsupportedFilterKind(String),

    #[error("Unsupported compare mode for field {field}: {mode}")]
    UnsupportedCompareMode { field: String, mode: String },

    #[error("Invalid numeric value for field {field}: {value}")]
    InvalidNumericValue { field: String, value: String },

    #[error("Inconsistent query shape: {0}")]
    InconsistentQueryShape(String),

    #[error("Malformed answer for aggregation {id}: missing {path}")]
    MalformedAnswer { id: String, path: String },

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl DslError {
    /// Stable short name of the condition, used in log fields
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UnknownAggregationId(_) => "unknown_aggregation_id",
            Self::UnsupportedFilterKind(_) => "unsupported_filter_kind",
            Self::UnsupportedCompareMode { .. } => "unsupported_compare_mode",
            Self::InvalidNumericValue { .. } => "invalid_numeric_value",
            Self::InconsistentQueryShape(_) => "inconsistent_query_shape",
            Self::MalformedAnswer { .. } => "malformed_answer",
            Self::Config(_) => "config",
            Self::Io(_) => "io",
            Self::Json(_) => "json",
            Self::Toml(_) => "toml",
        }
    }
}

/// How reported conditions are handled
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorMode {
    /// First condition aborts the operation
    Strict,
    /// Conditions are logged and recorded, the operation continues
    #[default]
    Lenient,
}

/// Collects conditions raised while compiling or parsing.
///
/// In strict mode `raise` hands the condition straight back so `?` aborts the
/// operation. In lenient mode the condition is logged, kept, and the caller
/// carries on with a partial result.
#[derive(Debug, Default)]
pub struct Diagnostics {
    mode: ErrorMode,
    issues: Vec<DslError>,
}

impl Diagnostics {
    pub fn new(mode: ErrorMode) -> Self {
        Self {
            mode,
            issues: Vec::new(),
        }
    }

    pub fn strict() -> Self {
        Self::new(ErrorMode::Strict)
    }

    pub fn lenient() -> Self {
        Self::new(ErrorMode::Lenient)
    }

    pub fn mode(&self) -> ErrorMode {
        self.mode
    }

    pub fn raise(&mut self, err: DslError) -> Result<(), DslError> {
        match self.mode {
            ErrorMode::Strict => Err(err),
            ErrorMode::Lenient => {
                tracing::warn!(kind = err.kind(), "{}", err);
                self.issues.push(err);
                Ok(())
            }
        }
    }

    pub fn issues(&self) -> &[DslError] {
        &self.issues
    }

    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn into_issues(self) -> Vec<DslError> {
        self.issues
    }
}
