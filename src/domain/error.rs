//! Domain error types.
//!
//! `InsufficientData` is non-fatal: callers degrade to empty/zero results.
//! `InvalidConfig` is fatal and rejected before any simulation starts.
//! Degenerate numeric inputs (zero variance, empty ledgers) are never errors;
//! they resolve to documented sentinels inside the analyzers.

/// Top-level error type for quantfolio.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("insufficient data: have {have} bars, need {need}")]
    InsufficientData { have: usize, need: usize },

    #[error("invalid config {field}: {reason}")]
    InvalidConfig { field: String, reason: String },

    #[error("no data for {symbol}")]
    NoData { symbol: String },

    #[error("upstream data error: {reason}")]
    Upstream { reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl EngineError {
    pub fn invalid_config(field: &str, reason: impl Into<String>) -> Self {
        EngineError::InvalidConfig {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<&EngineError> for std::process::ExitCode {
    fn from(err: &EngineError) -> Self {
        let code: u8 = match err {
            EngineError::Io(_) => 1,
            EngineError::ConfigParse { .. }
            | EngineError::ConfigMissing { .. }
            | EngineError::ConfigInvalid { .. } => 2,
            EngineError::InvalidConfig { .. } => 3,
            EngineError::Upstream { .. } => 4,
            EngineError::NoData { .. } | EngineError::InsufficientData { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
