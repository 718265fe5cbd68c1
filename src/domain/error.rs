//! Domain error types.

use chrono::NaiveDate;

/// Top-level error type for stocksage.
#[derive(Debug, thiserror::Error)]
pub enum StocksageError {
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

    #[error("invalid configuration for {field}: {reason}")]
    InvalidConfiguration { field: String, reason: String },

    #[error("data error: {reason}")]
    Data { reason: String },

    #[error("empty price series for {code}")]
    EmptySeries { code: String },

    #[error("insufficient data for {code} on {date}: {indicator} has no defined value")]
    InsufficientData {
        code: String,
        date: NaiveDate,
        indicator: String,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl StocksageError {
    pub fn invalid_config(field: impl Into<String>, reason: impl Into<String>) -> Self {
        StocksageError::InvalidConfiguration {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

impl From<&StocksageError> for std::process::ExitCode {
    fn from(err: &StocksageError) -> Self {
        let code: u8 = match err {
            StocksageError::Io(_) => 1,
            StocksageError::ConfigParse { .. }
            | StocksageError::ConfigMissing { .. }
            | StocksageError::ConfigInvalid { .. }
            | StocksageError::InvalidConfiguration { .. } => 2,
            StocksageError::Data { .. } => 3,
            StocksageError::EmptySeries { .. } | StocksageError::InsufficientData { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
