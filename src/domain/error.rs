//! Domain error types.
//!
//! Every failure carries a machine-readable [`ErrorKind`] and a human-readable
//! message. Undefined metrics are not errors: they surface as `None` fields on
//! [`PerformanceMetrics`](crate::domain::metrics::PerformanceMetrics).

use serde::Serialize;

/// Machine-readable error classification handed to API callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    DataNotFound,
    InvalidParameters,
    Cancelled,
    Config,
    DataSource,
    Io,
}

/// Top-level error type for equitysim.
#[derive(Debug, thiserror::Error)]
pub enum BacktestError {
    #[error("no price data for {symbol} between {date_from} and {date_to}")]
    DataNotFound {
        symbol: String,
        date_from: chrono::NaiveDate,
        date_to: chrono::NaiveDate,
    },

    #[error("no overlapping trading days across {symbols} between {date_from} and {date_to}")]
    NoCommonDates {
        symbols: String,
        date_from: chrono::NaiveDate,
        date_to: chrono::NaiveDate,
    },

    #[error("invalid parameters: {reason}")]
    InvalidParameters { reason: String },

    #[error("simulation cancelled")]
    Cancelled,

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

    #[error("data source error: {reason}")]
    DataSource { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl BacktestError {
    pub fn invalid(reason: impl Into<String>) -> Self {
        BacktestError::InvalidParameters {
            reason: reason.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            BacktestError::DataNotFound { .. } | BacktestError::NoCommonDates { .. } => {
                ErrorKind::DataNotFound
            }
            BacktestError::InvalidParameters { .. } => ErrorKind::InvalidParameters,
            BacktestError::Cancelled => ErrorKind::Cancelled,
            BacktestError::ConfigParse { .. }
            | BacktestError::ConfigMissing { .. }
            | BacktestError::ConfigInvalid { .. } => ErrorKind::Config,
            BacktestError::DataSource { .. } => ErrorKind::DataSource,
            BacktestError::Io(_) => ErrorKind::Io,
        }
    }
}

impl From<&BacktestError> for std::process::ExitCode {
    fn from(err: &BacktestError) -> Self {
        let code: u8 = match err.kind() {
            ErrorKind::Io => 1,
            ErrorKind::Config => 2,
            ErrorKind::DataSource => 3,
            ErrorKind::InvalidParameters => 4,
            ErrorKind::DataNotFound => 5,
            ErrorKind::Cancelled => 6,
        };
        std::process::ExitCode::from(code)
    }
}
