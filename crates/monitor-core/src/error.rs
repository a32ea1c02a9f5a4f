//! Error types for the monitor

use thiserror::Error;

/// Failure of a single upstream fetch
///
/// Adapters only ever return these two kinds. The aggregator turns them into
/// [`SourceFailure`](crate::SourceFailure) entries instead of propagating them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    /// Upstream call errored, returned a non-success status, or timed out
    #[error("source unavailable: {0}")]
    Unavailable(String),

    /// Upstream response could not be mapped to the expected record shape
    #[error("source data invalid: {0}")]
    DataInvalid(String),
}

impl SourceError {
    /// Shorthand for [`SourceError::Unavailable`]
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable(reason.into())
    }

    /// Shorthand for [`SourceError::DataInvalid`]
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::DataInvalid(reason.into())
    }

    /// Whether retrying the same request could succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }

    /// The human-readable reason without the kind prefix
    pub fn reason(&self) -> &str {
        match self {
            Self::Unavailable(reason) | Self::DataInvalid(reason) => reason,
        }
    }
}

impl From<serde_json::Error> for SourceError {
    fn from(err: serde_json::Error) -> Self {
        Self::DataInvalid(format!("malformed JSON: {err}"))
    }
}

/// Errors outside the fetch path
#[derive(Debug, Error)]
pub enum MonitorError {
    /// Time range with `start` after `end`, or unparseable bounds
    #[error("Invalid time range: {0}")]
    InvalidRange(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Rendering collaborator failed
    #[error("Render error: {0}")]
    RenderError(String),
}

/// Result type alias for monitor operations
pub type Result<T> = std::result::Result<T, MonitorError>;
