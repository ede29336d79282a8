//! Error taxonomy for the ingestion and analysis pipeline
//!
//! Each failure family has its own type so callers can decide locally whether a
//! failure degrades to a partial result or terminates the enclosing job.

use thiserror::Error;

/// Failures raised while driving a browser session
#[derive(Error, Debug, Clone)]
pub enum FetchError {
    /// Navigation kept failing after every allowed attempt
    #[error("Navigation to {url} failed after {attempts} attempts: {last_error}")]
    Navigation {
        url: String,
        attempts: u32,
        last_error: String,
    },

    /// A browser session could not be acquired at all
    #[error("Failed to launch browser session: {0}")]
    SessionLaunch(String),

    #[error("Navigation to {url} timed out after {timeout_ms}ms")]
    Timeout { url: String, timeout_ms: u64 },

    /// The target answered with an explicit rate-limit signal
    #[error("Rate limited by {url}")]
    RateLimited { url: String },

    #[error("Transport error: {0}")]
    Transport(String),
}

impl FetchError {
    /// Rate-limit signals are never retried inside a session
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::Transport(_))
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

/// Per-element extraction failure; the batch always continues
#[derive(Error, Debug, Clone)]
pub enum ExtractionError {
    #[error("Required field '{field}' not found in element")]
    RequiredFieldMissing { field: &'static str },

    #[error("Invalid CSS selector: {selector} - {reason}")]
    InvalidSelector { selector: String, reason: String },
}

impl ExtractionError {
    pub fn required_field_missing(field: &'static str) -> Self {
        Self::RequiredFieldMissing { field }
    }
}

#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Persistence unavailable: {0}")]
    Unavailable(String),

    #[error("Invalid record '{id}': {reason}")]
    InvalidRecord { id: String, reason: String },
}

#[derive(Error, Debug)]
pub enum TrendsError {
    /// Distinct signal from the trends source; callers may fall back to cached rows
    #[error("Trends source rate limited the request: {0}")]
    RateLimited(String),

    #[error(transparent)]
    Fetch(FetchError),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    #[error("Suggestion endpoint error: {0}")]
    Suggestion(String),
}

impl From<FetchError> for TrendsError {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::RateLimited { url } => Self::RateLimited(url),
            other => Self::Fetch(other),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchedulerError {
    #[error("Scheduler is already running")]
    AlreadyRunning,

    #[error("Scheduler is not running")]
    NotRunning,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limit_is_not_retryable() {
        let err = FetchError::RateLimited { url: "https://example.com".to_string() };
        assert!(!err.is_retryable());
        assert!(FetchError::Transport("reset".to_string()).is_retryable());
    }

    #[test]
    fn test_rate_limited_fetch_maps_to_trends_rate_limit() {
        let err: TrendsError = FetchError::RateLimited { url: "u".to_string() }.into();
        assert!(matches!(err, TrendsError::RateLimited(_)));

        let err: TrendsError = FetchError::SessionLaunch("no browser".to_string()).into();
        assert!(matches!(err, TrendsError::Fetch(FetchError::SessionLaunch(_))));
    }
}
