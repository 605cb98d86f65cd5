//! Error types for imbib-relations

use thiserror::Error;

/// Result type alias for relation operations
pub type Result<T> = std::result::Result<T, RelationError>;

/// Main error type for relation operations
#[derive(Error, Debug)]
#[cfg_attr(feature = "uniffi", derive(uniffi::Error), uniffi(flat_error))]
pub enum RelationError {
    /// The pivot entry has no DOI, so there is nothing to look up
    #[error("The selected entry does not have a DOI linked to it")]
    NoIdentifier,

    /// Fetch-related errors
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// Configuration errors
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// A fetch cycle was requested outside of a tokio runtime
    #[error("No async runtime available: {0}")]
    Runtime(String),
}

/// Failure of a single relation lookup.
///
/// Cloneable so that it can live inside the published `FetchResult`
/// snapshots handed to every subscriber.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "uniffi", derive(uniffi::Error), uniffi(flat_error))]
pub enum FetchError {
    #[error("Request failed: {message}")]
    Http { message: String },

    #[error("Unexpected HTTP status {status}")]
    Status { status: u16 },

    #[error("Rate limited")]
    RateLimited,

    #[error("Parse error: {message}")]
    Parse { message: String },

    #[error("Timed out")]
    Timeout,

    /// The fetcher crashed instead of returning
    #[error("Fetcher failed: {message}")]
    Internal { message: String },

    /// The lookup was interrupted by its cancellation token
    #[error("Cancelled")]
    Cancelled,
}

impl FetchError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, FetchError::Cancelled)
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(err: serde_json::Error) -> Self {
        FetchError::Parse {
            message: err.to_string(),
        }
    }
}

/// Configuration errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Value out of range: {0}")]
    OutOfRange(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Parse error: {0}")]
    Parse(String),
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::Parse(err.to_string())
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        ConfigError::Parse(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_error_display() {
        let err = FetchError::Status { status: 404 };
        assert_eq!(err.to_string(), "Unexpected HTTP status 404");

        let wrapped: RelationError = err.into();
        assert_eq!(wrapped.to_string(), "Fetch error: Unexpected HTTP status 404");
    }

    #[test]
    fn test_is_cancelled() {
        assert!(FetchError::Cancelled.is_cancelled());
        assert!(!FetchError::Timeout.is_cancelled());
    }
}
