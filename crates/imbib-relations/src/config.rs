//! Configuration for imbib-relations
//!
//! Settings for the relation lookup service, the coordinator's fetch
//! cycles, and the reference library's undo history.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::library::DEFAULT_UNDO_LIMIT;

/// Relation discovery configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "uniffi", derive(uniffi::Record))]
#[serde(default)]
pub struct RelationsConfig {
    /// Base URL of the Semantic Scholar Graph API
    pub base_url: String,
    /// User-Agent sent with every request
    pub user_agent: String,
    /// Per-request HTTP timeout in seconds
    pub request_timeout_secs: u64,
    /// Cancel a fetch cycle after this many seconds (None = no limit)
    pub fetch_timeout_secs: Option<u64>,
    /// Maximum number of related entries requested per lookup
    pub result_limit: u32,
    /// Buffered state changes per subscriber
    pub channel_capacity: u32,
    /// Maximum undo units kept by the in-memory library
    pub undo_limit: u32,
}

impl Default for RelationsConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.semanticscholar.org/graph/v1".to_string(),
            user_agent: "imbib/1.0 (https://imbib.app)".to_string(),
            request_timeout_secs: 30,
            fetch_timeout_secs: None,
            result_limit: 100,
            channel_capacity: 64,
            undo_limit: DEFAULT_UNDO_LIMIT as u32,
        }
    }
}

impl RelationsConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize configuration to TOML
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Load configuration from a JSON string
    pub fn from_json(json_str: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize configuration to JSON
    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        url::Url::parse(&self.base_url)
            .map_err(|_| ConfigError::InvalidUrl(self.base_url.clone()))?;

        if self.request_timeout_secs == 0 {
            return Err(ConfigError::OutOfRange(
                "request_timeout_secs must be positive".to_string(),
            ));
        }

        if self.fetch_timeout_secs == Some(0) {
            return Err(ConfigError::OutOfRange(
                "fetch_timeout_secs must be positive when set".to_string(),
            ));
        }

        // Semantic Scholar caps relation pages at 1000
        if self.result_limit == 0 || self.result_limit > 1000 {
            return Err(ConfigError::OutOfRange(
                "result_limit must be between 1 and 1000".to_string(),
            ));
        }

        if self.channel_capacity == 0 {
            return Err(ConfigError::OutOfRange(
                "channel_capacity must be positive".to_string(),
            ));
        }

        if self.undo_limit == 0 {
            return Err(ConfigError::OutOfRange(
                "undo_limit must be positive".to_string(),
            ));
        }

        Ok(())
    }
}
