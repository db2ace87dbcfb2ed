//! Coordinator configuration
//!
//! All fields have defaults, so an empty JSON object (or no file at all)
//! yields a working configuration.

use crate::error::{ChatError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// How a quitting client's id is compared against session creators
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CreatorMatch {
    /// `Alice` quitting reaps rooms created by `alice`
    #[default]
    IgnoreCase,
    /// Byte-for-byte comparison
    Exact,
}

impl CreatorMatch {
    /// Whether `creator` belongs to `client_id` under this policy
    pub fn matches(self, creator: &str, client_id: &str) -> bool {
        match self {
            Self::IgnoreCase => creator.to_lowercase() == client_id.to_lowercase(),
            Self::Exact => creator == client_id,
        }
    }
}

/// Configuration for `SessionCoordinator`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoordinatorConfig {
    /// Upper bound for a single handle call during fan-out (milliseconds)
    #[serde(default = "default_delivery_timeout_ms")]
    pub delivery_timeout_ms: u64,

    /// strftime pattern used for message timestamps
    #[serde(default = "default_timestamp_format")]
    pub timestamp_format: String,

    /// Creator comparison used when reaping a quitting client's rooms
    #[serde(default)]
    pub creator_match: CreatorMatch,
}

fn default_delivery_timeout_ms() -> u64 {
    5_000
}

fn default_timestamp_format() -> String {
    "%Y-%m-%d %H:%M:%S".to_string()
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            delivery_timeout_ms: default_delivery_timeout_ms(),
            timestamp_format: default_timestamp_format(),
            creator_match: CreatorMatch::default(),
        }
    }
}

impl CoordinatorConfig {
    /// Parse and validate a JSON document
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a JSON file; a missing file yields the defaults
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }

        let json = std::fs::read_to_string(path).map_err(|e| {
            ChatError::Config(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;

        Self::from_json(&json).map_err(|e| {
            ChatError::Config(format!(
                "Failed to parse config file {}: {}",
                path.display(),
                e
            ))
        })
    }

    /// Reject values the coordinator cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.delivery_timeout_ms == 0 {
            return Err(ChatError::Config(
                "deliveryTimeoutMs must be > 0".to_string(),
            ));
        }
        if self.timestamp_format.trim().is_empty() {
            return Err(ChatError::Config(
                "timestampFormat cannot be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Set the per-delivery timeout
    pub fn with_delivery_timeout(mut self, timeout: Duration) -> Self {
        self.delivery_timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// Set the timestamp format
    pub fn with_timestamp_format(mut self, format: impl Into<String>) -> Self {
        self.timestamp_format = format.into();
        self
    }

    /// Set the creator comparison policy
    pub fn with_creator_match(mut self, creator_match: CreatorMatch) -> Self {
        self.creator_match = creator_match;
        self
    }

    /// Per-delivery timeout as a `Duration`
    pub fn delivery_timeout(&self) -> Duration {
        Duration::from_millis(self.delivery_timeout_ms)
    }
}
