//! DAO configuration

use crate::error::ConfigError;
use chrono::Duration;
use docgraph_core::Name;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Upper bound for `voting_period_secs` (ten years)
pub const MAX_VOTING_PERIOD_SECS: u64 = 10 * 365 * 24 * 60 * 60;

/// DAO configuration
///
/// Missing TOML keys fall back to [`DaoConfig::default`]:
///
/// ```toml
/// root_name = "hypha"
/// voting_period_secs = 604800
/// exclusive_edits = true
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DaoConfig {
    /// Name recorded in the root document
    pub root_name: Name,
    /// Time between proposal creation and the earliest close
    pub voting_period_secs: u64,
    /// At most one active edit proposal per original document
    pub exclusive_edits: bool,
}

impl DaoConfig {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    #[must_use]
    pub fn with_root_name(mut self, root_name: Name) -> Self {
        self.root_name = root_name;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_voting_period_secs(mut self, secs: u64) -> Self {
        self.voting_period_secs = secs;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_exclusive_edits(mut self, exclusive: bool) -> Self {
        self.exclusive_edits = exclusive;
        self
    }

    #[must_use]
    pub fn voting_period(&self) -> Duration {
        let secs = self.voting_period_secs.min(MAX_VOTING_PERIOD_SECS);
        Duration::seconds(i64::try_from(secs).unwrap_or_default())
    }

    /// # Errors
    /// Returns `Invalid` if the voting period is out of range
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.voting_period_secs > MAX_VOTING_PERIOD_SECS {
            return Err(ConfigError::Invalid(format!(
                "voting_period_secs {} exceeds {MAX_VOTING_PERIOD_SECS}",
                self.voting_period_secs
            )));
        }
        Ok(())
    }

    /// # Errors
    /// Parse or validation errors
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// # Errors
    /// IO, parse or validation errors
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }
}

impl Default for DaoConfig {
    fn default() -> Self {
        Self {
            root_name: Name::from_static("dao"),
            voting_period_secs: 7 * 24 * 60 * 60,
            exclusive_edits: true,
        }
    }
}
