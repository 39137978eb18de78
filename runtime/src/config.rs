//! Configuration for aggregating receivers for display.
//!
//! # Example
//!
//! ```
//! use loadstate_runtime::LoadingConfig;
//! use std::time::Duration;
//!
//! let config = LoadingConfig::default()
//!     .with_minimum_render_threshold(Duration::from_millis(250));
//!
//! assert_eq!(config.minimum_render_threshold, Some(Duration::from_millis(250)));
//! ```

use loadstate_core::GateEnvironment;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Environment variable read by [`LoadingConfig::from_env`]
pub const RENDER_THRESHOLD_ENV: &str = "LOADSTATE_RENDER_THRESHOLD_MS";

/// Configuration errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The threshold is not a whole number of milliseconds
    #[error("Invalid render threshold {value:?}: expected a whole number of milliseconds")]
    InvalidThreshold {
        /// The rejected value
        value: String,
    },
}

/// Configuration of a multi-receiver view.
///
/// # Default Values
///
/// - `minimum_render_threshold`: `None` (transient states render immediately)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LoadingConfig {
    /// Delay before a pending state becomes visible
    pub minimum_render_threshold: Option<Duration>,
}

impl LoadingConfig {
    /// Create a new configuration with custom values
    #[must_use]
    pub const fn new(minimum_render_threshold: Option<Duration>) -> Self {
        Self {
            minimum_render_threshold,
        }
    }

    /// Configuration with a threshold in milliseconds
    #[must_use]
    pub const fn from_millis(threshold_millis: u64) -> Self {
        Self::new(Some(Duration::from_millis(threshold_millis)))
    }

    /// Set the render threshold
    #[must_use]
    pub const fn with_minimum_render_threshold(mut self, threshold: Duration) -> Self {
        self.minimum_render_threshold = Some(threshold);
        self
    }

    /// Remove the render threshold
    #[must_use]
    pub const fn without_render_threshold(mut self) -> Self {
        self.minimum_render_threshold = None;
        self
    }

    /// Load from `LOADSTATE_RENDER_THRESHOLD_MS`.
    ///
    /// Unset or blank means no threshold.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidThreshold`] if the variable is set to
    /// something other than a whole number of milliseconds.
    pub fn from_env() -> Result<Self, ConfigError> {
        match std::env::var(RENDER_THRESHOLD_ENV) {
            Ok(raw) => Ok(Self::new(parse_threshold(&raw)?)),
            Err(_) => Ok(Self::default()),
        }
    }

    /// The gate reducer's view of this configuration
    #[must_use]
    pub const fn gate_environment(&self) -> GateEnvironment {
        GateEnvironment::new(self.minimum_render_threshold)
    }
}

/// Parse a millisecond threshold; blank input means none.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidThreshold`] for anything but a whole number.
pub fn parse_threshold(raw: &str) -> Result<Option<Duration>, ConfigError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    trimmed
        .parse::<u64>()
        .map(|millis| Some(Duration::from_millis(millis)))
        .map_err(|_| ConfigError::InvalidThreshold {
            value: raw.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let config = LoadingConfig::from_millis(200);
        assert_eq!(config.minimum_render_threshold, Some(Duration::from_millis(200)));
        assert_eq!(config.without_render_threshold(), LoadingConfig::default());
    }

    #[test]
    fn test_parse_threshold() {
        assert_eq!(parse_threshold(""), Ok(None));
        assert_eq!(parse_threshold("  "), Ok(None));
        assert_eq!(parse_threshold("150"), Ok(Some(Duration::from_millis(150))));
        assert_eq!(
            parse_threshold("soon"),
            Err(ConfigError::InvalidThreshold {
                value: "soon".to_string()
            })
        );
    }

    #[test]
    fn test_gate_environment() {
        let env = LoadingConfig::from_millis(10).gate_environment();
        assert_eq!(env.minimum_render_threshold, Some(Duration::from_millis(10)));
    }
}
