//! Oracle configuration.
//!
//! [`OracleConfig`] holds the tunables of the polling loop. It deserializes
//! from JSON with every field optional, and the
//! [`OracleBuilder`](crate::OracleBuilder) overrides individual fields.
//!
//! # Example
//!
//! ```
//! use oraclewire::OracleConfig;
//! use std::time::Duration;
//!
//! let config = OracleConfig::from_json_str(r#"{ "poll_interval_ms": 250 }"#).unwrap();
//! assert_eq!(config.poll_interval(), Duration::from_millis(250));
//! assert!(config.skip_answered);
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Default delay between two polling iterations.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Configuration for the oracle polling loop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OracleConfig {
    /// Delay between polling iterations, in milliseconds. Zero polls
    /// back-to-back, yielding to the runtime in between.
    pub poll_interval_ms: u64,
    /// Skip queries the backend already holds a response for instead of
    /// answering them again.
    pub skip_answered: bool,
}

impl OracleConfig {
    /// Parse a configuration from JSON.
    ///
    /// # Errors
    ///
    /// Returns [`OracleError::Json`](crate::OracleError::Json) on malformed
    /// input or unknown value types.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// The poll interval as a [`Duration`].
    #[inline]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: DEFAULT_POLL_INTERVAL.as_millis() as u64,
            skip_answered: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = OracleConfig::default();
        assert_eq!(config.poll_interval(), DEFAULT_POLL_INTERVAL);
        assert!(config.skip_answered);
    }

    #[test]
    fn test_empty_json_uses_defaults() {
        let config = OracleConfig::from_json_str("{}").unwrap();
        assert_eq!(config, OracleConfig::default());
    }

    #[test]
    fn test_full_json() {
        let config =
            OracleConfig::from_json_str(r#"{"poll_interval_ms": 0, "skip_answered": false}"#)
                .unwrap();

        assert_eq!(config.poll_interval(), Duration::ZERO);
        assert!(!config.skip_answered);
    }

    #[test]
    fn test_invalid_json() {
        let err = OracleConfig::from_json_str(r#"{"poll_interval_ms": "fast"}"#).unwrap_err();
        assert!(matches!(err, crate::OracleError::Json(_)));
    }
}
