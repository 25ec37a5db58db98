//! Client configuration.
//!
//! # Example
//!
//! ```
//! use beanstalk_client::ClientConfig;
//!
//! let config = ClientConfig::from_json_str(r#"{ "port": 11301, "default_ttr": 120 }"#).unwrap();
//! assert_eq!(config.port, 11301);
//! assert_eq!(config.default_ttr, 120);
//! assert_eq!(config.host, "127.0.0.1"); // defaults fill the rest
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SerializerError};

/// Default server host.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default server port.
pub const DEFAULT_PORT: u16 = 11300;

/// Default job priority (lower is more urgent).
pub const DEFAULT_PRIORITY: u32 = 1024;

/// Default delay in seconds before a new job becomes ready.
pub const DEFAULT_DELAY: u32 = 0;

/// Default time-to-run in seconds.
pub const DEFAULT_TTR: u32 = 30;

/// Default maximum serialized payload size (64KB).
pub const DEFAULT_MAX_PAYLOAD_SIZE: usize = 65_536;

/// Default time allowed for a response payload to arrive after its header.
pub const DEFAULT_DATA_READ_TIMEOUT_MS: u64 = 1000;

/// Connection and job defaults for a [`crate::Client`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Server host.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Priority used by `put` when none is given.
    pub default_priority: u32,
    /// Delay used by `put` when none is given.
    pub default_delay: u32,
    /// TTR used by `put` when none is given.
    pub default_ttr: u32,
    /// Largest serialized payload `put` will send.
    pub max_payload_size: usize,
    /// Payload read timeout in milliseconds.
    pub data_read_timeout_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            default_priority: DEFAULT_PRIORITY,
            default_delay: DEFAULT_DELAY,
            default_ttr: DEFAULT_TTR,
            max_payload_size: DEFAULT_MAX_PAYLOAD_SIZE,
            data_read_timeout_ms: DEFAULT_DATA_READ_TIMEOUT_MS,
        }
    }
}

impl ClientConfig {
    /// Parse a config from JSON. Missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`SerializerError::Deserialize`] on malformed JSON.
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| SerializerError::Deserialize(e.to_string()).into())
    }

    /// Payload read timeout.
    #[inline]
    pub fn data_read_timeout(&self) -> Duration {
        Duration::from_millis(self.data_read_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 11300);
        assert_eq!(config.default_priority, 1024);
        assert_eq!(config.default_delay, 0);
        assert_eq!(config.default_ttr, 30);
        assert_eq!(config.max_payload_size, 65_536);
        assert_eq!(config.data_read_timeout(), Duration::from_secs(1));
    }

    #[test]
    fn test_partial_json() {
        let config = ClientConfig::from_json_str(r#"{"host":"queue.local","data_read_timeout_ms":250}"#)
            .unwrap();
        assert_eq!(config.host, "queue.local");
        assert_eq!(config.data_read_timeout(), Duration::from_millis(250));
        assert_eq!(config.port, DEFAULT_PORT);
    }

    #[test]
    fn test_empty_json_is_default() {
        assert_eq!(ClientConfig::from_json_str("{}").unwrap(), ClientConfig::default());
    }

    #[test]
    fn test_malformed_json() {
        let err = ClientConfig::from_json_str(r#"{"port":"high"}"#).unwrap_err();
        assert_eq!(err.code(), "ErrDeserializeError");
    }
}
