//! Connection, batching and load-session configuration.
//!
//! Settings can be built in code or deserialized from JSON. Durations are
//! written in milliseconds and every field is optional:
//!
//! ```
//! use render_stream::ConnectionSettings;
//! use std::time::Duration;
//!
//! let settings = ConnectionSettings::from_json(
//!     r#"{ "address": "ws://render.local:9000", "retries": 3, "retry_delay": 250 }"#,
//! ).unwrap();
//!
//! assert_eq!(settings.retries, 3);
//! assert_eq!(settings.retry_delay, Duration::from_millis(250));
//! assert_eq!(settings.timeout, Duration::from_secs(5));
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Default server address.
pub const DEFAULT_ADDRESS: &str = "ws://127.0.0.1:8080";

/// Default retry budget (-1 = unlimited).
pub const DEFAULT_RETRIES: i32 = -1;

/// Default time allowed to open and validate a session.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Default delay before a reconnect attempt.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Default maximum number of elements sent in one bulk call.
pub const DEFAULT_MAX_BATCH_SIZE: usize = 10_000;

/// Default interval between load-status polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Where and how to connect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionSettings {
    /// WebSocket URL of the render service.
    pub address: String,
    /// Reconnect attempts allowed after a failure; negative means unlimited.
    pub retries: i32,
    /// Time allowed from opening the socket until the session is validated.
    #[serde(with = "millis")]
    pub timeout: Duration,
    /// Delay before each reconnect attempt.
    #[serde(with = "millis")]
    pub retry_delay: Duration,
}

impl ConnectionSettings {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            ..Self::default()
        }
    }

    /// Parse settings from JSON, defaulting missing fields.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Set the retry budget (-1 = unlimited).
    pub fn retries(mut self, retries: i32) -> Self {
        self.retries = retries;
        self
    }

    /// Set the connect timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the delay before reconnecting.
    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    #[inline]
    pub fn unlimited_retries(&self) -> bool {
        self.retries < 0
    }
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            address: DEFAULT_ADDRESS.to_string(),
            retries: DEFAULT_RETRIES,
            timeout: DEFAULT_TIMEOUT,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }
}

/// Splitting of bulk arguments into several calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Maximum elements per call. Zero is treated as one.
    pub max_batch_size: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
        }
    }
}

/// Load session polling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadConfig {
    #[serde(with = "millis")]
    pub poll_interval: Duration,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(deserializer)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = ConnectionSettings::default();
        assert_eq!(settings.address, DEFAULT_ADDRESS);
        assert!(settings.unlimited_retries());
        assert_eq!(settings.timeout, DEFAULT_TIMEOUT);
        assert_eq!(settings.retry_delay, DEFAULT_RETRY_DELAY);
        assert_eq!(BatchConfig::default().max_batch_size, 10_000);
        assert_eq!(LoadConfig::default().poll_interval, Duration::from_millis(100));
    }

    #[test]
    fn test_builder_chaining() {
        let settings = ConnectionSettings::new("ws://host:1")
            .retries(2)
            .timeout(Duration::from_millis(300))
            .retry_delay(Duration::from_millis(50));
        assert_eq!(settings.address, "ws://host:1");
        assert_eq!(settings.retries, 2);
        assert!(!settings.unlimited_retries());
        assert_eq!(settings.timeout, Duration::from_millis(300));
        assert_eq!(settings.retry_delay, Duration::from_millis(50));
    }

    #[test]
    fn test_json_empty_object_is_default() {
        let settings = ConnectionSettings::from_json("{}").unwrap();
        assert_eq!(settings, ConnectionSettings::default());
    }

    #[test]
    fn test_json_roundtrip() {
        let settings = ConnectionSettings::new("ws://a").retries(0);
        let json = serde_json::to_string(&settings).unwrap();
        assert!(json.contains("\"timeout\":5000"));
        assert_eq!(ConnectionSettings::from_json(&json).unwrap(), settings);
    }

    #[test]
    fn test_json_invalid() {
        assert!(ConnectionSettings::from_json("{\"retries\": \"many\"}").is_err());
    }
}
