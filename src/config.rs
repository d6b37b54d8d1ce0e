//! Configuration management for the chat relay
//!
//! Values come from built-in defaults with the port given on the command
//! line layered over them. No file or environment source is read.

use config::{Config, ConfigError};
use serde::Deserialize;
use std::time::Duration;

use crate::protocol::codec::DEFAULT_MAX_PAYLOAD_LEN;
use crate::protocol::frame::MAX_MESSAGE_LEN;

const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0";
const DEFAULT_KEEPALIVE_INTERVAL_MS: u64 = 1000;
const DEFAULT_READ_TIMEOUT_MS: u64 = 1000;
const DEFAULT_OUTBOUND_QUEUE_CAPACITY: usize = 64;
const DEFAULT_MAX_CONNECTIONS: usize = 256;

/// Complete relay configuration
#[derive(Debug, Deserialize, Clone)]
pub struct RelayConfig {
    /// IP address to listen on
    pub bind_address: String,

    /// TCP port to listen on; 0 picks an ephemeral port
    pub port: u16,

    /// Delay between keepalive probes on each connection
    pub keepalive_interval_ms: u64,

    /// How long a read may block before the reader re-checks its state
    pub read_timeout_ms: u64,

    /// Largest payload the decoder buffers before discarding a frame
    pub max_payload_len: usize,

    /// Frames that may wait for a slow peer before broadcasts skip it
    pub outbound_queue_capacity: usize,

    /// Connections accepted at once; extra connections are closed
    pub max_connections: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bind_address: DEFAULT_BIND_ADDRESS.to_string(),
            port: 0,
            keepalive_interval_ms: DEFAULT_KEEPALIVE_INTERVAL_MS,
            read_timeout_ms: DEFAULT_READ_TIMEOUT_MS,
            max_payload_len: DEFAULT_MAX_PAYLOAD_LEN,
            outbound_queue_capacity: DEFAULT_OUTBOUND_QUEUE_CAPACITY,
            max_connections: DEFAULT_MAX_CONNECTIONS,
        }
    }
}

impl RelayConfig {
    /// Load the default configuration, listening on `port`.
    pub fn load(port: u16) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .set_default("bind_address", DEFAULT_BIND_ADDRESS)?
            .set_default("keepalive_interval_ms", DEFAULT_KEEPALIVE_INTERVAL_MS as i64)?
            .set_default("read_timeout_ms", DEFAULT_READ_TIMEOUT_MS as i64)?
            .set_default("max_payload_len", DEFAULT_MAX_PAYLOAD_LEN as i64)?
            .set_default("outbound_queue_capacity", DEFAULT_OUTBOUND_QUEUE_CAPACITY as i64)?
            .set_default("max_connections", DEFAULT_MAX_CONNECTIONS as i64)?
            .set_override("port", i64::from(port))?
            .build()?;

        let config: RelayConfig = settings.try_deserialize()?;
        if config.port == 0 {
            return Err(ConfigError::Message("Port cannot be 0".into()));
        }
        config.validate()?;
        Ok(config)
    }

    /// Validation for all values except the port
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.keepalive_interval_ms == 0 {
            return Err(ConfigError::Message(
                "keepalive_interval_ms must be greater than 0".into(),
            ));
        }

        if self.read_timeout_ms == 0 {
            return Err(ConfigError::Message(
                "read_timeout_ms must be greater than 0".into(),
            ));
        }

        if self.max_payload_len < MAX_MESSAGE_LEN {
            return Err(ConfigError::Message(format!(
                "max_payload_len must be at least {}",
                MAX_MESSAGE_LEN
            )));
        }

        if self.outbound_queue_capacity == 0 {
            return Err(ConfigError::Message(
                "outbound_queue_capacity must be greater than 0".into(),
            ));
        }

        if self.max_connections == 0 {
            return Err(ConfigError::Message(
                "max_connections must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    /// Get bind address and port as a socket address string
    pub fn listen_socket(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }

    pub fn keepalive_interval(&self) -> Duration {
        Duration::from_millis(self.keepalive_interval_ms)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }
}
