//! Sink configuration.
//!
//! Field names follow the element's property names when (de)serialised:
//! `host`, `port`, `dest-host`, `dest-port`, `connect-type`, `topic`,
//! `wait-connection`, `connection-timeout`, `custom-lib`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::ConfigError;
use crate::core::constants::{
    DEFAULT_CONNECTION_TIMEOUT_MS, DEFAULT_DEST_HOST, DEFAULT_DEST_PORT, DEFAULT_HOST,
    DEFAULT_PORT,
};
use crate::transport::ConnectType;

/// Endpoint and wait configuration of an edge sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct SinkConfig {
    /// Self host accepting subscriber connections.
    pub host: String,

    /// Self port (0 = let the backend pick one).
    pub port: u16,

    /// Broker host for broker-style transports.
    pub dest_host: String,

    /// Broker port for broker-style transports.
    pub dest_port: u16,

    /// Transport backend kind.
    pub connect_type: ConnectType,

    /// Publish topic.
    pub topic: Option<String>,

    /// Hold buffers until a subscriber connects.
    pub wait_connection: bool,

    /// Connection wait timeout in milliseconds (0 = forever).
    pub connection_timeout: u64,

    /// Library path of the custom backend.
    pub custom_lib: Option<PathBuf>,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_owned(),
            port: DEFAULT_PORT,
            dest_host: DEFAULT_DEST_HOST.to_owned(),
            dest_port: DEFAULT_DEST_PORT,
            connect_type: ConnectType::default(),
            topic: None,
            wait_connection: false,
            connection_timeout: DEFAULT_CONNECTION_TIMEOUT_MS,
            custom_lib: None,
        }
    }
}

impl SinkConfig {
    /// Parse a JSON document. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Check the combination of fields needed to start a transport.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.connect_type == ConnectType::Custom && self.custom_lib_path().is_none() {
            return Err(ConfigError::MissingCustomLibrary);
        }
        if self.connect_type.uses_broker() && self.dest_host.trim().is_empty() {
            return Err(ConfigError::MissingDestinationHost(
                self.connect_type.as_str(),
            ));
        }
        Ok(())
    }

    /// Custom backend path, if set and non-empty.
    pub fn custom_lib_path(&self) -> Option<&Path> {
        self.custom_lib
            .as_deref()
            .filter(|path| !path.as_os_str().is_empty())
    }

    /// Topic, if set and non-empty.
    pub fn topic(&self) -> Option<&str> {
        self.topic.as_deref().filter(|topic| !topic.is_empty())
    }

    /// Snapshot of the connection wait settings.
    pub fn wait_policy(&self) -> WaitPolicy {
        WaitPolicy {
            wait_connection: self.wait_connection,
            connection_timeout_ms: self.connection_timeout,
        }
    }
}

/// Connection wait settings, copied once per buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WaitPolicy {
    /// Whether to wait at all.
    pub wait_connection: bool,
    /// Timeout in milliseconds (0 = forever).
    pub connection_timeout_ms: u64,
}

impl WaitPolicy {
    /// Timeout as a duration, `None` when waiting forever.
    pub fn timeout(&self) -> Option<Duration> {
        match self.connection_timeout_ms {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        }
    }
}

/// Builder for [`SinkConfig`].
#[derive(Debug, Default)]
pub struct EdgeSinkBuilder {
    config: SinkConfig,
}

impl EdgeSinkBuilder {
    /// Create a builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the self host.
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    /// Set the self port.
    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    /// Set the broker host.
    pub fn dest_host(mut self, host: impl Into<String>) -> Self {
        self.config.dest_host = host.into();
        self
    }

    /// Set the broker port.
    pub fn dest_port(mut self, port: u16) -> Self {
        self.config.dest_port = port;
        self
    }

    /// Set the backend kind.
    pub fn connect_type(mut self, kind: ConnectType) -> Self {
        self.config.connect_type = kind;
        self
    }

    /// Set the publish topic.
    pub fn topic(mut self, topic: impl Into<String>) -> Self {
        self.config.topic = Some(topic.into());
        self
    }

    /// Enable or disable waiting for a connection.
    pub fn wait_connection(mut self, enabled: bool) -> Self {
        self.config.wait_connection = enabled;
        self
    }

    /// Set the connection wait timeout. `Duration::ZERO` waits forever.
    pub fn connection_timeout(mut self, timeout: Duration) -> Self {
        self.config.connection_timeout = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Select a custom backend by library path.
    pub fn custom_lib(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.custom_lib = Some(path.into());
        self
    }

    /// Build the configuration.
    pub fn build(self) -> SinkConfig {
        self.config
    }
}
