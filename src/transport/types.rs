//! Backend kinds, node roles, and transport events.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::error::EdgeResult;
use crate::core::ConfigError;

/// Transport backend kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ConnectType {
    /// Direct TCP connections between publisher and subscribers.
    #[default]
    Tcp,
    /// Publish through an MQTT broker.
    Mqtt,
    /// MQTT for discovery, TCP for data.
    Hybrid,
    /// AI Telemetry Transport.
    Aitt,
    /// User supplied backend resolved from a library path.
    Custom,
}

impl ConnectType {
    /// All kinds, in declaration order.
    pub const ALL: [ConnectType; 5] = [
        ConnectType::Tcp,
        ConnectType::Mqtt,
        ConnectType::Hybrid,
        ConnectType::Aitt,
        ConnectType::Custom,
    ];

    /// Canonical upper-case name.
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectType::Tcp => "TCP",
            ConnectType::Mqtt => "MQTT",
            ConnectType::Hybrid => "HYBRID",
            ConnectType::Aitt => "AITT",
            ConnectType::Custom => "CUSTOM",
        }
    }

    /// Whether the kind publishes through a broker at `DEST_HOST:DEST_PORT`.
    pub fn uses_broker(&self) -> bool {
        matches!(
            self,
            ConnectType::Mqtt | ConnectType::Hybrid | ConnectType::Aitt
        )
    }
}

impl fmt::Display for ConnectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConnectType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ConnectType::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ConfigError::UnknownConnectType(s.to_owned()))
    }
}

impl TryFrom<String> for ConnectType {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ConnectType> for String {
    fn from(kind: ConnectType) -> Self {
        kind.as_str().to_owned()
    }
}

/// Role of a node on the edge network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeType {
    /// Publishes data to subscribers.
    Pub,
    /// Subscribes to a publisher.
    Sub,
    /// Sends queries and awaits answers.
    QueryClient,
    /// Answers queries.
    QueryServer,
}

/// Event delivered by a backend on its own thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EdgeEvent {
    /// A peer finished connecting.
    ConnectionCompleted,
    /// A peer connection was closed.
    ConnectionClosed,
    /// A peer announced its format description.
    Capability(String),
    /// Data arrived from a peer.
    NewDataReceived,
    /// Backend specific event code.
    Unknown(i32),
}

/// Callback invoked by a backend for every event.
pub type EventCallback = Arc<dyn Fn(&EdgeEvent) -> EdgeResult<()> + Send + Sync>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_type_parse() {
        assert_eq!("tcp".parse::<ConnectType>().unwrap(), ConnectType::Tcp);
        assert_eq!(" Custom ".parse::<ConnectType>().unwrap(), ConnectType::Custom);
        assert_eq!(
            "zmq".parse::<ConnectType>(),
            Err(ConfigError::UnknownConnectType("zmq".into()))
        );
    }

    #[test]
    fn test_connect_type_roundtrips_names() {
        for kind in ConnectType::ALL {
            assert_eq!(kind.to_string().parse::<ConnectType>().unwrap(), kind);
        }
    }

    #[test]
    fn test_broker_kinds() {
        assert!(ConnectType::Mqtt.uses_broker());
        assert!(ConnectType::Hybrid.uses_broker());
        assert!(!ConnectType::Tcp.uses_broker());
        assert!(!ConnectType::Custom.uses_broker());
    }

    #[test]
    fn test_connect_type_serde() {
        let kind: ConnectType = serde_json::from_str("\"mqtt\"").unwrap();
        assert_eq!(kind, ConnectType::Mqtt);
        assert_eq!(serde_json::to_string(&ConnectType::Aitt).unwrap(), "\"AITT\"");
        assert!(serde_json::from_str::<ConnectType>("\"udp\"").is_err());
    }
}
