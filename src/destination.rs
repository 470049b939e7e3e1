//! Where records are delivered: host, port, and wire protocol.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ForwarderError;

/// Wire protocol used to reach the collector.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Udp,
    Tcp,
    Tls,
}

/// Socket flavour implied by a [`Protocol`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SocketKind {
    Stream,
    Datagram,
}

impl Protocol {
    pub const ALL: [Protocol; 3] = [Protocol::Udp, Protocol::Tcp, Protocol::Tls];

    pub fn socket_kind(self) -> SocketKind {
        match self {
            Protocol::Tcp | Protocol::Tls => SocketKind::Stream,
            Protocol::Udp => SocketKind::Datagram,
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Protocol::Udp => "UDP",
            Protocol::Tcp => "TCP",
            Protocol::Tls => "TLS",
        };
        f.write_str(s)
    }
}

impl FromStr for Protocol {
    type Err = ForwarderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "UDP" => Ok(Self::Udp),
            "TCP" => Ok(Self::Tcp),
            "TLS" => Ok(Self::Tls),
            _ => Err(ForwarderError::InvalidConfig(format!(
                "unknown protocol {s:?}; expected one of UDP, TCP, TLS"
            ))),
        }
    }
}

/// Immutable description of the remote collector.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Destination {
    hostname: String,
    port: u16,
    protocol: Protocol,
}

impl Destination {
    /// Validate and construct a destination.
    ///
    /// The hostname must not be blank and the port must be non-zero.
    pub fn new(
        hostname: impl Into<String>,
        port: u16,
        protocol: Protocol,
    ) -> Result<Self, ForwarderError> {
        let hostname = hostname.into();
        if hostname.trim().is_empty() {
            return Err(ForwarderError::InvalidConfig(
                "hostname must not be empty".into(),
            ));
        }
        if port == 0 {
            return Err(ForwarderError::InvalidConfig(
                "port must be between 1 and 65535".into(),
            ));
        }
        Ok(Self {
            hostname,
            port,
            protocol,
        })
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    pub fn socket_kind(&self) -> SocketKind {
        self.protocol.socket_kind()
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}:{}", self.protocol, self.hostname, self.port)
    }
}
