//! Error taxonomy shared by the forwarding pipeline.

use std::io;

use thiserror::Error;

/// Errors raised while resolving, connecting to, or writing to a collector.
#[derive(Debug, Error)]
pub enum ForwarderError {
    /// The hostname produced no usable addresses.
    #[error("unable to resolve {host}:{port}: {source}")]
    Resolution {
        host: String,
        port: u16,
        #[source]
        source: io::Error,
    },
    /// Every resolved candidate failed to connect or complete a handshake.
    #[error("unable to connect to {host}:{port} after {attempts} attempt(s): {source}")]
    Connection {
        host: String,
        port: u16,
        attempts: usize,
        #[source]
        source: io::Error,
    },
    /// Writing to an established socket failed.
    #[error("failed to send record: {0}")]
    Send(#[source] io::Error),
    /// Invalid user supplied configuration.
    #[error("invalid forwarder configuration: {0}")]
    InvalidConfig(String),
}

impl ForwarderError {
    /// Whether retrying the same operation later could plausibly succeed.
    ///
    /// Resolution and configuration failures need operator intervention.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Connection { .. } | Self::Send(_))
    }
}
