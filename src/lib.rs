//! Resilient forwarding of formatted log records to a remote collector.
//!
//! Records arrive as finished text lines and leave as bare UTF-8 payloads
//! terminated by `\n` over UDP, TCP, or TLS. A [`LogForwarder`] resolves the
//! collector lazily, tries each resolved address in order until one
//! connects, and reports write failures to an [`ErrorSink`] rather than
//! failing the caller.

pub mod config;
pub mod connect;
pub mod destination;
pub mod error;
pub mod forwarder;
pub mod rate_limited_warner;
pub mod record;
pub mod resolver;
pub mod transport;
pub mod trust;

#[cfg(any(test, feature = "test-util"))]
pub mod test_utils;

pub use config::{ForwarderConfig, LogForwarderBuilder};
pub use connect::ConnectionEstablisher;
pub use destination::{Destination, Protocol, SocketKind};
pub use error::ForwarderError;
pub use forwarder::{ErrorSink, LogErrorSink, LogForwarder, SharedLogForwarder};
pub use record::encode_record;
pub use resolver::{AddressFamily, AddressResolver, CandidateEndpoint, SystemResolver};
pub use transport::{
    RecordTransport, SocketFactory, SystemSocketFactory, TransportOptions, TransportSocket,
};
pub use trust::{TrustConfig, VerificationPolicy};
