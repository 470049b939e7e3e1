//! Establish a transport by trying each resolved candidate in order.

use std::io;

use crate::{
    destination::Destination,
    error::ForwarderError,
    resolver::{AddressResolver, SystemResolver},
    transport::{RecordTransport, SocketFactory, SystemSocketFactory, TransportOptions},
    trust::TrustConfig,
};

/// Walks resolver candidates and keeps the first socket that opens.
///
/// A multi-homed or round-robin collector therefore survives individual
/// addresses being unreachable. Candidate order is exactly the resolver's
/// order; the first success wins.
pub struct ConnectionEstablisher {
    resolver: Box<dyn AddressResolver>,
    factory: Box<dyn SocketFactory>,
}

impl ConnectionEstablisher {
    pub fn new(resolver: Box<dyn AddressResolver>, factory: Box<dyn SocketFactory>) -> Self {
        Self { resolver, factory }
    }

    /// Establisher using the platform resolver and real sockets.
    pub fn system(options: TransportOptions) -> Self {
        Self::new(
            Box::new(SystemResolver),
            Box::new(SystemSocketFactory::new(options)),
        )
    }

    pub fn connect(
        &self,
        destination: &Destination,
        trust: &TrustConfig,
    ) -> Result<Box<dyn RecordTransport>, ForwarderError> {
        let candidates = self.resolver.resolve(
            destination.hostname(),
            destination.port(),
            destination.socket_kind(),
        )?;
        if candidates.is_empty() {
            return Err(ForwarderError::Resolution {
                host: destination.hostname().to_owned(),
                port: destination.port(),
                source: io::Error::new(io::ErrorKind::NotFound, "resolver returned no candidates"),
            });
        }

        let mut last_err: Option<io::Error> = None;
        for (attempt, candidate) in candidates.iter().enumerate() {
            match self.factory.open(candidate, destination, trust) {
                Ok(socket) => {
                    log::debug!(
                        "connected to {destination} via {} on attempt {}",
                        candidate.addr,
                        attempt + 1
                    );
                    return Ok(socket);
                }
                Err(err) => {
                    log::debug!("candidate {} for {destination} failed: {err}", candidate.addr);
                    last_err = Some(err);
                }
            }
        }

        let source = last_err.unwrap_or_else(|| io::Error::other("no candidate attempted"));
        log::warn!(
            "unable to connect to {destination} after {} attempt(s): {source}",
            candidates.len()
        );
        Err(ForwarderError::Connection {
            host: destination.hostname().to_owned(),
            port: destination.port(),
            attempts: candidates.len(),
            source,
        })
    }
}

impl std::fmt::Debug for ConnectionEstablisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionEstablisher").finish_non_exhaustive()
    }
}
