//! Hostname resolution into ordered connection candidates.

use std::{
    io,
    net::{SocketAddr, ToSocketAddrs},
};

use crate::{destination::SocketKind, error::ForwarderError};

/// Address family of a resolved candidate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AddressFamily {
    Ipv4,
    Ipv6,
}

impl From<&SocketAddr> for AddressFamily {
    fn from(addr: &SocketAddr) -> Self {
        match addr {
            SocketAddr::V4(_) => AddressFamily::Ipv4,
            SocketAddr::V6(_) => AddressFamily::Ipv6,
        }
    }
}

/// One concrete address a socket may be opened against.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CandidateEndpoint {
    pub family: AddressFamily,
    pub kind: SocketKind,
    pub addr: SocketAddr,
}

impl CandidateEndpoint {
    pub fn new(addr: SocketAddr, kind: SocketKind) -> Self {
        Self {
            family: AddressFamily::from(&addr),
            kind,
            addr,
        }
    }
}

/// Resolves a host and port into candidates in preference order.
///
/// Implementations must not retry; the caller owns retry policy.
pub trait AddressResolver: Send + Sync {
    fn resolve(
        &self,
        hostname: &str,
        port: u16,
        kind: SocketKind,
    ) -> Result<Vec<CandidateEndpoint>, ForwarderError>;
}

/// Resolver backed by the platform name service.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemResolver;

impl AddressResolver for SystemResolver {
    fn resolve(
        &self,
        hostname: &str,
        port: u16,
        kind: SocketKind,
    ) -> Result<Vec<CandidateEndpoint>, ForwarderError> {
        let resolution_error = |source| ForwarderError::Resolution {
            host: hostname.to_owned(),
            port,
            source,
        };
        let candidates: Vec<CandidateEndpoint> = (hostname, port)
            .to_socket_addrs()
            .map_err(resolution_error)?
            .map(|addr| CandidateEndpoint::new(addr, kind))
            .collect();
        if candidates.is_empty() {
            return Err(resolution_error(io::Error::new(
                io::ErrorKind::NotFound,
                "resolver returned no candidates",
            )));
        }
        log::debug!(
            "resolved {hostname}:{port} to {} candidate(s)",
            candidates.len()
        );
        Ok(candidates)
    }
}
