//! Transport primitives carrying encoded records to the collector.

use std::{
    io::{self, Write},
    net::{Ipv4Addr, Ipv6Addr, Shutdown, SocketAddr, TcpStream, UdpSocket},
    time::Duration,
};

use native_tls::TlsStream;

use crate::{
    destination::{Destination, Protocol},
    resolver::{AddressFamily, CandidateEndpoint},
    trust::{TrustConfig, VerificationPolicy},
};

/// OS-level socket options applied when a transport is constructed.
///
/// Both timeouts default to `None`, which leaves every operation blocking.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TransportOptions {
    /// Bound on TCP connect and on the TLS handshake.
    pub connect_timeout: Option<Duration>,
    /// Bound on each socket write.
    pub write_timeout: Option<Duration>,
}

/// Channel able to deliver one encoded record at a time.
pub trait RecordTransport: Send {
    /// Deliver the complete record or fail.
    fn send(&mut self, record: &[u8]) -> io::Result<()>;

    /// Release the underlying handle. Calling this repeatedly is harmless.
    fn close(&mut self);
}

/// Live socket for one of the supported protocols.
///
/// The inner handle is `None` once the socket has been closed.
pub enum TransportSocket {
    Udp {
        socket: Option<UdpSocket>,
        target: SocketAddr,
    },
    Tcp(Option<TcpStream>),
    Tls(Option<Box<TlsStream<TcpStream>>>),
}

impl TransportSocket {
    /// Bind an ephemeral datagram socket matching the candidate's family.
    ///
    /// No connect step is performed; every send names the target.
    pub fn open_udp(candidate: &CandidateEndpoint, options: TransportOptions) -> io::Result<Self> {
        let local: SocketAddr = match candidate.family {
            AddressFamily::Ipv4 => (Ipv4Addr::UNSPECIFIED, 0).into(),
            AddressFamily::Ipv6 => (Ipv6Addr::UNSPECIFIED, 0).into(),
        };
        let socket = UdpSocket::bind(local)?;
        socket.set_write_timeout(options.write_timeout)?;
        Ok(TransportSocket::Udp {
            socket: Some(socket),
            target: candidate.addr,
        })
    }

    /// Connect a plain TCP stream to the candidate.
    pub fn connect_tcp(
        candidate: &CandidateEndpoint,
        options: TransportOptions,
    ) -> io::Result<Self> {
        let stream = connect_stream(candidate, options)?;
        Ok(TransportSocket::Tcp(Some(stream)))
    }

    /// Connect to the candidate and complete a TLS handshake presenting
    /// `domain` as the server name.
    pub fn connect_tls(
        candidate: &CandidateEndpoint,
        domain: &str,
        trust: &TrustConfig,
        options: TransportOptions,
    ) -> io::Result<Self> {
        let connector = trust.tls_connector()?;
        if trust.verification_policy() == VerificationPolicy::Skip {
            log::warn!("TLS peer verification disabled for {domain}; no CA bundle configured");
        }
        let stream = connect_stream(candidate, options)?;
        if let Some(timeout) = options.connect_timeout {
            stream.set_read_timeout(Some(timeout))?;
            stream.set_write_timeout(Some(timeout))?;
        }
        let stream = connector
            .connect(domain, stream)
            .map_err(io::Error::other)?;
        let tcp_ref = stream.get_ref();
        tcp_ref.set_read_timeout(None)?;
        tcp_ref.set_write_timeout(options.write_timeout)?;
        Ok(TransportSocket::Tls(Some(Box::new(stream))))
    }

    pub fn protocol(&self) -> Protocol {
        match self {
            TransportSocket::Udp { .. } => Protocol::Udp,
            TransportSocket::Tcp(_) => Protocol::Tcp,
            TransportSocket::Tls(_) => Protocol::Tls,
        }
    }

    pub fn is_open(&self) -> bool {
        match self {
            TransportSocket::Udp { socket, .. } => socket.is_some(),
            TransportSocket::Tcp(stream) => stream.is_some(),
            TransportSocket::Tls(stream) => stream.is_some(),
        }
    }
}

fn connect_stream(
    candidate: &CandidateEndpoint,
    options: TransportOptions,
) -> io::Result<TcpStream> {
    let stream = match options.connect_timeout {
        Some(timeout) => TcpStream::connect_timeout(&candidate.addr, timeout)?,
        None => TcpStream::connect(candidate.addr)?,
    };
    stream.set_write_timeout(options.write_timeout)?;
    Ok(stream)
}

fn closed() -> io::Error {
    io::Error::new(io::ErrorKind::NotConnected, "transport socket is closed")
}

impl RecordTransport for TransportSocket {
    fn send(&mut self, record: &[u8]) -> io::Result<()> {
        match self {
            TransportSocket::Udp { socket, target } => {
                let socket = socket.as_ref().ok_or_else(closed)?;
                let sent = socket.send_to(record, *target)?;
                if sent < record.len() {
                    log::debug!(
                        "datagram to {target} truncated: sent {sent} of {} bytes",
                        record.len()
                    );
                }
                Ok(())
            }
            TransportSocket::Tcp(stream) => {
                let stream = stream.as_mut().ok_or_else(closed)?;
                stream.write_all(record)?;
                stream.flush()
            }
            TransportSocket::Tls(stream) => {
                let stream = stream.as_mut().ok_or_else(closed)?;
                stream.write_all(record)?;
                stream.flush()
            }
        }
    }

    fn close(&mut self) {
        match self {
            TransportSocket::Udp { socket, .. } => {
                socket.take();
            }
            TransportSocket::Tcp(stream) => {
                if let Some(stream) = stream.take() {
                    let _ = stream.shutdown(Shutdown::Both);
                }
            }
            TransportSocket::Tls(stream) => {
                if let Some(mut stream) = stream.take() {
                    let _ = stream.shutdown();
                }
            }
        }
    }
}

impl std::fmt::Debug for TransportSocket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportSocket")
            .field("protocol", &self.protocol())
            .field("open", &self.is_open())
            .finish()
    }
}

/// Builds a transport for a single resolved candidate.
pub trait SocketFactory: Send + Sync {
    /// Open a socket to `candidate`. On failure nothing may remain open.
    fn open(
        &self,
        candidate: &CandidateEndpoint,
        destination: &Destination,
        trust: &TrustConfig,
    ) -> io::Result<Box<dyn RecordTransport>>;
}

/// Factory producing real OS sockets.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemSocketFactory {
    pub options: TransportOptions,
}

impl SystemSocketFactory {
    pub fn new(options: TransportOptions) -> Self {
        Self { options }
    }
}

impl SocketFactory for SystemSocketFactory {
    fn open(
        &self,
        candidate: &CandidateEndpoint,
        destination: &Destination,
        trust: &TrustConfig,
    ) -> io::Result<Box<dyn RecordTransport>> {
        let socket = match destination.protocol() {
            Protocol::Udp => TransportSocket::open_udp(candidate, self.options)?,
            Protocol::Tcp => TransportSocket::connect_tcp(candidate, self.options)?,
            Protocol::Tls => TransportSocket::connect_tls(
                candidate,
                destination.hostname(),
                trust,
                self.options,
            )?,
        };
        Ok(Box::new(socket))
    }
}
