//! Scripted resolver and socket factory.
//!
//! `FakeSocketFactory` counts every handle it allocates and every handle
//! released. A scripted failure releases its own handle before returning,
//! as [`SocketFactory`] requires, so `open_handles` tracks the transports
//! a caller still holds.

use std::{
    collections::VecDeque,
    io,
    net::{Ipv4Addr, SocketAddr},
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

use parking_lot::Mutex;

use crate::{
    destination::{Destination, SocketKind},
    error::ForwarderError,
    resolver::{AddressResolver, CandidateEndpoint},
    transport::{RecordTransport, SocketFactory},
    trust::TrustConfig,
};

type ResolveRequest = (String, u16, SocketKind);

/// Resolver returning a fixed list of loopback candidates.
///
/// Each candidate is distinguished by its port so tests can observe the
/// order in which they were attempted.
#[derive(Clone, Debug)]
pub struct FakeResolver {
    ports: Option<Vec<u16>>,
    requests: Arc<Mutex<Vec<ResolveRequest>>>,
}

impl FakeResolver {
    pub fn with_ports(ports: impl IntoIterator<Item = u16>) -> Self {
        Self {
            ports: Some(ports.into_iter().collect()),
            requests: Arc::default(),
        }
    }

    /// Resolver that succeeds with zero candidates.
    pub fn empty() -> Self {
        Self::with_ports(Vec::<u16>::new())
    }

    /// Resolver that fails as if the host were unknown.
    pub fn unknown_host() -> Self {
        Self {
            ports: None,
            requests: Arc::default(),
        }
    }

    /// Shared log of `(hostname, port, kind)` lookups.
    pub fn requests(&self) -> Arc<Mutex<Vec<ResolveRequest>>> {
        Arc::clone(&self.requests)
    }
}

impl AddressResolver for FakeResolver {
    fn resolve(
        &self,
        hostname: &str,
        port: u16,
        kind: SocketKind,
    ) -> Result<Vec<CandidateEndpoint>, ForwarderError> {
        self.requests.lock().push((hostname.to_owned(), port, kind));
        let Some(ports) = &self.ports else {
            return Err(ForwarderError::Resolution {
                host: hostname.to_owned(),
                port,
                source: io::Error::new(io::ErrorKind::NotFound, "unknown host"),
            });
        };
        Ok(ports
            .iter()
            .map(|&p| CandidateEndpoint::new(SocketAddr::from((Ipv4Addr::LOCALHOST, p)), kind))
            .collect())
    }
}

/// Scripted result for one call to [`FakeSocketFactory::open`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// Open successfully; writes succeed.
    Accept,
    /// Open successfully; every write fails with a broken pipe.
    AcceptFailingWrites,
    /// Allocate a handle, then fail with connection refused.
    Refuse,
    /// Allocate a handle, then fail with connection reset.
    Reset,
}

#[derive(Debug, Default)]
struct Counters {
    opened: AtomicUsize,
    closed: AtomicUsize,
    failures: AtomicUsize,
}

#[derive(Debug, Default)]
struct FactoryState {
    outcomes: Mutex<VecDeque<Outcome>>,
    attempted: Mutex<Vec<u16>>,
    written: Mutex<Vec<Vec<u8>>>,
    counters: Arc<Counters>,
}

/// Socket factory following a script of [`Outcome`]s.
///
/// Once the script is exhausted every further attempt is refused.
#[derive(Clone, Debug, Default)]
pub struct FakeSocketFactory {
    state: Arc<FactoryState>,
}

impl FakeSocketFactory {
    pub fn new(outcomes: impl IntoIterator<Item = Outcome>) -> Self {
        let state = FactoryState {
            outcomes: Mutex::new(outcomes.into_iter().collect()),
            ..FactoryState::default()
        };
        Self {
            state: Arc::new(state),
        }
    }

    /// Ports of every candidate passed to `open`, in call order.
    pub fn attempted_ports(&self) -> Vec<u16> {
        self.state.attempted.lock().clone()
    }

    /// Records successfully written through any transport.
    pub fn written(&self) -> Vec<Vec<u8>> {
        self.state.written.lock().clone()
    }

    pub fn opened(&self) -> usize {
        self.state.counters.opened.load(Ordering::SeqCst)
    }

    pub fn failures(&self) -> usize {
        self.state.counters.failures.load(Ordering::SeqCst)
    }

    /// Handles allocated but not yet released.
    pub fn open_handles(&self) -> usize {
        self.opened() - self.state.counters.closed.load(Ordering::SeqCst)
    }
}

/// Stand-in for an OS descriptor; releasing it bumps the close counter.
#[derive(Debug)]
struct FakeHandle {
    counters: Arc<Counters>,
}

impl FakeHandle {
    fn allocate(counters: &Arc<Counters>) -> Self {
        counters.opened.fetch_add(1, Ordering::SeqCst);
        Self {
            counters: Arc::clone(counters),
        }
    }
}

impl Drop for FakeHandle {
    fn drop(&mut self) {
        self.counters.closed.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Debug)]
struct FakeTransport {
    handle: Option<FakeHandle>,
    fail_writes: bool,
    state: Arc<FactoryState>,
}

impl RecordTransport for FakeTransport {
    fn send(&mut self, record: &[u8]) -> io::Result<()> {
        if self.handle.is_none() {
            return Err(io::Error::from(io::ErrorKind::NotConnected));
        }
        if self.fail_writes {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "peer went away"));
        }
        self.state.written.lock().push(record.to_vec());
        Ok(())
    }

    fn close(&mut self) {
        self.handle.take();
    }
}

impl SocketFactory for FakeSocketFactory {
    fn open(
        &self,
        candidate: &CandidateEndpoint,
        _destination: &Destination,
        _trust: &TrustConfig,
    ) -> io::Result<Box<dyn RecordTransport>> {
        self.state.attempted.lock().push(candidate.addr.port());
        let outcome = self
            .state
            .outcomes
            .lock()
            .pop_front()
            .unwrap_or(Outcome::Refuse);
        let handle = FakeHandle::allocate(&self.state.counters);
        let failure = match outcome {
            Outcome::Accept | Outcome::AcceptFailingWrites => {
                return Ok(Box::new(FakeTransport {
                    handle: Some(handle),
                    fail_writes: outcome == Outcome::AcceptFailingWrites,
                    state: Arc::clone(&self.state),
                }));
            }
            Outcome::Refuse => io::ErrorKind::ConnectionRefused,
            Outcome::Reset => io::ErrorKind::ConnectionReset,
        };
        drop(handle);
        self.state.counters.failures.fetch_add(1, Ordering::SeqCst);
        Err(io::Error::from(failure))
    }
}
