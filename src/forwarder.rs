//! Public-facing sender delivering records to a collector.
//!
//! [`LogForwarder`] owns at most one live transport. The transport is built
//! lazily by the first [`send`](LogForwarder::send) and reused afterwards.
//! Resolution and connection failures propagate to the caller; write
//! failures are reported to an [`ErrorSink`] and swallowed so one bad
//! record cannot abort a batch. Dropped records are never retried.

use parking_lot::Mutex;

use crate::{
    connect::ConnectionEstablisher,
    destination::Destination,
    error::ForwarderError,
    rate_limited_warner::RateLimitedWarner,
    record::encode_record,
    transport::{RecordTransport, TransportOptions},
    trust::TrustConfig,
};

/// Receives a human-readable description of each failed send.
pub trait ErrorSink: Send + Sync {
    fn report(&self, message: &str);
}

impl<F> ErrorSink for F
where
    F: Fn(&str) + Send + Sync,
{
    fn report(&self, message: &str) {
        self(message)
    }
}

/// Sink forwarding failures to the `log` facade at error level.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogErrorSink;

impl ErrorSink for LogErrorSink {
    fn report(&self, message: &str) {
        log::error!("{message}");
    }
}

/// Best-effort, log-and-continue sender for one destination.
///
/// Methods take `&mut self`, so the lazy connect cannot race. Wrap the
/// forwarder in a [`SharedLogForwarder`] to share it between threads.
pub struct LogForwarder {
    destination: Destination,
    trust: TrustConfig,
    establisher: ConnectionEstablisher,
    socket: Option<Box<dyn RecordTransport>>,
    sink: Box<dyn ErrorSink>,
    warner: RateLimitedWarner,
}

impl LogForwarder {
    /// Forwarder using real sockets, blocking I/O, and [`LogErrorSink`].
    pub fn new(destination: Destination, trust: TrustConfig) -> Self {
        Self::with_parts(
            destination,
            trust,
            ConnectionEstablisher::system(TransportOptions::default()),
            Box::new(LogErrorSink),
        )
    }

    pub fn with_parts(
        destination: Destination,
        trust: TrustConfig,
        establisher: ConnectionEstablisher,
        sink: Box<dyn ErrorSink>,
    ) -> Self {
        Self {
            destination,
            trust,
            establisher,
            socket: None,
            sink,
            warner: RateLimitedWarner::default(),
        }
    }

    pub fn destination(&self) -> &Destination {
        &self.destination
    }

    pub fn trust(&self) -> &TrustConfig {
        &self.trust
    }

    pub fn is_connected(&self) -> bool {
        self.socket.is_some()
    }

    /// Records lost to connection or write failures so far.
    pub fn dropped(&self) -> u64 {
        self.warner.total_dropped()
    }

    /// Connect now instead of on the first send. No-op when connected.
    pub fn connect(&mut self) -> Result<(), ForwarderError> {
        self.ensure_connected().map(|_| ())
    }

    /// Send one formatted record, appending the newline terminator.
    ///
    /// A record that already ends in `\n` is sent as is, so a
    /// newline-terminated line never reaches the collector with a blank
    /// line after it.
    ///
    /// # Errors
    ///
    /// Returns [`ForwarderError::Resolution`] or
    /// [`ForwarderError::Connection`] when the lazy connect fails. Write
    /// failures never surface here; they go to the error sink and the
    /// socket is discarded so the next record reconnects.
    pub fn send(&mut self, record: &str) -> Result<(), ForwarderError> {
        self.send_bytes(&encode_record(record))
    }

    /// Send an already encoded, newline-terminated record verbatim.
    pub fn send_bytes(&mut self, payload: &[u8]) -> Result<(), ForwarderError> {
        let written = match self.ensure_connected().map(|socket| socket.send(payload)) {
            Ok(written) => written,
            Err(err) => {
                self.record_drop("connection errors");
                return Err(err);
            }
        };
        if let Err(err) = written {
            self.handle_send_failure(ForwarderError::Send(err));
        }
        Ok(())
    }

    /// Release the socket if one is open. A later send reconnects.
    pub fn close(&mut self) {
        if let Some(mut socket) = self.socket.take() {
            socket.close();
            log::debug!("closed connection to {}", self.destination);
        }
        let destination = &self.destination;
        self.warner.flush(|count| {
            log::warn!("LogForwarder dropped {count} records for {destination}");
        });
    }

    fn ensure_connected(&mut self) -> Result<&mut Box<dyn RecordTransport>, ForwarderError> {
        let socket = match self.socket.take() {
            Some(socket) => socket,
            None => self.establisher.connect(&self.destination, &self.trust)?,
        };
        Ok(self.socket.insert(socket))
    }

    fn handle_send_failure(&mut self, err: ForwarderError) {
        self.sink
            .report(&format!("failed to deliver record to {}: {err}", self.destination));
        if let Some(mut socket) = self.socket.take() {
            socket.close();
        }
        self.record_drop("write errors");
    }

    fn record_drop(&self, cause: &str) {
        self.warner.record_drop();
        let destination = &self.destination;
        self.warner.warn_if_due(|count| {
            log::warn!("LogForwarder dropped {count} records for {destination} due to {cause}");
        });
    }
}

impl Drop for LogForwarder {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for LogForwarder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogForwarder")
            .field("destination", &self.destination)
            .field("trust", &self.trust)
            .field("connected", &self.is_connected())
            .finish()
    }
}

/// Thread-safe wrapper serialising access to a [`LogForwarder`].
#[derive(Debug)]
pub struct SharedLogForwarder {
    inner: Mutex<LogForwarder>,
}

impl SharedLogForwarder {
    pub fn new(forwarder: LogForwarder) -> Self {
        Self {
            inner: Mutex::new(forwarder),
        }
    }

    pub fn send(&self, record: &str) -> Result<(), ForwarderError> {
        self.inner.lock().send(record)
    }

    pub fn close(&self) {
        self.inner.lock().close();
    }

    pub fn is_connected(&self) -> bool {
        self.inner.lock().is_connected()
    }

    pub fn dropped(&self) -> u64 {
        self.inner.lock().dropped()
    }

    pub fn into_inner(self) -> LogForwarder {
        self.inner.into_inner()
    }
}

impl From<LogForwarder> for SharedLogForwarder {
    fn from(forwarder: LogForwarder) -> Self {
        Self::new(forwarder)
    }
}

#[cfg(test)]
mod tests;
