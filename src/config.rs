//! Builder and serialisable configuration for [`LogForwarder`].
//!
//! The builder validates inputs before any socket is created. Unlike the
//! bare [`TrustConfig`], it refuses a TLS destination without a CA bundle
//! unless the caller opts into unverified TLS explicitly.

use std::{path::PathBuf, time::Duration};

use serde::Deserialize;

use crate::{
    connect::ConnectionEstablisher,
    destination::{Destination, Protocol},
    error::ForwarderError,
    forwarder::{ErrorSink, LogErrorSink, LogForwarder},
    transport::TransportOptions,
    trust::TrustConfig,
};

macro_rules! ensure_positive {
    ($value:expr, $field:expr) => {{
        if $value == 0 {
            Err(ForwarderError::InvalidConfig(format!(
                "{} must be greater than zero",
                $field
            )))
        } else {
            Ok($value)
        }
    }};
}

/// Destination settings as loaded by an external configuration layer.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ForwarderConfig {
    pub hostname: String,
    pub port: u16,
    pub protocol: Protocol,
    #[serde(default)]
    pub ca_bundle: Option<PathBuf>,
    #[serde(default)]
    pub allow_insecure_tls: bool,
    #[serde(default)]
    pub connect_timeout_ms: Option<u64>,
    #[serde(default)]
    pub write_timeout_ms: Option<u64>,
}

impl From<ForwarderConfig> for LogForwarderBuilder {
    fn from(config: ForwarderConfig) -> Self {
        Self {
            hostname: Some(config.hostname),
            port: Some(config.port),
            protocol: Some(config.protocol),
            ca_bundle: config.ca_bundle,
            allow_insecure_tls: config.allow_insecure_tls,
            connect_timeout_ms: config.connect_timeout_ms,
            write_timeout_ms: config.write_timeout_ms,
            sink: None,
        }
    }
}

/// Fluent builder producing a validated [`LogForwarder`].
#[derive(Default)]
pub struct LogForwarderBuilder {
    hostname: Option<String>,
    port: Option<u16>,
    protocol: Option<Protocol>,
    ca_bundle: Option<PathBuf>,
    allow_insecure_tls: bool,
    connect_timeout_ms: Option<u64>,
    write_timeout_ms: Option<u64>,
    sink: Option<Box<dyn ErrorSink>>,
}

impl LogForwarderBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_target(mut self, host: impl Into<String>, port: u16, protocol: Protocol) -> Self {
        self.hostname = Some(host.into());
        self.port = Some(port);
        self.protocol = Some(protocol);
        self
    }

    pub fn with_udp(self, host: impl Into<String>, port: u16) -> Self {
        self.with_target(host, port, Protocol::Udp)
    }

    pub fn with_tcp(self, host: impl Into<String>, port: u16) -> Self {
        self.with_target(host, port, Protocol::Tcp)
    }

    pub fn with_tls(self, host: impl Into<String>, port: u16) -> Self {
        self.with_target(host, port, Protocol::Tls)
    }

    /// Verify TLS peers against the PEM bundle at `path`.
    pub fn with_ca_bundle(mut self, path: impl Into<PathBuf>) -> Self {
        self.ca_bundle = Some(path.into());
        self
    }

    /// Permit TLS without a CA bundle, accepting any peer certificate.
    ///
    /// This is intentionally weak and meant for internal or test collectors.
    pub fn allow_insecure_tls(mut self, allow: bool) -> Self {
        self.allow_insecure_tls = allow;
        self
    }

    pub fn with_connect_timeout_ms(mut self, timeout: u64) -> Self {
        self.connect_timeout_ms = Some(timeout);
        self
    }

    pub fn with_write_timeout_ms(mut self, timeout: u64) -> Self {
        self.write_timeout_ms = Some(timeout);
        self
    }

    /// Route send failures to `sink` instead of the `log` facade.
    pub fn with_error_sink(mut self, sink: impl ErrorSink + 'static) -> Self {
        self.sink = Some(Box::new(sink));
        self
    }

    fn destination(&self) -> Result<Destination, ForwarderError> {
        let (Some(hostname), Some(port), Some(protocol)) =
            (&self.hostname, self.port, self.protocol)
        else {
            return Err(ForwarderError::InvalidConfig(
                "forwarder requires a destination".into(),
            ));
        };
        Destination::new(hostname.clone(), port, protocol)
    }

    fn trust(&self, protocol: Protocol) -> Result<TrustConfig, ForwarderError> {
        let trust = TrustConfig::new(self.ca_bundle.clone());
        match protocol {
            Protocol::Tls if trust.ca_bundle().is_none() && !self.allow_insecure_tls => {
                Err(ForwarderError::InvalidConfig(
                    "tls requires a ca bundle unless allow_insecure_tls is set".into(),
                ))
            }
            Protocol::Udp | Protocol::Tcp if trust.ca_bundle().is_some() => Err(
                ForwarderError::InvalidConfig("ca bundle is only used by tls destinations".into()),
            ),
            _ => Ok(trust),
        }
    }

    fn options(&self) -> Result<TransportOptions, ForwarderError> {
        let mut options = TransportOptions::default();
        if let Some(timeout) = self.connect_timeout_ms {
            let timeout = ensure_positive!(timeout, "connect_timeout_ms")?;
            options.connect_timeout = Some(Duration::from_millis(timeout));
        }
        if let Some(timeout) = self.write_timeout_ms {
            let timeout = ensure_positive!(timeout, "write_timeout_ms")?;
            options.write_timeout = Some(Duration::from_millis(timeout));
        }
        Ok(options)
    }

    /// Validate the configuration and build the forwarder. No network
    /// activity happens until the first send.
    pub fn build(self) -> Result<LogForwarder, ForwarderError> {
        let destination = self.destination()?;
        let trust = self.trust(destination.protocol())?;
        let options = self.options()?;
        let sink = self.sink.unwrap_or_else(|| Box::new(LogErrorSink));
        Ok(LogForwarder::with_parts(
            destination,
            trust,
            ConnectionEstablisher::system(options),
            sink,
        ))
    }
}

impl std::fmt::Debug for LogForwarderBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogForwarderBuilder")
            .field("hostname", &self.hostname)
            .field("port", &self.port)
            .field("protocol", &self.protocol)
            .field("ca_bundle", &self.ca_bundle)
            .field("allow_insecure_tls", &self.allow_insecure_tls)
            .field("connect_timeout_ms", &self.connect_timeout_ms)
            .field("write_timeout_ms", &self.write_timeout_ms)
            .finish_non_exhaustive()
    }
}
