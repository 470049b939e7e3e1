//! Loopback peers used by the integration suite.

pub mod capture;
pub mod tls_server;
