//! TLS trust material and the verification policy derived from it.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use native_tls::{Certificate, TlsConnector};

/// How a TLS peer certificate is checked.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VerificationPolicy {
    /// Validate the peer chain against the bundle at this path. The server
    /// name is not matched against the certificate.
    Verify(PathBuf),
    /// Accept any certificate and hostname. Only suitable for internal or
    /// test collectors.
    Skip,
}

/// Optional CA bundle supplied for TLS destinations.
///
/// Constructing a `TrustConfig` never touches the filesystem; the bundle is
/// read when a connector is built for a handshake.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TrustConfig {
    ca_bundle: Option<PathBuf>,
}

impl TrustConfig {
    /// A blank path is treated the same as no path.
    pub fn new(ca_bundle: Option<impl Into<PathBuf>>) -> Self {
        let ca_bundle: Option<PathBuf> = ca_bundle.map(Into::into);
        Self {
            ca_bundle: ca_bundle.filter(|path| !path.as_os_str().is_empty()),
        }
    }

    pub fn with_ca_bundle(path: impl Into<PathBuf>) -> Self {
        Self::new(Some(path))
    }

    /// Trust configuration that skips peer verification.
    pub fn insecure() -> Self {
        Self { ca_bundle: None }
    }

    pub fn ca_bundle(&self) -> Option<&Path> {
        self.ca_bundle.as_deref()
    }

    pub fn verification_policy(&self) -> VerificationPolicy {
        match &self.ca_bundle {
            Some(path) => VerificationPolicy::Verify(path.clone()),
            None => VerificationPolicy::Skip,
        }
    }

    /// Build a connector applying this policy.
    ///
    /// In verify mode only the certificates from the bundle are trusted and
    /// the peer's hostname is not checked.
    pub fn tls_connector(&self) -> io::Result<TlsConnector> {
        let mut builder = TlsConnector::builder();
        match self.verification_policy() {
            VerificationPolicy::Verify(path) => {
                builder.disable_built_in_roots(true);
                builder.danger_accept_invalid_hostnames(true);
                for cert in load_bundle(&path)? {
                    builder.add_root_certificate(cert);
                }
            }
            VerificationPolicy::Skip => {
                builder.danger_accept_invalid_certs(true);
                builder.danger_accept_invalid_hostnames(true);
            }
        }
        builder.build().map_err(io::Error::other)
    }
}

fn load_bundle(path: &Path) -> io::Result<Vec<Certificate>> {
    let pem = fs::read(path).map_err(|err| {
        io::Error::new(
            err.kind(),
            format!("failed to read CA bundle {}: {err}", path.display()),
        )
    })?;
    let certs = Certificate::stack_from_pem(&pem).map_err(|err| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("failed to parse CA bundle {}: {err}", path.display()),
        )
    })?;
    if certs.is_empty() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("CA bundle {} contains no certificates", path.display()),
        ));
    }
    Ok(certs)
}
