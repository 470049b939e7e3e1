//! Self-signed TLS listener for handshake tests.

#![allow(dead_code)]

use std::{
    io::Read,
    net::{SocketAddr, TcpListener},
    path::Path,
    sync::mpsc,
    thread,
};

use native_tls::{Identity, TlsAcceptor};
use rcgen::{CertifiedKey, generate_simple_self_signed};

/// PEM certificate and PKCS#8 key for `localhost`.
pub struct TestCert {
    pub cert_pem: String,
    pub key_pem: String,
}

impl TestCert {
    pub fn localhost() -> Self {
        let CertifiedKey { cert, key_pair } =
            generate_simple_self_signed(vec!["localhost".to_owned()]).expect("generate cert");
        Self {
            cert_pem: cert.pem(),
            key_pem: key_pair.serialize_pem(),
        }
    }

    /// Write the certificate to `path` so it can act as a CA bundle.
    pub fn write_bundle(&self, path: &Path) {
        std::fs::write(path, &self.cert_pem).expect("write bundle");
    }
}

/// Serve one TLS connection with `cert` and deliver the decrypted bytes.
///
/// The receiver yields `None` when the handshake fails.
pub fn spawn_tls_capture(cert: &TestCert) -> (SocketAddr, mpsc::Receiver<Option<Vec<u8>>>) {
    let identity = Identity::from_pkcs8(cert.cert_pem.as_bytes(), cert.key_pem.as_bytes())
        .expect("load identity");
    let acceptor = TlsAcceptor::new(identity).expect("build acceptor");
    let listener = TcpListener::bind(("127.0.0.1", 0)).expect("bind ephemeral listener");
    let addr = listener.local_addr().expect("listener has address");
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let (stream, _) = listener.accept().expect("accept connection");
        let received = acceptor.accept(stream).ok().map(|mut tls| {
            let mut buf = Vec::new();
            let _ = tls.read_to_end(&mut buf);
            buf
        });
        let _ = tx.send(received);
    });
    (addr, rx)
}
