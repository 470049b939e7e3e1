//! Plain TCP and UDP listeners that capture what the forwarder sends.

use std::{
    io::Read,
    net::{SocketAddr, TcpListener, UdpSocket},
    sync::mpsc,
    thread,
    time::Duration,
};

/// Accept one TCP connection and deliver every byte received before EOF.
#[allow(dead_code)]
pub fn spawn_tcp_capture() -> (SocketAddr, mpsc::Receiver<Vec<u8>>) {
    let listener = TcpListener::bind(("127.0.0.1", 0)).expect("bind ephemeral listener");
    let addr = listener.local_addr().expect("listener has address");
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let (mut stream, _) = listener.accept().expect("accept connection");
        let mut received = Vec::new();
        stream.read_to_end(&mut received).expect("read stream");
        let _ = tx.send(received);
    });
    (addr, rx)
}

/// Bind a UDP socket with a read timeout so tests cannot hang.
#[allow(dead_code)]
pub fn udp_capture() -> UdpSocket {
    let socket = UdpSocket::bind(("127.0.0.1", 0)).expect("bind ephemeral udp socket");
    socket
        .set_read_timeout(Some(Duration::from_secs(2)))
        .expect("set read timeout");
    socket
}

/// Address of a loopback port with nothing listening.
#[allow(dead_code)]
pub fn closed_port() -> SocketAddr {
    let listener = TcpListener::bind(("127.0.0.1", 0)).expect("bind ephemeral listener");
    listener.local_addr().expect("listener has address")
}
