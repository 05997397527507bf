//! Datagram transport seam
//!
//! The dispatcher, the fragmentation transport and the side-channel are
//! generic over [`DatagramTransport`] so they run against a real UDP socket
//! in production and against scripted transports in tests.

use std::io;
use std::net::SocketAddr;

use tokio::net::UdpSocket;
use tracing::{debug, instrument};

use crate::error::BridgeError;

/// Largest datagram the bridge will ever read
pub const RECV_BUFFER_SIZE: usize = 65_536;

/// Connectionless datagram socket
#[trait_variant::make(DatagramTransport: Send)]
pub trait LocalDatagramTransport {
    /// Send one datagram to `target`
    async fn send_to(&self, buf: &[u8], target: SocketAddr) -> io::Result<usize>;

    /// Receive one datagram and its source address
    async fn recv_from(&self, buf: &mut [u8]) -> io::Result<(usize, SocketAddr)>;

    fn local_addr(&self) -> io::Result<SocketAddr>;
}

impl DatagramTransport for UdpSocket {
    async fn send_to(&self, buf: &[u8], target: SocketAddr) -> io::Result<usize> {
        UdpSocket::send_to(self, buf, target).await
    }

    async fn recv_from(&self, buf: &mut [u8]) -> io::Result<(usize, SocketAddr)> {
        UdpSocket::recv_from(self, buf).await
    }

    fn local_addr(&self) -> io::Result<SocketAddr> {
        UdpSocket::local_addr(self)
    }
}

/// Bind a UDP socket for one of the bridge's two roles
#[instrument(name = "transport_bind", skip(addr), fields(role, addr = %addr))]
pub async fn bind(role: &'static str, addr: SocketAddr) -> Result<UdpSocket, BridgeError> {
    let socket = UdpSocket::bind(addr)
        .await
        .map_err(|e| BridgeError::bind(role, addr, e))?;
    debug!(role, local = ?socket.local_addr().ok(), "Socket bound");
    Ok(socket)
}
