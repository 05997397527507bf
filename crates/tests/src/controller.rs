//! Scripted controller program on a loopback socket

use std::net::SocketAddr;
use std::time::Duration;

use bytes::{BufMut, BytesMut};
use contracts::Opcode;
use tokio::net::UdpSocket;
use tokio::time::timeout;

/// Upper bound for any single receive in a test
const RECV_TIMEOUT: Duration = Duration::from_secs(2);

pub struct TestController {
    socket: UdpSocket,
}

impl TestController {
    pub async fn bind() -> Self {
        Self {
            socket: UdpSocket::bind("127.0.0.1:0").await.unwrap(),
        }
    }

    pub fn addr(&self) -> SocketAddr {
        self.socket.local_addr().unwrap()
    }

    pub async fn send(&self, datagram: &[u8], to: SocketAddr) {
        self.socket.send_to(datagram, to).await.unwrap();
    }

    pub async fn recv(&self) -> (Vec<u8>, SocketAddr) {
        self.try_recv(RECV_TIMEOUT)
            .await
            .expect("controller receive timed out")
    }

    pub async fn try_recv(&self, wait: Duration) -> Option<(Vec<u8>, SocketAddr)> {
        let mut buf = vec![0u8; 65536];
        let (n, from) = timeout(wait, self.socket.recv_from(&mut buf))
            .await
            .ok()?
            .unwrap();
        buf.truncate(n);
        Some((buf, from))
    }

    /// Send `[connect, version]` and return the reply
    pub async fn connect(&self, async_addr: SocketAddr, version: u8) -> Vec<u8> {
        self.send(&[Opcode::Connect.tag(), version], async_addr).await;
        self.recv().await.0
    }

    /// `drive_set_speed_angle` with arguments at offsets 4 and 8
    pub fn drive(speed: f32, angle: f32) -> Vec<u8> {
        let mut buf = BytesMut::with_capacity(12);
        buf.put_u8(Opcode::DriveSetSpeedAngle.tag());
        buf.put_bytes(0, 3);
        buf.put_f32_le(speed);
        buf.put_f32_le(angle);
        buf.to_vec()
    }
}
