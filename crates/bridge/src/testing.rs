//! Scripted in-memory transport for unit tests

use std::collections::VecDeque;
use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use bytes::Bytes;

use crate::transport::DatagramTransport;

pub fn addr(port: u16) -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], port))
}

enum Incoming {
    Datagram(SocketAddr, Vec<u8>),
    Error(io::ErrorKind),
}

/// Replays queued datagrams and records everything sent
///
/// Once the queue is empty `recv_from` never completes, so bounded waits
/// run into their timeout.
pub struct ScriptedTransport {
    local: SocketAddr,
    incoming: Mutex<VecDeque<Incoming>>,
    sent: Mutex<Vec<(SocketAddr, Bytes)>>,
    fail_sends: AtomicBool,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self {
            local: addr(5065),
            incoming: Mutex::new(VecDeque::new()),
            sent: Mutex::new(Vec::new()),
            fail_sends: AtomicBool::new(false),
        }
    }

    pub fn push(&self, from: SocketAddr, datagram: &[u8]) {
        self.incoming
            .lock()
            .unwrap()
            .push_back(Incoming::Datagram(from, datagram.to_vec()));
    }

    pub fn push_error(&self, kind: io::ErrorKind) {
        self.incoming
            .lock()
            .unwrap()
            .push_back(Incoming::Error(kind));
    }

    pub fn fail_sends(&self, fail: bool) {
        self.fail_sends.store(fail, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<(SocketAddr, Bytes)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_to(&self, target: SocketAddr) -> Vec<Bytes> {
        self.sent()
            .into_iter()
            .filter(|(to, _)| *to == target)
            .map(|(_, datagram)| datagram)
            .collect()
    }

    pub fn pending(&self) -> usize {
        self.incoming.lock().unwrap().len()
    }
}

impl DatagramTransport for ScriptedTransport {
    async fn send_to(&self, buf: &[u8], target: SocketAddr) -> io::Result<usize> {
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(io::Error::from(io::ErrorKind::ConnectionRefused));
        }
        self.sent
            .lock()
            .unwrap()
            .push((target, Bytes::copy_from_slice(buf)));
        Ok(buf.len())
    }

    async fn recv_from(&self, buf: &mut [u8]) -> io::Result<(usize, SocketAddr)> {
        let next = self.incoming.lock().unwrap().pop_front();
        match next {
            Some(Incoming::Datagram(from, datagram)) => {
                let n = datagram.len().min(buf.len());
                buf[..n].copy_from_slice(&datagram[..n]);
                Ok((n, from))
            }
            Some(Incoming::Error(kind)) => Err(io::Error::from(kind)),
            None => std::future::pending().await,
        }
    }

    fn local_addr(&self) -> io::Result<SocketAddr> {
        Ok(self.local)
    }
}

impl<T: DatagramTransport + Sync> DatagramTransport for Arc<T> {
    async fn send_to(&self, buf: &[u8], target: SocketAddr) -> io::Result<usize> {
        T::send_to(self, buf, target).await
    }

    async fn recv_from(&self, buf: &mut [u8]) -> io::Result<(usize, SocketAddr)> {
        T::recv_from(self, buf).await
    }

    fn local_addr(&self) -> io::Result<SocketAddr> {
        T::local_addr(self)
    }
}
