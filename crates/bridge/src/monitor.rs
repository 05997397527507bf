//! Timeout & failure monitor
//!
//! Every blocking receive goes through [`receive_from`], which bounds the
//! wait and classifies what went wrong. [`FailureMonitor`] turns a
//! classified failure into recovery: evict, stop the car, warn the other
//! controllers, tell the simulation.

use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use bytes::Bytes;
use contracts::{CallOutcome, ErrorCode, SessionState};
use thiserror::Error;
use tokio::time::{timeout_at, Instant};
use tracing::{error, instrument, warn};

use crate::codec::error_datagram;
use crate::context::BridgeContext;
use crate::transport::DatagramTransport;

/// Session-breaking failure
#[derive(Debug, Error)]
pub enum Failure {
    /// Nothing arrived within the bounded wait
    #[error("no reply from {endpoint} within {}ms", waited.as_millis())]
    Timeout {
        endpoint: SocketAddr,
        waited: Duration,
    },

    /// Socket-level failure
    #[error("transport error with {endpoint}: {source}")]
    Transport {
        endpoint: SocketAddr,
        #[source]
        source: io::Error,
    },

    /// The reply was not what the protocol state allowed
    #[error("protocol desync with {endpoint}: {detail}")]
    Desync { endpoint: SocketAddr, detail: String },
}

impl Failure {
    pub fn desync(endpoint: SocketAddr, detail: impl Into<String>) -> Self {
        Self::Desync {
            endpoint,
            detail: detail.into(),
        }
    }

    pub fn endpoint(&self) -> SocketAddr {
        match self {
            Failure::Timeout { endpoint, .. }
            | Failure::Transport { endpoint, .. }
            | Failure::Desync { endpoint, .. } => *endpoint,
        }
    }

    pub fn outcome(&self) -> CallOutcome {
        match self {
            Failure::Timeout { .. } => CallOutcome::TimedOut,
            Failure::Transport { .. } => CallOutcome::TransportError,
            Failure::Desync { .. } => CallOutcome::Desync,
        }
    }

    /// Code broadcast to the remaining controllers
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Failure::Timeout { .. } => ErrorCode::Timeout,
            Failure::Transport { .. } => ErrorCode::Generic,
            Failure::Desync { .. } => ErrorCode::FragmentMismatch,
        }
    }
}

/// Handling of datagrams from addresses other than the awaited one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strays {
    /// Drop them silently
    Discard,
    /// Answer `[error, generic]` so the sender does not wait for a reply
    Reject,
}

/// Receive one datagram from `endpoint` within `timeout`
///
/// Datagrams from any other address are handled per `strays` and the wait
/// continues against the same deadline. `buf` must hold a full datagram.
pub async fn receive_from<T: DatagramTransport>(
    transport: &T,
    endpoint: SocketAddr,
    timeout: Duration,
    buf: &mut [u8],
    strays: Strays,
) -> Result<Bytes, Failure> {
    let deadline = Instant::now() + timeout;

    loop {
        let (n, from) = match timeout_at(deadline, transport.recv_from(buf)).await {
            Ok(Ok(received)) => received,
            Ok(Err(source)) => return Err(Failure::Transport { endpoint, source }),
            Err(_) => {
                return Err(Failure::Timeout {
                    endpoint,
                    waited: timeout,
                })
            }
        };

        if from == endpoint {
            return Ok(Bytes::copy_from_slice(&buf[..n]));
        }

        warn!(expected = %endpoint, from = %from, len = n, "Discarding datagram from unexpected address");
        if strays == Strays::Reject {
            if let Err(e) = transport
                .send_to(&error_datagram(ErrorCode::Generic), from)
                .await
            {
                warn!(to = %from, error = %e, "Stray rejection failed");
            }
        }
    }
}

/// Drives recovery once a session has broken
pub struct FailureMonitor<'a, T> {
    context: &'a BridgeContext,
    transport: &'a T,
}

impl<'a, T: DatagramTransport> FailureMonitor<'a, T> {
    pub fn new(context: &'a BridgeContext, transport: &'a T) -> Self {
        Self { context, transport }
    }

    /// Evict the endpoint in `car`, warn its siblings and fall back
    #[instrument(
        name = "monitor_handle_failure",
        skip(self, failure),
        fields(endpoint = %failure.endpoint(), outcome = %failure.outcome())
    )]
    pub async fn handle_failure(&self, car: usize, failure: &Failure) -> CallOutcome {
        let outcome = failure.outcome();

        match failure {
            Failure::Timeout { .. } => error!(
                car,
                error = %failure,
                "Controller did not respond in time; if it is still running it may be \
                 stuck in an infinite loop or a blocking call"
            ),
            _ => error!(car, error = %failure, "Controller session broken"),
        }

        self.context.registry().set_state(car, SessionState::Broken);
        self.context.release(car);
        self.broadcast_error(failure.error_code()).await;

        self.context
            .simulation()
            .on_session_broken(car, outcome, &failure.to_string());

        outcome
    }

    /// Best-effort `[error, code]` to every remaining endpoint
    pub async fn broadcast_error(&self, code: ErrorCode) {
        let datagram = error_datagram(code);
        let endpoints = self.context.registry().endpoints();

        for (car, endpoint) in endpoints {
            if let Err(e) = self.transport.send_to(&datagram, endpoint.addr).await {
                warn!(car, endpoint = %endpoint.addr, error = %e, "Error broadcast failed");
            }
        }
    }
}
