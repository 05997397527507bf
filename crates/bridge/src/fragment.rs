//! Fragmentation transport
//!
//! Stop-and-wait: a payload is cut into `fragments` equal slices and the
//! next slice only goes out after the controller answers `python_send_next`.
//! There is no retransmission; the first bad acknowledgement ends the
//! transfer. An empty payload cannot be split and is rejected before
//! anything goes out.

use std::net::SocketAddr;
use std::time::Duration;

use bytes::Bytes;
use contracts::Opcode;
use thiserror::Error;
use tracing::{debug, instrument, warn};

use crate::codec::Request;
use crate::monitor::{receive_from, Failure, Strays};
use crate::transport::DatagramTransport;

/// Why a fragmented transfer stopped early
#[derive(Debug, Error)]
pub enum TransferError {
    /// Rejected before anything was sent
    #[error("{len} bytes cannot be split into {fragments} equal fragments")]
    Indivisible { len: usize, fragments: usize },

    /// The controller answered `python_exit` instead of acknowledging
    #[error("controller exited after {sent} fragments")]
    ControllerExited { sent: usize },

    #[error("transfer failed after {sent} fragments: {failure}")]
    Failed {
        sent: usize,
        #[source]
        failure: Failure,
    },
}

impl TransferError {
    /// Fragments that reached the socket before the transfer stopped
    pub fn sent(&self) -> usize {
        match self {
            TransferError::Indivisible { .. } => 0,
            TransferError::ControllerExited { sent } | TransferError::Failed { sent, .. } => *sent,
        }
    }
}

/// Size of each fragment, `None` when the payload is empty or the split
/// is not even
pub fn fragment_size(len: usize, fragments: usize) -> Option<usize> {
    if len == 0 || fragments == 0 || len % fragments != 0 {
        None
    } else {
        Some(len / fragments)
    }
}

/// Send `payload` to `endpoint` as `fragments` acknowledged datagrams
///
/// Returns the number of fragments sent, which equals `fragments` on
/// success. Every fragment, the last one included, must be acknowledged
/// within `ack_timeout`. Acknowledgements are read into `buf`; datagrams
/// from other addresses are handled per `strays`.
#[instrument(
    name = "fragment_send",
    skip(transport, payload, buf),
    fields(len = payload.len())
)]
pub async fn send_fragmented<T: DatagramTransport>(
    transport: &T,
    payload: &Bytes,
    fragments: usize,
    endpoint: SocketAddr,
    ack_timeout: Duration,
    buf: &mut [u8],
    strays: Strays,
) -> Result<usize, TransferError> {
    let size = fragment_size(payload.len(), fragments).ok_or(TransferError::Indivisible {
        len: payload.len(),
        fragments,
    })?;

    let mut sent = 0;
    for chunk in payload.chunks(size) {
        transport
            .send_to(chunk, endpoint)
            .await
            .map_err(|source| TransferError::Failed {
                sent,
                failure: Failure::Transport { endpoint, source },
            })?;
        sent += 1;

        let ack = receive_from(transport, endpoint, ack_timeout, buf, strays)
            .await
            .map_err(|failure| TransferError::Failed { sent, failure })?;

        match Request::parse(&ack) {
            Ok(Request::SendNext) => {}
            Ok(Request::Exit) => return Err(TransferError::ControllerExited { sent }),
            other => {
                let detail = match other {
                    Ok(request) => format!(
                        "expected {} after fragment {sent}, got {request:?}",
                        Opcode::PythonSendNext
                    ),
                    Err(e) => format!("undecodable acknowledgement after fragment {sent}: {e}"),
                };
                warn!(sent, fragments, "{detail}");
                return Err(TransferError::Failed {
                    sent,
                    failure: Failure::desync(endpoint, detail),
                });
            }
        }
    }

    debug!(fragments = sent, size, "Fragmented transfer complete");
    Ok(sent)
}
