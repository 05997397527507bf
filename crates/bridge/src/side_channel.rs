//! Async side-channel
//!
//! Serves notebook-style clients that are not bound to the simulation tick.
//! Handles the connect handshake and sensor reads against car 0; the receive
//! loop itself never times out. Requests are served one at a time: while a
//! fragmented image waits for acknowledgements, other clients are answered
//! `[error, generic]` and must retry.

use std::cmp::Ordering;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use contracts::{ErrorCode, Opcode};
use tokio::sync::{watch, Mutex};
use tracing::{debug, info, instrument, warn};

use crate::codec::{connect_ack, error_datagram, CollaboratorCall, Request};
use crate::context::BridgeContext;
use crate::fragment::{send_fragmented, TransferError};
use crate::monitor::Strays;
use crate::service::{respond, Response};
use crate::transport::{DatagramTransport, RECV_BUFFER_SIZE};

/// The side-channel controls exactly one car
const SIDE_CHANNEL_CAR: usize = 0;

/// Listener on the async port
pub struct SideChannel<T> {
    context: Arc<BridgeContext>,
    transport: T,
    /// Receive buffer for fragment acknowledgements
    ack_buf: Mutex<Vec<u8>>,
}

impl<T: DatagramTransport> SideChannel<T> {
    pub fn new(context: Arc<BridgeContext>, transport: T) -> Self {
        Self {
            context,
            transport,
            ack_buf: Mutex::new(vec![0u8; RECV_BUFFER_SIZE]),
        }
    }

    /// Serve requests until `shutdown` flips to true or its sender is dropped
    #[instrument(name = "side_channel_run", skip_all)]
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!(addr = ?self.transport.local_addr().ok(), "Side-channel listening");
        let mut buf = vec![0u8; RECV_BUFFER_SIZE];

        loop {
            if *shutdown.borrow() {
                break;
            }

            let received = tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    continue;
                }
                result = self.transport.recv_from(&mut buf) => result,
            };

            match received {
                Ok((n, from)) => self.handle_datagram(&buf[..n], from).await,
                // A previous reply bounced; keep serving the others
                Err(e) => warn!(error = %e, "Side-channel receive failed"),
            }
        }

        info!("Side-channel stopped");
    }

    /// Handle one request from `from`
    #[instrument(name = "side_channel_request", skip(self, datagram), fields(from = %from))]
    pub async fn handle_datagram(&self, datagram: &[u8], from: SocketAddr) {
        self.context.metrics().inc_side_channel_requests();
        observability::record_side_channel_request(
            datagram.first().copied().and_then(Opcode::from_tag),
        );

        match Request::parse(datagram) {
            Ok(Request::Connect { version }) => {
                self.handle_connect(from, version).await;
            }
            Ok(Request::Exit) => {
                if let Some(car) = self.context.release_address(from) {
                    info!(car, "Controller exited");
                }
            }
            Ok(Request::Collaborator(call)) if call.is_sensor_read() => {
                self.serve(call, from).await;
            }
            Ok(other) => warn!(request = ?other, "Unsupported on the side-channel"),
            Err(e) => warn!(error = %e, "Ignoring malformed datagram"),
        }
    }

    /// Register `from` if its protocol version matches, and answer it
    ///
    /// Replies `[connect, slot]` on success, otherwise `[error, code]`.
    pub async fn handle_connect(&self, from: SocketAddr, version: u8) -> Bytes {
        let expected = self.context.blueprint().protocol.version;

        let reply = match version.cmp(&expected) {
            Ordering::Less => {
                warn!(version, expected, "Controller library is out of date");
                error_datagram(ErrorCode::PythonOutdated)
            }
            Ordering::Greater => {
                warn!(version, expected, "Simulator is out of date");
                error_datagram(ErrorCode::RacecarsimOutdated)
            }
            Ordering::Equal => match self.context.register(from) {
                Some(slot) => connect_ack(u8::try_from(slot).unwrap_or(u8::MAX)),
                None => {
                    warn!(
                        capacity = self.context.registry().capacity(),
                        "No free car for connecting controller"
                    );
                    error_datagram(ErrorCode::NoFreeCar)
                }
            },
        };

        self.reply(&reply, from).await;
        reply
    }

    async fn serve(&self, call: CollaboratorCall, from: SocketAddr) {
        let opcode = call.opcode();
        debug!(%opcode, "Side-channel read");
        observability::record_sub_request(opcode);

        let response = respond(
            call,
            SIDE_CHANNEL_CAR,
            self.context.simulation(),
            &self.context.blueprint().protocol,
        );

        match response {
            Response::Empty => {}
            Response::Single(payload) => self.reply(&payload, from).await,
            Response::Fragmented { payload, fragments } => {
                let ack_timeout = self.context.blueprint().timeouts.async_fragment_ack();
                let mut buf = self.ack_buf.lock().await;
                let result = send_fragmented(
                    &self.transport,
                    &payload,
                    fragments,
                    from,
                    ack_timeout,
                    &mut buf,
                    Strays::Reject,
                )
                .await;
                drop(buf);

                let sent = match &result {
                    Ok(sent) => *sent,
                    Err(e) => e.sent(),
                };
                self.context.metrics().add_fragments_sent(sent);
                observability::record_fragment_transfer(result.is_ok(), sent);

                match result {
                    Ok(_) => {}
                    Err(TransferError::ControllerExited { .. }) => {
                        self.context.release_address(from);
                    }
                    Err(e) => {
                        warn!(error = %e, "Side-channel transfer failed");
                        self.context.metrics().inc_fragment_failures();
                        self.reply(&error_datagram(ErrorCode::FragmentMismatch), from)
                            .await;
                    }
                }
            }
        }
    }

    async fn reply(&self, datagram: &[u8], to: SocketAddr) {
        if let Err(e) = self.transport.send_to(datagram, to).await {
            warn!(to = %to, error = %e, "Side-channel reply failed");
        }
    }
}
