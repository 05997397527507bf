//! Call dispatcher - lock-step top-level calls
//!
//! One top-level call visits every registered endpoint in slot order. Each
//! endpoint gets the call opcode and is then serviced until it answers
//! `python_finished`, leaves with `python_exit`, or breaks.

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use contracts::{CallOutcome, SessionState, TopLevelCall};
use tracing::{debug, info, instrument, trace, warn};

use crate::codec::{CollaboratorCall, Request};
use crate::context::BridgeContext;
use crate::fragment::{send_fragmented, TransferError};
use crate::monitor::{receive_from, Failure, FailureMonitor, Strays};
use crate::service::{respond, Response};
use crate::transport::{DatagramTransport, RECV_BUFFER_SIZE};

/// Result of one endpoint's turn
#[derive(Debug, Clone)]
pub struct SessionReport {
    pub car: usize,
    pub endpoint: SocketAddr,
    pub outcome: CallOutcome,
    /// Collaborator calls serviced
    pub sub_requests: u64,
    /// `error` datagrams the controller sent
    pub controller_errors: u64,
    pub elapsed: Duration,
}

/// Result of one top-level call
#[derive(Debug, Clone)]
pub struct CallReport {
    pub call: TopLevelCall,
    /// Serviced endpoints, in slot order
    pub sessions: Vec<SessionReport>,
    /// A session broke and the remaining endpoints were skipped
    pub aborted: bool,
}

impl CallReport {
    pub fn new(call: TopLevelCall) -> Self {
        Self {
            call,
            sessions: Vec::new(),
            aborted: false,
        }
    }

    pub fn outcome_for(&self, car: usize) -> Option<CallOutcome> {
        self.sessions
            .iter()
            .find(|s| s.car == car)
            .map(|s| s.outcome)
    }

    pub fn all_finished(&self) -> bool {
        self.sessions
            .iter()
            .all(|s| s.outcome == CallOutcome::Finished)
    }
}

/// What servicing one sub-request led to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Serviced {
    /// Reply sent (or none needed); keep servicing
    Continue,
    /// The controller exited during a fragmented reply
    Exited,
}

/// Drives lock-step calls over the sync transport
pub struct CallDispatcher<'a, T> {
    context: &'a BridgeContext,
    transport: &'a T,
}

impl<'a, T: DatagramTransport> CallDispatcher<'a, T> {
    pub fn new(context: &'a BridgeContext, transport: &'a T) -> Self {
        Self { context, transport }
    }

    /// Run `call` against every registered endpoint, sequentially
    ///
    /// A broken session ends the call; endpoints after it are not contacted
    /// this time but stay registered.
    #[instrument(name = "dispatcher_call", skip(self), fields(call = call.name()))]
    pub async fn call(&self, call: TopLevelCall) -> CallReport {
        let mut report = CallReport::new(call);
        let endpoints = self.context.registry().endpoints();
        self.context.metrics().inc_calls();

        for (car, endpoint) in endpoints {
            // The side-channel may have changed the registry meanwhile
            if self.context.registry().get(car).map(|e| e.addr) != Some(endpoint.addr) {
                continue;
            }

            let session = self.service_endpoint(call, car, endpoint.addr).await;
            let broken = session.outcome.is_failure();
            report.sessions.push(session);

            if broken {
                report.aborted = true;
                break;
            }
        }

        report
    }

    #[instrument(
        name = "dispatcher_service_endpoint",
        skip(self, call),
        fields(call = call.name(), endpoint = %addr)
    )]
    async fn service_endpoint(
        &self,
        call: TopLevelCall,
        car: usize,
        addr: SocketAddr,
    ) -> SessionReport {
        let started = Instant::now();
        let mut session = SessionReport {
            car,
            endpoint: addr,
            outcome: CallOutcome::Finished,
            sub_requests: 0,
            controller_errors: 0,
            elapsed: Duration::ZERO,
        };

        self.context
            .registry()
            .set_state(car, SessionState::AwaitingReply);

        let outcome = match self.run_session(call, car, addr, &mut session).await {
            Ok(outcome) => outcome,
            Err(failure) => {
                FailureMonitor::new(self.context, self.transport)
                    .handle_failure(car, &failure)
                    .await
            }
        };

        if outcome == CallOutcome::Finished {
            self.context.registry().set_state(car, SessionState::Connected);
        }

        session.outcome = outcome;
        session.elapsed = started.elapsed();
        self.context.metrics().record_outcome(outcome);
        observability::record_call_outcome(call, outcome, session.elapsed);
        session
    }

    async fn run_session(
        &self,
        call: TopLevelCall,
        car: usize,
        addr: SocketAddr,
        session: &mut SessionReport,
    ) -> Result<CallOutcome, Failure> {
        let timeout = self.context.blueprint().timeouts.lockstep();
        let mut buf = vec![0u8; RECV_BUFFER_SIZE];

        self.transport
            .send_to(&[call.opcode().tag()], addr)
            .await
            .map_err(|source| Failure::Transport {
                endpoint: addr,
                source,
            })?;

        loop {
            let datagram =
                receive_from(self.transport, addr, timeout, &mut buf, Strays::Discard).await?;

            match Request::parse(&datagram) {
                Ok(Request::Finished) => return Ok(CallOutcome::Finished),
                Ok(Request::Exit) => {
                    self.controller_exited(car, addr);
                    return Ok(CallOutcome::Disconnected);
                }
                Ok(Request::Error(code)) => {
                    warn!(car, code = ?code, "Controller reported an error");
                    session.controller_errors += 1;
                    self.context.metrics().inc_controller_errors();
                    observability::record_controller_error(car);
                    self.context.simulation().on_controller_error(car, code);
                }
                Ok(Request::Collaborator(request)) => {
                    session.sub_requests += 1;
                    if self.service_request(car, addr, request, &mut buf).await? == Serviced::Exited {
                        self.controller_exited(car, addr);
                        return Ok(CallOutcome::Disconnected);
                    }
                }
                Ok(other) => {
                    warn!(car, request = ?other, "Ignoring request not valid during a lock-step call")
                }
                Err(e) => warn!(car, error = %e, "Ignoring malformed datagram"),
            }
        }
    }

    /// Perform one collaborator operation and send its reply
    ///
    /// Fragment acknowledgements are read into `buf`.
    pub async fn service_request(
        &self,
        car: usize,
        addr: SocketAddr,
        request: CollaboratorCall,
        buf: &mut [u8],
    ) -> Result<Serviced, Failure> {
        let opcode = request.opcode();
        trace!(car, %opcode, "Sub-request");
        self.context.metrics().inc_sub_requests();
        observability::record_sub_request(opcode);

        let response = respond(
            request,
            car,
            self.context.simulation(),
            &self.context.blueprint().protocol,
        );

        match response {
            Response::Empty => Ok(Serviced::Continue),
            Response::Single(payload) => {
                self.transport
                    .send_to(&payload, addr)
                    .await
                    .map_err(|source| Failure::Transport {
                        endpoint: addr,
                        source,
                    })?;
                Ok(Serviced::Continue)
            }
            Response::Fragmented { payload, fragments } => {
                let timeout = self.context.blueprint().timeouts.lockstep();
                let result = send_fragmented(
                    self.transport,
                    &payload,
                    fragments,
                    addr,
                    timeout,
                    buf,
                    Strays::Discard,
                )
                .await;

                let sent = match &result {
                    Ok(sent) => *sent,
                    Err(e) => e.sent(),
                };
                self.context.metrics().add_fragments_sent(sent);
                observability::record_fragment_transfer(result.is_ok(), sent);

                match result {
                    Ok(_) => Ok(Serviced::Continue),
                    Err(TransferError::ControllerExited { .. }) => Ok(Serviced::Exited),
                    Err(TransferError::Failed { failure, .. }) => {
                        self.context.metrics().inc_fragment_failures();
                        Err(failure)
                    }
                    Err(e @ TransferError::Indivisible { .. }) => {
                        self.context.metrics().inc_fragment_failures();
                        Err(Failure::desync(addr, e.to_string()))
                    }
                }
            }
        }
    }

    fn controller_exited(&self, car: usize, addr: SocketAddr) {
        info!(car, endpoint = %addr, "Controller exited");
        self.context.release(car);
    }
}
