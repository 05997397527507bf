//! Bridge facade
//!
//! Owns both sockets and the shared context. The simulation driver calls
//! `handle_start` once per program run, `handle_update` every tick and
//! `handle_exit` when the simulator shuts down.

use std::net::SocketAddr;
use std::sync::Arc;

use contracts::{BridgeBlueprint, Opcode, Simulation, TopLevelCall};
use tokio::net::UdpSocket;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, instrument, warn};

use crate::codec::opcode_datagram;
use crate::context::BridgeContext;
use crate::dispatcher::{CallDispatcher, CallReport};
use crate::error::BridgeError;
use crate::metrics::MetricsSnapshot;
use crate::side_channel::SideChannel;
use crate::transport::{self, DatagramTransport};

/// Simulator-side end of the controller bridge
pub struct Bridge<T = UdpSocket> {
    context: Arc<BridgeContext>,
    sync_transport: Option<T>,
    /// Taken when the side-channel is spawned
    async_transport: Option<T>,
    async_addr: Option<SocketAddr>,
    shutdown_tx: watch::Sender<bool>,
    side_channel: Option<JoinHandle<()>>,
    exited: bool,
}

impl Bridge<UdpSocket> {
    /// Bind both UDP sockets from the blueprint's `[network]` section
    #[instrument(name = "bridge_bind", skip_all, fields(sync = %blueprint.network.sync_addr(), async_ = %blueprint.network.async_addr()))]
    pub async fn bind(
        blueprint: BridgeBlueprint,
        simulation: Arc<dyn Simulation>,
    ) -> Result<Self, BridgeError> {
        let sync_socket = transport::bind("sync", blueprint.network.sync_addr()).await?;
        let async_socket = transport::bind("async", blueprint.network.async_addr()).await?;
        Ok(Self::with_transports(
            blueprint,
            simulation,
            sync_socket,
            async_socket,
        ))
    }
}

impl<T: DatagramTransport + Sync + 'static> Bridge<T> {
    /// Build a bridge over already-bound transports
    ///
    /// Endpoints listed in the blueprint are registered into slots 0.. in
    /// order.
    pub fn with_transports(
        blueprint: BridgeBlueprint,
        simulation: Arc<dyn Simulation>,
        sync_transport: T,
        async_transport: T,
    ) -> Self {
        let host = blueprint.network.host;
        let configured: Vec<SocketAddr> = blueprint.endpoints.iter().map(|e| e.addr(host)).collect();
        let context = Arc::new(BridgeContext::new(blueprint, simulation));

        for addr in configured {
            if context.register(addr).is_none() {
                warn!(endpoint = %addr, "No free car for configured endpoint");
            }
        }

        let (shutdown_tx, _) = watch::channel(false);
        let async_addr = async_transport.local_addr().ok();

        Self {
            context,
            sync_transport: Some(sync_transport),
            async_transport: Some(async_transport),
            async_addr,
            shutdown_tx,
            side_channel: None,
            exited: false,
        }
    }

    /// Start serving the async port in the background
    ///
    /// Returns false if it is already running or the bridge has exited.
    pub fn spawn_side_channel(&mut self) -> bool {
        let Some(transport) = self.async_transport.take() else {
            return false;
        };

        let channel = SideChannel::new(self.context.clone(), transport);
        self.side_channel = Some(tokio::spawn(channel.run(self.shutdown_tx.subscribe())));
        true
    }

    /// Run the controllers' start function
    pub async fn handle_start(&self) -> CallReport {
        self.call(TopLevelCall::Start).await
    }

    /// Run one update step on every controller
    pub async fn handle_update(&self) -> CallReport {
        self.call(TopLevelCall::Update).await
    }

    async fn call(&self, call: TopLevelCall) -> CallReport {
        match &self.sync_transport {
            Some(transport) => CallDispatcher::new(&self.context, transport).call(call).await,
            None => CallReport::new(call),
        }
    }

    /// Tell every controller the simulator is exiting and close both sockets
    ///
    /// Only the first call has an effect.
    #[instrument(name = "bridge_exit", skip(self))]
    pub async fn handle_exit(&mut self) {
        if self.exited {
            return;
        }
        self.exited = true;

        let endpoints = self.context.registry().endpoints();
        if let Some(transport) = &self.sync_transport {
            let datagram = opcode_datagram(Opcode::UnityExit);
            for (car, endpoint) in &endpoints {
                if let Err(e) = transport.send_to(&datagram, endpoint.addr).await {
                    warn!(car, endpoint = %endpoint.addr, error = %e, "Exit broadcast failed");
                }
            }
        }
        self.context.clear();

        // The receiver may already be gone
        let _ = self.shutdown_tx.send(true);
        if let Some(handle) = self.side_channel.take() {
            if let Err(e) = handle.await {
                warn!(error = %e, "Side-channel task failed");
            }
        }

        self.sync_transport = None;
        self.async_transport = None;
        info!(notified = endpoints.len(), "Bridge closed");
    }

    pub fn endpoint_count(&self) -> usize {
        self.context.registry().count()
    }

    /// One flag per car slot
    pub fn connected_programs(&self) -> Vec<bool> {
        self.context.registry().connected()
    }

    /// Register a controller for the sync path
    pub fn register_endpoint(&self, addr: SocketAddr) -> Option<usize> {
        self.context.register(addr)
    }

    pub fn local_sync_addr(&self) -> Option<SocketAddr> {
        self.sync_transport
            .as_ref()
            .and_then(|t| t.local_addr().ok())
    }

    pub fn local_async_addr(&self) -> Option<SocketAddr> {
        self.async_addr
    }

    pub fn is_exited(&self) -> bool {
        self.exited
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.context.metrics().snapshot()
    }

    pub fn context(&self) -> &Arc<BridgeContext> {
        &self.context
    }
}
