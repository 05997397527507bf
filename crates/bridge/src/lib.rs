//! # Bridge
//!
//! Datagram RPC bridge between the racecar simulation and out-of-process
//! controller programs.
//!
//! Responsibilities:
//! - Endpoint registry: which controller drives which car
//! - Lock-step `unity_start` / `unity_update` calls with sub-request servicing
//! - Stop-and-wait fragmentation for camera images
//! - Bounded waits, failure classification and eviction
//! - Async side-channel for notebook clients and the connect handshake
//!
//! ## Usage
//!
//! ```ignore
//! use bridge::Bridge;
//!
//! let mut bridge = Bridge::bind(blueprint, simulation).await?;
//! bridge.spawn_side_channel();
//!
//! bridge.handle_start().await;
//! loop {
//!     let report = bridge.handle_update().await;
//!     // advance the world
//! }
//! bridge.handle_exit().await;
//! ```

mod bridge;
pub mod codec;
mod context;
mod dispatcher;
pub mod error;
pub mod fragment;
pub mod metrics;
pub mod monitor;
mod registry;
mod service;
mod side_channel;
pub mod transport;

#[cfg(test)]
mod testing;

pub use bridge::Bridge;
pub use codec::{CollaboratorCall, Request};
pub use context::BridgeContext;
pub use dispatcher::{CallDispatcher, CallReport, Serviced, SessionReport};
pub use error::{BridgeError, DecodeError};
pub use fragment::{send_fragmented, TransferError};
pub use metrics::{BridgeMetrics, MetricsSnapshot};
pub use monitor::{receive_from, Failure, FailureMonitor, Strays};
pub use registry::{Endpoint, EndpointRegistry};
pub use service::{respond, Response};
pub use side_channel::SideChannel;
pub use transport::{DatagramTransport, LocalDatagramTransport};
