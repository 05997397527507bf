//! # Contracts
//!
//! Frozen interface contracts shared by every bridge crate: the wire
//! protocol tables, call outcomes, the sensor/actuator capability traits
//! the simulation provides, and the bridge configuration blueprint.
//! All business crates can only depend on this crate, reverse dependencies are prohibited.
//!
//! ## Wire model
//! - Byte 0 of every datagram is an [`Opcode`] tag
//! - Remaining bytes are fixed-offset, fixed-width, little-endian
//! - No length prefixes and no version field outside the connect handshake

mod blueprint;
mod error;
mod input;
mod outcome;
mod protocol;
mod sensor;

pub use blueprint::*;
pub use error::*;
pub use input::*;
pub use outcome::*;
pub use protocol::*;
pub use sensor::*;
