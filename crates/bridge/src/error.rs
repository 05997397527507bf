//! Bridge error types

use std::net::SocketAddr;

use contracts::Opcode;
use thiserror::Error;

/// Bridge-specific errors
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Socket bind failure
    #[error("failed to bind {role} socket on {addr}: {source}")]
    Bind {
        role: &'static str,
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// Config error (from contract)
    #[error("config error: {0}")]
    Contract(#[from] contracts::ContractError),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl BridgeError {
    pub fn bind(role: &'static str, addr: SocketAddr, source: std::io::Error) -> Self {
        Self::Bind { role, addr, source }
    }
}

/// A datagram that could not be decoded into a request
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("empty datagram")]
    Empty,

    #[error("unknown opcode tag {0}")]
    UnknownOpcode(u8),

    #[error("{opcode} needs {expected} bytes, got {got}")]
    Truncated {
        opcode: Opcode,
        expected: usize,
        got: usize,
    },

    #[error("{opcode} carries invalid input id {value}")]
    InvalidInput { opcode: Opcode, value: u8 },
}
