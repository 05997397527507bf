//! Call outcomes and session states

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::Opcode;

/// Top-level lock-step call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TopLevelCall {
    /// Run the controller's start function (once per program run)
    Start,
    /// Run the controller's update function (every tick)
    Update,
}

impl TopLevelCall {
    pub fn opcode(self) -> Opcode {
        match self {
            TopLevelCall::Start => Opcode::UnityStart,
            TopLevelCall::Update => Opcode::UnityUpdate,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            TopLevelCall::Start => "start",
            TopLevelCall::Update => "update",
        }
    }
}

/// Result of servicing one endpoint during one top-level call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallOutcome {
    /// The controller sent `python_finished`
    Finished,
    /// The controller sent `python_exit`; its endpoint left the registry
    Disconnected,
    /// No datagram within the bounded wait
    TimedOut,
    /// Socket-level failure other than a timeout
    TransportError,
    /// A reply carried an opcode the protocol state did not allow
    Desync,
}

impl CallOutcome {
    /// True for the outcomes that break the session
    pub fn is_failure(self) -> bool {
        matches!(
            self,
            CallOutcome::TimedOut | CallOutcome::TransportError | CallOutcome::Desync
        )
    }

    pub fn label(self) -> &'static str {
        match self {
            CallOutcome::Finished => "finished",
            CallOutcome::Disconnected => "disconnected",
            CallOutcome::TimedOut => "timed_out",
            CallOutcome::TransportError => "transport_error",
            CallOutcome::Desync => "desync",
        }
    }
}

impl fmt::Display for CallOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Per-session state tracked by the failure monitor
///
/// `Broken` is terminal; only a fresh connect (or process restart) brings a
/// car back under program control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    #[default]
    Connected,
    AwaitingReply,
    Broken,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_classification() {
        assert!(!CallOutcome::Finished.is_failure());
        assert!(!CallOutcome::Disconnected.is_failure());
        assert!(CallOutcome::TimedOut.is_failure());
        assert!(CallOutcome::TransportError.is_failure());
        assert!(CallOutcome::Desync.is_failure());
    }

    #[test]
    fn test_top_level_opcodes() {
        assert_eq!(TopLevelCall::Start.opcode(), Opcode::UnityStart);
        assert_eq!(TopLevelCall::Update.opcode(), Opcode::UnityUpdate);
    }

    #[test]
    fn test_outcome_serde_names() {
        let json = serde_json::to_string(&CallOutcome::TimedOut).unwrap();
        assert_eq!(json, "\"timed_out\"");
    }
}
