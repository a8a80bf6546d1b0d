//! Per-call lifecycle state machine using rust-fsm.
//!
//! Every facade call owns one machine. The governor feeds it the observed
//! outcome and the result of any recovery, so illegal sequences (a second
//! recovery, a replay without a successful refresh) are rejected.
//!
//! ## State Diagram
//!
//! ```text
//!                  ┌──────────────┐
//!        ┌────────►│  Dispatched  │ (initial)
//!        │         └──────┬───────┘
//!        │                │
//!        │   ResponseOk ──┼── Failure ──────────────► Failed
//!        │                │
//!        │     CsrfRejection / AuthRejection
//!        │                ▼
//!        │   ┌──────────────────────────┐
//!        │   │ CsrfRejected/Unauthorized│── GiveUp ──► Failed
//!        │   └────────────┬─────────────┘
//!        │                │ Recover
//!        │                ▼
//!        │        ┌────────────────┐
//!        └────────│ RefreshAttempt │── RecoveryFailed ──► Terminated
//!  RecoverySucceeded └────────────┘
//!
//!   ResponseOk ──► Completed
//! ```

use rust_fsm::*;
use serde::{Deserialize, Serialize};

state_machine! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub call_machine(Dispatched)

    Dispatched => {
        ResponseOk => Completed,
        CsrfRejection => CsrfRejected,
        AuthRejection => Unauthorized,
        Failure => Failed
    },
    CsrfRejected => {
        Recover => RefreshAttempt,
        GiveUp => Failed
    },
    Unauthorized => {
        Recover => RefreshAttempt,
        GiveUp => Failed
    },
    RefreshAttempt => {
        RecoverySucceeded => Dispatched,
        RecoveryFailed => Terminated
    }
}

pub use call_machine::Input as CallMachineInput;
pub use call_machine::State as CallMachineState;
pub use call_machine::StateMachine as CallMachine;

/// Simplified call state for logs and callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallState {
    Dispatched,
    Completed,
    CsrfRejected,
    Unauthorized,
    Failed,
    RefreshAttempt,
    Terminated,
}

impl CallState {
    /// No further transitions are possible.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            CallState::Completed | CallState::Failed | CallState::Terminated
        )
    }
}

impl From<&CallMachineState> for CallState {
    fn from(state: &CallMachineState) -> Self {
        match state {
            CallMachineState::Dispatched => CallState::Dispatched,
            CallMachineState::Completed => CallState::Completed,
            CallMachineState::CsrfRejected => CallState::CsrfRejected,
            CallMachineState::Unauthorized => CallState::Unauthorized,
            CallMachineState::Failed => CallState::Failed,
            CallMachineState::RefreshAttempt => CallState::RefreshAttempt,
            CallMachineState::Terminated => CallState::Terminated,
        }
    }
}
