//! Operation State Machine - single source of truth for valid phase transitions
//!
//! State diagram:
//! ```text
//!          ┌──Begin(Save)──────> Saving ──Advance(Restart)──> Restarting
//!          │                       │                              │
//! Idle ────┼──Begin(Reconfigure)─> Reconfiguring                  │
//!  ▲       │                       │                              │
//!  │       └──Begin(Restart)─────> Restarting                     │
//!  │                               │                              │
//!  │                         Succeed / Fail  <────────────────────┘
//!  │                               ↓
//!  └────────Clear──────── Success | Error ──Begin(..)──> (new operation)
//! ```
//!
//! `Success` and `Error` behave like `Idle` for a new operation: the next
//! intent pre-empts their auto-clear.

use serde::{Deserialize, Serialize};

/// Phases an operation moves through.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, specta::Type, strum::Display,
)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "lowercase")]
pub enum OperationPhase {
    #[default]
    Idle,
    Saving,
    Reconfiguring,
    Restarting,
    Success,
    Error,
}

impl OperationPhase {
    /// An operation is in flight.
    pub fn is_busy(self) -> bool {
        matches!(
            self,
            OperationPhase::Saving | OperationPhase::Reconfiguring | OperationPhase::Restarting
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, OperationPhase::Success | OperationPhase::Error)
    }
}

/// The in-flight stage an operation is working on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Save,
    Reconfigure,
    Restart,
}

impl Stage {
    fn phase(self) -> OperationPhase {
        match self {
            Stage::Save => OperationPhase::Saving,
            Stage::Reconfigure => OperationPhase::Reconfiguring,
            Stage::Restart => OperationPhase::Restarting,
        }
    }
}

/// Events that can trigger phase transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseEvent {
    /// A new operation starts at this stage
    Begin(Stage),
    /// A running operation moves on to its next stage
    Advance(Stage),
    /// The running operation finished
    Succeed,
    /// The running operation failed
    Fail,
    /// Auto-clear of a terminal phase
    Clear,
}

/// Reason a transition was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("{attempted_event:?} event rejected in {current_phase} phase")]
pub struct TransitionRejection {
    pub current_phase: OperationPhase,
    pub attempted_event: PhaseEvent,
}

/// Phase tracker. Callers hold it behind the orchestrator's lock.
#[derive(Debug, Default)]
pub struct PhaseMachine {
    phase: OperationPhase,
}

impl PhaseMachine {
    pub fn current(&self) -> OperationPhase {
        self.phase
    }

    pub fn is_busy(&self) -> bool {
        self.phase.is_busy()
    }

    /// Attempt a transition. This is the ONLY way to change phase.
    pub fn transition(&mut self, event: PhaseEvent) -> Result<OperationPhase, TransitionRejection> {
        match compute_transition(self.phase, event) {
            Some(next) => {
                self.phase = next;
                Ok(next)
            }
            None => Err(TransitionRejection {
                current_phase: self.phase,
                attempted_event: event,
            }),
        }
    }
}

/// Pure function: the phase `event` leads to from `current`, if any.
fn compute_transition(current: OperationPhase, event: PhaseEvent) -> Option<OperationPhase> {
    match (current, event) {
        (
            OperationPhase::Idle | OperationPhase::Success | OperationPhase::Error,
            PhaseEvent::Begin(stage),
        ) => Some(stage.phase()),

        // Multi-step operations only ever move from saving to restarting.
        (OperationPhase::Saving, PhaseEvent::Advance(Stage::Restart)) => {
            Some(OperationPhase::Restarting)
        }

        (phase, PhaseEvent::Succeed) if phase.is_busy() => Some(OperationPhase::Success),
        (phase, PhaseEvent::Fail) if phase.is_busy() => Some(OperationPhase::Error),

        (OperationPhase::Success | OperationPhase::Error, PhaseEvent::Clear) => {
            Some(OperationPhase::Idle)
        }

        _ => None,
    }
}
