//! State-transition error types.

use thiserror::Error;

use crate::state::{ExecutionPhase, ExecutionResult};

/// Result type for state-transition operations.
pub type StateResult<T> = Result<T, StateError>;

/// Errors raised by execution/node state transitions.
///
/// Transitions are monotonic (`Waiting -> Running -> Finished`); any
/// attempt to move a record backward, or to finish it twice, is rejected
/// here rather than silently overwritten.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateError {
    /// The record is already terminal.
    #[error("record is already finished with result {result}")]
    AlreadyFinished {
        /// Terminal result the record holds.
        result: ExecutionResult,
    },

    /// The requested transition is not part of the state machine.
    #[error("invalid transition from {from} to {to}")]
    InvalidTransition {
        /// Phase the record is in.
        from: ExecutionPhase,
        /// Phase the transition asked for.
        to: ExecutionPhase,
    },

    /// A success result was combined with a failure kind.
    #[error("success result cannot carry a failure kind")]
    SuccessWithFailureKind,

    /// A failure result was recorded without an error message.
    #[error("failure result requires an error message")]
    FailureWithoutMessage,
}
