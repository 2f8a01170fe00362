//! Execution state model.
//!
//! The same phase/result shape applies at two granularities: the whole
//! execution ([`WorkflowExecution`]) and each visited node
//! ([`NodeExecutionState`]). Phases only ever move forward
//! (`Waiting -> Running -> Finished`), and [`validate_state`] is the single
//! well-formedness predicate both record types answer to.

use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, IntoStaticStr};

use crate::envelope::NodeOutputEnvelope;
use crate::error::{StateError, StateResult};
use crate::id::{ExecutionId, NodeId, WorkflowId};
use crate::kind::TriggerKind;

/// Coarse lifecycle stage of an execution or node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(AsRefStr, Display, IntoStaticStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ExecutionPhase {
    /// Created but not yet picked up by the orchestrator.
    Waiting,
    /// Currently being driven.
    Running,
    /// Terminal; a result is set and the record is immutable.
    Finished,
}

/// Terminal outcome, valid only once `phase == Finished`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(AsRefStr, Display, IntoStaticStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ExecutionResult {
    /// Every reachable node completed.
    Success,
    /// A node failed, or the engine could not continue.
    Failure,
    /// Stopped cooperatively before completion.
    Cancelled,
}

/// Classification of a failed execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(AsRefStr, Display, IntoStaticStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FailureKind {
    /// A node's executor reported failure.
    NodeFailed,
    /// A node's declared input could not be dereferenced.
    ResolutionFailed,
    /// A node's collaborator call exceeded its deadline.
    Timeout,
    /// The engine itself could not continue (e.g. persistence down).
    System,
}

/// Checks phase/result/failure-kind coherence.
///
/// This is the single source of truth for "is this record well-formed":
/// - `Finished` requires a result;
/// - a result requires `Finished`;
/// - `Success` forbids a populated failure kind.
pub fn validate_state(
    phase: ExecutionPhase,
    result: Option<ExecutionResult>,
    failure_kind: Option<FailureKind>,
) -> bool {
    match phase {
        ExecutionPhase::Waiting | ExecutionPhase::Running => {
            result.is_none() && failure_kind.is_none()
        }
        ExecutionPhase::Finished => match result {
            None => false,
            Some(ExecutionResult::Success) => failure_kind.is_none(),
            Some(ExecutionResult::Failure) | Some(ExecutionResult::Cancelled) => true,
        },
    }
}

/// One row per run attempt of a workflow.
///
/// Created when a run is started, mutated only by the orchestrator that
/// owns it, terminal once `phase == Finished`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowExecution {
    /// Unique identifier of this run attempt.
    pub id: ExecutionId,
    /// The workflow this run belongs to.
    pub workflow_id: WorkflowId,
    /// How the run was started.
    pub trigger_kind: TriggerKind,
    /// Current lifecycle phase.
    pub phase: ExecutionPhase,
    /// Terminal outcome, set exactly when `phase == Finished`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<ExecutionResult>,
    /// Failure classification, only ever set alongside `Failure`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_kind: Option<FailureKind>,
    /// Human-readable error captured from the originating failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Creation timestamp.
    pub created_at: Timestamp,
    /// When the orchestrator picked the run up.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<Timestamp>,
    /// When the run reached its terminal phase.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<Timestamp>,
}

impl WorkflowExecution {
    /// Creates a new waiting execution record.
    pub fn new(workflow_id: WorkflowId, trigger_kind: TriggerKind) -> Self {
        Self {
            id: ExecutionId::new(),
            workflow_id,
            trigger_kind,
            phase: ExecutionPhase::Waiting,
            result: None,
            failure_kind: None,
            error_message: None,
            created_at: Timestamp::now(),
            started_at: None,
            finished_at: None,
        }
    }

    /// Marks the execution as running.
    pub fn begin(&mut self) -> StateResult<()> {
        match self.phase {
            ExecutionPhase::Waiting => {
                self.phase = ExecutionPhase::Running;
                self.started_at = Some(Timestamp::now());
                Ok(())
            }
            ExecutionPhase::Running => Err(StateError::InvalidTransition {
                from: self.phase,
                to: ExecutionPhase::Running,
            }),
            ExecutionPhase::Finished => Err(StateError::AlreadyFinished {
                result: self.result.unwrap_or(ExecutionResult::Failure),
            }),
        }
    }

    /// Moves the execution to its terminal phase.
    ///
    /// `failure_kind` and `error_message` are only meaningful for
    /// `Failure`; passing them with `Success` is rejected.
    pub fn finish(
        &mut self,
        result: ExecutionResult,
        failure_kind: Option<FailureKind>,
        error_message: Option<String>,
    ) -> StateResult<()> {
        if self.phase == ExecutionPhase::Finished {
            return Err(StateError::AlreadyFinished {
                result: self.result.unwrap_or(result),
            });
        }
        if result == ExecutionResult::Success && failure_kind.is_some() {
            return Err(StateError::SuccessWithFailureKind);
        }
        self.phase = ExecutionPhase::Finished;
        self.result = Some(result);
        self.failure_kind = failure_kind;
        self.error_message = error_message;
        self.finished_at = Some(Timestamp::now());
        Ok(())
    }

    /// Returns whether the record is terminal.
    pub fn is_finished(&self) -> bool {
        self.phase == ExecutionPhase::Finished
    }

    /// Checks the record against [`validate_state`].
    pub fn is_valid(&self) -> bool {
        validate_state(self.phase, self.result, self.failure_kind)
    }
}

/// One row per (execution, node) pair.
///
/// Created lazily as the orchestrator reaches each node, immutable once
/// `phase == Finished`. Nodes the orchestrator never visits (downstream
/// of a failure or of an untaken conditional branch) gain no row at all.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeExecutionState {
    /// The execution this row belongs to.
    pub execution_id: ExecutionId,
    /// The node this row records.
    pub node_id: NodeId,
    /// Current lifecycle phase.
    pub phase: ExecutionPhase,
    /// Terminal outcome, set exactly when `phase == Finished`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<ExecutionResult>,
    /// The node's resolved output, stored for downstream inspection.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub envelope: Option<NodeOutputEnvelope>,
    /// When the orchestrator reached the node.
    pub started_at: Timestamp,
    /// When the node reached its terminal phase.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<Timestamp>,
}

impl NodeExecutionState {
    /// Creates a running node record; rows are created at visit time, so
    /// they never exist in `Waiting`.
    pub fn begin(execution_id: ExecutionId, node_id: NodeId) -> Self {
        Self {
            execution_id,
            node_id,
            phase: ExecutionPhase::Running,
            result: None,
            envelope: None,
            started_at: Timestamp::now(),
            finished_at: None,
        }
    }

    /// Finishes the node with its produced envelope.
    ///
    /// The terminal result is read off the envelope's meta block, keeping
    /// the row and the envelope in lockstep.
    pub fn finish(&mut self, envelope: NodeOutputEnvelope) -> StateResult<()> {
        if self.phase == ExecutionPhase::Finished {
            return Err(StateError::AlreadyFinished {
                result: self.result.unwrap_or(ExecutionResult::Failure),
            });
        }
        let result = envelope.meta.result.ok_or(StateError::InvalidTransition {
            from: self.phase,
            to: ExecutionPhase::Finished,
        })?;
        if result == ExecutionResult::Failure && envelope.meta.error_message.is_none() {
            return Err(StateError::FailureWithoutMessage);
        }
        self.phase = ExecutionPhase::Finished;
        self.result = Some(result);
        self.envelope = Some(envelope);
        self.finished_at = Some(Timestamp::now());
        Ok(())
    }

    /// Returns whether the record is terminal.
    pub fn is_finished(&self) -> bool {
        self.phase == ExecutionPhase::Finished
    }

    /// Checks the record against [`validate_state`], plus the node-level
    /// requirement that a finished row carries a well-formed envelope.
    pub fn is_valid(&self) -> bool {
        if !validate_state(self.phase, self.result, None) {
            return false;
        }
        match self.phase {
            ExecutionPhase::Finished => self
                .envelope
                .as_ref()
                .is_some_and(|e| e.is_valid() && e.meta.result == self.result),
            _ => self.envelope.is_none(),
        }
    }
}
