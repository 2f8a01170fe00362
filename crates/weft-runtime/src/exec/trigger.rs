//! Trigger node executor.

use serde_json::Value;
use weft_core::{NodeKind, NodeOutputEnvelope, TriggerKind};

use super::{ExecOutcome, NodeContext};

/// Executes trigger nodes.
///
/// For manual runs this is a no-op pass-through that exists purely to
/// seed the entrypoint; for scheduled/webhook runs the collaborator's
/// payload arrives through the context and becomes the envelope value.
#[derive(Debug, Clone)]
pub struct TriggerExecutor {
    kind: TriggerKind,
}

impl TriggerExecutor {
    /// Creates an executor for the given trigger kind.
    pub fn new(kind: TriggerKind) -> Self {
        Self { kind }
    }

    /// Returns the trigger kind.
    pub fn trigger_kind(&self) -> TriggerKind {
        self.kind
    }

    /// Seeds the entrypoint with the run's payload.
    pub fn execute(&self, ctx: NodeContext<'_>) -> ExecOutcome {
        let value = ctx.trigger_payload.cloned().unwrap_or(Value::Null);
        ExecOutcome::success(NodeOutputEnvelope::success(NodeKind::Trigger, value))
    }
}
