//! The node output envelope contract.
//!
//! Every node produces the same output shape: a value plus a meta block
//! describing where the value came from and how the node ended. Downstream
//! variable resolution and the orchestrator's continue/halt decision both
//! depend on the meta invariants holding exactly.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::kind::NodeKind;
use crate::state::{ExecutionPhase, ExecutionResult, validate_state};

/// Metadata accompanying every node output value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvelopeMeta {
    /// Kind of the node that produced the value.
    pub node_kind: NodeKind,
    /// Lifecycle phase of the node at envelope creation.
    pub phase: ExecutionPhase,
    /// Terminal result; `None` exactly while `phase == Running`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<ExecutionResult>,
    /// Present exactly when `result == Failure`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

/// The universal output shape produced by every node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeOutputEnvelope {
    /// The node's produced value.
    pub value: Value,
    /// Metadata about the producing node.
    pub meta: EnvelopeMeta,
}

impl NodeOutputEnvelope {
    /// Creates an in-flight envelope with no result yet.
    pub fn running(node_kind: NodeKind) -> Self {
        Self {
            value: Value::Null,
            meta: EnvelopeMeta {
                node_kind,
                phase: ExecutionPhase::Running,
                result: None,
                error_message: None,
            },
        }
    }

    /// Creates a successful envelope carrying `value`.
    pub fn success(node_kind: NodeKind, value: Value) -> Self {
        Self {
            value,
            meta: EnvelopeMeta {
                node_kind,
                phase: ExecutionPhase::Finished,
                result: Some(ExecutionResult::Success),
                error_message: None,
            },
        }
    }

    /// Creates a failed envelope; the raw value (if any) is preserved for
    /// inspection alongside the error message.
    pub fn failure(node_kind: NodeKind, value: Value, message: impl Into<String>) -> Self {
        Self {
            value,
            meta: EnvelopeMeta {
                node_kind,
                phase: ExecutionPhase::Finished,
                result: Some(ExecutionResult::Failure),
                error_message: Some(message.into()),
            },
        }
    }

    /// Returns whether the envelope finished successfully.
    pub fn is_success(&self) -> bool {
        self.meta.result == Some(ExecutionResult::Success)
    }

    /// Returns whether the envelope finished as a failure.
    pub fn is_failure(&self) -> bool {
        self.meta.result == Some(ExecutionResult::Failure)
    }

    /// Re-checks the meta invariants:
    /// `Running => result is None`; `Finished => result in {Success, Failure}`;
    /// `Failure => error_message present`.
    pub fn is_valid(&self) -> bool {
        if !validate_state(self.meta.phase, self.meta.result, None) {
            return false;
        }
        match self.meta.result {
            Some(ExecutionResult::Cancelled) => false,
            Some(ExecutionResult::Failure) => self.meta.error_message.is_some(),
            _ => true,
        }
    }

    /// Upgrades the superseded ad hoc output shape into an envelope.
    ///
    /// Older persisted rows stored either a bare value or an
    /// `{"output": ..., "status": "ok" | "error", "error": ...}` pair.
    pub fn from_legacy_value(node_kind: NodeKind, raw: Value) -> Self {
        if let Value::Object(map) = &raw {
            if let (Some(output), Some(Value::String(status))) =
                (map.get("output"), map.get("status"))
            {
                return match status.as_str() {
                    "ok" | "success" => Self::success(node_kind, output.clone()),
                    _ => {
                        let message = map
                            .get("error")
                            .and_then(Value::as_str)
                            .unwrap_or("unknown legacy error")
                            .to_owned();
                        Self::failure(node_kind, output.clone(), message)
                    }
                };
            }
        }
        Self::success(node_kind, raw)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_success_envelope_is_valid() {
        let env = NodeOutputEnvelope::success(NodeKind::Tool, json!({"n": 1}));
        assert!(env.is_valid());
        assert!(env.is_success());
        assert!(!env.is_failure());
    }

    #[test]
    fn test_failure_requires_message() {
        let env = NodeOutputEnvelope::failure(NodeKind::Agent, Value::Null, "boom");
        assert!(env.is_valid());

        let mut broken = env.clone();
        broken.meta.error_message = None;
        assert!(!broken.is_valid());
    }

    #[test]
    fn test_running_envelope_has_no_result() {
        let env = NodeOutputEnvelope::running(NodeKind::Trigger);
        assert!(env.is_valid());

        let mut broken = env;
        broken.meta.result = Some(ExecutionResult::Success);
        assert!(!broken.is_valid());
    }

    #[test]
    fn test_legacy_bare_value_upgrade() {
        let env = NodeOutputEnvelope::from_legacy_value(NodeKind::Tool, json!([1, 2, 3]));
        assert!(env.is_success());
        assert_eq!(env.value, json!([1, 2, 3]));
    }

    #[test]
    fn test_legacy_status_pair_upgrade() {
        let ok = NodeOutputEnvelope::from_legacy_value(
            NodeKind::Tool,
            json!({"output": {"rows": 2}, "status": "ok"}),
        );
        assert!(ok.is_success());
        assert_eq!(ok.value, json!({"rows": 2}));

        let failed = NodeOutputEnvelope::from_legacy_value(
            NodeKind::Tool,
            json!({"output": null, "status": "error", "error": "connection reset"}),
        );
        assert!(failed.is_failure());
        assert_eq!(
            failed.meta.error_message.as_deref(),
            Some("connection reset")
        );
    }

    #[test]
    fn test_envelope_serde_roundtrip() {
        let env = NodeOutputEnvelope::success(NodeKind::Conditional, json!(true));
        let json = serde_json::to_string(&env).unwrap();
        let back: NodeOutputEnvelope = serde_json::from_str(&json).unwrap();
        assert_eq!(env, back);
    }
}
