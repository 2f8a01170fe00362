//! Conditional node executor.

use serde_json::Value;
use weft_core::{FailureKind, NodeKind, NodeOutputEnvelope};

use super::{ExecOutcome, NodeContext};
use crate::expr::{self, ExprError};

/// Executes conditional nodes.
///
/// The node's result is `Success` regardless of which way the condition
/// evaluated; the boolean lands in the envelope value, where the
/// orchestrator reads it to select outgoing edges. Only a broken
/// expression (syntax, types, unresolvable reference) fails the node.
#[derive(Debug, Clone)]
pub struct ConditionalExecutor {
    expression: String,
}

impl ConditionalExecutor {
    /// Creates an executor for the given expression.
    pub fn new(expression: impl Into<String>) -> Self {
        Self {
            expression: expression.into(),
        }
    }

    /// Returns the configured expression.
    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// Evaluates the condition against prior envelopes.
    pub fn execute(&self, ctx: NodeContext<'_>) -> ExecOutcome {
        match expr::evaluate_condition(&self.expression, ctx.envelopes) {
            Ok(outcome) => ExecOutcome::success(NodeOutputEnvelope::success(
                NodeKind::Conditional,
                Value::Bool(outcome),
            )),
            Err(error) => {
                let kind = match &error {
                    ExprError::Resolve(_) => FailureKind::ResolutionFailed,
                    _ => FailureKind::NodeFailed,
                };
                ExecOutcome::failure(
                    NodeOutputEnvelope::failure(NodeKind::Conditional, Value::Null, error.to_string()),
                    kind,
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;
    use weft_core::NodeId;

    use super::*;
    use crate::value::EnvelopeMap;

    fn context<'a>(node_id: &'a NodeId, envelopes: &'a EnvelopeMap) -> NodeContext<'a> {
        NodeContext {
            node_id,
            envelopes,
            trigger_payload: None,
            timeout: Duration::from_secs(1),
        }
    }

    #[test]
    fn test_negative_outcome_is_still_success() {
        let mut envelopes = EnvelopeMap::new();
        envelopes.insert(
            NodeId::from("fetch"),
            NodeOutputEnvelope::success(NodeKind::Tool, json!({"status": 404})),
        );
        let node_id = NodeId::from("gate");

        let executor = ConditionalExecutor::new("${fetch.status} == 200");
        let outcome = executor.execute(context(&node_id, &envelopes));

        assert!(!outcome.is_failure());
        assert_eq!(outcome.envelope.value, Value::Bool(false));
    }

    #[test]
    fn test_unresolvable_reference_fails_with_resolution_kind() {
        let envelopes = EnvelopeMap::new();
        let node_id = NodeId::from("gate");
        let executor = ConditionalExecutor::new("${ghost.status} == 200");
        let outcome = executor.execute(context(&node_id, &envelopes));

        assert_eq!(outcome.failure_kind, Some(FailureKind::ResolutionFailed));
    }

    #[test]
    fn test_broken_expression_fails_the_node() {
        let envelopes = EnvelopeMap::new();
        let node_id = NodeId::from("gate");
        let executor = ConditionalExecutor::new("1 +");
        let outcome = executor.execute(context(&node_id, &envelopes));

        assert_eq!(outcome.failure_kind, Some(FailureKind::NodeFailed));
    }
}
