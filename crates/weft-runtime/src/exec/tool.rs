//! Tool node executor.

use std::sync::Arc;

use serde_json::{Map, Value};
use weft_core::{FailureKind, NodeKind, NodeOutputEnvelope};

use super::{ExecOutcome, NodeContext};
use crate::TRACING_TARGET;
use crate::provider::ToolRegistry;
use crate::value::VariableResolver;

/// Executes tool nodes.
///
/// Static parameters are resolved through the variable resolver (whole
/// references keep their type, mixed strings interpolate), the tool is
/// invoked through the registry under the node deadline, and the raw
/// result or raised error is wrapped into an envelope.
pub struct ToolExecutor {
    tool: String,
    static_params: Map<String, Value>,
    registry: Arc<dyn ToolRegistry>,
}

impl ToolExecutor {
    /// Creates an executor bound to a registry.
    pub fn new(
        tool: impl Into<String>,
        static_params: Map<String, Value>,
        registry: Arc<dyn ToolRegistry>,
    ) -> Self {
        Self {
            tool: tool.into(),
            static_params,
            registry,
        }
    }

    /// Returns the tool name.
    pub fn tool_name(&self) -> &str {
        &self.tool
    }

    /// Resolves parameters, invokes the tool, and wraps the result.
    pub async fn execute(&self, ctx: NodeContext<'_>) -> ExecOutcome {
        let resolver = VariableResolver::new(ctx.envelopes);
        let params = match resolver.resolve_json(&Value::Object(self.static_params.clone())) {
            Ok(params) => params,
            Err(error) => {
                return ExecOutcome::failure(
                    NodeOutputEnvelope::failure(NodeKind::Tool, Value::Null, error.to_string()),
                    FailureKind::ResolutionFailed,
                );
            }
        };

        let invocation = self.registry.invoke(&self.tool, params);
        match tokio::time::timeout(ctx.timeout, invocation).await {
            Err(_elapsed) => ExecOutcome::failure(
                NodeOutputEnvelope::failure(
                    NodeKind::Tool,
                    Value::Null,
                    format!(
                        "tool `{}` timed out after {}s",
                        self.tool,
                        ctx.timeout.as_secs()
                    ),
                ),
                FailureKind::Timeout,
            ),
            Ok(Err(error)) => ExecOutcome::failure(
                NodeOutputEnvelope::failure(NodeKind::Tool, Value::Null, error.to_string()),
                FailureKind::NodeFailed,
            ),
            Ok(Ok(value)) => match recognized_failure(&value) {
                // The call returned normally but the payload is the
                // well-known error-envelope shape.
                Some((error_type, user_message)) => {
                    tracing::debug!(
                        target: TRACING_TARGET,
                        node_id = %ctx.node_id,
                        tool = self.tool,
                        error_type = error_type,
                        "Tool returned a failure envelope"
                    );
                    ExecOutcome::failure(
                        NodeOutputEnvelope::failure(
                            NodeKind::Tool,
                            value,
                            format!("{error_type}: {user_message}"),
                        ),
                        FailureKind::NodeFailed,
                    )
                }
                None => ExecOutcome::success(NodeOutputEnvelope::success(NodeKind::Tool, value)),
            },
        }
    }
}

impl std::fmt::Debug for ToolExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolExecutor")
            .field("tool", &self.tool)
            .field("static_params", &self.static_params)
            .finish()
    }
}

/// Recognizes the `{ok: false, error_type, user_message}` failure shape.
///
/// The shape arrives either as a structured value or as a string in one
/// of two literal-syntax encodings: JSON, or the single-quoted
/// Python-style rendering some tools echo back verbatim.
fn recognized_failure(value: &Value) -> Option<(String, String)> {
    let candidate = match value {
        Value::Object(_) => value.clone(),
        Value::String(s) => parse_literal(s)?,
        _ => return None,
    };
    let map = candidate.as_object()?;
    if map.get("ok") != Some(&Value::Bool(false)) {
        return None;
    }
    let error_type = map
        .get("error_type")
        .and_then(Value::as_str)
        .unwrap_or("unknown_error")
        .to_owned();
    let user_message = map
        .get("user_message")
        .and_then(Value::as_str)
        .unwrap_or("tool reported failure")
        .to_owned();
    Some((error_type, user_message))
}

fn parse_literal(s: &str) -> Option<Value> {
    let trimmed = s.trim();
    if !trimmed.starts_with('{') {
        return None;
    }
    if let Ok(value) = serde_json::from_str(trimmed) {
        return Some(value);
    }
    serde_json::from_str(&normalize_python_literal(trimmed)).ok()
}

/// Rewrites a Python dict literal into JSON: single-quoted strings become
/// double-quoted, and the bare constants `True`/`False`/`None` become
/// their JSON spellings. Content inside strings is preserved.
fn normalize_python_literal(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    let mut in_string: Option<char> = None;

    while let Some(c) = chars.next() {
        match in_string {
            Some(quote) => match c {
                '\\' => {
                    match chars.next() {
                        // Escaped quote of the active kind loses its
                        // escape when the quote style changes.
                        Some('\'') if quote == '\'' => out.push('\''),
                        Some(escaped) => {
                            out.push('\\');
                            out.push(escaped);
                        }
                        None => out.push('\\'),
                    }
                }
                '"' if quote == '\'' => out.push_str("\\\""),
                c if c == quote => {
                    out.push('"');
                    in_string = None;
                }
                c => out.push(c),
            },
            None => match c {
                '\'' | '"' => {
                    out.push('"');
                    in_string = Some(c);
                }
                c if c.is_ascii_alphabetic() => {
                    let mut word = String::from(c);
                    while let Some(&next) = chars.peek() {
                        if !next.is_ascii_alphabetic() {
                            break;
                        }
                        word.push(next);
                        chars.next();
                    }
                    match word.as_str() {
                        "True" => out.push_str("true"),
                        "False" => out.push_str("false"),
                        "None" => out.push_str("null"),
                        other => out.push_str(other),
                    }
                }
                c => out.push(c),
            },
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;
    use weft_core::NodeId;

    use super::*;
    use crate::provider::{StaticToolRegistry, ToolInvokeError};
    use crate::value::EnvelopeMap;

    fn context<'a>(node_id: &'a NodeId, envelopes: &'a EnvelopeMap) -> NodeContext<'a> {
        NodeContext {
            node_id,
            envelopes,
            trigger_payload: None,
            timeout: Duration::from_millis(200),
        }
    }

    fn registry() -> Arc<dyn ToolRegistry> {
        Arc::new(
            StaticToolRegistry::new()
                .register("echo", |params: Value| async move { Ok(params) })
                .register("raise", |_params| async {
                    Err(ToolInvokeError::Failed {
                        tool: "raise".into(),
                        message: "exploded".into(),
                    })
                })
                .register("slow", |_params| async {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    Ok(json!(null))
                }),
        )
    }

    #[tokio::test]
    async fn test_params_resolve_before_invocation() {
        let mut envelopes = EnvelopeMap::new();
        envelopes.insert(
            NodeId::from("prev"),
            NodeOutputEnvelope::success(NodeKind::Tool, json!({"count": 3})),
        );
        let node_id = NodeId::from("echo1");

        let mut params = Map::new();
        params.insert("n".into(), json!("${prev.count}"));
        params.insert("note".into(), json!("count=${prev.count}"));

        let executor = ToolExecutor::new("echo", params, registry());
        let outcome = executor.execute(context(&node_id, &envelopes)).await;

        assert!(!outcome.is_failure());
        assert_eq!(outcome.envelope.value, json!({"n": 3, "note": "count=3"}));
    }

    #[tokio::test]
    async fn test_resolution_error_fails_the_node() {
        let envelopes = EnvelopeMap::new();
        let node_id = NodeId::from("echo1");
        let mut params = Map::new();
        params.insert("n".into(), json!("${ghost.value}"));

        let executor = ToolExecutor::new("echo", params, registry());
        let outcome = executor.execute(context(&node_id, &envelopes)).await;

        assert_eq!(outcome.failure_kind, Some(FailureKind::ResolutionFailed));
        assert!(outcome.envelope.is_failure());
    }

    #[tokio::test]
    async fn test_raised_error_becomes_failure_envelope() {
        let envelopes = EnvelopeMap::new();
        let node_id = NodeId::from("r1");
        let executor = ToolExecutor::new("raise", Map::new(), registry());
        let outcome = executor.execute(context(&node_id, &envelopes)).await;

        assert_eq!(outcome.failure_kind, Some(FailureKind::NodeFailed));
        assert!(
            outcome
                .envelope
                .meta
                .error_message
                .as_deref()
                .unwrap_or_default()
                .contains("exploded")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_tool_times_out() {
        let envelopes = EnvelopeMap::new();
        let node_id = NodeId::from("s1");
        let executor = ToolExecutor::new("slow", Map::new(), registry());
        let outcome = executor.execute(context(&node_id, &envelopes)).await;

        assert_eq!(outcome.failure_kind, Some(FailureKind::Timeout));
    }

    #[tokio::test]
    async fn test_structured_failure_envelope_is_recognized() {
        let envelopes = EnvelopeMap::new();
        let node_id = NodeId::from("e1");
        let failure = json!({"ok": false, "error_type": "rate_limited", "user_message": "slow down"});
        let mut params = Map::new();
        params.insert("ok".into(), failure["ok"].clone());
        params.insert("error_type".into(), failure["error_type"].clone());
        params.insert("user_message".into(), failure["user_message"].clone());

        let executor = ToolExecutor::new("echo", params, registry());
        let outcome = executor.execute(context(&node_id, &envelopes)).await;

        assert_eq!(outcome.failure_kind, Some(FailureKind::NodeFailed));
        assert_eq!(
            outcome.envelope.meta.error_message.as_deref(),
            Some("rate_limited: slow down")
        );
        // The raw payload stays inspectable on the envelope.
        assert_eq!(outcome.envelope.value, failure);
    }

    #[test]
    fn test_both_literal_encodings_are_recognized() {
        let json_encoding =
            json!("{\"ok\": false, \"error_type\": \"boom\", \"user_message\": \"nope\"}");
        let python_encoding =
            json!("{'ok': False, 'error_type': 'boom', 'user_message': 'nope'}");

        for encoded in [json_encoding, python_encoding] {
            let (error_type, user_message) =
                recognized_failure(&encoded).expect("shape should be recognized");
            assert_eq!(error_type, "boom");
            assert_eq!(user_message, "nope");
        }
    }

    #[test]
    fn test_ok_true_is_not_a_failure() {
        assert!(recognized_failure(&json!({"ok": true, "data": 1})).is_none());
        assert!(recognized_failure(&json!("{'ok': True}")).is_none());
        assert!(recognized_failure(&json!("plain text result")).is_none());
    }

    #[test]
    fn test_python_literal_normalization_preserves_content() {
        let normalized =
            normalize_python_literal("{'msg': 'it\\'s \"fine\"', 'flag': True, 'gap': None}");
        let value: Value = serde_json::from_str(&normalized).unwrap();
        assert_eq!(value["msg"], "it's \"fine\"");
        assert_eq!(value["flag"], true);
        assert_eq!(value["gap"], Value::Null);
    }
}
