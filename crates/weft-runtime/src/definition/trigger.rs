//! Trigger node configuration.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use weft_core::TriggerKind;

/// Configuration of a trigger node.
///
/// Manual triggers are pure pass-throughs that seed the entrypoint;
/// schedule and webhook triggers carry the collaborator-supplied payload
/// as their value. Scheduling itself and webhook ingestion live outside
/// the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerDef {
    /// What starts the workflow through this node.
    pub trigger: TriggerKind,
    /// Optional payload filter applied by the ingestion collaborator.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<Value>,
    /// Trigger-type-specific parameters (cron expression, webhook path).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl TriggerDef {
    /// Creates a manual trigger configuration.
    pub fn manual() -> Self {
        Self {
            trigger: TriggerKind::Manual,
            filter: None,
            params: None,
        }
    }

    /// Creates a trigger configuration of the given kind.
    pub fn new(trigger: TriggerKind) -> Self {
        Self {
            trigger,
            filter: None,
            params: None,
        }
    }
}
