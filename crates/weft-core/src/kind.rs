//! Node and trigger kind tags.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, IntoStaticStr};

/// The kind of a workflow node.
///
/// This is the closed set of node categories the engine knows how to
/// execute. Kind-specific configuration lives in the canvas definition
/// types; this tag is what execution records and envelopes carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(AsRefStr, Display, IntoStaticStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum NodeKind {
    /// Entry point that seeds the run with a payload.
    Trigger,
    /// Invocation of a registered tool.
    Tool,
    /// Delegated agent turn.
    Agent,
    /// Conditional branch over a restricted expression.
    Conditional,
}

/// How a workflow execution was started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(AsRefStr, Display, IntoStaticStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TriggerKind {
    /// Started by an explicit user action.
    Manual,
    /// Started by the external scheduler.
    Schedule,
    /// Started by an inbound webhook delivery.
    Webhook,
}
