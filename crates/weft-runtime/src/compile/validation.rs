//! Validation error types.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, IntoStaticStr};
use thiserror::Error;
use weft_core::NodeId;

/// Machine-readable validation error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(AsRefStr, Display, IntoStaticStr)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidationCode {
    /// A node id appears more than once in the canvas.
    DuplicateNodeId,
    /// An edge references a node that does not exist.
    InvalidEdgeTarget,
    /// A tool node names a tool absent from the registry.
    InvalidToolName,
    /// An agent node names an agent the runner does not know.
    InvalidAgentId,
    /// A node neither reachable from an entrypoint nor reaching an exit.
    OrphanedNode,
    /// The canvas has no nodes.
    EmptyCanvas,
    /// No node qualifies as an entrypoint.
    NoEntrypoint,
    /// The induced graph contains a cycle.
    CycleDetected,
}

/// Whether a validation finding rejects the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// The canvas cannot be compiled.
    Fatal,
    /// Reported but does not reject the canvas.
    Warning,
}

/// One validation finding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationError {
    /// Machine-readable code.
    pub code: ValidationCode,
    /// Whether this finding rejects the canvas.
    pub severity: Severity,
    /// The node the finding is attributed to, when one exists.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_id: Option<NodeId>,
    /// Human-readable description.
    pub message: String,
}

impl ValidationError {
    /// Creates a fatal finding.
    pub fn fatal(code: ValidationCode, message: impl Into<String>) -> Self {
        Self {
            code,
            severity: Severity::Fatal,
            node_id: None,
            message: message.into(),
        }
    }

    /// Creates a warning finding.
    pub fn warning(code: ValidationCode, message: impl Into<String>) -> Self {
        Self {
            code,
            severity: Severity::Warning,
            node_id: None,
            message: message.into(),
        }
    }

    /// Attributes the finding to a node.
    pub fn with_node(mut self, node_id: impl Into<NodeId>) -> Self {
        self.node_id = Some(node_id.into());
        self
    }

    /// Returns whether the finding is fatal.
    pub fn is_fatal(&self) -> bool {
        self.severity == Severity::Fatal
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.node_id {
            Some(node_id) => write!(f, "{} ({node_id}): {}", self.code, self.message),
            None => write!(f, "{}: {}", self.code, self.message),
        }
    }
}

/// The full set of findings for a rejected canvas.
///
/// Validation collects every defect in one pass so the caller can report
/// them all at once; warnings discovered alongside fatal findings ride
/// along here too.
#[derive(Debug, Clone, PartialEq, Error)]
pub struct CompileRejection {
    /// All findings, fatal and warning, in discovery order.
    pub errors: Vec<ValidationError>,
}

impl CompileRejection {
    /// Returns only the fatal findings.
    pub fn fatal(&self) -> impl Iterator<Item = &ValidationError> {
        self.errors.iter().filter(|e| e.is_fatal())
    }

    /// Returns whether a finding with the given code is present.
    pub fn has_code(&self, code: ValidationCode) -> bool {
        self.errors.iter().any(|e| e.code == code)
    }
}

impl std::fmt::Display for CompileRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let fatal = self.fatal().count();
        write!(f, "canvas validation failed with {fatal} error(s)")?;
        for error in &self.errors {
            write!(f, "\n  {error}")?;
        }
        Ok(())
    }
}
