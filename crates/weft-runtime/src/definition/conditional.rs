//! Conditional node configuration.

use serde::{Deserialize, Serialize};

/// Configuration of a conditional node.
///
/// The expression language is deliberately small: literals, `${...}`
/// references, arithmetic, comparisons, and boolean connectives. No tool
/// calls, no variable mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionalDef {
    /// The condition to evaluate. Legacy documents call this `expr`.
    #[serde(alias = "expr")]
    pub expression: String,
}

impl ConditionalDef {
    /// Creates a conditional configuration.
    pub fn new(expression: impl Into<String>) -> Self {
        Self {
            expression: expression.into(),
        }
    }
}
