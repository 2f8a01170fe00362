//! Collaborator contracts.
//!
//! The engine never owns its side effects: tool invocation and delegated
//! agent turns are behind these traits, injected at service construction.
//! The in-process implementations here double as test harnesses and as
//! building blocks for embedders.

mod agent;
mod tool;

pub use agent::{AgentRunError, AgentRunner, ScriptedAgentRunner};
pub use tool::{StaticToolRegistry, ToolInvokeError, ToolRegistry};
