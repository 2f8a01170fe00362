//! The orchestrator.
//!
//! Drives a compiled graph to completion: nodes are visited in the
//! compiler's topological order, each visit resolves inputs, runs the
//! matching executor, persists the resulting state transition together
//! with its checkpoint, and publishes a lifecycle event. Cancellation is
//! cooperative and checked between node visits only; the in-flight node
//! always finishes and keeps its row.

use std::collections::HashSet;
use std::sync::Arc;

use jiff::Timestamp;
use tokio::sync::Semaphore;
use weft_core::{
    ExecutionPhase, ExecutionResult, FailureKind, NodeExecutionState, NodeId, WorkflowExecution,
};
use weft_store::{ExecutionStore, StoreError};

use super::config::EngineConfig;
use super::context::ExecutionContext;
use crate::TRACING_TARGET;
use crate::compile::ExecutableGraph;
use crate::error::{WorkflowError, WorkflowResult};
use crate::event::{EventSink, ExecutionEvent};
use crate::exec::{CompiledNode, NodeContext};

/// The workflow execution engine.
///
/// One logical worker drives each execution's node sequence; independent
/// executions proceed in parallel up to `max_concurrent_runs`. The only
/// shared mutable state between runs is the persisted records, each
/// written exclusively by the run that owns them.
pub struct Engine {
    config: EngineConfig,
    semaphore: Arc<Semaphore>,
}

impl Engine {
    /// Creates a new engine with the given configuration.
    pub fn new(config: EngineConfig) -> Self {
        let semaphore = Arc::new(Semaphore::new(config.max_concurrent_runs));

        tracing::info!(
            target: TRACING_TARGET,
            max_concurrent_runs = config.max_concurrent_runs,
            node_timeout_secs = config.node_timeout.as_secs(),
            "Workflow engine initialized"
        );

        Self { config, semaphore }
    }

    /// Creates a new engine with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(EngineConfig::default())
    }

    /// Returns the engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Returns the number of available execution slots.
    pub fn available_slots(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Drives an execution to its terminal phase.
    ///
    /// Every state transition is persisted before the next node runs; a
    /// caller polling status never observes a half-written state. Store
    /// failures are engine-fatal: the run is marked failed with a
    /// system-level failure kind if the store will still take the write,
    /// and the error surfaces either way.
    pub async fn run(
        &self,
        graph: &ExecutableGraph,
        execution: &mut WorkflowExecution,
        ctx: &mut ExecutionContext,
        store: &dyn ExecutionStore,
        events: &dyn EventSink,
    ) -> WorkflowResult<()> {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|e| WorkflowError::Internal(format!("semaphore closed: {e}")))?;

        if execution.phase == ExecutionPhase::Waiting {
            execution.begin()?;
            if let Err(error) = store.update_execution(execution.clone()).await {
                return Err(self.fail_engine(execution, store, events, error).await);
            }
            events.publish(ExecutionEvent::ExecutionStarted {
                execution_id: execution.id,
                workflow_id: execution.workflow_id,
                at: Timestamp::now(),
            });
        }

        tracing::debug!(
            target: TRACING_TARGET,
            execution_id = %execution.id,
            node_count = graph.node_count(),
            resumed_nodes = ctx.checkpoint().len(),
            "Starting graph traversal"
        );

        let mut halted: HashSet<NodeId> = HashSet::new();
        let mut first_failure: Option<(NodeId, FailureKind, String)> = None;
        let mut cancelled = false;

        for node_id in graph.topological_order() {
            if ctx.cancellation().is_cancelled() {
                cancelled = true;
                break;
            }
            if ctx.is_completed(node_id) || halted.contains(node_id) {
                continue;
            }
            if !visitable(graph, ctx, node_id) {
                continue;
            }
            let Some(node) = graph.node(node_id) else {
                continue;
            };

            let mut state = NodeExecutionState::begin(ctx.execution_id(), node_id.clone());
            if let Err(error) = store.upsert_node_state(state.clone()).await {
                return Err(self.fail_engine(execution, store, events, error).await);
            }
            events.publish(ExecutionEvent::NodeStateChanged {
                execution_id: execution.id,
                node_id: node_id.clone(),
                phase: ExecutionPhase::Running,
                result: None,
                at: Timestamp::now(),
            });

            let outcome = node
                .execute(NodeContext {
                    node_id,
                    envelopes: ctx.envelopes(),
                    trigger_payload: ctx.trigger_payload(),
                    timeout: self.config.node_timeout,
                })
                .await;

            state.finish(outcome.envelope.clone())?;
            ctx.record(node_id.clone(), outcome.envelope.clone());
            if let Err(error) = store
                .record_node_transition(state.clone(), ctx.checkpoint().clone())
                .await
            {
                return Err(self.fail_engine(execution, store, events, error).await);
            }
            events.publish(ExecutionEvent::NodeStateChanged {
                execution_id: execution.id,
                node_id: node_id.clone(),
                phase: ExecutionPhase::Finished,
                result: state.result,
                at: Timestamp::now(),
            });

            if let Some(kind) = outcome.failure_kind {
                let message = outcome
                    .envelope
                    .meta
                    .error_message
                    .clone()
                    .unwrap_or_else(|| "node failed".to_owned());
                tracing::warn!(
                    target: TRACING_TARGET,
                    execution_id = %execution.id,
                    node_id = %node_id,
                    failure_kind = %kind,
                    message = message,
                    "Node failed, halting downstream"
                );
                halted.extend(graph.descendants(node_id));
                if first_failure.is_none() {
                    first_failure = Some((node_id.clone(), kind, message));
                }
            }
        }

        let (result, failure_kind, message) = if cancelled {
            tracing::debug!(
                target: TRACING_TARGET,
                execution_id = %execution.id,
                "Cancellation observed between node visits"
            );
            (ExecutionResult::Cancelled, None, None)
        } else if let Some((node_id, kind, message)) = first_failure {
            (
                ExecutionResult::Failure,
                Some(kind),
                Some(format!("node `{node_id}` failed: {message}")),
            )
        } else {
            (ExecutionResult::Success, None, None)
        };

        execution.finish(result, failure_kind, message)?;
        if let Err(error) = store.update_execution(execution.clone()).await {
            return Err(self.fail_engine(execution, store, events, error).await);
        }
        events.publish(ExecutionEvent::ExecutionFinished {
            execution_id: execution.id,
            result,
            at: Timestamp::now(),
        });

        // The checkpoint is recovery state; the audit trail lives in the
        // node rows, so a leftover here is only noise.
        if let Err(error) = store.delete_checkpoint(execution.id).await {
            tracing::warn!(
                target: TRACING_TARGET,
                execution_id = %execution.id,
                %error,
                "Failed to delete checkpoint for finished execution"
            );
        }

        tracing::debug!(
            target: TRACING_TARGET,
            execution_id = %execution.id,
            result = %result,
            "Execution finished"
        );

        Ok(())
    }

    /// Best-effort terminal write for an engine-fatal store failure.
    async fn fail_engine(
        &self,
        execution: &mut WorkflowExecution,
        store: &dyn ExecutionStore,
        events: &dyn EventSink,
        error: StoreError,
    ) -> WorkflowError {
        tracing::error!(
            target: TRACING_TARGET,
            execution_id = %execution.id,
            %error,
            "Persistence failed, execution cannot continue"
        );
        if execution
            .finish(
                ExecutionResult::Failure,
                Some(FailureKind::System),
                Some(error.to_string()),
            )
            .is_ok()
            && store.update_execution(execution.clone()).await.is_ok()
        {
            events.publish(ExecutionEvent::ExecutionFinished {
                execution_id: execution.id,
                result: ExecutionResult::Failure,
                at: Timestamp::now(),
            });
        }
        WorkflowError::Store(error)
    }
}

/// Whether the orchestrator should visit this node now.
///
/// Entrypoints are always visitable; everything else needs at least one
/// active incoming edge. An edge is active when its source finished
/// successfully and, for conditional sources, its label matches the
/// branch the condition took.
fn visitable(graph: &ExecutableGraph, ctx: &ExecutionContext, node_id: &NodeId) -> bool {
    if graph.is_entrypoint(node_id) {
        return true;
    }
    graph
        .edges_into(node_id)
        .iter()
        .any(|(source, edge)| {
            let Some(envelope) = ctx.envelopes().get(*source) else {
                return false;
            };
            if !envelope.is_success() {
                return false;
            }
            match graph.node(source) {
                Some(CompiledNode::Conditional(_)) => {
                    let branch = envelope.value.as_bool().unwrap_or(false);
                    if edge.branch() { branch } else { !branch }
                }
                _ => true,
            }
        })
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.config)
            .field("available_slots", &self.available_slots())
            .finish()
    }
}
