//! The workflow service facade.
//!
//! Ties the engine to its collaborators: persistence, the tool registry,
//! the agent runner, and the event sink. This is the surface the CRUD
//! layer and trigger sources talk to (`start`, `status`, `cancel`,
//! `resume`), while the engine itself stays free of process-level
//! concerns like spawning and token bookkeeping.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use weft_core::{
    ExecutionId, ExecutionPhase, ExecutionResult, FailureKind, TriggerKind, WorkflowExecution,
    WorkflowId,
};
use weft_store::{ExecutionCheckpoint, ExecutionStore};

use crate::TRACING_TARGET;
use crate::compile::{CompileRejection, ExecutableGraph, GraphCompiler};
use crate::definition::Canvas;
use crate::engine::{Engine, EngineConfig, ExecutionContext};
use crate::error::{WorkflowError, WorkflowResult};
use crate::event::{EventSink, ExecutionEvent};
use crate::provider::{AgentRunner, ToolRegistry};

/// What `status` returns: the last successfully persisted transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionStatus {
    /// Current lifecycle phase.
    pub phase: ExecutionPhase,
    /// Terminal outcome, once finished.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<ExecutionResult>,
    /// Failure classification, when failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_kind: Option<FailureKind>,
    /// Captured error, when failed or cancelled with a reason.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl From<&WorkflowExecution> for ExecutionStatus {
    fn from(execution: &WorkflowExecution) -> Self {
        Self {
            phase: execution.phase,
            result: execution.result,
            failure_kind: execution.failure_kind,
            error_message: execution.error_message.clone(),
        }
    }
}

struct RunHandle {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

/// The engine plus its injected collaborators.
pub struct WorkflowService {
    store: Arc<dyn ExecutionStore>,
    events: Arc<dyn EventSink>,
    engine: Arc<Engine>,
    compiler: GraphCompiler,
    running: Arc<Mutex<HashMap<ExecutionId, RunHandle>>>,
}

impl WorkflowService {
    /// Creates a service with the default engine configuration.
    pub fn new(
        store: Arc<dyn ExecutionStore>,
        tools: Arc<dyn ToolRegistry>,
        agents: Arc<dyn AgentRunner>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self::with_config(EngineConfig::default(), store, tools, agents, events)
    }

    /// Creates a service with a custom engine configuration.
    pub fn with_config(
        config: EngineConfig,
        store: Arc<dyn ExecutionStore>,
        tools: Arc<dyn ToolRegistry>,
        agents: Arc<dyn AgentRunner>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            store,
            events,
            engine: Arc::new(Engine::new(config)),
            compiler: GraphCompiler::new(tools, agents),
            running: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Returns the underlying engine.
    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// Compiles a canvas without running it.
    ///
    /// This is the validation surface the editor uses: every structural
    /// defect is reported at once, before any side effect.
    pub fn compile(&self, canvas: &Canvas) -> Result<ExecutableGraph, CompileRejection> {
        self.compiler.compile(canvas)
    }

    /// Stores a canvas document, replacing any previous version.
    pub async fn save_canvas(&self, canvas: &Canvas) -> WorkflowResult<()> {
        let document = serde_json::to_value(canvas)
            .map_err(weft_store::StoreError::Serialization)
            .map_err(WorkflowError::Store)?;
        self.store.put_canvas(canvas.id, document).await?;
        Ok(())
    }

    /// Starts a new execution of a stored workflow.
    ///
    /// The canvas is loaded and compiled first, so validation errors
    /// surface here before any record is created; the run is then
    /// driven on a background task and the new execution id returned.
    pub async fn start(
        &self,
        workflow_id: WorkflowId,
        trigger_kind: TriggerKind,
        payload: Option<Value>,
    ) -> WorkflowResult<ExecutionId> {
        let document = self.store.get_canvas(workflow_id).await?;
        let canvas = Canvas::from_json(workflow_id, document)?;
        let graph = self.compiler.compile(&canvas)?;

        let execution = WorkflowExecution::new(workflow_id, trigger_kind);
        let execution_id = execution.id;
        self.store.create_execution(execution.clone()).await?;

        let token = CancellationToken::new();
        let ctx = ExecutionContext::new(execution_id, workflow_id, payload, token.clone());

        tracing::info!(
            target: TRACING_TARGET,
            workflow_id = %workflow_id,
            execution_id = %execution_id,
            trigger_kind = %trigger_kind,
            "Starting execution"
        );

        self.spawn_run(graph, execution, ctx, token);
        Ok(execution_id)
    }

    /// Resumes an unfinished execution from its persisted checkpoint.
    pub async fn resume(&self, execution_id: ExecutionId) -> WorkflowResult<()> {
        let execution = self.store.get_execution(execution_id).await?;
        if execution.is_finished() {
            return Err(WorkflowError::Conflict(execution_id));
        }

        let document = self.store.get_canvas(execution.workflow_id).await?;
        let canvas = Canvas::from_json(execution.workflow_id, document)?;
        let graph = self.compiler.compile(&canvas)?;

        let checkpoint = self
            .store
            .load_checkpoint(execution_id)
            .await?
            .unwrap_or_else(|| ExecutionCheckpoint::new(execution_id, execution.workflow_id));

        tracing::info!(
            target: TRACING_TARGET,
            execution_id = %execution_id,
            completed_nodes = checkpoint.len(),
            "Resuming execution from checkpoint"
        );

        let token = CancellationToken::new();
        let ctx = ExecutionContext::from_checkpoint(checkpoint, token.clone());
        self.spawn_run(graph, execution, ctx, token);
        Ok(())
    }

    /// Returns the last persisted status of an execution.
    pub async fn status(&self, execution_id: ExecutionId) -> WorkflowResult<ExecutionStatus> {
        let execution = self.store.get_execution(execution_id).await?;
        Ok(ExecutionStatus::from(&execution))
    }

    /// Requests cooperative cancellation of an execution.
    ///
    /// The currently-running node is allowed to finish; the loop then
    /// stops and persists `finished/cancelled`. Cancelling an execution
    /// that is already finished is a conflict, not a silent success.
    pub async fn cancel(&self, execution_id: ExecutionId, reason: &str) -> WorkflowResult<()> {
        let execution = self.store.get_execution(execution_id).await?;
        if execution.is_finished() {
            return Err(WorkflowError::Conflict(execution_id));
        }

        tracing::info!(
            target: TRACING_TARGET,
            execution_id = %execution_id,
            reason = reason,
            "Cancellation requested"
        );

        if let Some(entry) = self.running_guard().get(&execution_id) {
            entry.token.cancel();
            return Ok(());
        }

        // Not driven by this process (e.g. found after a restart):
        // finalize directly from the persisted state.
        let mut execution = execution;
        execution.finish(ExecutionResult::Cancelled, None, Some(reason.to_owned()))?;
        self.store.update_execution(execution).await?;
        self.events.publish(ExecutionEvent::ExecutionFinished {
            execution_id,
            result: ExecutionResult::Cancelled,
            at: Timestamp::now(),
        });
        if let Err(error) = self.store.delete_checkpoint(execution_id).await {
            tracing::warn!(
                target: TRACING_TARGET,
                execution_id = %execution_id,
                %error,
                "Failed to delete checkpoint for cancelled execution"
            );
        }
        Ok(())
    }

    /// Waits for an execution driven by this process to settle, then
    /// returns its status.
    pub async fn wait(&self, execution_id: ExecutionId) -> WorkflowResult<ExecutionStatus> {
        let handle = self
            .running_guard()
            .remove(&execution_id)
            .map(|entry| entry.handle);
        if let Some(handle) = handle {
            if let Err(error) = handle.await {
                tracing::error!(
                    target: TRACING_TARGET,
                    execution_id = %execution_id,
                    %error,
                    "Execution task panicked"
                );
            }
        }
        self.status(execution_id).await
    }

    fn spawn_run(
        &self,
        graph: ExecutableGraph,
        mut execution: WorkflowExecution,
        mut ctx: ExecutionContext,
        token: CancellationToken,
    ) {
        let engine = Arc::clone(&self.engine);
        let store = Arc::clone(&self.store);
        let events = Arc::clone(&self.events);
        let execution_id = execution.id;

        let handle = tokio::spawn(async move {
            if let Err(error) = engine
                .run(&graph, &mut execution, &mut ctx, store.as_ref(), events.as_ref())
                .await
            {
                tracing::error!(
                    target: TRACING_TARGET,
                    execution_id = %execution_id,
                    %error,
                    "Execution ended with an engine error"
                );
            }
        });

        let mut running = self.running_guard();
        // Settled runs nobody waited on are purged here rather than from
        // inside the task, which would race this insert.
        running.retain(|_, entry| !entry.handle.is_finished());
        running.insert(execution_id, RunHandle { token, handle });
    }

    fn running_guard(&self) -> MutexGuard<'_, HashMap<ExecutionId, RunHandle>> {
        self.running.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for WorkflowService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkflowService")
            .field("engine", &self.engine)
            .finish()
    }
}
