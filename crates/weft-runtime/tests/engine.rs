//! End-to-end engine tests: compile, run, persist, notify.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};
use tokio::sync::Notify;
use weft_core::{
    ExecutionId, ExecutionPhase, ExecutionResult, FailureKind, NodeExecutionState, NodeId,
    NodeKind, NodeOutputEnvelope, TriggerKind, WorkflowExecution, WorkflowId,
};
use weft_runtime::definition::{Canvas, ConditionalDef, Edge, Node, ToolDef, TriggerDef};
use weft_runtime::event::{BroadcastSink, EventSink, ExecutionEvent, NoopSink};
use weft_runtime::provider::{ScriptedAgentRunner, StaticToolRegistry};
use weft_runtime::{WorkflowError, WorkflowService};
use weft_store::{ExecutionCheckpoint, ExecutionStore, MemoryStore, StoreError, StoreResult};

fn lookup_tools() -> StaticToolRegistry {
    StaticToolRegistry::new()
        .register("lookup", |_params: Value| async move {
            Ok(json!({"status": 200, "body": "found"}))
        })
        .register("broken", |_params| async {
            Ok(json!({"ok": false, "error_type": "upstream_down", "user_message": "try later"}))
        })
        .register("notify", |_params| async { Ok(json!("sent")) })
}

fn service_with(
    store: Arc<MemoryStore>,
    tools: StaticToolRegistry,
    events: Arc<dyn EventSink>,
) -> WorkflowService {
    WorkflowService::new(
        store,
        Arc::new(tools),
        Arc::new(ScriptedAgentRunner::new().reply("writer", "summarized")),
        events,
    )
}

/// trigger -> tool -> conditional, chained by two edges.
fn chain_canvas(tool: &str) -> Canvas {
    let mut canvas = Canvas::new("chain");
    canvas
        .push_node(Node::new("start", TriggerDef::manual()))
        .push_node(Node::new("fetch", ToolDef::new(tool)))
        .push_node(Node::new(
            "gate",
            ConditionalDef::new("${fetch.status} == 200"),
        ))
        .push_edge(Edge::new("start", "fetch"))
        .push_edge(Edge::new("fetch", "gate"));
    canvas
}

#[tokio::test]
async fn round_trip_produces_three_finished_rows() {
    let store = Arc::new(MemoryStore::new());
    let service = service_with(Arc::clone(&store), lookup_tools(), Arc::new(NoopSink));

    let canvas = chain_canvas("lookup");
    service.save_canvas(&canvas).await.unwrap();

    let execution_id = service
        .start(canvas.id, TriggerKind::Manual, Some(json!({"who": "tester"})))
        .await
        .unwrap();
    let status = service.wait(execution_id).await.unwrap();

    assert_eq!(status.phase, ExecutionPhase::Finished);
    assert_eq!(status.result, Some(ExecutionResult::Success));

    let rows = store.list_node_states(execution_id).await.unwrap();
    assert_eq!(rows.len(), 3);
    assert!(rows.iter().all(|r| r.phase == ExecutionPhase::Finished));

    // The conditional's envelope value is the boolean its expression
    // evaluated to, given the tool's output.
    let gate = rows.iter().find(|r| r.node_id.as_str() == "gate").unwrap();
    let envelope = gate.envelope.as_ref().unwrap();
    assert_eq!(envelope.value, json!(true));
    assert_eq!(envelope.meta.node_kind, NodeKind::Conditional);
}

#[tokio::test]
async fn failure_halts_downstream_and_leaves_no_third_row() {
    let store = Arc::new(MemoryStore::new());
    let service = service_with(Arc::clone(&store), lookup_tools(), Arc::new(NoopSink));

    let canvas = chain_canvas("broken");
    service.save_canvas(&canvas).await.unwrap();

    let execution_id = service
        .start(canvas.id, TriggerKind::Manual, None)
        .await
        .unwrap();
    let status = service.wait(execution_id).await.unwrap();

    assert_eq!(status.result, Some(ExecutionResult::Failure));
    assert_eq!(status.failure_kind, Some(FailureKind::NodeFailed));
    assert!(status.error_message.unwrap().contains("upstream_down"));

    let rows = store.list_node_states(execution_id).await.unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].node_id, NodeId::from("start"));
    assert_eq!(rows[0].result, Some(ExecutionResult::Success));
    assert_eq!(rows[1].node_id, NodeId::from("fetch"));
    assert_eq!(rows[1].result, Some(ExecutionResult::Failure));
}

#[tokio::test]
async fn cancel_after_finish_is_a_conflict() {
    let store = Arc::new(MemoryStore::new());
    let service = service_with(Arc::clone(&store), lookup_tools(), Arc::new(NoopSink));

    let mut canvas = Canvas::new("single");
    canvas.push_node(Node::new("start", TriggerDef::manual()));
    service.save_canvas(&canvas).await.unwrap();

    let execution_id = service
        .start(canvas.id, TriggerKind::Manual, None)
        .await
        .unwrap();
    let status = service.wait(execution_id).await.unwrap();
    assert_eq!(status.result, Some(ExecutionResult::Success));

    let err = service.cancel(execution_id, "too late").await.unwrap_err();
    assert!(matches!(err, WorkflowError::Conflict(id) if id == execution_id));

    // No second terminal transition was written.
    let status = service.status(execution_id).await.unwrap();
    assert_eq!(status.result, Some(ExecutionResult::Success));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn cancellation_lets_the_running_node_finish() {
    let gate = Arc::new(Notify::new());
    let release = Arc::clone(&gate);

    let tools = lookup_tools().register("block", move |_params: Value| {
        let gate = Arc::clone(&gate);
        async move {
            gate.notified().await;
            Ok(json!({"status": 200}))
        }
    });

    let store = Arc::new(MemoryStore::new());
    let service = service_with(Arc::clone(&store), tools, Arc::new(NoopSink));

    let mut canvas = Canvas::new("cancellable");
    canvas
        .push_node(Node::new("start", TriggerDef::manual()))
        .push_node(Node::new("slow", ToolDef::new("block")))
        .push_node(Node::new("after", ToolDef::new("notify")))
        .push_edge(Edge::new("start", "slow"))
        .push_edge(Edge::new("slow", "after"));
    service.save_canvas(&canvas).await.unwrap();

    let execution_id = service
        .start(canvas.id, TriggerKind::Manual, None)
        .await
        .unwrap();

    // Wait until the blocking node is in flight.
    loop {
        let rows = store.list_node_states(execution_id).await.unwrap();
        if rows.iter().any(|r| r.node_id.as_str() == "slow") {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    service.cancel(execution_id, "operator request").await.unwrap();
    release.notify_one();

    let status = service.wait(execution_id).await.unwrap();
    assert_eq!(status.result, Some(ExecutionResult::Cancelled));

    // The in-flight node finished and kept its row; the node after the
    // cancellation point was never visited.
    let rows = store.list_node_states(execution_id).await.unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[1].node_id, NodeId::from("slow"));
    assert_eq!(rows[1].result, Some(ExecutionResult::Success));
}

#[tokio::test]
async fn untaken_branch_is_not_visited_and_not_a_failure() {
    let store = Arc::new(MemoryStore::new());
    let service = service_with(Arc::clone(&store), lookup_tools(), Arc::new(NoopSink));

    let mut canvas = Canvas::new("branching");
    canvas
        .push_node(Node::new("start", TriggerDef::manual()))
        .push_node(Node::new("gate", ConditionalDef::new("${start.value} == 1")))
        .push_node(Node::new("when_true", ToolDef::new("notify")))
        .push_node(Node::new("when_false", ToolDef::new("notify")))
        .push_edge(Edge::new("start", "gate"))
        .push_edge(Edge::labeled("gate", "when_true", "true"))
        .push_edge(Edge::labeled("gate", "when_false", "false"));
    service.save_canvas(&canvas).await.unwrap();

    let execution_id = service
        .start(canvas.id, TriggerKind::Manual, Some(json!(2)))
        .await
        .unwrap();
    let status = service.wait(execution_id).await.unwrap();

    // The negative branch is not a failure.
    assert_eq!(status.result, Some(ExecutionResult::Success));

    let rows = store.list_node_states(execution_id).await.unwrap();
    let visited: Vec<_> = rows.iter().map(|r| r.node_id.as_str()).collect();
    assert_eq!(visited, ["start", "gate", "when_false"]);
}

#[tokio::test]
async fn resume_continues_from_checkpoint_without_replaying() {
    let invocations = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&invocations);
    let tools = lookup_tools().register("counted", move |_params: Value| {
        let counter = Arc::clone(&counter);
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(json!({"status": 200}))
        }
    });

    let store = Arc::new(MemoryStore::new());
    let service = service_with(Arc::clone(&store), tools, Arc::new(NoopSink));

    let mut canvas = Canvas::new("resumable");
    canvas
        .push_node(Node::new("start", TriggerDef::manual()))
        .push_node(Node::new("fetch", ToolDef::new("counted")))
        .push_node(Node::new(
            "gate",
            ConditionalDef::new("${fetch.status} == 200"),
        ))
        .push_edge(Edge::new("start", "fetch"))
        .push_edge(Edge::new("fetch", "gate"));
    service.save_canvas(&canvas).await.unwrap();

    // Simulate a run that died after `fetch`: a running execution row,
    // two finished node rows, and a checkpoint carrying both envelopes.
    let mut execution = WorkflowExecution::new(canvas.id, TriggerKind::Manual);
    execution.begin().unwrap();
    let execution_id = execution.id;
    store.create_execution(execution).await.unwrap();

    let mut checkpoint = ExecutionCheckpoint::new(execution_id, canvas.id);
    for (node, envelope) in [
        (
            "start",
            NodeOutputEnvelope::success(NodeKind::Trigger, Value::Null),
        ),
        (
            "fetch",
            NodeOutputEnvelope::success(NodeKind::Tool, json!({"status": 200})),
        ),
    ] {
        let mut state = NodeExecutionState::begin(execution_id, NodeId::from(node));
        state.finish(envelope.clone()).unwrap();
        checkpoint.record(NodeId::from(node), envelope);
        store
            .record_node_transition(state, checkpoint.clone())
            .await
            .unwrap();
    }

    service.resume(execution_id).await.unwrap();
    let status = service.wait(execution_id).await.unwrap();

    assert_eq!(status.result, Some(ExecutionResult::Success));
    // The completed tool node was not re-executed.
    assert_eq!(invocations.load(Ordering::SeqCst), 0);

    let rows = store.list_node_states(execution_id).await.unwrap();
    assert_eq!(rows.len(), 3);
    // Terminal runs leave no checkpoint behind.
    assert!(store.load_checkpoint(execution_id).await.unwrap().is_none());
}

#[tokio::test]
async fn legacy_document_shape_runs_end_to_end() {
    let store = Arc::new(MemoryStore::new());
    let service = service_with(Arc::clone(&store), lookup_tools(), Arc::new(NoopSink));

    let workflow_id = WorkflowId::new();
    let document = json!({
        "id": workflow_id,
        "name": "legacy",
        "nodes": [
            {"id": "start", "type": "trigger", "trigger": "manual"},
            {"id": "fetch", "type": "tool", "tool": "lookup"},
            {"id": "check", "type": "if", "expression": "${fetch.status} == 200"}
        ],
        "connections": [
            {"source": "start", "target": "fetch"},
            {"source": "fetch", "target": "check"}
        ]
    });
    store.put_canvas(workflow_id, document).await.unwrap();

    let execution_id = service
        .start(workflow_id, TriggerKind::Manual, None)
        .await
        .unwrap();
    let status = service.wait(execution_id).await.unwrap();

    assert_eq!(status.result, Some(ExecutionResult::Success));
    assert_eq!(store.list_node_states(execution_id).await.unwrap().len(), 3);
}

#[tokio::test]
async fn lifecycle_events_are_published_in_order() {
    let store = Arc::new(MemoryStore::new());
    let sink = BroadcastSink::new(64);
    let mut rx = sink.subscribe();
    let service = service_with(Arc::clone(&store), lookup_tools(), Arc::new(sink));

    let canvas = chain_canvas("lookup");
    service.save_canvas(&canvas).await.unwrap();
    let execution_id = service
        .start(canvas.id, TriggerKind::Manual, None)
        .await
        .unwrap();
    service.wait(execution_id).await.unwrap();

    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }

    assert!(matches!(
        events.first(),
        Some(ExecutionEvent::ExecutionStarted { .. })
    ));
    assert!(matches!(
        events.last(),
        Some(ExecutionEvent::ExecutionFinished {
            result: ExecutionResult::Success,
            ..
        })
    ));
    // Two events per node (running, finished).
    let node_events = events
        .iter()
        .filter(|e| matches!(e, ExecutionEvent::NodeStateChanged { .. }))
        .count();
    assert_eq!(node_events, 6);
}

/// Store wrapper whose node-transition writes can be switched off, for
/// driving the engine-fatal path while the execution row stays writable.
struct FlakyStore {
    inner: MemoryStore,
    node_writes_failing: AtomicBool,
}

impl FlakyStore {
    fn new() -> Self {
        Self {
            inner: MemoryStore::new(),
            node_writes_failing: AtomicBool::new(false),
        }
    }

    fn fail_node_writes(&self) {
        self.node_writes_failing.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl ExecutionStore for FlakyStore {
    async fn put_canvas(&self, id: WorkflowId, document: Value) -> StoreResult<()> {
        self.inner.put_canvas(id, document).await
    }

    async fn get_canvas(&self, id: WorkflowId) -> StoreResult<Value> {
        self.inner.get_canvas(id).await
    }

    async fn create_execution(&self, execution: WorkflowExecution) -> StoreResult<()> {
        self.inner.create_execution(execution).await
    }

    async fn get_execution(&self, id: ExecutionId) -> StoreResult<WorkflowExecution> {
        self.inner.get_execution(id).await
    }

    async fn update_execution(&self, execution: WorkflowExecution) -> StoreResult<()> {
        self.inner.update_execution(execution).await
    }

    async fn upsert_node_state(&self, state: NodeExecutionState) -> StoreResult<()> {
        self.inner.upsert_node_state(state).await
    }

    async fn get_node_state(
        &self,
        execution_id: ExecutionId,
        node_id: &NodeId,
    ) -> StoreResult<NodeExecutionState> {
        self.inner.get_node_state(execution_id, node_id).await
    }

    async fn list_node_states(
        &self,
        execution_id: ExecutionId,
    ) -> StoreResult<Vec<NodeExecutionState>> {
        self.inner.list_node_states(execution_id).await
    }

    async fn record_node_transition(
        &self,
        state: NodeExecutionState,
        checkpoint: ExecutionCheckpoint,
    ) -> StoreResult<()> {
        if self.node_writes_failing.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("node writes disabled".into()));
        }
        self.inner.record_node_transition(state, checkpoint).await
    }

    async fn save_checkpoint(&self, checkpoint: ExecutionCheckpoint) -> StoreResult<()> {
        self.inner.save_checkpoint(checkpoint).await
    }

    async fn load_checkpoint(
        &self,
        execution_id: ExecutionId,
    ) -> StoreResult<Option<ExecutionCheckpoint>> {
        self.inner.load_checkpoint(execution_id).await
    }

    async fn delete_checkpoint(&self, execution_id: ExecutionId) -> StoreResult<()> {
        self.inner.delete_checkpoint(execution_id).await
    }
}

#[tokio::test]
async fn persistence_loss_marks_the_run_as_system_failure() {
    let store = Arc::new(FlakyStore::new());
    let service = WorkflowService::new(
        Arc::clone(&store) as Arc<dyn ExecutionStore>,
        Arc::new(lookup_tools()),
        Arc::new(ScriptedAgentRunner::new()),
        Arc::new(NoopSink),
    );

    let canvas = chain_canvas("lookup");
    service.save_canvas(&canvas).await.unwrap();

    store.fail_node_writes();
    let execution_id = service
        .start(canvas.id, TriggerKind::Manual, None)
        .await
        .unwrap();
    let status = service.wait(execution_id).await.unwrap();

    assert_eq!(status.phase, ExecutionPhase::Finished);
    assert_eq!(status.result, Some(ExecutionResult::Failure));
    assert_eq!(status.failure_kind, Some(FailureKind::System));
}

#[tokio::test]
async fn starting_an_invalid_canvas_has_no_side_effects() {
    let store = Arc::new(MemoryStore::new());
    let service = service_with(Arc::clone(&store), lookup_tools(), Arc::new(NoopSink));

    let mut canvas = chain_canvas("lookup");
    canvas.push_edge(Edge::new("gate", "nowhere"));
    service.save_canvas(&canvas).await.unwrap();

    let err = service
        .start(canvas.id, TriggerKind::Manual, None)
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::Validation(_)));
}

#[tokio::test]
async fn agent_reply_feeds_downstream_references() {
    let store = Arc::new(MemoryStore::new());
    let service = service_with(Arc::clone(&store), lookup_tools(), Arc::new(NoopSink));

    let mut canvas = Canvas::new("agentic");
    canvas
        .push_node(Node::new("start", TriggerDef::manual()))
        .push_node(Node::new(
            "summarize",
            weft_runtime::definition::AgentDef::new("writer", "Summarize ${start.value}"),
        ))
        .push_node(Node::new(
            "check",
            ConditionalDef::new("${summarize.reply} == 'summarized'"),
        ))
        .push_edge(Edge::new("start", "summarize"))
        .push_edge(Edge::new("summarize", "check"));
    service.save_canvas(&canvas).await.unwrap();

    let execution_id = service
        .start(canvas.id, TriggerKind::Manual, Some(json!("report text")))
        .await
        .unwrap();
    let status = service.wait(execution_id).await.unwrap();
    assert_eq!(status.result, Some(ExecutionResult::Success));

    let rows = store.list_node_states(execution_id).await.unwrap();
    let check = rows.iter().find(|r| r.node_id.as_str() == "check").unwrap();
    assert_eq!(check.envelope.as_ref().unwrap().value, json!(true));
}
