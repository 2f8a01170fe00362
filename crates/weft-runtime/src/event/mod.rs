//! Lifecycle event notifications.
//!
//! The engine publishes node-state-changed and execution-finished events
//! through an injected sink, never through ambient global state. Events
//! are fire-and-forget: delivery failure is logged and swallowed, it must
//! never abort a run.

use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use weft_core::{ExecutionId, ExecutionPhase, ExecutionResult, NodeId, WorkflowId};

use crate::TRACING_TARGET;

/// A lifecycle event published by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ExecutionEvent {
    /// An execution moved to `Running`.
    ExecutionStarted {
        /// The execution that started.
        execution_id: ExecutionId,
        /// Workflow it runs.
        workflow_id: WorkflowId,
        /// When it started.
        at: Timestamp,
    },
    /// A node's state record changed.
    NodeStateChanged {
        /// The owning execution.
        execution_id: ExecutionId,
        /// The node that changed.
        node_id: NodeId,
        /// Its new phase.
        phase: ExecutionPhase,
        /// Its result, once terminal.
        #[serde(skip_serializing_if = "Option::is_none")]
        result: Option<ExecutionResult>,
        /// When the change happened.
        at: Timestamp,
    },
    /// An execution reached its terminal phase.
    ExecutionFinished {
        /// The execution that finished.
        execution_id: ExecutionId,
        /// Its terminal result.
        result: ExecutionResult,
        /// When it finished.
        at: Timestamp,
    },
}

/// Sink for lifecycle events.
pub trait EventSink: Send + Sync {
    /// Publishes one event. Must not block and must not fail the caller.
    fn publish(&self, event: ExecutionEvent);
}

/// In-process fan-out over a tokio broadcast channel.
#[derive(Debug, Clone)]
pub struct BroadcastSink {
    tx: broadcast::Sender<ExecutionEvent>,
}

impl BroadcastSink {
    /// Creates a sink with the given channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribes to the event stream.
    pub fn subscribe(&self) -> broadcast::Receiver<ExecutionEvent> {
        self.tx.subscribe()
    }

    /// Returns the number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for BroadcastSink {
    fn default() -> Self {
        Self::new(256)
    }
}

impl EventSink for BroadcastSink {
    fn publish(&self, event: ExecutionEvent) {
        // send only errors when nobody is listening; that is a normal
        // state for unattended runs.
        if self.tx.send(event).is_err() {
            tracing::debug!(
                target: TRACING_TARGET,
                "No subscribers for lifecycle event"
            );
        }
    }
}

/// Sink that drops every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl EventSink for NoopSink {
    fn publish(&self, _event: ExecutionEvent) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_broadcast_delivers_to_subscribers() {
        let sink = BroadcastSink::new(8);
        let mut rx = sink.subscribe();

        let event = ExecutionEvent::ExecutionFinished {
            execution_id: ExecutionId::new(),
            result: ExecutionResult::Success,
            at: Timestamp::now(),
        };
        sink.publish(event.clone());

        assert_eq!(rx.recv().await.unwrap(), event);
    }

    #[test]
    fn test_publish_without_subscribers_is_harmless() {
        let sink = BroadcastSink::new(8);
        sink.publish(ExecutionEvent::ExecutionStarted {
            execution_id: ExecutionId::new(),
            workflow_id: WorkflowId::new(),
            at: Timestamp::now(),
        });
        assert_eq!(sink.subscriber_count(), 0);
    }
}
