//! Flow run events and the notifiers that deliver them.
//!
//! Events are emitted while a flow runs so consumers can observe progress,
//! stream it to a UI or mirror it elsewhere.

use neena_config::OperationIndex;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use uuid::Uuid;

/// Events emitted during a flow run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExecutionEvent {
  /// A flow run was created or resumed and is about to execute.
  FlowRunStarted {
    flow_run_id: Uuid,
    flow_id: Uuid,
  },

  /// A task run was created for the operation and is about to be prepared.
  TaskRunStarted {
    flow_run_id: Uuid,
    task_run_id: Uuid,
    task_operation_index: OperationIndex,
  },

  /// A task run finished with a successful result.
  TaskRunCompleted {
    flow_run_id: Uuid,
    task_run_id: Uuid,
    task_operation_index: OperationIndex,
    result: serde_json::Value,
  },

  /// A task run failed; no further operations of the flow run will start.
  TaskRunFailed {
    flow_run_id: Uuid,
    task_run_id: Uuid,
    task_operation_index: OperationIndex,
    error: String,
  },

  /// Every operation of the flow run completed.
  FlowRunCompleted { flow_run_id: Uuid },

  /// The flow run failed, before or during execution.
  FlowRunFailed { flow_run_id: Uuid, error: String },
}

/// Receives execution events.
///
/// Called inline by the orchestrator, so implementations should return
/// quickly.
pub trait ExecutionNotifier: Send + Sync {
  fn notify(&self, event: ExecutionEvent);
}

/// Discards all events.
#[derive(Debug, Clone, Default)]
pub struct NoopNotifier;

impl ExecutionNotifier for NoopNotifier {
  fn notify(&self, _event: ExecutionEvent) {}
}

/// Forwards events to an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
  sender: mpsc::UnboundedSender<ExecutionEvent>,
}

impl ChannelNotifier {
  pub fn new(sender: mpsc::UnboundedSender<ExecutionEvent>) -> Self {
    Self { sender }
  }
}

impl ExecutionNotifier for ChannelNotifier {
  fn notify(&self, event: ExecutionEvent) {
    // Receiver may be gone
    let _ = self.sender.send(event);
  }
}
