//! Run error types.

use neena_config::OperationIndex;
use neena_flow::GraphError;
use neena_integration::{DispatchError, InputError};
use neena_preparation::PreparationError;
use neena_store::{RunStatus, StoreError};
use uuid::Uuid;

/// Errors that end a flow run. They are recorded on the run rather than
/// returned to the caller.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
  /// The flow failed structural validation.
  #[error("invalid flow: {0}")]
  Graph(#[from] GraphError),

  /// Parameters could not be prepared.
  #[error("task preparation failed: {0}")]
  Preparation(#[from] PreparationError),

  /// The task could not be resolved to a callable.
  #[error("dispatch failed: {0}")]
  Dispatch(#[from] DispatchError),

  /// Prepared parameters do not fit the task's input.
  #[error("invalid task input: {0}")]
  Input(#[from] InputError),

  /// Persisting run state failed.
  #[error("store error: {0}")]
  Store(#[from] StoreError),

  /// A task returned a failed result.
  #[error("task operation {index} failed: {message}")]
  TaskFailed {
    index: OperationIndex,
    message: String,
  },

  /// A resumed run holds an unfinished task run for this operation.
  #[error("task operation {index} already has a task run in state {status:?}")]
  StaleTaskRun {
    index: OperationIndex,
    status: RunStatus,
  },

  /// A resumed run belongs to a different flow.
  #[error("flow run belongs to flow {run_flow_id}, not {flow_id}")]
  FlowMismatch { flow_id: Uuid, run_flow_id: Uuid },
}
