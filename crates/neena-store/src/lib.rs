//! Neena Store
//!
//! Storage trait for flow runs and their task runs, plus an in-memory
//! implementation.
//!
//! The [`Store`] trait defines operations for:
//! - Creating and updating flow runs
//! - Creating and updating task runs
//! - Querying run history for a flow

mod memory;
mod types;

pub use memory::InMemoryStore;
pub use types::{FlowRun, RunStatus, TaskRun};

use async_trait::async_trait;
use uuid::Uuid;

/// Error type for storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
  /// The requested record was not found.
  #[error("not found: {0}")]
  NotFound(String),

  /// The write would break a uniqueness rule.
  #[error("conflict: {0}")]
  Conflict(String),
}

/// Storage trait for flow runs and task runs.
#[async_trait]
pub trait Store: Send + Sync {
  /// Create a new flow run. Any task runs it carries are ignored.
  async fn create_flow_run(&self, flow_run: &FlowRun) -> Result<(), StoreError>;

  /// Update a flow run's status and times.
  async fn update_flow_run(&self, flow_run: &FlowRun) -> Result<(), StoreError>;

  /// Get a flow run with its task runs in creation order.
  async fn get_flow_run(&self, flow_run_id: Uuid) -> Result<FlowRun, StoreError>;

  /// List runs of a flow, oldest first.
  async fn list_flow_runs(&self, flow_id: Uuid) -> Result<Vec<FlowRun>, StoreError>;

  /// Create a task run. At most one task run may exist per operation per
  /// flow run.
  async fn create_task_run(&self, task_run: &TaskRun) -> Result<(), StoreError>;

  /// Update a task run.
  async fn update_task_run(&self, task_run: &TaskRun) -> Result<(), StoreError>;

  /// List task runs of a flow run in creation order.
  async fn list_task_runs(&self, flow_run_id: Uuid) -> Result<Vec<TaskRun>, StoreError>;
}
