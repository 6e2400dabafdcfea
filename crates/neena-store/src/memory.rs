use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::types::{FlowRun, TaskRun};
use crate::{Store, StoreError};

#[derive(Debug, Default)]
struct State {
  /// Creation order; task runs are kept separately.
  flow_runs: Vec<FlowRun>,
  task_runs: Vec<TaskRun>,
}

impl State {
  fn with_task_runs(&self, flow_run: &FlowRun) -> FlowRun {
    let mut flow_run = flow_run.clone();
    flow_run.task_runs = self
      .task_runs
      .iter()
      .filter(|run| run.flow_run_id == flow_run.flow_run_id)
      .cloned()
      .collect();
    flow_run
  }
}

/// A [`Store`] that keeps everything in process memory.
#[derive(Debug, Default)]
pub struct InMemoryStore {
  state: RwLock<State>,
}

impl InMemoryStore {
  pub fn new() -> Self {
    Self::default()
  }
}

#[async_trait]
impl Store for InMemoryStore {
  async fn create_flow_run(&self, flow_run: &FlowRun) -> Result<(), StoreError> {
    let mut state = self.state.write().await;
    if state
      .flow_runs
      .iter()
      .any(|run| run.flow_run_id == flow_run.flow_run_id)
    {
      return Err(StoreError::Conflict(format!(
        "flow run {} already exists",
        flow_run.flow_run_id
      )));
    }

    let mut record = flow_run.clone();
    record.task_runs.clear();
    state.flow_runs.push(record);
    Ok(())
  }

  async fn update_flow_run(&self, flow_run: &FlowRun) -> Result<(), StoreError> {
    let mut state = self.state.write().await;
    let record = state
      .flow_runs
      .iter_mut()
      .find(|run| run.flow_run_id == flow_run.flow_run_id)
      .ok_or_else(|| StoreError::NotFound(format!("flow run {}", flow_run.flow_run_id)))?;

    record.status = flow_run.status;
    record.triggered_time = flow_run.triggered_time;
    record.end_time = flow_run.end_time;
    Ok(())
  }

  async fn get_flow_run(&self, flow_run_id: Uuid) -> Result<FlowRun, StoreError> {
    let state = self.state.read().await;
    state
      .flow_runs
      .iter()
      .find(|run| run.flow_run_id == flow_run_id)
      .map(|run| state.with_task_runs(run))
      .ok_or_else(|| StoreError::NotFound(format!("flow run {}", flow_run_id)))
  }

  async fn list_flow_runs(&self, flow_id: Uuid) -> Result<Vec<FlowRun>, StoreError> {
    let state = self.state.read().await;
    Ok(
      state
        .flow_runs
        .iter()
        .filter(|run| run.flow_id == flow_id)
        .map(|run| state.with_task_runs(run))
        .collect(),
    )
  }

  async fn create_task_run(&self, task_run: &TaskRun) -> Result<(), StoreError> {
    let mut state = self.state.write().await;

    if !state
      .flow_runs
      .iter()
      .any(|run| run.flow_run_id == task_run.flow_run_id)
    {
      return Err(StoreError::NotFound(format!(
        "flow run {}",
        task_run.flow_run_id
      )));
    }

    if state.task_runs.iter().any(|run| {
      run.task_run_id == task_run.task_run_id
        || (run.flow_run_id == task_run.flow_run_id
          && run.task_operation_index == task_run.task_operation_index)
    }) {
      return Err(StoreError::Conflict(format!(
        "flow run {} already has a task run for operation {}",
        task_run.flow_run_id, task_run.task_operation_index
      )));
    }

    state.task_runs.push(task_run.clone());
    Ok(())
  }

  async fn update_task_run(&self, task_run: &TaskRun) -> Result<(), StoreError> {
    let mut state = self.state.write().await;
    let record = state
      .task_runs
      .iter_mut()
      .find(|run| run.task_run_id == task_run.task_run_id)
      .ok_or_else(|| StoreError::NotFound(format!("task run {}", task_run.task_run_id)))?;

    *record = task_run.clone();
    Ok(())
  }

  async fn list_task_runs(&self, flow_run_id: Uuid) -> Result<Vec<TaskRun>, StoreError> {
    let state = self.state.read().await;
    Ok(
      state
        .task_runs
        .iter()
        .filter(|run| run.flow_run_id == flow_run_id)
        .cloned()
        .collect(),
    )
  }
}
