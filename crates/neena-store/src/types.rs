use chrono::{DateTime, Utc};
use neena_config::{OperationIndex, TaskPrepAnswer, TaskPrepPrompt};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Status shared by flow runs and task runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
  Pending,
  InProgress,
  Completed,
  Failed,
  /// Reserved; no code path produces it yet.
  Cancelled,
}

impl RunStatus {
  pub fn is_terminal(self) -> bool {
    matches!(
      self,
      RunStatus::Completed | RunStatus::Failed | RunStatus::Cancelled
    )
  }
}

/// One execution of a flow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowRun {
  pub flow_run_id: Uuid,
  pub flow_id: Uuid,
  pub status: RunStatus,
  pub triggered_time: Option<DateTime<Utc>>,
  pub end_time: Option<DateTime<Utc>>,
  /// In creation order.
  #[serde(default)]
  pub task_runs: Vec<TaskRun>,
}

impl FlowRun {
  /// A fresh run in `Pending` state.
  pub fn new(flow_id: Uuid) -> Self {
    Self {
      flow_run_id: Uuid::new_v4(),
      flow_id,
      status: RunStatus::Pending,
      triggered_time: None,
      end_time: None,
      task_runs: Vec::new(),
    }
  }

  pub fn task_run(&self, index: OperationIndex) -> Option<&TaskRun> {
    self
      .task_runs
      .iter()
      .find(|run| run.task_operation_index == index)
  }

  pub fn task_run_mut(&mut self, index: OperationIndex) -> Option<&mut TaskRun> {
    self
      .task_runs
      .iter_mut()
      .find(|run| run.task_operation_index == index)
  }
}

/// One execution of one task operation within a flow run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRun {
  pub task_run_id: Uuid,
  pub flow_run_id: Uuid,
  pub task_operation_index: OperationIndex,
  pub status: RunStatus,
  pub start_time: Option<DateTime<Utc>>,
  pub end_time: Option<DateTime<Utc>>,
  pub result: Option<serde_json::Value>,
  pub task_prep_prompt: Option<TaskPrepPrompt>,
  pub task_prep_answer: Option<TaskPrepAnswer>,
}

impl TaskRun {
  /// A task run that starts now.
  pub fn start(flow_run_id: Uuid, task_operation_index: OperationIndex) -> Self {
    Self {
      task_run_id: Uuid::new_v4(),
      flow_run_id,
      task_operation_index,
      status: RunStatus::InProgress,
      start_time: Some(Utc::now()),
      end_time: None,
      result: None,
      task_prep_prompt: None,
      task_prep_answer: None,
    }
  }

  /// Record the final status and result.
  pub fn finish(&mut self, status: RunStatus, result: serde_json::Value) {
    self.status = status;
    self.result = Some(result);
    self.end_time = Some(Utc::now());
  }
}
