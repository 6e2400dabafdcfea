use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskResultStatus {
  Success,
  Failure,
}

/// Outcome of one task invocation, including all retries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskResult {
  pub status: TaskResultStatus,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub data: Option<Value>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub error: Option<String>,
  #[serde(default, skip_serializing_if = "Map::is_empty")]
  pub metadata: Map<String, Value>,
}

impl TaskResult {
  pub fn success(data: Value) -> Self {
    Self {
      status: TaskResultStatus::Success,
      data: Some(data),
      error: None,
      metadata: Map::new(),
    }
  }

  pub fn failure(error: impl Into<String>) -> Self {
    Self {
      status: TaskResultStatus::Failure,
      data: None,
      error: Some(error.into()),
      metadata: Map::new(),
    }
  }

  pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
    self.metadata.insert(key.into(), value);
    self
  }

  pub fn is_success(&self) -> bool {
    self.status == TaskResultStatus::Success
  }
}

/// What a task callable hands back on a successful call.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskOutput {
  /// A plain value, wrapped as a success.
  Value(Value),
  /// A result the task built itself. Used to report a failure without
  /// raising, which is never retried.
  Result(TaskResult),
}

impl From<Value> for TaskOutput {
  fn from(value: Value) -> Self {
    TaskOutput::Value(value)
  }
}

impl From<TaskResult> for TaskOutput {
  fn from(result: TaskResult) -> Self {
    TaskOutput::Result(result)
  }
}
