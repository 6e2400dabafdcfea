use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Caller-assigned identity of a task operation within one flow.
pub type OperationIndex = u32;

/// A flow as authored: task operations plus the edges between them.
///
/// Declaration order carries no meaning; operations are identified by
/// [`TaskOperation::index`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowDef {
  pub flow_id: Uuid,
  pub name: String,
  /// The natural-language request this flow was built for.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub request: Option<String>,
  #[serde(default)]
  pub task_operations: Vec<TaskOperation>,
  #[serde(default)]
  pub dependencies: Vec<Dependency>,
}

impl FlowDef {
  /// Look up an operation by index.
  pub fn operation(&self, index: OperationIndex) -> Option<&TaskOperation> {
    self.task_operations.iter().find(|op| op.index == index)
  }
}

/// One node of a flow: a named use of a task definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskOperation {
  pub index: OperationIndex,
  pub name: String,
  pub task_definition: Uuid,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub instruction: Option<String>,
  /// Rank in the execution order. Assigned when the flow is sorted; any
  /// value present on input is overwritten.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub sorted_index: Option<usize>,
}

/// A directed edge: `source_task_operation` must finish before
/// `target_task_operation` starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dependency {
  pub source_task_operation: OperationIndex,
  pub target_task_operation: OperationIndex,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub instruction: Option<String>,
}

impl Dependency {
  pub fn new(source: OperationIndex, target: OperationIndex) -> Self {
    Self {
      source_task_operation: source,
      target_task_operation: target,
      instruction: None,
    }
  }
}
