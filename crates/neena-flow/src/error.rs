use neena_config::OperationIndex;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
  #[error("flow name cannot be empty")]
  MissingName,

  #[error("flow has no task operations")]
  Empty,

  #[error("task operation index {index} is declared more than once")]
  DuplicateIndex { index: OperationIndex },

  #[error("task operation name '{name}' is used more than once")]
  DuplicateName { name: String },

  #[error("invalid task operation name '{name}': only letters, digits, '_' and '-' are allowed")]
  InvalidName { name: String },

  #[error("dependency references unknown task operation: source={source_index}, target={target_index}")]
  UnknownEndpoint {
    source_index: OperationIndex,
    target_index: OperationIndex,
  },

  #[error("flow contains a cycle")]
  Cycle,
}
