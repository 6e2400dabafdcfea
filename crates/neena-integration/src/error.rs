use uuid::Uuid;

/// Errors resolving a task definition to a callable.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
  #[error("task definition not found: {id}")]
  TaskDefinitionNotFound { id: Uuid },

  #[error("integration record not found: {id}")]
  IntegrationNotFound { id: Uuid },

  #[error("no integration registered under short name '{short_name}'")]
  UnknownIntegration { short_name: String },

  #[error("integration '{integration}' has no task '{method}'")]
  UnknownMethod { integration: String, method: String },

  #[error("no credential for integration '{short_name}' and principal '{principal}'")]
  MissingCredential {
    short_name: String,
    principal: String,
  },

  #[error("failed to construct integration '{short_name}': {message}")]
  Construction { short_name: String, message: String },
}

impl DispatchError {
  pub fn construction(short_name: impl Into<String>, message: impl Into<String>) -> Self {
    Self::Construction {
      short_name: short_name.into(),
      message: message.into(),
    }
  }
}

/// Errors binding prepared parameters to a task's input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InputError {
  #[error("task '{task}' has no parameter '{field}'")]
  UnknownField { task: String, field: String },

  #[error("parameter '{field}' of task '{task}' is bound more than once")]
  DuplicateField { task: String, field: String },

  #[error("required parameter '{field}' of task '{task}' is missing")]
  MissingField { task: String, field: String },

  #[error("input for task '{task}' does not match {type_name}: {message}")]
  Decode {
    task: String,
    type_name: String,
    message: String,
  },
}
