use neena_config::OperationIndex;

#[derive(Debug, thiserror::Error)]
pub enum PreparationError {
  #[error("task operation {index} is not part of the flow")]
  UnknownOperation { index: OperationIndex },

  #[error("no parameter bindings for task operation {index} ('{task_name}' has required parameters)")]
  MissingBindings {
    index: OperationIndex,
    task_name: String,
  },

  #[error("invalid preparation answer: {message}")]
  InvalidAnswer { message: String },

  #[error("completion request failed: {message}")]
  Completion { message: String },

  #[error("failed to render preparation prompt: {0}")]
  Template(#[from] minijinja::Error),
}

impl PreparationError {
  pub fn invalid_answer(message: impl Into<String>) -> Self {
    Self::InvalidAnswer {
      message: message.into(),
    }
  }

  pub fn completion(message: impl Into<String>) -> Self {
    Self::Completion {
      message: message.into(),
    }
  }
}
