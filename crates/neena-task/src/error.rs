/// Errors raised by task callables.
///
/// These never escape [`run_with_retry`](crate::run_with_retry); the last one
/// is turned into a failed [`TaskResult`](crate::TaskResult).
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
  /// The task ran and could not complete.
  #[error("{message}")]
  Failed { message: String },

  /// The task was given input it cannot use.
  #[error("invalid input field '{field}': {message}")]
  InvalidInput { field: String, message: String },

  /// An outbound HTTP call failed.
  #[error("http request failed: {0}")]
  Http(#[from] reqwest::Error),
}

impl TaskError {
  pub fn failed(message: impl Into<String>) -> Self {
    Self::Failed {
      message: message.into(),
    }
  }

  pub fn invalid_input(field: impl Into<String>, message: impl Into<String>) -> Self {
    Self::InvalidInput {
      field: field.into(),
      message: message.into(),
    }
  }
}
