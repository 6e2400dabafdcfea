use serde::{Deserialize, Serialize};

/// One chat message of a preparation prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptMessage {
  pub role: String,
  pub content: String,
}

impl PromptMessage {
  pub fn system(content: impl Into<String>) -> Self {
    Self {
      role: "system".to_string(),
      content: content.into(),
    }
  }

  pub fn user(content: impl Into<String>) -> Self {
    Self {
      role: "user".to_string(),
      content: content.into(),
    }
  }
}

/// The prompt sent to produce a task's parameters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskPrepPrompt {
  pub messages: Vec<PromptMessage>,
}

/// A single parameter value chosen for a task invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterBinding {
  pub name: String,
  pub value: serde_json::Value,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub explanation: Option<String>,
}

impl ParameterBinding {
  pub fn new(name: impl Into<String>, value: serde_json::Value) -> Self {
    Self {
      name: name.into(),
      value,
      explanation: None,
    }
  }
}

/// The parameter bindings produced for a task invocation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskPrepAnswer {
  pub parameters: Vec<ParameterBinding>,
}
