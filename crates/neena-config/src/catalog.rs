use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A catalog file: integration records plus their task definitions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogDef {
  #[serde(default)]
  pub integrations: Vec<IntegrationRecord>,
  #[serde(default)]
  pub task_definitions: Vec<TaskDefinition>,
}

/// A catalog entry describing one callable of one integration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskDefinition {
  pub id: Uuid,
  pub task_name: String,
  /// Id of the owning [`IntegrationRecord`].
  pub integration: Uuid,
  #[serde(default)]
  pub parameters: Vec<TaskParameter>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub input_type: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub output_type: Option<String>,
  #[serde(default)]
  pub description: String,
  /// Dotted path of the method; the last segment is the method name.
  pub method_name: String,
}

impl TaskDefinition {
  /// The method name without any module or class prefix.
  pub fn method(&self) -> &str {
    self
      .method_name
      .rsplit('.')
      .next()
      .unwrap_or(&self.method_name)
  }
}

/// One field of a task's input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskParameter {
  pub name: String,
  pub data_type: String,
  pub position: u32,
  #[serde(default)]
  pub doc_string: String,
  #[serde(default)]
  pub optional: bool,
}

/// Maps an integration id to the short name it is registered under.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntegrationRecord {
  pub id: Uuid,
  pub name: String,
  pub short_name: String,
}

#[cfg(test)]
mod tests {
  use super::*;

  fn definition(method_name: &str) -> TaskDefinition {
    TaskDefinition {
      id: Uuid::new_v4(),
      task_name: "addition".to_string(),
      integration: Uuid::new_v4(),
      parameters: vec![],
      input_type: None,
      output_type: None,
      description: String::new(),
      method_name: method_name.to_string(),
    }
  }

  #[test]
  fn test_method_strips_dotted_prefix() {
    assert_eq!(definition("integrations.system.System.addition").method(), "addition");
    assert_eq!(definition("addition").method(), "addition");
  }

  #[test]
  fn test_minimal_definition() {
    let json = serde_json::json!({
      "id": Uuid::new_v4(),
      "task_name": "addition",
      "integration": Uuid::new_v4(),
      "method_name": "system.System.addition"
    });

    let def: TaskDefinition = serde_json::from_value(json).unwrap();
    assert_eq!(def.method(), "addition");
    assert!(def.parameters.is_empty());
  }
}
