use std::collections::HashMap;

use async_trait::async_trait;
use neena_config::{OperationIndex, TaskDefinition, TaskPrepAnswer, TaskPrepPrompt};
use neena_flow::Flow;
use neena_store::FlowRun;

use crate::TaskPreparer;
use crate::error::PreparationError;
use crate::prompt::PromptBuilder;

/// A [`TaskPreparer`] that answers from bindings supplied up front, keyed by
/// task operation index. The prompt is still rendered so runs record what a
/// model would have been asked.
pub struct FixedPreparer {
  answers: HashMap<OperationIndex, TaskPrepAnswer>,
  prompts: PromptBuilder,
}

impl FixedPreparer {
  pub fn new(answers: HashMap<OperationIndex, TaskPrepAnswer>) -> Self {
    Self {
      answers,
      prompts: PromptBuilder::new(),
    }
  }

  /// Parse answers from JSON of the form `{"<index>": {"parameters": [...]}}`.
  pub fn from_json(json: &str) -> Result<Self, PreparationError> {
    let answers = serde_json::from_str(json)
      .map_err(|e| PreparationError::invalid_answer(e.to_string()))?;
    Ok(Self::new(answers))
  }
}

#[async_trait]
impl TaskPreparer for FixedPreparer {
  async fn generate(
    &self,
    flow: &Flow,
    flow_run: &FlowRun,
    task_operation_index: OperationIndex,
    task_definition: &TaskDefinition,
  ) -> Result<(TaskPrepPrompt, TaskPrepAnswer), PreparationError> {
    let prompt = self
      .prompts
      .build(flow, flow_run, task_operation_index, task_definition)?;

    let answer = match self.answers.get(&task_operation_index) {
      Some(answer) => answer.clone(),
      None if task_definition.parameters.iter().all(|p| p.optional) => TaskPrepAnswer::default(),
      None => {
        return Err(PreparationError::MissingBindings {
          index: task_operation_index,
          task_name: task_definition.task_name.clone(),
        });
      }
    };

    Ok((prompt, answer))
  }
}
