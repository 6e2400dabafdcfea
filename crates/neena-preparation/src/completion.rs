use std::collections::HashSet;

use async_trait::async_trait;
use neena_config::{
  OperationIndex, ParameterBinding, TaskDefinition, TaskPrepAnswer, TaskPrepPrompt,
};
use neena_flow::Flow;
use neena_store::FlowRun;
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::TaskPreparer;
use crate::error::PreparationError;
use crate::prompt::PromptBuilder;

/// The language model boundary: turns a prompt into raw reply text.
#[async_trait]
pub trait CompletionClient: Send + Sync {
  async fn complete(&self, prompt: &TaskPrepPrompt) -> Result<String, PreparationError>;
}

/// A [`TaskPreparer`] backed by a [`CompletionClient`].
pub struct CompletionPreparer<C> {
  client: C,
  prompts: PromptBuilder,
}

impl<C: CompletionClient> CompletionPreparer<C> {
  pub fn new(client: C) -> Self {
    Self {
      client,
      prompts: PromptBuilder::new(),
    }
  }

  pub fn with_prompts(client: C, prompts: PromptBuilder) -> Self {
    Self { client, prompts }
  }
}

#[async_trait]
impl<C: CompletionClient> TaskPreparer for CompletionPreparer<C> {
  #[instrument(
    name = "prepare_task",
    skip(self, flow, flow_run, task_definition),
    fields(flow_id = %flow.flow_id(), task_name = %task_definition.task_name)
  )]
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
    let reply = self.client.complete(&prompt).await?;
    let answer = parse_answer(&reply, task_definition)?;

    debug!(
      parameters = answer.parameters.len(),
      "task_preparation_answered"
    );

    Ok((prompt, answer))
  }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Reply {
  Wrapped { parameters: Vec<ParameterBinding> },
  Bare(Vec<ParameterBinding>),
}

/// Parse a model reply into an answer for `definition`.
///
/// Accepts `{"parameters": [...]}` or a bare list, optionally inside a fenced
/// code block. Names that are not parameters of the definition are rejected.
pub fn parse_answer(
  reply: &str,
  definition: &TaskDefinition,
) -> Result<TaskPrepAnswer, PreparationError> {
  let body = strip_fence(reply.trim());

  let parameters = match serde_json::from_str::<Reply>(body) {
    Ok(Reply::Wrapped { parameters }) | Ok(Reply::Bare(parameters)) => parameters,
    Err(e) => return Err(PreparationError::invalid_answer(e.to_string())),
  };

  let known: HashSet<&str> = definition
    .parameters
    .iter()
    .map(|p| p.name.as_str())
    .collect();
  if let Some(unknown) = parameters.iter().find(|b| !known.contains(b.name.as_str())) {
    return Err(PreparationError::invalid_answer(format!(
      "'{}' is not a parameter of task '{}'",
      unknown.name, definition.task_name
    )));
  }

  Ok(TaskPrepAnswer { parameters })
}

fn strip_fence(text: &str) -> &str {
  let Some(rest) = text.strip_prefix("```") else {
    return text;
  };
  let rest = rest.split_once('\n').map_or("", |(_, body)| body);
  rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}
