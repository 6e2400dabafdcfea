//! Prompt rendering for task preparation.
//!
//! The system message explains the shape of the answer; the user message
//! carries the request, the flow, the operation about to run, its task
//! definition and the results of the operations that already completed.

use minijinja::{Environment, context};
use neena_config::{OperationIndex, PromptMessage, TaskDefinition, TaskPrepPrompt};
use neena_flow::Flow;
use neena_store::{FlowRun, RunStatus};
use serde::Serialize;

use crate::error::PreparationError;

const SYSTEM_TEMPLATE: &str = r#"You prepare the input of one step in an automated flow.

A flow is a set of task operations connected by dependencies and executed in
topological order. Each task operation refers to a task definition: a callable
with named, typed parameters, some of them optional.

You receive the user's request, the flow, the task operation about to run, its
task definition and the results of the operations that already finished.
Choose a value for each parameter of the task definition. Values usually come
from earlier results (an id, a name, a number, possibly transformed) or from
the request itself.

Reply with JSON only, in this form:
{"parameters": [{"name": "<parameter name>", "value": <json value>, "explanation": "<optional reason>"}]}

Only use parameter names from the task definition. Leave out optional
parameters you have no value for. Reply with an empty list when the task has
no parameters."#;

const USER_TEMPLATE: &str = r#"Request: {{ request }}

This is task operation {{ index }} named "{{ name }}", number {{ position }} in execution order.
Depends on: {% if depends_on %}{{ depends_on | join(", ") }}{% else %}(nothing){% endif %}
Feeds into: {% if feeds_into %}{{ feeds_into | join(", ") }}{% else %}(nothing){% endif %}

Flow:
{{ flow }}

Task operation:
{{ operation }}

Task definition:
{{ definition }}

Previous outputs:
{% for output in outputs -%}
Task operation {{ output.index }} ({{ output.name }}): {{ output.result }}
{% else -%}
(none)
{% endfor %}"#;

#[derive(Serialize)]
struct PriorOutput {
  index: OperationIndex,
  name: String,
  result: String,
}

/// Renders [`TaskPrepPrompt`]s.
pub struct PromptBuilder {
  env: Environment<'static>,
  system: String,
  user: String,
}

impl Default for PromptBuilder {
  fn default() -> Self {
    Self::with_templates(SYSTEM_TEMPLATE, USER_TEMPLATE)
  }
}

impl PromptBuilder {
  pub fn new() -> Self {
    Self::default()
  }

  /// Use custom minijinja templates. The user template sees `request`,
  /// `index`, `name`, `position`, `instruction`, `depends_on` and
  /// `feeds_into` (operation names), `flow`, `operation`, `definition` and
  /// `outputs` (a list of `index`, `name`, `result`).
  pub fn with_templates(system: impl Into<String>, user: impl Into<String>) -> Self {
    Self {
      env: Environment::new(),
      system: system.into(),
      user: user.into(),
    }
  }

  pub fn build(
    &self,
    flow: &Flow,
    flow_run: &FlowRun,
    index: OperationIndex,
    definition: &TaskDefinition,
  ) -> Result<TaskPrepPrompt, PreparationError> {
    let operation = flow
      .operation(index)
      .ok_or(PreparationError::UnknownOperation { index })?;

    let outputs: Vec<PriorOutput> = flow_run
      .task_runs
      .iter()
      .filter(|run| run.status == RunStatus::Completed)
      .filter_map(|run| {
        let op = flow.operation(run.task_operation_index)?;
        Some(PriorOutput {
          index: op.index,
          name: op.name.clone(),
          result: run
            .result
            .as_ref()
            .map(|r| r.to_string())
            .unwrap_or_else(|| "null".to_string()),
        })
      })
      .collect();

    let names = |indices: Vec<OperationIndex>| -> Vec<String> {
      indices
        .into_iter()
        .filter_map(|i| flow.operation(i).map(|op| op.name.clone()))
        .collect()
    };
    let depends_on = names(flow.graph().upstream(index));
    let feeds_into = names(flow.graph().downstream(index));

    let system = self.env.render_str(&self.system, context! {})?;
    let user = self.env.render_str(
      &self.user,
      context! {
        request => flow.request().unwrap_or("(not given)"),
        index => index,
        name => &operation.name,
        position => operation.sorted_index,
        instruction => &operation.instruction,
        depends_on => depends_on,
        feeds_into => feeds_into,
        flow => to_json(flow.definition()),
        operation => to_json(operation),
        definition => to_json(definition),
        outputs => outputs,
      },
    )?;

    Ok(TaskPrepPrompt {
      messages: vec![PromptMessage::system(system), PromptMessage::user(user)],
    })
  }
}

fn to_json<T: Serialize>(value: &T) -> String {
  serde_json::to_string_pretty(value).unwrap_or_default()
}

#[cfg(test)]
mod tests {
  use super::*;
  use neena_config::FlowDef;
  use neena_store::TaskRun;
  use serde_json::json;

  fn flow() -> Flow {
    let def: FlowDef = serde_json::from_value(json!({
      "flow_id": "8d1f3b0a-1c5e-4e0a-9a51-5f4dbb0f0a01",
      "name": "sum",
      "request": "Add 2 and 3, then add 10",
      "task_operations": [
        { "index": 0, "name": "first", "task_definition": "00000000-0000-0000-0000-000000000001" },
        { "index": 1, "name": "second", "task_definition": "00000000-0000-0000-0000-000000000001" }
      ],
      "dependencies": [{ "source_task_operation": 0, "target_task_operation": 1 }]
    }))
    .unwrap();
    Flow::new(def).unwrap()
  }

  fn definition() -> TaskDefinition {
    serde_json::from_value(json!({
      "id": "00000000-0000-0000-0000-000000000001",
      "task_name": "addition",
      "integration": "00000000-0000-0000-0000-0000000000aa",
      "method_name": "system.addition",
      "parameters": [
        { "name": "a", "data_type": "int", "position": 0 },
        { "name": "b", "data_type": "int", "position": 1 }
      ]
    }))
    .unwrap()
  }

  #[test]
  fn test_prompt_includes_completed_outputs_only() {
    let flow = flow();
    let mut flow_run = FlowRun::new(flow.flow_id());
    let mut done = TaskRun::start(flow_run.flow_run_id, 0);
    done.finish(RunStatus::Completed, json!(5));
    flow_run.task_runs.push(done);
    let mut running = TaskRun::start(flow_run.flow_run_id, 1);
    running.result = Some(json!("partial"));
    flow_run.task_runs.push(running);

    let prompt = PromptBuilder::new()
      .build(&flow, &flow_run, 1, &definition())
      .unwrap();

    assert_eq!(prompt.messages.len(), 2);
    assert_eq!(prompt.messages[0].role, "system");
    let user = &prompt.messages[1].content;
    assert!(user.contains("Request: Add 2 and 3, then add 10"));
    assert!(user.contains("task operation 1 named \"second\", number 1 in execution order"));
    assert!(user.contains("Depends on: first\n"));
    assert!(user.contains("Feeds into: (nothing)"));
    assert!(user.contains("Task operation 0 (first): 5"));
    assert!(!user.contains("partial"));
  }

  #[test]
  fn test_prompt_without_previous_outputs() {
    let flow = flow();
    let flow_run = FlowRun::new(flow.flow_id());

    let prompt = PromptBuilder::new()
      .build(&flow, &flow_run, 0, &definition())
      .unwrap();

    let user = &prompt.messages[1].content;
    assert!(user.contains("(none)"));
    assert!(user.contains("Depends on: (nothing)"));
    assert!(user.contains("Feeds into: second"));
  }

  #[test]
  fn test_unknown_operation() {
    let flow = flow();
    let err = PromptBuilder::new()
      .build(&flow, &FlowRun::new(flow.flow_id()), 9, &definition())
      .unwrap_err();

    assert!(matches!(err, PreparationError::UnknownOperation { index: 9 }));
  }
}
