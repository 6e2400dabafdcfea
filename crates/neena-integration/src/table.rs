use std::collections::HashSet;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
use neena_config::ParameterBinding;
use neena_task::{RetryPolicy, TaskError, TaskOutput};
use serde_json::{Map, Value};

use crate::error::InputError;
use crate::input::{InputShape, TaskInput};

type TaskFuture = BoxFuture<'static, Result<TaskOutput, TaskError>>;
type Handler<I> = Arc<dyn Fn(Arc<I>, Option<Value>) -> TaskFuture + Send + Sync>;
type Call = Arc<dyn Fn(Option<Value>) -> TaskFuture + Send + Sync>;
type InputCheck = fn(&Value) -> Result<(), String>;

/// Description and default retry policy of one task.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskSpec {
  pub description: String,
  pub retry: RetryPolicy,
}

impl TaskSpec {
  pub fn new(description: impl Into<String>) -> Self {
    Self {
      description: description.into(),
      retry: RetryPolicy::default(),
    }
  }

  pub fn retry(mut self, policy: RetryPolicy) -> Self {
    self.retry = policy;
    self
  }
}

pub(crate) struct TaskEntry<I> {
  pub(crate) name: String,
  pub(crate) spec: TaskSpec,
  pub(crate) shape: InputShape,
  check: Option<InputCheck>,
  handler: Handler<I>,
}

/// The callables an integration type exposes.
///
/// ```ignore
/// TaskTable::new()
///   .task("current_time", TaskSpec::new("Current UTC time"), Self::current_time)
///   .task_with_input("addition", TaskSpec::new("Add two integers"), Self::addition)
/// ```
///
/// Handlers receive the connected integration as `Arc<I>`. A later entry with
/// the same name replaces an earlier one.
pub struct TaskTable<I> {
  entries: Vec<TaskEntry<I>>,
}

impl<I: Send + Sync + 'static> TaskTable<I> {
  pub fn new() -> Self {
    Self {
      entries: Vec::new(),
    }
  }

  /// Register a task that takes no input.
  pub fn task<F, Fut, T>(mut self, name: &str, spec: TaskSpec, handler: F) -> Self
  where
    F: Fn(Arc<I>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, TaskError>> + Send + 'static,
    T: Into<TaskOutput> + Send + 'static,
  {
    let handler: Handler<I> = Arc::new(move |instance: Arc<I>, _input: Option<Value>| {
      let call = handler(instance);
      async move { call.await.map(Into::<TaskOutput>::into) }.boxed()
    });

    self.push(TaskEntry {
      name: name.to_string(),
      spec,
      shape: InputShape::None,
      check: None,
      handler,
    });
    self
  }

  /// Register a task that takes exactly one structured input.
  pub fn task_with_input<In, F, Fut, T>(mut self, name: &str, spec: TaskSpec, handler: F) -> Self
  where
    In: TaskInput,
    F: Fn(Arc<I>, In) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, TaskError>> + Send + 'static,
    T: Into<TaskOutput> + Send + 'static,
  {
    let handler: Handler<I> = Arc::new(move |instance: Arc<I>, input: Option<Value>| {
      match decode::<In>(input) {
        Ok(input) => {
          let call = handler(instance, input);
          async move { call.await.map(Into::<TaskOutput>::into) }.boxed()
        }
        Err(e) => async move { Err(e) }.boxed(),
      }
    });

    self.push(TaskEntry {
      name: name.to_string(),
      spec,
      shape: InputShape::of::<In>(),
      check: Some(check_decodes::<In>),
      handler,
    });
    self
  }

  pub(crate) fn entries(&self) -> &[TaskEntry<I>] {
    &self.entries
  }

  fn push(&mut self, entry: TaskEntry<I>) {
    self.entries.retain(|existing| existing.name != entry.name);
    self.entries.push(entry);
  }
}

impl<I: Send + Sync + 'static> Default for TaskTable<I> {
  fn default() -> Self {
    Self::new()
  }
}

impl<I: Send + Sync + 'static> TaskEntry<I> {
  /// Attach this entry to a connected integration.
  pub(crate) fn bind(&self, integration: &str, instance: Arc<I>) -> BoundTask {
    let handler = self.handler.clone();
    BoundTask {
      integration: integration.to_string(),
      name: self.name.clone(),
      spec: self.spec.clone(),
      shape: self.shape.clone(),
      check: self.check,
      call: Arc::new(move |input: Option<Value>| handler(instance.clone(), input)),
    }
  }
}

fn decode<In: TaskInput>(input: Option<Value>) -> Result<In, TaskError> {
  let value = input.ok_or_else(|| TaskError::invalid_input(In::TYPE_NAME, "no input provided"))?;
  serde_json::from_value(value).map_err(|e| TaskError::invalid_input(In::TYPE_NAME, e.to_string()))
}

fn check_decodes<In: TaskInput>(value: &Value) -> Result<(), String> {
  serde_json::from_value::<In>(value.clone())
    .map(|_| ())
    .map_err(|e| e.to_string())
}

/// A task resolved on a connected integration, ready to call.
#[derive(Clone)]
pub struct BoundTask {
  integration: String,
  name: String,
  spec: TaskSpec,
  shape: InputShape,
  check: Option<InputCheck>,
  call: Call,
}

impl BoundTask {
  pub fn name(&self) -> &str {
    &self.name
  }

  /// Short name of the owning integration.
  pub fn integration(&self) -> &str {
    &self.integration
  }

  pub fn description(&self) -> &str {
    &self.spec.description
  }

  pub fn input_shape(&self) -> &InputShape {
    &self.shape
  }

  pub fn retry_policy(&self) -> RetryPolicy {
    self.spec.retry
  }

  /// Turn prepared parameter bindings into the task's input value.
  ///
  /// Unknown, duplicated and missing required parameters are rejected, and the
  /// assembled object must decode into the task's input type.
  pub fn bind_input(&self, bindings: &[ParameterBinding]) -> Result<Option<Value>, InputError> {
    let fields = self.shape.fields();

    if !self.shape.is_structured() {
      return match bindings.first() {
        Some(binding) => Err(InputError::UnknownField {
          task: self.name.clone(),
          field: binding.name.clone(),
        }),
        None => Ok(None),
      };
    }

    let mut seen = HashSet::new();
    let mut object = Map::new();
    for binding in bindings {
      if !fields.iter().any(|f| f.name == binding.name) {
        return Err(InputError::UnknownField {
          task: self.name.clone(),
          field: binding.name.clone(),
        });
      }
      if !seen.insert(binding.name.as_str()) {
        return Err(InputError::DuplicateField {
          task: self.name.clone(),
          field: binding.name.clone(),
        });
      }
      object.insert(binding.name.clone(), binding.value.clone());
    }

    if let Some(missing) = fields
      .iter()
      .find(|f| !f.optional && !object.contains_key(f.name))
    {
      return Err(InputError::MissingField {
        task: self.name.clone(),
        field: missing.name.to_string(),
      });
    }

    let value = Value::Object(object);
    if let Some(check) = self.check {
      check(&value).map_err(|message| InputError::Decode {
        task: self.name.clone(),
        type_name: self.shape.type_name().unwrap_or_default().to_string(),
        message,
      })?;
    }

    Ok(Some(value))
  }

  /// Call the task once.
  pub async fn invoke(&self, input: Option<Value>) -> Result<TaskOutput, TaskError> {
    (self.call)(input).await
  }
}

impl fmt::Debug for BoundTask {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("BoundTask")
      .field("integration", &self.integration)
      .field("name", &self.name)
      .field("shape", &self.shape)
      .field("retry", &self.spec.retry)
      .finish()
  }
}
