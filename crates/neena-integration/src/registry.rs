use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;
use futures::future::BoxFuture;
use neena_config::TaskDefinition;
use neena_task::TaskError;
use tracing::{debug, info};

use crate::context::IntegrationContext;
use crate::error::DispatchError;
use crate::input::InputShape;
use crate::table::{BoundTask, TaskSpec, TaskTable};

/// A client for one external system.
///
/// Registered by type with [`IntegrationRegistry::register`]; connected once
/// per principal through [`Integration::connect`].
#[async_trait]
pub trait Integration: Sized + Send + Sync + 'static {
  /// Human readable name.
  const NAME: &'static str;
  /// Registry key, also used to look up credentials.
  const SHORT_NAME: &'static str;

  /// Construct a connected client.
  async fn connect(ctx: IntegrationContext) -> Result<Self, DispatchError>;

  /// The callables this integration exposes.
  fn tasks() -> TaskTable<Self>;

  /// Verify the external system is reachable with the current credentials.
  async fn check_connectivity(&self) -> Result<(), TaskError> {
    Ok(())
  }
}

/// Metadata of one registered task, available without connecting.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskDescriptor {
  pub name: String,
  pub spec: TaskSpec,
  pub shape: InputShape,
}

/// Metadata of one registered integration.
#[derive(Debug, Clone, PartialEq)]
pub struct IntegrationDescriptor {
  pub name: &'static str,
  pub short_name: &'static str,
  pub tasks: Vec<TaskDescriptor>,
}

type Connect =
  Arc<dyn Fn(IntegrationContext) -> BoxFuture<'static, Result<IntegrationInstance, DispatchError>> + Send + Sync>;

struct Registered {
  descriptor: IntegrationDescriptor,
  connect: Connect,
}

/// Integrations known to this process, keyed by short name.
#[derive(Default)]
pub struct IntegrationRegistry {
  integrations: BTreeMap<&'static str, Registered>,
}

impl IntegrationRegistry {
  pub fn new() -> Self {
    Self::default()
  }

  /// Register an integration type. Registering the same short name again
  /// replaces the earlier entry.
  pub fn register<I: Integration>(&mut self) -> &mut Self {
    let table = Arc::new(I::tasks());

    let descriptor = IntegrationDescriptor {
      name: I::NAME,
      short_name: I::SHORT_NAME,
      tasks: table
        .entries()
        .iter()
        .map(|entry| TaskDescriptor {
          name: entry.name.clone(),
          spec: entry.spec.clone(),
          shape: entry.shape.clone(),
        })
        .collect(),
    };

    let connect: Connect = Arc::new(move |ctx: IntegrationContext| {
      let table = table.clone();
      async move {
        let integration = Arc::new(I::connect(ctx).await?);
        Ok(IntegrationInstance::bind(integration, &table))
      }
      .boxed()
    });

    debug!(
      integration = I::SHORT_NAME,
      tasks = descriptor.tasks.len(),
      "integration_registered"
    );

    self
      .integrations
      .insert(I::SHORT_NAME, Registered { descriptor, connect });
    self
  }

  /// Registered integrations in short-name order.
  pub fn descriptors(&self) -> impl Iterator<Item = &IntegrationDescriptor> {
    self.integrations.values().map(|r| &r.descriptor)
  }

  /// The registered task a catalog entry points at, without connecting.
  pub fn describe(
    &self,
    short_name: &str,
    definition: &TaskDefinition,
  ) -> Result<&TaskDescriptor, DispatchError> {
    let registered =
      self
        .integrations
        .get(short_name)
        .ok_or_else(|| DispatchError::UnknownIntegration {
          short_name: short_name.to_string(),
        })?;

    registered
      .descriptor
      .tasks
      .iter()
      .find(|task| task.name == definition.method())
      .ok_or_else(|| DispatchError::UnknownMethod {
        integration: short_name.to_string(),
        method: definition.method_name.clone(),
      })
  }

  /// Connect the integration registered under `short_name`.
  pub async fn instantiate(
    &self,
    short_name: &str,
    ctx: IntegrationContext,
  ) -> Result<IntegrationInstance, DispatchError> {
    let registered =
      self
        .integrations
        .get(short_name)
        .ok_or_else(|| DispatchError::UnknownIntegration {
          short_name: short_name.to_string(),
        })?;

    let principal = ctx.principal.email.clone();
    let instance = (registered.connect)(ctx).await?;

    info!(
      integration = %short_name,
      principal = %principal,
      "integration_connected"
    );

    Ok(instance)
  }
}

type Check = Arc<dyn Fn() -> BoxFuture<'static, Result<(), TaskError>> + Send + Sync>;

/// A connected integration with its tasks bound.
#[derive(Clone)]
pub struct IntegrationInstance {
  name: &'static str,
  short_name: &'static str,
  tasks: Arc<HashMap<String, BoundTask>>,
  check: Check,
}

impl IntegrationInstance {
  fn bind<I: Integration>(integration: Arc<I>, table: &TaskTable<I>) -> Self {
    let tasks = table
      .entries()
      .iter()
      .map(|entry| {
        (
          entry.name.clone(),
          entry.bind(I::SHORT_NAME, integration.clone()),
        )
      })
      .collect();

    let check: Check = Arc::new(move || {
      let integration = integration.clone();
      async move { integration.check_connectivity().await }.boxed()
    });

    Self {
      name: I::NAME,
      short_name: I::SHORT_NAME,
      tasks: Arc::new(tasks),
      check,
    }
  }

  pub fn name(&self) -> &'static str {
    self.name
  }

  pub fn short_name(&self) -> &'static str {
    self.short_name
  }

  /// Resolve the task a catalog entry points at.
  pub fn resolve(&self, definition: &TaskDefinition) -> Result<BoundTask, DispatchError> {
    self.resolve_method(definition.method())
  }

  /// Resolve a task by its registered name.
  pub fn resolve_method(&self, method: &str) -> Result<BoundTask, DispatchError> {
    self
      .tasks
      .get(method)
      .cloned()
      .ok_or_else(|| DispatchError::UnknownMethod {
        integration: self.short_name.to_string(),
        method: method.to_string(),
      })
  }

  pub async fn check_connectivity(&self) -> Result<(), TaskError> {
    (self.check)().await
  }
}

impl std::fmt::Debug for IntegrationInstance {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let mut tasks: Vec<&String> = self.tasks.keys().collect();
    tasks.sort();
    f.debug_struct("IntegrationInstance")
      .field("short_name", &self.short_name)
      .field("tasks", &tasks)
      .finish()
  }
}
