//! Flow run execution.
//!
//! The [`Orchestrator`] owns the ports it talks to and a per-run integration
//! cache. `run_flow` walks the flow in topological order, one task operation at
//! a time, and stops at the first failure.

use std::sync::Arc;

use chrono::Utc;
use neena_config::{FlowDef, OperationIndex, Settings, TaskOperation};
use neena_flow::{Flow, GraphError};
use neena_integration::{
  CredentialStore, IntegrationContext, IntegrationInstance, IntegrationRegistry, Principal,
  TaskCatalog,
};
use neena_preparation::TaskPreparer;
use neena_store::{FlowRun, RunStatus, Store, StoreError, TaskRun};
use neena_task::{RetryOverrides, TaskResult, run_with_retry};
use serde_json::json;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument};
use uuid::Uuid;

use crate::cache::IntegrationCache;
use crate::error::RunError;
use crate::events::{ExecutionEvent, ExecutionNotifier, NoopNotifier};

/// Configuration for the orchestrator.
#[derive(Debug, Clone, Default)]
pub struct OrchestratorConfig {
  /// Applied on top of every task's own retry policy.
  pub retry: RetryOverrides,
}

impl From<&Settings> for OrchestratorConfig {
  fn from(settings: &Settings) -> Self {
    Self {
      retry: RetryOverrides {
        max_attempts: settings.retry.max_attempts,
        delay_ms: settings.retry.delay_ms,
      },
    }
  }
}

/// The collaborators an orchestrator talks to.
#[derive(Clone)]
pub struct Ports {
  pub store: Arc<dyn Store>,
  pub preparer: Arc<dyn TaskPreparer>,
  pub registry: Arc<IntegrationRegistry>,
  pub catalog: Arc<dyn TaskCatalog>,
  pub credentials: Arc<dyn CredentialStore>,
  pub notifier: Arc<dyn ExecutionNotifier>,
}

impl Ports {
  /// Ports with a [`NoopNotifier`].
  pub fn new(
    store: Arc<dyn Store>,
    preparer: Arc<dyn TaskPreparer>,
    registry: Arc<IntegrationRegistry>,
    catalog: Arc<dyn TaskCatalog>,
    credentials: Arc<dyn CredentialStore>,
  ) -> Self {
    Self {
      store,
      preparer,
      registry,
      catalog,
      credentials,
      notifier: Arc::new(NoopNotifier),
    }
  }

  pub fn with_notifier(mut self, notifier: Arc<dyn ExecutionNotifier>) -> Self {
    self.notifier = notifier;
    self
  }
}

/// Executes flow runs for one principal.
///
/// Runs are strictly sequential: `run_flow` takes `&mut self`, and task
/// operations within a run execute one after another.
pub struct Orchestrator {
  ports: Ports,
  principal: Principal,
  config: OrchestratorConfig,
  cache: IntegrationCache,
}

impl Orchestrator {
  pub fn new(ports: Ports, principal: Principal, config: OrchestratorConfig) -> Self {
    Self {
      ports,
      principal,
      config,
      cache: IntegrationCache::new(),
    }
  }

  /// Check a flow definition and return its execution order.
  pub fn validate(&self, def: &FlowDef) -> Result<Vec<OperationIndex>, GraphError> {
    neena_flow::validate(def)
  }

  /// Like [`validate`](Self::validate), and also resolve every operation
  /// through the catalog and registry.
  pub async fn check_flow(&self, def: &FlowDef) -> Result<Vec<OperationIndex>, RunError> {
    let flow = Flow::new(def.clone())?;
    self.check_catalog(&flow).await?;
    Ok(flow.execution_order().to_vec())
  }

  /// Run `def` to completion.
  ///
  /// Without `flow_run` a new run is created. A given non-terminal run is
  /// resumed: operations whose task run already completed are skipped. A
  /// resumed run missing from the store is recorded first. A terminal run is
  /// returned unchanged.
  ///
  /// Every failure inside the run ends up as a `Failed` run. `Err` is only
  /// returned when run state itself cannot be persisted.
  #[instrument(
    name = "run_flow",
    skip(self, def, flow_run),
    fields(flow_id = %def.flow_id, principal = %self.principal.email)
  )]
  pub async fn run_flow(
    &mut self,
    def: FlowDef,
    flow_run: Option<FlowRun>,
  ) -> Result<FlowRun, StoreError> {
    let mut flow_run = match flow_run {
      None => {
        let mut run = FlowRun::new(def.flow_id);
        run.status = RunStatus::InProgress;
        run.triggered_time = Some(Utc::now());
        self.ports.store.create_flow_run(&run).await?;
        run
      }
      Some(run) if run.status.is_terminal() => {
        info!(
          flow_run_id = %run.flow_run_id,
          status = ?run.status,
          "flow_run_already_finished"
        );
        return Ok(run);
      }
      Some(mut run) => {
        run.status = RunStatus::InProgress;
        if run.triggered_time.is_none() {
          run.triggered_time = Some(Utc::now());
        }
        self.persist_resumed(&run).await?;
        run
      }
    };

    info!(
      flow_run_id = %flow_run.flow_run_id,
      flow_name = %def.name,
      operations = def.task_operations.len(),
      "flow_run_started"
    );
    self.notify(ExecutionEvent::FlowRunStarted {
      flow_run_id: flow_run.flow_run_id,
      flow_id: flow_run.flow_id,
    });

    let outcome = self.execute(def, &mut flow_run).await;
    self.cache.clear();

    flow_run.end_time = Some(Utc::now());
    match outcome {
      Ok(()) => {
        flow_run.status = RunStatus::Completed;
        info!(
          flow_run_id = %flow_run.flow_run_id,
          task_runs = flow_run.task_runs.len(),
          "flow_run_completed"
        );
        self.notify(ExecutionEvent::FlowRunCompleted {
          flow_run_id: flow_run.flow_run_id,
        });
      }
      Err(e) => {
        flow_run.status = RunStatus::Failed;
        error!(flow_run_id = %flow_run.flow_run_id, error = %e, "flow_run_failed");
        self.notify(ExecutionEvent::FlowRunFailed {
          flow_run_id: flow_run.flow_run_id,
          error: e.to_string(),
        });
      }
    }

    self.ports.store.update_flow_run(&flow_run).await?;
    Ok(flow_run)
  }

  /// Save a resumed run, creating it and its task runs if the store has
  /// never seen it.
  async fn persist_resumed(&self, flow_run: &FlowRun) -> Result<(), StoreError> {
    match self.ports.store.get_flow_run(flow_run.flow_run_id).await {
      Ok(_) => self.ports.store.update_flow_run(flow_run).await,
      Err(StoreError::NotFound(_)) => {
        debug!(flow_run_id = %flow_run.flow_run_id, "flow_run_recorded_on_resume");
        self.ports.store.create_flow_run(flow_run).await?;
        for task_run in &flow_run.task_runs {
          self.ports.store.create_task_run(task_run).await?;
        }
        Ok(())
      }
      Err(e) => Err(e),
    }
  }

  /// Run a flow on a background task.
  pub fn spawn(
    mut self,
    def: FlowDef,
    flow_run: Option<FlowRun>,
  ) -> JoinHandle<Result<FlowRun, StoreError>> {
    tokio::spawn(async move { self.run_flow(def, flow_run).await })
  }

  async fn execute(&mut self, def: FlowDef, flow_run: &mut FlowRun) -> Result<(), RunError> {
    if flow_run.flow_id != def.flow_id {
      return Err(RunError::FlowMismatch {
        flow_id: def.flow_id,
        run_flow_id: flow_run.flow_id,
      });
    }

    let flow = Flow::new(def)?;
    self.check_catalog(&flow).await?;

    for operation in flow.operations() {
      let index = operation.index;
      match flow_run.task_run(index).map(|run| run.status) {
        Some(RunStatus::Completed) => {
          debug!(task_operation_index = index, "task_run_skipped");
          continue;
        }
        Some(status) => return Err(RunError::StaleTaskRun { index, status }),
        None => {}
      }

      self.run_task(&flow, flow_run, operation).await?;
    }

    Ok(())
  }

  /// Every operation must resolve to a registered task before the first one
  /// runs.
  async fn check_catalog(&self, flow: &Flow) -> Result<(), RunError> {
    for operation in flow.operations() {
      let definition = self
        .ports
        .catalog
        .task_definition(operation.task_definition)
        .await?;
      let record = self.ports.catalog.integration(definition.integration).await?;
      self.ports.registry.describe(&record.short_name, &definition)?;
    }

    debug!(operations = flow.execution_order().len(), "flow_catalog_checked");
    Ok(())
  }

  /// Create, execute and record the task run for one operation.
  #[instrument(
    name = "run_task",
    skip(self, flow, flow_run, operation),
    fields(
      flow_run_id = %flow_run.flow_run_id,
      task_operation_index = operation.index,
      task_operation = %operation.name,
    )
  )]
  async fn run_task(
    &mut self,
    flow: &Flow,
    flow_run: &mut FlowRun,
    operation: &TaskOperation,
  ) -> Result<(), RunError> {
    let mut task_run = TaskRun::start(flow_run.flow_run_id, operation.index);
    self.ports.store.create_task_run(&task_run).await?;
    flow_run.task_runs.push(task_run.clone());

    info!(task_run_id = %task_run.task_run_id, "task_run_started");
    self.notify(ExecutionEvent::TaskRunStarted {
      flow_run_id: flow_run.flow_run_id,
      task_run_id: task_run.task_run_id,
      task_operation_index: operation.index,
    });

    let failure = match self.invoke(flow, flow_run, operation, &mut task_run).await {
      Ok(result) if result.is_success() => {
        task_run.finish(
          RunStatus::Completed,
          result.data.unwrap_or(serde_json::Value::Null),
        );
        None
      }
      Ok(result) => {
        let message = result
          .error
          .clone()
          .unwrap_or_else(|| "task reported failure".to_string());
        let mut record = json!({ "error": message });
        if !result.metadata.is_empty() {
          record["metadata"] = serde_json::Value::Object(result.metadata);
        }
        task_run.finish(RunStatus::Failed, record);
        Some(message)
      }
      Err(e) => {
        let message = e.to_string();
        task_run.finish(RunStatus::Failed, json!({ "error": message }));
        Some(message)
      }
    };

    self.ports.store.update_task_run(&task_run).await?;
    if let Some(slot) = flow_run.task_run_mut(operation.index) {
      *slot = task_run.clone();
    }

    match failure {
      None => {
        info!(task_run_id = %task_run.task_run_id, "task_run_completed");
        self.notify(ExecutionEvent::TaskRunCompleted {
          flow_run_id: flow_run.flow_run_id,
          task_run_id: task_run.task_run_id,
          task_operation_index: operation.index,
          result: task_run.result.clone().unwrap_or_default(),
        });
        Ok(())
      }
      Some(message) => {
        error!(task_run_id = %task_run.task_run_id, error = %message, "task_run_failed");
        self.notify(ExecutionEvent::TaskRunFailed {
          flow_run_id: flow_run.flow_run_id,
          task_run_id: task_run.task_run_id,
          task_operation_index: operation.index,
          error: message.clone(),
        });
        Err(RunError::TaskFailed {
          index: operation.index,
          message,
        })
      }
    }
  }

  /// Resolve, prepare and call the task behind `operation`.
  async fn invoke(
    &mut self,
    flow: &Flow,
    flow_run: &FlowRun,
    operation: &TaskOperation,
    task_run: &mut TaskRun,
  ) -> Result<TaskResult, RunError> {
    let definition = self
      .ports
      .catalog
      .task_definition(operation.task_definition)
      .await?;
    let instance = self.integration(definition.integration).await?;
    let task = instance.resolve(&definition)?;

    let input = if task.input_shape().is_structured() {
      let (prompt, answer) = self
        .ports
        .preparer
        .generate(flow, flow_run, operation.index, &definition)
        .await?;
      task_run.task_prep_prompt = Some(prompt);
      task_run.task_prep_answer = Some(answer.clone());
      self.ports.store.update_task_run(task_run).await?;

      task.bind_input(&answer.parameters)?
    } else {
      debug!(task = %task.name(), "task_takes_no_input");
      None
    };

    let policy = task.retry_policy().apply(&self.config.retry);
    debug!(
      task = %task.name(),
      integration = %task.integration(),
      max_attempts = policy.max_attempts,
      "task_dispatch"
    );

    let result = run_with_retry(&policy, |_| {
      let task = task.clone();
      let input = input.clone();
      async move { task.invoke(input).await }
    })
    .await;

    Ok(result)
  }

  /// The connected integration for `integration_id`, connecting on first use.
  async fn integration(&mut self, integration_id: Uuid) -> Result<IntegrationInstance, RunError> {
    if let Some(instance) = self.cache.get(&integration_id) {
      return Ok(instance);
    }

    let record = self.ports.catalog.integration(integration_id).await?;
    let ctx = IntegrationContext::new(self.principal.clone(), self.ports.credentials.clone());
    let instance = self
      .ports
      .registry
      .instantiate(&record.short_name, ctx)
      .await?;

    self.cache.insert(integration_id, instance.clone());
    Ok(instance)
  }

  fn notify(&self, event: ExecutionEvent) {
    self.ports.notifier.notify(event);
  }
}
