//! Registry, dispatch and catalog behaviour across the public API.

use std::sync::Arc;

use async_trait::async_trait;
use neena_config::ParameterBinding;
use neena_integration::{
  DispatchError, InMemoryCatalog, InMemoryCredentials, InputError, InputShape, Integration,
  IntegrationContext, IntegrationRegistry, Principal, SystemIntegration, TaskCatalog, TaskSpec,
  TaskTable, integration_id, task_definition_id,
};
use neena_task::{RetryPolicy, TaskError, TaskOutput, run_with_retry};
use serde_json::{Value, json};

/// An integration that needs a token to connect.
struct Ledger {
  token: String,
}

#[async_trait]
impl Integration for Ledger {
  const NAME: &'static str = "Ledger";
  const SHORT_NAME: &'static str = "ledger";

  async fn connect(ctx: IntegrationContext) -> Result<Self, DispatchError> {
    let token = ctx.require_credential(Self::SHORT_NAME).await?;
    Ok(Self { token })
  }

  fn tasks() -> TaskTable<Self> {
    TaskTable::new().task("whoami", TaskSpec::new("Echo the token"), |this: Arc<Self>| async move {
      Ok::<_, TaskError>(json!(this.token))
    })
  }

  async fn check_connectivity(&self) -> Result<(), TaskError> {
    if self.token.starts_with("tok-") {
      Ok(())
    } else {
      Err(TaskError::failed("token rejected"))
    }
  }
}

fn registry() -> IntegrationRegistry {
  let mut registry = IntegrationRegistry::new();
  registry.register::<SystemIntegration>().register::<Ledger>();
  registry
}

fn context(credentials: InMemoryCredentials) -> IntegrationContext {
  IntegrationContext::new(Principal::new("ops@example.com"), Arc::new(credentials))
}

fn binding(name: &str, value: Value) -> ParameterBinding {
  ParameterBinding::new(name, value)
}

#[tokio::test]
async fn test_dispatch_addition_by_dotted_method_name() {
  let instance = registry()
    .instantiate("system", context(InMemoryCredentials::new()))
    .await
    .unwrap();

  let mut definition = InMemoryCatalog::from_registry(&registry())
    .task_definition(task_definition_id("system", "addition"))
    .await
    .unwrap();
  definition.method_name = "integrations.system.System.addition".to_string();

  let task = instance.resolve(&definition).unwrap();
  assert_eq!(task.name(), "addition");
  assert!(task.input_shape().is_structured());

  let input = task
    .bind_input(&[binding("a", json!(2)), binding("b", json!(40))])
    .unwrap();
  let output = task.invoke(input).await.unwrap();

  assert_eq!(output, TaskOutput::Value(json!(42)));
}

#[tokio::test]
async fn test_zero_argument_task_has_no_input_shape() {
  let instance = registry()
    .instantiate("system", context(InMemoryCredentials::new()))
    .await
    .unwrap();

  let task = instance.resolve_method("current_time").unwrap();
  assert_eq!(task.input_shape(), &InputShape::None);
  assert_eq!(task.bind_input(&[]).unwrap(), None);

  match task.invoke(None).await.unwrap() {
    TaskOutput::Value(Value::String(time)) => assert!(time.contains('T')),
    other => panic!("unexpected output: {:?}", other),
  }
}

#[tokio::test]
async fn test_unknown_integration_and_method() {
  let registry = registry();

  let err = registry
    .instantiate("trello", context(InMemoryCredentials::new()))
    .await
    .unwrap_err();
  assert!(matches!(err, DispatchError::UnknownIntegration { short_name } if short_name == "trello"));

  let instance = registry
    .instantiate("system", context(InMemoryCredentials::new()))
    .await
    .unwrap();
  let err = instance.resolve_method("subtraction").unwrap_err();
  assert!(matches!(err, DispatchError::UnknownMethod { .. }));
}

#[tokio::test]
async fn test_bind_input_rejects_bad_bindings() {
  let instance = registry()
    .instantiate("system", context(InMemoryCredentials::new()))
    .await
    .unwrap();
  let task = instance.resolve_method("addition").unwrap();

  let err = task
    .bind_input(&[binding("a", json!(1)), binding("c", json!(2))])
    .unwrap_err();
  assert!(matches!(err, InputError::UnknownField { field, .. } if field == "c"));

  let err = task
    .bind_input(&[binding("a", json!(1)), binding("a", json!(2))])
    .unwrap_err();
  assert!(matches!(err, InputError::DuplicateField { field, .. } if field == "a"));

  let err = task.bind_input(&[binding("a", json!(1))]).unwrap_err();
  assert!(matches!(err, InputError::MissingField { field, .. } if field == "b"));

  let err = task
    .bind_input(&[binding("a", json!("one")), binding("b", json!(2))])
    .unwrap_err();
  assert!(matches!(err, InputError::Decode { .. }));
}

#[tokio::test]
async fn test_optional_fields_may_be_omitted() {
  let instance = registry()
    .instantiate("system", context(InMemoryCredentials::new()))
    .await
    .unwrap();
  let task = instance.resolve_method("http_request").unwrap();

  let input = task
    .bind_input(&[
      binding("method", json!("GET")),
      binding("url", json!("http://localhost/health")),
    ])
    .unwrap();

  assert_eq!(
    input,
    Some(json!({ "method": "GET", "url": "http://localhost/health" }))
  );
}

#[tokio::test]
async fn test_unsupported_http_method_is_not_retried() {
  let instance = registry()
    .instantiate("system", context(InMemoryCredentials::new()))
    .await
    .unwrap();
  let task = instance.resolve_method("http_request").unwrap();
  let input = task
    .bind_input(&[
      binding("method", json!("TRACE")),
      binding("url", json!("http://localhost/health")),
    ])
    .unwrap();

  let mut calls = 0;
  let result = run_with_retry(&RetryPolicy::default(), |_| {
    calls += 1;
    let task = task.clone();
    let input = input.clone();
    async move { task.invoke(input).await }
  })
  .await;

  assert_eq!(calls, 1);
  assert!(!result.is_success());
  assert!(
    result
      .error
      .as_deref()
      .unwrap()
      .contains("unsupported HTTP method: TRACE")
  );
}

#[tokio::test]
async fn test_constructor_reads_principal_credential() {
  let registry = registry();

  let err = registry
    .instantiate("ledger", context(InMemoryCredentials::new()))
    .await
    .unwrap_err();
  assert!(matches!(err, DispatchError::MissingCredential { .. }));

  let credentials = InMemoryCredentials::new();
  credentials
    .insert(&Principal::new("ops@example.com"), "ledger", "tok-123")
    .await;
  let instance = registry.instantiate("ledger", context(credentials)).await.unwrap();

  instance.check_connectivity().await.unwrap();
  let output = instance.resolve_method("whoami").unwrap().invoke(None).await.unwrap();
  assert_eq!(output, TaskOutput::Value(json!("tok-123")));
}

#[tokio::test]
async fn test_catalog_from_registry() {
  let catalog = InMemoryCatalog::from_registry(&registry());

  let id = task_definition_id("system", "addition");
  let definition = catalog.task_definition(id).await.unwrap();
  assert_eq!(definition.integration, integration_id("system"));
  assert_eq!(definition.method(), "addition");
  assert_eq!(definition.input_type.as_deref(), Some("AdditionInput"));

  let params: Vec<(&str, u32)> = definition
    .parameters
    .iter()
    .map(|p| (p.name.as_str(), p.position))
    .collect();
  assert_eq!(params, vec![("a", 0), ("b", 1)]);

  let record = catalog.integration(definition.integration).await.unwrap();
  assert_eq!(record.short_name, "system");

  let zero_arg = catalog
    .task_definition(task_definition_id("system", "current_time"))
    .await
    .unwrap();
  assert!(zero_arg.parameters.is_empty());
  assert_eq!(zero_arg.input_type, None);

  let missing = catalog.task_definition(uuid::Uuid::nil()).await.unwrap_err();
  assert!(matches!(missing, DispatchError::TaskDefinitionNotFound { .. }));
}

#[test]
fn test_descriptors_sorted_by_short_name() {
  let registry = registry();
  let names: Vec<&str> = registry.descriptors().map(|d| d.short_name).collect();
  assert_eq!(names, vec!["ledger", "system"]);
}
