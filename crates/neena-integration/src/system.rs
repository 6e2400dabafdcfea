//! Built-in tasks that need no external account.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use neena_task::{RetryPolicy, TaskError, TaskOutput, TaskResult};
use reqwest::{Client, Method};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::context::IntegrationContext;
use crate::error::DispatchError;
use crate::input::{InputField, TaskInput};
use crate::registry::Integration;
use crate::table::{TaskSpec, TaskTable};

pub struct SystemIntegration {
  client: Client,
}

#[derive(Debug, Deserialize)]
pub struct AdditionInput {
  pub a: i64,
  pub b: i64,
}

impl TaskInput for AdditionInput {
  const TYPE_NAME: &'static str = "AdditionInput";

  fn fields() -> Vec<InputField> {
    vec![
      InputField::required("a", "int", "First addend"),
      InputField::required("b", "int", "Second addend"),
    ]
  }
}

#[derive(Debug, Deserialize)]
pub struct EchoInput {
  pub message: String,
}

impl TaskInput for EchoInput {
  const TYPE_NAME: &'static str = "EchoInput";

  fn fields() -> Vec<InputField> {
    vec![InputField::required("message", "str", "Text to return unchanged")]
  }
}

#[derive(Debug, Deserialize)]
pub struct HttpRequestInput {
  pub method: String,
  pub url: String,
  #[serde(default)]
  pub headers: HashMap<String, String>,
  #[serde(default)]
  pub body: Option<Value>,
}

impl TaskInput for HttpRequestInput {
  const TYPE_NAME: &'static str = "HttpRequestInput";

  fn fields() -> Vec<InputField> {
    vec![
      InputField::required("method", "str", "HTTP method, e.g. GET or POST"),
      InputField::required("url", "str", "Absolute URL to call"),
      InputField::optional("headers", "dict[str, str]", "Request headers"),
      InputField::optional("body", "json", "JSON request body"),
    ]
  }
}

#[async_trait]
impl Integration for SystemIntegration {
  const NAME: &'static str = "System";
  const SHORT_NAME: &'static str = "system";

  async fn connect(_ctx: IntegrationContext) -> Result<Self, DispatchError> {
    let client = Client::builder()
      .user_agent(concat!("neena/", env!("CARGO_PKG_VERSION")))
      .build()
      .map_err(|e| DispatchError::construction(Self::SHORT_NAME, e.to_string()))?;
    Ok(Self { client })
  }

  fn tasks() -> TaskTable<Self> {
    TaskTable::new()
      .task_with_input(
        "addition",
        TaskSpec::new("Add two integers").retry(RetryPolicy::no_retry()),
        Self::addition,
      )
      .task_with_input(
        "echo",
        TaskSpec::new("Return the given message").retry(RetryPolicy::no_retry()),
        Self::echo,
      )
      .task(
        "current_time",
        TaskSpec::new("Current UTC time in RFC 3339 format").retry(RetryPolicy::no_retry()),
        Self::current_time,
      )
      .task_with_input(
        "http_request",
        TaskSpec::new("Send an HTTP request and return status, headers and body"),
        Self::http_request,
      )
  }
}

impl SystemIntegration {
  async fn addition(self: Arc<Self>, input: AdditionInput) -> Result<Value, TaskError> {
    input
      .a
      .checked_add(input.b)
      .map(|sum| json!(sum))
      .ok_or_else(|| TaskError::failed(format!("{} + {} overflows", input.a, input.b)))
  }

  async fn echo(self: Arc<Self>, input: EchoInput) -> Result<Value, TaskError> {
    Ok(Value::String(input.message))
  }

  async fn current_time(self: Arc<Self>) -> Result<Value, TaskError> {
    Ok(json!(chrono::Utc::now().to_rfc3339()))
  }

  /// Server errors are raised so the call is retried; client errors and an
  /// unsupported method come back as a failed result without retrying.
  async fn http_request(self: Arc<Self>, input: HttpRequestInput) -> Result<TaskOutput, TaskError> {
    let method = match parse_method(&input.method) {
      Ok(method) => method,
      Err(e) => return Ok(TaskResult::failure(e.to_string()).into()),
    };

    let mut request = self.client.request(method, &input.url);
    for (key, value) in &input.headers {
      request = request.header(key, value);
    }
    if let Some(body) = &input.body {
      request = request.json(body);
    }

    let response = request.send().await?;
    let status = response.status();
    let headers: HashMap<String, String> = response
      .headers()
      .iter()
      .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.as_str().to_string(), v.to_string())))
      .collect();

    let text = response.text().await?;
    let body = serde_json::from_str(&text).unwrap_or(Value::String(text));

    if status.is_server_error() {
      return Err(TaskError::failed(format!("{} returned {}", input.url, status)));
    }

    let output = json!({
      "status": status.as_u16(),
      "headers": headers,
      "body": body,
    });

    if status.is_client_error() {
      let result = TaskResult::failure(format!("{} returned {}", input.url, status))
        .with_metadata("response", output);
      return Ok(result.into());
    }

    Ok(output.into())
  }
}

fn parse_method(method: &str) -> Result<Method, TaskError> {
  match method.to_uppercase().as_str() {
    "GET" => Ok(Method::GET),
    "POST" => Ok(Method::POST),
    "PUT" => Ok(Method::PUT),
    "DELETE" => Ok(Method::DELETE),
    "PATCH" => Ok(Method::PATCH),
    "HEAD" => Ok(Method::HEAD),
    _ => Err(TaskError::invalid_input(
      "method",
      format!("unsupported HTTP method: {}", method),
    )),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_parse_method_is_case_insensitive() {
    assert_eq!(parse_method("post").unwrap(), Method::POST);
    assert!(matches!(
      parse_method("TRACE"),
      Err(TaskError::InvalidInput { .. })
    ));
  }
}
