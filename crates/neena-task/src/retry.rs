use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use serde_json::json;
use tracing::{debug, error, warn};

use crate::result::{TaskOutput, TaskResult};

/// How often and how patiently a task is retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
  /// Retries after the first call, so a task runs at most
  /// `max_attempts + 1` times.
  pub max_attempts: u32,
  /// Pause between a failed attempt and the next one.
  pub delay: Duration,
}

impl Default for RetryPolicy {
  fn default() -> Self {
    Self {
      max_attempts: 3,
      delay: Duration::from_secs(2),
    }
  }
}

impl RetryPolicy {
  pub fn new(max_attempts: u32, delay: Duration) -> Self {
    Self {
      max_attempts,
      delay,
    }
  }

  /// A policy that calls the task exactly once.
  pub fn no_retry() -> Self {
    Self::new(0, Duration::ZERO)
  }

  /// Merge per-invocation overrides into this policy.
  pub fn apply(self, overrides: &RetryOverrides) -> Self {
    Self {
      max_attempts: overrides.max_attempts.unwrap_or(self.max_attempts),
      delay: overrides
        .delay_ms
        .map(Duration::from_millis)
        .unwrap_or(self.delay),
    }
  }
}

/// Runtime overrides for a [`RetryPolicy`]. Unset fields keep the policy's value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetryOverrides {
  pub max_attempts: Option<u32>,
  pub delay_ms: Option<u64>,
}

/// Run `work` until it succeeds or the policy is exhausted.
///
/// `work` receives the 1-based attempt number. An `Ok` value is wrapped as a
/// success unless it already is a [`TaskResult`], which is returned untouched.
/// After the last failed attempt the error's message becomes a failed result.
pub async fn run_with_retry<F, Fut, T, E>(policy: &RetryPolicy, mut work: F) -> TaskResult
where
  F: FnMut(u32) -> Fut,
  Fut: Future<Output = Result<T, E>>,
  T: Into<TaskOutput>,
  E: Display,
{
  let total = policy.max_attempts.saturating_add(1);
  let mut last_error = String::new();

  for attempt in 1..=total {
    match work(attempt).await {
      Ok(output) => {
        debug!(attempt, "task_attempt_succeeded");
        return match output.into() {
          TaskOutput::Value(data) => {
            TaskResult::success(data).with_metadata("attempts", json!(attempt))
          }
          TaskOutput::Result(result) => result,
        };
      }
      Err(e) => {
        last_error = e.to_string();
        if attempt < total {
          warn!(
            attempt,
            max_attempts = total,
            delay_ms = policy.delay.as_millis() as u64,
            error = %last_error,
            "task_attempt_failed"
          );
          tokio::time::sleep(policy.delay).await;
        }
      }
    }
  }

  error!(attempts = total, error = %last_error, "task_retries_exhausted");
  TaskResult::failure(last_error).with_metadata("attempts", json!(total))
}
