//! Neena Task
//!
//! The envelope every task invocation goes through. A task callable returns
//! either a plain JSON value or a ready-made [`TaskResult`]; [`run_with_retry`]
//! retries raised errors according to a [`RetryPolicy`] and always hands back a
//! [`TaskResult`], so callers never see a task error directly.
//!
//! Nothing here knows about flows or runs.

mod error;
mod result;
mod retry;

pub use error::TaskError;
pub use result::{TaskOutput, TaskResult, TaskResultStatus};
pub use retry::{RetryOverrides, RetryPolicy, run_with_retry};
