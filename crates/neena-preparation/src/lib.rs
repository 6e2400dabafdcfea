//! Neena Preparation
//!
//! Produces the parameter bindings for a task operation before it runs.
//!
//! The [`TaskPreparer`] trait is the port the orchestrator calls. Two
//! implementations are provided:
//!
//! - [`CompletionPreparer`] renders a prompt with [`PromptBuilder`], sends it to
//!   a [`CompletionClient`] (the language model boundary) and parses the reply.
//! - [`FixedPreparer`] answers from bindings supplied up front.

mod completion;
mod error;
mod fixed;
mod prompt;

pub use completion::{CompletionClient, CompletionPreparer, parse_answer};
pub use error::PreparationError;
pub use fixed::FixedPreparer;
pub use prompt::PromptBuilder;

use async_trait::async_trait;
use neena_config::{OperationIndex, TaskDefinition, TaskPrepAnswer, TaskPrepPrompt};
use neena_flow::Flow;
use neena_store::FlowRun;

/// Generates the prompt and answer for one task operation.
///
/// Implementations must not depend on anything but their arguments and their
/// own configuration. An empty answer is only valid for a task without
/// required parameters.
#[async_trait]
pub trait TaskPreparer: Send + Sync {
  async fn generate(
    &self,
    flow: &Flow,
    flow_run: &FlowRun,
    task_operation_index: OperationIndex,
    task_definition: &TaskDefinition,
  ) -> Result<(TaskPrepPrompt, TaskPrepAnswer), PreparationError>;
}
