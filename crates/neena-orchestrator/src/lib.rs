//! Neena Orchestrator
//!
//! Runs a flow to completion. The [`Orchestrator`] validates and orders the
//! flow, then for each task operation in turn creates a task run, prepares its
//! parameters, dispatches it to an integration through the retry envelope and
//! records the outcome. The first failed operation fails the whole run.
//!
//! Progress is reported through an [`ExecutionNotifier`].

mod cache;
mod error;
mod events;
mod orchestrator;

pub use cache::IntegrationCache;
pub use error::RunError;
pub use events::{ChannelNotifier, ExecutionEvent, ExecutionNotifier, NoopNotifier};
pub use orchestrator::{Orchestrator, OrchestratorConfig, Ports};
