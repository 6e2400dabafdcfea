//! Neena Config
//!
//! Serializable types shared by every Neena crate:
//!
//! - Flow definitions ([`FlowDef`], [`TaskOperation`], [`Dependency`]) as they
//!   arrive from a JSON file or a database blob, before validation.
//! - Catalog entries ([`TaskDefinition`], [`IntegrationRecord`]) describing the
//!   callables a task operation can refer to.
//! - Task preparation values ([`TaskPrepPrompt`], [`TaskPrepAnswer`]) recorded
//!   on each task run.
//! - Runtime [`Settings`].

mod catalog;
mod flow;
mod preparation;
mod settings;

pub use catalog::{CatalogDef, IntegrationRecord, TaskDefinition, TaskParameter};
pub use flow::{Dependency, FlowDef, OperationIndex, TaskOperation};
pub use preparation::{ParameterBinding, PromptMessage, TaskPrepAnswer, TaskPrepPrompt};
pub use settings::{ConfigError, RetrySettings, Settings};
