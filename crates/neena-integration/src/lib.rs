//! Neena Integration
//!
//! Resolves a logical task (a [`TaskDefinition`](neena_config::TaskDefinition))
//! to something that can be called:
//!
//! - An [`Integration`] is a connected client for one external system. It
//!   declares its callables in a [`TaskTable`].
//! - The [`IntegrationRegistry`] is filled explicitly at start-up and keyed by
//!   short name. [`IntegrationRegistry::instantiate`] connects an integration
//!   for a principal and yields an [`IntegrationInstance`].
//! - [`IntegrationInstance::resolve`] returns a [`BoundTask`]: the
//!   callable plus its input shape and retry policy.
//! - A [`TaskCatalog`] maps task definition and integration ids to the records
//!   needed for that lookup.
//!
//! The built-in [`SystemIntegration`] provides a handful of tasks that need no
//! external account.

mod catalog;
mod context;
mod error;
mod input;
mod registry;
mod system;
mod table;

pub use catalog::{InMemoryCatalog, TaskCatalog, integration_id, task_definition_id};
pub use context::{CredentialStore, InMemoryCredentials, IntegrationContext, Principal};
pub use error::{DispatchError, InputError};
pub use input::{InputField, InputShape, TaskInput};
pub use registry::{
  Integration, IntegrationDescriptor, IntegrationInstance, IntegrationRegistry, TaskDescriptor,
};
pub use system::{AdditionInput, EchoInput, HttpRequestInput, SystemIntegration};
pub use table::{BoundTask, TaskSpec, TaskTable};
