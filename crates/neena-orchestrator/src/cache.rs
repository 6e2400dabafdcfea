//! Per-run cache of connected integrations.
//!
//! An integration is connected at most once per flow run, on first use, and
//! shared by every task operation that needs it. The cache is emptied when
//! the run ends so instances never outlive it.

use std::collections::HashMap;

use neena_integration::IntegrationInstance;
use uuid::Uuid;

/// Connected integrations keyed by integration record id.
#[derive(Debug, Default)]
pub struct IntegrationCache {
  instances: HashMap<Uuid, IntegrationInstance>,
}

impl IntegrationCache {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn get(&self, integration_id: &Uuid) -> Option<IntegrationInstance> {
    self.instances.get(integration_id).cloned()
  }

  pub fn insert(&mut self, integration_id: Uuid, instance: IntegrationInstance) {
    self.instances.insert(integration_id, instance);
  }

  pub fn clear(&mut self) {
    self.instances.clear();
  }
}
