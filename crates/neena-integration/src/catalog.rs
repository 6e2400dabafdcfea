use std::collections::HashMap;

use async_trait::async_trait;
use neena_config::{CatalogDef, IntegrationRecord, TaskDefinition, TaskParameter};
use uuid::Uuid;

use crate::error::DispatchError;
use crate::registry::IntegrationRegistry;

/// Lookup of task definitions and the integrations that own them.
#[async_trait]
pub trait TaskCatalog: Send + Sync {
  async fn task_definition(&self, id: Uuid) -> Result<TaskDefinition, DispatchError>;

  async fn integration(&self, id: Uuid) -> Result<IntegrationRecord, DispatchError>;
}

/// Stable id for an integration registered under `short_name`.
pub fn integration_id(short_name: &str) -> Uuid {
  Uuid::new_v5(&Uuid::NAMESPACE_OID, format!("neena.integration.{}", short_name).as_bytes())
}

/// Stable id for task `task_name` of integration `short_name`.
pub fn task_definition_id(short_name: &str, task_name: &str) -> Uuid {
  Uuid::new_v5(
    &Uuid::NAMESPACE_OID,
    format!("neena.task.{}.{}", short_name, task_name).as_bytes(),
  )
}

/// A catalog held in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
  definitions: HashMap<Uuid, TaskDefinition>,
  integrations: HashMap<Uuid, IntegrationRecord>,
}

impl InMemoryCatalog {
  pub fn new() -> Self {
    Self::default()
  }

  /// Build catalog entries for everything in `registry`.
  ///
  /// Ids come from [`integration_id`] and [`task_definition_id`], so the same
  /// registry always yields the same catalog.
  pub fn from_registry(registry: &IntegrationRegistry) -> Self {
    let mut catalog = Self::new();

    for descriptor in registry.descriptors() {
      let owner = integration_id(descriptor.short_name);
      catalog.insert_integration(IntegrationRecord {
        id: owner,
        name: descriptor.name.to_string(),
        short_name: descriptor.short_name.to_string(),
      });

      for task in &descriptor.tasks {
        let parameters = task
          .shape
          .fields()
          .iter()
          .zip(0u32..)
          .map(|(field, position)| TaskParameter {
            name: field.name.to_string(),
            data_type: field.data_type.to_string(),
            position,
            doc_string: field.doc.to_string(),
            optional: field.optional,
          })
          .collect();

        catalog.insert_task_definition(TaskDefinition {
          id: task_definition_id(descriptor.short_name, &task.name),
          task_name: task.name.clone(),
          integration: owner,
          parameters,
          input_type: task.shape.type_name().map(str::to_string),
          output_type: None,
          description: task.spec.description.clone(),
          method_name: format!("{}.{}", descriptor.short_name, task.name),
        });
      }
    }

    catalog
  }

  /// Build a catalog from a catalog file.
  pub fn from_def(def: CatalogDef) -> Self {
    let mut catalog = Self::new();
    catalog.extend(def);
    catalog
  }

  pub fn extend(&mut self, def: CatalogDef) {
    for record in def.integrations {
      self.insert_integration(record);
    }
    for definition in def.task_definitions {
      self.insert_task_definition(definition);
    }
  }

  /// Export the catalog in file form, sorted for stable output.
  pub fn to_def(&self) -> CatalogDef {
    CatalogDef {
      integrations: self.integrations().into_iter().cloned().collect(),
      task_definitions: self.task_definitions().into_iter().cloned().collect(),
    }
  }

  pub fn insert_task_definition(&mut self, definition: TaskDefinition) {
    self.definitions.insert(definition.id, definition);
  }

  pub fn insert_integration(&mut self, record: IntegrationRecord) {
    self.integrations.insert(record.id, record);
  }

  /// Task definitions sorted by method name.
  pub fn task_definitions(&self) -> Vec<&TaskDefinition> {
    let mut definitions: Vec<&TaskDefinition> = self.definitions.values().collect();
    definitions.sort_by(|a, b| a.method_name.cmp(&b.method_name));
    definitions
  }

  pub fn integrations(&self) -> Vec<&IntegrationRecord> {
    let mut records: Vec<&IntegrationRecord> = self.integrations.values().collect();
    records.sort_by(|a, b| a.short_name.cmp(&b.short_name));
    records
  }
}

#[async_trait]
impl TaskCatalog for InMemoryCatalog {
  async fn task_definition(&self, id: Uuid) -> Result<TaskDefinition, DispatchError> {
    self
      .definitions
      .get(&id)
      .cloned()
      .ok_or(DispatchError::TaskDefinitionNotFound { id })
  }

  async fn integration(&self, id: Uuid) -> Result<IntegrationRecord, DispatchError> {
    self
      .integrations
      .get(&id)
      .cloned()
      .ok_or(DispatchError::IntegrationNotFound { id })
  }
}
