use std::collections::HashSet;

use neena_config::{FlowDef, OperationIndex, TaskOperation};
use tracing::debug;
use uuid::Uuid;

use crate::error::GraphError;
use crate::graph::Graph;

/// A flow definition that passed structural validation.
///
/// Every operation carries its `sorted_index`, and [`Flow::execution_order`]
/// lists operation indices in the order they must run.
#[derive(Debug, Clone)]
pub struct Flow {
  def: FlowDef,
  graph: Graph,
  order: Vec<OperationIndex>,
}

impl Flow {
  /// Validate a definition and compute its execution order.
  ///
  /// Rejects empty flows, duplicate or malformed operation names, duplicate
  /// indices, dangling dependencies and cycles.
  pub fn new(mut def: FlowDef) -> Result<Self, GraphError> {
    let (graph, order) = check(&def)?;

    for op in &mut def.task_operations {
      op.sorted_index = order.iter().position(|&index| index == op.index);
    }

    debug!(
      flow_id = %def.flow_id,
      operations = def.task_operations.len(),
      order = ?order,
      "flow_validated"
    );

    Ok(Self { def, graph, order })
  }

  pub fn flow_id(&self) -> Uuid {
    self.def.flow_id
  }

  pub fn name(&self) -> &str {
    &self.def.name
  }

  pub fn request(&self) -> Option<&str> {
    self.def.request.as_deref()
  }

  /// Operation indices in execution order.
  pub fn execution_order(&self) -> &[OperationIndex] {
    &self.order
  }

  pub fn operation(&self, index: OperationIndex) -> Option<&TaskOperation> {
    self.def.operation(index)
  }

  /// Operations in execution order.
  pub fn operations(&self) -> impl Iterator<Item = &TaskOperation> {
    self.order.iter().filter_map(|&index| self.def.operation(index))
  }

  pub fn graph(&self) -> &Graph {
    &self.graph
  }

  /// The definition with `sorted_index` filled in.
  pub fn definition(&self) -> &FlowDef {
    &self.def
  }
}

/// Validate a definition without taking ownership, returning its order.
pub fn validate(def: &FlowDef) -> Result<Vec<OperationIndex>, GraphError> {
  check(def).map(|(_, order)| order)
}

fn check(def: &FlowDef) -> Result<(Graph, Vec<OperationIndex>), GraphError> {
  if def.name.trim().is_empty() {
    return Err(GraphError::MissingName);
  }
  if def.task_operations.is_empty() {
    return Err(GraphError::Empty);
  }

  let mut names = HashSet::new();
  for op in &def.task_operations {
    if !is_valid_name(&op.name) {
      return Err(GraphError::InvalidName {
        name: op.name.clone(),
      });
    }
    if !names.insert(op.name.as_str()) {
      return Err(GraphError::DuplicateName {
        name: op.name.clone(),
      });
    }
  }

  let graph = Graph::build(&def.task_operations, &def.dependencies)?;
  if graph.is_cyclic() {
    return Err(GraphError::Cycle);
  }
  let order = graph.topological_sort()?;

  Ok((graph, order))
}

fn is_valid_name(name: &str) -> bool {
  !name.is_empty()
    && name
      .chars()
      .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}
