use std::collections::{BTreeMap, BTreeSet};

use neena_config::{Dependency, OperationIndex, TaskOperation};

use crate::error::GraphError;

/// Dependency graph over task operation indices.
///
/// Adjacency is kept in ordered collections so every traversal visits nodes in
/// ascending index order.
#[derive(Debug, Clone)]
pub struct Graph {
  /// index -> indices that depend on it.
  downstream: BTreeMap<OperationIndex, BTreeSet<OperationIndex>>,
  /// index -> indices it depends on.
  upstream: BTreeMap<OperationIndex, BTreeSet<OperationIndex>>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
  Unvisited,
  OnStack,
  Done,
}

impl Graph {
  /// Build a graph, checking that indices are unique and that every
  /// dependency endpoint names a declared operation.
  pub fn build(
    operations: &[TaskOperation],
    dependencies: &[Dependency],
  ) -> Result<Self, GraphError> {
    let mut downstream: BTreeMap<OperationIndex, BTreeSet<OperationIndex>> = BTreeMap::new();
    let mut upstream: BTreeMap<OperationIndex, BTreeSet<OperationIndex>> = BTreeMap::new();

    for op in operations {
      if downstream.insert(op.index, BTreeSet::new()).is_some() {
        return Err(GraphError::DuplicateIndex { index: op.index });
      }
      upstream.insert(op.index, BTreeSet::new());
    }

    for dep in dependencies {
      let (source, target) = (dep.source_task_operation, dep.target_task_operation);
      if !downstream.contains_key(&source) || !downstream.contains_key(&target) {
        return Err(GraphError::UnknownEndpoint {
          source_index: source,
          target_index: target,
        });
      }
      downstream.entry(source).or_default().insert(target);
      upstream.entry(target).or_default().insert(source);
    }

    Ok(Self {
      downstream,
      upstream,
    })
  }

  /// Number of operations in the graph.
  pub fn len(&self) -> usize {
    self.downstream.len()
  }

  pub fn is_empty(&self) -> bool {
    self.downstream.is_empty()
  }

  /// Whether any operation can reach itself. Self-loops count.
  ///
  /// Depth-first search over an explicit stack of frames, so long chains do
  /// not grow the call stack.
  pub fn is_cyclic(&self) -> bool {
    let mut marks: BTreeMap<OperationIndex, Mark> = self
      .downstream
      .keys()
      .map(|&index| (index, Mark::Unvisited))
      .collect();

    for &root in self.downstream.keys() {
      if marks.get(&root) != Some(&Mark::Unvisited) {
        continue;
      }

      marks.insert(root, Mark::OnStack);
      let mut stack = vec![(root, self.successors(root))];

      while let Some(frame) = stack.last_mut() {
        let node = frame.0;
        match frame.1.next() {
          Some(next) => match marks.get(&next).copied().unwrap_or(Mark::Unvisited) {
            Mark::OnStack => return true,
            Mark::Unvisited => {
              marks.insert(next, Mark::OnStack);
              stack.push((next, self.successors(next)));
            }
            Mark::Done => {}
          },
          None => {
            marks.insert(node, Mark::Done);
            stack.pop();
          }
        }
      }
    }

    false
  }

  /// Kahn's algorithm. When several operations are ready at once the smallest
  /// index goes first, so the result depends only on the graph.
  pub fn topological_sort(&self) -> Result<Vec<OperationIndex>, GraphError> {
    let mut in_degree: BTreeMap<OperationIndex, usize> = self
      .upstream
      .iter()
      .map(|(&index, sources)| (index, sources.len()))
      .collect();

    let mut ready: BTreeSet<OperationIndex> = in_degree
      .iter()
      .filter(|&(_, &degree)| degree == 0)
      .map(|(&index, _)| index)
      .collect();

    let mut order = Vec::with_capacity(self.len());

    while let Some(index) = ready.pop_first() {
      order.push(index);

      for &next in self.downstream.get(&index).into_iter().flatten() {
        if let Some(degree) = in_degree.get_mut(&next) {
          *degree -= 1;
          if *degree == 0 {
            ready.insert(next);
          }
        }
      }
    }

    if order.len() != self.len() {
      return Err(GraphError::Cycle);
    }

    Ok(order)
  }

  /// Operations that `index` depends on, ascending.
  pub fn upstream(&self, index: OperationIndex) -> Vec<OperationIndex> {
    self
      .upstream
      .get(&index)
      .map(|set| set.iter().copied().collect())
      .unwrap_or_default()
  }

  /// Operations that depend on `index`, ascending.
  pub fn downstream(&self, index: OperationIndex) -> Vec<OperationIndex> {
    self
      .downstream
      .get(&index)
      .map(|set| set.iter().copied().collect())
      .unwrap_or_default()
  }

  fn successors(&self, index: OperationIndex) -> impl Iterator<Item = OperationIndex> + '_ {
    self.downstream.get(&index).into_iter().flatten().copied()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use uuid::Uuid;

  fn ops(indices: &[OperationIndex]) -> Vec<TaskOperation> {
    indices
      .iter()
      .map(|&index| TaskOperation {
        index,
        name: format!("op_{}", index),
        task_definition: Uuid::nil(),
        instruction: None,
        sorted_index: None,
      })
      .collect()
  }

  fn deps(edges: &[(OperationIndex, OperationIndex)]) -> Vec<Dependency> {
    edges.iter().map(|&(s, t)| Dependency::new(s, t)).collect()
  }

  #[test]
  fn test_three_node_cycle() {
    let graph = Graph::build(&ops(&[0, 1, 2]), &deps(&[(0, 1), (1, 2), (2, 0)])).unwrap();

    assert!(graph.is_cyclic());
    assert_eq!(graph.topological_sort(), Err(GraphError::Cycle));
  }

  #[test]
  fn test_self_loop_is_cycle() {
    let graph = Graph::build(&ops(&[0, 1]), &deps(&[(0, 1), (1, 1)])).unwrap();
    assert!(graph.is_cyclic());
  }

  #[test]
  fn test_long_chain_is_acyclic() {
    let count: OperationIndex = 100_000;
    let indices: Vec<OperationIndex> = (0..count).collect();
    let edges: Vec<(OperationIndex, OperationIndex)> = (1..count).map(|i| (i - 1, i)).collect();
    let graph = Graph::build(&ops(&indices), &deps(&edges)).unwrap();

    assert!(!graph.is_cyclic());
    assert_eq!(graph.topological_sort().unwrap(), indices);
  }

  #[test]
  fn test_long_chain_closing_back_edge_is_cycle() {
    let count: OperationIndex = 100_000;
    let indices: Vec<OperationIndex> = (0..count).collect();
    let mut edges: Vec<(OperationIndex, OperationIndex)> = (1..count).map(|i| (i - 1, i)).collect();
    edges.push((count - 1, 0));
    let graph = Graph::build(&ops(&indices), &deps(&edges)).unwrap();

    assert!(graph.is_cyclic());
  }

  #[test]
  fn test_chain_order() {
    let graph = Graph::build(&ops(&[2, 0, 1]), &deps(&[(0, 1), (1, 2)])).unwrap();

    assert!(!graph.is_cyclic());
    assert_eq!(graph.topological_sort().unwrap(), vec![0, 1, 2]);
  }

  #[test]
  fn test_join_order_uses_ascending_tie_break() {
    let graph = Graph::build(&ops(&[0, 1, 2]), &deps(&[(0, 2), (1, 2)])).unwrap();

    assert_eq!(graph.topological_sort().unwrap(), vec![0, 1, 2]);
    assert_eq!(graph.upstream(2), vec![0, 1]);
    assert_eq!(graph.downstream(0), vec![2]);
    assert!(graph.downstream(2).is_empty());
  }

  #[test]
  fn test_ready_set_prefers_smallest_index() {
    // 5 -> 1 makes 1 wait; 3 is ready earlier and must come before it.
    let graph = Graph::build(&ops(&[1, 3, 5]), &deps(&[(5, 1)])).unwrap();
    assert_eq!(graph.topological_sort().unwrap(), vec![3, 5, 1]);
  }

  #[test]
  fn test_every_edge_respected() {
    let edges = [(10, 3), (3, 7), (10, 7), (4, 7), (7, 1), (4, 1)];
    let graph = Graph::build(&ops(&[1, 3, 4, 7, 10]), &deps(&edges)).unwrap();
    let order = graph.topological_sort().unwrap();

    let position = |index| order.iter().position(|&i| i == index).unwrap();
    for (source, target) in edges {
      assert!(position(source) < position(target), "{} before {}", source, target);
    }
  }

  #[test]
  fn test_sort_is_deterministic() {
    let graph = Graph::build(&ops(&[0, 1, 2, 3, 4]), &deps(&[(0, 4), (2, 4), (3, 1)])).unwrap();

    let first = graph.topological_sort().unwrap();
    for _ in 0..10 {
      assert_eq!(graph.topological_sort().unwrap(), first);
    }
  }

  #[test]
  fn test_duplicate_index_rejected() {
    let err = Graph::build(&ops(&[0, 1, 1]), &[]).unwrap_err();
    assert_eq!(err, GraphError::DuplicateIndex { index: 1 });
  }

  #[test]
  fn test_unknown_endpoint_rejected() {
    let err = Graph::build(&ops(&[0, 1]), &deps(&[(0, 9)])).unwrap_err();
    assert_eq!(
      err,
      GraphError::UnknownEndpoint {
        source_index: 0,
        target_index: 9
      }
    );
  }
}
