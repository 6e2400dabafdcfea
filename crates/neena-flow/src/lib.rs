//! Neena Flow
//!
//! Turns a [`FlowDef`](neena_config::FlowDef) into something that can be run:
//!
//! - [`Graph`] holds the dependency edges between task operations and answers
//!   cycle and ordering queries.
//! - [`Flow`] is a definition that passed every structural check, with each
//!   operation's `sorted_index` stamped from the execution order.
//!
//! Ordering is deterministic: among operations that are ready at the same
//! time, the smallest index always comes first.

mod error;
mod flow;
mod graph;

pub use error::GraphError;
pub use flow::{Flow, validate};
pub use graph::Graph;
