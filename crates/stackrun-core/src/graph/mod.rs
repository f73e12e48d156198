//! Dependency graph over instance names.
//!
//! An edge `a -> b` means `b` must be processed before `a`. Nodes without
//! outgoing edges (sinks) are ready to run.

pub mod builder;
pub mod cycles;
pub mod scanner;

use std::collections::HashMap;

use petgraph::Direction;
use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use petgraph::visit::{EdgeRef, IntoEdgeReferences};

pub use builder::{build_graph, set_dependencies};
pub use cycles::{find_cycles, format_cycle_report, validate_acyclic};
pub use scanner::{OutputReference, find_dependencies, output_references, referenced_instances};

/// Directed graph keyed by instance name.
///
/// Backed by a `StableDiGraph` so node removal keeps the remaining indices valid.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    graph: StableDiGraph<String, ()>,
    indices: HashMap<String, NodeIndex>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node; adding an existing name is a no-op.
    pub fn add_node(&mut self, name: &str) -> NodeIndex {
        if let Some(idx) = self.indices.get(name) {
            return *idx;
        }
        let idx = self.graph.add_node(name.to_string());
        self.indices.insert(name.to_string(), idx);
        idx
    }

    /// Add an edge `from -> to`, creating missing nodes. Duplicate edges collapse.
    pub fn add_edge(&mut self, from: &str, to: &str) {
        let a = self.add_node(from);
        let b = self.add_node(to);
        self.graph.update_edge(a, b, ());
    }

    /// Remove a node and all its edges. Returns whether it existed.
    pub fn remove_node(&mut self, name: &str) -> bool {
        match self.indices.remove(name) {
            Some(idx) => self.graph.remove_node(idx).is_some(),
            None => false,
        }
    }

    pub fn has_edge(&self, from: &str, to: &str) -> bool {
        match (self.indices.get(from), self.indices.get(to)) {
            (Some(a), Some(b)) => self.graph.contains_edge(*a, *b),
            _ => false,
        }
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Node names in sorted order.
    pub fn node_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.indices.keys().cloned().collect();
        names.sort();
        names
    }

    /// Edges as `(from, to)` pairs in sorted order.
    pub fn edges(&self) -> Vec<(String, String)> {
        let mut edges: Vec<(String, String)> = self
            .graph
            .edge_references()
            .map(|e| (self.graph[e.source()].clone(), self.graph[e.target()].clone()))
            .collect();
        edges.sort();
        edges
    }

    /// Nodes with no outgoing edges, in sorted order.
    pub fn sinks(&self) -> Vec<String> {
        let mut sinks: Vec<String> = self
            .graph
            .node_indices()
            .filter(|idx| {
                self.graph
                    .neighbors_directed(*idx, Direction::Outgoing)
                    .next()
                    .is_none()
            })
            .map(|idx| self.graph[idx].clone())
            .collect();
        sinks.sort();
        sinks
    }

    pub(crate) fn inner(&self) -> &StableDiGraph<String, ()> {
        &self.graph
    }
}
