//! Cycle detection and reporting.

use std::collections::{BTreeSet, HashMap};

use petgraph::algo::tarjan_scc;
use petgraph::stable_graph::NodeIndex;

use super::DependencyGraph;
use crate::error::StackError;

const REPORT_HEADER: &str = "Your template has circular dependencies:";

/// Fail with [`StackError::CyclicDependency`] listing every cycle in `graph`.
pub fn validate_acyclic(graph: &DependencyGraph) -> Result<(), StackError> {
    let cycles = find_cycles(graph);
    if cycles.is_empty() {
        return Ok(());
    }
    let report = format_cycle_report(&cycles);
    Err(StackError::CyclicDependency { cycles, report })
}

/// All elementary cycles of `graph`.
///
/// Each cycle starts at its smallest name and does not repeat the start at
/// the end. Cycles are returned in sorted order.
pub fn find_cycles(graph: &DependencyGraph) -> Vec<Vec<String>> {
    let inner = graph.inner();
    let mut cycles = Vec::new();

    for component in tarjan_scc(inner) {
        let mut members: Vec<NodeIndex> = component;
        members.sort_by(|a, b| inner[*a].cmp(&inner[*b]));

        let rank: HashMap<NodeIndex, usize> =
            members.iter().enumerate().map(|(i, idx)| (*idx, i)).collect();

        for (start_rank, start) in members.iter().enumerate() {
            let mut search = CycleSearch {
                graph,
                rank: &rank,
                start: *start,
                start_rank,
                path: vec![*start],
                on_path: BTreeSet::from([*start]),
                found: &mut cycles,
            };
            search.walk(*start);
        }
    }

    cycles.sort();
    cycles
}

struct CycleSearch<'a> {
    graph: &'a DependencyGraph,
    rank: &'a HashMap<NodeIndex, usize>,
    start: NodeIndex,
    start_rank: usize,
    path: Vec<NodeIndex>,
    on_path: BTreeSet<NodeIndex>,
    found: &'a mut Vec<Vec<String>>,
}

impl CycleSearch<'_> {
    /// Depth-first search restricted to the strongly connected component and
    /// to nodes ranked after the start, so each cycle is found exactly once.
    fn walk(&mut self, node: NodeIndex) {
        let graph = self.graph;
        let inner = graph.inner();
        let mut next: Vec<NodeIndex> = inner.neighbors(node).collect();
        next.sort_by(|a, b| inner[*a].cmp(&inner[*b]));
        next.dedup();

        for succ in next {
            if succ == self.start {
                self.found
                    .push(self.path.iter().map(|idx| inner[*idx].clone()).collect());
                continue;
            }
            let eligible = self
                .rank
                .get(&succ)
                .is_some_and(|rank| *rank > self.start_rank);
            if eligible && !self.on_path.contains(&succ) {
                self.path.push(succ);
                self.on_path.insert(succ);
                self.walk(succ);
                self.on_path.remove(&succ);
                self.path.pop();
            }
        }
    }
}

/// Human-readable report listing each cycle forwards and backwards.
///
/// ```text
/// Your template has circular dependencies:
///     1. a --> b --> c --> a
///        a <-- c <-- b <-- a
/// ```
pub fn format_cycle_report(cycles: &[Vec<String>]) -> String {
    let mut lines = vec![REPORT_HEADER.to_string()];

    for (index, cycle) in cycles.iter().enumerate() {
        let Some(first) = cycle.first() else {
            continue;
        };
        let mut walk: Vec<&str> = cycle.iter().map(String::as_str).collect();
        walk.push(first);

        let forward = format!("{}. {}", index + 1, walk.join(" --> "));
        walk.reverse();
        let backward = walk.join(" <-- ");

        let width = forward.chars().count() + 4;
        lines.push(format!("{:>width$}", forward));
        lines.push(format!("{:>width$}", backward));
    }

    lines.join("\n")
}
