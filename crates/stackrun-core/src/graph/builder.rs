//! Dependency graph construction.

use super::DependencyGraph;
use super::cycles::validate_acyclic;
use super::scanner::find_dependencies;
use crate::error::StackError;
use crate::template::InstanceMap;
use crate::types::Operation;

/// Compute each instance's `dependencies` from its `${output:..}` references.
pub fn set_dependencies(instances: &mut InstanceMap) {
    let known = instances.keys().cloned().collect();
    for instance in instances.values_mut() {
        instance.dependencies = find_dependencies(&instance.inputs, &known);
    }
}

/// Build the execution graph for `operation` and reject cycles.
///
/// Deploy adds `instance -> dependency`, so dependencies run first. Remove
/// adds `dependency -> instance`, so dependents are torn down first.
pub fn build_graph(
    instances: &InstanceMap,
    operation: Operation,
) -> Result<DependencyGraph, StackError> {
    let mut graph = DependencyGraph::new();

    for name in instances.keys() {
        graph.add_node(name);
    }

    for (name, instance) in instances {
        for dependency in &instance.dependencies {
            match operation {
                Operation::Deploy => graph.add_edge(name, dependency),
                Operation::Remove => graph.add_edge(dependency, name),
            }
        }
    }

    validate_acyclic(&graph)?;

    Ok(graph)
}
