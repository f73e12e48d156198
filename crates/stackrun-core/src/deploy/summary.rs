//! Per-run outcome aggregation.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::template::{Instance, InstanceMap};
use crate::types::{Operation, Outputs};

/// Instances partitioned by outcome after a run.
///
/// An instance with neither outputs nor an error was never reached (the run
/// aborted first) and appears in neither list.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunSummary {
    pub succeeded: Vec<Instance>,
    pub failed: Vec<Instance>,
    /// Outputs keyed by instance name, successful instances only
    pub outputs: BTreeMap<String, Outputs>,
}

impl RunSummary {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn succeeded_names(&self) -> Vec<&str> {
        self.succeeded.iter().map(|i| i.name.as_str()).collect()
    }

    pub fn failed_names(&self) -> Vec<&str> {
        self.failed.iter().map(|i| i.name.as_str()).collect()
    }

    pub fn status_line(&self, operation: Operation) -> String {
        format!(
            "{}: {} succeeded, {} failed",
            operation,
            self.succeeded.len(),
            self.failed.len()
        )
    }
}

/// Split `instances` into succeeded (outputs set) and failed (error set), in
/// name order. The two checks are independent.
pub fn summarize(instances: &InstanceMap) -> RunSummary {
    let mut summary = RunSummary::default();

    for instance in instances.values() {
        if instance.failed() {
            summary.failed.push(instance.clone());
        }
        if let Some(outputs) = &instance.outputs {
            summary
                .outputs
                .insert(instance.name.clone(), outputs.clone());
            summary.succeeded.push(instance.clone());
        }
    }

    summary
}
