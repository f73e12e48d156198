//! Layered execution of a dependency graph.
//!
//! Each round takes every sink of the graph, runs the provider for all of them
//! concurrently, records outputs or errors on the instance map and removes
//! the processed nodes. The loop ends when the graph is empty.

use futures::future::join_all;

use super::provider::{ComponentProvider, OperationOptions};
use super::reporter::{LogErrorOptions, Reporter};
use crate::error::{ProviderError, StackError};
use crate::graph::{DependencyGraph, validate_acyclic};
use crate::template::{Instance, InstanceMap};
use crate::types::{Credentials, Operation, Outputs};

pub struct GraphExecutor<'a> {
    provider: &'a dyn ComponentProvider,
    reporter: &'a dyn Reporter,
    credentials: &'a Credentials,
    options: OperationOptions,
}

impl<'a> GraphExecutor<'a> {
    pub fn new(
        provider: &'a dyn ComponentProvider,
        reporter: &'a dyn Reporter,
        credentials: &'a Credentials,
    ) -> Self {
        Self {
            provider,
            reporter,
            credentials,
            options: OperationOptions::default(),
        }
    }

    pub fn with_options(mut self, options: OperationOptions) -> Self {
        self.options = options;
        self
    }

    /// Run `operation` over `graph`, writing results into `instances`.
    ///
    /// Individual failures are recorded on the instance and do not stop the
    /// run. A fatal permission error lets the rest of its layer finish and
    /// then aborts before the next layer.
    pub async fn execute(
        &self,
        instances: &mut InstanceMap,
        operation: Operation,
        mut graph: DependencyGraph,
    ) -> Result<(), StackError> {
        let total = graph.node_count();
        let mut processed = 0;

        loop {
            let layer = graph.sinks();
            if layer.is_empty() {
                if !graph.is_empty() {
                    // Nothing is ready but nodes remain: the graph has a cycle.
                    validate_acyclic(&graph)?;
                }
                break;
            }

            self.reporter.session_status(&format!(
                "[{}/{}] {} {}",
                processed + 1,
                total,
                operation.progress_verb(),
                layer.join(", ")
            ));
            tracing::debug!("Dispatching layer of {} instance(s)", layer.len());

            let snapshots = prepare_layer(instances, &layer, operation);
            let calls = snapshots
                .iter()
                .map(|instance| self.run_instance(instance, operation));
            let results = join_all(calls).await;

            let mut fatal = None;
            for (snapshot, result) in snapshots.iter().zip(results) {
                let Some(instance) = instances.get_mut(&snapshot.name) else {
                    continue;
                };
                match result {
                    Ok(outputs) => {
                        if operation == Operation::Deploy && !self.options.debug {
                            self.reporter.log_outputs(&instance.name, &outputs);
                        }
                        tracing::debug!("{} {} succeeded", operation, instance.name);
                        instance.outputs = Some(outputs);
                    }
                    Err(err) => {
                        if err.is_fatal() && fatal.is_none() {
                            fatal = Some(StackError::FatalPermission {
                                instance: instance.name.clone(),
                                message: err.message.clone(),
                            });
                        }
                        let err = err.for_instance(&instance.name);
                        self.reporter
                            .log_error(&err, LogErrorOptions { hide_entity: true });
                        instance.error = Some(err.into());
                    }
                }
            }

            for name in &layer {
                graph.remove_node(name);
            }
            processed += layer.len();

            if let Some(err) = fatal {
                return Err(err);
            }
        }

        Ok(())
    }

    async fn run_instance(
        &self,
        instance: &Instance,
        operation: Operation,
    ) -> Result<Outputs, ProviderError> {
        let outcome = match operation {
            Operation::Deploy => {
                self.provider
                    .deploy(instance, self.credentials, &self.options)
                    .await
            }
            Operation::Remove => {
                self.provider
                    .remove(instance, self.credentials, &self.options)
                    .await
            }
        }?;
        Ok(outcome.outputs.unwrap_or_default())
    }
}

/// Snapshot the layer's instances. Remove clears inputs first.
fn prepare_layer(
    instances: &mut InstanceMap,
    layer: &[String],
    operation: Operation,
) -> Vec<Instance> {
    layer
        .iter()
        .filter_map(|name| {
            let instance = instances.get_mut(name)?;
            if operation == Operation::Remove {
                instance.inputs = serde_json::Value::Object(serde_json::Map::new());
            }
            Some(instance.clone())
        })
        .collect()
}
