#![allow(dead_code)]

use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use stackrun_core::deploy::{
    ComponentProvider, InstanceState, LogErrorOptions, OperationOptions, ProviderOutcome, Reporter,
};
use stackrun_core::error::ProviderError;
use stackrun_core::template::{Instance, InstanceMap};
use stackrun_core::types::{Credentials, Outputs};

/// Provider with canned results that records every call.
#[derive(Default)]
pub struct ScriptedProvider {
    failures: HashMap<String, ProviderError>,
    outputs: HashMap<String, Outputs>,
    delay: Option<Duration>,
    calls: Mutex<Vec<String>>,
    received: Mutex<HashMap<String, serde_json::Value>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(mut self, name: &str, error: ProviderError) -> Self {
        self.failures.insert(name.to_string(), error);
        self
    }

    pub fn with_outputs(mut self, name: &str, outputs: serde_json::Value) -> Self {
        let outputs = outputs.as_object().cloned().unwrap_or_default();
        self.outputs.insert(name.to_string(), outputs);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Instance names in the order their calls started.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Inputs each instance was called with.
    pub fn received_inputs(&self, name: &str) -> Option<serde_json::Value> {
        self.received.lock().unwrap().get(name).cloned()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    async fn call(&self, instance: &Instance) -> Result<ProviderOutcome, ProviderError> {
        self.calls.lock().unwrap().push(instance.name.clone());
        self.received
            .lock()
            .unwrap()
            .insert(instance.name.clone(), instance.inputs.clone());

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if let Some(err) = self.failures.get(&instance.name) {
            return Err(err.clone());
        }
        Ok(match self.outputs.get(&instance.name) {
            Some(outputs) => ProviderOutcome::with_outputs(outputs.clone()),
            None => ProviderOutcome::empty(),
        })
    }
}

#[async_trait]
impl ComponentProvider for ScriptedProvider {
    async fn deploy(
        &self,
        instance: &Instance,
        _credentials: &Credentials,
        _options: &OperationOptions,
    ) -> Result<ProviderOutcome, ProviderError> {
        self.call(instance).await
    }

    async fn remove(
        &self,
        instance: &Instance,
        _credentials: &Credentials,
        _options: &OperationOptions,
    ) -> Result<ProviderOutcome, ProviderError> {
        self.call(instance).await
    }

    async fn get_instance(
        &self,
        _instance: &Instance,
    ) -> Result<Option<InstanceState>, ProviderError> {
        Ok(None)
    }
}

/// Reporter that keeps everything it is told.
#[derive(Default)]
pub struct RecordingReporter {
    pub statuses: Mutex<Vec<String>>,
    pub errors: Mutex<Vec<String>>,
    pub logs: Mutex<Vec<String>>,
}

impl RecordingReporter {
    pub fn statuses(&self) -> Vec<String> {
        self.statuses.lock().unwrap().clone()
    }

    pub fn errors(&self) -> Vec<String> {
        self.errors.lock().unwrap().clone()
    }
}

impl Reporter for RecordingReporter {
    fn log(&self, message: &str) {
        self.logs.lock().unwrap().push(message.to_string());
    }

    fn log_error(&self, error: &dyn std::error::Error, _options: LogErrorOptions) {
        self.errors.lock().unwrap().push(error.to_string());
    }

    fn session_status(&self, message: &str) {
        self.statuses.lock().unwrap().push(message.to_string());
    }
}

/// `name -> Instance` map with identity acme/shop/dev.
pub fn instance_map(specs: &[(&str, serde_json::Value)]) -> InstanceMap {
    specs
        .iter()
        .map(|(name, inputs)| {
            let instance = Instance::new(*name, "scf")
                .with_identity("acme", "shop", "dev")
                .with_inputs(inputs.clone());
            (name.to_string(), instance)
        })
        .collect()
}

/// Write `<root>/<dir>/serverless.yml`.
pub fn write_instance(root: &Path, dir: &str, yaml: &str) {
    let dir = root.join(dir);
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("serverless.yml"), yaml).unwrap();
}
