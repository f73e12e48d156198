//! File-backed provider that records instance state on disk.
//!
//! State lives at `<state_dir>/<org>/<app>/<stage>/<name>.json`. A deploy
//! resolves `${output:..}` placeholders against the stored outputs of other
//! instances and publishes its resolved inputs as outputs.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;

use super::provider::{
    ComponentProvider, InstanceState, InstanceStatus, OperationOptions, ProviderOutcome,
};
use crate::config::{rewrite_strings, walk_strings};
use crate::error::ProviderError;
use crate::graph::{OutputReference, output_references};
use crate::template::Instance;
use crate::types::{Credentials, Outputs};

/// (stage, app, instance) of a referenced state file.
type StateKey = (String, String, String);

#[derive(Debug, Clone)]
pub struct LocalStateProvider {
    state_dir: PathBuf,
}

impl LocalStateProvider {
    pub fn new(state_dir: impl Into<PathBuf>) -> Self {
        Self {
            state_dir: state_dir.into(),
        }
    }

    pub fn state_dir(&self) -> &Path {
        &self.state_dir
    }

    /// Location of one instance's state file.
    pub fn state_path(
        &self,
        org: &str,
        app: &str,
        stage: &str,
        name: &str,
    ) -> Result<PathBuf, ProviderError> {
        for segment in [org, app, stage, name] {
            ensure_path_segment(segment)?;
        }
        Ok(self
            .state_dir
            .join(org)
            .join(app)
            .join(stage)
            .join(format!("{name}.json")))
    }

    async fn read_state(&self, path: &Path) -> Result<Option<InstanceState>, ProviderError> {
        let content = match tokio::fs::read_to_string(path).await {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(ProviderError::new(format!(
                    "Failed to read state {}: {}",
                    path.display(),
                    err
                )));
            }
        };
        serde_json::from_str(&content).map(Some).map_err(|err| {
            ProviderError::new(format!("Invalid state file {}: {}", path.display(), err))
        })
    }

    async fn write_state(&self, path: &Path, state: &InstanceState) -> Result<(), ProviderError> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|err| {
                ProviderError::new(format!("Failed to create {}: {}", parent.display(), err))
            })?;
        }
        let content = serde_json::to_vec_pretty(state)
            .map_err(|err| ProviderError::new(format!("Failed to serialize state: {err}")))?;
        tokio::fs::write(path, content).await.map_err(|err| {
            ProviderError::new(format!("Failed to write state {}: {}", path.display(), err))
        })
    }

    /// Load the outputs of every instance referenced from `inputs`.
    async fn referenced_outputs(
        &self,
        instance: &Instance,
        inputs: &Value,
    ) -> Result<HashMap<StateKey, Outputs>, ProviderError> {
        let mut keys = Vec::new();
        walk_strings(inputs, &mut |s| {
            for reference in output_references(s) {
                let key = state_key(instance, &reference);
                if !keys.contains(&key) {
                    keys.push(key);
                }
            }
        });

        let mut loaded = HashMap::new();
        for key in keys {
            let (stage, app, name) = &key;
            let path = self.state_path(&instance.org, app, stage, name)?;
            if let Some(state) = self.read_state(&path).await? {
                loaded.insert(key, state.outputs);
            }
        }
        Ok(loaded)
    }
}

#[async_trait]
impl ComponentProvider for LocalStateProvider {
    async fn deploy(
        &self,
        instance: &Instance,
        _credentials: &Credentials,
        _options: &OperationOptions,
    ) -> Result<ProviderOutcome, ProviderError> {
        let path = self.state_path(&instance.org, &instance.app, &instance.stage, &instance.name)?;

        let mut inputs = instance.inputs.clone();
        let available = self.referenced_outputs(instance, &inputs).await?;
        rewrite_strings(&mut inputs, &mut |s: &str| {
            substitute_outputs(s, instance, &available)
        })?;

        let mut outputs = match &inputs {
            Value::Object(map) => map.clone(),
            other => Outputs::from_iter([("inputs".to_string(), other.clone())]),
        };
        outputs
            .entry("component")
            .or_insert_with(|| Value::String(instance.component.clone()));

        let previous = self.read_state(&path).await?;
        let state = InstanceState {
            name: instance.name.clone(),
            component: instance.component.clone(),
            org: instance.org.clone(),
            app: instance.app.clone(),
            stage: instance.stage.clone(),
            status: InstanceStatus::Active,
            last_action: Some("deploy".to_string()),
            last_action_at: Some(Utc::now()),
            deployments: previous.map_or(0, |state| state.deployments) + 1,
            inputs,
            outputs: outputs.clone(),
        };
        self.write_state(&path, &state).await?;
        tracing::debug!("Wrote state for '{}' to {}", instance.name, path.display());

        Ok(ProviderOutcome::with_outputs(outputs))
    }

    async fn remove(
        &self,
        instance: &Instance,
        _credentials: &Credentials,
        _options: &OperationOptions,
    ) -> Result<ProviderOutcome, ProviderError> {
        let path = self.state_path(&instance.org, &instance.app, &instance.stage, &instance.name)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => tracing::debug!("Removed state {}", path.display()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No state for '{}', nothing to remove", instance.name);
            }
            Err(err) => {
                return Err(ProviderError::new(format!(
                    "Failed to remove state {}: {}",
                    path.display(),
                    err
                )));
            }
        }
        Ok(ProviderOutcome::empty())
    }

    async fn get_instance(
        &self,
        instance: &Instance,
    ) -> Result<Option<InstanceState>, ProviderError> {
        let path = self.state_path(
            &instance.org,
            &instance.app,
            &instance.stage,
            &instance.name,
        )?;
        self.read_state(&path).await
    }
}

fn state_key(instance: &Instance, reference: &OutputReference) -> StateKey {
    (
        reference
            .stage
            .clone()
            .unwrap_or_else(|| instance.stage.clone()),
        reference.app.clone().unwrap_or_else(|| instance.app.clone()),
        reference.instance.clone(),
    )
}

/// Replace output placeholders in one string.
///
/// A string that is exactly one placeholder takes the referenced value with
/// its JSON type; embedded placeholders are rendered as text.
fn substitute_outputs(
    s: &str,
    instance: &Instance,
    available: &HashMap<StateKey, Outputs>,
) -> Result<Option<Value>, ProviderError> {
    let references = output_references(s);
    if references.is_empty() {
        return Ok(None);
    }

    if let [only] = references.as_slice()
        && only.span == (0..s.len())
    {
        return lookup(only, instance, available).map(Some);
    }

    let mut rendered = String::with_capacity(s.len());
    let mut cursor = 0;
    for reference in &references {
        rendered.push_str(&s[cursor..reference.span.start]);
        match lookup(reference, instance, available)? {
            Value::String(text) => rendered.push_str(&text),
            other => rendered.push_str(&other.to_string()),
        }
        cursor = reference.span.end;
    }
    rendered.push_str(&s[cursor..]);
    Ok(Some(Value::String(rendered)))
}

fn lookup(
    reference: &OutputReference,
    instance: &Instance,
    available: &HashMap<StateKey, Outputs>,
) -> Result<Value, ProviderError> {
    let outputs = available
        .get(&state_key(instance, reference))
        .ok_or_else(|| {
            ProviderError::new(format!(
                "Cannot resolve output of '{}': instance has not been deployed",
                reference.instance
            ))
        })?;

    let mut current = Value::Object(outputs.clone());
    for key in &reference.path {
        current = match current {
            Value::Object(mut map) => map.remove(key),
            Value::Array(mut items) => key
                .parse::<usize>()
                .ok()
                .filter(|index| *index < items.len())
                .map(|index| items.swap_remove(index)),
            _ => None,
        }
        .ok_or_else(|| {
            ProviderError::new(format!(
                "Output '{}.{}' not found",
                reference.instance,
                reference.path.join(".")
            ))
        })?;
    }
    Ok(current)
}

fn ensure_path_segment(segment: &str) -> Result<(), ProviderError> {
    if segment.is_empty() || segment == "." || segment == ".." {
        return Err(ProviderError::new(format!(
            "Invalid state path segment '{segment}'"
        )));
    }
    if segment.contains(['/', '\\']) {
        return Err(ProviderError::new(format!(
            "Path separators not allowed in '{segment}'"
        )));
    }
    Ok(())
}
