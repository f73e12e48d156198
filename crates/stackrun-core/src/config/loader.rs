//! Instance configuration loader.
//!
//! Reading a directory goes through a [`ConfigCache`] owned by the loader, so
//! one command invocation parses each `serverless.*` file once. The cache is
//! never shared across invocations and can be invalidated explicitly.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde_json::Value;

use super::merge::deep_merge;
use super::parser::parse_instance_file;
use super::paths::instance_file_path;
use super::schema::{DefaultsSection, InstanceConfig, InstanceFile};
use super::variables::resolve_env_variables;
use crate::error::StackError;
use crate::types::Operation;

/// Stage used when neither the file nor the settings name one.
pub const DEFAULT_STAGE: &str = "dev";

/// Values given on the command line that override instance files.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadOverrides {
    pub org: Option<String>,
    pub app: Option<String>,
    pub stage: Option<String>,
    /// Inputs deep-merged over the file's inputs (a mapping, or `null` for none)
    pub inputs: Value,
}

impl LoadOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_org(mut self, org: impl Into<String>) -> Self {
        self.org = Some(org.into());
        self
    }

    pub fn with_app(mut self, app: impl Into<String>) -> Self {
        self.app = Some(app.into());
        self
    }

    pub fn with_stage(mut self, stage: impl Into<String>) -> Self {
        self.stage = Some(stage.into());
        self
    }

    pub fn with_inputs(mut self, inputs: Value) -> Self {
        self.inputs = inputs;
        self
    }
}

/// Parsed instance files keyed by directory, scoped to one invocation.
#[derive(Debug, Clone, Default)]
pub struct ConfigCache {
    entries: HashMap<PathBuf, Option<InstanceFile>>,
}

impl ConfigCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, dir: &Path) -> Option<&Option<InstanceFile>> {
        self.entries.get(&cache_key(dir))
    }

    pub fn insert(&mut self, dir: &Path, file: Option<InstanceFile>) {
        self.entries.insert(cache_key(dir), file);
    }

    /// Drop the cached entry for `dir`. Returns whether one existed.
    pub fn invalidate(&mut self, dir: &Path) -> bool {
        self.entries.remove(&cache_key(dir)).is_some()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn cache_key(dir: &Path) -> PathBuf {
    dir.canonicalize().unwrap_or_else(|_| dir.to_path_buf())
}

#[derive(Debug, Clone, Default)]
enum EnvSource {
    #[default]
    Process,
    Fixed(HashMap<String, String>),
}

impl EnvSource {
    fn get(&self, key: &str) -> Option<String> {
        match self {
            EnvSource::Process => std::env::var(key).ok(),
            EnvSource::Fixed(vars) => vars.get(key).cloned(),
        }
    }
}

/// Loads and validates component instance configurations.
#[derive(Debug, Clone, Default)]
pub struct ConfigLoader {
    cache: ConfigCache,
    defaults: DefaultsSection,
    env: EnvSource,
}

impl ConfigLoader {
    pub fn new(cache: ConfigCache) -> Self {
        Self {
            cache,
            ..Self::default()
        }
    }

    /// Use settings defaults for org and stage.
    pub fn with_defaults(mut self, defaults: DefaultsSection) -> Self {
        self.defaults = defaults;
        self
    }

    /// Resolve `${env:..}` from a fixed map instead of the process environment.
    pub fn with_env(mut self, vars: HashMap<String, String>) -> Self {
        self.env = EnvSource::Fixed(vars);
        self
    }

    pub fn cache(&self) -> &ConfigCache {
        &self.cache
    }

    pub fn cache_mut(&mut self) -> &mut ConfigCache {
        &mut self.cache
    }

    /// Read the instance file in `dir` with defaults and parent inheritance applied.
    ///
    /// Returns `Ok(None)` when the directory has no instance file.
    pub fn read_instance_file(&mut self, dir: &Path) -> Result<Option<InstanceFile>, StackError> {
        if let Some(cached) = self.cache.get(dir) {
            return Ok(cached.clone());
        }
        let file = self.read_instance_file_uncached(dir)?;
        self.cache.insert(dir, file.clone());
        Ok(file)
    }

    fn read_instance_file_uncached(&self, dir: &Path) -> Result<Option<InstanceFile>, StackError> {
        let Some(path) = instance_file_path(dir) else {
            return Ok(None);
        };
        tracing::debug!("Reading instance file {}", path.display());

        let raw = parse_instance_file(&path)?;
        if !raw.is_object() {
            return Err(StackError::invalid_config(
                &path,
                "expected a mapping at the top level",
            ));
        }
        let mut file: InstanceFile = serde_json::from_value(raw)
            .map_err(|e| StackError::invalid_config(&path, e.to_string()))?;

        if file.stage.is_none() {
            file.stage = Some(
                self.defaults
                    .stage
                    .clone()
                    .unwrap_or_else(|| DEFAULT_STAGE.to_string()),
            );
        }

        if let Some(parent) = read_parent_identity(dir)? {
            file.app = parent.app.or(file.app);
            file.stage = parent.stage.or(file.stage);
            file.org = parent.org.or(file.org);
        }

        if file.app.is_none() {
            file.app = file.name.clone();
        }

        Ok(Some(file))
    }

    /// Load a deployable component instance from `dir`.
    ///
    /// Returns `Ok(None)` when the directory has no instance file. A file
    /// without `name` or `component` is an error.
    pub fn load_instance(
        &mut self,
        dir: &Path,
        overrides: &LoadOverrides,
        operation: Operation,
    ) -> Result<Option<InstanceConfig>, StackError> {
        let Some(file) = self.read_instance_file(dir)? else {
            return Ok(None);
        };
        let path = instance_file_path(dir).unwrap_or_else(|| dir.to_path_buf());

        let name = file
            .name
            .clone()
            .filter(|n| !n.trim().is_empty())
            .ok_or_else(|| StackError::invalid_config(&path, "missing instance name (\"name\")"))?;
        let component = file.component.clone().ok_or_else(|| {
            StackError::invalid_config(&path, "missing component type (\"component\")")
        })?;

        let org = overrides
            .org
            .clone()
            .or_else(|| file.org.clone())
            .or_else(|| self.defaults.org.clone())
            .ok_or_else(|| StackError::invalid_config(&path, "missing \"org\" property"))?;
        let app = overrides
            .app
            .clone()
            .or_else(|| file.app.clone())
            .unwrap_or_else(|| name.clone());
        let stage = overrides
            .stage
            .clone()
            .or_else(|| file.stage.clone())
            .unwrap_or_else(|| DEFAULT_STAGE.to_string());

        let mut inputs = match file.inputs {
            Value::Null => Value::Object(serde_json::Map::new()),
            other => other,
        };
        if let Some(command_inputs) = file.command_inputs.get(operation.as_str()) {
            deep_merge(&mut inputs, command_inputs.clone());
        }
        if overrides.inputs.is_object() {
            deep_merge(&mut inputs, overrides.inputs.clone());
        }

        let env = &self.env;
        resolve_env_variables(&mut inputs, &|key: &str| env.get(key))?;
        resolve_source_paths(&mut inputs, dir);

        Ok(Some(InstanceConfig {
            name,
            component,
            org,
            app,
            stage,
            inputs,
            dir: dir.to_path_buf(),
        }))
    }
}

#[derive(Debug, Default)]
struct ParentIdentity {
    org: Option<String>,
    app: Option<String>,
    stage: Option<String>,
}

fn read_parent_identity(dir: &Path) -> Result<Option<ParentIdentity>, StackError> {
    let absolute = dir.canonicalize().unwrap_or_else(|_| dir.to_path_buf());
    let Some(parent) = absolute.parent() else {
        return Ok(None);
    };
    let Some(path) = instance_file_path(parent) else {
        return Ok(None);
    };
    let raw = parse_instance_file(&path)?;
    let field = |key: &str| raw.get(key).and_then(Value::as_str).map(str::to_string);

    Ok(Some(ParentIdentity {
        org: field("org"),
        app: field("app"),
        stage: field("stage"),
    }))
}

/// Resolve `inputs.src` (or `inputs.src.src` / `inputs.src.dist`) against the
/// instance directory, keeping the original under `originSrc` / `originDist`.
fn resolve_source_paths(inputs: &mut Value, dir: &Path) {
    let Some(map) = inputs.as_object_mut() else {
        return;
    };
    let resolve = |raw: &str| Value::String(dir.join(raw).to_string_lossy().into_owned());

    match map.get("src").cloned() {
        Some(Value::String(raw)) => {
            map.insert("src".to_string(), resolve(&raw));
            map.insert("originSrc".to_string(), Value::String(raw));
        }
        Some(Value::Object(mut src)) => {
            for (key, origin_key) in [("src", "originSrc"), ("dist", "originDist")] {
                if let Some(Value::String(raw)) = src.get(key).cloned() {
                    src.insert(key.to_string(), resolve(&raw));
                    map.insert(origin_key.to_string(), Value::String(raw));
                }
            }
            map.insert("src".to_string(), Value::Object(src));
        }
        _ => {}
    }
}
