//! Template model: a set of component instances sharing org, app and stage.

pub mod registry;

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::config::InstanceConfig;
use crate::error::{ProviderError, StackError};
use crate::types::Outputs;

pub use registry::{is_template_dir, load_template, resolve_template};

/// Instances of one template, keyed by instance name.
pub type InstanceMap = BTreeMap<String, Instance>;

/// Failure recorded on an instance after its operation ran.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceError {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    pub message: String,
}

impl From<ProviderError> for InstanceError {
    fn from(err: ProviderError) -> Self {
        Self {
            code: err.code,
            message: err.message,
        }
    }
}

/// One deployable component instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instance {
    pub name: String,
    pub component: String,
    pub org: String,
    pub app: String,
    pub stage: String,
    pub inputs: serde_json::Value,
    /// Names of other instances this one references through `${output:..}`
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub dependencies: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outputs: Option<Outputs>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<InstanceError>,
}

impl Instance {
    pub fn new(name: impl Into<String>, component: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            component: component.into(),
            org: String::new(),
            app: String::new(),
            stage: String::new(),
            inputs: serde_json::Value::Object(serde_json::Map::new()),
            dependencies: BTreeSet::new(),
            outputs: None,
            error: None,
        }
    }

    pub fn with_identity(
        mut self,
        org: impl Into<String>,
        app: impl Into<String>,
        stage: impl Into<String>,
    ) -> Self {
        self.org = org.into();
        self.app = app.into();
        self.stage = stage.into();
        self
    }

    pub fn with_inputs(mut self, inputs: serde_json::Value) -> Self {
        self.inputs = inputs;
        self
    }

    pub fn succeeded(&self) -> bool {
        self.outputs.is_some()
    }

    pub fn failed(&self) -> bool {
        self.error.is_some()
    }
}

impl From<InstanceConfig> for Instance {
    fn from(config: InstanceConfig) -> Self {
        Self::new(config.name, config.component)
            .with_identity(config.org, config.app, config.stage)
            .with_inputs(config.inputs)
    }
}

/// Component instances that are deployed and removed together.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Template {
    /// Display name, usually the template directory's name
    pub name: String,
    pub org: Option<String>,
    pub app: Option<String>,
    pub stage: Option<String>,
    pub instances: InstanceMap,
}

impl Template {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Build a template from instances, enforcing a shared identity.
    pub fn from_instances<I>(name: impl Into<String>, instances: I) -> Result<Self, StackError>
    where
        I: IntoIterator<Item = Instance>,
    {
        let mut template = Self::new(name);
        for instance in instances {
            template.insert(instance)?;
        }
        Ok(template)
    }

    /// Add an instance. The first instance fixes org/app/stage for the template.
    pub fn insert(&mut self, instance: Instance) -> Result<(), StackError> {
        check_field(&instance, "org", &mut self.org, &instance.org)?;
        check_field(&instance, "app", &mut self.app, &instance.app)?;
        check_field(&instance, "stage", &mut self.stage, &instance.stage)?;
        self.instances.insert(instance.name.clone(), instance);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Instance> {
        self.instances.get(name)
    }

    /// Instance names in sorted order.
    pub fn instance_names(&self) -> Vec<String> {
        self.instances.keys().cloned().collect()
    }
}

fn check_field(
    instance: &Instance,
    field: &'static str,
    current: &mut Option<String>,
    value: &str,
) -> Result<(), StackError> {
    match current {
        Some(expected) if expected != value => Err(StackError::TemplateConsistency {
            instance: instance.name.clone(),
            field,
            expected: expected.clone(),
            found: value.to_string(),
        }),
        Some(_) => Ok(()),
        None => {
            *current = Some(value.to_string());
            Ok(())
        }
    }
}
