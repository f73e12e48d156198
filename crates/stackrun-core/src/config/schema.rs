//! Configuration schemas
//!
//! Two file kinds are read:
//! - Instance files: `serverless.{yml,yaml,json}` describing one component instance
//! - Settings: `~/.config/stackrun/stackrun.toml` holding tool defaults

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Raw contents of an instance configuration file.
///
/// Every field is optional here; the loader fills defaults and validates
/// before an [`InstanceConfig`] is produced.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceFile {
    #[serde(default)]
    pub name: Option<String>,

    /// Component type, e.g. `scf` or `website`
    #[serde(default)]
    pub component: Option<String>,

    /// Framework service name; marks a non-component project
    #[serde(default)]
    pub service: Option<serde_json::Value>,

    #[serde(default)]
    pub org: Option<String>,

    #[serde(default)]
    pub app: Option<String>,

    #[serde(default)]
    pub stage: Option<String>,

    #[serde(default)]
    pub inputs: serde_json::Value,

    /// Extra inputs merged in for a single operation (`deploy`, `remove`)
    #[serde(default)]
    pub command_inputs: BTreeMap<String, serde_json::Value>,
}

impl InstanceFile {
    /// Whether the file describes something this tool can act on.
    pub fn is_deployable(&self) -> bool {
        self.component.is_some() || self.service.is_some()
    }

    pub fn is_component(&self) -> bool {
        self.component.is_some()
    }
}

/// A validated, fully resolved component instance configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceConfig {
    pub name: String,
    pub component: String,
    pub org: String,
    pub app: String,
    pub stage: String,
    pub inputs: serde_json::Value,
    /// Directory the configuration was loaded from
    pub dir: PathBuf,
}

/// Tool settings from `stackrun.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub defaults: DefaultsSection,

    #[serde(default)]
    pub state: StateSection,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefaultsSection {
    /// Organisation used when an instance file has none
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub org: Option<String>,

    /// Stage used when an instance file has none (falls back to `dev`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateSection {
    /// Directory for the local state provider
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if let Some(org) = &self.defaults.org
            && org.trim().is_empty()
        {
            anyhow::bail!("defaults.org must not be empty");
        }
        if let Some(stage) = &self.defaults.stage
            && stage.trim().is_empty()
        {
            anyhow::bail!("defaults.stage must not be empty");
        }
        Ok(())
    }
}
