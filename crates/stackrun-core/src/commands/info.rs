//! Info command: stored state of every instance in a template.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use serde::Serialize;

use crate::config::{ConfigCache, ConfigLoader, DefaultsSection, LoadOverrides};
use crate::context::AppContext;
use crate::deploy::{ComponentProvider, InstanceState};
use crate::template::{is_template_dir, resolve_template};
use crate::types::Operation;

#[derive(Debug, Clone)]
pub struct InfoOptions {
    pub target: PathBuf,
    pub overrides: LoadOverrides,
}

impl InfoOptions {
    pub fn new(target: impl Into<PathBuf>) -> Self {
        Self {
            target: target.into(),
            overrides: LoadOverrides::new(),
        }
    }

    pub fn with_overrides(mut self, overrides: LoadOverrides) -> Self {
        self.overrides = overrides;
        self
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct InstanceInfo {
    pub name: String,
    pub component: String,
    /// `None` when the instance was never deployed
    pub state: Option<InstanceState>,
}

#[derive(Debug, Clone, Serialize)]
pub struct InfoReport {
    pub template: String,
    pub is_template: bool,
    pub org: Option<String>,
    pub app: Option<String>,
    pub stage: Option<String>,
    pub instances: Vec<InstanceInfo>,
}

pub struct InfoCommand {
    provider: Arc<dyn ComponentProvider>,
    defaults: DefaultsSection,
}

impl InfoCommand {
    pub fn new(provider: Arc<dyn ComponentProvider>) -> Self {
        Self {
            provider,
            defaults: DefaultsSection::default(),
        }
    }

    pub fn from_context(ctx: &AppContext) -> Self {
        Self::new(Arc::new(ctx.local_provider())).with_defaults(ctx.settings().defaults.clone())
    }

    pub fn with_defaults(mut self, defaults: DefaultsSection) -> Self {
        self.defaults = defaults;
        self
    }

    pub async fn execute(&self, options: &InfoOptions) -> anyhow::Result<InfoReport> {
        let mut loader = ConfigLoader::new(ConfigCache::new()).with_defaults(self.defaults.clone());
        let is_template = is_template_dir(&options.target, &mut loader);
        let template = resolve_template(
            &options.target,
            &mut loader,
            &options.overrides,
            Operation::Deploy,
        )?;

        let mut instances = Vec::with_capacity(template.len());
        for instance in template.instances.values() {
            let state = self
                .provider
                .get_instance(instance)
                .await
                .with_context(|| format!("Failed to load state of instance '{}'", instance.name))?;
            instances.push(InstanceInfo {
                name: instance.name.clone(),
                component: instance.component.clone(),
                state,
            });
        }

        Ok(InfoReport {
            template: template.name,
            is_template,
            org: template.org,
            app: template.app,
            stage: template.stage,
            instances,
        })
    }
}
