//! Deploy and remove commands.
//!
//! Loads the template (or single instance) at the target directory, builds the
//! dependency graph for the operation and runs it layer by layer.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use serde_json::Value;

use crate::config::{ConfigCache, ConfigLoader, DefaultsSection, LoadOverrides};
use crate::context::AppContext;
use crate::deploy::{
    ComponentProvider, GraphExecutor, OperationOptions, Reporter, RunSummary, summarize,
};
use crate::graph::{build_graph, set_dependencies};
use crate::template::resolve_template;
use crate::types::{Credentials, Operation};

/// Options for [`RunCommand`]
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub operation: Operation,
    /// Template or instance directory
    pub target: PathBuf,
    pub overrides: LoadOverrides,
    /// Print all outputs at the end instead of as each instance finishes
    pub debug: bool,
}

impl RunOptions {
    pub fn new(operation: Operation, target: impl Into<PathBuf>) -> Self {
        Self {
            operation,
            target: target.into(),
            overrides: LoadOverrides::new(),
            debug: false,
        }
    }

    pub fn deploy(target: impl Into<PathBuf>) -> Self {
        Self::new(Operation::Deploy, target)
    }

    pub fn remove(target: impl Into<PathBuf>) -> Self {
        Self::new(Operation::Remove, target)
    }

    pub fn with_org(mut self, org: impl Into<String>) -> Self {
        self.overrides = self.overrides.with_org(org);
        self
    }

    pub fn with_app(mut self, app: impl Into<String>) -> Self {
        self.overrides = self.overrides.with_app(app);
        self
    }

    pub fn with_stage(mut self, stage: impl Into<String>) -> Self {
        self.overrides = self.overrides.with_stage(stage);
        self
    }

    /// Inputs merged over every instance's own inputs.
    pub fn with_inputs(mut self, inputs: Value) -> Self {
        self.overrides = self.overrides.with_inputs(inputs);
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }
}

/// Outcome of a deploy or remove run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub operation: Operation,
    pub template: String,
    pub org: Option<String>,
    pub app: Option<String>,
    pub stage: Option<String>,
    pub summary: RunSummary,
}

impl RunReport {
    pub fn is_success(&self) -> bool {
        self.summary.is_success()
    }
}

pub struct RunCommand {
    provider: Arc<dyn ComponentProvider>,
    reporter: Arc<dyn Reporter>,
    credentials: Credentials,
    defaults: DefaultsSection,
    env: Option<HashMap<String, String>>,
}

impl RunCommand {
    pub fn new(provider: Arc<dyn ComponentProvider>, reporter: Arc<dyn Reporter>) -> Self {
        Self {
            provider,
            reporter,
            credentials: Credentials::new(),
            defaults: DefaultsSection::default(),
            env: None,
        }
    }

    /// Local state provider, process credentials and configured defaults.
    pub fn from_context(ctx: &AppContext, reporter: Arc<dyn Reporter>) -> Self {
        Self::new(Arc::new(ctx.local_provider()), reporter)
            .with_credentials(Credentials::from_env())
            .with_defaults(ctx.settings().defaults.clone())
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = credentials;
        self
    }

    pub fn with_defaults(mut self, defaults: DefaultsSection) -> Self {
        self.defaults = defaults;
        self
    }

    /// Resolve `${env:..}` from `vars` instead of the process environment.
    pub fn with_env(mut self, vars: HashMap<String, String>) -> Self {
        self.env = Some(vars);
        self
    }

    pub async fn execute(&self, options: &RunOptions) -> anyhow::Result<RunReport> {
        let operation = options.operation;
        let mut loader = self.loader();

        self.reporter.session_status("Initializing");
        let mut template =
            resolve_template(&options.target, &mut loader, &options.overrides, operation)?;
        tracing::info!(
            "Running {} for '{}' with {} instance(s)",
            operation,
            template.name,
            template.len()
        );

        set_dependencies(&mut template.instances);
        let graph = build_graph(&template.instances, operation)?;

        GraphExecutor::new(
            self.provider.as_ref(),
            self.reporter.as_ref(),
            &self.credentials,
        )
        .with_options(OperationOptions::new().with_debug(options.debug))
        .execute(&mut template.instances, operation, graph)
        .await?;

        let summary = summarize(&template.instances);
        if options.debug && operation == Operation::Deploy {
            for (name, outputs) in &summary.outputs {
                self.reporter.log_outputs(name, outputs);
            }
        }
        self.reporter.session_status(&summary.status_line(operation));

        Ok(RunReport {
            operation,
            template: template.name,
            org: template.org,
            app: template.app,
            stage: template.stage,
            summary,
        })
    }

    fn loader(&self) -> ConfigLoader {
        let loader = ConfigLoader::new(ConfigCache::new()).with_defaults(self.defaults.clone());
        match &self.env {
            Some(vars) => loader.with_env(vars.clone()),
            None => loader,
        }
    }
}
