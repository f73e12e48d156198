//! Settings command: show or update `stackrun.toml`.

use std::path::PathBuf;

use crate::config::{Settings, SettingsStore};

/// Fields to change; `None` leaves the current value alone.
#[derive(Debug, Clone, Default)]
pub struct SettingsOptions {
    pub org: Option<String>,
    pub stage: Option<String>,
    pub state_dir: Option<PathBuf>,
}

impl SettingsOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_org(mut self, org: impl Into<String>) -> Self {
        self.org = Some(org.into());
        self
    }

    pub fn with_stage(mut self, stage: impl Into<String>) -> Self {
        self.stage = Some(stage.into());
        self
    }

    pub fn with_state_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.state_dir = Some(dir.into());
        self
    }

    fn is_empty(&self) -> bool {
        self.org.is_none() && self.stage.is_none() && self.state_dir.is_none()
    }
}

#[derive(Debug, Clone)]
pub struct SettingsReport {
    pub path: PathBuf,
    pub settings: Settings,
    pub changed: bool,
}

pub struct SettingsCommand {
    store: SettingsStore,
}

impl SettingsCommand {
    pub fn new(store: SettingsStore) -> Self {
        Self { store }
    }

    pub fn execute(&self, options: &SettingsOptions) -> anyhow::Result<SettingsReport> {
        let mut settings = self.store.load()?;
        let before = settings.clone();

        if !options.is_empty() {
            if let Some(org) = &options.org {
                settings.defaults.org = Some(org.clone());
            }
            if let Some(stage) = &options.stage {
                settings.defaults.stage = Some(stage.clone());
            }
            if let Some(dir) = &options.state_dir {
                settings.state.dir = Some(dir.clone());
            }
            settings.validate()?;
        }

        let changed = settings != before;
        if changed {
            self.store.save(&settings)?;
            tracing::info!("Updated {}", self.store.settings_path().display());
        }

        Ok(SettingsReport {
            path: self.store.settings_path().to_path_buf(),
            settings,
            changed,
        })
    }
}
