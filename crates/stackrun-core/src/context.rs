//! Application context shared by every frontend command.

use std::path::{Path, PathBuf};

use crate::config::{ConfigCache, ConfigLoader, Settings, SettingsStore};
use crate::deploy::LocalStateProvider;

/// Paths and settings resolved once per process.
///
/// The CLI builds this at startup and hands it to commands.
#[derive(Debug, Clone)]
pub struct AppContext {
    project_root: PathBuf,
    state_dir: PathBuf,
    config_dir: PathBuf,
    settings: Settings,
}

impl AppContext {
    /// Create a context with explicit paths.
    pub fn new(
        project_root: PathBuf,
        state_dir: PathBuf,
        config_dir: PathBuf,
        settings: Settings,
    ) -> Self {
        Self {
            project_root,
            state_dir,
            config_dir,
            settings,
        }
    }

    /// Resolve paths from the environment and load `stackrun.toml`.
    ///
    /// `[state] dir` in the settings overrides the platform state directory.
    pub fn with_defaults() -> anyhow::Result<Self> {
        let project_root = std::env::current_dir()?;
        let store = SettingsStore::from_default_dir()?;
        let settings = store.load()?;
        settings.validate()?;
        let config_dir = store
            .settings_path()
            .parent()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?
            .to_path_buf();

        let state_dir = match &settings.state.dir {
            Some(dir) => dir.clone(),
            None => dirs::state_dir()
                .or_else(dirs::data_local_dir)
                .ok_or_else(|| anyhow::anyhow!("Could not determine state directory"))?
                .join("stackrun"),
        };

        Ok(Self::new(project_root, state_dir, config_dir, settings))
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    pub fn state_dir(&self) -> &Path {
        &self.state_dir
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn settings_store(&self) -> SettingsStore {
        SettingsStore::from_config_dir(&self.config_dir)
    }

    /// A fresh loader seeded with the configured defaults.
    pub fn config_loader(&self) -> ConfigLoader {
        ConfigLoader::new(ConfigCache::new()).with_defaults(self.settings.defaults.clone())
    }

    pub fn local_provider(&self) -> LocalStateProvider {
        LocalStateProvider::new(self.state_dir.clone())
    }
}
