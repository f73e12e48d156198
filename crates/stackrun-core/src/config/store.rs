//! Settings store for loading and saving stackrun.toml.

use std::path::{Path, PathBuf};

use anyhow::Context;

use super::{Settings, parser, paths::settings_path};

#[derive(Debug, Clone)]
pub struct SettingsStore {
    settings_path: PathBuf,
}

impl SettingsStore {
    pub fn from_default_dir() -> anyhow::Result<Self> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?
            .join("stackrun");

        Ok(Self::from_config_dir(&config_dir))
    }

    pub fn from_config_dir(config_dir: &Path) -> Self {
        Self {
            settings_path: settings_path(config_dir),
        }
    }

    pub fn settings_path(&self) -> &Path {
        &self.settings_path
    }

    pub fn load(&self) -> anyhow::Result<Settings> {
        if !self.settings_path.exists() {
            return Ok(Settings::new());
        }
        parser::parse_settings_toml(&self.settings_path)
    }

    pub fn save(&self, settings: &Settings) -> anyhow::Result<()> {
        let content = parser::to_toml(settings).context("Failed to serialize settings to TOML")?;
        if let Some(parent) = self.settings_path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }
        std::fs::write(&self.settings_path, content).with_context(|| {
            format!(
                "Failed to write settings file: {}",
                self.settings_path.display()
            )
        })?;
        Ok(())
    }
}
