//! Config path resolution helpers.

use std::path::{Path, PathBuf};

/// Instance configuration file names, in lookup order.
///
/// When several exist the last match wins.
pub const INSTANCE_FILE_NAMES: [&str; 3] = ["serverless.yml", "serverless.yaml", "serverless.json"];

/// Settings file name inside the stackrun config directory.
pub const SETTINGS_FILE_NAME: &str = "stackrun.toml";

/// Locate the instance configuration file in `dir`, if any.
pub fn instance_file_path(dir: &Path) -> Option<PathBuf> {
    INSTANCE_FILE_NAMES
        .iter()
        .map(|name| dir.join(name))
        .filter(|path| is_file_or_symlink(path))
        .last()
}

pub fn settings_path(config_dir: &Path) -> PathBuf {
    config_dir.join(SETTINGS_FILE_NAME)
}

fn is_file_or_symlink(path: &Path) -> bool {
    std::fs::symlink_metadata(path)
        .map(|meta| meta.is_file() || meta.file_type().is_symlink())
        .unwrap_or(false)
}
