use std::path::PathBuf;

use tempfile::TempDir;

use stackrun_core::config::{Settings, SettingsStore};

#[test]
fn load_missing_returns_default_settings() {
    let temp = TempDir::new().unwrap();
    let store = SettingsStore::from_config_dir(&temp.path().join("config"));

    let settings = store.load().unwrap();

    assert_eq!(settings, Settings::default());
}

#[test]
fn save_then_load_keeps_values() {
    let temp = TempDir::new().unwrap();
    let store = SettingsStore::from_config_dir(&temp.path().join("config"));

    let mut settings = Settings::new();
    settings.defaults.org = Some("acme".to_string());
    settings.state.dir = Some(PathBuf::from("/var/lib/stackrun"));

    store.save(&settings).unwrap();
    let loaded = store.load().unwrap();

    assert_eq!(loaded, settings);
    assert!(temp.path().join("config/stackrun.toml").exists());
}

#[test]
fn invalid_toml_names_the_line() {
    let temp = TempDir::new().unwrap();
    let store = SettingsStore::from_config_dir(temp.path());
    std::fs::write(store.settings_path(), "[defaults]\norg = \n").unwrap();

    let err = store.load().unwrap_err();

    assert!(format!("{err:#}").contains("line 2"), "{err:#}");
}
