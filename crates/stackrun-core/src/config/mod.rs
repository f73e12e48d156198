//! Configuration loading
//!
//! Two kinds of configuration are read:
//! - Instance files (`serverless.yml` / `.yaml` / `.json`), one per component directory
//! - Tool settings (`stackrun.toml` in the user config directory)

pub mod loader;
pub mod merge;
pub mod parser;
pub mod paths;
pub mod schema;
pub mod store;
pub mod variables;

pub use loader::{ConfigCache, ConfigLoader, DEFAULT_STAGE, LoadOverrides};
pub use merge::{deep_merge, parse_input_pairs};
pub use parser::{parse_instance_file, parse_settings_toml, parse_settings_toml_str, to_toml};
pub use paths::{INSTANCE_FILE_NAMES, instance_file_path};
pub use schema::{DefaultsSection, InstanceConfig, InstanceFile, Settings, StateSection};
pub use store::SettingsStore;
pub use variables::{resolve_env_variables, rewrite_strings, walk_strings};
