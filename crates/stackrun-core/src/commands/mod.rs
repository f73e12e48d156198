//! High-level commands called by the CLI.

pub mod info;
pub mod run;
pub mod settings;

pub use info::{InfoCommand, InfoOptions, InfoReport, InstanceInfo};
pub use run::{RunCommand, RunOptions, RunReport};
pub use settings::{SettingsCommand, SettingsOptions, SettingsReport};
