//! Parsers for instance files (YAML/JSON) and settings (TOML) with helpful error messages

use std::path::Path;

use anyhow::{Context, Result};

use super::schema::Settings;
use crate::error::StackError;

/// Parse an instance file into a generic value.
///
/// YAML and JSON are both normalised into `serde_json::Value`.
pub fn parse_instance_file(path: &Path) -> Result<serde_json::Value, StackError> {
    let content = std::fs::read_to_string(path).map_err(|source| StackError::io(path, source))?;

    let is_json = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    if is_json {
        parse_instance_json_str(&content)
    } else {
        parse_instance_yaml_str(&content)
    }
    .map_err(|message| StackError::invalid_config(path, message))
}

pub fn parse_instance_yaml_str(content: &str) -> Result<serde_json::Value, String> {
    if content.trim().is_empty() {
        return Ok(serde_json::Value::Object(serde_json::Map::new()));
    }
    serde_yaml::from_str(content).map_err(|e| format!("YAML format error: {}", e))
}

pub fn parse_instance_json_str(content: &str) -> Result<serde_json::Value, String> {
    serde_json::from_str(content).map_err(|e| format!("JSON format error: {}", e))
}

/// Parse stackrun.toml with detailed error messages
pub fn parse_settings_toml(path: &Path) -> Result<Settings> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read settings file: {}", path.display()))?;

    parse_settings_toml_str(&content)
        .with_context(|| format!("Failed to parse settings file: {}", path.display()))
}

/// Parse stackrun.toml content from string
pub fn parse_settings_toml_str(content: &str) -> Result<Settings> {
    let settings: Settings = toml::from_str(content).map_err(|e| enhance_toml_error(e, content))?;

    settings.validate()?;

    Ok(settings)
}

/// Serialize settings to a TOML string
pub fn to_toml(settings: &Settings) -> Result<String> {
    toml::to_string_pretty(settings).with_context(|| "Failed to serialize settings to TOML")
}

/// Enhance TOML parsing errors with the offending lines
fn enhance_toml_error(error: toml::de::Error, content: &str) -> anyhow::Error {
    let error_msg = error.to_string();

    let line_hint = error
        .span()
        .map(|span| content[..span.start.min(content.len())].lines().count().max(1));

    match line_hint {
        Some(line_num) => anyhow::anyhow!(
            "TOML parsing error at line {}:\n{}\n\nError: {}",
            line_num,
            get_line_context(content, line_num),
            error_msg
        ),
        None => anyhow::anyhow!("TOML parsing error: {}", error_msg),
    }
}

/// Get context lines around an error
fn get_line_context(content: &str, line_num: usize) -> String {
    let lines: Vec<&str> = content.lines().collect();
    let start = line_num.saturating_sub(2);
    let end = (line_num + 2).min(lines.len());

    lines[start..end]
        .iter()
        .enumerate()
        .map(|(i, line)| {
            let num = start + i + 1;
            let marker = if num == line_num { ">>>" } else { "   " };
            format!("{} {:4} | {}", marker, num, line)
        })
        .collect::<Vec<_>>()
        .join("\n")
}
