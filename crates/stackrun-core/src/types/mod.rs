//! Shared core types used across configuration, graph and deploy layers.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Outputs produced by a provider for one instance.
pub type Outputs = serde_json::Map<String, serde_json::Value>;

/// Operation applied to every instance of a template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    /// Create or update instances, dependencies first.
    Deploy,
    /// Tear instances down, dependents first.
    Remove,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Deploy => "deploy",
            Operation::Remove => "remove",
        }
    }

    /// Present participle used in progress messages.
    pub fn progress_verb(&self) -> &'static str {
        match self {
            Operation::Deploy => "Deploying",
            Operation::Remove => "Removing",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operation {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "deploy" => Ok(Operation::Deploy),
            "remove" => Ok(Operation::Remove),
            _ => anyhow::bail!("Unknown operation: {}. Use 'deploy' or 'remove'", s),
        }
    }
}

/// Known provider environment variables and the credential keys they map to.
const PROVIDER_ENV_VARS: &[(&str, &[(&str, &str)])] = &[(
    "tencent",
    &[
        ("TENCENT_APP_ID", "AppId"),
        ("TENCENT_SECRET_ID", "SecretId"),
        ("TENCENT_SECRET_KEY", "SecretKey"),
        ("TENCENT_TOKEN", "Token"),
    ],
)];

/// Provider credentials, keyed by provider name.
///
/// The core never inspects these; they are handed to the provider as-is.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    providers: BTreeMap<String, BTreeMap<String, String>>,
}

impl Credentials {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collect credentials from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Collect credentials through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut providers = BTreeMap::new();
        for (provider, vars) in PROVIDER_ENV_VARS {
            let entry: &mut BTreeMap<String, String> =
                providers.entry(provider.to_string()).or_default();
            for (env_key, credential_key) in *vars {
                if let Some(value) = lookup(env_key) {
                    entry.insert(credential_key.to_string(), value);
                }
            }
        }
        Self { providers }
    }

    pub fn with(mut self, provider: &str, key: &str, value: impl Into<String>) -> Self {
        self.providers
            .entry(provider.to_string())
            .or_default()
            .insert(key.to_string(), value.into());
        self
    }

    pub fn provider(&self, name: &str) -> Option<&BTreeMap<String, String>> {
        self.providers.get(name)
    }
}
