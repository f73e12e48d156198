//! Provider seam: the service that actually deploys and removes components.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;
use crate::template::Instance;
use crate::types::{Credentials, Outputs};

/// Per-run flags passed through to the provider.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OperationOptions {
    pub debug: bool,
}

impl OperationOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }
}

/// Result of a successful provider call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProviderOutcome {
    /// `None` is recorded as an empty output map.
    pub outputs: Option<Outputs>,
}

impl ProviderOutcome {
    pub fn with_outputs(outputs: Outputs) -> Self {
        Self {
            outputs: Some(outputs),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstanceStatus {
    Active,
    Inactive,
    Error,
}

impl std::fmt::Display for InstanceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
            Self::Error => "error",
        };
        write!(f, "{s}")
    }
}

/// Stored state of a deployed instance, as reported by the provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceState {
    pub name: String,
    pub component: String,
    pub org: String,
    pub app: String,
    pub stage: String,
    pub status: InstanceStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_action: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_action_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub deployments: u64,
    #[serde(default)]
    pub inputs: serde_json::Value,
    #[serde(default)]
    pub outputs: Outputs,
}

/// Remote (or local) component service.
///
/// Implementations must be safe to call concurrently for independent
/// instances of the same layer.
#[async_trait]
pub trait ComponentProvider: Send + Sync {
    async fn deploy(
        &self,
        instance: &Instance,
        credentials: &Credentials,
        options: &OperationOptions,
    ) -> Result<ProviderOutcome, ProviderError>;

    async fn remove(
        &self,
        instance: &Instance,
        credentials: &Credentials,
        options: &OperationOptions,
    ) -> Result<ProviderOutcome, ProviderError>;

    /// Stored state for the instance's org/app/stage/name, if it was ever deployed.
    async fn get_instance(
        &self,
        instance: &Instance,
    ) -> Result<Option<InstanceState>, ProviderError>;
}
