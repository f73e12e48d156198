//! Error taxonomy for template loading, graph construction and execution.

use std::path::PathBuf;

use thiserror::Error;

/// Error code a provider returns when the deployment role is missing.
pub const ROLE_NOT_FOUND_CODE: &str = "ResourceNotFound.Role";

/// Errors that abort a run.
///
/// Per-instance provider failures are not part of this enum; they are
/// recorded on the instance and surface in the run summary. Only
/// [`StackError::FatalPermission`] escalates a per-instance failure.
#[derive(Debug, Error)]
pub enum StackError {
    /// Sibling instance directories disagree on org/app/stage.
    #[error("Template instances must use the same org, app & stage properties (instance '{instance}' has {field} '{found}', expected '{expected}')")]
    TemplateConsistency {
        instance: String,
        field: &'static str,
        expected: String,
        found: String,
    },

    /// The dependency graph has at least one cycle. The message lists all of them.
    #[error("{report}")]
    CyclicDependency {
        cycles: Vec<Vec<String>>,
        report: String,
    },

    /// A provider reported that the deployment role does not exist.
    #[error("{instance}: {message}")]
    FatalPermission { instance: String, message: String },

    /// An instance configuration file is malformed or incomplete.
    #[error("Invalid configuration in {}: {message}", .path.display())]
    InvalidConfig { path: PathBuf, message: String },

    /// A string uses a variable syntax that is not resolved by this tool.
    #[error("Unsupported variable \"{variable}\": only ${{env:..}} and ${{output:..}} variables are supported")]
    UnsupportedVariable { variable: String },

    /// The directory holds neither a template nor a component instance.
    #[error("No component instance found in {}", .path.display())]
    NotAnInstance { path: PathBuf },

    #[error("I/O error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl StackError {
    pub fn invalid_config(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Error returned by a [`ComponentProvider`](crate::deploy::ComponentProvider) call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ProviderError {
    pub code: Option<String>,
    pub message: String,
}

impl ProviderError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// Whether this error must stop the whole run.
    pub fn is_fatal(&self) -> bool {
        self.code.as_deref() == Some(ROLE_NOT_FOUND_CODE)
    }

    /// Prefix the message with the owning instance name.
    pub fn for_instance(mut self, instance: &str) -> Self {
        self.message = format!("{}: {}", instance, self.message);
        self
    }
}
