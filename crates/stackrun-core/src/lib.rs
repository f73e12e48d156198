//! Stackrun Core Library
//!
//! Deploys and removes templates of interdependent component instances.
//! Instances reference each other's outputs with `${output:..}`; those
//! references form a dependency graph that is executed layer by layer, with
//! every instance of a layer running concurrently.

pub mod commands;
pub mod config;
pub mod context;
pub mod deploy;
pub mod error;
pub mod graph;
pub mod template;
pub mod types;

/// Re-exports of commonly used types
pub mod prelude {
    // Configuration
    pub use crate::config::{ConfigLoader, InstanceConfig, LoadOverrides, Settings, SettingsStore};

    // Templates
    pub use crate::template::{Instance, InstanceError, InstanceMap, Template};

    // Graph
    pub use crate::graph::{DependencyGraph, build_graph, set_dependencies};

    // Execution
    pub use crate::deploy::{
        ComponentProvider, GraphExecutor, LocalStateProvider, OperationOptions, ProviderOutcome,
        Reporter, RunSummary, summarize,
    };

    // Errors
    pub use crate::error::{ProviderError, StackError};

    pub use crate::context::AppContext;
    pub use crate::types::{Credentials, Operation, Outputs};
}
