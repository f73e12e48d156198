//! Deploy coordination: the provider seam, layered execution and outcome
//! aggregation.

pub mod executor;
pub mod local;
pub mod provider;
pub mod reporter;
pub mod summary;

pub use executor::GraphExecutor;
pub use local::LocalStateProvider;
pub use provider::{
    ComponentProvider, InstanceState, InstanceStatus, OperationOptions, ProviderOutcome,
};
pub use reporter::{LogErrorOptions, Reporter, TracingReporter};
pub use summary::{RunSummary, summarize};
