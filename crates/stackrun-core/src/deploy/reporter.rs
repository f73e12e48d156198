//! Progress and error reporting sink.

use crate::types::Outputs;

/// Options for [`Reporter::log_error`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LogErrorOptions {
    /// Omit the entity label; the message already names the instance.
    pub hide_entity: bool,
}

/// Where the executor sends status lines, errors and outputs.
pub trait Reporter: Send + Sync {
    fn log(&self, message: &str);

    fn log_error(&self, error: &dyn std::error::Error, options: LogErrorOptions);

    /// Replace the current one-line session status.
    fn session_status(&self, message: &str);

    fn log_outputs(&self, instance: &str, outputs: &Outputs) {
        let rendered = serde_json::to_string_pretty(outputs).unwrap_or_default();
        self.log(&format!("{instance}:\n{rendered}"));
    }
}

/// Reporter that only emits `tracing` events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn log(&self, message: &str) {
        tracing::info!("{message}");
    }

    fn log_error(&self, error: &dyn std::error::Error, options: LogErrorOptions) {
        if options.hide_entity {
            tracing::error!("{error}");
        } else {
            tracing::error!(entity = "stackrun", "{error}");
        }
    }

    fn session_status(&self, message: &str) {
        tracing::info!(status = true, "{message}");
    }
}
