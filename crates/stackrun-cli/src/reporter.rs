//! Terminal reporter.

use console::style;

use stackrun_core::deploy::{LogErrorOptions, Reporter};
use stackrun_core::types::Outputs;

/// Prints status and outputs to the terminal and mirrors them as tracing events.
#[derive(Debug, Default)]
pub struct ConsoleReporter;

impl Reporter for ConsoleReporter {
    fn log(&self, message: &str) {
        tracing::debug!("{message}");
        println!("{message}");
    }

    fn log_error(&self, error: &dyn std::error::Error, options: LogErrorOptions) {
        tracing::debug!("{error}");
        if options.hide_entity {
            eprintln!("{}", style(error).red());
        } else {
            eprintln!("{} {}", style("error:").red().bold(), style(error).red());
        }
    }

    fn session_status(&self, message: &str) {
        tracing::debug!(status = true, "{message}");
        eprintln!("{}", style(message).dim());
    }

    fn log_outputs(&self, instance: &str, outputs: &Outputs) {
        println!("{}", style(instance).bold().green());
        if outputs.is_empty() {
            println!("  (no outputs)");
            return;
        }
        for (key, value) in outputs {
            let rendered = match value {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            println!("  {}: {}", style(key).cyan(), rendered);
        }
    }
}
