//! Stackrun - multi-component deploy orchestrator
//!
//! Usage:
//!   stackrun deploy [--target DIR]   # Deploy a template or single instance
//!   stackrun remove [--target DIR]   # Remove it, dependents first
//!   stackrun info [--target DIR]     # Show stored instance state
//!   stackrun settings --org acme     # Update default org/stage

mod reporter;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Args, Parser, Subcommand, ValueEnum};
use console::style;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use stackrun_core::commands::{
    InfoCommand, InfoOptions, InfoReport, RunCommand, RunOptions, RunReport, SettingsCommand,
    SettingsOptions, SettingsReport,
};
use stackrun_core::config::{LoadOverrides, parse_input_pairs};
use stackrun_core::context::AppContext;
use stackrun_core::deploy::{Reporter, TracingReporter};
use stackrun_core::types::Operation;

use crate::reporter::ConsoleReporter;

#[derive(Parser)]
#[command(name = "stackrun")]
#[command(about = "Deploy templates of interdependent components", long_about = None)]
struct Cli {
    /// Verbose logging; print all outputs at the end of a deploy
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Deploy every instance, dependencies first
    Deploy(RunArgs),

    /// Remove every instance, dependents first
    #[command(alias = "rm")]
    Remove(RunArgs),

    /// Show the stored state of every instance
    Info {
        #[command(flatten)]
        target: TargetArgs,

        /// Output format
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// Show or update default settings
    Settings {
        /// Default organisation
        #[arg(long)]
        org: Option<String>,

        /// Default stage
        #[arg(long)]
        stage: Option<String>,

        /// Directory for local instance state
        #[arg(long)]
        state_dir: Option<PathBuf>,
    },
}

#[derive(Args)]
struct TargetArgs {
    /// Template or instance directory (defaults to the current directory)
    #[arg(long)]
    target: Option<PathBuf>,

    /// Stage override
    #[arg(long)]
    stage: Option<String>,

    /// Organisation override
    #[arg(long)]
    org: Option<String>,

    /// Application override
    #[arg(long)]
    app: Option<String>,
}

#[derive(Args)]
struct RunArgs {
    #[command(flatten)]
    target: TargetArgs,

    /// Input overrides (KEY=VALUE); values are parsed as JSON when possible
    #[arg(long, num_args = 1..)]
    inputs: Vec<String>,

    /// Output format
    #[arg(short, long, default_value = "table")]
    format: OutputFormat,
}

#[derive(Clone, Copy, ValueEnum, Default, PartialEq, Eq)]
enum OutputFormat {
    /// Human-readable output
    #[default]
    Table,
    /// Machine-readable JSON
    Json,
    /// Only report failures (non-zero exit on failure)
    Quiet,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.debug {
        "stackrun=debug,info"
    } else {
        "stackrun=info,warn"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let ctx = AppContext::with_defaults()?;

    match cli.command {
        Commands::Deploy(args) => run(&ctx, Operation::Deploy, args, cli.debug).await?,
        Commands::Remove(args) => run(&ctx, Operation::Remove, args, cli.debug).await?,
        Commands::Info { target, format } => run_info(&ctx, target, format).await?,
        Commands::Settings {
            org,
            stage,
            state_dir,
        } => run_settings(&ctx, org, stage, state_dir)?,
    }

    Ok(())
}

// =============================================================================
// Deploy / remove
// =============================================================================

async fn run(ctx: &AppContext, operation: Operation, args: RunArgs, debug: bool) -> Result<()> {
    let inputs = parse_input_pairs(&args.inputs)?;
    let mut options = RunOptions::new(operation, resolve_target(ctx, &args.target))
        .with_inputs(inputs)
        .with_debug(debug);
    options.overrides = apply_overrides(options.overrides, &args.target);

    let reporter: Arc<dyn Reporter> = match args.format {
        OutputFormat::Table => Arc::new(ConsoleReporter),
        OutputFormat::Json | OutputFormat::Quiet => Arc::new(TracingReporter),
    };
    let report = RunCommand::from_context(ctx, reporter)
        .execute(&options)
        .await?;

    match args.format {
        OutputFormat::Table => print_run_table(&report),
        OutputFormat::Json => print_run_json(&report)?,
        OutputFormat::Quiet => print_run_quiet(&report),
    }

    if !report.is_success() {
        std::process::exit(1);
    }
    Ok(())
}

fn print_run_table(report: &RunReport) {
    println!();
    println!(
        "{} {} ({})",
        style(report.operation.progress_verb()).bold(),
        report.template,
        identity(&report.org, &report.app, &report.stage)
    );

    for name in report.summary.succeeded_names() {
        println!("  {} {}", style("[OK]").green(), name);
    }
    for instance in &report.summary.failed {
        let message = instance
            .error
            .as_ref()
            .map(|err| err.message.as_str())
            .unwrap_or("-");
        println!("  {} {}", style("[FAILED]").red(), message);
    }

    println!();
    println!("{}", report.summary.status_line(report.operation));
}

fn print_run_json(report: &RunReport) -> Result<()> {
    let output = serde_json::json!({
        "schema_version": 1,
        "operation": report.operation,
        "template": report.template,
        "org": report.org,
        "app": report.app,
        "stage": report.stage,
        "succeeded": report.summary.succeeded_names(),
        "failed": report.summary.failed,
        "outputs": report.summary.outputs,
    });

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn print_run_quiet(report: &RunReport) {
    for instance in &report.summary.failed {
        if let Some(err) = &instance.error {
            println!("{}", err.message);
        }
    }
}

// =============================================================================
// Info
// =============================================================================

async fn run_info(ctx: &AppContext, target: TargetArgs, format: OutputFormat) -> Result<()> {
    let options = InfoOptions::new(resolve_target(ctx, &target))
        .with_overrides(apply_overrides(LoadOverrides::new(), &target));
    let report = InfoCommand::from_context(ctx).execute(&options).await?;

    match format {
        OutputFormat::Table => print_info_table(&report),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Quiet => {
            let missing = report
                .instances
                .iter()
                .filter(|instance| instance.state.is_none())
                .count();
            if missing > 0 {
                println!("{missing} instance(s) not deployed");
                std::process::exit(1);
            }
        }
    }
    Ok(())
}

fn print_info_table(report: &InfoReport) {
    let kind = if report.is_template {
        "Template"
    } else {
        "Instance"
    };
    println!(
        "{}: {} ({})",
        kind,
        report.template,
        identity(&report.org, &report.app, &report.stage)
    );
    println!();
    println!(
        "  {:<20} {:<15} {:<10} {:<6} Last action",
        "Name", "Component", "Status", "Count"
    );
    println!("  {}", "-".repeat(70));

    for instance in &report.instances {
        match &instance.state {
            Some(state) => {
                let last = match (&state.last_action, &state.last_action_at) {
                    (Some(action), Some(at)) => format!("{} at {}", action, at.to_rfc3339()),
                    (Some(action), None) => action.clone(),
                    _ => "-".to_string(),
                };
                println!(
                    "  {:<20} {:<15} {:<10} {:<6} {}",
                    truncate(&instance.name, 20),
                    truncate(&instance.component, 15),
                    state.status,
                    state.deployments,
                    last
                );
            }
            None => println!(
                "  {:<20} {:<15} {:<10} {:<6} -",
                truncate(&instance.name, 20),
                truncate(&instance.component, 15),
                "-",
                "-"
            ),
        }
    }
}

// =============================================================================
// Settings
// =============================================================================

fn run_settings(
    ctx: &AppContext,
    org: Option<String>,
    stage: Option<String>,
    state_dir: Option<PathBuf>,
) -> Result<()> {
    let options = SettingsOptions {
        org,
        stage,
        state_dir,
    };
    let report = SettingsCommand::new(ctx.settings_store()).execute(&options)?;
    print_settings(&report);
    Ok(())
}

fn print_settings(report: &SettingsReport) {
    if report.changed {
        println!("Updated {}", report.path.display());
    } else {
        println!("Settings: {}", report.path.display());
    }
    let settings = &report.settings;
    println!(
        "  org:       {}",
        settings.defaults.org.as_deref().unwrap_or("-")
    );
    println!(
        "  stage:     {}",
        settings.defaults.stage.as_deref().unwrap_or("-")
    );
    println!(
        "  state dir: {}",
        settings
            .state
            .dir
            .as_ref()
            .map(|dir| dir.display().to_string())
            .unwrap_or_else(|| "-".to_string())
    );
}

// =============================================================================
// Helpers
// =============================================================================

fn resolve_target(ctx: &AppContext, args: &TargetArgs) -> PathBuf {
    match &args.target {
        Some(target) if target.is_absolute() => target.clone(),
        Some(target) => ctx.project_root().join(target),
        None => ctx.project_root().to_path_buf(),
    }
}

fn apply_overrides(mut overrides: LoadOverrides, args: &TargetArgs) -> LoadOverrides {
    if let Some(org) = &args.org {
        overrides = overrides.with_org(org);
    }
    if let Some(app) = &args.app {
        overrides = overrides.with_app(app);
    }
    if let Some(stage) = &args.stage {
        overrides = overrides.with_stage(stage);
    }
    overrides
}

fn identity(org: &Option<String>, app: &Option<String>, stage: &Option<String>) -> String {
    format!(
        "{}/{}/{}",
        org.as_deref().unwrap_or("-"),
        app.as_deref().unwrap_or("-"),
        stage.as_deref().unwrap_or("-")
    )
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}
