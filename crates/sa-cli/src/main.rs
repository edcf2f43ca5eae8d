//! CLI entry point for the route monitor.
//!
//! This binary runs the routes monitor against a Hono project, either once
//! or continuously while files change.
//!
//! # Usage
//!
//! ```bash
//! route-monitor [OPTIONS] <COMMAND>
//!
//! # Analyze once and print a route table
//! route-monitor analyze --path ./my-api
//!
//! # Analyze once and print the resource graph as JSON
//! route-monitor analyze --format json --output routes.json
//!
//! # Keep analysing while files change, one JSON event per line
//! route-monitor watch --json
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

use std::io::Write;

use camino::{Utf8Path, Utf8PathBuf};
use clap::{Parser, Subcommand, ValueEnum};
use sa_core::{Config, RouteEntry};
use sa_monitor::{AnalysisCompleted, AnalysisEvent, RoutesMonitor, RoutesResult};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// CLI ARGUMENT TYPES
// =============================================================================

/// Keeps a live map of the routes of a Hono project.
#[derive(Parser)]
#[command(name = "route-monitor", version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Command to execute.
    #[command(subcommand)]
    command: Commands,

    /// Project root (the directory holding `tsconfig.json`).
    ///
    /// Defaults to the current directory.
    #[arg(short, long, global = true, env = "ROUTE_MONITOR_PATH")]
    path: Option<Utf8PathBuf>,

    /// JSON configuration file; missing fields keep their defaults.
    #[arg(short, long, global = true, env = "ROUTE_MONITOR_CONFIG")]
    config: Option<Utf8PathBuf>,

    /// Enable verbose logging (debug level).
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output.
    #[arg(long, global = true)]
    no_color: bool,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Run one analysis pass and print the result.
    Analyze {
        /// Output format.
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Summary)]
        format: OutputFormat,

        /// Output file (defaults to stdout).
        #[arg(short, long)]
        output: Option<Utf8PathBuf>,
    },

    /// Keep analysing while files change, until Ctrl-C.
    Watch {
        /// Print every analysis event as one JSON line on stdout.
        #[arg(long)]
        json: bool,
    },
}

/// Output format of `analyze`.
#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Route table.
    Summary,
    /// Full resource graph.
    Json,
}

// =============================================================================
// INITIALIZATION FUNCTIONS
// =============================================================================

/// Initializes the tracing subscriber for logging.
///
/// Respects the `RUST_LOG` environment variable if set. Otherwise, uses
/// `debug` level if `--verbose` is set, or `info` level by default.
/// The file watcher crates are filtered to `warn` level.
fn init_tracing(verbose: bool, no_color: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = if verbose { "debug" } else { "info" };
        EnvFilter::new(format!("{level},notify=warn,notify_debouncer_mini=warn"))
    });

    // Check if colors should be disabled (flag or NO_COLOR env var)
    let use_ansi = !no_color && std::env::var("NO_COLOR").is_err();

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .with_ansi(use_ansi)
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .init();
}

/// Resolves the project root and loads the configuration.
///
/// # Errors
///
/// Returns an error if the root is not a directory or the config file
/// cannot be read.
fn build_config(cli: &Cli) -> color_eyre::Result<(Utf8PathBuf, Config)> {
    let root = cli.path.clone().unwrap_or_else(|| Utf8PathBuf::from("."));

    if !root.exists() {
        return Err(color_eyre::eyre::eyre!("Path does not exist: {}", root));
    }
    if !root.is_dir() {
        return Err(color_eyre::eyre::eyre!("Path is not a directory: {}", root));
    }

    let config = match &cli.config {
        Some(path) => Config::load(path)
            .map_err(|e| color_eyre::eyre::eyre!("Failed to load config {}: {}", path, e))?,
        None => Config::default(),
    };

    Ok((root, config))
}

// =============================================================================
// COMMAND IMPLEMENTATIONS
// =============================================================================

/// Starts the monitor, runs one pass, and prints the result.
///
/// # Errors
///
/// Returns an error if the monitor cannot start or the pass fails.
async fn run_analyze(
    root: &Utf8Path,
    config: &Config,
    format: OutputFormat,
    output: Option<&Utf8Path>,
) -> color_eyre::Result<()> {
    info!(root = %root, "Analyzing routes");

    let mut monitor = RoutesMonitor::with_config(root, config)?;
    monitor.set_auto_create_result(false);
    monitor.start().await?;
    let outcome = monitor.refresh().await;
    monitor.stop().await?;
    let result = outcome?;

    let content = match format {
        OutputFormat::Summary => render_summary(&result),
        OutputFormat::Json => serde_json::to_string_pretty(&result)
            .map_err(|e| color_eyre::eyre::eyre!("Failed to serialize JSON: {}", e))?,
    };

    if let Some(output_path) = output {
        std::fs::write(output_path.as_std_path(), &content)?;
        info!(path = %output_path, "Result written");
    } else {
        let stdout = std::io::stdout();
        let mut handle = stdout.lock();
        writeln!(handle, "{content}")?;
    }

    Ok(())
}

/// Runs the monitor until Ctrl-C or SIGTERM, reporting every pass.
///
/// # Errors
///
/// Returns an error if the monitor cannot start or stop.
async fn run_watch(root: &Utf8Path, config: &Config, json: bool) -> color_eyre::Result<()> {
    info!(root = %root, "Watching routes");

    let mut monitor = RoutesMonitor::with_config(root, config)?;
    let mut events = monitor.subscribe();
    monitor.start().await?;

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            result = &mut shutdown => {
                result?;
                break;
            }
            event = events.recv() => match event {
                Ok(event) => report_event(&event, json)?,
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Missed analysis events");
                }
                Err(RecvError::Closed) => break,
            },
        }
    }

    monitor.stop().await?;
    Ok(())
}

/// Resolves when the process is asked to terminate.
async fn shutdown_signal() -> color_eyre::Result<()> {
    // Handle SIGTERM for graceful shutdown on Unix
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut sigterm = signal(SignalKind::terminate())?;
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                result?;
                info!("Received Ctrl-C, shutting down");
            }
            _ = sigterm.recv() => {
                info!("Received SIGTERM, shutting down");
            }
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
        info!("Received Ctrl-C, shutting down");
    }

    Ok(())
}

// =============================================================================
// OUTPUT HELPERS
// =============================================================================

/// Reports one analysis event as a log line or a JSON line.
fn report_event(event: &AnalysisEvent, json: bool) -> color_eyre::Result<()> {
    if json {
        let line = serde_json::to_string(event)
            .map_err(|e| color_eyre::eyre::eyre!("Failed to serialize event: {}", e))?;
        let stdout = std::io::stdout();
        let mut handle = stdout.lock();
        writeln!(handle, "{line}")?;
        return Ok(());
    }

    match event {
        AnalysisEvent::Started => debug!("Analysis started"),
        AnalysisEvent::Completed(AnalysisCompleted::Success { routes_result }) => info!(
            routes = routes_result.routes().len(),
            resources = routes_result.resource_manager().len(),
            root = %routes_result.root_id(),
            "Routes updated"
        ),
        AnalysisEvent::Completed(AnalysisCompleted::Failure { error }) => {
            warn!(%error, "Analysis failed");
        }
    }
    Ok(())
}

/// Renders the routes of a result as an aligned table.
fn render_summary(result: &RoutesResult) -> String {
    use std::fmt::Write;

    let routes = result.routes();
    let method_width = routes
        .iter()
        .map(|route| route.method.len())
        .max()
        .unwrap_or_default();
    let path_width = routes
        .iter()
        .map(|route| route.path.len())
        .max()
        .unwrap_or_default();

    let mut output = String::new();
    let _ = writeln!(output, "Routes ({})", routes.len());
    let _ = writeln!(output, "==========");
    for route in &routes {
        let file = result
            .get_resource::<RouteEntry>(&route.route_id)
            .map(|entry| entry.file_name.as_str())
            .unwrap_or_default();
        let _ = writeln!(
            output,
            "{:method_width$}  {:path_width$}  {file}",
            route.method, route.path
        );
    }
    let _ = writeln!(output);
    let _ = write!(
        output,
        "Resources: {}  Root: {}",
        result.resource_manager().len(),
        result.root_id()
    );

    output
}

// =============================================================================
// MAIN ENTRY POINT
// =============================================================================

/// Application entry point.
#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    // 1. Install color-eyre FIRST (before any potential panics)
    color_eyre::install()?;

    // 2. Parse CLI arguments
    let cli = Cli::parse();

    // 3. Initialize tracing (handles --no-color for log output)
    init_tracing(cli.verbose, cli.no_color);

    // 4. Route to appropriate command
    let (root, config) = build_config(&cli)?;
    match &cli.command {
        Commands::Analyze { format, output } => {
            run_analyze(&root, &config, *format, output.as_deref()).await
        }
        Commands::Watch { json } => run_watch(&root, &config, *json).await,
    }
}
