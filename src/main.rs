//! Stackplan CLI entrypoint.
//!
//! This is the main entrypoint for the stackplan command-line tool.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use stackplan::cli::{Cli, Commands, OutputFormat, OutputFormatter, StateCommands};
use stackplan::config::{find_config_file, ConfigParser, ConfigValidator, StackConfig, StateBackend};
use stackplan::error::Result;
use stackplan::planner::PlanContext;
use stackplan::reconciler::Reconciler;
use stackplan::state::{LocalStateStore, StateStore};

use clap::Parser;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

/// Plan succeeded and nothing needs to change.
const EXIT_OK: u8 = 0;
/// Any error, a guardrail violation or an incomplete plan.
const EXIT_FAILURE: u8 = 1;
/// Plan succeeded with changes, reported only with `--detailed-exitcode`.
const EXIT_CHANGES: u8 = 2;

/// Main entrypoint.
fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    init_logging(cli.verbose, cli.output);

    // Run async runtime
    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::from(EXIT_FAILURE)
        }
    }
}

/// Initializes the logging system. Logs go to stderr so stdout stays
/// parseable.
fn init_logging(verbose: bool, format: OutputFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "info" }));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    match format {
        OutputFormat::Json => builder.json().init(),
        OutputFormat::Text => builder.init(),
    }
}

/// Main async entry point.
async fn run(cli: Cli) -> Result<u8> {
    let formatter = OutputFormatter::new(cli.output);
    let config_path = cli.config.as_ref();

    match cli.command {
        Commands::Validate => cmd_validate(config_path, &formatter),
        Commands::Plan {
            detailed,
            detailed_exitcode,
            parallelism,
        } => cmd_plan(config_path, detailed, detailed_exitcode, parallelism, &formatter).await,
        Commands::Drift => cmd_drift(config_path, &formatter).await,
        Commands::Graph => cmd_graph(config_path, &formatter).await,
        Commands::Kinds => cmd_kinds(config_path, &formatter),
        Commands::State { command } => cmd_state(config_path, command, &formatter).await,
    }
}

/// Validate configuration.
fn cmd_validate(config_path: Option<&PathBuf>, formatter: &OutputFormatter) -> Result<u8> {
    let (config, config_file) = load_config(config_path)?;
    info!("Validating configuration: {}", config_file.display());

    let result = ConfigValidator::new().check(&config);
    emit(&formatter.format_validation(&result))?;

    Ok(if result.is_valid() { EXIT_OK } else { EXIT_FAILURE })
}

/// Compute and show the change set.
async fn cmd_plan(
    config_path: Option<&PathBuf>,
    detailed: bool,
    detailed_exitcode: bool,
    parallelism: Option<usize>,
    formatter: &OutputFormatter,
) -> Result<u8> {
    let (config, state_store) = load_config_and_state(config_path)?;
    let ctx = cancellable_context();

    let reconciler = Reconciler::new(&config, &state_store);
    let reconciler = match parallelism {
        Some(workers) => reconciler.with_parallelism(workers),
        None => reconciler,
    };
    let report = reconciler.plan(&ctx).await?;

    emit(&formatter.format_plan(&report, detailed))?;

    if !report.errors.is_empty() || !report.is_allowed() {
        return Ok(EXIT_FAILURE);
    }
    if detailed_exitcode && !report.change_set.is_empty() {
        return Ok(EXIT_CHANGES);
    }
    Ok(EXIT_OK)
}

/// Check for drift.
async fn cmd_drift(config_path: Option<&PathBuf>, formatter: &OutputFormatter) -> Result<u8> {
    let (config, state_store) = load_config_and_state(config_path)?;
    let ctx = cancellable_context();

    let report = Reconciler::new(&config, &state_store).drift(&ctx).await?;
    emit(&formatter.format_drift(&report))?;

    Ok(if report.errors.is_empty() { EXIT_OK } else { EXIT_FAILURE })
}

/// Print creation and deletion orders.
async fn cmd_graph(config_path: Option<&PathBuf>, formatter: &OutputFormatter) -> Result<u8> {
    let (config, state_store) = load_config_and_state(config_path)?;

    let (graph, diagnostics) = Reconciler::new(&config, &state_store)
        .dependency_graph()
        .await?;
    let creation = graph.topological_order()?;
    let deletion = graph.deletion_order()?;

    emit(&formatter.format_graph(&creation, &deletion, &diagnostics))?;
    Ok(EXIT_OK)
}

/// List registered kinds.
fn cmd_kinds(config_path: Option<&PathBuf>, formatter: &OutputFormatter) -> Result<u8> {
    // Outside a stack directory only the built-in kinds are listed.
    let registry = match load_config(config_path) {
        Ok((config, _)) => config.registry(),
        Err(e) if config_path.is_none() => {
            debug!("No stack document loaded: {e}");
            stackplan::provider::ProviderRegistry::with_builtin_kinds()
        }
        Err(e) => return Err(e),
    };

    emit(&formatter.format_kinds(&registry))?;
    Ok(EXIT_OK)
}

/// State commands.
async fn cmd_state(
    config_path: Option<&PathBuf>,
    command: StateCommands,
    formatter: &OutputFormatter,
) -> Result<u8> {
    let (_config, state_store) = load_config_and_state(config_path)?;

    match command {
        StateCommands::Show => {
            let snapshot = state_store.load().await?;
            emit(&formatter.format_state(snapshot.as_ref(), state_store.backend_type()))?;
        }
    }

    Ok(EXIT_OK)
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Writes command output to stdout.
fn emit(output: &str) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(output.as_bytes())?;
    if !output.ends_with('\n') {
        stdout.write_all(b"\n")?;
    }
    Ok(())
}

/// Creates a planning context cancelled by Ctrl-C.
fn cancellable_context() -> PlanContext {
    let ctx = PlanContext::new();
    let token = ctx.cancellation().clone();

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling planning");
            token.cancel();
        }
    });

    ctx
}

/// Resolves the configuration file path.
fn resolve_config_path(config_path: Option<&PathBuf>) -> Result<PathBuf> {
    config_path.map_or_else(|| find_config_file("."), |path| Ok(path.clone()))
}

fn config_dir(config_file: &Path) -> &Path {
    config_file
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
}

/// Loads the stack document with `.env` and environment overrides applied.
fn load_config(config_path: Option<&PathBuf>) -> Result<(StackConfig, PathBuf)> {
    let config_file = resolve_config_path(config_path)?;
    debug!("Loading configuration from: {}", config_file.display());

    let parser = ConfigParser::new().with_base_path(config_dir(&config_file));
    parser.load_dotenv()?;

    let config = parser.load_with_env(&config_file)?;
    Ok((config, config_file))
}

/// Loads and validates configuration and creates the state store.
fn load_config_and_state(config_path: Option<&PathBuf>) -> Result<(StackConfig, Box<dyn StateStore>)> {
    let (config, config_file) = load_config(config_path)?;

    let result = ConfigValidator::new().validate(&config)?;
    for warning in &result.warnings {
        warn!("{warning}");
    }

    let state_store: Box<dyn StateStore> = match config.state.backend {
        StateBackend::Local => {
            let path = config.state_path();
            let path = if path.is_relative() {
                config_dir(&config_file).join(path)
            } else {
                path
            };
            Box::new(LocalStateStore::with_state_path(path))
        }
    };

    Ok((config, state_store))
}
