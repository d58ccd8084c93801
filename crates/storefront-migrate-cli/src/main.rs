// crates/storefront-migrate-cli/src/main.rs
// ============================================================================
// Module: Storefront Migrate CLI Entry Point
// Description: Command dispatcher for bulk runs, single steps, and serving.
// Purpose: Drive migrations out of band and host the HTTP surface.
// Dependencies: clap, storefront-migrate-{config, core, server}, serde, serde_jcs, tokio
// ============================================================================

//! ## Overview
//! `migrate run` is the bulk mode: every non-gated step runs to completion in
//! process with one progress line per page. Legacy removal and progress reset
//! both demand an explicit flag. Structured output (`status`, `step`) is
//! canonical JSON. All user-facing strings go through the i18n catalog.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::ArgAction;
use clap::Args;
use clap::CommandFactory;
use clap::Parser;
use clap::Subcommand;
use serde::Serialize;
use serde_jcs::to_vec as canonical_json;
use storefront_migrate_cli::t;
use storefront_migrate_config::StorefrontMigrateConfig;
use storefront_migrate_config::config_toml_example;
use storefront_migrate_core::ExecutorError;
use storefront_migrate_core::PageReport;
use storefront_migrate_core::StepKey;
use storefront_migrate_server::MigrationRuntime;
use storefront_migrate_server::MigrationServer;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Lease owner label for CLI processes.
const CLI_OWNER_LABEL: &str = "cli";

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "storefront-migrate", disable_help_subcommand = true, disable_version_flag = true)]
struct Cli {
    /// Print version information and exit.
    #[arg(long = "version", action = ArgAction::SetTrue, global = true)]
    show_version: bool,
    /// Optional config file path (defaults to storefront-migrate.toml or env override).
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Migration commands.
    Migrate {
        /// Selected migration subcommand.
        #[command(subcommand)]
        command: MigrateCommand,
    },
    /// Start the migration HTTP server.
    Serve,
    /// Configuration utilities.
    Config {
        /// Selected config subcommand.
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

/// Migration subcommands.
#[derive(Subcommand, Debug)]
enum MigrateCommand {
    /// Run every migration step to completion (legacy removal excluded).
    Run,
    /// Run one page of a step and print its progress.
    Step(StepCommand),
    /// Run one step to completion through the redirect-driven driver.
    Upgrade(StepCommand),
    /// Print migration status as JSON.
    Status,
    /// Delete legacy data once every migration step has completed.
    RemoveLegacy(ConfirmCommand),
    /// Discard all migration progress.
    Reset(ResetCommand),
}

/// Arguments naming one step.
#[derive(Args, Debug)]
struct StepCommand {
    /// Step key (for example `migrate_orders`).
    #[arg(value_name = "STEP")]
    step: String,
}

/// Arguments for legacy removal.
#[derive(Args, Debug)]
struct ConfirmCommand {
    /// Confirm that legacy data should be deleted.
    #[arg(long, action = ArgAction::SetTrue)]
    confirm: bool,
}

/// Arguments for progress reset.
#[derive(Args, Debug)]
struct ResetCommand {
    /// Confirm that progress should be discarded.
    #[arg(long, action = ArgAction::SetTrue)]
    yes: bool,
}

/// Config subcommands.
#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Validate the configuration file.
    Validate,
    /// Print a canonical example configuration.
    Example,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper for localized error messages.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`] from a localized message.
    const fn new(message: String) -> Self {
        Self {
            message,
        }
    }
}

impl From<ExecutorError> for CliError {
    fn from(err: ExecutorError) -> Self {
        let message = match &err {
            ExecutorError::ConfirmationRequired => t!("legacy.confirm_required"),
            ExecutorError::GateClosed(_) => t!("legacy.gate_closed", error = err),
            ExecutorError::StepBusy(step) => t!("migrate.busy", step = step),
            _ => t!("migrate.failed", kind = err.kind(), error = err),
        };
        Self::new(message)
    }
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
#[tokio::main(flavor = "multi_thread")]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Executes the CLI command dispatcher.
async fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();

    if cli.show_version {
        let version = env!("CARGO_PKG_VERSION");
        write_stdout_line(&t!("main.version", version = version))?;
        return Ok(ExitCode::SUCCESS);
    }

    let Some(command) = cli.command else {
        show_help()?;
        return Ok(ExitCode::SUCCESS);
    };

    let config_path = cli.config.as_deref();
    match command {
        Commands::Migrate {
            command,
        } => command_migrate(command, config_path),
        Commands::Serve => command_serve(config_path).await,
        Commands::Config {
            command,
        } => command_config(&command, config_path),
    }
}

// ============================================================================
// SECTION: Migrate Commands
// ============================================================================

/// Dispatches migration subcommands.
fn command_migrate(command: MigrateCommand, config_path: Option<&Path>) -> CliResult<ExitCode> {
    if let MigrateCommand::Reset(reset) = &command
        && !reset.yes
    {
        return Err(CliError::new(t!("reset.confirm_required")));
    }
    let runtime = load_runtime(config_path)?;
    match command {
        MigrateCommand::Run => command_migrate_run(&runtime),
        MigrateCommand::Step(step) => command_migrate_step(&runtime, &step),
        MigrateCommand::Upgrade(step) => command_migrate_upgrade(&runtime, &step),
        MigrateCommand::Status => command_migrate_status(&runtime),
        MigrateCommand::RemoveLegacy(confirm) => command_remove_legacy(&runtime, &confirm),
        MigrateCommand::Reset(_) => {
            runtime.executor().reset()?;
            write_stdout_line(&t!("reset.ok"))?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Executes `migrate run`.
fn command_migrate_run(runtime: &MigrationRuntime) -> CliResult<ExitCode> {
    let mut output_error = None;
    runtime.progress_driver().run_all(|report| {
        if output_error.is_none() {
            output_error = write_page(report).err();
        }
    })?;
    if let Some(err) = output_error {
        return Err(err);
    }
    write_stdout_line(&t!("migrate.run.ok"))?;
    Ok(ExitCode::SUCCESS)
}

/// Executes `migrate step`.
fn command_migrate_step(runtime: &MigrationRuntime, command: &StepCommand) -> CliResult<ExitCode> {
    let progress = runtime.progress_driver().step(&StepKey::new(command.step.as_str()), None)?;
    write_json(&progress)?;
    Ok(ExitCode::SUCCESS)
}

/// Executes `migrate upgrade`.
fn command_migrate_upgrade(
    runtime: &MigrationRuntime,
    command: &StepCommand,
) -> CliResult<ExitCode> {
    let key = StepKey::new(command.step.as_str());
    let report = runtime.redirect_driver().run_to_completion(&key)?;
    write_stdout_line(&t!("migrate.upgrade.ok", step = report.step_key, cursor = report.cursor))?;
    Ok(ExitCode::SUCCESS)
}

/// Executes `migrate status`.
fn command_migrate_status(runtime: &MigrationRuntime) -> CliResult<ExitCode> {
    let status = runtime.executor().gate().status()?;
    write_json(&status)?;
    Ok(ExitCode::SUCCESS)
}

/// Executes `migrate remove-legacy`.
fn command_remove_legacy(
    runtime: &MigrationRuntime,
    command: &ConfirmCommand,
) -> CliResult<ExitCode> {
    let mut output_error = None;
    runtime.progress_driver().run_legacy_removal(command.confirm, |report| {
        if output_error.is_none() {
            output_error = write_page(report).err();
        }
    })?;
    if let Some(err) = output_error {
        return Err(err);
    }
    write_stdout_line(&t!("legacy.ok"))?;
    Ok(ExitCode::SUCCESS)
}

/// Builds the migration runtime from configuration.
fn load_runtime(config_path: Option<&Path>) -> CliResult<MigrationRuntime> {
    let config = StorefrontMigrateConfig::load(config_path)
        .map_err(|err| CliError::new(t!("config.load_failed", error = err)))?;
    MigrationRuntime::from_config(&config, CLI_OWNER_LABEL)
        .map_err(|err| CliError::new(t!("runtime.init_failed", error = err)))
}

/// Writes one progress line for a page report.
fn write_page(report: &PageReport) -> CliResult<()> {
    if report.done {
        return write_stdout_line(&t!("migrate.step_done", step = report.step_key));
    }
    let total = report.total_estimate.map_or_else(|| "?".to_string(), |total| total.to_string());
    write_stdout_line(&t!(
        "migrate.page",
        step = report.step_key,
        cursor = report.cursor,
        total = total,
        percent = report.percent,
        migrated = report.migrated,
        skipped = report.skipped,
        failed = report.failed
    ))
}

// ============================================================================
// SECTION: Serve Command
// ============================================================================

/// Executes the `serve` command.
async fn command_serve(config_path: Option<&Path>) -> CliResult<ExitCode> {
    let config = StorefrontMigrateConfig::load(config_path)
        .map_err(|err| CliError::new(t!("config.load_failed", error = err)))?;
    let server = tokio::task::spawn_blocking(move || MigrationServer::from_config(&config))
        .await
        .map_err(|err| {
            CliError::new(t!("serve.init_failed", error = format!("init join failed: {err}")))
        })?
        .map_err(|err| CliError::new(t!("serve.init_failed", error = err)))?;
    write_stderr_line(&t!("serve.listening", bind = server.bind_addr()))?;
    server.serve().await.map_err(|err| CliError::new(t!("serve.failed", error = err)))?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Config Commands
// ============================================================================

/// Dispatches config subcommands.
fn command_config(command: &ConfigCommand, config_path: Option<&Path>) -> CliResult<ExitCode> {
    match command {
        ConfigCommand::Validate => {
            StorefrontMigrateConfig::load(config_path)
                .map_err(|err| CliError::new(t!("config.load_failed", error = err)))?;
            write_stdout_line(&t!("config.validate.ok"))?;
        }
        ConfigCommand::Example => {
            write_stdout_bytes(config_toml_example().as_bytes())?;
        }
    }
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Output Helpers
// ============================================================================

/// Emits the top-level help message for the CLI.
fn show_help() -> CliResult<()> {
    let mut command = Cli::command();
    command.print_help().map_err(|err| CliError::new(output_error("stdout", &err)))?;
    write_stdout_line("")
}

/// Writes canonical JSON to stdout.
fn write_json<T: Serialize>(value: &T) -> CliResult<()> {
    let mut bytes =
        canonical_json(value).map_err(|err| CliError::new(t!("output.json_failed", error = err)))?;
    bytes.push(b'\n');
    write_stdout_bytes(&bytes)
}

/// Writes a single line to stdout.
fn write_stdout_line(message: &str) -> CliResult<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}").map_err(|err| CliError::new(output_error("stdout", &err)))
}

/// Writes raw bytes to stdout without adding a newline.
fn write_stdout_bytes(bytes: &[u8]) -> CliResult<()> {
    let mut stdout = std::io::stdout();
    stdout.write_all(bytes).map_err(|err| CliError::new(output_error("stdout", &err)))
}

/// Writes a single line to stderr.
fn write_stderr_line(message: &str) -> CliResult<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}").map_err(|err| CliError::new(output_error("stderr", &err)))
}

/// Formats a localized output error message.
fn output_error(stream: &str, error: &std::io::Error) -> String {
    let stream_label = match stream {
        "stdout" => t!("output.stream.stdout"),
        "stderr" => t!("output.stream.stderr"),
        _ => t!("output.stream.unknown"),
    };
    t!("output.write_failed", stream = stream_label, error = error)
}

/// Emits an error message to stderr and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let mut stderr = std::io::stderr();
    let _ = writeln!(&mut stderr, "{message}");
    ExitCode::FAILURE
}
