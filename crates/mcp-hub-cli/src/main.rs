// crates/mcp-hub-cli/src/main.rs
// ============================================================================
// Module: MCP Hub CLI Entry Point
// Description: Command dispatcher for serving the hub and checking config.
// Purpose: Provide the `mcp-hub` binary.
// Dependencies: clap, mcp-hub-config, mcp-hub-server, thiserror, tokio
// ============================================================================

//! ## Overview
//! `mcp-hub serve` loads configuration, applies command-line overrides, and
//! runs the server until the listener fails. `mcp-hub config check` loads and
//! validates configuration without binding anything.

// ============================================================================
// SECTION: Modules
// ============================================================================


// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::ArgAction;
use clap::Args;
use clap::Parser;
use clap::Subcommand;
use mcp_hub_config::HubConfig;
use mcp_hub_server::HubServer;
use thiserror::Error;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "mcp-hub", disable_help_subcommand = true, disable_version_flag = true)]
struct Cli {
    /// Print version information and exit.
    #[arg(long = "version", action = ArgAction::SetTrue, global = true)]
    show_version: bool,
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the MCP Hub server.
    Serve(ServeCommand),
    /// Configuration utilities.
    Config {
        /// Selected config subcommand.
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

/// Arguments for `serve`.
#[derive(Args, Debug)]
struct ServeCommand {
    /// Configuration file path (defaults to `MCP_HUB_CONFIG` or `mcp-hub.toml`).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Bind address override, e.g. `0.0.0.0:8080`.
    #[arg(long, value_name = "ADDR")]
    bind: Option<String>,
    /// Disable session-id normalization regardless of configuration.
    #[arg(long, action = ArgAction::SetTrue)]
    no_session_id_normalization: bool,
}

/// Config subcommands.
#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Load and validate configuration.
    Check(ConfigCheckCommand),
}

/// Arguments for `config check`.
#[derive(Args, Debug)]
struct ConfigCheckCommand {
    /// Configuration file path (defaults to `MCP_HUB_CONFIG` or `mcp-hub.toml`).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`].
    const fn new(message: String) -> Self {
        Self {
            message,
        }
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
    match run(Cli::parse()).await {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Executes the parsed command.
async fn run(cli: Cli) -> CliResult<ExitCode> {
    if cli.show_version {
        write_stdout_line(&format!("mcp-hub {}", env!("CARGO_PKG_VERSION")))
            .map_err(|err| CliError::new(output_error("stdout", &err)))?;
        return Ok(ExitCode::SUCCESS);
    }
    match cli.command {
        Some(Commands::Serve(command)) => command_serve(command).await,
        Some(Commands::Config {
            command: ConfigCommand::Check(command),
        }) => command_config_check(&command),
        None => {
            write_stdout_line("usage: mcp-hub <serve|config check> [--config PATH]")
                .map_err(|err| CliError::new(output_error("stdout", &err)))?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

// ============================================================================
// SECTION: Commands
// ============================================================================

/// Executes the `serve` command.
async fn command_serve(command: ServeCommand) -> CliResult<ExitCode> {
    let config = serve_config(&command)?;
    let server = HubServer::from_config(config)
        .map_err(|err| CliError::new(format!("server init failed: {err}")))?;
    server.serve().await.map_err(|err| CliError::new(format!("server failed: {err}")))?;
    Ok(ExitCode::SUCCESS)
}

/// Loads configuration and applies `serve` overrides.
fn serve_config(command: &ServeCommand) -> CliResult<HubConfig> {
    let mut config = HubConfig::load(command.config.as_deref())
        .map_err(|err| CliError::new(format!("config load failed: {err}")))?;
    if let Some(bind) = &command.bind {
        config.server.bind.clone_from(bind);
    }
    if command.no_session_id_normalization {
        config.server.session_id_normalization = false;
    }
    config.validate().map_err(|err| CliError::new(format!("config load failed: {err}")))?;
    Ok(config)
}

/// Executes `config check`.
fn command_config_check(command: &ConfigCheckCommand) -> CliResult<ExitCode> {
    let config = HubConfig::load(command.config.as_deref())
        .map_err(|err| CliError::new(format!("config load failed: {err}")))?;
    write_stdout_line(&config_summary(&config))
        .map_err(|err| CliError::new(output_error("stdout", &err)))?;
    Ok(ExitCode::SUCCESS)
}

/// One-line description of a valid configuration.
fn config_summary(config: &HubConfig) -> String {
    format!(
        "config ok: bind={} session_id_normalization={} upstream.timeout_ms={}",
        config.server.bind, config.server.session_id_normalization, config.upstream.timeout_ms
    )
}

// ============================================================================
// SECTION: Output
// ============================================================================

/// Writes one line to stdout.
fn write_stdout_line(message: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}")
}

/// Writes one line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Formats an output failure message.
fn output_error(stream: &str, error: &std::io::Error) -> String {
    format!("failed to write to {stream}: {error}")
}

/// Emits an error message to stderr and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::FAILURE
}
