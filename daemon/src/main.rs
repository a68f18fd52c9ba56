//! Ballot command-line front end.

mod commands;
mod config;
mod shutdown;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use ballot_election::{CancelToken, Election};
use ballot_store_lmdb::{check_data_dir, LmdbEnvironment};
use ballot_utils::{init_logging, LogFormat};
use clap::Parser;

use crate::commands::{exit_code, hint, Command, Output, EXIT_FAILURE};
use crate::config::ElectionConfig;
use crate::shutdown::ShutdownController;

#[derive(Parser)]
#[command(name = "ballot", about = "Register voters, cast votes and tally an election")]
struct Cli {
    /// Path to a TOML configuration file. Flags and env vars override it.
    #[arg(long, env = "BALLOT_CONFIG")]
    config: Option<PathBuf>,

    /// Directory holding the election's LMDB environment.
    #[arg(long, env = "BALLOT_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "BALLOT_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format: "human" or "json".
    #[arg(long, env = "BALLOT_LOG_FORMAT")]
    log_format: Option<LogFormat>,

    /// Per-operation deadline in milliseconds; 0 disables it.
    #[arg(long, env = "BALLOT_OP_TIMEOUT_MS")]
    op_timeout_ms: Option<u64>,

    /// Print command output as JSON.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

fn load_config(cli: &Cli) -> anyhow::Result<ElectionConfig> {
    let mut config = match &cli.config {
        Some(path) => ElectionConfig::from_toml_file(path)?,
        None => ElectionConfig::default(),
    };
    if let Some(data_dir) = &cli.data_dir {
        config.data_dir = data_dir.clone();
    }
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }
    if let Some(format) = cli.log_format {
        config.log_format = format;
    }
    if let Some(ms) = cli.op_timeout_ms {
        config.op_timeout_ms = ms;
    }
    Ok(config)
}

/// Open the store and run `command` off the async runtime.
async fn run(command: Command, config: ElectionConfig, token: CancelToken) -> anyhow::Result<Output> {
    tokio::task::spawn_blocking(move || {
        check_data_dir(&config.data_dir).map_err(anyhow::Error::msg)?;
        let env = LmdbEnvironment::open(&config.data_dir, config.map_size_bytes())
            .with_context(|| format!("opening data directory {}", config.data_dir.display()))?;

        let mut election = Election::new(Arc::new(env)).with_cancel_token(token);
        if let Some(timeout) = config.op_timeout() {
            election = election.with_op_timeout(timeout);
        }
        commands::execute(&election, &config, &command)
    })
    .await
    .context("operation task failed")?
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {e:#}");
            return ExitCode::from(EXIT_FAILURE);
        }
    };
    init_logging(config.log_format, &config.log_level);
    tracing::debug!(data_dir = %config.data_dir.display(), op_timeout_ms = config.op_timeout_ms, "configuration loaded");

    let shutdown = Arc::new(ShutdownController::new());
    let signals = {
        let shutdown = Arc::clone(&shutdown);
        tokio::spawn(async move {
            if let Err(e) = shutdown.wait_for_signal().await {
                tracing::warn!(error = %e, "signal handlers unavailable");
            }
        })
    };

    let result = run(cli.command, config, shutdown.token()).await;
    signals.abort();

    match result {
        Ok(output) => {
            println!("{}", output.render(cli.json));
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e:#}");
            if let Some(hint) = hint(&e) {
                eprintln!("{hint}");
            }
            ExitCode::from(exit_code(&e))
        }
    }
}
