// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Command-line arguments for `connector-sandbox`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "connector-sandbox",
    version,
    about = "Run a data connector in an isolated, disposable worker environment.",
    long_about = None
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Command,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `CONNECTOR_SANDBOX_LOG` or a default level will be used.
    #[arg(long, global = true, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Execute one connector run described by a JSON run configuration.
    Run(RunArgs),
}

#[derive(Debug, Clone, Args)]
pub struct RunArgs {
    /// Path to the run configuration (JSON).
    #[arg(value_name = "CONFIG")]
    pub config: PathBuf,

    /// Sandbox settings (TOML).
    ///
    /// Default: `Sandbox.toml` in the current working directory if present,
    /// otherwise built-in defaults.
    #[arg(long, value_name = "PATH")]
    pub settings: Option<PathBuf>,

    /// Capability registry (TOML) listing sources and storages.
    #[arg(long, value_name = "PATH", default_value = "Registry.toml")]
    pub registry: PathBuf,

    /// Override the run time budget (e.g. `90s`, `30m`, `2h`).
    #[arg(long, value_name = "DURATION")]
    pub timeout: Option<String>,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::try_parse()`.
pub fn try_parse() -> Result<CliArgs, clap::Error> {
    CliArgs::try_parse()
}
