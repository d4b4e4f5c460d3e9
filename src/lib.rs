// src/lib.rs

pub mod cli;
pub mod config;
pub mod context;
pub mod control;
pub mod deps;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod registry;
pub mod service;
pub mod template;
pub mod types;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use chrono::Utc;
use tracing::{debug, info, warn};

use crate::cli::{CliArgs, Command, RunArgs};
use crate::config::{load_run_configuration, parse_duration, resolve_settings};
use crate::control::{RunControl, cancel_pair};
use crate::exec::StdioMode;
use crate::registry::load_registry;

pub use service::ConnectorExecutionService;

/// Datamart id used for runs started from the command line.
pub const CLI_DATAMART_ID: &str = "cli";

/// High-level entry point used by `main.rs`.
pub async fn run(args: CliArgs) -> Result<()> {
    match args.command {
        Command::Run(run_args) => run_connector(run_args).await,
    }
}

/// Load settings, registry and run configuration, then execute one run with
/// the worker attached to this process's stdio.
///
/// Ctrl-C cancels the run; the worker is killed and the working directory
/// removed before returning.
async fn run_connector(args: RunArgs) -> Result<()> {
    let mut settings = resolve_settings(args.settings.as_deref())
        .context("loading sandbox settings")?;
    if let Some(timeout) = &args.timeout {
        settings = settings.with_run_timeout(parse_timeout_flag(timeout)?);
    }

    let registry = load_registry(&args.registry)
        .with_context(|| format!("loading capability registry {}", args.registry.display()))?;
    if registry.is_empty() {
        warn!(registry = %args.registry.display(), "capability registry is empty");
    }
    let config = load_run_configuration(&args.config)
        .with_context(|| format!("reading run configuration {}", args.config.display()))?;

    let run_id = cli_run_id();
    debug!(?settings, "resolved sandbox settings");
    info!(
        datamart_id = CLI_DATAMART_ID,
        run_id = %run_id,
        config = %args.config.display(),
        "running connector from CLI"
    );

    let service = ConnectorExecutionService::from_settings(&settings, Arc::new(registry))?;

    let (cancel, token) = cancel_pair();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            eprintln!("failed to listen for Ctrl+C: {e}");
            return;
        }
        cancel.cancel();
    });

    let control = RunControl::with_timeout(settings.run_timeout).with_cancel(token);
    service
        .execute_with_control(CLI_DATAMART_ID, &run_id, &config, StdioMode::Inherit, control)
        .await?;
    Ok(())
}

/// `--timeout` value; must be a positive duration.
fn parse_timeout_flag(value: &str) -> Result<Duration> {
    let timeout = parse_duration(value).map_err(|e| anyhow!("--timeout: {e}"))?;
    if timeout.is_zero() {
        return Err(anyhow!("--timeout must be greater than zero"));
    }
    Ok(timeout)
}

/// Fresh, timestamp-based run id.
fn cli_run_id() -> String {
    format!("cli-{}", Utc::now().timestamp_millis())
}
