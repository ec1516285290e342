//! CLI entry point for the jobcan tool.

use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use jobcan_core::config::{PRODUCTION_ATTENDANCE_BASE, PRODUCTION_ID_BASE};
use jobcan_core::{CallContext, ClientConfig, PortalClient, PortalEndpoints};
use tracing::debug;

mod cli;
mod commands;

use cli::{Args, Command};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (warn)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "warn",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    debug!(?args, "CLI arguments parsed");

    if args.command == Command::Logout {
        return commands::run_logout_command(&args.cookie);
    }

    let config = build_config(&args)?;
    let mut client = PortalClient::new(config).context("Failed to initialize portal client")?;
    let ctx = CallContext::with_timeout(Duration::from_secs(args.timeout));

    let outcome = match args.command {
        Command::Check => commands::run_check_command(&mut client, &ctx).await,
        Command::Toggle => commands::run_toggle_command(&mut client, &ctx).await,
        Command::Logout => Ok(()),
    };

    // The session is written back even when the command failed.
    let closed = client.close().context("Failed to save session");
    outcome?;
    closed
}

fn build_config(args: &Args) -> Result<ClientConfig> {
    let mut config = ClientConfig::new(
        args.username.clone().unwrap_or_default(),
        args.password.clone().unwrap_or_default(),
        args.cookie.clone(),
    )
    .with_adit_group_id(args.group_id.clone());

    if args.id_base_url.is_some() || args.attendance_base_url.is_some() {
        let endpoints = PortalEndpoints::from_bases(
            args.id_base_url.as_deref().unwrap_or(PRODUCTION_ID_BASE),
            args.attendance_base_url
                .as_deref()
                .unwrap_or(PRODUCTION_ATTENDANCE_BASE),
        )?;
        config = config.with_endpoints(endpoints);
    }

    config.validate()?;
    Ok(config)
}
