//! Gather CLI - command-line client for the Gather meetup service

mod commands;
mod config;
mod logging;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use commands::Commands;
use config::GatherConfig;
use gather_core::TokenStore;
use gather_http::{CookieJar, GatherClient};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{Level, debug, error, warn};

#[derive(Parser)]
#[command(name = "gather")]
#[command(about = "Find, join and host gatherings from the terminal")]
#[command(version)]
struct Cli {
    /// Configuration file (defaults to gather.toml, config/gather.toml or the user config dir)
    #[arg(short = 'c', long, global = true)]
    config: Option<PathBuf>,

    /// Backend base URL, overriding the configuration
    #[arg(long, global = true, env = "GATHER_BASE_URL")]
    base_url: Option<String>,

    /// Set logging level
    #[arg(short = 'l', long, global = true, default_value = "warn")]
    log_level: LogLevel,

    /// Write logs to this file instead of stderr
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let _log_guard = logging::init_logging(cli.log_level.into(), cli.log_file.as_deref())?;

    if let Err(e) = run(cli).await {
        error!("Command failed: {e:#}");
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }

    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = GatherConfig::load(cli.config.as_deref()).context("loading configuration")?;
    if let Some(base_url) = cli.base_url {
        config.api.base_url = base_url;
    }
    debug!(base_url = %config.api.base_url, "Configuration loaded");

    let storage = config
        .storage
        .file_storage()
        .context("locating token storage")?;
    debug!(path = %storage.path().display(), "Using token file");
    let jar = CookieJar::open(config.storage.cookie_path(storage.path()));

    let mut builder = GatherClient::builder()
        .base_url(&config.api.base_url)
        .token_store(TokenStore::new(Arc::new(storage)))
        .session_config(config.session.clone())
        .cookie_jar(jar.clone());
    if let Some(timeout) = config.api.timeout() {
        builder = builder.timeout(timeout);
    }
    if let Some(agent) = &config.api.user_agent {
        builder = builder.user_agent(agent);
    }
    let client = builder.build().context("building API client")?;

    let result = cli.command.execute(client).await;
    if let Err(e) = jar.save() {
        warn!(path = %jar.path().display(), "Failed to save cookies: {}", e);
    }
    result
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for Level {
    fn from(log_level: LogLevel) -> Self {
        match log_level {
            LogLevel::Error => Self::ERROR,
            LogLevel::Warn => Self::WARN,
            LogLevel::Info => Self::INFO,
            LogLevel::Debug => Self::DEBUG,
            LogLevel::Trace => Self::TRACE,
        }
    }
}
