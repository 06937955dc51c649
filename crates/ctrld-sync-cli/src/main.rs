mod config;
mod report;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use ctrld_sync::{DefinitionCache, EngineConfig, RetryPolicy, SyncEngine};
use ctrld_sync_api::{
    ControlDClient, DEFAULT_API_BASE, HttpDefinitionSource, RequestExecutor, http_client,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "ctrld-sync")]
#[command(about = "Sync Control D folders with published rule lists")]
#[command(version)]
struct Cli {
    /// Control D API token
    #[arg(long, env = "TOKEN", hide_env_values = true)]
    token: String,

    /// Comma-separated profile ids to sync
    #[arg(long = "profile", env = "PROFILE")]
    profiles: String,

    /// File listing one rule-set URL per line
    #[arg(long, default_value = "lists.txt")]
    lists: PathBuf,

    /// Append a markdown summary to this file
    #[arg(long, env = "GITHUB_STEP_SUMMARY")]
    summary: Option<PathBuf>,

    /// Write the full report as JSON to this file
    #[arg(long)]
    json: Option<PathBuf>,

    /// Policy API base URL
    #[arg(long, env = "CTRLD_API_BASE", default_value = DEFAULT_API_BASE)]
    api_base: String,

    /// Maximum number of profiles synced at once
    #[arg(long, default_value_t = 3)]
    max_concurrent: usize,
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Loaded before logging so a RUST_LOG in .env takes effect.
    let env_file = config::load_env_file(Path::new(".env"));
    init_logging();
    if let Err(e) = env_file {
        tracing::warn!("{e:#}");
    }

    let cli = Cli::parse();

    let profiles = config::parse_profiles(&cli.profiles);
    if profiles.is_empty() {
        anyhow::bail!("no valid profile ids found");
    }

    let urls = config::load_list_urls(&cli.lists)?;
    tracing::info!(count = urls.len(), path = %cli.lists.display(), "loaded lists");

    let client = http_client().context("failed to initialize HTTP client")?;
    let api = ControlDClient::new(
        RequestExecutor::new(client.clone(), RetryPolicy::default()),
        cli.token,
        Some(cli.api_base),
    );
    let definitions = DefinitionCache::new(Arc::new(HttpDefinitionSource::new(client)));

    let engine = SyncEngine::new(
        Arc::new(api),
        Arc::new(definitions),
        urls,
        EngineConfig {
            max_concurrent_profiles: cli.max_concurrent,
            ..EngineConfig::default()
        },
    );

    let report = engine.run(&profiles).await;

    report::print_summary(&report);

    // An unset GITHUB_STEP_SUMMARY can still arrive as an empty string.
    if let Some(path) = cli.summary.filter(|p| !p.as_os_str().is_empty())
        && let Err(e) = report::append_markdown(&path, &report)
    {
        tracing::warn!(error = %e, "could not write summary");
    }

    if let Some(path) = &cli.json {
        report::write_json(path, &report)?;
    }

    if report.all_succeeded() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}
