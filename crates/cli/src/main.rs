//! Hookprobe CLI entry point.
//!
//! This binary is the composition root. Responsibilities:
//!
//! 1. **Parse configuration**: load the optional TOML config file, apply
//!    command-line overrides, and validate the result.
//! 2. **Wire observability**: configure `tracing-subscriber` (plain or JSON,
//!    filtered by `RUST_LOG`). All spans and events from every crate in the
//!    workspace flow through this layer.
//! 3. **Construct infrastructure**: load the job manifest into a
//!    `ManifestRegistry`, create the process identity and the trigger sink, and
//!    inject them into a `Dispatcher`.
//! 4. **Run the command**: `dispatch` runs one pass for a notification and
//!    prints the report as JSON; `match` checks one remote against a
//!    notification URL without touching the registry.

mod config;
mod telemetry;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dispatch::{match_configuration, Dispatcher, RemoteConfig, RepositoryUrl, SourceConfiguration};
use registry::{LoggingSink, ManifestRegistry, ProcessIdentity};
use tracing::info;

use crate::config::{Config, FileConfig, Overrides};

#[derive(Parser)]
#[command(name = "hookprobe")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Trigger the jobs whose repository configuration matches a change notification", long_about = None)]
struct Cli {
    /// Path to the TOML config file
    #[arg(short, long, global = true, env = "HOOKPROBE_CONFIG")]
    config: Option<PathBuf>,

    /// Path to the job manifest (overrides the config file)
    #[arg(short, long, global = true, env = "HOOKPROBE_MANIFEST")]
    manifest: Option<PathBuf>,

    /// Default log level when RUST_LOG is not set
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one dispatch pass for a repository change notification
    Dispatch {
        /// Repository URL from the notification
        #[arg(long)]
        url: String,

        /// Source-control kind: git or hg
        #[arg(long, default_value = "git")]
        kind: String,

        /// Identity the change is attributed to
        #[arg(long, default_value = "")]
        actor: String,

        /// Webhook payload passed through to triggers
        #[arg(long, conflicts_with = "payload_file")]
        payload: Option<String>,

        /// Read the webhook payload from a file
        #[arg(long)]
        payload_file: Option<PathBuf>,
    },

    /// Check whether a git remote would match a notification URL
    Match {
        /// Remote configured on a job
        #[arg(long)]
        remote: String,

        /// Repository URL from the notification
        #[arg(long)]
        url: String,

        /// Override URL configured on the job
        #[arg(long)]
        override_url: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Match {
            remote,
            url,
            override_url,
        } => {
            telemetry::init_tracing(cli.json, tracing::Level::WARN);
            let matched = check_match(&remote, &url, override_url.as_deref())?;
            println!("{matched}");
            Ok(())
        }
        Commands::Dispatch {
            url,
            kind,
            actor,
            payload,
            payload_file,
        } => {
            let file = match &cli.config {
                Some(path) => FileConfig::load(path)?,
                None => FileConfig::default(),
            };
            let config = Config::resolve(
                file,
                Overrides {
                    manifest: cli.manifest,
                    log_level: cli.log_level,
                    json_logs: cli.json,
                },
            )?;
            telemetry::init_tracing(config.json_logs, config.log_level);

            let payload = match payload_file {
                Some(path) => tokio::fs::read_to_string(&path)
                    .await
                    .with_context(|| format!("failed to read payload file {}", path.display()))?,
                None => payload.unwrap_or_default(),
            };

            run_dispatch(&config, &actor, &url, &kind, &payload).await
        }
    }
}

async fn run_dispatch(
    config: &Config,
    actor: &str,
    url: &str,
    kind: &str,
    payload: &str,
) -> Result<()> {
    let sink = Arc::new(LoggingSink::new());
    let registry = ManifestRegistry::load(&config.manifest, sink.clone())
        .await
        .context("failed to load job manifest")?;
    info!(
        manifest = %config.manifest.display(),
        jobs = registry.job_count(),
        owners = registry.owner_count(),
        "Loaded job manifest"
    );

    let dispatcher = Dispatcher::new(Arc::new(registry), Arc::new(ProcessIdentity::new(None)))
        .with_system_identity(config.system_identity.clone());

    let report = dispatcher
        .dispatch_with_report(actor, url, kind, payload)
        .await
        .context("dispatch failed")?;

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn check_match(remote: &str, url: &str, override_url: Option<&str>) -> Result<bool> {
    let notify = RepositoryUrl::parse(url).context("invalid notification URL")?;
    let remote = RepositoryUrl::parse(remote).context("invalid remote")?;
    let config = SourceConfiguration::Git {
        remotes: vec![RemoteConfig::new("origin", vec![remote])],
    };
    Ok(match_configuration(&config, &notify, override_url))
}
