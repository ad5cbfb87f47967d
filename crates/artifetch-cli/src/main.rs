//! # artifetch CLI entry point
//!
//! Parses command-line arguments, loads configuration and dispatches to
//! subcommand handlers on a tokio runtime. Ctrl-C cancels the in-flight
//! operation.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use artifetch_archive::{Archive, CancellationToken};
use artifetch_cli::exit_code_for;
use artifetch_cli::fetch::{run_fetch, FetchArgs};
use artifetch_cli::latest::{run_latest, LatestArgs};
use artifetch_cli::list::{run_list, ListArgs};
use artifetch_core::ArtifetchConfig;

/// Fetch build artifacts from the artifact store.
///
/// Artifacts already present locally are skipped. Transfers are batched
/// into one store call and retried with bounded exponential backoff;
/// missing artifacts fail immediately.
#[derive(Parser, Debug)]
#[command(name = "artifetch", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to a YAML configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Root directory that builds are materialized under.
    #[arg(long, global = true)]
    output_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List the artifacts in a build.
    List(ListArgs),

    /// Fetch artifacts from a build, skipping those already present.
    Fetch(FetchArgs),

    /// Resolve the latest successful build of a builder.
    Latest(LatestArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!("artifetch v{} starting", env!("CARGO_PKG_VERSION"));

    match run(cli) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(exit_code_for(&e))
        }
    }
}

fn run(cli: Cli) -> Result<u8> {
    let config = load_config(&cli)?;
    tracing::debug!(
        artifacts_tool = %config.artifacts_tool.display(),
        output_dir = %config.output_dir.display(),
        max_attempts = config.backoff.max_attempts,
        "loaded configuration"
    );

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;

    runtime.block_on(async move {
        let cancel = CancellationToken::new();
        let on_signal = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("interrupted; cancelling");
                on_signal.cancel();
            }
        });

        let archive = Archive::from_config(&config);
        let output_dir = &config.output_dir;
        match &cli.command {
            Commands::List(args) => run_list(args, &archive, &cancel).await,
            Commands::Fetch(args) => run_fetch(args, &archive, output_dir, &cancel).await,
            Commands::Latest(args) => run_latest(args, &archive, output_dir, &cancel).await,
        }
    })
}

/// Defaults, then the YAML file, then the environment, then CLI flags.
fn load_config(cli: &Cli) -> Result<ArtifetchConfig> {
    let mut config = ArtifetchConfig::load(cli.config.as_deref()).with_context(|| match &cli.config {
        Some(path) => format!("failed to load configuration from {}", path.display()),
        None => "failed to load configuration from environment".to_string(),
    })?;
    if let Some(dir) = &cli.output_dir {
        config.output_dir = dir.clone();
    }
    Ok(config)
}
