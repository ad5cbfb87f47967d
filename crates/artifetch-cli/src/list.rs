//! # List CLI — Print a build's artifacts.

use anyhow::{Context, Result};
use clap::Args;

use artifetch_archive::{Archive, CancellationToken};
use artifetch_core::BuildId;

/// Arguments for `artifetch list`.
#[derive(Args, Debug)]
pub struct ListArgs {
    /// Build to list.
    pub build_id: BuildId,

    /// Print the listing as a JSON array.
    #[arg(long)]
    pub json: bool,
}

/// Execute the list subcommand.
pub async fn run_list(args: &ListArgs, archive: &Archive, cancel: &CancellationToken) -> Result<u8> {
    let listed = archive
        .list(&args.build_id, cancel)
        .await
        .with_context(|| format!("failed to list build {}", args.build_id))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&listed)?);
    } else {
        for path in &listed {
            println!("{path}");
        }
    }
    tracing::info!(build_id = %args.build_id, count = listed.len(), "listed build");
    Ok(0)
}
