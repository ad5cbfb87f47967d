//! # Fetch CLI — Materialize build artifacts locally.
//!
//! Paths come from the command line, from a newline-separated
//! `--srcs-file`, or both. Files already under the destination are
//! skipped.
//!
//! | Flags      | Store paths relative to | Destination           |
//! |------------|-------------------------|-----------------------|
//! | (none)     | the build               | `<output-dir>/<id>`   |
//! | `--root`   | the store root          | `<output-dir>/<id>`   |
//! | `--blobs`  | the store root          | `<output-dir>/blobs`  |

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;

use artifetch_archive::{Archive, Build, CancellationToken, FetchSummary};
use artifetch_core::{ArtifactPath, BuildId};

/// Arguments for `artifetch fetch`.
#[derive(Args, Debug)]
pub struct FetchArgs {
    /// Build to fetch from.
    pub build_id: BuildId,

    /// Artifact paths to fetch.
    #[arg(required_unless_present = "srcs_file")]
    pub paths: Vec<ArtifactPath>,

    /// File listing additional artifact paths, one per line.
    #[arg(long)]
    pub srcs_file: Option<PathBuf>,

    /// Resolve paths from the store root instead of the build directory.
    #[arg(long, conflicts_with = "blobs")]
    pub root: bool,

    /// Fetch root-relative blobs into the shared blobs directory.
    #[arg(long)]
    pub blobs: bool,

    /// Override the maximum number of transfer attempts.
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    pub max_attempts: Option<u32>,

    /// Print the fetch summary as JSON.
    #[arg(long)]
    pub json: bool,
}

/// Execute the fetch subcommand.
pub async fn run_fetch(
    args: &FetchArgs,
    archive: &Archive,
    output_dir: &Path,
    cancel: &CancellationToken,
) -> Result<u8> {
    let mut paths = args.paths.clone();
    if let Some(srcs_file) = &args.srcs_file {
        paths.extend(read_srcs_file(srcs_file)?);
    }

    let archive = match args.max_attempts {
        Some(n) => {
            let policy = archive.fetcher().policy().with_max_attempts(n);
            archive
                .clone()
                .with_fetcher(archive.fetcher().clone().with_policy(policy))
        }
        None => archive.clone(),
    };

    let build = archive.build(args.build_id.clone(), output_dir);
    let summary = if args.blobs {
        build.fetch_blobs(&paths, cancel).await
    } else if args.root {
        build.fetch_from_root(&paths, cancel).await
    } else {
        build.fetch(&paths, cancel).await
    }
    .with_context(|| format!("failed to fetch from build {}", args.build_id))?;

    let destination = if args.blobs { build.blobs_dir() } else { build.build_dir() };
    print_summary(&build, destination, &summary, args.json)?;
    Ok(0)
}

/// Read artifact paths from a newline-separated file. Blank lines are
/// ignored; surrounding whitespace is trimmed.
pub fn read_srcs_file(path: &Path) -> Result<Vec<ArtifactPath>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read srcs file: {}", path.display()))?;
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| {
            ArtifactPath::new(line)
                .with_context(|| format!("invalid artifact path in {}", path.display()))
        })
        .collect()
}

pub(crate) fn print_summary(
    build: &Build,
    destination: &Path,
    summary: &FetchSummary,
    json: bool,
) -> Result<()> {
    if json {
        let report = serde_json::json!({
            "build_id": build.id(),
            "destination": destination,
            "fetched": summary.fetched,
            "skipped": summary.skipped,
            "attempts": summary.attempts,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("  build:       {}", build.id());
    println!("  destination: {}", destination.display());
    println!("  fetched:     {}", summary.fetched.len());
    println!("  skipped:     {}", summary.skipped.len());
    println!("  attempts:    {}", summary.attempts);
    Ok(())
}
