//! # Latest CLI — Resolve a builder's most recent successful build.

use std::path::Path;

use anyhow::{Context, Result};
use clap::Args;

use artifetch_archive::{Archive, CancellationToken};
use artifetch_core::ArtifactPath;

use crate::fetch::print_summary;

/// Arguments for `artifetch latest`.
#[derive(Args, Debug)]
pub struct LatestArgs {
    /// Builder name, e.g. `core.x64-release`.
    pub builder: String,

    /// Also fetch these artifacts from the resolved build.
    #[arg(long, num_args = 1..)]
    pub fetch: Vec<ArtifactPath>,
}

/// Execute the latest subcommand.
pub async fn run_latest(
    args: &LatestArgs,
    archive: &Archive,
    output_dir: &Path,
    cancel: &CancellationToken,
) -> Result<u8> {
    let builder = archive.builder(&args.builder);

    if args.fetch.is_empty() {
        let id = builder
            .latest_build_id(cancel)
            .await
            .with_context(|| format!("failed to resolve latest build of {}", args.builder))?;
        println!("{id}");
        return Ok(0);
    }

    let build = builder
        .latest_build(output_dir, cancel)
        .await
        .with_context(|| format!("failed to resolve latest build of {}", args.builder))?;
    let summary = build
        .fetch(&args.fetch, cancel)
        .await
        .with_context(|| format!("failed to fetch from build {}", build.id()))?;
    print_summary(&build, build.build_dir(), &summary, false)?;
    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use artifetch_archive::testing::ScriptedRunner;
    use artifetch_archive::CommandOutput;
    use artifetch_core::ArtifetchConfig;
    use std::sync::Arc;

    #[tokio::test]
    async fn resolves_without_listing_when_nothing_to_fetch() {
        let runner = Arc::new(ScriptedRunner::new());
        runner.push_output(CommandOutput::success("8800\n"));
        let archive = Archive::new(runner.clone(), &ArtifetchConfig::default());
        let out = tempfile::tempdir().unwrap();
        let args = LatestArgs {
            builder: "core.x64-release".to_string(),
            fetch: Vec::new(),
        };

        let code = run_latest(&args, &archive, out.path(), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(code, 0);
        assert_eq!(runner.call_count(), 1);
    }

    #[tokio::test]
    async fn fetches_into_resolved_build_dir() {
        let runner = Arc::new(ScriptedRunner::new().materializing());
        runner.push_output(CommandOutput::success("8800\n"));
        runner.push_output(CommandOutput::success("images/a\n"));
        let archive = Archive::new(runner.clone(), &ArtifetchConfig::default());
        let out = tempfile::tempdir().unwrap();
        let args = LatestArgs {
            builder: "core.x64-release".to_string(),
            fetch: vec![ArtifactPath::new("images/a").unwrap()],
        };

        run_latest(&args, &archive, out.path(), &CancellationToken::new())
            .await
            .unwrap();
        assert!(out.path().join("8800/images/a").is_file());
        assert_eq!(runner.call_count(), 3);
    }
}
