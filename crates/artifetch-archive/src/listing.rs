//! Build listing.
//!
//! A failed listing is surfaced immediately, never retried: an unknown
//! build id is a caller error, not a transient store fault.

use std::path::Path;

use artifetch_core::BuildId;
use tokio_util::sync::CancellationToken;

use crate::error::{ArchiveError, CommandFailure};
use crate::request::list_args;
use crate::runner::CommandRunner;

/// List the artifact paths that exist for `build_id`, in store order.
pub async fn list_build(
    runner: &dyn CommandRunner,
    artifacts_tool: &Path,
    build_id: &BuildId,
    cancel: &CancellationToken,
) -> Result<Vec<String>, ArchiveError> {
    let args = list_args(build_id);
    let result = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Err(ArchiveError::Cancelled),
        result = runner.run(artifacts_tool, &args) => result,
    };

    let output = result.map_err(|source| ArchiveError::ListFailed {
        build_id: build_id.clone(),
        source: CommandFailure::Spawn {
            program: artifacts_tool.to_path_buf(),
            source,
        },
    })?;

    if let Some(failure) = output.failure_of(artifacts_tool) {
        if !output.stdout.is_empty() {
            tracing::info!(
                build_id = %build_id,
                "artifacts output:\n{}",
                String::from_utf8_lossy(&output.stdout)
            );
        }
        return Err(ArchiveError::ListFailed {
            build_id: build_id.clone(),
            source: failure,
        });
    }

    let paths: Vec<String> = String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(str::trim_end)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect();
    tracing::debug!(build_id = %build_id, count = paths.len(), "listed build artifacts");
    Ok(paths)
}
