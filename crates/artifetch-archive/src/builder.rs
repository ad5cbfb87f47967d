//! Latest-build lookup through the `lkg` ("last known good") tool.

use std::path::Path;

use artifetch_core::BuildId;
use tokio_util::sync::CancellationToken;

use crate::archive::Archive;
use crate::build::Build;
use crate::error::{ArchiveError, CommandFailure};
use crate::request::latest_build_args;

/// A named CI builder.
#[derive(Debug, Clone)]
pub struct Builder {
    archive: Archive,
    name: String,
}

impl Builder {
    pub(crate) fn new(archive: Archive, name: String) -> Self {
        Self { archive, name }
    }

    /// The builder name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The id of this builder's most recent successful build. Not retried.
    pub async fn latest_build_id(&self, cancel: &CancellationToken) -> Result<BuildId, ArchiveError> {
        let lkg = self.archive.lkg_tool();
        let args = latest_build_args(&self.name);
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ArchiveError::Cancelled),
            result = self.archive.runner().run(lkg, &args) => result,
        };

        let output = result.map_err(|source| self.failed(CommandFailure::Spawn {
            program: lkg.to_path_buf(),
            source,
        }))?;
        if let Some(failure) = output.failure_of(lkg) {
            return Err(self.failed(failure));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let line = stdout
            .lines()
            .map(str::trim)
            .find(|l| !l.is_empty())
            .ok_or_else(|| self.failed(CommandFailure::EmptyOutput {
                program: lkg.to_path_buf(),
            }))?;
        let id = BuildId::new(line)?;
        tracing::info!(builder = %self.name, build_id = %id, "resolved latest build");
        Ok(id)
    }

    /// The most recent successful build, with its listing already fetched.
    pub async fn latest_build(
        &self,
        root: &Path,
        cancel: &CancellationToken,
    ) -> Result<Build, ArchiveError> {
        let id = self.latest_build_id(cancel).await?;
        self.archive.build_by_id(id, root, cancel).await
    }

    fn failed(&self, source: CommandFailure) -> ArchiveError {
        ArchiveError::LatestBuildFailed {
            builder: self.name.clone(),
            source,
        }
    }
}
