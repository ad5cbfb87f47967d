//! # Archive
//!
//! Entry point for interacting with the build artifact repository. Holds
//! the tools, the runner and the retry configuration; hands out [`Build`]
//! and [`Builder`] handles that share them.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use artifetch_core::{ArtifactPath, ArtifetchConfig, BuildId};
use tokio_util::sync::CancellationToken;

use crate::build::Build;
use crate::builder::Builder;
use crate::classify::FailureClassifier;
use crate::error::ArchiveError;
use crate::fetch::{FetchSummary, Fetcher};
use crate::listing::list_build;
use crate::runner::{CommandRunner, ProcessRunner};

/// Access to the artifact store through the `artifacts` and `lkg` tools.
///
/// Cheap to clone; clones share the runner and classifier.
#[derive(Debug, Clone)]
pub struct Archive {
    runner: Arc<dyn CommandRunner>,
    artifacts_tool: PathBuf,
    lkg_tool: PathBuf,
    fetcher: Fetcher,
}

impl Archive {
    /// Create an archive that runs tools through `runner`.
    pub fn new(runner: Arc<dyn CommandRunner>, config: &ArtifetchConfig) -> Self {
        let fetcher = Fetcher::new(runner.clone(), &config.artifacts_tool, &config.backoff);
        Self {
            runner,
            artifacts_tool: config.artifacts_tool.clone(),
            lkg_tool: config.lkg_tool.clone(),
            fetcher,
        }
    }

    /// Create an archive that runs tools as child processes.
    pub fn from_config(config: &ArtifetchConfig) -> Self {
        Self::new(Arc::new(ProcessRunner::new()), config)
    }

    /// Replace the failure classifier used for transfers.
    pub fn with_classifier(mut self, classifier: Arc<dyn FailureClassifier>) -> Self {
        self.fetcher = self.fetcher.with_classifier(classifier);
        self
    }

    /// Replace the fetcher, e.g. to change the retry policy for one caller.
    pub fn with_fetcher(mut self, fetcher: Fetcher) -> Self {
        self.fetcher = fetcher;
        self
    }

    /// The transfer engine.
    pub fn fetcher(&self) -> &Fetcher {
        &self.fetcher
    }

    pub(crate) fn runner(&self) -> &dyn CommandRunner {
        self.runner.as_ref()
    }

    pub(crate) fn lkg_tool(&self) -> &Path {
        &self.lkg_tool
    }

    /// Handle for the builder called `name`.
    pub fn builder(&self, name: impl Into<String>) -> Builder {
        Builder::new(self.clone(), name.into())
    }

    /// List the artifacts that make up `build_id`, in store order.
    pub async fn list(
        &self,
        build_id: &BuildId,
        cancel: &CancellationToken,
    ) -> Result<Vec<String>, ArchiveError> {
        list_build(self.runner.as_ref(), &self.artifacts_tool, build_id, cancel).await
    }

    /// A lazy handle for `id`, materialized under `root`. Nothing is
    /// contacted until the listing is needed.
    pub fn build(&self, id: BuildId, root: &Path) -> Build {
        Build::new(self.clone(), id, root)
    }

    /// A handle for `id` whose listing has already been fetched, so that a
    /// nonexistent build fails here with [`ArchiveError::ListFailed`].
    pub async fn build_by_id(
        &self,
        id: BuildId,
        root: &Path,
        cancel: &CancellationToken,
    ) -> Result<Build, ArchiveError> {
        let build = self.build(id, root);
        build.artifacts(cancel).await?;
        Ok(build)
    }

    /// Copy `paths` from `build_id` into `destination`, skipping files that
    /// are already there.
    pub async fn download(
        &self,
        build_id: &BuildId,
        from_root: bool,
        destination: &Path,
        paths: &[ArtifactPath],
        cancel: &CancellationToken,
    ) -> Result<FetchSummary, ArchiveError> {
        self.fetcher
            .fetch(build_id, destination, paths, from_root, cancel)
            .await
    }
}
