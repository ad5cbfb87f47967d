//! Build handle.
//!
//! A [`Build`] owns no remote resources and can be dropped at any time.
//! Its listing is fetched at most once and then memoized.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use artifetch_core::{ArtifactPath, BuildId};
use tokio::sync::OnceCell;
use tokio_util::sync::CancellationToken;

use crate::archive::Archive;
use crate::error::ArchiveError;
use crate::fetch::FetchSummary;

/// Name of the directory shared by every build for content-identified blobs.
pub const BLOBS_DIR: &str = "blobs";

/// One build's artifacts and where they are materialized locally.
#[derive(Debug)]
pub struct Build {
    id: BuildId,
    archive: Archive,
    build_dir: PathBuf,
    blobs_dir: PathBuf,
    srcs: OnceCell<HashSet<String>>,
}

impl Build {
    pub(crate) fn new(archive: Archive, id: BuildId, root: &Path) -> Self {
        Self {
            build_dir: root.join(id.as_str()),
            blobs_dir: root.join(BLOBS_DIR),
            id,
            archive,
            srcs: OnceCell::new(),
        }
    }

    /// The build id.
    pub fn id(&self) -> &BuildId {
        &self.id
    }

    /// `<root>/<id>`: where this build's artifacts land.
    pub fn build_dir(&self) -> &Path {
        &self.build_dir
    }

    /// `<root>/blobs`: shared across builds.
    pub fn blobs_dir(&self) -> &Path {
        &self.blobs_dir
    }

    /// Every artifact path in the build. Lists the store on first use only;
    /// a failed listing is not cached.
    pub async fn artifacts(
        &self,
        cancel: &CancellationToken,
    ) -> Result<&HashSet<String>, ArchiveError> {
        self.srcs
            .get_or_try_init(|| async {
                let listed = self.archive.list(&self.id, cancel).await?;
                Ok::<_, ArchiveError>(listed.into_iter().collect())
            })
            .await
    }

    /// Whether the build's listing contains `path`.
    pub async fn contains(
        &self,
        path: &ArtifactPath,
        cancel: &CancellationToken,
    ) -> Result<bool, ArchiveError> {
        Ok(self.artifacts(cancel).await?.contains(path.as_str()))
    }

    /// Fetch `paths`, relative to the build, into [`build_dir`](Self::build_dir).
    pub async fn fetch(
        &self,
        paths: &[ArtifactPath],
        cancel: &CancellationToken,
    ) -> Result<FetchSummary, ArchiveError> {
        self.archive
            .download(&self.id, false, &self.build_dir, paths, cancel)
            .await
    }

    /// Fetch `paths`, relative to the store root, into
    /// [`build_dir`](Self::build_dir).
    pub async fn fetch_from_root(
        &self,
        paths: &[ArtifactPath],
        cancel: &CancellationToken,
    ) -> Result<FetchSummary, ArchiveError> {
        self.archive
            .download(&self.id, true, &self.build_dir, paths, cancel)
            .await
    }

    /// Fetch root-relative `paths` into the shared
    /// [`blobs_dir`](Self::blobs_dir).
    pub async fn fetch_blobs(
        &self,
        paths: &[ArtifactPath],
        cancel: &CancellationToken,
    ) -> Result<FetchSummary, ArchiveError> {
        self.archive
            .download(&self.id, true, &self.blobs_dir, paths, cancel)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::CommandOutput;
    use crate::testing::ScriptedRunner;
    use artifetch_core::ArtifetchConfig;
    use std::sync::Arc;

    fn archive(runner: &Arc<ScriptedRunner>) -> Archive {
        Archive::new(runner.clone(), &ArtifetchConfig::default())
    }

    #[test]
    fn directories_are_derived_from_root_and_id() {
        let runner = Arc::new(ScriptedRunner::new());
        let build = archive(&runner).build(BuildId::new("8800").unwrap(), Path::new("/out"));
        assert_eq!(build.build_dir(), Path::new("/out/8800"));
        assert_eq!(build.blobs_dir(), Path::new("/out/blobs"));
        assert_eq!(runner.call_count(), 0);
    }

    #[tokio::test]
    async fn listing_is_memoized() {
        let runner = Arc::new(ScriptedRunner::new());
        runner.push_output(CommandOutput::success("a/b\nc/d\n"));
        let build = archive(&runner).build(BuildId::new("1").unwrap(), Path::new("/out"));
        let cancel = CancellationToken::new();

        assert!(build
            .contains(&ArtifactPath::new("a/b").unwrap(), &cancel)
            .await
            .unwrap());
        assert!(!build
            .contains(&ArtifactPath::new("x").unwrap(), &cancel)
            .await
            .unwrap());
        assert_eq!(build.artifacts(&cancel).await.unwrap().len(), 2);
        assert_eq!(runner.call_count(), 1);
    }

    #[tokio::test]
    async fn failed_listing_is_retried_on_next_use() {
        let runner = Arc::new(ScriptedRunner::new());
        runner.push_output(CommandOutput::failure(1, "flaky"));
        runner.push_output(CommandOutput::success("a\n"));
        let build = archive(&runner).build(BuildId::new("1").unwrap(), Path::new("/out"));
        let cancel = CancellationToken::new();

        assert!(build.artifacts(&cancel).await.is_err());
        assert_eq!(build.artifacts(&cancel).await.unwrap().len(), 1);
        assert_eq!(runner.call_count(), 2);
    }

    #[tokio::test]
    async fn fetch_targets_build_dir_and_blobs_target_shared_dir() {
        let root = tempfile::tempdir().unwrap();
        let runner = Arc::new(ScriptedRunner::new().materializing());
        let build = archive(&runner).build(BuildId::new("42").unwrap(), root.path());
        let cancel = CancellationToken::new();

        build
            .fetch(&[ArtifactPath::new("images/fuchsia.zbi").unwrap()], &cancel)
            .await
            .unwrap();
        build
            .fetch_blobs(&[ArtifactPath::new("ab12").unwrap()], &cancel)
            .await
            .unwrap();

        assert!(root.path().join("42/images/fuchsia.zbi").is_file());
        assert!(root.path().join("blobs/ab12").is_file());

        let calls = runner.invocations();
        assert!(!calls[0].args.contains(&"-root".to_string()));
        assert!(calls[1].args.contains(&"-root".to_string()));
    }
}
