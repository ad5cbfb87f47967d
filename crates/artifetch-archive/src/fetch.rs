//! # Batch Fetch Orchestrator
//!
//! Materializes a set of artifact paths from one build into a local
//! directory with a single `artifacts cp` invocation per attempt.
//!
//! 1. De-duplicate the request, keeping first-seen order.
//! 2. Skip everything already on disk; if nothing is left, return without
//!    touching the store.
//! 3. Write the remaining paths to a manifest in a private scratch dir.
//! 4. Run the transfer under the [`RetryPolicy`], classifying each failure
//!    through the [`FailureClassifier`].
//!
//! The scratch directory is released on every exit path.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use artifetch_core::{ArtifactPath, BackoffConfig, BuildId};
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::cache::{self, Partition};
use crate::classify::{Classification, FailureClassifier, StoreMessagesV1};
use crate::error::{ArchiveError, CommandFailure};
use crate::manifest::Manifest;
use crate::request::FetchRequest;
use crate::retry::{retry, Attempt, RetryError, RetryPolicy};
use crate::runner::CommandRunner;

/// What a fetch did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FetchSummary {
    /// Paths handed to the store, in manifest order.
    pub fetched: Vec<ArtifactPath>,
    /// Paths that were already materialized.
    pub skipped: Vec<ArtifactPath>,
    /// Transfer attempts made; zero when nothing needed fetching.
    pub attempts: u32,
}

/// Runs batched transfers against the `artifacts` tool.
#[derive(Debug, Clone)]
pub struct Fetcher {
    runner: Arc<dyn CommandRunner>,
    artifacts_tool: PathBuf,
    policy: RetryPolicy,
    classifier: Arc<dyn FailureClassifier>,
    scratch_root: Option<PathBuf>,
}

impl Fetcher {
    /// Create a fetcher using the default store message classifier.
    pub fn new(
        runner: Arc<dyn CommandRunner>,
        artifacts_tool: impl Into<PathBuf>,
        backoff: &BackoffConfig,
    ) -> Self {
        Self {
            runner,
            artifacts_tool: artifacts_tool.into(),
            policy: RetryPolicy::from_config(backoff),
            classifier: Arc::new(StoreMessagesV1),
            scratch_root: None,
        }
    }

    /// Replace the failure classifier.
    pub fn with_classifier(mut self, classifier: Arc<dyn FailureClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    /// Replace the retry policy.
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Create manifest scratch directories under `root` instead of the
    /// system temp dir.
    pub fn with_scratch_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.scratch_root = Some(root.into());
        self
    }

    /// The retry policy in effect.
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Fetch `paths` from `build_id` into `destination`.
    ///
    /// With `from_root`, the store resolves paths from its root rather than
    /// from the build's directory.
    pub async fn fetch(
        &self,
        build_id: &BuildId,
        destination: &Path,
        paths: &[ArtifactPath],
        from_root: bool,
        cancel: &CancellationToken,
    ) -> Result<FetchSummary, ArchiveError> {
        let requested = cache::dedup_preserving_order(paths);
        let Partition { present, missing } =
            cache::partition_blocking(requested, destination.to_path_buf()).await;

        tracing::info!(build_id = %build_id, skipped = present.len(), "skipping files already present");
        if missing.is_empty() {
            tracing::info!(build_id = %build_id, "no files left to download");
            return Ok(FetchSummary {
                fetched: Vec::new(),
                skipped: present,
                attempts: 0,
            });
        }

        let manifest = Manifest::write_in(&missing, self.scratch_root.as_deref())
            .await
            .map_err(|source| ArchiveError::ManifestIo {
                context: "writing manifest",
                source,
            })?;

        let request = FetchRequest {
            build_id: build_id.clone(),
            destination: destination.to_path_buf(),
            manifest: manifest.path().to_path_buf(),
            from_root,
        };

        let noun = if missing.len() == 1 { "artifact" } else { "artifacts" };
        tracing::info!(
            build_id = %build_id,
            fetched = missing.len(),
            "downloading {} {noun} to {}",
            missing.len(),
            destination.display()
        );
        for path in &missing {
            tracing::info!("  {path}");
        }

        let request = &request;
        let result = retry(&self.policy, cancel, move |attempt| {
            self.attempt(request, attempt)
        })
        .await;

        match result {
            Ok(((), state)) => {
                manifest.close().map_err(|source| ArchiveError::ManifestIo {
                    context: "removing manifest",
                    source,
                })?;
                Ok(FetchSummary {
                    fetched: missing,
                    skipped: present,
                    attempts: state.attempts,
                })
            }
            Err(err) => {
                if let Err(e) = manifest.close() {
                    tracing::warn!("failed to remove manifest scratch dir: {e}");
                }
                Err(match err {
                    RetryError::Fatal { error, .. } => ArchiveError::ArtifactNotFound {
                        build_id: build_id.clone(),
                        paths: missing,
                        source: error,
                    },
                    RetryError::Exhausted { last, state } => ArchiveError::FetchExhausted {
                        build_id: build_id.clone(),
                        attempts: state.attempts,
                        source: last,
                    },
                    RetryError::Cancelled { .. } => ArchiveError::Cancelled,
                })
            }
        }
    }

    async fn attempt(
        &self,
        request: &FetchRequest,
        attempt: u32,
    ) -> Result<(), Attempt<CommandFailure>> {
        tracing::debug!(build_id = %request.build_id, attempt, "running artifacts cp");
        let output = self
            .runner
            .run(&self.artifacts_tool, &request.args())
            .await
            .map_err(|source| {
                Attempt::Transient(CommandFailure::Spawn {
                    program: self.artifacts_tool.clone(),
                    source,
                })
            })?;

        if !output.stdout.is_empty() {
            tracing::info!("artifacts stdout:\n{}", String::from_utf8_lossy(&output.stdout));
        }
        if !output.stderr.is_empty() {
            tracing::info!("artifacts stderr:\n{}", String::from_utf8_lossy(&output.stderr));
        }

        let Some(failure) = output.failure_of(&self.artifacts_tool) else {
            return Ok(());
        };
        match self.classifier.classify(&output.stderr) {
            Classification::Fatal if !output.stderr.is_empty() => Err(Attempt::Fatal(failure)),
            _ => Err(Attempt::Transient(failure)),
        }
    }
}
