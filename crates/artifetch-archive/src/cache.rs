//! Local cache filter.
//!
//! Presence is decided by a `stat` of the destination path, not by content.
//! Only a regular file counts as present; a directory always needs a
//! fetch, since its contents cannot be checked without asking the store.
//!
//! [`partition`] stats the filesystem synchronously. Async callers use
//! [`partition_blocking`], which runs it on tokio's blocking pool.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use artifetch_core::ArtifactPath;

/// Requested paths split by whether they are already materialized.
///
/// `present` and `missing` are disjoint and together hold every input
/// path, each in input order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Partition {
    /// Regular files already at the destination.
    pub present: Vec<ArtifactPath>,
    /// Paths that must be fetched.
    pub missing: Vec<ArtifactPath>,
}

/// Split `paths` by whether a regular file already exists under `destination`.
pub fn partition(paths: &[ArtifactPath], destination: &Path) -> Partition {
    let mut out = Partition::default();
    for path in paths {
        if is_materialized(&path.resolve_in(destination)) {
            out.present.push(path.clone());
        } else {
            out.missing.push(path.clone());
        }
    }
    out
}

/// [`partition`] on the blocking pool.
///
/// If the blocking task is torn down before it runs (runtime shutdown),
/// every path is reported missing so nothing is skipped unchecked.
pub async fn partition_blocking(paths: Vec<ArtifactPath>, destination: PathBuf) -> Partition {
    let fallback = paths.clone();
    match tokio::task::spawn_blocking(move || partition(&paths, &destination)).await {
        Ok(part) => part,
        Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
        Err(_) => Partition {
            present: Vec::new(),
            missing: fallback,
        },
    }
}

/// Whether `path` is a regular file (symlinks followed).
pub fn is_materialized(path: &Path) -> bool {
    std::fs::metadata(path)
        .map(|meta| meta.is_file())
        .unwrap_or(false)
}

/// Drop repeated paths, keeping the first occurrence of each.
pub fn dedup_preserving_order(paths: &[ArtifactPath]) -> Vec<ArtifactPath> {
    let mut seen = HashSet::with_capacity(paths.len());
    paths
        .iter()
        .filter(|p| seen.insert(p.as_str()))
        .cloned()
        .collect()
}
