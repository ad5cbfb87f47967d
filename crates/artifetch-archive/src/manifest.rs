//! Transfer manifest: the paths to copy, one per line, in a private
//! scratch directory.
//!
//! The scratch directory is removed when the [`Manifest`] is dropped, so
//! every exit path of a fetch releases it. [`Manifest::close`] does the
//! same but reports removal errors.
//!
//! Creating the directory and writing the file run together on tokio's
//! blocking pool.

use std::path::{Path, PathBuf};

use artifetch_core::ArtifactPath;
use tempfile::TempDir;

const MANIFEST_NAME: &str = "srcs-file";

/// A written manifest and the scratch directory that holds it.
#[derive(Debug)]
pub struct Manifest {
    dir: TempDir,
    path: PathBuf,
}

impl Manifest {
    /// Write `paths` into a fresh scratch directory under the system temp dir.
    pub async fn write(paths: &[ArtifactPath]) -> std::io::Result<Self> {
        Self::write_in(paths, None).await
    }

    /// Write `paths` into a fresh scratch directory under `scratch_root`,
    /// or under the system temp dir when `None`.
    pub async fn write_in(
        paths: &[ArtifactPath],
        scratch_root: Option<&Path>,
    ) -> std::io::Result<Self> {
        let contents = render(paths);
        let scratch_root = scratch_root.map(Path::to_path_buf);
        tokio::task::spawn_blocking(move || {
            let mut builder = tempfile::Builder::new();
            builder.prefix("artifetch-download");
            let dir = match &scratch_root {
                Some(root) => builder.tempdir_in(root)?,
                None => builder.tempdir()?,
            };
            let path = dir.path().join(MANIFEST_NAME);
            std::fs::write(&path, contents)?;
            Ok::<_, std::io::Error>(Self { dir, path })
        })
        .await
        .map_err(std::io::Error::other)?
    }

    /// Location of the manifest file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove the scratch directory, reporting failures.
    pub fn close(self) -> std::io::Result<()> {
        self.dir.close()
    }
}

/// Newline-joined paths, no trailing newline.
pub fn render(paths: &[ArtifactPath]) -> String {
    paths
        .iter()
        .map(ArtifactPath::as_str)
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(s: &str) -> ArtifactPath {
        ArtifactPath::new(s).unwrap()
    }

    #[test]
    fn render_one_path_per_line() {
        assert_eq!(render(&[p("a/b"), p("c/d")]), "a/b\nc/d");
        assert_eq!(render(&[p("c/d")]), "c/d");
        assert_eq!(render(&[]), "");
    }

    #[tokio::test]
    async fn write_then_close_removes_scratch_dir() {
        let manifest = Manifest::write(&[p("x/y"), p("z")]).await.unwrap();
        let contents = std::fs::read_to_string(manifest.path()).unwrap();
        assert_eq!(contents, "x/y\nz");

        let scratch = manifest.path().parent().unwrap().to_path_buf();
        assert!(scratch.is_dir());
        manifest.close().unwrap();
        assert!(!scratch.exists());
    }

    #[tokio::test]
    async fn drop_removes_scratch_dir() {
        let manifest = Manifest::write(&[p("a")]).await.unwrap();
        let scratch = manifest.path().parent().unwrap().to_path_buf();
        drop(manifest);
        assert!(!scratch.exists());
    }

    #[tokio::test]
    async fn each_manifest_gets_a_private_dir() {
        let a = Manifest::write(&[p("a")]).await.unwrap();
        let b = Manifest::write(&[p("a")]).await.unwrap();
        assert_ne!(a.path(), b.path());
    }

    #[tokio::test]
    async fn write_in_uses_given_scratch_root() {
        let root = tempfile::tempdir().unwrap();
        let manifest = Manifest::write_in(&[p("a")], Some(root.path())).await.unwrap();
        assert!(manifest.path().starts_with(root.path()));
        assert_eq!(std::fs::read_to_string(manifest.path()).unwrap(), "a");
    }

    #[tokio::test]
    async fn unusable_scratch_root_is_an_io_error() {
        let root = tempfile::tempdir().unwrap();
        let not_a_dir = root.path().join("file");
        std::fs::write(&not_a_dir, b"").unwrap();
        assert!(Manifest::write_in(&[p("a")], Some(&not_a_dir)).await.is_err());
    }
}
