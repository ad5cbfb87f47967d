//! # Archive Error Types
//!
//! Structured errors for listing and fetching build artifacts. Callers
//! branch on the variant, not the message:
//!
//! - [`ArchiveError::ArtifactNotFound`] means the artifact genuinely does
//!   not exist. Retrying the whole operation will not help.
//! - [`ArchiveError::FetchExhausted`] means the store was unreachable or
//!   unstable for the whole retry budget. Retrying later may help.

use std::path::PathBuf;

use artifetch_core::{ArtifactPath, BuildId, ValidationError};
use thiserror::Error;

/// Why a single external command did not succeed.
#[derive(Error, Debug)]
pub enum CommandFailure {
    /// The program could not be started or waited on.
    #[error("failed to run {}: {source}", .program.display())]
    Spawn {
        /// Program that was being run.
        program: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The program failed and wrote diagnostics to stderr.
    #[error("{} failed with {}: {stderr}", .program.display(), exit_label(.code))]
    Stderr {
        /// Program that was run.
        program: PathBuf,
        /// Exit code, if the program exited normally.
        code: Option<i32>,
        /// Captured stderr, lossily decoded.
        stderr: String,
    },

    /// The program failed without writing anything to stderr.
    #[error("{} failed with {}", .program.display(), exit_label(.code))]
    Exit {
        /// Program that was run.
        program: PathBuf,
        /// Exit code, if the program exited normally.
        code: Option<i32>,
    },

    /// The program succeeded but printed nothing usable.
    #[error("{} produced no output", .program.display())]
    EmptyOutput {
        /// Program that was run.
        program: PathBuf,
    },
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(c) => format!("exit status {c}"),
        None => "termination by signal".to_string(),
    }
}

/// Errors from archive operations.
#[derive(Error, Debug)]
pub enum ArchiveError {
    /// The store could not enumerate the build. Not retried.
    #[error("listing build {build_id} failed: {source}")]
    ListFailed {
        /// Build that was being listed.
        build_id: BuildId,
        /// What went wrong with the listing command.
        source: CommandFailure,
    },

    /// The store reported that a requested artifact does not exist. Fatal.
    #[error("artifacts not found in build {build_id} ({} requested): {source}", .paths.len())]
    ArtifactNotFound {
        /// Build the artifacts were requested from.
        build_id: BuildId,
        /// The paths that were part of the failed transfer.
        paths: Vec<ArtifactPath>,
        /// The store's failure report.
        source: CommandFailure,
    },

    /// Every attempt failed transiently.
    #[error("fetching from build {build_id} failed after {attempts} attempts: {source}")]
    FetchExhausted {
        /// Build the artifacts were requested from.
        build_id: BuildId,
        /// Number of attempts made.
        attempts: u32,
        /// The last transient failure.
        source: CommandFailure,
    },

    /// Local filesystem failure while preparing or removing the manifest.
    #[error("manifest I/O failed ({context}): {source}")]
    ManifestIo {
        /// Which manifest step failed.
        context: &'static str,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The caller cancelled the operation.
    #[error("operation cancelled")]
    Cancelled,

    /// Looking up the latest build for a builder failed.
    #[error("looking up latest build for builder {builder:?} failed: {source}")]
    LatestBuildFailed {
        /// Builder name.
        builder: String,
        /// What went wrong with the lookup command.
        source: CommandFailure,
    },

    /// An identifier failed validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl ArchiveError {
    /// Whether retrying the whole operation later could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ArchiveError::FetchExhausted { .. })
    }

    /// Whether the store reported the artifact as nonexistent.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ArchiveError::ArtifactNotFound { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build() -> BuildId {
        BuildId::new("8800").unwrap()
    }

    #[test]
    fn stderr_failure_display() {
        let err = CommandFailure::Stderr {
            program: PathBuf::from("artifacts"),
            code: Some(1),
            stderr: "object doesn't exist".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("artifacts failed with exit status 1"));
        assert!(msg.contains("object doesn't exist"));
    }

    #[test]
    fn exhausted_display_includes_attempts() {
        let err = ArchiveError::FetchExhausted {
            build_id: build(),
            attempts: 22,
            source: CommandFailure::Exit {
                program: PathBuf::from("artifacts"),
                code: Some(2),
            },
        };
        let msg = err.to_string();
        assert!(msg.contains("8800"));
        assert!(msg.contains("22 attempts"));
        assert!(err.is_retryable());
        assert!(!err.is_not_found());
    }

    #[test]
    fn not_found_is_not_retryable() {
        let err = ArchiveError::ArtifactNotFound {
            build_id: build(),
            paths: vec![ArtifactPath::new("a/b").unwrap()],
            source: CommandFailure::Exit {
                program: PathBuf::from("artifacts"),
                code: Some(1),
            },
        };
        assert!(err.is_not_found());
        assert!(!err.is_retryable());
        assert!(err.to_string().contains("1 requested"));
    }

    #[test]
    fn validation_error_converts() {
        let err = ArchiveError::from(ValidationError::EmptyBuildId);
        assert_eq!(err.to_string(), "build id must not be empty");
    }

    #[test]
    fn source_chain_is_preserved() {
        use std::error::Error as _;
        let err = ArchiveError::ListFailed {
            build_id: build(),
            source: CommandFailure::Spawn {
                program: PathBuf::from("artifacts"),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
            },
        };
        let source = err.source().unwrap();
        assert!(source.to_string().contains("no such file"));
    }
}
