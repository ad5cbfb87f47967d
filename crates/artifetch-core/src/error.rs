//! # Error Hierarchy
//!
//! Structured error types for identifier validation and configuration
//! loading, built with `thiserror`.

use std::path::PathBuf;

use thiserror::Error;

/// Identifier validation failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Build id was empty after trimming.
    #[error("build id must not be empty")]
    EmptyBuildId,

    /// Build id contained whitespace or a path separator.
    #[error("invalid build id {0:?}: must not contain whitespace or '/'")]
    InvalidBuildId(String),

    /// Artifact path was empty.
    #[error("artifact path must not be empty")]
    EmptyArtifactPath,

    /// Artifact path contained a line break; manifests are newline-delimited.
    #[error("artifact path {0:?} contains a line break")]
    ArtifactPathLineBreak(String),

    /// Artifact path was absolute and would escape the destination directory.
    #[error("artifact path {0:?} must be relative")]
    AbsoluteArtifactPath(String),

    /// Artifact path contained a `..` component and would escape the
    /// destination directory.
    #[error("artifact path {0:?} must not contain '..'")]
    ParentDirArtifactPath(String),
}

/// Configuration loading and validation failures.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read config {path}: {source}")]
    Read {
        /// Path that was being read.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The configuration file was not valid YAML for [`ArtifetchConfig`](crate::ArtifetchConfig).
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// An environment override could not be parsed.
    #[error("invalid value for {var}: {value:?}")]
    InvalidEnv {
        /// Variable name.
        var: String,
        /// Raw value found in the environment.
        value: String,
    },

    /// The backoff parameters are inconsistent.
    #[error("invalid backoff configuration: {0}")]
    InvalidBackoff(String),
}
