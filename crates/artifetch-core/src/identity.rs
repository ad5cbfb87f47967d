//! # Identity Newtypes
//!
//! Identifiers for builds and the artifacts inside them. Both validate
//! their format at construction time so that nothing downstream has to.
//!
//! - [`BuildId`] is opaque to this crate. The only constraint is that it
//!   can be passed as a single command-line argument and used as a
//!   directory name.
//! - [`ArtifactPath`] is relative to the build root and is written into a
//!   newline-delimited manifest, so it must not contain a line break.

use std::path::{Component, Path};

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Opaque identifier for one CI/build invocation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BuildId(String);

impl BuildId {
    /// Create a validated build id. Surrounding whitespace is trimmed.
    pub fn new(s: impl AsRef<str>) -> Result<Self, ValidationError> {
        let id = s.as_ref().trim();
        if id.is_empty() {
            return Err(ValidationError::EmptyBuildId);
        }
        if id.chars().any(|c| c.is_whitespace() || c == '/') {
            return Err(ValidationError::InvalidBuildId(id.to_string()));
        }
        Ok(Self(id.to_string()))
    }

    /// Return the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for BuildId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for BuildId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for BuildId {
    type Error = ValidationError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<BuildId> for String {
    fn from(id: BuildId) -> Self {
        id.0
    }
}

/// A path to an artifact, relative to its build's root.
///
/// Paths are kept exactly as given (no normalization): the remote store
/// resolves them, and two spellings of the same file are two entries as far
/// as de-duplication is concerned. A path never leaves its build: absolute
/// paths and `..` components are rejected.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ArtifactPath(String);

impl ArtifactPath {
    /// Create a validated artifact path.
    pub fn new(s: impl Into<String>) -> Result<Self, ValidationError> {
        let path = s.into();
        if path.is_empty() {
            return Err(ValidationError::EmptyArtifactPath);
        }
        if path.contains(['\n', '\r']) {
            return Err(ValidationError::ArtifactPathLineBreak(path));
        }
        if path.starts_with('/') || Path::new(&path).is_absolute() {
            return Err(ValidationError::AbsoluteArtifactPath(path));
        }
        let escapes = Path::new(&path).components().find_map(|c| match c {
            Component::ParentDir => Some(true),
            Component::RootDir | Component::Prefix(_) => Some(false),
            Component::CurDir | Component::Normal(_) => None,
        });
        match escapes {
            Some(true) => Err(ValidationError::ParentDirArtifactPath(path)),
            Some(false) => Err(ValidationError::AbsoluteArtifactPath(path)),
            None => Ok(Self(path)),
        }
    }

    /// Return the path as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Resolve this artifact underneath `dir`.
    pub fn resolve_in(&self, dir: &Path) -> std::path::PathBuf {
        dir.join(&self.0)
    }
}

impl std::fmt::Display for ArtifactPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for ArtifactPath {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for ArtifactPath {
    type Error = ValidationError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl TryFrom<&str> for ArtifactPath {
    type Error = ValidationError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<ArtifactPath> for String {
    fn from(p: ArtifactPath) -> Self {
        p.0
    }
}

impl AsRef<str> for ArtifactPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
