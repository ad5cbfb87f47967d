#![deny(missing_docs)]

//! # artifetch-core — Foundational Types for artifetch
//!
//! This crate defines the types every other crate in the workspace depends
//! on. It has no internal crate dependencies; externally it uses only
//! `serde`, `serde_yaml` and `thiserror`.
//!
//! ## Design Principles
//!
//! 1. **Newtype wrappers for identifiers.** A [`BuildId`] cannot be passed
//!    where an [`ArtifactPath`] is expected, and both are validated at
//!    construction time.
//!
//! 2. **Configuration is a value, not ambient state.** Retry parameters
//!    live in [`BackoffConfig`] and are threaded explicitly into whatever
//!    runs the retry loop.
//!
//! 3. **Structured errors.** [`ValidationError`] and [`ConfigError`] are
//!    `thiserror` enums. No `.unwrap()` outside tests.

pub mod config;
pub mod error;
pub mod identity;

// Re-export primary types at crate root for ergonomic imports.
pub use config::{ArtifetchConfig, BackoffConfig};
pub use error::{ConfigError, ValidationError};
pub use identity::{ArtifactPath, BuildId};
