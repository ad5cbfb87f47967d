//! # artifetch-archive — Build Artifact Archive Client
//!
//! Fetches build artifacts from the remote artifact store into a local
//! directory without re-downloading what is already there:
//!
//! - **Listing** — [`Archive::list`] enumerates a build through
//!   `artifacts ls`. Failures surface directly; they are never retried.
//! - **Cache filter** — [`cache::partition`] splits a request into files
//!   already present and files to fetch. Only regular files count as
//!   present.
//! - **Batched transfer** — [`Fetcher::fetch`] writes the missing paths to
//!   a manifest and issues a single `artifacts cp` per attempt.
//! - **Retry** — [`retry::retry`] drives attempts with bounded exponential
//!   backoff. A [`FailureClassifier`] decides which failures are fatal.
//!
//! ## Concurrency
//!
//! A fetch is one future that runs to completion. Fetches for different
//! builds may run concurrently; each keeps its manifest in its own
//! scratch directory, so no in-process locking is needed. Overlapping
//! destinations are the caller's problem: last writer wins.
//!
//! Cancellation goes through a [`CancellationToken`]. It kills the
//! in-flight tool and is never retried.
//!
//! [`CancellationToken`]: tokio_util::sync::CancellationToken

pub mod archive;
pub mod build;
pub mod builder;
pub mod cache;
pub mod classify;
pub mod error;
pub mod fetch;
pub mod listing;
pub mod manifest;
pub mod request;
pub mod retry;
pub mod runner;
pub mod testing;

// Re-export primary types.
pub use archive::Archive;
pub use build::Build;
pub use builder::Builder;
pub use cache::Partition;
pub use classify::{Classification, FailureClassifier, StoreMessagesV1};
pub use error::{ArchiveError, CommandFailure};
pub use fetch::{FetchSummary, Fetcher};
pub use request::FetchRequest;
pub use retry::{ExponentialBackoff, RetryPolicy, RetryState};
pub use runner::{CommandOutput, CommandRunner, ProcessRunner};

pub use tokio_util::sync::CancellationToken;
