//! # artifetch-cli — Command-Line Front End
//!
//! Provides the `artifetch` binary.
//!
//! ## Subcommands
//!
//! - `artifetch list` — Print the artifacts that make up a build.
//! - `artifetch fetch` — Materialize artifacts locally, skipping files
//!   already present and retrying transient store failures.
//! - `artifetch latest` — Resolve a builder's most recent successful build.
//!
//! ```bash
//! artifetch list 8812345678901
//! artifetch fetch 8812345678901 images/fuchsia.zbi images/fuchsia.vbmeta
//! artifetch fetch 8812345678901 --srcs-file wanted.txt --json
//! artifetch latest core.x64-release --fetch images/fuchsia.zbi
//! ```
//!
//! ## Exit Codes
//!
//! Scripts branch on the exit code rather than the message: `2` means an
//! artifact does not exist and retrying is pointless; `3` means the retry
//! budget ran out and a later retry may succeed.

pub mod fetch;
pub mod latest;
pub mod list;

use artifetch_archive::ArchiveError;

/// Exit code for any failure without a more specific code.
pub const EXIT_FAILURE: u8 = 1;
/// Exit code when a requested artifact does not exist.
pub const EXIT_NOT_FOUND: u8 = 2;
/// Exit code when transient failures used up the retry budget.
pub const EXIT_EXHAUSTED: u8 = 3;
/// Exit code after Ctrl-C, following the shell convention of 128 + SIGINT.
pub const EXIT_CANCELLED: u8 = 130;

/// Map an error to the process exit code, looking through any context
/// layers for the underlying [`ArchiveError`].
pub fn exit_code_for(err: &anyhow::Error) -> u8 {
    let archive_err = err
        .chain()
        .find_map(|cause| cause.downcast_ref::<ArchiveError>());
    match archive_err {
        Some(ArchiveError::ArtifactNotFound { .. }) => EXIT_NOT_FOUND,
        Some(ArchiveError::FetchExhausted { .. }) => EXIT_EXHAUSTED,
        Some(ArchiveError::Cancelled) => EXIT_CANCELLED,
        _ => EXIT_FAILURE,
    }
}
