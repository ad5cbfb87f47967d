//! Failure classification for transfer attempts.
//!
//! The `artifacts` tool reports a missing object only through its stderr
//! wording. That wording is a contract with the store, so it lives behind
//! [`FailureClassifier`] and can be swapped per store version.

/// Outcome of classifying a failed transfer attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// The requested artifact does not exist. Do not retry.
    Fatal,
    /// Anything else. Retry after backoff.
    Transient,
}

/// Maps a failed attempt's stderr to a [`Classification`].
pub trait FailureClassifier: Send + Sync + std::fmt::Debug {
    /// Short identifier for the message set this classifier understands.
    fn version(&self) -> &'static str;

    /// Classify the stderr of a failed attempt.
    fn classify(&self, stderr: &[u8]) -> Classification;
}

/// Store reported a prefix with no matching objects.
pub const NOTHING_MATCHED_PREFIX: &str = "nothing matched prefix";

/// Store reported an object that does not exist.
pub const OBJECT_DOES_NOT_EXIST: &str = "object doesn't exist";

/// Classifier for the store's current error wording.
///
/// Matching is case-sensitive. Fatal signatures are checked before
/// anything else, so text that looks both fatal and transient is fatal.
#[derive(Debug, Clone, Copy, Default)]
pub struct StoreMessagesV1;

impl StoreMessagesV1 {
    const FATAL_SIGNATURES: [&'static str; 2] = [NOTHING_MATCHED_PREFIX, OBJECT_DOES_NOT_EXIST];
}

impl FailureClassifier for StoreMessagesV1 {
    fn version(&self) -> &'static str {
        "store-messages-v1"
    }

    fn classify(&self, stderr: &[u8]) -> Classification {
        let fatal = Self::FATAL_SIGNATURES
            .iter()
            .any(|sig| contains(stderr, sig.as_bytes()));
        if fatal {
            Classification::Fatal
        } else {
            Classification::Transient
        }
    }
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    needle.is_empty() || haystack.windows(needle.len()).any(|w| w == needle)
}
