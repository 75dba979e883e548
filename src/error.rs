//! Error types for catalog-dl
//!
//! Two layers of errors exist in this library:
//! - [`FetchError`] — a single fetch call failed after exhausting its retry
//!   budget; carries the originating URL, the number of attempts performed,
//!   and the failure kind.
//! - [`Error`] — the library-level error type. Per-item fetch failures never
//!   surface here (they are partitioned and retried by the harvester); only
//!   traversal-fatal conditions do.

use thiserror::Error;

/// Result type alias for catalog-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for catalog-dl
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "api.page_size")
        key: Option<String>,
    },

    /// An index-page fetch exhausted its retries, so the traversal halted.
    ///
    /// Batches before `batch` are fully processed and their records remain
    /// available in the result set; no later batch was started.
    #[error("traversal aborted at batch {batch}: {source}")]
    TraversalAborted {
        /// The zero-based batch whose index-page request failed
        batch: u64,
        /// The underlying fetch failure
        source: FetchError,
    },

    /// Failed to build the HTTP client
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(reqwest::Error),

    /// A page entry's reference URL had no extractable identifier
    #[error("invalid item reference: {0}")]
    InvalidReference(String),
}

/// A fetch call failed definitively.
///
/// Produced by the resilient fetcher once its attempt budget is exhausted
/// (or immediately for non-retryable failures). `attempts` records how many
/// requests were actually issued for this call.
#[derive(Debug, Error)]
#[error("fetch of {url} failed after {attempts} attempt(s): {kind}")]
pub struct FetchError {
    /// The request target that failed
    pub url: String,
    /// Number of attempts performed before giving up
    pub attempts: u32,
    /// What went wrong on the final attempt
    pub kind: FetchErrorKind,
}

/// Failure taxonomy for a single fetch attempt
#[derive(Debug, Error)]
pub enum FetchErrorKind {
    /// Network-level failure (connect, timeout, TLS, ...)
    #[error("transport error: {0}")]
    Transport(#[source] reqwest::Error),

    /// The server answered with a non-success status code
    #[error("unexpected HTTP status {0}")]
    Status(reqwest::StatusCode),

    /// The response body was not the expected JSON shape
    #[error("malformed payload: {0}")]
    Parse(#[source] reqwest::Error),

    /// The traversal was cancelled while this request was in flight
    #[error("cancelled")]
    Cancelled,
}
