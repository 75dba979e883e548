//! Concurrent detail resolution
//!
//! Given a set of item identifiers, [`DetailResolver`] issues one detail
//! fetch per identifier as a bounded concurrent fan-out and waits for every
//! request to settle. A single item's failure never cancels or blocks its
//! siblings; the outcome is a partition of the input into resolved records
//! and failed identifiers, and the caller decides what to do with the
//! failures.

use crate::error::{Error, FetchError, Result};
use crate::fetcher::Fetcher;
use crate::types::{DetailRecord, ItemId};
use futures::StreamExt;
use futures::stream;

/// Outcome of one resolution pass over a set of identifiers.
///
/// Every input identifier appears in exactly one of the two lists:
/// `succeeded.len() + failed.len()` always equals the input length.
#[derive(Debug, Default)]
pub struct Resolution {
    /// Fully resolved detail records, in arrival order
    pub succeeded: Vec<DetailRecord>,
    /// Identifiers whose fetch failed definitively, with the final error
    pub failed: Vec<(ItemId, FetchError)>,
}

impl Resolution {
    /// Number of identifiers this pass settled
    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }
}

/// Resolves item identifiers to detail records via concurrent fan-out
pub struct DetailResolver {
    fetcher: Fetcher,
    detail_base: url::Url,
    concurrency: usize,
}

impl DetailResolver {
    /// Create a resolver for the detail endpoint at
    /// `{base_url}/{detail_path}/{id}/`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `base_url` and `detail_path` do not
    /// combine into a valid URL.
    pub fn new(
        fetcher: Fetcher,
        base_url: &str,
        detail_path: &str,
        concurrency: usize,
    ) -> Result<Self> {
        // Trailing slash so Url::join appends instead of replacing
        let joined = format!(
            "{}/{}/",
            base_url.trim_end_matches('/'),
            detail_path.trim_matches('/')
        );
        let detail_base = url::Url::parse(&joined).map_err(|e| Error::Config {
            message: format!("invalid detail endpoint {joined}: {e}"),
            key: Some("api.detail_path".to_string()),
        })?;
        Ok(Self {
            fetcher,
            detail_base,
            concurrency,
        })
    }

    /// The detail-endpoint URL for one identifier
    pub fn detail_url(&self, id: &ItemId) -> String {
        format!("{}{}/", self.detail_base, id)
    }

    /// Resolve every identifier concurrently and wait for all to settle.
    ///
    /// At most `concurrency` requests are in flight at once. No ordering is
    /// guaranteed within the returned lists beyond arrival order.
    pub async fn resolve_all(&self, ids: &[ItemId]) -> Resolution {
        let settled: Vec<std::result::Result<DetailRecord, (ItemId, FetchError)>> =
            stream::iter(ids.to_vec())
                .map(|id| {
                    let fetcher = self.fetcher.clone();
                    let url = self.detail_url(&id);
                    async move {
                        match fetcher.get_json::<DetailRecord>(&url).await {
                            Ok(record) => Ok(record),
                            Err(e) => Err((id, e)),
                        }
                    }
                })
                .buffer_unordered(self.concurrency)
                .collect()
                .await;

        let mut resolution = Resolution::default();
        for outcome in settled {
            match outcome {
                Ok(record) => resolution.succeeded.push(record),
                Err(failure) => resolution.failed.push(failure),
            }
        }
        resolution
    }
}
