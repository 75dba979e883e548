//! Resilient HTTP fetching
//!
//! [`Fetcher`] is the foundational primitive of the pipeline: one GET
//! request, a status check, a JSON parse, wrapped in the bounded retry
//! driver from [`crate::retry`]. Everything network-facing in this crate
//! goes through it, so the retry budget and cancellation behave uniformly
//! for index pages and detail records alike.

use crate::config::{HttpConfig, RetryConfig};
use crate::error::{Error, FetchError, FetchErrorKind, Result};
use crate::retry::fetch_with_retry;
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;

/// Performs one network request with a bounded retry policy.
///
/// Cheap to clone; the inner `reqwest::Client` is reference-counted and the
/// cancellation token is shared, so clones cooperate on shutdown.
#[derive(Clone)]
pub struct Fetcher {
    client: reqwest::Client,
    retry: RetryConfig,
    cancel: CancellationToken,
}

impl Fetcher {
    /// Build a fetcher with a shared HTTP client.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ClientBuild`] if the underlying client cannot be
    /// constructed.
    pub fn new(http: &HttpConfig, retry: RetryConfig, cancel: CancellationToken) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(http.request_timeout)
            .user_agent(http.user_agent.clone())
            .build()
            .map_err(Error::ClientBuild)?;
        Ok(Self {
            client,
            retry,
            cancel,
        })
    }

    /// GET `url` and parse the body as JSON, retrying transient failures
    /// within the configured attempt budget.
    ///
    /// # Errors
    ///
    /// Returns a [`FetchError`] carrying the URL, the number of attempts
    /// actually performed, and the final failure kind. Never issues more
    /// than `retry.max_attempts` requests for one call.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
    ) -> std::result::Result<T, FetchError> {
        let mut attempts: u32 = 0;
        let counter = &mut attempts;
        let result = fetch_with_retry(&self.retry, move || {
            *counter += 1;
            self.attempt::<T>(url)
        })
        .await;

        result.map_err(|kind| FetchError {
            url: url.to_string(),
            attempts,
            kind,
        })
    }

    /// One request/parse attempt, racing against cancellation.
    async fn attempt<T: DeserializeOwned>(
        &self,
        url: &str,
    ) -> std::result::Result<T, FetchErrorKind> {
        let response = tokio::select! {
            _ = self.cancel.cancelled() => return Err(FetchErrorKind::Cancelled),
            result = self.client.get(url).send() => {
                result.map_err(FetchErrorKind::Transport)?
            }
        };

        let status = response.status();
        if !status.is_success() {
            return Err(FetchErrorKind::Status(status));
        }

        response.json::<T>().await.map_err(|e| {
            if e.is_decode() {
                FetchErrorKind::Parse(e)
            } else {
                FetchErrorKind::Transport(e)
            }
        })
    }
}
