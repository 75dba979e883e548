//! Traversal orchestration
//!
//! [`CatalogHarvester`] drives the full harvest: strictly sequential batches,
//! one index-page fetch per batch, a concurrent detail fan-out, a single
//! retry pass over first-pass failures, and incremental accumulation into a
//! [`ResultSet`]. Batch `b + 1` never starts before batch `b`'s retry pass
//! has settled, which bounds outstanding detail requests to one page's worth.
//!
//! The traversal is an explicit loop over [`BatchState`], not recursion:
//! the terminal condition is a plain, testable predicate.

use crate::accumulator::ResultSet;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::fetcher::Fetcher;
use crate::resolver::DetailResolver;
use crate::types::{BatchState, Event, HarvestSummary, IndexPage, ItemId};
use chrono::Utc;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Capacity of the event broadcast channel; slow subscribers lag, they
/// never block the pipeline.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Harvests a paginated remote collection into a [`ResultSet`]
///
/// # Example
///
/// ```no_run
/// use catalog_dl::{CatalogHarvester, Config};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = Config::for_base_url("https://pokeapi.co/api/v2");
///     let harvester = CatalogHarvester::new(config)?;
///
///     // Consumers can watch results grow while the harvest runs
///     let results = harvester.results();
///     let mut events = harvester.subscribe();
///     tokio::spawn(async move {
///         while let Ok(event) = events.recv().await {
///             println!("{event:?} ({} records so far)", results.len());
///         }
///     });
///
///     let summary = harvester.run().await?;
///     println!("harvested {} records", summary.resolved + summary.recovered);
///     Ok(())
/// }
/// ```
pub struct CatalogHarvester {
    config: Config,
    fetcher: Fetcher,
    resolver: DetailResolver,
    results: ResultSet,
    event_tx: broadcast::Sender<Event>,
    cancel: CancellationToken,
}

impl CatalogHarvester {
    /// Build a harvester from a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for invalid settings or
    /// [`Error::ClientBuild`] if the HTTP client cannot be constructed.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;

        let cancel = CancellationToken::new();
        let fetcher = Fetcher::new(&config.http, config.retry.clone(), cancel.clone())?;
        let resolver = DetailResolver::new(
            fetcher.clone(),
            &config.api.base_url,
            &config.api.detail_path,
            config.api.concurrency,
        )?;
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Ok(Self {
            config,
            fetcher,
            resolver,
            results: ResultSet::new(),
            event_tx,
            cancel,
        })
    }

    /// Handle to the growing result set; clone it freely across tasks
    pub fn results(&self) -> ResultSet {
        self.results.clone()
    }

    /// Subscribe to traversal events
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Cancel the traversal; in-flight requests stop promptly
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    /// Run the traversal to completion.
    ///
    /// Detail-level failures are retried once per batch and then dropped
    /// (reported in the summary, never fatal). An index-page failure aborts
    /// the traversal after setting the loading flag false.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TraversalAborted`] if an index-page fetch exhausts
    /// its retries (including cancellation mid-traversal).
    pub async fn run(&self) -> Result<HarvestSummary> {
        let started_at = Utc::now();
        let page_size = self.config.api.page_size;

        let mut state: Option<BatchState> = None;
        let mut resolved = 0usize;
        let mut recovered = 0usize;
        let mut dropped: Vec<ItemId> = Vec::new();
        let mut batches = 0u64;

        loop {
            if state.as_ref().is_some_and(BatchState::is_done) {
                break;
            }
            let batch = state.as_ref().map_or(0, |s| s.batch_number);
            let offset = batch * page_size;

            self.emit(Event::BatchStarted {
                batch,
                offset,
                limit: page_size,
            });

            let page = match self.fetch_index_page(offset, page_size).await {
                Ok(page) => page,
                Err(e) => {
                    error!(batch, error = %e, "Index page fetch failed, aborting traversal");
                    self.emit(Event::Aborted {
                        batch,
                        error: e.to_string(),
                    });
                    self.results.finish();
                    return Err(Error::TraversalAborted { batch, source: e });
                }
            };

            let st = state.get_or_insert_with(|| {
                let total = self
                    .config
                    .api
                    .max_items
                    .map_or(page.count, |cap| page.count.min(cap));
                let s = BatchState::new(page_size, total);
                info!(
                    total_items = total,
                    total_batches = s.total_batches,
                    "Collection size discovered"
                );
                s
            });
            if st.total_batches == 0 {
                break;
            }

            let mut ids = extract_ids(&page);
            ids.truncate(st.expected_len() as usize);
            debug!(batch, items = ids.len(), "Resolving page details");

            let first_pass = self.resolver.resolve_all(&ids).await;
            resolved += self.results.append(first_pass.succeeded);

            let mut batch_recovered = 0usize;
            let mut batch_dropped = 0usize;
            if !first_pass.failed.is_empty() {
                warn!(
                    batch,
                    failed = first_pass.failed.len(),
                    "First pass left unresolved items, retrying once"
                );
                let retry_ids: Vec<ItemId> =
                    first_pass.failed.into_iter().map(|(id, _)| id).collect();
                let second_pass = self.resolver.resolve_all(&retry_ids).await;
                batch_recovered = self.results.append(second_pass.succeeded);
                recovered += batch_recovered;

                for (id, err) in second_pass.failed {
                    warn!(item = %id, error = %err, "Dropping item after retry pass");
                    self.emit(Event::ItemDropped {
                        id: id.clone(),
                        error: err.to_string(),
                    });
                    dropped.push(id);
                    batch_dropped += 1;
                }
            }

            info!(
                batch,
                resolved = self.results.len(),
                recovered = batch_recovered,
                dropped = batch_dropped,
                "Batch complete"
            );
            self.emit(Event::BatchCompleted {
                batch,
                resolved: self.results.len(),
                recovered: batch_recovered,
                dropped: batch_dropped,
            });

            batches += 1;
            st.advance();
        }

        self.results.finish();
        let total_resolved = self.results.len();
        info!(
            total_resolved,
            dropped = dropped.len(),
            "Traversal complete"
        );
        self.emit(Event::Completed { total_resolved });

        Ok(HarvestSummary {
            total_items: state.map_or(0, |s| s.total_items),
            batches,
            resolved,
            recovered,
            dropped,
            started_at,
            finished_at: Utc::now(),
        })
    }

    /// Fetch one index page through the resilient fetcher
    async fn fetch_index_page(
        &self,
        offset: u64,
        limit: u64,
    ) -> std::result::Result<IndexPage, crate::error::FetchError> {
        let url = format!(
            "{}/{}?offset={offset}&limit={limit}",
            self.config.api.base_url.trim_end_matches('/'),
            self.config.api.list_path.trim_matches('/')
        );
        self.fetcher.get_json(&url).await
    }

    fn emit(&self, event: Event) {
        // Nobody listening is fine
        let _ = self.event_tx.send(event);
    }
}

/// Extract identifiers from a page's entries.
///
/// Entries with a malformed reference URL are skipped with a warning; the
/// remote advertising a broken reference is treated like a failed item,
/// not a fatal condition.
fn extract_ids(page: &IndexPage) -> Vec<ItemId> {
    page.results
        .iter()
        .filter_map(|entry| match ItemId::from_reference_url(&entry.url) {
            Ok(id) => Some(id),
            Err(e) => {
                warn!(name = %entry.name, error = %e, "Skipping entry with invalid reference");
                None
            }
        })
        .collect()
}
