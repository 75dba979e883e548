//! # catalog-dl
//!
//! Resilient harvesting of large paginated collections from read-only REST
//! APIs.
//!
//! The library walks a paginated index endpoint batch by batch, resolves
//! every listed item's full detail record through a bounded concurrent
//! fan-out, and accumulates results incrementally for an embedding
//! consumer. Transient per-item failures are isolated and retried; an item
//! that keeps failing is dropped and reported rather than failing the
//! harvest.
//!
//! ## Design Philosophy
//!
//! - **Partial failure is normal** - one unreachable item never poisons a
//!   batch, and one failed batch page is the only fatal condition
//! - **Sensible defaults** - point it at a base URL and go
//! - **Library-first** - no CLI or UI, purely a Rust crate for embedding
//! - **Incremental visibility** - consumers read snapshots and subscribe
//!   to events while the harvest is still running
//!
//! ## Quick Start
//!
//! ```no_run
//! use catalog_dl::{CatalogHarvester, Config};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::for_base_url("https://pokeapi.co/api/v2");
//!     let harvester = CatalogHarvester::new(config)?;
//!
//!     let results = harvester.results();
//!     let summary = harvester.run().await?;
//!
//!     println!(
//!         "{} records harvested, {} dropped",
//!         results.len(),
//!         summary.dropped.len()
//!     );
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Result accumulation for consumers
pub mod accumulator;
/// Configuration types
pub mod config;
/// Error types
pub mod error;
/// Resilient single-request fetching
pub mod fetcher;
/// Traversal orchestration (the batch walker)
pub mod harvester;
/// Concurrent per-item detail resolution
pub mod resolver;
/// Retry logic with capped exponential backoff
pub mod retry;
/// Core data types and events
pub mod types;

// Re-export commonly used types
pub use accumulator::ResultSet;
pub use config::{ApiConfig, Config, HttpConfig, RetryConfig};
pub use error::{Error, FetchError, FetchErrorKind, Result};
pub use fetcher::Fetcher;
pub use harvester::CatalogHarvester;
pub use resolver::{DetailResolver, Resolution};
pub use types::{
    BatchState, DetailRecord, Event, HarvestSummary, IndexEntry, IndexPage, ItemId, NamedKind,
    SpriteSet, TypeSlot,
};
