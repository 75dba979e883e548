//! Core types for catalog-dl

use crate::error::Error;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Unique identifier for a catalog item
///
/// An opaque key, stable and unique within the collection. It is extracted
/// from the trailing path segment of an index entry's reference URL, so it
/// is stored as a string even when the remote service uses numeric ids.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub String);

impl ItemId {
    /// Create a new ItemId
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the identifier as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Extract an identifier from an item's detail-endpoint reference URL.
    ///
    /// Takes the trailing non-empty path segment, so both
    /// `https://api.test/v2/pokemon/7/` and `https://api.test/v2/pokemon/7`
    /// yield `7`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidReference`] if the reference is not a valid
    /// URL or its path has no non-empty segment.
    pub fn from_reference_url(reference: &str) -> Result<Self, Error> {
        let parsed = url::Url::parse(reference)
            .map_err(|_| Error::InvalidReference(reference.to_string()))?;
        let segment = parsed
            .path_segments()
            .and_then(|segments| segments.filter(|s| !s.is_empty()).next_back())
            .ok_or_else(|| Error::InvalidReference(reference.to_string()))?;
        Ok(Self(segment.to_string()))
    }
}

impl From<u64> for ItemId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

impl From<&str> for ItemId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl std::fmt::Display for ItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One entry of a paginated index page
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntry {
    /// Item name as listed by the index endpoint
    pub name: String,
    /// Reference URL of the item's detail record
    pub url: String,
}

/// One page of the paginated index endpoint
///
/// Wire shape: `{ "count": 250, "results": [{ "name": ..., "url": ... }] }`.
/// Immutable once fetched. Unknown fields (e.g. `next`/`previous` cursors)
/// are ignored; traversal is driven by offset arithmetic, not cursors.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexPage {
    /// Total number of items in the whole collection
    pub count: u64,
    /// Entries of this page, in index order
    pub results: Vec<IndexEntry>,
}

/// Sprite image references of a detail record
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpriteSet {
    /// URL of the default front-facing sprite, if any
    pub front_default: Option<String>,
}

/// A named kind/category reference nested inside a detail record
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedKind {
    /// Kind name (e.g. "grass")
    pub name: String,
}

/// One slot of a detail record's type/category list
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeSlot {
    /// Position of this type in the item's type list
    pub slot: u32,
    /// The referenced type
    #[serde(rename = "type")]
    pub kind: NamedKind,
}

/// The fully resolved entity behind one catalog item
///
/// Immutable once fetched; identified by [`DetailRecord::item_id`]. Extra
/// fields returned by the service are ignored on deserialization.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailRecord {
    /// Numeric identifier assigned by the remote service
    pub id: u64,
    /// Item name
    pub name: String,
    /// Height attribute, in the service's own unit
    pub height: u64,
    /// Weight attribute, in the service's own unit
    pub weight: u64,
    /// Sprite image references
    #[serde(default)]
    pub sprites: SpriteSet,
    /// Type/category list
    #[serde(default)]
    pub types: Vec<TypeSlot>,
}

impl DetailRecord {
    /// The key this record is stored under in the result set
    pub fn item_id(&self) -> ItemId {
        ItemId::from(self.id)
    }
}

/// Pagination cursor over the collection
///
/// Advances monotonically from batch 0 to `total_batches`; the traversal is
/// done exactly when `batch_number == total_batches`. Constructed once the
/// collection size is known (from the first index page).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BatchState {
    /// Current zero-based batch number
    pub batch_number: u64,
    /// Page size used for offset arithmetic
    pub page_size: u64,
    /// Total number of items in the collection
    pub total_items: u64,
    /// Total number of batches the traversal will perform
    pub total_batches: u64,
}

impl BatchState {
    /// Create a batch cursor positioned at batch 0.
    ///
    /// `page_size` must be non-zero (enforced by config validation).
    pub fn new(page_size: u64, total_items: u64) -> Self {
        Self {
            batch_number: 0,
            page_size,
            total_items,
            total_batches: total_items.div_ceil(page_size),
        }
    }

    /// Offset of the current batch's index-page request
    pub fn offset(&self) -> u64 {
        self.batch_number * self.page_size
    }

    /// Number of items expected on the current batch's page
    pub fn expected_len(&self) -> u64 {
        self.total_items
            .saturating_sub(self.offset())
            .min(self.page_size)
    }

    /// True once every batch has been processed
    pub fn is_done(&self) -> bool {
        self.batch_number >= self.total_batches
    }

    /// Move to the next batch
    pub fn advance(&mut self) {
        self.batch_number += 1;
    }
}

/// Events broadcast by the harvester during a traversal
///
/// Consumers subscribe via
/// [`CatalogHarvester::subscribe`](crate::CatalogHarvester::subscribe);
/// lagging or absent subscribers never block the pipeline.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A batch's index page is about to be fetched
    BatchStarted {
        /// Zero-based batch number
        batch: u64,
        /// Offset of the index-page request
        offset: u64,
        /// Requested page size
        limit: u64,
    },

    /// A batch finished, including its retry pass
    BatchCompleted {
        /// Zero-based batch number
        batch: u64,
        /// Total records accumulated so far, including this batch
        resolved: usize,
        /// Records recovered by the retry pass
        recovered: usize,
        /// Identifiers dropped after failing both passes
        dropped: usize,
    },

    /// An item failed both resolution passes and was permanently dropped
    ItemDropped {
        /// The dropped identifier
        id: ItemId,
        /// Final fetch error, rendered as a string
        error: String,
    },

    /// The traversal completed normally
    Completed {
        /// Total records accumulated in the result set
        total_resolved: usize,
    },

    /// The traversal aborted because an index-page fetch failed
    Aborted {
        /// Batch whose index-page request failed
        batch: u64,
        /// The fetch failure, rendered as a string
        error: String,
    },
}

/// Outcome of a completed traversal
///
/// Returned by [`CatalogHarvester::run`](crate::CatalogHarvester::run) so
/// consumers can see partial completion (dropped identifiers) without
/// parsing logs.
#[derive(Clone, Debug, Serialize)]
pub struct HarvestSummary {
    /// Collection size reported by the index endpoint (after `max_items` capping)
    pub total_items: u64,
    /// Number of batches the traversal performed
    pub batches: u64,
    /// Records resolved on first passes across all batches
    pub resolved: usize,
    /// Records recovered by retry passes across all batches
    pub recovered: usize,
    /// Identifiers that failed both passes and are absent from the result set
    pub dropped: Vec<ItemId>,
    /// When the traversal started
    pub started_at: DateTime<Utc>,
    /// When the traversal finished
    pub finished_at: DateTime<Utc>,
}
