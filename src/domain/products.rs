//! Product records and the cache envelope that persists them.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Image served for every synced product until curated artwork is assigned.
pub const PLACEHOLDER_IMAGE: &str = "/assets/images/placeholder.webp";

/// Status value that makes a record eligible for customer-facing listings.
pub const ACTIVE_STATUS: &str = "active";

/// A normalized price-list entry as served to the storefront.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ProductRecord {
    /// Upstream SKU code; unique within one envelope.
    pub id: String,
    pub name: String,
    pub developer: String,
    pub image: String,
    pub category: String,
    pub price: i64,
    pub status: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl ProductRecord {
    pub fn is_active(&self) -> bool {
        self.status == ACTIVE_STATUS
    }
}

/// The persisted cache document: when the price list was fetched and what it held.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEnvelope {
    /// Milliseconds since the Unix epoch at which the upstream fetch completed.
    pub timestamp: i64,
    pub data: Vec<ProductRecord>,
}

impl CacheEnvelope {
    pub fn new(data: Vec<ProductRecord>, fetched_at: OffsetDateTime) -> Self {
        Self {
            timestamp: unix_millis(fetched_at),
            data,
        }
    }

    pub fn fetched_at(&self) -> OffsetDateTime {
        OffsetDateTime::from_unix_timestamp_nanos(i128::from(self.timestamp) * 1_000_000)
            .unwrap_or(OffsetDateTime::UNIX_EPOCH)
    }

    /// An envelope is stale once strictly more than `ttl` has elapsed since the fetch.
    pub fn is_stale(&self, now: OffsetDateTime, ttl: Duration) -> bool {
        let ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
        unix_millis(now).saturating_sub(self.timestamp) > ttl_ms
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Copy of this envelope without records matching `id`, plus how many were dropped.
    ///
    /// The fetch timestamp is kept: removing a record does not make the data fresher.
    pub fn without(&self, id: &str) -> (Self, usize) {
        let data: Vec<ProductRecord> = self
            .data
            .iter()
            .filter(|record| record.id != id)
            .cloned()
            .collect();
        let removed = self.data.len() - data.len();
        (
            Self {
                timestamp: self.timestamp,
                data,
            },
            removed,
        )
    }
}

pub fn unix_millis(at: OffsetDateTime) -> i64 {
    i64::try_from(at.unix_timestamp_nanos() / 1_000_000).unwrap_or(i64::MAX)
}
