//! Single-flight refresh of the product cache from the reseller price list.
//!
//! A cycle runs as its own task: fetch the full price list, normalize every
//! entry, persist through [`ProductCache`], publish. While a cycle is in
//! flight, further callers join it and receive the same result instead of
//! starting a second upstream fetch. The flight slot is cleared when the cycle
//! ends on any path, including a panic inside the task.

use std::sync::{
    Arc, Mutex,
    atomic::{AtomicU64, Ordering},
};
use std::time::Instant;

use futures::future::{BoxFuture, FutureExt, Shared};
use metrics::{counter, histogram};
use thiserror::Error;
use time::OffsetDateTime;
use tracing::{error, info, warn};

use crate::application::reseller::{PRICE_LIST_ALL, PriceListEntry, ResellerGateway, UpstreamError};
use crate::domain::products::{ACTIVE_STATUS, CacheEnvelope, PLACEHOLDER_IMAGE, ProductRecord};
use crate::infra::cache_file::CacheStoreError;
use crate::util::lock::mutex_lock;

use super::state::ProductCache;

const METRIC_REFRESH_TOTAL: &str = "storefront_refresh_total";
const METRIC_REFRESH_MS: &str = "storefront_refresh_ms";
const METRIC_REFRESH_JOINED: &str = "storefront_refresh_joined_total";

const LOCK_TARGET: &str = "application::products::refresh";

#[derive(Debug, Clone, Error)]
pub enum RefreshError {
    #[error(transparent)]
    Upstream(#[from] UpstreamError),
    #[error("failed to persist product cache: {0}")]
    Persist(#[source] Arc<CacheStoreError>),
    #[error("product refresh task aborted: {0}")]
    Aborted(String),
}

type RefreshResult = Result<Arc<CacheEnvelope>, RefreshError>;
type Flight = Shared<BoxFuture<'static, RefreshResult>>;

#[derive(Clone)]
pub struct RefreshCoordinator {
    inner: Arc<Inner>,
}

struct Inner {
    gateway: Arc<dyn ResellerGateway>,
    cache: Arc<ProductCache>,
    slot: Mutex<Option<(u64, Flight)>>,
    generation: AtomicU64,
}

impl RefreshCoordinator {
    pub fn new(gateway: Arc<dyn ResellerGateway>, cache: Arc<ProductCache>) -> Self {
        Self {
            inner: Arc::new(Inner {
                gateway,
                cache,
                slot: Mutex::new(None),
                generation: AtomicU64::new(0),
            }),
        }
    }

    /// Refresh and wait for the result, joining a cycle that is already running.
    pub async fn refresh(&self) -> RefreshResult {
        let (flight, _started) = self.join_or_start();
        flight.await
    }

    /// Make sure a cycle is running without waiting for it.
    ///
    /// Returns `true` when this call started a new cycle. Failures are logged.
    pub fn refresh_in_background(&self) -> bool {
        let (flight, started) = self.join_or_start();
        if started {
            tokio::spawn(async move {
                if let Err(err) = flight.await {
                    warn!(
                        target = "storefront::refresh",
                        error = %err,
                        "background product refresh failed"
                    );
                }
            });
        }
        started
    }

    pub fn is_refreshing(&self) -> bool {
        let slot = mutex_lock(&self.inner.slot, LOCK_TARGET, "is_refreshing");
        slot.is_some()
    }

    /// Wait for the in-flight cycle, if any, ignoring its outcome.
    pub async fn settle(&self) {
        let flight = mutex_lock(&self.inner.slot, LOCK_TARGET, "settle")
            .as_ref()
            .map(|(_, flight)| flight.clone());
        if let Some(flight) = flight {
            let _ = flight.await;
        }
    }

    fn join_or_start(&self) -> (Flight, bool) {
        let mut slot = mutex_lock(&self.inner.slot, LOCK_TARGET, "join_or_start");
        if let Some((_, flight)) = slot.as_ref() {
            counter!(METRIC_REFRESH_JOINED).increment(1);
            info!(
                target = "storefront::refresh",
                "product refresh already in progress; joining it"
            );
            return (flight.clone(), false);
        }

        let generation = self.inner.generation.fetch_add(1, Ordering::Relaxed) + 1;
        let inner = Arc::clone(&self.inner);
        // The slot lock is held until the flight is stored, so the cycle's
        // release below cannot run before the slot is populated.
        let task = tokio::spawn(async move {
            let _release = FlightRelease {
                inner: Arc::clone(&inner),
                generation,
            };
            inner.run_cycle().await
        });
        let flight = async move {
            match task.await {
                Ok(result) => result,
                Err(join) => Err(RefreshError::Aborted(join.to_string())),
            }
        }
        .boxed()
        .shared();

        *slot = Some((generation, flight.clone()));
        (flight, true)
    }
}

impl Inner {
    async fn run_cycle(&self) -> RefreshResult {
        let started = Instant::now();
        info!(target = "storefront::refresh", "starting product refresh");

        let entries = match self.gateway.price_list(PRICE_LIST_ALL).await {
            Ok(entries) => entries,
            Err(err) => {
                error!(
                    target = "storefront::refresh",
                    error = %err,
                    throttled = err.is_throttled(),
                    "product refresh failed while fetching price list"
                );
                finish(started, "upstream_error");
                return Err(err.into());
            }
        };
        let fetched_at = OffsetDateTime::now_utc();

        let records: Vec<ProductRecord> = entries.into_iter().map(normalize_entry).collect();
        let envelope = CacheEnvelope::new(records, fetched_at);

        match self.cache.replace(envelope).await {
            Ok(envelope) => {
                info!(
                    target = "storefront::refresh",
                    records = envelope.len(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "product cache refreshed"
                );
                finish(started, "success");
                Ok(envelope)
            }
            Err(err) => {
                error!(
                    target = "storefront::refresh",
                    error = %err,
                    path = %self.cache.store().path().display(),
                    "product refresh failed while persisting cache"
                );
                finish(started, "persist_error");
                Err(RefreshError::Persist(Arc::new(err)))
            }
        }
    }
}

struct FlightRelease {
    inner: Arc<Inner>,
    generation: u64,
}

impl Drop for FlightRelease {
    fn drop(&mut self) {
        let mut slot = mutex_lock(&self.inner.slot, LOCK_TARGET, "release");
        if matches!(slot.as_ref(), Some((generation, _)) if *generation == self.generation) {
            *slot = None;
        }
    }
}

fn finish(started: Instant, outcome: &'static str) {
    counter!(METRIC_REFRESH_TOTAL, "outcome" => outcome).increment(1);
    histogram!(METRIC_REFRESH_MS).record(started.elapsed().as_secs_f64() * 1000.0);
}

/// Map a raw price-list entry to the record served by the storefront.
///
/// An explicit `status` wins; otherwise the buyer/seller availability flags
/// decide between `active` and `inactive`.
pub fn normalize_entry(entry: PriceListEntry) -> ProductRecord {
    let status = match entry.status {
        Some(status) => status,
        None => match (entry.buyer_product_status, entry.seller_product_status) {
            (None, None) => String::new(),
            (buyer, seller) if buyer.unwrap_or(true) && seller.unwrap_or(true) => {
                ACTIVE_STATUS.to_string()
            }
            _ => "inactive".to_string(),
        },
    };

    ProductRecord {
        id: entry.buyer_sku_code,
        name: entry.product_name,
        developer: entry.brand,
        image: PLACEHOLDER_IMAGE.to_string(),
        category: entry.category,
        price: entry.price,
        status,
        kind: entry.kind.unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_maps_upstream_fields() {
        let entry = PriceListEntry {
            buyer_sku_code: "ML5".to_string(),
            product_name: "5 Diamonds".to_string(),
            brand: "MOBILE LEGENDS".to_string(),
            category: "Games".to_string(),
            price: 1_500,
            status: Some("active".to_string()),
            kind: Some("Umum".to_string()),
            ..Default::default()
        };

        let record = normalize_entry(entry);
        assert_eq!(record.id, "ML5");
        assert_eq!(record.developer, "MOBILE LEGENDS");
        assert_eq!(record.image, PLACEHOLDER_IMAGE);
        assert_eq!(record.kind, "Umum");
        assert!(record.is_active());
    }

    #[test]
    fn normalize_derives_status_from_availability_flags() {
        let available = PriceListEntry {
            buyer_product_status: Some(true),
            seller_product_status: Some(true),
            ..Default::default()
        };
        assert_eq!(normalize_entry(available).status, "active");

        let seller_down = PriceListEntry {
            buyer_product_status: Some(true),
            seller_product_status: Some(false),
            ..Default::default()
        };
        assert_eq!(normalize_entry(seller_down).status, "inactive");

        assert!(normalize_entry(PriceListEntry::default()).status.is_empty());
    }
}
