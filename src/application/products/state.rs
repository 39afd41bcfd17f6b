use std::sync::Arc;

use metrics::gauge;
use tokio::sync::{Mutex, RwLock};
use tracing::info;

use crate::domain::products::CacheEnvelope;
use crate::infra::cache_file::{CacheStore, CacheStoreError};

const METRIC_CACHE_RECORDS: &str = "storefront_cache_records";

/// Outcome of removing records by id.
#[derive(Debug)]
pub enum Removal {
    Removed {
        count: usize,
        envelope: Arc<CacheEnvelope>,
    },
    NoMatch,
    NoCache,
}

/// Authoritative in-memory product snapshot, mirrored to the cache file.
///
/// Readers get a cheap `Arc` of the current envelope. Every mutation goes
/// through one write gate and persists before it becomes visible, so the file
/// and memory never diverge and a refresh cannot interleave with a delete.
pub struct ProductCache {
    store: CacheStore,
    current: RwLock<Option<Arc<CacheEnvelope>>>,
    writes: Mutex<()>,
}

impl ProductCache {
    /// Hydrate from the cache file; an unreadable file starts the cache empty.
    pub async fn open(store: CacheStore) -> Self {
        let current = store.read().await.map(Arc::new);
        match current.as_deref() {
            Some(envelope) => {
                info!(
                    target = "storefront::cache",
                    path = %store.path().display(),
                    records = envelope.len(),
                    fetched_at = %envelope.fetched_at(),
                    "loaded product cache"
                );
                record_size(envelope);
            }
            None => info!(
                target = "storefront::cache",
                path = %store.path().display(),
                "no product cache on disk; first request will sync"
            ),
        }

        Self {
            store,
            current: RwLock::new(current),
            writes: Mutex::new(()),
        }
    }

    pub fn store(&self) -> &CacheStore {
        &self.store
    }

    pub async fn snapshot(&self) -> Option<Arc<CacheEnvelope>> {
        self.current.read().await.clone()
    }

    /// Persist `envelope` and make it the current snapshot.
    pub async fn replace(
        &self,
        envelope: CacheEnvelope,
    ) -> Result<Arc<CacheEnvelope>, CacheStoreError> {
        let _gate = self.writes.lock().await;
        self.store.write(&envelope).await?;

        let envelope = Arc::new(envelope);
        *self.current.write().await = Some(Arc::clone(&envelope));
        record_size(&envelope);
        Ok(envelope)
    }

    /// Drop every record whose id equals `id`. Nothing is written unless a record matched.
    pub async fn remove(&self, id: &str) -> Result<Removal, CacheStoreError> {
        let _gate = self.writes.lock().await;

        let Some(current) = self.current.read().await.clone() else {
            return Ok(Removal::NoCache);
        };
        let (trimmed, count) = current.without(id);
        if count == 0 {
            return Ok(Removal::NoMatch);
        }

        self.store.write(&trimmed).await?;
        let envelope = Arc::new(trimmed);
        *self.current.write().await = Some(Arc::clone(&envelope));
        record_size(&envelope);
        Ok(Removal::Removed { count, envelope })
    }
}

fn record_size(envelope: &CacheEnvelope) {
    gauge!(METRIC_CACHE_RECORDS).set(envelope.len() as f64);
}
