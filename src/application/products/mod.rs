//! Product catalog served from the cached reseller price list.
//!
//! Reads are answered from the in-memory snapshot. A stale snapshot is served
//! as-is while a background refresh runs; a missing one blocks on a refresh.
//! The derived views (categories, grouped catalog, detail) never refresh.

mod metadata;
mod refresh;
mod state;

pub use metadata::{MetadataError, MetadataSource};
pub use refresh::{RefreshCoordinator, RefreshError, normalize_entry};
pub use state::{ProductCache, Removal};

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use time::OffsetDateTime;
use tracing::{debug, info};

use crate::domain::catalog::{self, CatalogEntry, ProductDetail};
use crate::domain::error::DomainError;
use crate::domain::products::CacheEnvelope;
use crate::infra::cache_file::CacheStoreError;

#[derive(Debug, Error)]
pub enum ProductServiceError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Refresh(#[from] RefreshError),
    #[error(transparent)]
    Store(#[from] CacheStoreError),
    #[error(transparent)]
    Metadata(#[from] MetadataError),
}

#[derive(Clone)]
pub struct ProductService {
    cache: Arc<ProductCache>,
    refresher: RefreshCoordinator,
    metadata: Arc<dyn MetadataSource>,
    ttl: Duration,
}

impl ProductService {
    pub fn new(
        cache: Arc<ProductCache>,
        refresher: RefreshCoordinator,
        metadata: Arc<dyn MetadataSource>,
        ttl: Duration,
    ) -> Self {
        Self {
            cache,
            refresher,
            metadata,
            ttl,
        }
    }

    pub fn refresher(&self) -> &RefreshCoordinator {
        &self.refresher
    }

    /// Current product snapshot, refreshing first when none exists yet.
    pub async fn products(&self) -> Result<Arc<CacheEnvelope>, ProductServiceError> {
        if let Some(envelope) = self.cache.snapshot().await {
            if envelope.is_stale(OffsetDateTime::now_utc(), self.ttl) {
                let started = self.refresher.refresh_in_background();
                debug!(
                    target = "storefront::products",
                    fetched_at = %envelope.fetched_at(),
                    started,
                    "serving stale product cache while refreshing"
                );
            }
            return Ok(envelope);
        }

        info!(
            target = "storefront::products",
            "product cache empty; refreshing before serving"
        );
        Ok(self.refresher.refresh().await?)
    }

    /// Refresh from upstream and wait for the result.
    pub async fn sync_now(&self) -> Result<Arc<CacheEnvelope>, ProductServiceError> {
        Ok(self.refresher.refresh().await?)
    }

    /// Remove every cached record with this SKU id and persist the result.
    pub async fn delete_product(&self, id: &str) -> Result<usize, ProductServiceError> {
        match self.cache.remove(id).await? {
            Removal::Removed { count, envelope } => {
                info!(
                    target = "storefront::products",
                    id,
                    removed = count,
                    remaining = envelope.len(),
                    "removed product from cache"
                );
                Ok(count)
            }
            Removal::NoMatch | Removal::NoCache => Err(DomainError::not_found("product").into()),
        }
    }

    /// Distinct categories of the current snapshot; empty when nothing is cached.
    pub async fn categories(&self) -> Vec<String> {
        match self.cache.snapshot().await {
            Some(envelope) => catalog::categories(&envelope.data),
            None => Vec::new(),
        }
    }

    /// Homepage catalog of the current snapshot. Metadata is only read when
    /// there are records to group.
    pub async fn grouped_catalog(&self) -> Result<Vec<CatalogEntry>, ProductServiceError> {
        let Some(envelope) = self.populated_snapshot().await else {
            return Ok(Vec::new());
        };
        let directory = self.metadata.load().await?;
        Ok(catalog::grouped_catalog(&envelope.data, &directory))
    }

    pub async fn product_detail(&self, key: &str) -> Result<ProductDetail, ProductServiceError> {
        let Some(envelope) = self.populated_snapshot().await else {
            return Err(DomainError::not_found("product cache").into());
        };
        let directory = self.metadata.load().await?;
        catalog::product_detail(&envelope.data, &directory, key)
            .ok_or_else(|| DomainError::not_found("product").into())
    }

    async fn populated_snapshot(&self) -> Option<Arc<CacheEnvelope>> {
        let snapshot = self.cache.snapshot().await;
        snapshot.filter(|envelope| !envelope.is_empty())
    }
}
