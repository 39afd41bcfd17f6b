use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use storefront::application::products::{
    MetadataError, MetadataSource, ProductCache, ProductService, ProductServiceError,
    RefreshCoordinator, RefreshError,
};
use storefront::application::reseller::{
    ApiMode, Balance, CredentialOverrides, PriceListEntry, ResellerGateway, TransactionRequest,
    UpstreamError, UpstreamErrorKind,
};
use storefront::domain::catalog::DeveloperDirectory;
use storefront::domain::error::DomainError;
use storefront::domain::products::{CacheEnvelope, ProductRecord, unix_millis};
use storefront::infra::cache_file::CacheStore;
use tempfile::TempDir;
use time::OffsetDateTime;

const TTL: Duration = Duration::from_secs(60);

struct CountingGateway {
    calls: AtomicUsize,
    delay: Duration,
    throttled: bool,
}

impl CountingGateway {
    fn new(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            delay,
            throttled: false,
        })
    }

    fn throttled() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            delay: Duration::ZERO,
            throttled: true,
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

fn entry(sku: &str, brand: &str) -> PriceListEntry {
    PriceListEntry {
        buyer_sku_code: sku.to_string(),
        product_name: format!("{sku} pack"),
        brand: brand.to_string(),
        category: "Games".to_string(),
        price: 1_000,
        status: Some("active".to_string()),
        kind: Some("Umum".to_string()),
        ..Default::default()
    }
}

#[async_trait]
impl ResellerGateway for CountingGateway {
    async fn price_list(&self, _command: &str) -> Result<Vec<PriceListEntry>, UpstreamError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        if self.throttled {
            return Err(UpstreamErrorKind::Throttled.into());
        }
        Ok(vec![entry("ML5", "MOBILE LEGENDS"), entry("FF5", "FREE FIRE")])
    }

    async fn balance(
        &self,
        _mode: ApiMode,
        _overrides: &CredentialOverrides,
    ) -> Result<Balance, UpstreamError> {
        Ok(Balance { deposit: 0 })
    }

    async fn submit_transaction(
        &self,
        _request: &TransactionRequest,
        _mode: ApiMode,
    ) -> Result<Value, UpstreamError> {
        Ok(Value::Null)
    }
}

struct EmptyMetadata;

#[async_trait]
impl MetadataSource for EmptyMetadata {
    async fn load(&self) -> Result<DeveloperDirectory, MetadataError> {
        Ok(DeveloperDirectory::new())
    }
}

fn record(id: &str) -> ProductRecord {
    ProductRecord {
        id: id.to_string(),
        name: format!("{id} pack"),
        developer: "MOBILE LEGENDS".to_string(),
        category: "Games".to_string(),
        price: 500,
        status: "active".to_string(),
        ..Default::default()
    }
}

async fn service(dir: &TempDir, gateway: Arc<CountingGateway>) -> (ProductService, CacheStore) {
    let store = CacheStore::new(dir.path().join("products.json"));
    let cache = Arc::new(ProductCache::open(store.clone()).await);
    let refresher = RefreshCoordinator::new(gateway, cache.clone());
    let service = ProductService::new(cache, refresher, Arc::new(EmptyMetadata), TTL);
    (service, store)
}

#[tokio::test]
async fn concurrent_refreshes_share_one_fetch() {
    let dir = TempDir::new().expect("tempdir");
    let gateway = CountingGateway::new(Duration::from_millis(100));
    let (service, _store) = service(&dir, gateway.clone()).await;
    let refresher = service.refresher().clone();

    let (first, second, third) = tokio::join!(
        refresher.refresh(),
        refresher.refresh(),
        refresher.refresh()
    );

    assert_eq!(gateway.calls(), 1);
    let first = first.expect("first");
    assert_eq!(first, second.expect("second"));
    assert_eq!(first, third.expect("third"));
    assert!(!refresher.is_refreshing());
}

#[tokio::test]
async fn missing_cache_blocks_on_a_refresh() {
    let dir = TempDir::new().expect("tempdir");
    let gateway = CountingGateway::new(Duration::ZERO);
    let (service, store) = service(&dir, gateway.clone()).await;

    let before = unix_millis(OffsetDateTime::now_utc());
    let envelope = service.products().await.expect("products");
    let after = unix_millis(OffsetDateTime::now_utc());

    assert_eq!(gateway.calls(), 1);
    assert_eq!(envelope.len(), 2);
    assert!(envelope.timestamp >= before && envelope.timestamp <= after);

    let persisted = store.read().await.expect("cache file");
    assert_eq!(persisted, *envelope);
    assert_eq!(persisted.data[0].id, "ML5");
}

#[tokio::test]
async fn fresh_cache_is_served_without_fetching() {
    let dir = TempDir::new().expect("tempdir");
    let store = CacheStore::new(dir.path().join("products.json"));
    store
        .write(&CacheEnvelope::new(vec![record("ML5")], OffsetDateTime::now_utc()))
        .await
        .expect("seed");

    let gateway = CountingGateway::new(Duration::ZERO);
    let (service, _store) = service(&dir, gateway.clone()).await;

    let envelope = service.products().await.expect("products");
    assert_eq!(envelope.len(), 1);
    assert_eq!(gateway.calls(), 0);
}

#[tokio::test]
async fn stale_cache_is_served_while_one_refresh_runs() {
    let dir = TempDir::new().expect("tempdir");
    let store = CacheStore::new(dir.path().join("products.json"));
    let fetched_at = OffsetDateTime::now_utc() - TTL - Duration::from_millis(1);
    store
        .write(&CacheEnvelope::new(vec![record("OLD")], fetched_at))
        .await
        .expect("seed");

    let gateway = CountingGateway::new(Duration::from_millis(50));
    let (service, store) = service(&dir, gateway.clone()).await;

    let first = service.products().await.expect("stale products");
    let second = service.products().await.expect("stale products again");
    assert_eq!(first.data[0].id, "OLD");
    assert_eq!(second.data[0].id, "OLD");

    service.refresher().settle().await;
    assert_eq!(gateway.calls(), 1);

    let refreshed = service.products().await.expect("refreshed products");
    assert_eq!(refreshed.len(), 2);
    assert_eq!(store.read().await.expect("cache file").len(), 2);
}

#[tokio::test]
async fn throttled_refresh_keeps_the_cache_file() {
    let dir = TempDir::new().expect("tempdir");
    let store = CacheStore::new(dir.path().join("products.json"));
    let seeded = CacheEnvelope::new(vec![record("ML5")], OffsetDateTime::now_utc());
    store.write(&seeded).await.expect("seed");

    let gateway = CountingGateway::throttled();
    let (service, store) = service(&dir, gateway.clone()).await;

    let err = service.sync_now().await.expect_err("throttled");
    match err {
        ProductServiceError::Refresh(RefreshError::Upstream(upstream)) => {
            assert!(upstream.is_throttled())
        }
        other => panic!("unexpected error: {other:?}"),
    }

    assert_eq!(store.read().await.expect("cache file"), seeded);
    assert!(!service.refresher().is_refreshing());

    service.sync_now().await.expect_err("still throttled");
    assert_eq!(gateway.calls(), 2);
}

#[tokio::test]
async fn deleting_removes_matching_records_and_persists() {
    let dir = TempDir::new().expect("tempdir");
    let store = CacheStore::new(dir.path().join("products.json"));
    let seeded = CacheEnvelope::new(
        vec![record("ML5"), record("ML10"), record("ML5")],
        OffsetDateTime::now_utc(),
    );
    store.write(&seeded).await.expect("seed");

    let (service, store) = service(&dir, CountingGateway::new(Duration::ZERO)).await;

    assert_eq!(service.delete_product("ML5").await.expect("delete"), 2);

    let persisted = store.read().await.expect("cache file");
    assert_eq!(persisted.timestamp, seeded.timestamp);
    assert_eq!(persisted.len(), 1);
    assert_eq!(persisted.data[0].id, "ML10");
}

#[tokio::test]
async fn deleting_an_unknown_id_leaves_the_file_alone() {
    let dir = TempDir::new().expect("tempdir");
    let store = CacheStore::new(dir.path().join("products.json"));
    let seeded = CacheEnvelope::new(vec![record("ML5")], OffsetDateTime::now_utc());
    store.write(&seeded).await.expect("seed");

    let (service, store) = service(&dir, CountingGateway::new(Duration::ZERO)).await;

    let err = service.delete_product("NOPE").await.expect_err("not found");
    assert!(matches!(
        err,
        ProductServiceError::Domain(DomainError::NotFound { .. })
    ));
    assert_eq!(store.read().await.expect("cache file"), seeded);
}

#[tokio::test]
async fn derived_views_never_trigger_a_fetch() {
    let dir = TempDir::new().expect("tempdir");
    let gateway = CountingGateway::new(Duration::ZERO);
    let (service, _store) = service(&dir, gateway.clone()).await;

    assert!(service.categories().await.is_empty());
    assert!(service.grouped_catalog().await.expect("grouped").is_empty());
    let err = service.product_detail("mlbb").await.expect_err("no cache");
    assert!(matches!(
        err,
        ProductServiceError::Domain(DomainError::NotFound { .. })
    ));
    assert_eq!(gateway.calls(), 0);
}

#[tokio::test]
async fn delete_during_refresh_keeps_memory_and_file_in_step() {
    let dir = TempDir::new().expect("tempdir");
    let store = CacheStore::new(dir.path().join("products.json"));
    store
        .write(&CacheEnvelope::new(
            vec![record("ML5"), record("ML10")],
            OffsetDateTime::now_utc(),
        ))
        .await
        .expect("seed");

    let gateway = CountingGateway::new(Duration::from_millis(100));
    let (service, store) = service(&dir, gateway.clone()).await;

    let (synced, deleted) = tokio::join!(service.sync_now(), async {
        tokio::time::sleep(Duration::from_millis(20)).await;
        service.delete_product("ML5").await
    });
    synced.expect("sync");
    assert_eq!(deleted.expect("delete"), 1);
    assert_eq!(gateway.calls(), 1);

    let in_memory = service.products().await.expect("snapshot");
    let persisted = store.read().await.expect("cache file");
    assert_eq!(persisted, *in_memory);

    let ids: Vec<&str> = persisted
        .data
        .iter()
        .map(|record| record.id.as_str())
        .collect();
    assert!(
        ids == ["ML5", "FF5"] || ids == ["FF5"],
        "unexpected final records: {ids:?}"
    );
}
