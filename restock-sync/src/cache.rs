//! Read-through cache of store info, keyed by store id.
//!
//! The cache is disposable: every entry can be rebuilt from `stores/<id>`.
//! A miss therefore never means the store does not exist; it means "go and
//! read the document".

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use moka::{future::Cache, Expiry};
use tracing::debug;

use restock_core::{paths::store_path, StoreId, StoreInfo};
use restock_docstore::{DocError, DocumentStore, StoreDocument};

/// Default entry lifetime.
pub const DEFAULT_TTL: Duration = Duration::from_secs(3600);

/// Upper bound on cached stores. The identifier space holds 9 x 999 ids.
pub const MAX_ENTRIES: u64 = 10_000;

/// Pluggable cache storage.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// The live entry for `key`, if any. Expired entries are never returned.
    async fn get(&self, key: &StoreId) -> Option<StoreInfo>;

    async fn put(&self, key: StoreId, value: StoreInfo, ttl: Duration);

    async fn evict(&self, key: &StoreId);
}

#[derive(Debug, Clone)]
struct CacheEntry {
    value: StoreInfo,
    ttl: Duration,
}

/// Each entry lives for the ttl it was last written with.
struct EntryTtl;

impl Expiry<StoreId, CacheEntry> for EntryTtl {
    fn expire_after_create(
        &self,
        _key: &StoreId,
        entry: &CacheEntry,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(entry.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &StoreId,
        entry: &CacheEntry,
        _updated_at: Instant,
        _remaining: Option<Duration>,
    ) -> Option<Duration> {
        Some(entry.ttl)
    }
}

/// Process-local cache on `moka`, bounded in size.
#[derive(Debug, Clone)]
pub struct MokaCache {
    inner: Cache<StoreId, CacheEntry>,
}

impl Default for MokaCache {
    fn default() -> Self {
        Self::with_capacity(MAX_ENTRIES)
    }
}

impl MokaCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(max_capacity: u64) -> Self {
        MokaCache {
            inner: Cache::builder()
                .max_capacity(max_capacity)
                .expire_after(EntryTtl)
                .build(),
        }
    }

    /// Live entries, after pending expirations are applied.
    pub async fn entry_count(&self) -> u64 {
        self.inner.run_pending_tasks().await;
        self.inner.entry_count()
    }
}

#[async_trait]
impl CacheBackend for MokaCache {
    async fn get(&self, key: &StoreId) -> Option<StoreInfo> {
        self.inner.get(key).await.map(|entry| entry.value)
    }

    async fn put(&self, key: StoreId, value: StoreInfo, ttl: Duration) {
        self.inner.insert(key, CacheEntry { value, ttl }).await;
    }

    async fn evict(&self, key: &StoreId) {
        self.inner.invalidate(key).await;
    }
}

// ---------------------------------------------------------------------------
// StoreLookup
// ---------------------------------------------------------------------------

/// Store info resolution: cache first, then `stores/<id>`.
#[derive(Clone)]
pub struct StoreLookup {
    docs: Arc<dyn DocumentStore>,
    cache: Arc<dyn CacheBackend>,
    ttl: Duration,
}

impl std::fmt::Debug for StoreLookup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreLookup").field("ttl", &self.ttl).finish_non_exhaustive()
    }
}

impl StoreLookup {
    pub fn new(docs: Arc<dyn DocumentStore>, cache: Arc<dyn CacheBackend>, ttl: Duration) -> Self {
        StoreLookup { docs, cache, ttl }
    }

    /// A lookup over a fresh [`MokaCache`].
    pub fn in_memory(docs: Arc<dyn DocumentStore>, ttl: Duration) -> Self {
        Self::new(docs, Arc::new(MokaCache::new()), ttl)
    }

    pub fn docs(&self) -> &dyn DocumentStore {
        self.docs.as_ref()
    }

    /// Name and address of `id`. A cache hit costs no document read; a miss
    /// reads `stores/<id>` and populates the cache.
    pub async fn resolve(&self, id: &StoreId) -> Result<StoreInfo, DocError> {
        if let Some(info) = self.cache.get(id).await {
            debug!(store_id = %id, "cache hit");
            return Ok(info);
        }
        debug!(store_id = %id, "cache miss");
        let fields = self.docs.get(&store_path(id)?).await?;
        let info = StoreDocument::from_fields(&fields).info();
        self.cache.put(id.clone(), info.clone(), self.ttl).await;
        Ok(info)
    }

    /// Replace the cached value after a successful write.
    pub async fn refresh(&self, id: &StoreId, info: StoreInfo) {
        self.cache.put(id.clone(), info, self.ttl).await;
    }

    pub async fn evict(&self, id: &StoreId) {
        self.cache.evict(id).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use restock_docstore::{fields::store_info_fields, MemoryDocumentStore};

    fn info(name: &str) -> StoreInfo {
        StoreInfo {
            name: name.to_string(),
            address: "Shibuya".to_string(),
        }
    }

    async fn seeded(ttl: Duration) -> (Arc<MemoryDocumentStore>, StoreLookup) {
        let docs = Arc::new(MemoryDocumentStore::new());
        docs.insert(
            &store_path(&StoreId::from("11007")).unwrap(),
            store_info_fields(&info("Book Cafe")),
        )
        .await;
        let lookup = StoreLookup::in_memory(docs.clone(), ttl);
        (docs, lookup)
    }

    #[tokio::test]
    async fn get_after_put_within_ttl_skips_document_read() {
        let (docs, lookup) = seeded(DEFAULT_TTL).await;
        let id = StoreId::from("11007");
        lookup.refresh(&id, info("Cached Name")).await;

        assert_eq!(lookup.resolve(&id).await.unwrap().name, "Cached Name");
        assert_eq!(docs.reads(), 0);
    }

    #[tokio::test]
    async fn expired_entry_reads_document_store_again() {
        let (docs, lookup) = seeded(Duration::from_millis(50)).await;
        let id = StoreId::from("11007");
        lookup.refresh(&id, info("Cached Name")).await;

        tokio::time::sleep(Duration::from_millis(120)).await;
        assert_eq!(lookup.resolve(&id).await.unwrap().name, "Book Cafe");
        assert_eq!(docs.reads(), 1);
    }

    #[tokio::test]
    async fn miss_populates_cache() {
        let (docs, lookup) = seeded(DEFAULT_TTL).await;
        let id = StoreId::from("11007");
        lookup.resolve(&id).await.unwrap();
        lookup.resolve(&id).await.unwrap();
        assert_eq!(docs.reads(), 1);
    }

    #[tokio::test]
    async fn miss_for_unknown_store_is_not_found() {
        let (_, lookup) = seeded(DEFAULT_TTL).await;
        let err = lookup.resolve(&StoreId::from("33999")).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn malformed_id_is_refused_without_a_read() {
        let (docs, lookup) = seeded(DEFAULT_TTL).await;
        let err = lookup.resolve(&StoreId::from("../stores/11007")).await.unwrap_err();
        assert!(matches!(err, DocError::InvalidId(_)));
        assert_eq!(docs.reads(), 0);
    }

    #[tokio::test]
    async fn transient_failure_is_not_cached() {
        let (docs, lookup) = seeded(DEFAULT_TTL).await;
        let id = StoreId::from("11007");
        docs.fail_with_transient("stores/11007").await;
        assert!(lookup.resolve(&id).await.unwrap_err().is_retryable());
        docs.heal("stores/11007").await;
        assert_eq!(lookup.resolve(&id).await.unwrap().name, "Book Cafe");
    }

    #[tokio::test]
    async fn expired_entries_do_not_accumulate() {
        let cache = MokaCache::new();
        for n in 1..=20u32 {
            cache
                .put(StoreId(format!("11{n:03}")), info("A"), Duration::from_millis(50))
                .await;
        }
        assert_eq!(cache.entry_count().await, 20);

        tokio::time::sleep(Duration::from_millis(120)).await;
        assert!(cache.get(&StoreId::from("11001")).await.is_none());
        assert_eq!(cache.entry_count().await, 0);
    }

    #[tokio::test]
    async fn evict_forces_a_read() {
        let (docs, lookup) = seeded(DEFAULT_TTL).await;
        let id = StoreId::from("11007");
        lookup.resolve(&id).await.unwrap();
        lookup.evict(&id).await;
        lookup.resolve(&id).await.unwrap();
        assert_eq!(docs.reads(), 2);
    }
}
