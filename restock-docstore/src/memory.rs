//! In-memory [`DocumentStore`] for tests and `--dry-run` style use.
//!
//! Counts reads so cache behaviour can be asserted, and can be told to fail a
//! path (or a whole collection) with a transient error.

use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use restock_core::{Collection, DocPath};

use crate::error::DocError;
use crate::fields::Fields;
use crate::store::DocumentStore;

#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    docs: RwLock<BTreeMap<String, Fields>>,
    failing: RwLock<HashSet<String>>,
    failing_writes: RwLock<HashSet<String>>,
    reads: AtomicUsize,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `get` and `list` calls served so far, failed ones included.
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    /// Fail every call touching `key` with [`DocError::Transient`]. `key` is a
    /// document path (`stores/11007`) or a collection name (`stores`).
    pub async fn fail_with_transient(&self, key: &str) {
        self.failing.write().await.insert(key.to_owned());
    }

    /// Like [`fail_with_transient`](Self::fail_with_transient) but reads
    /// still succeed.
    pub async fn fail_writes_with_transient(&self, key: &str) {
        self.failing_writes.write().await.insert(key.to_owned());
    }

    pub async fn heal(&self, key: &str) {
        self.failing.write().await.remove(key);
        self.failing_writes.write().await.remove(key);
    }

    /// Seed a document without going through the trait.
    pub async fn insert(&self, path: &DocPath, fields: Fields) {
        self.docs.write().await.insert(path.to_string(), fields);
    }

    /// Copy of the whole store, keyed by `collection/id`.
    pub async fn snapshot(&self) -> BTreeMap<String, Fields> {
        self.docs.read().await.clone()
    }

    async fn check(&self, path: &DocPath) -> Result<(), DocError> {
        let failing = self.failing.read().await;
        let key = path.to_string();
        if failing.contains(&key) || failing.contains(path.collection().name()) {
            return Err(DocError::Transient(format!("injected failure for {key}")));
        }
        Ok(())
    }

    async fn check_write(&self, path: &DocPath) -> Result<(), DocError> {
        self.check(path).await?;
        let failing = self.failing_writes.read().await;
        let key = path.to_string();
        if failing.contains(&key) || failing.contains(path.collection().name()) {
            return Err(DocError::Transient(format!("injected write failure for {key}")));
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn get(&self, path: &DocPath) -> Result<Fields, DocError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.check(path).await?;
        self.docs
            .read()
            .await
            .get(&path.to_string())
            .cloned()
            .ok_or_else(|| DocError::NotFound {
                path: path.to_string(),
            })
    }

    async fn create(&self, path: &DocPath, fields: Fields) -> Result<(), DocError> {
        self.check_write(path).await?;
        let mut docs = self.docs.write().await;
        let key = path.to_string();
        if docs.contains_key(&key) {
            return Err(DocError::AlreadyExists { path: key });
        }
        docs.insert(key, fields);
        Ok(())
    }

    async fn set(&self, path: &DocPath, fields: Fields) -> Result<(), DocError> {
        self.check_write(path).await?;
        self.docs.write().await.insert(path.to_string(), fields);
        Ok(())
    }

    async fn update(&self, path: &DocPath, fields: Fields) -> Result<(), DocError> {
        self.check_write(path).await?;
        self.docs
            .write()
            .await
            .entry(path.to_string())
            .or_default()
            .extend(fields);
        Ok(())
    }

    async fn delete(&self, path: &DocPath) -> Result<(), DocError> {
        self.check_write(path).await?;
        self.docs.write().await.remove(&path.to_string());
        Ok(())
    }

    async fn list(&self, collection: Collection) -> Result<Vec<(DocPath, Fields)>, DocError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if self.failing.read().await.contains(collection.name()) {
            return Err(DocError::Transient(format!(
                "injected failure for {collection}"
            )));
        }
        let prefix = format!("{}/", collection.name());
        Ok(self
            .docs
            .read()
            .await
            .iter()
            .filter(|(key, _)| key.starts_with(&prefix))
            .filter_map(|(key, fields)| DocPath::parse(key).map(|p| (p, fields.clone())))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::FieldValue;
    use restock_core::{report_path, store_path, StoreId};

    fn one(key: &str, value: &str) -> Fields {
        let mut f = Fields::new();
        f.insert(key.into(), FieldValue::from(value));
        f
    }

    #[tokio::test]
    async fn create_refuses_existing_document() {
        let docs = MemoryDocumentStore::new();
        let path = store_path(&StoreId::from("11001")).unwrap();
        docs.create(&path, one("name", "A")).await.unwrap();
        let err = docs.create(&path, one("name", "B")).await.unwrap_err();
        assert!(matches!(err, DocError::AlreadyExists { .. }));
        assert_eq!(docs.get(&path).await.unwrap()["name"].as_str(), Some("A"));
    }

    #[tokio::test]
    async fn update_merges_and_set_overwrites() {
        let docs = MemoryDocumentStore::new();
        let path = store_path(&StoreId::from("11001")).unwrap();
        let mut initial = one("name", "A");
        initial.insert("timestamp".into(), FieldValue::from("t0"));
        docs.set(&path, initial).await.unwrap();

        docs.update(&path, one("name", "B")).await.unwrap();
        let got = docs.get(&path).await.unwrap();
        assert_eq!(got["name"].as_str(), Some("B"));
        assert!(got.contains_key("timestamp"));

        docs.set(&path, one("name", "C")).await.unwrap();
        assert!(!docs.get(&path).await.unwrap().contains_key("timestamp"));
    }

    #[tokio::test]
    async fn list_is_scoped_to_collection() {
        let docs = MemoryDocumentStore::new();
        let id = StoreId::from("11001");
        docs.insert(&store_path(&id).unwrap(), Fields::new()).await;
        docs.insert(&report_path(&id).unwrap(), Fields::new()).await;

        let reports = docs.list(Collection::RestockReports).await.unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].0, report_path(&id).unwrap());
        assert_eq!(docs.reads(), 1);
    }

    #[tokio::test]
    async fn injected_failures_can_be_healed() {
        let docs = MemoryDocumentStore::new();
        let path = store_path(&StoreId::from("11001")).unwrap();
        docs.fail_with_transient("stores").await;
        assert!(docs.set(&path, Fields::new()).await.unwrap_err().is_retryable());
        docs.heal("stores").await;
        docs.set(&path, Fields::new()).await.unwrap();
        docs.delete(&path).await.unwrap();
        docs.delete(&path).await.unwrap();
    }

    #[tokio::test]
    async fn write_failures_leave_reads_working() {
        let docs = MemoryDocumentStore::new();
        let path = store_path(&StoreId::from("11001")).unwrap();
        docs.insert(&path, one("name", "A")).await;
        docs.fail_writes_with_transient("stores/11001").await;
        assert!(docs.update(&path, one("name", "B")).await.unwrap_err().is_retryable());
        assert_eq!(docs.get(&path).await.unwrap()["name"].as_str(), Some("A"));
    }
}
