//! The document-store seam.

use async_trait::async_trait;

use restock_core::{paths::store_path, Collection, DocPath, StoreId};

use crate::error::DocError;
use crate::fields::Fields;

/// A schema-less per-document database.
///
/// Paths are always built with [`restock_core::paths`]; implementations never
/// see raw strings from callers.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Read one document. Absent → [`DocError::NotFound`].
    async fn get(&self, path: &DocPath) -> Result<Fields, DocError>;

    /// Create a document. Present → [`DocError::AlreadyExists`].
    async fn create(&self, path: &DocPath, fields: Fields) -> Result<(), DocError>;

    /// Create or overwrite a document with exactly `fields`.
    async fn set(&self, path: &DocPath, fields: Fields) -> Result<(), DocError>;

    /// Merge `fields` into a document, creating it if absent. Fields not named
    /// in `fields` are left untouched.
    async fn update(&self, path: &DocPath, fields: Fields) -> Result<(), DocError>;

    /// Delete a document. Deleting an absent document succeeds.
    async fn delete(&self, path: &DocPath) -> Result<(), DocError>;

    /// Every document in `collection`, in id order.
    async fn list(&self, collection: Collection) -> Result<Vec<(DocPath, Fields)>, DocError>;
}

/// Whether `stores/<id>` is registered.
///
/// `NotFound` is an answer (`Ok(false)`); every other failure is passed back so
/// the caller can defer instead of assuming the store is absent.
pub async fn store_exists(store: &dyn DocumentStore, id: &StoreId) -> Result<bool, DocError> {
    match store.get(&store_path(id)?).await {
        Ok(_) => Ok(true),
        Err(DocError::NotFound { .. }) => Ok(false),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryDocumentStore;

    #[tokio::test]
    async fn exists_distinguishes_absent_from_unavailable() {
        let docs = MemoryDocumentStore::new();
        let id = StoreId::from("11007");
        assert!(!store_exists(&docs, &id).await.unwrap());

        docs.set(&store_path(&id).unwrap(), Fields::new()).await.unwrap();
        assert!(store_exists(&docs, &id).await.unwrap());

        docs.fail_with_transient("stores/11007").await;
        let err = store_exists(&docs, &id).await.unwrap_err();
        assert!(err.is_retryable());
    }
}
