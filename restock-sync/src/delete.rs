//! Removal of flagged stores from both the document store and the registry.
//!
//! A row is only removed from the registry once its document is gone, so a
//! failed delete leaves the row (and its flag) in place for another attempt.

use futures::future::join_all;
use tracing::warn;

use restock_core::{paths::store_path, RegistrySheets, StoreId, StoreRecord, StoreRepository};
use restock_docstore::DocError;

use crate::audit;
use crate::cache::StoreLookup;
use crate::error::SyncError;
use crate::reconcile::flagged;

#[derive(Debug, Clone, PartialEq)]
pub enum DeleteOutcome {
    NothingFlagged,
    Completed {
        deleted: Vec<StoreId>,
        failed: Vec<(StoreId, DocError)>,
    },
}

/// The rows [`delete_flagged`] would remove.
pub fn preview<R>(registry: &R) -> Result<Vec<StoreRecord>, SyncError>
where
    R: RegistrySheets + ?Sized,
{
    flagged(registry)
}

pub async fn delete_flagged<R>(
    registry: &mut R,
    lookup: &StoreLookup,
) -> Result<DeleteOutcome, SyncError>
where
    R: RegistrySheets + Send + ?Sized,
{
    audit::duplicates(registry, audit::DELETE)?;
    let targets = flagged(&*registry)?;
    if targets.is_empty() {
        audit::record(registry, audit::DELETE, "no stores are flagged for deletion");
        return Ok(DeleteOutcome::NothingFlagged);
    }

    let docs = lookup.docs();
    let results = join_all(targets.into_iter().map(|record| async move {
        let result = match store_path(&record.store_id) {
            Ok(path) => docs.delete(&path).await,
            Err(e) => Err(DocError::from(e)),
        };
        (record.store_id, result)
    }))
    .await;

    let mut deleted = Vec::new();
    let mut failed = Vec::new();
    for (store_id, result) in results {
        match result {
            Ok(()) => {
                lookup.evict(&store_id).await;
                registry.delete(&store_id)?;
                audit::record(registry, audit::DELETE, format!("store {store_id} deleted"));
                deleted.push(store_id);
            }
            Err(error) => {
                warn!(store_id = %store_id, %error, "document delete failed; row kept");
                audit::record(
                    registry,
                    audit::DELETE,
                    format!("store {store_id} not deleted: {error}"),
                );
                failed.push((store_id, error));
            }
        }
    }
    Ok(DeleteOutcome::Completed { deleted, failed })
}
