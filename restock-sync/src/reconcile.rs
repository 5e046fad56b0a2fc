//! One-way push of flagged registry rows to `stores/<id>`.

use chrono::{DateTime, Utc};
use futures::future::join_all;
use tracing::{info, warn};

use restock_core::{paths::store_path, RegistrySheets, StoreId, StoreRecord, StoreRepository};
use restock_docstore::{fields::store_info_fields, DocError, FieldValue, Fields};

use crate::audit;
use crate::cache::StoreLookup;
use crate::error::SyncError;

#[derive(Debug, Clone, PartialEq)]
pub enum SyncOutcome {
    /// No valid row carried the sync flag.
    NothingFlagged,
    Completed {
        synced: Vec<StoreId>,
        /// Still flagged; picked up again by the next run.
        failed: Vec<(StoreId, DocError)>,
    },
}

/// Valid rows (identifier and name filled) whose sync flag is set.
pub fn flagged<R>(registry: &R) -> Result<Vec<StoreRecord>, SyncError>
where
    R: StoreRepository + ?Sized,
{
    Ok(registry
        .list()?
        .into_iter()
        .filter(|r| r.pending_sync)
        .collect())
}

fn sync_fields(record: &StoreRecord) -> Fields {
    let mut fields = store_info_fields(&record.info());
    fields.insert(
        "storeId".into(),
        FieldValue::from(record.store_id.as_str()),
    );
    fields
}

/// Push every flagged row concurrently, wait for all of them, then clear the
/// flag and stamp `last_synced_at` on the rows that made it.
pub async fn reconcile<R>(
    registry: &mut R,
    lookup: &StoreLookup,
    now: DateTime<Utc>,
) -> Result<SyncOutcome, SyncError>
where
    R: RegistrySheets + Send + ?Sized,
{
    audit::duplicates(registry, audit::SYNC)?;
    let pending = flagged(&*registry)?;
    if pending.is_empty() {
        audit::record(registry, audit::SYNC, "no stores are flagged for sync");
        return Ok(SyncOutcome::NothingFlagged);
    }

    let docs = lookup.docs();
    let results = join_all(pending.into_iter().map(|record| async move {
        let result = match store_path(&record.store_id) {
            Ok(path) => docs.update(&path, sync_fields(&record)).await,
            Err(e) => Err(DocError::from(e)),
        };
        (record, result)
    }))
    .await;

    let mut synced = Vec::new();
    let mut failed = Vec::new();
    for (mut record, result) in results {
        match result {
            Ok(()) => {
                lookup.refresh(&record.store_id, record.info()).await;
                record.pending_sync = false;
                record.last_synced_at = Some(now);
                synced.push(record.store_id.clone());
                registry.upsert(record)?;
            }
            Err(error) => {
                warn!(store_id = %record.store_id, %error, "sync failed; row stays flagged");
                audit::record(
                    registry,
                    audit::SYNC,
                    format!("store {} not synced: {error}", record.store_id),
                );
                failed.push((record.store_id, error));
            }
        }
    }

    info!(synced = synced.len(), failed = failed.len(), "reconciliation finished");
    audit::record(
        registry,
        audit::SYNC,
        format!("{} stores synced, {} failed", synced.len(), failed.len()),
    );
    Ok(SyncOutcome::Completed { synced, failed })
}
