//! Operations behind the public reporting page.

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use restock_core::{paths::report_path, paths::store_path, RestockReport, StoreId, StoreInfo};
use restock_docstore::{DocError, DocumentStore, ReportDocument, StoreDocument};
use restock_renderer::context::UNSET;

/// Result of looking a store up for the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupOutcome {
    /// Blank name or address fields read `未設定`.
    Found { id: StoreId, info: StoreInfo },
    NotFound { id: StoreId },
    /// Not a store id at all; nothing was read.
    Invalid { id: StoreId },
    /// The document store could not answer; the page offers manual entry.
    Unavailable { id: StoreId, message: String },
}

fn or_unset(value: String) -> String {
    if value.trim().is_empty() {
        UNSET.to_string()
    } else {
        value
    }
}

/// Read `stores/<id>` directly. The page always shows live data.
pub async fn lookup_store(docs: &dyn DocumentStore, id: &StoreId) -> LookupOutcome {
    let path = match store_path(id) {
        Ok(path) => path,
        Err(e) => {
            warn!(error = %e, "lookup refused");
            return LookupOutcome::Invalid { id: id.clone() };
        }
    };
    match docs.get(&path).await {
        Ok(fields) => {
            let doc = StoreDocument::from_fields(&fields);
            LookupOutcome::Found {
                id: id.clone(),
                info: StoreInfo {
                    name: or_unset(doc.name),
                    address: or_unset(doc.address),
                },
            }
        }
        Err(DocError::NotFound { .. }) => LookupOutcome::NotFound { id: id.clone() },
        Err(e) => {
            warn!(store_id = %id, error = %e, "store lookup failed");
            LookupOutcome::Unavailable {
                id: id.clone(),
                message: e.to_string(),
            }
        }
    }
}

/// Record that the last copy at `id` was taken at `now`. Overwrites any
/// earlier report for the same store. Malformed ids fail with
/// [`DocError::InvalidId`] before anything is written.
pub async fn submit_report(
    docs: &dyn DocumentStore,
    id: &StoreId,
    now: DateTime<Utc>,
) -> Result<RestockReport, DocError> {
    let path = report_path(id)?;
    let report = ReportDocument {
        store_id: id.clone(),
        reported_at: now,
    };
    docs.set(&path, report.to_fields()).await?;
    info!(store_id = %id, "restock report submitted");
    Ok(RestockReport {
        store_id: report.store_id,
        reported_at: report.reported_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use restock_docstore::{fields::store_info_fields, MemoryDocumentStore};

    #[tokio::test]
    async fn lookup_distinguishes_found_missing_and_unavailable() {
        let docs = MemoryDocumentStore::new();
        let id = StoreId::from("11007");
        docs.insert(
            &store_path(&id).unwrap(),
            store_info_fields(&StoreInfo {
                name: "Book Cafe".into(),
                address: String::new(),
            }),
        )
        .await;

        match lookup_store(&docs, &id).await {
            LookupOutcome::Found { info, .. } => {
                assert_eq!(info.name, "Book Cafe");
                assert_eq!(info.address, "未設定");
            }
            other => panic!("expected Found, got {other:?}"),
        }
        assert!(matches!(
            lookup_store(&docs, &StoreId::from("33999")).await,
            LookupOutcome::NotFound { .. }
        ));
        assert!(matches!(
            lookup_store(&docs, &StoreId::from(" ")).await,
            LookupOutcome::Invalid { .. }
        ));

        docs.fail_with_transient("stores").await;
        assert!(matches!(
            lookup_store(&docs, &id).await,
            LookupOutcome::Unavailable { .. }
        ));
    }

    #[tokio::test]
    async fn second_report_overwrites_first() {
        let docs = MemoryDocumentStore::new();
        let id = StoreId::from("11007");
        let first = Utc.with_ymd_and_hms(2024, 10, 18, 1, 0, 0).unwrap();
        let second = Utc.with_ymd_and_hms(2024, 10, 19, 1, 0, 0).unwrap();
        submit_report(&docs, &id, first).await.unwrap();
        submit_report(&docs, &id, second).await.unwrap();

        let snapshot = docs.snapshot().await;
        assert_eq!(snapshot.len(), 1);
        let doc = ReportDocument::from_fields(&report_path(&id).unwrap(), &snapshot["restock-reports/11007"])
            .unwrap();
        assert_eq!(doc.reported_at, second);
    }

    #[tokio::test]
    async fn ids_outside_the_identifier_shape_touch_nothing() {
        let docs = MemoryDocumentStore::new();
        let store = StoreId::from("11007");
        docs.insert(
            &store_path(&store).unwrap(),
            store_info_fields(&StoreInfo {
                name: "Book Cafe".into(),
                address: "Shibuya".into(),
            }),
        )
        .await;
        let before = docs.snapshot().await;
        let now = Utc.with_ymd_and_hms(2024, 10, 19, 1, 0, 0).unwrap();

        for raw in ["../stores/11007", "a/b", "..", "11007\u{0}"] {
            let id = StoreId::from(raw);
            let err = submit_report(&docs, &id, now).await.unwrap_err();
            assert!(matches!(err, DocError::InvalidId(_)), "{raw:?}");
            assert!(matches!(
                lookup_store(&docs, &id).await,
                LookupOutcome::Invalid { .. }
            ));
        }
        assert_eq!(docs.snapshot().await, before);
        assert_eq!(docs.reads(), 0);
    }
}
