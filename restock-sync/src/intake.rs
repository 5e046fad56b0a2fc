//! Survey intake: turn Survey sheet rows into store records and their
//! `stores/<id>` documents.
//!
//! Rows are processed in sheet order with one counter step per row, so the
//! same sheet always maps onto the same identifiers. A row whose identifier
//! is already registered is skipped, which makes re-running intake safe.

use chrono::Utc;
use tracing::warn;

use restock_core::{
    generate_identifier, paths::store_path, IdentifierSequence, RegistrySheets, StoreId,
    StoreRecord, StoreRepository, SurveyResponse,
};
use restock_docstore::{store_exists, DocError, DocumentStore, StoreDocument};

use crate::audit;
use crate::error::SyncError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntakeOptions {
    /// Counter value for the first survey row.
    pub counter_start: u32,
}

impl Default for IntakeOptions {
    fn default() -> Self {
        IntakeOptions { counter_start: 1 }
    }
}

/// What happened to one survey row. `row` is 1-based.
#[derive(Debug, Clone, PartialEq)]
pub enum IntakeOutcome {
    /// Registry row and document both written.
    Created { row: usize, store_id: StoreId },
    /// The identifier is already registered; nothing written.
    Skipped { row: usize, store_id: StoreId },
    /// The existence check could not be answered; nothing written. Retry later.
    Deferred {
        row: usize,
        store_id: StoreId,
        error: DocError,
    },
    /// Answers could not be mapped, or the counter is exhausted.
    Rejected { row: usize, reason: String },
    /// Registry row written but the document was not. The row is flagged so
    /// the next reconciliation pushes it.
    MirrorFailed {
        row: usize,
        store_id: StoreId,
        error: DocError,
    },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct IntakeSummary {
    pub outcomes: Vec<IntakeOutcome>,
}

impl IntakeSummary {
    fn count(&self, pred: impl Fn(&IntakeOutcome) -> bool) -> usize {
        self.outcomes.iter().filter(|o| pred(o)).count()
    }

    pub fn created(&self) -> usize {
        self.count(|o| matches!(o, IntakeOutcome::Created { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, IntakeOutcome::Skipped { .. }))
    }

    pub fn deferred(&self) -> usize {
        self.count(|o| matches!(o, IntakeOutcome::Deferred { .. }))
    }

    pub fn rejected(&self) -> usize {
        self.count(|o| matches!(o, IntakeOutcome::Rejected { .. }))
    }

    pub fn mirror_failed(&self) -> usize {
        self.count(|o| matches!(o, IntakeOutcome::MirrorFailed { .. }))
    }
}

/// Process every Survey sheet row.
///
/// Only registry failures abort the run; every document-store or validation
/// problem is confined to its row and reported in the summary.
pub async fn run_intake<R>(
    registry: &mut R,
    docs: &dyn DocumentStore,
    options: &IntakeOptions,
) -> Result<IntakeSummary, SyncError>
where
    R: RegistrySheets + Send + ?Sized,
{
    let rows = registry.survey_rows()?;
    audit::duplicates(registry, audit::INTAKE)?;
    let duplicates = registry.duplicate_ids()?;
    let mut sequence = IdentifierSequence::starting_at(options.counter_start);
    let mut summary = IntakeSummary::default();

    for (index, survey_row) in rows.iter().enumerate() {
        let row = index + 1;
        let counter = sequence.advance();

        let response = match SurveyResponse::try_from(survey_row) {
            Ok(r) => r,
            Err(e) => {
                audit::record(registry, audit::INTAKE, format!("row {row} rejected: {e}"));
                summary.outcomes.push(IntakeOutcome::Rejected {
                    row,
                    reason: e.to_string(),
                });
                continue;
            }
        };

        let store_id = match generate_identifier(
            response.installation_frequency,
            response.continuity_feasibility,
            counter,
        ) {
            Ok(id) => id,
            Err(e) => {
                audit::record(registry, audit::INTAKE, format!("row {row} rejected: {e}"));
                summary.outcomes.push(IntakeOutcome::Rejected {
                    row,
                    reason: e.to_string(),
                });
                continue;
            }
        };

        if duplicates.contains(&store_id) {
            let reason = format!("store id {store_id} is held by more than one registry row");
            audit::record(registry, audit::INTAKE, format!("row {row} rejected: {reason}"));
            summary.outcomes.push(IntakeOutcome::Rejected { row, reason });
            continue;
        }

        let outcome = intake_one(registry, docs, row, store_id, &response).await?;
        summary.outcomes.push(outcome);
    }

    audit::record(
        registry,
        audit::INTAKE,
        format!(
            "intake finished: {} created, {} skipped, {} deferred, {} rejected, {} mirror failures",
            summary.created(),
            summary.skipped(),
            summary.deferred(),
            summary.rejected(),
            summary.mirror_failed()
        ),
    );
    Ok(summary)
}

async fn intake_one<R>(
    registry: &mut R,
    docs: &dyn DocumentStore,
    row: usize,
    store_id: StoreId,
    response: &SurveyResponse,
) -> Result<IntakeOutcome, SyncError>
where
    R: RegistrySheets + Send + ?Sized,
{
    match store_exists(docs, &store_id).await {
        Ok(true) => {
            audit::record(
                registry,
                audit::INTAKE,
                format!("store {store_id} already registered; row {row} skipped"),
            );
            return Ok(IntakeOutcome::Skipped { row, store_id });
        }
        Ok(false) => {}
        Err(error) => {
            warn!(store_id = %store_id, row, %error, "existence check failed; deferring");
            audit::record(
                registry,
                audit::INTAKE,
                format!("row {row} ({store_id}) deferred: {error}"),
            );
            return Ok(IntakeOutcome::Deferred {
                row,
                store_id,
                error,
            });
        }
    }

    // A registry row without its document (earlier mirror failure) is kept
    // as staff may have edited it since. The document then carries the row's
    // name and address, not the survey's.
    let mut record = match registry.get(&store_id)? {
        Some(existing) => existing,
        None => {
            let record = StoreRecord {
                store_id: store_id.clone(),
                name: response.store_name.clone(),
                address: response.location.clone(),
                pending_sync: false,
                last_synced_at: None,
            };
            registry.upsert(record.clone())?;
            record
        }
    };

    let mut document = StoreDocument::from_survey(response);
    document.name = record.name.clone();
    document.address = record.address.clone();
    let created = match store_path(&store_id) {
        Ok(path) => docs.create(&path, document.to_fields()).await,
        Err(e) => Err(DocError::from(e)),
    };
    match created {
        Ok(()) => {
            record.pending_sync = false;
            record.last_synced_at = Some(Utc::now());
            registry.upsert(record)?;
            audit::record(
                registry,
                audit::INTAKE,
                format!("store {store_id} registered from row {row}"),
            );
            Ok(IntakeOutcome::Created { row, store_id })
        }
        Err(DocError::AlreadyExists { .. }) => {
            audit::record(
                registry,
                audit::INTAKE,
                format!("store {store_id} appeared concurrently; row {row} skipped"),
            );
            Ok(IntakeOutcome::Skipped { row, store_id })
        }
        Err(error) => {
            warn!(store_id = %store_id, row, %error, "document creation failed");
            record.pending_sync = true;
            registry.upsert(record)?;
            audit::record(
                registry,
                audit::INTAKE,
                format!("store {store_id} written to registry but not mirrored: {error}"),
            );
            Ok(IntakeOutcome::MirrorFailed {
                row,
                store_id,
                error,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use restock_core::{types::SurveyRow, Workbook};
    use restock_docstore::MemoryDocumentStore;

    fn survey(name: &str, freq: &str, cont: &str) -> SurveyRow {
        SurveyRow {
            timestamp: Utc::now(),
            store_name: name.into(),
            location: "Tokyo".into(),
            installation_frequency: freq.into(),
            continuity_feasibility: cont.into(),
        }
    }

    #[tokio::test]
    async fn counter_advances_past_rejected_rows() {
        let mut book = Workbook::default();
        book.survey.push(survey("A", "初めて", "その他"));
        book.survey.push(survey("B", "たぶん", "その他"));
        book.survey.push(survey("C", "複数回", "自分が設置にいけば"));
        let docs = MemoryDocumentStore::new();

        let summary = run_intake(&mut book, &docs, &IntakeOptions::default())
            .await
            .unwrap();
        assert_eq!(
            summary.outcomes[0],
            IntakeOutcome::Created {
                row: 1,
                store_id: StoreId::from("13001")
            }
        );
        assert!(matches!(summary.outcomes[1], IntakeOutcome::Rejected { row: 2, .. }));
        assert_eq!(
            summary.outcomes[2],
            IntakeOutcome::Created {
                row: 3,
                store_id: StoreId::from("21003")
            }
        );
        assert_eq!(book.list().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn exhausted_counter_rejects_without_truncating() {
        let mut book = Workbook::default();
        book.survey.push(survey("A", "初めて", "その他"));
        book.survey.push(survey("B", "初めて", "その他"));
        let docs = MemoryDocumentStore::new();

        let summary = run_intake(&mut book, &docs, &IntakeOptions { counter_start: 999 })
            .await
            .unwrap();
        assert_eq!(summary.created(), 1);
        assert!(matches!(
            &summary.outcomes[1],
            IntakeOutcome::Rejected { reason, .. } if reason.contains("1000")
        ));
    }
}
