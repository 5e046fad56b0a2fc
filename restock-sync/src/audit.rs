//! Audit trail: every workflow event goes to `tracing` and to the registry's
//! Log sheet.

use chrono::Utc;
use tracing::{info, warn};

use restock_core::{types::LogEntry, RegistrySheets};

use crate::error::SyncError;

pub const INTAKE: &str = "intake";
pub const SYNC: &str = "sync";
pub const DELETE: &str = "delete";
pub const DAILY_REPORT: &str = "daily_report";
pub const REPORT_SHEET: &str = "report_sheet";

/// Log `message` under `source` and append it to the Log sheet.
///
/// A Log sheet that cannot be written is itself only worth a warning.
pub fn record<R>(registry: &mut R, source: &str, message: impl Into<String>)
where
    R: RegistrySheets + ?Sized,
{
    let message = message.into();
    info!(source, "{message}");
    let entry = LogEntry {
        timestamp: Utc::now(),
        source: source.to_string(),
        message,
    };
    if let Err(e) = registry.append_log(entry) {
        warn!(source, error = %e, "failed to append to log sheet");
    }
}

/// Record every identifier shared by several Store rows. Those rows are left
/// out of the job; the rest of the batch goes ahead.
pub fn duplicates<R>(registry: &mut R, source: &str) -> Result<(), SyncError>
where
    R: RegistrySheets + ?Sized,
{
    for id in registry.duplicate_ids()? {
        warn!(source, store_id = %id, "store id appears in more than one registry row");
        record(
            registry,
            source,
            format!("store {id} appears in more than one registry row; rows skipped"),
        );
    }
    Ok(())
}
