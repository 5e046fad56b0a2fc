//! Daily restock report and Report sheet refresh.
//!
//! "Today" is the calendar date at the reporting offset (UTC+9 by default).
//! A report belongs to today when its `reportedAt`, shifted to that offset,
//! falls on the same date.

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use futures::future::join_all;
use tracing::{error, warn};

use restock_core::{types::ReportRow, Collection, RegistrySheets, StoreInfo};
use restock_docstore::{DocError, ReportDocument};
use restock_renderer::{context::UNKNOWN, ErrorMailContext, Renderer, ReportContext};

use crate::audit;
use crate::cache::StoreLookup;
use crate::error::SyncError;
use crate::mailer::Mailer;

/// Who gets the report and which day boundary applies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportSettings {
    pub recipient: String,
    pub offset: FixedOffset,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReportOutcome {
    /// The `restock-reports` collection is empty.
    NoReports,
    /// Reports exist, none of them from today. No mail sent.
    NoActivity { listed: usize },
    /// One mail sent, one Report sheet row per entry.
    Sent { date: NaiveDate, rows: Vec<ReportRow> },
    /// The job failed; an error mail was attempted.
    Failed { message: String },
}

/// `true` when `reported_at` falls on `today` at `offset`.
pub fn is_same_local_day(reported_at: DateTime<Utc>, today: NaiveDate, offset: FixedOffset) -> bool {
    reported_at.with_timezone(&offset).date_naive() == today
}

fn or_unknown(value: String) -> String {
    if value.trim().is_empty() {
        UNKNOWN.to_string()
    } else {
        value
    }
}

/// Every decodable report document. Malformed ones are logged and dropped.
async fn list_reports(lookup: &StoreLookup) -> Result<(usize, Vec<ReportDocument>), DocError> {
    let listed = lookup.docs().list(Collection::RestockReports).await?;
    let total = listed.len();
    let reports = listed
        .iter()
        .filter_map(|(path, fields)| match ReportDocument::from_fields(path, fields) {
            Ok(doc) => Some(doc),
            Err(e) => {
                warn!(%path, error = %e, "skipping malformed report document");
                None
            }
        })
        .collect();
    Ok((total, reports))
}

/// Resolve every report's store concurrently and build Report sheet rows,
/// ordered by report time. Reports whose store cannot be resolved are
/// skipped.
async fn resolve_rows(
    lookup: &StoreLookup,
    reports: Vec<ReportDocument>,
    offset: FixedOffset,
) -> Vec<ReportRow> {
    let resolved = join_all(reports.into_iter().map(|report| async move {
        let info = lookup.resolve(&report.store_id).await;
        (report, info)
    }))
    .await;

    let mut rows: Vec<ReportRow> = resolved
        .into_iter()
        .filter_map(|(report, info)| match info {
            Ok(StoreInfo { name, address }) => Some(ReportRow {
                store_id: report.store_id,
                name: or_unknown(name),
                address: or_unknown(address),
                reported_at: report.reported_at.with_timezone(&offset),
            }),
            Err(e) => {
                warn!(store_id = %report.store_id, error = %e, "report store could not be resolved; skipped");
                None
            }
        })
        .collect();
    rows.sort_by(|a, b| {
        a.reported_at
            .cmp(&b.reported_at)
            .then_with(|| a.store_id.cmp(&b.store_id))
    });
    rows
}

// ---------------------------------------------------------------------------
// Daily report
// ---------------------------------------------------------------------------

/// Build and mail today's report.
///
/// Never returns an error: a job-level failure is mailed to the recipient as
/// an error report and comes back as [`ReportOutcome::Failed`].
pub async fn send_daily_report<R>(
    registry: &mut R,
    lookup: &StoreLookup,
    renderer: &Renderer,
    mailer: &dyn Mailer,
    settings: &ReportSettings,
    now: DateTime<Utc>,
) -> ReportOutcome
where
    R: RegistrySheets + Send + ?Sized,
{
    match daily_report(registry, lookup, renderer, mailer, settings, now).await {
        Ok(outcome) => outcome,
        Err(e) => {
            let message = e.to_string();
            error!(error = %message, "daily report failed");
            audit::record(registry, audit::DAILY_REPORT, format!("daily report failed: {message}"));
            if let Err(mail_err) =
                send_error_report(renderer, mailer, &settings.recipient, &message).await
            {
                audit::record(
                    registry,
                    audit::DAILY_REPORT,
                    format!("error report could not be sent: {mail_err}"),
                );
            }
            ReportOutcome::Failed { message }
        }
    }
}

/// Mail the error report for a failed daily run. Send failures are logged
/// here and handed back so the caller can audit them.
pub async fn send_error_report(
    renderer: &Renderer,
    mailer: &dyn Mailer,
    recipient: &str,
    message: &str,
) -> Result<(), SyncError> {
    let mail = renderer.render_report_error(&ErrorMailContext {
        message: message.to_string(),
    })?;
    if let Err(e) = mailer.send(recipient, &mail).await {
        error!(error = %e, "error report could not be sent");
        return Err(e.into());
    }
    Ok(())
}

async fn daily_report<R>(
    registry: &mut R,
    lookup: &StoreLookup,
    renderer: &Renderer,
    mailer: &dyn Mailer,
    settings: &ReportSettings,
    now: DateTime<Utc>,
) -> Result<ReportOutcome, SyncError>
where
    R: RegistrySheets + Send + ?Sized,
{
    let today = now.with_timezone(&settings.offset).date_naive();
    let (listed, reports) = list_reports(lookup).await?;
    if listed == 0 {
        audit::record(registry, audit::DAILY_REPORT, "no restock reports found");
        return Ok(ReportOutcome::NoReports);
    }
    audit::record(
        registry,
        audit::DAILY_REPORT,
        format!("{listed} restock reports listed"),
    );

    let todays: Vec<ReportDocument> = reports
        .into_iter()
        .filter(|r| is_same_local_day(r.reported_at, today, settings.offset))
        .collect();
    let rows = resolve_rows(lookup, todays, settings.offset).await;
    if rows.is_empty() {
        audit::record(registry, audit::DAILY_REPORT, "no reports today");
        return Ok(ReportOutcome::NoActivity { listed });
    }

    let mail = renderer.render_daily_report(&ReportContext::from_rows(today, &rows))?;
    mailer.send(&settings.recipient, &mail).await?;
    registry.append_report_rows(&rows)?;
    audit::record(
        registry,
        audit::DAILY_REPORT,
        format!(
            "daily report sent for {} ({} stores)",
            today.format(restock_renderer::context::DATE_FORMAT),
            rows.len()
        ),
    );
    Ok(ReportOutcome::Sent { date: today, rows })
}

// ---------------------------------------------------------------------------
// Report sheet refresh
// ---------------------------------------------------------------------------

/// Rewrite the Report sheet from every restock report on record. Returns the
/// number of rows written.
pub async fn refresh_report_sheet<R>(
    registry: &mut R,
    lookup: &StoreLookup,
    offset: FixedOffset,
) -> Result<usize, SyncError>
where
    R: RegistrySheets + Send + ?Sized,
{
    let (_, reports) = list_reports(lookup).await?;
    let rows = resolve_rows(lookup, reports, offset).await;
    let count = rows.len();
    registry.replace_report_rows(rows)?;
    audit::record(
        registry,
        audit::REPORT_SHEET,
        format!("report sheet refreshed with {count} rows"),
    );
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rstest::rstest;

    fn jst() -> FixedOffset {
        FixedOffset::east_opt(9 * 3600).unwrap()
    }

    #[rstest]
    // 2024-10-19 23:59 JST
    #[case(Utc.with_ymd_and_hms(2024, 10, 19, 14, 59, 0).unwrap(), true)]
    // 2024-10-19 00:00 JST
    #[case(Utc.with_ymd_and_hms(2024, 10, 18, 15, 0, 0).unwrap(), true)]
    // 2024-10-18 23:59 JST
    #[case(Utc.with_ymd_and_hms(2024, 10, 18, 14, 59, 0).unwrap(), false)]
    // 2024-10-20 00:00 JST
    #[case(Utc.with_ymd_and_hms(2024, 10, 19, 15, 0, 0).unwrap(), false)]
    fn local_day_boundary(#[case] reported_at: DateTime<Utc>, #[case] expected: bool) {
        let today = NaiveDate::from_ymd_opt(2024, 10, 19).unwrap();
        assert_eq!(is_same_local_day(reported_at, today, jst()), expected);
    }
}
