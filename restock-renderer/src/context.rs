//! Template contexts: serializable rendering payloads for mail and pages.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use restock_core::types::{ReportRow, StoreId, StoreInfo};

use crate::error::RenderError;

/// Shown in mail when a store's name or address cannot be resolved.
pub const UNKNOWN: &str = "不明";
/// Shown on the public page when a store document lacks a field.
pub const UNSET: &str = "未設定";

/// Format of the report date in the mail subject.
pub const DATE_FORMAT: &str = "%Y/%m/%d";
/// Format of each report timestamp in the mail body.
pub const DATETIME_FORMAT: &str = "%Y/%m/%d %H:%M:%S";

fn or_placeholder(value: &str, placeholder: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        placeholder.to_string()
    } else {
        trimmed.to_string()
    }
}

// ---------------------------------------------------------------------------
// Daily report mail
// ---------------------------------------------------------------------------

/// Payload of the daily report mail: the local date and one entry per
/// matched report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportContext {
    pub date: String,
    pub entries: Vec<ReportEntryCtx>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportEntryCtx {
    pub store_id: String,
    pub name: String,
    pub address: String,
    pub reported_at: String,
}

impl ReportEntryCtx {
    /// `reported_at` is printed in the row's own offset.
    pub fn from_row(row: &ReportRow) -> Self {
        ReportEntryCtx {
            store_id: row.store_id.to_string(),
            name: or_placeholder(&row.name, UNKNOWN),
            address: or_placeholder(&row.address, UNKNOWN),
            reported_at: row.reported_at.format(DATETIME_FORMAT).to_string(),
        }
    }
}

impl ReportContext {
    pub fn new(date: NaiveDate, entries: Vec<ReportEntryCtx>) -> Self {
        ReportContext {
            date: date.format(DATE_FORMAT).to_string(),
            entries,
        }
    }

    pub fn from_rows(date: NaiveDate, rows: &[ReportRow]) -> Self {
        Self::new(date, rows.iter().map(ReportEntryCtx::from_row).collect())
    }

    pub fn to_tera_context(&self) -> Result<tera::Context, RenderError> {
        tera::Context::from_serialize(self).map_err(RenderError::context("report mail"))
    }
}

/// Payload of the error mail sent when the report job fails.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorMailContext {
    pub message: String,
}

impl ErrorMailContext {
    pub fn to_tera_context(&self) -> Result<tera::Context, RenderError> {
        tera::Context::from_serialize(self).map_err(RenderError::context("error mail"))
    }
}

// ---------------------------------------------------------------------------
// Public page
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreCtx {
    pub id: String,
    pub name: String,
    pub address: String,
}

impl StoreCtx {
    /// Blank fields are shown as `未設定`.
    pub fn new(id: &StoreId, info: &StoreInfo) -> Self {
        StoreCtx {
            id: id.to_string(),
            name: or_placeholder(&info.name, UNSET),
            address: or_placeholder(&info.address, UNSET),
        }
    }
}

/// Everything the page templates may show. Which fields are set depends on
/// the page: the store page has `store`, the error page has `error`, the
/// thank-you page has `store_id`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PageContext {
    pub store: Option<StoreCtx>,
    pub error: Option<String>,
    pub store_id: Option<String>,
}

impl PageContext {
    pub fn store(store: StoreCtx) -> Self {
        PageContext {
            store_id: Some(store.id.clone()),
            store: Some(store),
            error: None,
        }
    }

    /// `store_id` pre-fills the manual entry field.
    pub fn error(message: impl Into<String>, store_id: Option<&str>) -> Self {
        PageContext {
            store: None,
            error: Some(message.into()),
            store_id: store_id.map(str::to_owned),
        }
    }

    pub fn thanks(store_id: &StoreId) -> Self {
        PageContext {
            store: None,
            error: None,
            store_id: Some(store_id.to_string()),
        }
    }

    pub fn to_tera_context(&self) -> Result<tera::Context, RenderError> {
        tera::Context::from_serialize(self).map_err(RenderError::context("page"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, TimeZone};

    fn row(name: &str, address: &str) -> ReportRow {
        let jst = FixedOffset::east_opt(9 * 3600).unwrap();
        ReportRow {
            store_id: StoreId::from("11007"),
            name: name.to_string(),
            address: address.to_string(),
            reported_at: jst.with_ymd_and_hms(2024, 10, 19, 23, 59, 0).unwrap(),
        }
    }

    #[test]
    fn entry_formats_local_timestamp() {
        let entry = ReportEntryCtx::from_row(&row("Book Cafe", "Shibuya"));
        assert_eq!(entry.reported_at, "2024/10/19 23:59:00");
        assert_eq!(entry.name, "Book Cafe");
    }

    #[test]
    fn blank_name_and_address_become_unknown() {
        let entry = ReportEntryCtx::from_row(&row(" ", ""));
        assert_eq!(entry.name, UNKNOWN);
        assert_eq!(entry.address, UNKNOWN);
    }

    #[test]
    fn store_ctx_uses_unset_placeholder() {
        let info = StoreInfo {
            name: "Book Cafe".into(),
            address: String::new(),
        };
        let ctx = StoreCtx::new(&StoreId::from("11007"), &info);
        assert_eq!(ctx.address, UNSET);
    }

    #[test]
    fn report_date_uses_slashes() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
        assert_eq!(ReportContext::new(date, vec![]).date, "2024/01/05");
    }
}
