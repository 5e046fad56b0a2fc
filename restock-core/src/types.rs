//! Domain types for the restock registry.
//!
//! Sheet rows (`StoreRow`, `SurveyRow`, `ReportRow`, `LogEntry`) mirror the
//! registry columns one-to-one and tolerate blank cells. Validated values
//! (`StoreRecord`, `SurveyResponse`) are derived from rows and never carry
//! blanks in their key fields.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{IdentifierError, ValidationError};

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// A store identifier, e.g. `11007`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StoreId(pub String);

impl StoreId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `true` when the cell holding this id is effectively empty.
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }

    /// Parse untrusted input (a query string, a form field) into an id.
    ///
    /// Accepts exactly two category digits `1`-`3` followed by three digits.
    /// Surrounding whitespace is ignored.
    pub fn parse(raw: &str) -> Result<StoreId, IdentifierError> {
        let id = StoreId(raw.trim().to_owned());
        id.validate()?;
        Ok(id)
    }

    /// Check that this id has the `<code><code><nnn>` shape. Ids that pass can
    /// be used as a document name as-is.
    pub fn validate(&self) -> Result<(), IdentifierError> {
        let bytes = self.0.as_bytes();
        let well_formed = bytes.len() == 5
            && bytes[..2].iter().all(|b| (b'1'..=b'3').contains(b))
            && bytes[2..].iter().all(u8::is_ascii_digit);
        if well_formed {
            Ok(())
        } else {
            Err(IdentifierError::Malformed {
                raw: self.0.escape_debug().to_string(),
            })
        }
    }
}

impl fmt::Display for StoreId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for StoreId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for StoreId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Survey answers
// ---------------------------------------------------------------------------

/// "How many times has a box been installed here?"
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InstallationFrequency {
    First,
    Multiple,
    Other,
}

impl InstallationFrequency {
    /// Leading digit of the store identifier.
    pub fn code(self) -> u8 {
        match self {
            InstallationFrequency::First => 1,
            InstallationFrequency::Multiple => 2,
            InstallationFrequency::Other => 3,
        }
    }

    /// The answer as it appears on the survey form.
    pub fn label(self) -> &'static str {
        match self {
            InstallationFrequency::First => "初めて",
            InstallationFrequency::Multiple => "複数回",
            InstallationFrequency::Other => "その他",
        }
    }
}

impl fmt::Display for InstallationFrequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for InstallationFrequency {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "" => Err(ValidationError::EmptyField("installationFrequency")),
            "初めて" | "first" => Ok(Self::First),
            "複数回" | "multiple" => Ok(Self::Multiple),
            "その他" | "other" => Ok(Self::Other),
            other => Err(ValidationError::UnknownInstallationFrequency(other.to_owned())),
        }
    }
}

/// "Can the installation be kept up?"
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ContinuityFeasibility {
    /// The respondent installs it personally.
    #[serde(rename = "self")]
    SelfInstall,
    OtherMember,
    Other,
}

impl ContinuityFeasibility {
    /// Second digit of the store identifier.
    pub fn code(self) -> u8 {
        match self {
            ContinuityFeasibility::SelfInstall => 1,
            ContinuityFeasibility::OtherMember => 2,
            ContinuityFeasibility::Other => 3,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ContinuityFeasibility::SelfInstall => "自分が設置にいけば",
            ContinuityFeasibility::OtherMember => "別のメンバーが行っても可能",
            ContinuityFeasibility::Other => "その他",
        }
    }
}

impl fmt::Display for ContinuityFeasibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ContinuityFeasibility {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "" => Err(ValidationError::EmptyField("continuityFeasibility")),
            "自分が設置にいけば" | "self" => Ok(Self::SelfInstall),
            "別のメンバーが行っても可能" | "other-member" => Ok(Self::OtherMember),
            "その他" | "other" => Ok(Self::Other),
            other => Err(ValidationError::UnknownContinuityFeasibility(other.to_owned())),
        }
    }
}

// ---------------------------------------------------------------------------
// Sheet rows
// ---------------------------------------------------------------------------

/// One row of the Survey sheet, exactly as submitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurveyRow {
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub store_name: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub installation_frequency: String,
    #[serde(default)]
    pub continuity_feasibility: String,
}

/// A validated survey submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SurveyResponse {
    pub timestamp: DateTime<Utc>,
    pub store_name: String,
    pub location: String,
    pub installation_frequency: InstallationFrequency,
    pub continuity_feasibility: ContinuityFeasibility,
}

impl TryFrom<&SurveyRow> for SurveyResponse {
    type Error = ValidationError;

    fn try_from(row: &SurveyRow) -> Result<Self, Self::Error> {
        let store_name = row.store_name.trim();
        if store_name.is_empty() {
            return Err(ValidationError::EmptyField("storeName"));
        }
        Ok(SurveyResponse {
            timestamp: row.timestamp,
            store_name: store_name.to_owned(),
            location: row.location.trim().to_owned(),
            installation_frequency: row.installation_frequency.parse()?,
            continuity_feasibility: row.continuity_feasibility.parse()?,
        })
    }
}

/// One row of the Store sheet. Any cell may be blank.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct StoreRow {
    #[serde(default)]
    pub store_id: Option<StoreId>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub sync_flag: bool,
    #[serde(default)]
    pub last_synced_at: Option<DateTime<Utc>>,
}

impl StoreRow {
    /// The identifier cell, if it holds anything.
    pub fn id(&self) -> Option<&StoreId> {
        self.store_id.as_ref().filter(|id| !id.is_blank())
    }

    /// A row is valid when both identifier and name are filled in.
    pub fn to_record(&self) -> Option<StoreRecord> {
        let id = self.id()?;
        if self.name.trim().is_empty() {
            return None;
        }
        Some(StoreRecord {
            store_id: id.clone(),
            name: self.name.clone(),
            address: self.address.clone(),
            pending_sync: self.sync_flag,
            last_synced_at: self.last_synced_at,
        })
    }
}

/// A registered store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreRecord {
    pub store_id: StoreId,
    pub name: String,
    pub address: String,
    pub pending_sync: bool,
    pub last_synced_at: Option<DateTime<Utc>>,
}

impl StoreRecord {
    pub fn info(&self) -> StoreInfo {
        StoreInfo {
            name: self.name.clone(),
            address: self.address.clone(),
        }
    }
}

impl From<&StoreRecord> for StoreRow {
    fn from(record: &StoreRecord) -> Self {
        StoreRow {
            store_id: Some(record.store_id.clone()),
            name: record.name.clone(),
            address: record.address.clone(),
            sync_flag: record.pending_sync,
            last_synced_at: record.last_synced_at,
        }
    }
}

/// The public part of a store: what the page shows and the cache holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreInfo {
    pub name: String,
    pub address: String,
}

/// A "last copy taken" report submitted from the public page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestockReport {
    pub store_id: StoreId,
    pub reported_at: DateTime<Utc>,
}

/// One row of the Report sheet; `reported_at` is in the reporting offset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportRow {
    pub store_id: StoreId,
    pub name: String,
    pub address: String,
    pub reported_at: DateTime<FixedOffset>,
}

/// One row of the Log sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub source: String,
    pub message: String,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
