//! Document field model.
//!
//! [`FieldValue`] serializes to the Firestore REST wire shape
//! (`{"stringValue": "…"}`, `{"timestampValue": "…"}`, …), so the same
//! [`Fields`] map is used in memory and on the wire.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use restock_core::{
    paths::DocPath,
    types::{ContinuityFeasibility, InstallationFrequency, StoreId, StoreInfo, SurveyResponse},
};

use crate::error::DocError;

/// Field name → value.
pub type Fields = BTreeMap<String, FieldValue>;

/// A single typed document field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FieldValue {
    NullValue(()),
    BooleanValue(bool),
    IntegerValue(#[serde(with = "integer_string")] i64),
    DoubleValue(f64),
    TimestampValue(DateTime<Utc>),
    StringValue(String),
    MapValue(MapValue),
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MapValue {
    #[serde(default)]
    pub fields: Fields,
}

impl FieldValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::StringValue(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            FieldValue::TimestampValue(ts) => Some(*ts),
            _ => None,
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::StringValue(s.to_owned())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::StringValue(s)
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(ts: DateTime<Utc>) -> Self {
        FieldValue::TimestampValue(ts)
    }
}

/// Firestore encodes 64-bit integers as decimal strings.
mod integer_string {
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &i64, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<i64, D::Error> {
        let raw = String::deserialize(d)?;
        raw.parse().map_err(D::Error::custom)
    }
}

fn string_field(fields: &Fields, key: &str) -> Option<String> {
    fields.get(key).and_then(FieldValue::as_str).map(str::to_owned)
}

// ---------------------------------------------------------------------------
// stores/<id>
// ---------------------------------------------------------------------------

/// `stores/<id>` → `{name, address, installationFrequency,
/// continuityFeasibility, timestamp}`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreDocument {
    pub name: String,
    pub address: String,
    pub installation_frequency: Option<InstallationFrequency>,
    pub continuity_feasibility: Option<ContinuityFeasibility>,
    pub timestamp: Option<DateTime<Utc>>,
}

impl StoreDocument {
    pub fn from_survey(response: &SurveyResponse) -> Self {
        StoreDocument {
            name: response.store_name.clone(),
            address: response.location.clone(),
            installation_frequency: Some(response.installation_frequency),
            continuity_feasibility: Some(response.continuity_feasibility),
            timestamp: Some(response.timestamp),
        }
    }

    pub fn to_fields(&self) -> Fields {
        let mut fields = store_info_fields(&StoreInfo {
            name: self.name.clone(),
            address: self.address.clone(),
        });
        if let Some(freq) = self.installation_frequency {
            fields.insert("installationFrequency".into(), freq.label().into());
        }
        if let Some(cont) = self.continuity_feasibility {
            fields.insert("continuityFeasibility".into(), cont.label().into());
        }
        if let Some(ts) = self.timestamp {
            fields.insert("timestamp".into(), ts.into());
        }
        fields
    }

    /// Lenient: documents edited by hand may lack any field. Missing names and
    /// addresses read as empty strings; unknown answers read as `None`.
    pub fn from_fields(fields: &Fields) -> Self {
        StoreDocument {
            name: string_field(fields, "name").unwrap_or_default(),
            address: string_field(fields, "address").unwrap_or_default(),
            installation_frequency: string_field(fields, "installationFrequency")
                .and_then(|s| s.parse().ok()),
            continuity_feasibility: string_field(fields, "continuityFeasibility")
                .and_then(|s| s.parse().ok()),
            timestamp: fields.get("timestamp").and_then(FieldValue::as_timestamp),
        }
    }

    pub fn info(&self) -> StoreInfo {
        StoreInfo {
            name: self.name.clone(),
            address: self.address.clone(),
        }
    }
}

/// The `{name, address}` subset pushed by reconciliation.
pub fn store_info_fields(info: &StoreInfo) -> Fields {
    let mut fields = Fields::new();
    fields.insert("name".into(), info.name.as_str().into());
    fields.insert("address".into(), info.address.as_str().into());
    fields
}

// ---------------------------------------------------------------------------
// restock-reports/<id>
// ---------------------------------------------------------------------------

/// `restock-reports/<id>` → `{storeId, reportedAt}`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportDocument {
    pub store_id: StoreId,
    pub reported_at: DateTime<Utc>,
}

impl ReportDocument {
    pub fn to_fields(&self) -> Fields {
        let mut fields = Fields::new();
        fields.insert("storeId".into(), self.store_id.as_str().into());
        fields.insert("reportedAt".into(), self.reported_at.into());
        fields
    }

    /// The store id comes from the `storeId` field, falling back to the
    /// document id. `reportedAt` is mandatory.
    pub fn from_fields(path: &DocPath, fields: &Fields) -> Result<Self, DocError> {
        let reported_at = fields
            .get("reportedAt")
            .and_then(FieldValue::as_timestamp)
            .ok_or_else(|| DocError::Decode {
                path: path.to_string(),
                reason: "missing timestamp field 'reportedAt'".to_string(),
            })?;
        let store_id = string_field(fields, "storeId")
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| path.id().to_owned());
        Ok(ReportDocument {
            store_id: StoreId(store_id),
            reported_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use restock_core::paths::report_path;
    use serde_json::json;

    #[test]
    fn field_values_use_firestore_wire_shape() {
        let ts = Utc.with_ymd_and_hms(2024, 10, 19, 14, 59, 0).unwrap();
        let mut fields = Fields::new();
        fields.insert("name".into(), "Book Cafe".into());
        fields.insert("reportedAt".into(), ts.into());
        fields.insert("count".into(), FieldValue::IntegerValue(3));
        fields.insert("gone".into(), FieldValue::NullValue(()));

        let value = serde_json::to_value(&fields).unwrap();
        assert_eq!(value["name"], json!({"stringValue": "Book Cafe"}));
        assert_eq!(value["count"], json!({"integerValue": "3"}));
        assert_eq!(value["gone"], json!({"nullValue": null}));
        let ts_raw = value["reportedAt"]["timestampValue"].as_str().unwrap();
        assert!(ts_raw.starts_with("2024-10-19T14:59:00"), "{ts_raw}");
    }

    #[test]
    fn decodes_service_payload() {
        let raw = json!({
            "storeId": {"stringValue": "11007"},
            "reportedAt": {"timestampValue": "2024-10-19T14:59:00.123456Z"}
        });
        let fields: Fields = serde_json::from_value(raw).unwrap();
        let path = report_path(&StoreId::from("11007")).unwrap();
        let doc = ReportDocument::from_fields(&path, &fields).unwrap();
        assert_eq!(doc.store_id, StoreId::from("11007"));
        assert_eq!(doc.reported_at.timestamp(), 1_729_349_940);
    }

    #[test]
    fn report_without_timestamp_is_a_decode_error() {
        let path = report_path(&StoreId::from("11007")).unwrap();
        let err = ReportDocument::from_fields(&path, &Fields::new()).unwrap_err();
        assert!(matches!(err, DocError::Decode { .. }));
    }

    #[test]
    fn report_store_id_falls_back_to_document_id() {
        let path = report_path(&StoreId::from("21003")).unwrap();
        let mut fields = Fields::new();
        fields.insert("reportedAt".into(), Utc::now().into());
        let doc = ReportDocument::from_fields(&path, &fields).unwrap();
        assert_eq!(doc.store_id, StoreId::from("21003"));
    }

    #[test]
    fn store_document_reads_partial_fields() {
        let mut fields = Fields::new();
        fields.insert("name".into(), "Corner Shop".into());
        fields.insert("installationFrequency".into(), "複数回".into());
        let doc = StoreDocument::from_fields(&fields);
        assert_eq!(doc.name, "Corner Shop");
        assert_eq!(doc.address, "");
        assert_eq!(doc.installation_frequency, Some(InstallationFrequency::Multiple));
        assert_eq!(doc.continuity_feasibility, None);
    }
}
