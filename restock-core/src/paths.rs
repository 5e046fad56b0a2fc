//! Typed document-store paths.
//!
//! Writers and readers both go through [`store_path`] / [`report_path`] so the
//! `<collection>/<id>` format is defined in exactly one place. Both refuse ids
//! that do not pass [`StoreId::validate`], so no caller can address a document
//! outside the two collections.

use std::fmt;

use crate::error::IdentifierError;
use crate::types::StoreId;

/// Document collections mirrored from the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Stores,
    RestockReports,
}

impl Collection {
    pub fn name(self) -> &'static str {
        match self {
            Collection::Stores => "stores",
            Collection::RestockReports => "restock-reports",
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        match name {
            "stores" => Some(Collection::Stores),
            "restock-reports" => Some(Collection::RestockReports),
            _ => None,
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// `<collection>/<document id>`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocPath {
    collection: Collection,
    id: String,
}

impl DocPath {
    pub fn collection(&self) -> Collection {
        self.collection
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Parse `stores/11007`, or the tail of a fully-qualified resource name
    /// such as `projects/p/databases/(default)/documents/stores/11007`.
    pub fn parse(raw: &str) -> Option<Self> {
        let mut parts = raw.trim_end_matches('/').rsplitn(3, '/');
        let id = parts.next()?;
        let collection = Collection::from_name(parts.next()?)?;
        if id.is_empty() || id == "." || id == ".." {
            return None;
        }
        Some(DocPath {
            collection,
            id: id.to_owned(),
        })
    }
}

impl fmt::Display for DocPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.collection.name(), self.id)
    }
}

/// `stores/<id>`
pub fn store_path(id: &StoreId) -> Result<DocPath, IdentifierError> {
    doc_path(Collection::Stores, id)
}

/// `restock-reports/<id>`: one live report document per store.
pub fn report_path(id: &StoreId) -> Result<DocPath, IdentifierError> {
    doc_path(Collection::RestockReports, id)
}

fn doc_path(collection: Collection, id: &StoreId) -> Result<DocPath, IdentifierError> {
    id.validate()?;
    Ok(DocPath {
        collection,
        id: id.0.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builders_format_collection_and_id() {
        let id = StoreId::from("11007");
        assert_eq!(store_path(&id).unwrap().to_string(), "stores/11007");
        assert_eq!(report_path(&id).unwrap().to_string(), "restock-reports/11007");
    }

    #[test]
    fn builders_refuse_ids_that_escape_the_collection() {
        for raw in ["../stores/11007", "a/b", "..", "", "11007/x"] {
            let id = StoreId::from(raw);
            assert!(store_path(&id).is_err(), "{raw:?}");
            assert!(report_path(&id).is_err(), "{raw:?}");
        }
    }

    #[test]
    fn parse_accepts_full_resource_names() {
        let p = DocPath::parse("projects/demo/databases/(default)/documents/restock-reports/21003")
            .expect("parse");
        assert_eq!(p.collection(), Collection::RestockReports);
        assert_eq!(p.id(), "21003");
        assert_eq!(p, report_path(&StoreId::from("21003")).unwrap());
    }

    #[test]
    fn parse_rejects_unknown_collections() {
        assert!(DocPath::parse("users/1").is_none());
        assert!(DocPath::parse("stores/").is_none());
        assert!(DocPath::parse("11007").is_none());
        assert!(DocPath::parse("stores/..").is_none());
    }
}
