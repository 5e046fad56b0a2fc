//! # restock-docstore
//!
//! The document database mirroring the registry for the public page.
//!
//! [`DocumentStore`] is the seam every workflow depends on. Two
//! implementations ship here: [`MemoryDocumentStore`] (tests, dry runs) and
//! [`FirestoreClient`] (Firestore REST API with service-account auth).

pub mod auth;
pub mod error;
pub mod fields;
pub mod firestore;
pub mod memory;
pub mod store;

pub use error::DocError;
pub use fields::{FieldValue, Fields, ReportDocument, StoreDocument};
pub use firestore::FirestoreClient;
pub use memory::MemoryDocumentStore;
pub use store::{store_exists, DocumentStore};
