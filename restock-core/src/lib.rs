//! restock core library: domain types, store identifiers, registry
//! persistence, configuration, errors.
//!
//! - [`types`]: newtypes, survey answers, store rows and records
//! - [`identifier`]: composite store identifier generation
//! - [`paths`]: typed document paths (`stores/<id>`, `restock-reports/<id>`)
//! - [`registry`]: the tabular registry (workbook) and its repository traits
//! - [`config`]: `~/.restock/config.yaml`
//! - [`error`]: error enums for all of the above

pub mod config;
pub mod error;
pub mod identifier;
pub mod paths;
pub mod registry;
pub mod types;

pub use config::Config;
pub use error::{ConfigError, IdentifierError, RegistryError, ValidationError};
pub use identifier::{generate_identifier, IdentifierSequence};
pub use paths::{report_path, store_path, Collection, DocPath};
pub use registry::{FileRegistry, RegistrySheets, StoreRepository, Workbook};
pub use types::{
    ContinuityFeasibility, InstallationFrequency, LogEntry, ReportRow, RestockReport, StoreId,
    StoreInfo, StoreRecord, StoreRow, SurveyResponse, SurveyRow,
};
