//! The tabular registry: a single YAML workbook holding the Store, Survey,
//! Report and Log sheets.
//!
//! # Storage layout
//!
//! ```text
//! ~/.restock/
//!   registry.yaml   (workbook: mode 0600, created by `init`)
//!   config.yaml     (see [`crate::config`])
//! ```
//!
//! # API pattern
//!
//! Every filesystem function has two forms:
//! - `fn_at(home: &Path, …)`: explicit home; used in tests with `TempDir`
//! - `fn(…)`: derives home from `dirs::home_dir()`, delegates to `_at`
//!
//! Tests must NEVER call the no-arg wrappers; always use `_at`.
//!
//! Workflows never touch the file directly: they go through
//! [`StoreRepository`] (store records) and [`RegistrySheets`] (the other
//! sheets), implemented in memory by [`Workbook`] and persistently by
//! [`FileRegistry`].

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::RegistryError;
use crate::types::{LogEntry, ReportRow, StoreId, StoreRecord, StoreRow, SurveyRow};

/// Current workbook schema version.
pub const WORKBOOK_VERSION: u32 = 1;

// ---------------------------------------------------------------------------
// 1. Repository traits
// ---------------------------------------------------------------------------

/// Store records, keyed by identifier.
///
/// Only valid rows (identifier and name both filled) are visible as records.
pub trait StoreRepository {
    /// Valid rows with a unique identifier. Rows sharing an identifier are
    /// left out; see [`StoreRepository::duplicate_ids`].
    fn list(&self) -> Result<Vec<StoreRecord>, RegistryError>;

    /// Identifiers held by more than one valid row, in first-seen order.
    fn duplicate_ids(&self) -> Result<Vec<StoreId>, RegistryError>;

    fn get(&self, id: &StoreId) -> Result<Option<StoreRecord>, RegistryError>;

    /// Update the row holding `record.store_id`; otherwise fill the first row
    /// whose identifier cell is empty; otherwise append.
    fn upsert(&mut self, record: StoreRecord) -> Result<(), RegistryError>;

    /// Remove the row holding `id`. Returns `false` if there was none.
    fn delete(&mut self, id: &StoreId) -> Result<bool, RegistryError>;
}

/// The sheets around the Store sheet.
pub trait RegistrySheets: StoreRepository {
    fn survey_rows(&self) -> Result<Vec<SurveyRow>, RegistryError>;

    fn append_survey_row(&mut self, row: SurveyRow) -> Result<(), RegistryError>;

    fn append_report_rows(&mut self, rows: &[ReportRow]) -> Result<(), RegistryError>;

    /// Clear the Report sheet and write `rows` in its place.
    fn replace_report_rows(&mut self, rows: Vec<ReportRow>) -> Result<(), RegistryError>;

    fn append_log(&mut self, entry: LogEntry) -> Result<(), RegistryError>;
}

// ---------------------------------------------------------------------------
// 2. Workbook (in-memory sheets)
// ---------------------------------------------------------------------------

/// All four sheets. Row order is significant: it is the order staff see.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workbook {
    pub version: u32,
    #[serde(default)]
    pub stores: Vec<StoreRow>,
    #[serde(default)]
    pub survey: Vec<SurveyRow>,
    #[serde(default)]
    pub reports: Vec<ReportRow>,
    #[serde(default)]
    pub logs: Vec<LogEntry>,
}

impl Default for Workbook {
    fn default() -> Self {
        Workbook {
            version: WORKBOOK_VERSION,
            stores: vec![],
            survey: vec![],
            reports: vec![],
            logs: vec![],
        }
    }
}

impl Workbook {
    fn row_index(&self, id: &StoreId) -> Option<usize> {
        self.stores.iter().position(|row| row.id() == Some(id))
    }

    /// Set or clear the sync flag on the row holding `id`.
    pub fn set_flag(&mut self, id: &StoreId, flag: bool) -> bool {
        match self.row_index(id) {
            Some(i) => {
                self.stores[i].sync_flag = flag;
                true
            }
            None => false,
        }
    }
}

impl StoreRepository for Workbook {
    fn list(&self) -> Result<Vec<StoreRecord>, RegistryError> {
        let duplicates: HashSet<StoreId> = self.duplicate_ids()?.into_iter().collect();
        Ok(self
            .stores
            .iter()
            .filter_map(StoreRow::to_record)
            .filter(|record| !duplicates.contains(&record.store_id))
            .collect())
    }

    fn duplicate_ids(&self) -> Result<Vec<StoreId>, RegistryError> {
        let mut seen = HashSet::new();
        let mut duplicates = Vec::new();
        for record in self.stores.iter().filter_map(StoreRow::to_record) {
            if !seen.insert(record.store_id.clone()) && !duplicates.contains(&record.store_id) {
                duplicates.push(record.store_id);
            }
        }
        Ok(duplicates)
    }

    fn get(&self, id: &StoreId) -> Result<Option<StoreRecord>, RegistryError> {
        Ok(self.list()?.into_iter().find(|r| &r.store_id == id))
    }

    fn upsert(&mut self, record: StoreRecord) -> Result<(), RegistryError> {
        let row = StoreRow::from(&record);
        if let Some(i) = self.row_index(&record.store_id) {
            self.stores[i] = row;
        } else if let Some(i) = self.stores.iter().position(|r| r.id().is_none()) {
            self.stores[i] = row;
        } else {
            self.stores.push(row);
        }
        Ok(())
    }

    fn delete(&mut self, id: &StoreId) -> Result<bool, RegistryError> {
        match self.row_index(id) {
            Some(i) => {
                self.stores.remove(i);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

impl RegistrySheets for Workbook {
    fn survey_rows(&self) -> Result<Vec<SurveyRow>, RegistryError> {
        Ok(self.survey.clone())
    }

    fn append_survey_row(&mut self, row: SurveyRow) -> Result<(), RegistryError> {
        self.survey.push(row);
        Ok(())
    }

    fn append_report_rows(&mut self, rows: &[ReportRow]) -> Result<(), RegistryError> {
        self.reports.extend_from_slice(rows);
        Ok(())
    }

    fn replace_report_rows(&mut self, rows: Vec<ReportRow>) -> Result<(), RegistryError> {
        self.reports = rows;
        Ok(())
    }

    fn append_log(&mut self, entry: LogEntry) -> Result<(), RegistryError> {
        self.logs.push(entry);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// 3. Path helpers
// ---------------------------------------------------------------------------

/// `<home>/.restock/`
pub fn restock_root(home: &Path) -> PathBuf {
    home.join(".restock")
}

/// `<home>/.restock/registry.yaml`: pure, no I/O.
pub fn registry_path_at(home: &Path) -> PathBuf {
    restock_root(home).join("registry.yaml")
}

/// Create `<home>/.restock/` (mode `0700`) if it does not yet exist.
pub fn ensure_root_at(home: &Path) -> Result<PathBuf, RegistryError> {
    let dir = restock_root(home);
    if !dir.exists() {
        std::fs::create_dir_all(&dir)?;
        set_dir_permissions(&dir)?;
    }
    Ok(dir)
}

// ---------------------------------------------------------------------------
// 4. Load / save (atomic)
// ---------------------------------------------------------------------------

/// Load the workbook from `<home>/.restock/registry.yaml`.
///
/// Returns `RegistryError::RegistryNotFound` if absent,
/// `RegistryError::Parse` (with path + line context) if malformed YAML.
pub fn load_at(home: &Path) -> Result<Workbook, RegistryError> {
    let path = registry_path_at(home);
    if !path.exists() {
        return Err(RegistryError::RegistryNotFound { path });
    }
    let contents = std::fs::read_to_string(&path)?;
    serde_yaml::from_str(&contents).map_err(|e| RegistryError::Parse { path, source: e })
}

/// `load_at` convenience wrapper.
pub fn load() -> Result<Workbook, RegistryError> {
    load_at(&home()?)
}

/// Atomically save the workbook.
///
/// Write flow: serialize → `registry.yaml.tmp` sibling → `chmod 0600` → `rename`.
pub fn save_at(home: &Path, workbook: &Workbook) -> Result<(), RegistryError> {
    ensure_root_at(home)?;
    let path = registry_path_at(home);
    let tmp_path = path.with_file_name("registry.yaml.tmp");

    let yaml = serde_yaml::to_string(workbook)?;
    std::fs::write(&tmp_path, yaml)?;
    set_file_permissions(&tmp_path)?;
    std::fs::rename(&tmp_path, &path)?;
    Ok(())
}

/// `save_at` convenience wrapper.
pub fn save(workbook: &Workbook) -> Result<(), RegistryError> {
    save_at(&home()?, workbook)
}

/// Create an empty workbook. Idempotent: an existing workbook is loaded and
/// returned unchanged.
pub fn init_at(home: &Path) -> Result<Workbook, RegistryError> {
    if registry_path_at(home).exists() {
        return load_at(home);
    }
    let workbook = Workbook::default();
    save_at(home, &workbook)?;
    Ok(workbook)
}

/// `init_at` convenience wrapper.
pub fn init() -> Result<Workbook, RegistryError> {
    init_at(&home()?)
}

// ---------------------------------------------------------------------------
// 5. FileRegistry
// ---------------------------------------------------------------------------

/// A workbook bound to its file; every mutation is saved before returning.
#[derive(Debug)]
pub struct FileRegistry {
    home: PathBuf,
    book: Workbook,
}

impl FileRegistry {
    /// Open the workbook under `home`. Fails if `init` was never run.
    pub fn open_at(home: &Path) -> Result<Self, RegistryError> {
        let book = load_at(home)?;
        Ok(FileRegistry {
            home: home.to_path_buf(),
            book,
        })
    }

    /// `open_at` convenience wrapper.
    pub fn open() -> Result<Self, RegistryError> {
        Self::open_at(&home()?)
    }

    pub fn workbook(&self) -> &Workbook {
        &self.book
    }

    /// Apply `f` to the workbook and persist the result.
    pub fn edit<T>(&mut self, f: impl FnOnce(&mut Workbook) -> T) -> Result<T, RegistryError> {
        let out = f(&mut self.book);
        save_at(&self.home, &self.book)?;
        Ok(out)
    }
}

impl StoreRepository for FileRegistry {
    fn list(&self) -> Result<Vec<StoreRecord>, RegistryError> {
        self.book.list()
    }

    fn duplicate_ids(&self) -> Result<Vec<StoreId>, RegistryError> {
        self.book.duplicate_ids()
    }

    fn get(&self, id: &StoreId) -> Result<Option<StoreRecord>, RegistryError> {
        self.book.get(id)
    }

    fn upsert(&mut self, record: StoreRecord) -> Result<(), RegistryError> {
        self.book.upsert(record)?;
        save_at(&self.home, &self.book)
    }

    fn delete(&mut self, id: &StoreId) -> Result<bool, RegistryError> {
        let removed = self.book.delete(id)?;
        if removed {
            save_at(&self.home, &self.book)?;
        }
        Ok(removed)
    }
}

impl RegistrySheets for FileRegistry {
    fn survey_rows(&self) -> Result<Vec<SurveyRow>, RegistryError> {
        self.book.survey_rows()
    }

    fn append_survey_row(&mut self, row: SurveyRow) -> Result<(), RegistryError> {
        self.book.append_survey_row(row)?;
        save_at(&self.home, &self.book)
    }

    fn append_report_rows(&mut self, rows: &[ReportRow]) -> Result<(), RegistryError> {
        self.book.append_report_rows(rows)?;
        save_at(&self.home, &self.book)
    }

    fn replace_report_rows(&mut self, rows: Vec<ReportRow>) -> Result<(), RegistryError> {
        self.book.replace_report_rows(rows)?;
        save_at(&self.home, &self.book)
    }

    fn append_log(&mut self, entry: LogEntry) -> Result<(), RegistryError> {
        self.book.append_log(entry)?;
        save_at(&self.home, &self.book)
    }
}

// ---------------------------------------------------------------------------
// Private helpers
// ---------------------------------------------------------------------------

pub(crate) fn home() -> Result<PathBuf, RegistryError> {
    dirs::home_dir().ok_or(RegistryError::HomeNotFound)
}

#[cfg(unix)]
fn set_dir_permissions(path: &Path) -> Result<(), RegistryError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o700))?;
    Ok(())
}
#[cfg(not(unix))]
fn set_dir_permissions(_path: &Path) -> Result<(), RegistryError> {
    Ok(())
}

#[cfg(unix)]
fn set_file_permissions(path: &Path) -> Result<(), RegistryError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
    Ok(())
}
#[cfg(not(unix))]
fn set_file_permissions(_path: &Path) -> Result<(), RegistryError> {
    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
