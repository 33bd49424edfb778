//! Plan persistence and plan file import/export.
//!
//! The stored state is two key/value entries under a version-tagged key: the
//! plan (`<key>.json`) and the manual status map (`<key>_status.json`).
//! Loading never fails; a missing or unreadable entry falls back to its
//! default on its own.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::error::{ImportError, StorageError, StorageResult};
use crate::plan::{ManualStatusMap, Plan, Year};

pub const EXPORT_FILE_NAME: &str = "plan_de_estudios.json";
pub const DEFAULT_STORAGE_KEY: &str = "curriculum_v5";
const DATA_DIR_NAME: &str = "correlativas";
const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// A plan file ready to hand to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

pub trait PlanRepository {
    /// Stored plan, or five empty years.
    fn load(&self) -> Plan;

    /// Best effort; failures are logged, never returned.
    fn save(&mut self, plan: &Plan);

    fn export_document(&self, plan: &Plan) -> StorageResult<ExportedFile> {
        export_document(plan)
    }

    fn import_document(&self, bytes: &[u8]) -> Result<Plan, ImportError> {
        import_document(bytes)
    }
}

/// Pretty-printed `{ "years": [...], "statusMap": {...} }`.
pub fn export_document(plan: &Plan) -> StorageResult<ExportedFile> {
    Ok(ExportedFile {
        file_name: EXPORT_FILE_NAME.to_string(),
        bytes: serde_json::to_vec_pretty(plan)?,
    })
}

pub fn import_document(bytes: &[u8]) -> Result<Plan, ImportError> {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    let value: serde_json::Value = serde_json::from_slice(bytes)?;
    if !value.get("years").is_some_and(serde_json::Value::is_array) {
        return Err(ImportError::MissingYears);
    }
    let plan: Plan = serde_json::from_value(value)?;
    info!(
        years = plan.years.len(),
        subjects = plan.subject_count(),
        "imported plan document"
    );
    Ok(plan)
}

#[derive(Serialize)]
struct PlanEntryRef<'a> {
    years: &'a [Year],
}

#[derive(Deserialize)]
struct PlanEntry {
    years: Vec<Year>,
}

/// Entries stored as JSON files in one directory.
#[derive(Debug, Clone)]
pub struct FileRepository {
    dir: PathBuf,
    key: String,
}

impl FileRepository {
    pub fn new(dir: impl Into<PathBuf>, key: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            key: key.into(),
        }
    }

    /// Repository in the platform data directory.
    pub fn in_data_dir(key: impl Into<String>) -> Option<Self> {
        dirs::data_dir().map(|base| Self::new(base.join(DATA_DIR_NAME), key))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn plan_path(&self) -> PathBuf {
        self.dir.join(format!("{}.json", self.key))
    }

    pub fn status_path(&self) -> PathBuf {
        self.dir.join(format!("{}_status.json", self.key))
    }

    /// Writes `plan_de_estudios.json` into `dir` and returns its path.
    pub fn export_to(&self, dir: &Path, plan: &Plan) -> StorageResult<PathBuf> {
        let file = self.export_document(plan)?;
        let path = dir.join(&file.file_name);
        write_atomic(&path, &file.bytes)?;
        info!(path = %path.display(), "exported plan");
        Ok(path)
    }

    pub fn import_from(&self, path: &Path) -> Result<Plan, ImportError> {
        let bytes = fs::read(path)?;
        self.import_document(&bytes)
    }

    fn try_save(&self, plan: &Plan) -> StorageResult<()> {
        let entry = serde_json::to_vec(&PlanEntryRef { years: &plan.years })?;
        write_atomic(&self.plan_path(), &entry)?;
        let status = serde_json::to_vec(&plan.status_map)?;
        write_atomic(&self.status_path(), &status)?;
        Ok(())
    }
}

impl PlanRepository for FileRepository {
    fn load(&self) -> Plan {
        let mut plan = Plan::new();
        match read_entry::<PlanEntry>(&self.plan_path()) {
            Ok(Some(entry)) => plan.years = entry.years,
            Ok(None) => debug!(path = %self.plan_path().display(), "no stored plan"),
            Err(err) => warn!(error = %err, "stored plan unreadable, starting empty"),
        }
        match read_entry::<ManualStatusMap>(&self.status_path()) {
            Ok(Some(map)) => plan.status_map = map,
            Ok(None) => {}
            Err(err) => warn!(error = %err, "stored status map unreadable, starting empty"),
        }
        plan
    }

    fn save(&mut self, plan: &Plan) {
        if let Err(err) = self.try_save(plan) {
            warn!(error = %err, dir = %self.dir.display(), "could not save plan");
        }
    }
}

fn read_entry<T: DeserializeOwned>(path: &Path) -> StorageResult<Option<T>> {
    let contents = match fs::read(path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(err.into()),
    };
    Ok(Some(serde_json::from_slice(&contents)?))
}

/// Writes through a temporary file in the destination directory. The
/// temporary file is removed if anything fails before the final rename.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> StorageResult<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent)?;
    let mut tmp = NamedTempFile::new_in(parent)?;
    tmp.write_all(bytes)?;
    tmp.flush()?;
    tmp.persist(path).map_err(|err| StorageError::Io(err.error))?;
    Ok(())
}

/// In-process repository.
#[derive(Debug, Clone, Default)]
pub struct MemoryRepository {
    stored: Option<Plan>,
    saves: usize,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_plan(plan: Plan) -> Self {
        Self {
            stored: Some(plan),
            saves: 0,
        }
    }

    pub fn stored(&self) -> Option<&Plan> {
        self.stored.as_ref()
    }

    pub fn save_count(&self) -> usize {
        self.saves
    }
}

impl PlanRepository for MemoryRepository {
    fn load(&self) -> Plan {
        self.stored.clone().unwrap_or_default()
    }

    fn save(&mut self, plan: &Plan) {
        self.stored = Some(plan.clone());
        self.saves += 1;
    }
}
