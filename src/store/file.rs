//! Entity store persisted as a single JSON document.

use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use tempfile::NamedTempFile;

use super::{commit_tables, read_tables, ChangeSet, EntityStore, Tables};
use crate::error::FieldpackError;
use crate::model::{Job, JobId, Photo, Window, WindowId};

/// Default file name of the store document inside the data directory.
pub const STORE_FILE: &str = "store.json";

/// Entity store backed by a JSON file.
///
/// The whole table set is held in memory and rewritten on every commit.
/// The document is written to a temporary file next to the target and
/// renamed over it, so a failed or interrupted commit leaves the previous
/// document intact.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    tables: RwLock<Tables>,
}

impl FileStore {
    /// Opens the store at `path`, starting empty when the file does not exist.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, FieldpackError> {
        let path = path.into();
        let tables = match fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
                FieldpackError::storage(format!("corrupt store {}: {e}", path.display()))
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Tables::default(),
            Err(e) => return Err(e.into()),
        };
        tracing::debug!(path = %path.display(), "opened entity store");
        Ok(Self {
            path,
            tables: RwLock::new(tables),
        })
    }

    /// Opens `store.json` inside `data_dir`, creating the directory if needed.
    pub fn open_in(data_dir: &Path) -> Result<Self, FieldpackError> {
        fs::create_dir_all(data_dir)?;
        Self::open(data_dir.join(STORE_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn persist(path: &Path, tables: &Tables) -> Result<(), FieldpackError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let failure = |e: std::io::Error| {
        FieldpackError::storage(format!("failed to write {}: {e}", path.display()))
    };

    let temp = NamedTempFile::new_in(dir).map_err(failure)?;
    {
        let mut writer = BufWriter::new(temp.as_file());
        serde_json::to_writer_pretty(&mut writer, tables).map_err(|e| {
            FieldpackError::storage(format!("failed to encode {}: {e}", path.display()))
        })?;
        writer.flush().map_err(failure)?;
    }
    temp.persist(path).map_err(|e| failure(e.error))?;
    Ok(())
}

impl EntityStore for FileStore {
    fn jobs(&self) -> Result<Vec<Job>, FieldpackError> {
        read_tables(&self.tables, Tables::jobs)
    }

    fn job(&self, job_id: &JobId) -> Result<Option<Job>, FieldpackError> {
        read_tables(&self.tables, |t| t.job(job_id))
    }

    fn windows(&self, job_id: &JobId) -> Result<Vec<Window>, FieldpackError> {
        read_tables(&self.tables, |t| t.windows(job_id))
    }

    fn window(&self, window_id: &WindowId) -> Result<Option<Window>, FieldpackError> {
        read_tables(&self.tables, |t| t.window(window_id))
    }

    fn photos(&self, window_id: &WindowId) -> Result<Vec<Photo>, FieldpackError> {
        read_tables(&self.tables, |t| t.photos(window_id))
    }

    fn commit(&self, changes: ChangeSet) -> Result<(), FieldpackError> {
        commit_tables(&self.tables, &changes, |next| persist(&self.path, next))
    }
}
