//! In-memory entity store.

use std::sync::{Arc, RwLock};

use super::{commit_tables, read_tables, ChangeSet, EntityStore, Tables};
use crate::error::FieldpackError;
use crate::model::{Job, JobId, Photo, Window, WindowId};

/// Entity store held entirely in memory. Clones share the same tables.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl EntityStore for MemoryStore {
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
        commit_tables(&self.tables, &changes, |_| Ok(()))
    }
}
