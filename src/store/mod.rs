//! Entity storage for jobs, windows and photos.
//!
//! Records live in three tables keyed by ID; windows point at their job and
//! photos at their window. Writes are collected in a [`ChangeSet`] and
//! applied by [`EntityStore::commit`] as one unit: either every change in
//! the set becomes visible or none does, and readers never observe a
//! half-applied set.

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use std::collections::{BTreeMap, BTreeSet};
use std::sync::RwLock;

use serde::{Deserialize, Serialize};

use crate::error::FieldpackError;
use crate::model::{Job, JobId, Photo, PhotoId, Window, WindowId};

/// A single pending write.
#[derive(Clone, Debug)]
pub enum Change {
    UpsertJob(Job),
    UpsertWindow(Window),
    AddPhoto(Photo),
    /// Deletes a job together with its windows and their photos.
    DeleteJob(JobId),
    /// Deletes a window together with its photos.
    DeleteWindow(WindowId),
}

/// An ordered batch of writes committed atomically.
#[derive(Clone, Debug, Default)]
pub struct ChangeSet {
    changes: Vec<Change>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert_job(&mut self, job: Job) -> &mut Self {
        self.changes.push(Change::UpsertJob(job));
        self
    }

    pub fn upsert_window(&mut self, window: Window) -> &mut Self {
        self.changes.push(Change::UpsertWindow(window));
        self
    }

    pub fn add_photo(&mut self, photo: Photo) -> &mut Self {
        self.changes.push(Change::AddPhoto(photo));
        self
    }

    pub fn delete_job(&mut self, job_id: JobId) -> &mut Self {
        self.changes.push(Change::DeleteJob(job_id));
        self
    }

    pub fn delete_window(&mut self, window_id: WindowId) -> &mut Self {
        self.changes.push(Change::DeleteWindow(window_id));
        self
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Change> {
        self.changes.iter()
    }
}

/// Storage for domain records.
///
/// Implementations serialize commits (single writer) and may serve reads
/// concurrently.
pub trait EntityStore: Send + Sync {
    /// All jobs, ordered by job ID.
    fn jobs(&self) -> Result<Vec<Job>, FieldpackError>;

    fn job(&self, job_id: &JobId) -> Result<Option<Job>, FieldpackError>;

    /// Windows of a job, ordered by creation time then window ID.
    fn windows(&self, job_id: &JobId) -> Result<Vec<Window>, FieldpackError>;

    fn window(&self, window_id: &WindowId) -> Result<Option<Window>, FieldpackError>;

    /// Photos of a window, ordered by creation time.
    fn photos(&self, window_id: &WindowId) -> Result<Vec<Photo>, FieldpackError>;

    /// Applies every change in `changes`, or none of them.
    fn commit(&self, changes: ChangeSet) -> Result<(), FieldpackError>;
}

/// The three record tables.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub(crate) struct Tables {
    #[serde(default)]
    jobs: BTreeMap<JobId, Job>,
    #[serde(default)]
    windows: BTreeMap<WindowId, Window>,
    #[serde(default)]
    photos: BTreeMap<PhotoId, Photo>,
}

impl Tables {
    fn apply(&mut self, changes: &ChangeSet) -> Result<(), FieldpackError> {
        for change in changes.iter() {
            match change {
                Change::UpsertJob(job) => {
                    if job.job_id.is_blank() {
                        return Err(FieldpackError::storage("job ID must not be empty"));
                    }
                    self.jobs.insert(job.job_id.clone(), job.clone());
                }
                Change::UpsertWindow(window) => {
                    if !self.jobs.contains_key(&window.job_id) {
                        return Err(FieldpackError::storage(format!(
                            "window {} references missing job {}",
                            window.window_id, window.job_id
                        )));
                    }
                    self.windows.insert(window.window_id.clone(), window.clone());
                }
                Change::AddPhoto(photo) => {
                    if !self.windows.contains_key(&photo.window_id) {
                        return Err(FieldpackError::storage(format!(
                            "photo {} references missing window {}",
                            photo.photo_id, photo.window_id
                        )));
                    }
                    self.photos.insert(photo.photo_id.clone(), photo.clone());
                }
                Change::DeleteJob(job_id) => {
                    if self.jobs.remove(job_id).is_none() {
                        return Err(FieldpackError::JobNotFound {
                            job_id: job_id.to_string(),
                        });
                    }
                    let owned: BTreeSet<WindowId> = self
                        .windows
                        .values()
                        .filter(|w| &w.job_id == job_id)
                        .map(|w| w.window_id.clone())
                        .collect();
                    self.windows.retain(|id, _| !owned.contains(id));
                    self.photos.retain(|_, p| !owned.contains(&p.window_id));
                }
                Change::DeleteWindow(window_id) => {
                    if self.windows.remove(window_id).is_none() {
                        return Err(FieldpackError::WindowNotFound {
                            window_id: window_id.to_string(),
                        });
                    }
                    self.photos.retain(|_, p| &p.window_id != window_id);
                }
            }
        }
        Ok(())
    }

    fn jobs(&self) -> Vec<Job> {
        self.jobs.values().cloned().collect()
    }

    fn job(&self, job_id: &JobId) -> Option<Job> {
        self.jobs.get(job_id).cloned()
    }

    fn windows(&self, job_id: &JobId) -> Vec<Window> {
        let mut windows: Vec<Window> = self
            .windows
            .values()
            .filter(|w| &w.job_id == job_id)
            .cloned()
            .collect();
        windows.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.window_id.cmp(&b.window_id))
        });
        windows
    }

    fn window(&self, window_id: &WindowId) -> Option<Window> {
        self.windows.get(window_id).cloned()
    }

    fn photos(&self, window_id: &WindowId) -> Vec<Photo> {
        let mut photos: Vec<Photo> = self
            .photos
            .values()
            .filter(|p| &p.window_id == window_id)
            .cloned()
            .collect();
        photos.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.photo_id.cmp(&b.photo_id))
        });
        photos
    }
}

fn poisoned() -> FieldpackError {
    FieldpackError::storage("store lock poisoned by a panicked writer")
}

fn read_tables<T>(
    lock: &RwLock<Tables>,
    f: impl FnOnce(&Tables) -> T,
) -> Result<T, FieldpackError> {
    let tables = lock.read().map_err(|_| poisoned())?;
    Ok(f(&tables))
}

/// Applies `changes` to a copy of the tables, runs `persist` on the result
/// and swaps it in only when both succeed. Holding the write lock for the
/// whole sequence makes commits single-writer.
fn commit_tables(
    lock: &RwLock<Tables>,
    changes: &ChangeSet,
    persist: impl FnOnce(&Tables) -> Result<(), FieldpackError>,
) -> Result<(), FieldpackError> {
    let mut tables = lock.write().map_err(|_| poisoned())?;
    let mut next = tables.clone();
    next.apply(changes)?;
    persist(&next)?;
    *tables = next;
    Ok(())
}
