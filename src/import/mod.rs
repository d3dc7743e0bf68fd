//! Job import pipeline.
//!
//! Turns an intake package (a folder or a `.zip` archive) into stored jobs:
//!
//! 1. acquire a readable root, extracting archives into a scratch directory
//!    that is removed on every exit path;
//! 2. locate `jobs.json` (see [`locate_manifest`]);
//! 3. decode the manifest;
//! 4. materialize one [`Job`] per entry, staging overhead images;
//! 5. commit every job in one [`ChangeSet`], then promote the staged images.
//!
//! A failure before the commit leaves the store and the image root as they
//! were. Missing overhead images are warnings, not failures.

mod progress;
mod report;

pub use progress::{ImportStage, ProgressUpdate};
pub use report::{ImportReport, ImportWarning};

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::{debug, info};

use progress::{materialization_fraction, ProgressTracker, ACQUIRED, LOCATED, MATERIALIZED, PARSED};

use crate::error::FieldpackError;
use crate::images::{ImageStore, StagedImages};
use crate::manifest::{read_intake_manifest, JobIntakeEntry};
use crate::model::{Job, JobStatus};
use crate::package::{extract_archive, is_archive, locate_manifest, resolve_relative};
use crate::store::{ChangeSet, EntityStore};

/// Where an intake package comes from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PackageSource {
    /// A ZIP archive, extracted to a scratch directory before import.
    Archive(PathBuf),
    /// An already unpacked folder, read in place.
    Folder(PathBuf),
}

impl PackageSource {
    /// Classifies `path` as a folder or an archive.
    pub fn detect(path: &Path) -> Result<Self, FieldpackError> {
        let metadata = fs::metadata(path).map_err(|source| FieldpackError::AccessDenied {
            path: path.to_path_buf(),
            source,
        })?;
        if metadata.is_dir() {
            Ok(PackageSource::Folder(path.to_path_buf()))
        } else if is_archive(path) {
            Ok(PackageSource::Archive(path.to_path_buf()))
        } else {
            Err(FieldpackError::InvalidInput(format!(
                "{} is neither a package folder nor a .zip archive",
                path.display()
            )))
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            PackageSource::Archive(path) | PackageSource::Folder(path) => path,
        }
    }
}

/// Imports intake packages into an entity store and an image root.
pub struct JobImportPipeline<'a, S: EntityStore + ?Sized> {
    store: &'a S,
    images: &'a ImageStore,
}

impl<'a, S: EntityStore + ?Sized> JobImportPipeline<'a, S> {
    pub fn new(store: &'a S, images: &'a ImageStore) -> Self {
        Self { store, images }
    }

    /// Imports `source` without progress reporting.
    pub fn run(&self, source: &PackageSource) -> Result<ImportReport, FieldpackError> {
        self.run_with_progress(source, |_| {})
    }

    /// Imports `source`, reporting each stage to `observer`.
    ///
    /// The reported fraction never decreases during a run. On failure the
    /// observer sees `Failed` at the fraction reached, followed by `Idle` at
    /// zero.
    pub fn run_with_progress(
        &self,
        source: &PackageSource,
        observer: impl FnMut(ProgressUpdate),
    ) -> Result<ImportReport, FieldpackError> {
        let mut tracker = ProgressTracker::new(observer);
        match self.execute(source, &mut tracker) {
            Ok(report) => {
                tracker.report(ImportStage::Complete, 1.0);
                info!(
                    jobs = report.jobs.len(),
                    warnings = report.warnings.len(),
                    "import complete"
                );
                Ok(report)
            }
            Err(e) => {
                tracing::error!(source = %source.path().display(), error = %e, "import failed");
                tracker.fail();
                Err(e)
            }
        }
    }

    fn execute<F: FnMut(ProgressUpdate)>(
        &self,
        source: &PackageSource,
        tracker: &mut ProgressTracker<F>,
    ) -> Result<ImportReport, FieldpackError> {
        tracker.report(ImportStage::AcquiringRoot, 0.0);
        let acquired = acquire_root(source)?;

        tracker.report(ImportStage::LocatingManifest, ACQUIRED);
        let located = locate_manifest(&acquired.path)?;

        tracker.report(ImportStage::ParsingManifest, LOCATED);
        let manifest = read_intake_manifest(&located.manifest_path)?;
        info!(
            jobs = manifest.jobs.len(),
            version = %manifest.version,
            "intake manifest decoded"
        );

        tracker.report(ImportStage::MaterializingEntities, PARSED);
        let mut report = ImportReport {
            version: manifest.version.clone(),
            prepared_by: manifest.prepared_by.clone(),
            ..ImportReport::default()
        };
        let mut staged = self.images.begin_staging()?;
        let mut changes = ChangeSet::new();
        let mut jobs = Vec::with_capacity(manifest.jobs.len());
        let mut stale_images = Vec::new();
        let total = manifest.jobs.len();

        for (index, entry) in manifest.jobs.iter().enumerate() {
            let existing = self.store.job(&entry.job_id)?;
            let job = self.materialize(
                entry,
                existing.as_ref(),
                &located.root,
                &mut staged,
                &mut report,
            )?;
            // A replaced job whose image is gone or renamed leaves its old
            // file behind unless it is removed after the commit.
            if let Some(old) = existing.and_then(|e| e.overhead.image_path) {
                if job.overhead.image_path.as_deref() != Some(old.as_str()) {
                    stale_images.push(old);
                }
            }
            report.jobs.push(job.job_id.clone());
            changes.upsert_job(job.clone());
            jobs.push(job);
            tracker.report(
                ImportStage::MaterializingEntities,
                materialization_fraction(index + 1, total),
            );
        }

        tracker.report(ImportStage::MaterializingEntities, MATERIALIZED);
        self.store.commit(changes)?;
        debug!(jobs = total, "import batch committed");

        for old in stale_images {
            if let Err(e) = self.images.remove(&old) {
                report.warn(None, format!("replaced overhead image '{old}' not removed: {e}"));
            }
        }

        let promotion = staged.promote();
        report.images = promotion.promoted.len();
        if !promotion.failed.is_empty() {
            self.detach_unpromoted(&jobs, &promotion.failed, &mut report);
        }
        Ok(report)
    }

    /// The batch is already committed when promotion fails, so jobs whose
    /// image never reached storage are updated to reference no image.
    fn detach_unpromoted(
        &self,
        jobs: &[Job],
        failed: &[(String, FieldpackError)],
        report: &mut ImportReport,
    ) {
        let mut changes = ChangeSet::new();
        for (file_name, error) in failed {
            for job in jobs
                .iter()
                .filter(|job| job.overhead.image_path.as_deref() == Some(file_name.as_str()))
            {
                report.warn(
                    Some(&job.job_id),
                    format!("overhead image could not be moved into storage: {error}"),
                );
                let mut job = job.clone();
                job.overhead.image_path = None;
                changes.upsert_job(job);
            }
        }
        if let Err(e) = self.store.commit(changes) {
            report.warn(None, format!("failed to clear unstored overhead images: {e}"));
        }
    }

    fn materialize(
        &self,
        entry: &JobIntakeEntry,
        existing: Option<&Job>,
        package_root: &Path,
        staged: &mut StagedImages<'_>,
        report: &mut ImportReport,
    ) -> Result<Job, FieldpackError> {
        let mut job = Job::new(
            entry.job_id.clone(),
            entry.client_name.clone(),
            entry.address.clone(),
        );
        job.notes = entry.notes.clone().unwrap_or_default();
        job.status = JobStatus::Ready;

        if let Some(existing) = existing {
            job.created_at = existing.created_at;
            report.replaced.push(entry.job_id.clone());
        }

        let Some(overhead) = &entry.overhead else {
            return Ok(job);
        };

        if let Some(source) = &overhead.source {
            job.overhead.source_name = source.name.clone();
            job.overhead.source_url = source.url.clone();
            job.overhead.fetched_at = source.fetched_at;
        }
        job.overhead.scale_pixels_per_foot = overhead.effective_scale();

        match resolve_relative(package_root, &overhead.image_file) {
            Some(image) if image.is_file() => {
                let file_name = staged.stage_overhead(&job.job_id, &image)?;
                debug!(job_id = %job.job_id, file = %file_name, "staged overhead image");
                job.overhead.image_path = Some(file_name);
            }
            Some(_) => report.warn(
                Some(&job.job_id),
                format!("overhead image '{}' not found in package", overhead.image_file),
            ),
            None => report.warn(
                Some(&job.job_id),
                format!(
                    "overhead image path '{}' points outside the package",
                    overhead.image_file
                ),
            ),
        }
        Ok(job)
    }
}

/// Imports the package at `path`, detecting whether it is a folder or an
/// archive.
pub fn import_package<S: EntityStore + ?Sized>(
    path: &Path,
    store: &S,
    images: &ImageStore,
) -> Result<ImportReport, FieldpackError> {
    let source = PackageSource::detect(path)?;
    JobImportPipeline::new(store, images).run(&source)
}

/// The directory an import reads from. Holds the scratch directory of an
/// extracted archive so it lives exactly as long as the import.
struct AcquiredRoot {
    path: PathBuf,
    _scratch: Option<TempDir>,
}

fn acquire_root(source: &PackageSource) -> Result<AcquiredRoot, FieldpackError> {
    match source {
        PackageSource::Archive(archive) => {
            let scratch = tempfile::Builder::new()
                .prefix("fieldpack-import-")
                .tempdir()
                .map_err(FieldpackError::Io)?;
            extract_archive(archive, scratch.path())?;
            debug!(archive = %archive.display(), scratch = %scratch.path().display(), "archive extracted");
            Ok(AcquiredRoot {
                path: scratch.path().to_path_buf(),
                _scratch: Some(scratch),
            })
        }
        PackageSource::Folder(folder) => {
            fs::read_dir(folder).map_err(|source| FieldpackError::AccessDenied {
                path: folder.clone(),
                source,
            })?;
            Ok(AcquiredRoot {
                path: folder.clone(),
                _scratch: None,
            })
        }
    }
}
