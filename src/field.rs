//! Field edit operations.
//!
//! Every operation reads what it needs from the store, edits the records
//! and writes them back in a single commit. Window placement takes viewport
//! taps and stores positions in original image space.

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::error::FieldpackError;
use crate::geometry::{mapper, Coord, Display, ImageSize, Original};
use crate::images::ImageStore;
use crate::model::{
    Job, JobId, JobStatus, Photo, PhotoType, TestResult, Window, WindowId, WindowType,
};
use crate::store::{ChangeSet, EntityStore};

/// How a tap becomes a window.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Placement {
    /// Label for the new window; defaults to one past the job's window count.
    pub number: Option<String>,
    /// Clamp taps that land in a letterbox or pillarbox band onto the image
    /// edge instead of storing them as-is.
    pub clamp: bool,
}

/// Descriptive window attributes. `None` leaves a field unchanged.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct WindowDetails {
    pub window_number: Option<String>,
    pub window_type: Option<WindowType>,
    pub condition: Option<String>,
    pub is_accessible: Option<bool>,
    pub notes: Option<String>,
}

/// Field operations over a store and its image root.
pub struct FieldSession<'a, S: EntityStore + ?Sized> {
    store: &'a S,
    images: &'a ImageStore,
}

impl<'a, S: EntityStore + ?Sized> FieldSession<'a, S> {
    pub fn new(store: &'a S, images: &'a ImageStore) -> Self {
        Self { store, images }
    }

    pub fn job(&self, job_id: &JobId) -> Result<Job, FieldpackError> {
        self.store
            .job(job_id)?
            .ok_or_else(|| FieldpackError::JobNotFound {
                job_id: job_id.to_string(),
            })
    }

    pub fn window(&self, window_id: &WindowId) -> Result<Window, FieldpackError> {
        self.store
            .window(window_id)?
            .ok_or_else(|| FieldpackError::WindowNotFound {
                window_id: window_id.to_string(),
            })
    }

    /// Adds a manually entered job. Fails if the ID is taken.
    pub fn create_job(&self, job: Job) -> Result<Job, FieldpackError> {
        if self.store.job(&job.job_id)?.is_some() {
            return Err(FieldpackError::InvalidInput(format!(
                "job {} already exists",
                job.job_id
            )));
        }
        let mut changes = ChangeSet::new();
        changes.upsert_job(job.clone());
        self.store.commit(changes)?;
        info!(job_id = %job.job_id, "job created");
        Ok(job)
    }

    /// Marks a job as being inspected by `inspector` on `date`.
    pub fn start_inspection(
        &self,
        job_id: &JobId,
        inspector: &str,
        date: DateTime<Utc>,
    ) -> Result<Job, FieldpackError> {
        let mut job = self.job(job_id)?;
        job.inspector_name = Some(inspector.to_string());
        job.inspection_date = Some(date);
        job.status = JobStatus::InProgress;
        self.save_job(job)
    }

    pub fn set_status(&self, job_id: &JobId, status: JobStatus) -> Result<Job, FieldpackError> {
        let mut job = self.job(job_id)?;
        job.status = status;
        self.save_job(job)
    }

    /// Places a new window where the user tapped.
    ///
    /// `tap` is in viewport coordinates for a viewport of size `viewport`
    /// showing the job's overhead image aspect-fit.
    pub fn place_window(
        &self,
        job_id: &JobId,
        tap: Coord<Display>,
        viewport: ImageSize,
        placement: Placement,
    ) -> Result<Window, FieldpackError> {
        let job = self.job(job_id)?;
        let position = self.tap_to_original(&job, tap, viewport, placement.clamp)?;

        let number = match placement.number {
            Some(number) => number,
            None => (self.store.windows(job_id)?.len() + 1).to_string(),
        };
        let window = Window::new(job.job_id.clone(), number, position);

        let mut changes = ChangeSet::new();
        changes.upsert_window(window.clone());
        self.store.commit(changes)?;
        debug!(
            job_id = %job.job_id,
            window_id = %window.window_id,
            x = position.x,
            y = position.y,
            "window placed"
        );
        Ok(window)
    }

    /// Moves a window to where the user tapped.
    pub fn move_window(
        &self,
        window_id: &WindowId,
        tap: Coord<Display>,
        viewport: ImageSize,
        clamp: bool,
    ) -> Result<Window, FieldpackError> {
        let mut window = self.window(window_id)?;
        let job = self.job(&window.job_id)?;
        let position = self.tap_to_original(&job, tap, viewport, clamp)?;
        window.set_position(position);
        self.save_window(window)
    }

    /// Where a window's marker belongs in a viewport of size `viewport`.
    pub fn display_position(
        &self,
        window_id: &WindowId,
        viewport: ImageSize,
    ) -> Result<Coord<Display>, FieldpackError> {
        let window = self.window(window_id)?;
        let job = self.job(&window.job_id)?;
        let original = self.overhead_size(&job)?;
        Ok(mapper::to_display(window.position(), original, viewport.validated()?))
    }

    /// Records a measured width and height; 0 clears a measurement.
    pub fn record_measurement(
        &self,
        window_id: &WindowId,
        width: f64,
        height: f64,
    ) -> Result<Window, FieldpackError> {
        for (name, value) in [("width", width), ("height", height)] {
            if !value.is_finite() || value < 0.0 {
                return Err(FieldpackError::InvalidInput(format!(
                    "{name} must be a non-negative number, got {value}"
                )));
            }
        }
        let mut window = self.window(window_id)?;
        window.width = width;
        window.height = height;
        window.touch();
        self.save_window(window)
    }

    /// Records a test result and, optionally, a leak point count (clamped).
    pub fn record_test(
        &self,
        window_id: &WindowId,
        result: TestResult,
        leak_points: Option<u32>,
    ) -> Result<Window, FieldpackError> {
        let mut window = self.window(window_id)?;
        window.test_result = result;
        if let Some(count) = leak_points {
            window.set_leak_points(count);
        }
        window.touch();
        self.save_window(window)
    }

    pub fn update_details(
        &self,
        window_id: &WindowId,
        details: WindowDetails,
    ) -> Result<Window, FieldpackError> {
        let mut window = self.window(window_id)?;
        if let Some(number) = details.window_number {
            window.window_number = number;
        }
        if let Some(kind) = details.window_type {
            window.window_type = Some(kind);
        }
        if let Some(condition) = details.condition {
            window.condition = condition;
        }
        if let Some(accessible) = details.is_accessible {
            window.is_accessible = accessible;
        }
        if let Some(notes) = details.notes {
            window.notes = notes;
        }
        window.touch();
        self.save_window(window)
    }

    /// Attaches a photo reference to a window.
    pub fn add_photo(
        &self,
        window_id: &WindowId,
        photo_type: PhotoType,
        asset_ref: &str,
    ) -> Result<Photo, FieldpackError> {
        if asset_ref.trim().is_empty() {
            return Err(FieldpackError::InvalidInput(
                "photo asset reference must not be empty".into(),
            ));
        }
        let window = self.window(window_id)?;
        let photo = Photo::new(window.window_id, photo_type, asset_ref);
        let mut changes = ChangeSet::new();
        changes.add_photo(photo.clone());
        self.store.commit(changes)?;
        Ok(photo)
    }

    /// Deletes a job with its windows and photos, then its overhead image.
    pub fn delete_job(&self, job_id: &JobId) -> Result<(), FieldpackError> {
        let job = self.job(job_id)?;
        let mut changes = ChangeSet::new();
        changes.delete_job(job.job_id.clone());
        self.store.commit(changes)?;

        if let Some(image) = &job.overhead.image_path {
            if let Err(e) = self.images.remove(image) {
                warn!(job_id = %job.job_id, error = %e, "overhead image not removed");
            }
        }
        info!(job_id = %job.job_id, "job deleted");
        Ok(())
    }

    pub fn delete_window(&self, window_id: &WindowId) -> Result<(), FieldpackError> {
        let mut changes = ChangeSet::new();
        changes.delete_window(window_id.clone());
        self.store.commit(changes)
    }

    fn save_job(&self, mut job: Job) -> Result<Job, FieldpackError> {
        job.touch();
        let mut changes = ChangeSet::new();
        changes.upsert_job(job.clone());
        self.store.commit(changes)?;
        Ok(job)
    }

    fn save_window(&self, window: Window) -> Result<Window, FieldpackError> {
        let mut changes = ChangeSet::new();
        changes.upsert_window(window.clone());
        self.store.commit(changes)?;
        Ok(window)
    }

    fn overhead_size(&self, job: &Job) -> Result<ImageSize, FieldpackError> {
        let image = job.overhead.image_path.as_deref().ok_or_else(|| {
            FieldpackError::InvalidInput(format!("job {} has no overhead image", job.job_id))
        })?;
        let path = self.images.resolve(image);
        if !path.is_file() {
            return Err(FieldpackError::MissingAsset { path });
        }
        ImageSize::read_from_file(&path)
    }

    fn tap_to_original(
        &self,
        job: &Job,
        tap: Coord<Display>,
        viewport: ImageSize,
        clamp: bool,
    ) -> Result<Coord<Original>, FieldpackError> {
        if !tap.is_finite() {
            return Err(FieldpackError::InvalidInput(format!(
                "tap position ({}, {}) is not finite",
                tap.x, tap.y
            )));
        }
        let original = self.overhead_size(job)?;
        let position = mapper::to_original(tap, original, viewport.validated()?);
        Ok(if clamp {
            mapper::clamp_to_image(position, original)
        } else {
            position
        })
    }
}
