//! Field results export.
//!
//! Produces one results package per job: a directory named
//! `{jobId}_{city}_{YYYYMMDD}` holding
//!
//! | file | required |
//! |------|----------|
//! | `results.json` | yes |
//! | `windows.csv` | yes |
//! | `report.txt` | yes |
//! | `photos.txt` | yes |
//! | `overhead_with_dots.jpg` | only when the job has a usable overhead image |
//! | `photos/` | only when a photo library root is configured |
//!
//! archived as `{dir}.zip` in the output directory. Failing to write a
//! required file aborts the export; optional artifacts that fail are
//! recorded as warnings. The working directory is removed either way and
//! the archive only appears once it is complete.

mod font;
pub mod overlay;
pub mod report;
pub mod windows_csv;

pub use windows_csv::{
    from_windows_csv_slice, from_windows_csv_str, to_windows_csv_string, write_windows_csv,
    WindowRow, WINDOWS_CSV_FILE, WINDOWS_CSV_HEADER,
};
pub use overlay::{render_overlay, DEFAULT_MARKER_RADIUS, OVERLAY_FILE};
pub use report::{InspectionReport, PhotoManifest, WindowSnapshot, PHOTOS_FILE, REPORT_FILE};

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};

use crate::error::FieldpackError;
use crate::images::{sanitize_file_component, ImageStore};
use crate::manifest::results::RESULTS_VERSION;
use crate::manifest::{
    write_results_manifest, FieldData, FieldResultsPackage, IntakeProvenance, ResultsJob,
    WindowExportEntry, RESULTS_MANIFEST_FILE,
};
use crate::model::{Job, JobId, PhotoCounts};
use crate::package::{create_archive, resolve_relative};
use crate::store::EntityStore;

/// Directory inside the package that receives copied photo assets.
pub const PHOTOS_DIR: &str = "photos";

/// Export settings.
#[derive(Clone, Debug, PartialEq)]
pub struct ExportOptions {
    /// Where finished archives are written.
    pub output_dir: PathBuf,
    /// Marker radius in original image pixels.
    pub marker_radius: u32,
    /// Root that photo `assetRef`s resolve against. Photos are only listed,
    /// not copied, when unset.
    pub photo_root: Option<PathBuf>,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("exports"),
            marker_radius: DEFAULT_MARKER_RADIUS,
            photo_root: None,
        }
    }
}

/// The result of a successful export.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportOutcome {
    pub job_id: JobId,
    pub package_name: String,
    pub archive_path: PathBuf,
    /// Package entries written, in creation order.
    pub artifacts: Vec<String>,
    pub window_count: usize,
    pub warnings: Vec<String>,
}

impl ExportOutcome {
    fn warn(&mut self, message: String) {
        tracing::warn!(job_id = %self.job_id, "{message}");
        self.warnings.push(message);
    }

    pub fn has_artifact(&self, name: &str) -> bool {
        self.artifacts.iter().any(|a| a == name)
    }
}

impl fmt::Display for ExportOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Exported job {} ({} window(s)) to {}",
            self.job_id,
            self.window_count,
            self.archive_path.display()
        )?;
        for artifact in &self.artifacts {
            writeln!(f, "  {}/{artifact}", self.package_name)?;
        }
        if !self.warnings.is_empty() {
            writeln!(f)?;
            writeln!(f, "Warnings ({}):", self.warnings.len())?;
            for warning in &self.warnings {
                writeln!(f, "  - {warning}")?;
            }
        }
        Ok(())
    }
}

/// Builds results packages from stored jobs.
pub struct ExportPipeline<'a, S: EntityStore + ?Sized> {
    store: &'a S,
    images: &'a ImageStore,
    options: ExportOptions,
}

impl<'a, S: EntityStore + ?Sized> ExportPipeline<'a, S> {
    pub fn new(store: &'a S, images: &'a ImageStore, options: ExportOptions) -> Self {
        Self {
            store,
            images,
            options,
        }
    }

    pub fn options(&self) -> &ExportOptions {
        &self.options
    }

    /// Exports `job_id` and returns where the archive went.
    pub fn export(&self, job_id: &JobId) -> Result<ExportOutcome, FieldpackError> {
        let exported_at = Utc::now();
        let job = self
            .store
            .job(job_id)?
            .ok_or_else(|| FieldpackError::JobNotFound {
                job_id: job_id.to_string(),
            })?;
        let windows = self.snapshot(job_id)?;
        let package_name = package_dir_name(&job, exported_at);

        let output_dir = &self.options.output_dir;
        fs::create_dir_all(output_dir).map_err(FieldpackError::Io)?;
        let work = tempfile::Builder::new()
            .prefix(".fieldpack-export-")
            .tempdir_in(output_dir)
            .map_err(FieldpackError::Io)?;
        let package_dir = work.path().join(&package_name);
        fs::create_dir(&package_dir).map_err(FieldpackError::Io)?;

        let mut outcome = ExportOutcome {
            job_id: job.job_id.clone(),
            archive_path: output_dir.join(format!("{package_name}.zip")),
            package_name,
            artifacts: Vec::new(),
            window_count: windows.len(),
            warnings: Vec::new(),
        };

        let overhead_file = self.write_overlay(&job, &windows, &package_dir, &mut outcome);

        let results = build_results(&job, &windows, overhead_file.clone(), exported_at);
        write_results_manifest(&package_dir.join(RESULTS_MANIFEST_FILE), &results)?;
        outcome.artifacts.push(RESULTS_MANIFEST_FILE.to_string());

        let rows: Vec<WindowRow> = windows
            .iter()
            .map(|s| WindowRow::from_window(&s.window, s.counts))
            .collect();
        write_windows_csv(&package_dir.join(WINDOWS_CSV_FILE), &rows)?;
        outcome.artifacts.push(WINDOWS_CSV_FILE.to_string());

        if let Some(file) = overhead_file {
            outcome.artifacts.push(file);
        }

        let report = InspectionReport {
            job: &job,
            windows: &windows,
            exported_at,
        };
        fs::write(package_dir.join(REPORT_FILE), report.to_string()).map_err(FieldpackError::Io)?;
        outcome.artifacts.push(REPORT_FILE.to_string());

        fs::write(package_dir.join(PHOTOS_FILE), PhotoManifest(&windows).to_string())
            .map_err(FieldpackError::Io)?;
        outcome.artifacts.push(PHOTOS_FILE.to_string());

        if let Some(root) = &self.options.photo_root {
            let copied = copy_photos(root, &windows, &package_dir.join(PHOTOS_DIR), &mut outcome);
            if copied > 0 {
                outcome.artifacts.push(format!("{PHOTOS_DIR}/"));
            }
        }

        create_archive(&package_dir, &outcome.archive_path)?;
        info!(
            job_id = %outcome.job_id,
            archive = %outcome.archive_path.display(),
            windows = outcome.window_count,
            warnings = outcome.warnings.len(),
            "export complete"
        );
        Ok(outcome)
    }

    fn snapshot(&self, job_id: &JobId) -> Result<Vec<WindowSnapshot>, FieldpackError> {
        self.store
            .windows(job_id)?
            .into_iter()
            .map(|window| {
                let photos = self.store.photos(&window.window_id)?;
                let counts = PhotoCounts::tally(&photos);
                Ok(WindowSnapshot {
                    window,
                    photos,
                    counts,
                })
            })
            .collect()
    }

    /// Renders the annotated overhead image. Returns its package file name,
    /// or `None` when the job has no image or rendering failed.
    fn write_overlay(
        &self,
        job: &Job,
        windows: &[WindowSnapshot],
        package_dir: &Path,
        outcome: &mut ExportOutcome,
    ) -> Option<String> {
        let Some(image_path) = &job.overhead.image_path else {
            debug!(job_id = %job.job_id, "job has no overhead image; skipping overlay");
            return None;
        };
        let markers: Vec<_> = windows.iter().map(|s| s.window.clone()).collect();
        match render_overlay(
            &self.images.resolve(image_path),
            &package_dir.join(OVERLAY_FILE),
            &markers,
            self.options.marker_radius,
        ) {
            Ok(()) => Some(OVERLAY_FILE.to_string()),
            Err(e) => {
                outcome.warn(format!("annotated overhead image skipped: {e}"));
                None
            }
        }
    }
}

/// Package directory name: `{jobId}_{city}_{YYYYMMDD}`.
///
/// The date is the inspection date, or `fallback` when the job was never
/// inspected. Path-unsafe characters become `_`; an empty city is left out.
pub fn package_dir_name(job: &Job, fallback: DateTime<Utc>) -> String {
    let date = job.inspection_date.unwrap_or(fallback).format("%Y%m%d");
    let job_part = sanitize_file_component(job.job_id.as_str());
    if job.address.city.trim().is_empty() {
        format!("{job_part}_{date}")
    } else {
        format!(
            "{job_part}_{}_{date}",
            sanitize_file_component(&job.address.city)
        )
    }
}

/// Assembles the results manifest for a job.
pub fn build_results(
    job: &Job,
    windows: &[WindowSnapshot],
    overhead_file: Option<String>,
    exported_at: DateTime<Utc>,
) -> FieldResultsPackage {
    FieldResultsPackage {
        version: RESULTS_VERSION.to_string(),
        job: Some(ResultsJob {
            job_id: job.job_id.clone(),
            client_name: job.client_name.clone(),
            address: job.address.clone(),
            status: job.status,
            notes: job.notes.clone(),
            scale_pixels_per_foot: job.overhead.scale_pixels_per_foot,
            environment: job.environment.clone(),
        }),
        intake: IntakeProvenance {
            source_name: job.overhead.source_name.clone(),
            source_url: job.overhead.source_url.clone(),
            fetched_at: job.overhead.fetched_at,
        },
        field: FieldData {
            inspector: job.inspector_name.clone().unwrap_or_default(),
            date: job.inspection_date.unwrap_or(exported_at),
            overhead_file,
            windows: windows
                .iter()
                .map(|s| WindowExportEntry::from_window(&s.window, s.counts))
                .collect(),
        },
    }
}

/// Copies resolvable photo assets into `dest`. Returns how many were copied.
fn copy_photos(
    root: &Path,
    windows: &[WindowSnapshot],
    dest: &Path,
    outcome: &mut ExportOutcome,
) -> usize {
    let mut copied = 0;
    for snapshot in windows {
        for photo in &snapshot.photos {
            let Some(source) = resolve_relative(root, &photo.asset_ref) else {
                outcome.warn(format!(
                    "photo {} asset '{}' is outside the photo library",
                    photo.photo_id, photo.asset_ref
                ));
                continue;
            };
            if !source.is_file() {
                outcome.warn(format!(
                    "photo {} asset '{}' not found",
                    photo.photo_id, photo.asset_ref
                ));
                continue;
            }

            let extension = source
                .extension()
                .and_then(|e| e.to_str())
                .unwrap_or("jpg");
            let file_name = format!(
                "{}_{}_{}.{}",
                sanitize_file_component(&snapshot.window.window_number),
                photo.photo_type.as_str().to_ascii_lowercase(),
                photo.photo_id,
                extension
            );
            let result = fs::create_dir_all(dest)
                .and_then(|()| fs::copy(&source, dest.join(&file_name)));
            match result {
                Ok(_) => copied += 1,
                Err(e) => outcome.warn(format!("photo {} not copied: {e}", photo.photo_id)),
            }
        }
    }
    copied
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Address;
    use chrono::TimeZone;

    fn job(city: &str) -> Job {
        Job::new(
            "E1",
            "Smith",
            Address {
                city: city.into(),
                ..Address::default()
            },
        )
    }

    #[test]
    fn package_name_prefers_inspection_date() {
        let inspected = Utc.with_ymd_and_hms(2025, 10, 1, 15, 30, 0).unwrap();
        let fallback = Utc.with_ymd_and_hms(2026, 1, 2, 0, 0, 0).unwrap();

        let named = job("Largo").with_inspection("R. Diaz", inspected);
        assert_eq!(package_dir_name(&named, fallback), "E1_Largo_20251001");
        assert_eq!(package_dir_name(&job("Largo"), fallback), "E1_Largo_20260102");
    }

    #[test]
    fn package_name_sanitizes_and_skips_empty_city() {
        let fallback = Utc.with_ymd_and_hms(2025, 10, 1, 0, 0, 0).unwrap();
        assert_eq!(
            package_dir_name(&job("St Pete/Beach"), fallback),
            "E1_St_Pete_Beach_20251001"
        );
        assert_eq!(package_dir_name(&job("  "), fallback), "E1_20251001");
    }

    #[test]
    fn results_fall_back_to_export_time_and_empty_inspector() {
        let exported = Utc.with_ymd_and_hms(2025, 10, 1, 0, 0, 0).unwrap();
        let results = build_results(&job("Largo"), &[], None, exported);
        assert_eq!(results.field.date, exported);
        assert_eq!(results.field.inspector, "");
        assert!(results.field.overhead_file.is_none());
        assert_eq!(results.job.unwrap().job_id, JobId::from("E1"));
    }
}
