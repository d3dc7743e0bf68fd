//! Field results manifest (`results.json`) writer and reader.
//!
//! # Results Manifest Format Reference
//!
//! ```json
//! {
//!   "version": "1.0",
//!   "job": {"jobId": "E1", "clientName": "Smith", "address": {...}, "status": "Completed", ...},
//!   "intake": {"sourceName": "county", "sourceUrl": "https://...", "fetchedAt": "2025-09-26T14:00:10Z"},
//!   "field": {
//!     "inspector": "R. Diaz",
//!     "date": "2025-10-01T15:30:00Z",
//!     "overheadFile": "overhead_with_dots.jpg",
//!     "windows": [{"windowId": "...", "windowNumber": "1", "xPosition": 120.0, ...}]
//!   }
//! }
//! ```
//!
//! `intake` and `field` are the blocks every consumer reads. `version` and
//! `job` let the desktop side match results back to the job it dispatched.
//! All timestamps are written in canonical RFC 3339 form.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{decode_json, read_manifest_bytes, timestamp};
use crate::error::FieldpackError;
use crate::model::{
    Address, Environment, JobId, JobStatus, PhotoCounts, TestResult, Window, WindowId, WindowType,
};

/// File name of the results manifest inside an export package.
pub const RESULTS_MANIFEST_FILE: &str = "results.json";

/// Version written into new results manifests.
pub const RESULTS_VERSION: &str = "1.0";

/// A field results package manifest.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldResultsPackage {
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job: Option<ResultsJob>,
    pub intake: IntakeProvenance,
    pub field: FieldData,
}

fn default_version() -> String {
    RESULTS_VERSION.to_string()
}

/// Job identity and site conditions.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultsJob {
    pub job_id: JobId,
    pub client_name: String,
    pub address: Address,
    pub status: JobStatus,
    #[serde(default)]
    pub notes: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale_pixels_per_foot: Option<f64>,
    #[serde(default, skip_serializing_if = "Environment::is_empty")]
    pub environment: Environment,
}

/// Provenance of the overhead image, copied from intake.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntakeProvenance {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    #[serde(
        default,
        with = "timestamp::optional",
        skip_serializing_if = "Option::is_none"
    )]
    pub fetched_at: Option<DateTime<Utc>>,
}

/// What the inspector recorded on site.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldData {
    pub inspector: String,
    #[serde(with = "timestamp::required")]
    pub date: DateTime<Utc>,
    /// Annotated overhead image inside the package, `null` when none was
    /// produced.
    pub overhead_file: Option<String>,
    pub windows: Vec<WindowExportEntry>,
}

/// One window with its photo counts.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowExportEntry {
    pub window_id: WindowId,
    pub window_number: String,
    pub x_position: f64,
    pub y_position: f64,
    pub window_type: Option<WindowType>,
    pub condition: String,
    pub test_result: TestResult,
    pub leak_points: u8,
    pub is_accessible: bool,
    pub notes: String,
    pub width: f64,
    pub height: f64,
    pub exterior_photo_count: usize,
    pub interior_photo_count: usize,
    pub leak_photo_count: usize,
    #[serde(with = "timestamp::required")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "timestamp::required")]
    pub updated_at: DateTime<Utc>,
}

impl WindowExportEntry {
    /// Snapshots a window. Positions are copied as stored, in original
    /// image pixels.
    pub fn from_window(window: &Window, photos: PhotoCounts) -> Self {
        Self {
            window_id: window.window_id.clone(),
            window_number: window.window_number.clone(),
            x_position: window.x_position,
            y_position: window.y_position,
            window_type: window.window_type,
            condition: window.condition.clone(),
            test_result: window.test_result,
            leak_points: window.leak_points,
            is_accessible: window.is_accessible,
            notes: window.notes.clone(),
            width: window.width,
            height: window.height,
            exterior_photo_count: photos.exterior,
            interior_photo_count: photos.interior,
            leak_photo_count: photos.leak,
            created_at: window.created_at,
            updated_at: window.updated_at,
        }
    }
}

/// Reads a results manifest from a file.
pub fn read_results_manifest(path: &Path) -> Result<FieldResultsPackage, FieldpackError> {
    let bytes = read_manifest_bytes(path)?;
    decode_json(&bytes, path)
}

/// Writes a results manifest to a file.
pub fn write_results_manifest(
    path: &Path,
    package: &FieldResultsPackage,
) -> Result<(), FieldpackError> {
    let file = File::create(path).map_err(FieldpackError::Io)?;
    let mut writer = BufWriter::new(file);

    serde_json::to_writer_pretty(&mut writer, package).map_err(|source| {
        FieldpackError::ManifestWrite {
            path: path.to_path_buf(),
            source,
        }
    })?;
    writer.flush().map_err(FieldpackError::Io)
}

/// Reads a results manifest from raw bytes.
pub fn from_results_slice(bytes: &[u8]) -> Result<FieldResultsPackage, FieldpackError> {
    decode_json(bytes, Path::new("<bytes>"))
}

/// Writes a results manifest to a pretty-printed JSON string.
pub fn to_results_string(package: &FieldResultsPackage) -> Result<String, FieldpackError> {
    serde_json::to_string_pretty(package).map_err(|source| FieldpackError::ManifestWrite {
        path: Path::new("<string>").to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Coord;

    fn sample_package() -> FieldResultsPackage {
        let mut window = Window::new("E1", "1", Coord::new(120.0, 80.0));
        window.test_result = TestResult::Fail;
        window.window_type = Some(WindowType::Casement);
        window.set_leak_points(2);

        FieldResultsPackage {
            version: RESULTS_VERSION.into(),
            job: None,
            intake: IntakeProvenance {
                source_name: Some("county".into()),
                source_url: None,
                fetched_at: timestamp::from_epoch_seconds(1758895210.0),
            },
            field: FieldData {
                inspector: "R. Diaz".into(),
                date: timestamp::parse_timestamp_str("2025-10-01T15:30:00Z").unwrap(),
                overhead_file: None,
                windows: vec![WindowExportEntry::from_window(
                    &window,
                    PhotoCounts {
                        exterior: 1,
                        interior: 0,
                        leak: 2,
                    },
                )],
            },
        }
    }

    #[test]
    fn test_results_field_names() {
        let json = to_results_string(&sample_package()).expect("serialize");

        assert!(json.contains("\"intake\""));
        assert!(json.contains("\"sourceName\": \"county\""));
        assert!(json.contains("\"fetchedAt\": \"2025-09-26T14:00:10Z\""));
        assert!(json.contains("\"inspector\": \"R. Diaz\""));
        assert!(json.contains("\"date\": \"2025-10-01T15:30:00Z\""));
        assert!(json.contains("\"overheadFile\": null"));
        assert!(json.contains("\"xPosition\": 120.0"));
        assert!(json.contains("\"testResult\": \"Fail\""));
        assert!(json.contains("\"windowType\": \"Casement\""));
        assert!(json.contains("\"leakPhotoCount\": 2"));
        assert!(!json.contains("\"job\""));
    }

    #[test]
    fn test_window_timestamps_are_canonical() {
        let json = to_results_string(&sample_package()).expect("serialize");
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        let created = value["field"]["windows"][0]["createdAt"].as_str().unwrap();
        assert!(created.ends_with('Z'));
        assert_eq!(created.len(), "2025-10-01T15:30:00Z".len());
    }

    #[test]
    fn test_reader_accepts_minimal_manifest() {
        let json = br#"{
            "intake": {},
            "field": {"inspector": "A", "date": 1758895210, "overheadFile": null, "windows": []}
        }"#;
        let package = from_results_slice(json).expect("parse");
        assert_eq!(package.version, RESULTS_VERSION);
        assert!(package.job.is_none());
        assert!(package.field.windows.is_empty());
    }
}
