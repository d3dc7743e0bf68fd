//! Job intake manifest (`jobs.json`) reader and writer.
//!
//! # Intake Manifest Format Reference
//!
//! ```json
//! {
//!   "version": "1.0",
//!   "createdAt": "2025-09-26T14:00:10Z",
//!   "preparedBy": "dispatch-desk",
//!   "jobs": [{
//!     "jobId": "E1",
//!     "clientName": "Smith",
//!     "address": {"line1": "1 Main St", "city": "Largo", "state": "FL", "zip": "33770"},
//!     "notes": "gate code 1234",
//!     "overhead": {
//!       "imageFile": "overhead/E1.jpg",
//!       "source": {"name": "county-gis", "url": "https://...", "fetchedAt": 1758895210},
//!       "scalePixelsPerFoot": 10.0
//!     }
//!   }]
//! }
//! ```
//!
//! `createdAt` and `fetchedAt` may be strings or epoch seconds. `version` may
//! be a string or a number. Older producers write `zoomScale` instead of
//! `scalePixelsPerFoot`; see [`OverheadEntry::effective_scale`].

use std::collections::HashSet;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use super::{decode_json, read_manifest_bytes, timestamp};
use crate::error::FieldpackError;
use crate::model::{Address, JobId};

/// File name of the intake manifest inside a package.
pub const INTAKE_MANIFEST_FILE: &str = "jobs.json";

/// Multiplier applied to legacy `zoomScale` values.
///
/// This is a placeholder heuristic carried for old packages, not a
/// unit-verified conversion.
pub const LEGACY_ZOOM_TO_SCALE: f64 = 10.0;

/// A job intake package manifest.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobIntakePackage {
    #[serde(deserialize_with = "string_or_number")]
    pub version: String,
    #[serde(with = "timestamp::required")]
    pub created_at: DateTime<Utc>,
    pub prepared_by: String,
    pub jobs: Vec<JobIntakeEntry>,
}

/// One job in an intake manifest.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobIntakeEntry {
    pub job_id: JobId,
    pub client_name: String,
    pub address: Address,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overhead: Option<OverheadEntry>,
}

/// Overhead image reference for an intake job.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverheadEntry {
    /// Image path relative to the package root.
    pub image_file: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<OverheadSource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale_pixels_per_foot: Option<f64>,
    /// Legacy scale field from older producers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zoom_scale: Option<f64>,
}

impl OverheadEntry {
    /// The calibration factor to store on the job.
    ///
    /// `scalePixelsPerFoot` wins when present; otherwise a legacy
    /// `zoomScale` is converted with [`LEGACY_ZOOM_TO_SCALE`].
    pub fn effective_scale(&self) -> Option<f64> {
        self.scale_pixels_per_foot
            .or_else(|| self.zoom_scale.map(|zoom| zoom * LEGACY_ZOOM_TO_SCALE))
    }
}

/// Where an overhead image was obtained.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverheadSource {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(
        default,
        with = "timestamp::optional",
        skip_serializing_if = "Option::is_none"
    )]
    pub fetched_at: Option<DateTime<Utc>>,
}

fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Version {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match Version::deserialize(deserializer)? {
        Version::Text(text) => text,
        Version::Number(number) => number.to_string(),
    })
}

/// Reads an intake manifest from a file.
///
/// A file that does not exist is reported as
/// [`FieldpackError::MissingManifest`], anything unparseable as
/// [`FieldpackError::MalformedManifest`].
pub fn read_intake_manifest(path: &Path) -> Result<JobIntakePackage, FieldpackError> {
    let bytes = read_manifest_bytes(path)?;
    decode_intake(&bytes, path)
}

/// Writes an intake manifest to a file.
pub fn write_intake_manifest(
    path: &Path,
    package: &JobIntakePackage,
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

/// Reads an intake manifest from a JSON string.
pub fn from_intake_str(json: &str) -> Result<JobIntakePackage, FieldpackError> {
    from_intake_slice(json.as_bytes())
}

/// Reads an intake manifest from raw bytes.
///
/// Useful for fuzzing and for packages read straight out of an archive.
pub fn from_intake_slice(bytes: &[u8]) -> Result<JobIntakePackage, FieldpackError> {
    decode_intake(bytes, Path::new("<bytes>"))
}

/// Writes an intake manifest to a pretty-printed JSON string.
pub fn to_intake_string(package: &JobIntakePackage) -> Result<String, FieldpackError> {
    serde_json::to_string_pretty(package).map_err(|source| FieldpackError::ManifestWrite {
        path: Path::new("<string>").to_path_buf(),
        source,
    })
}

fn decode_intake(bytes: &[u8], path: &Path) -> Result<JobIntakePackage, FieldpackError> {
    let package: JobIntakePackage = decode_json(bytes, path)?;
    check_job_ids(&package, path)?;
    Ok(package)
}

/// Job IDs must be non-empty and unique within a package.
fn check_job_ids(package: &JobIntakePackage, path: &Path) -> Result<(), FieldpackError> {
    let mut seen = HashSet::new();
    for (index, entry) in package.jobs.iter().enumerate() {
        if entry.job_id.is_blank() {
            return Err(FieldpackError::malformed(
                path,
                format!("jobs[{index}] has an empty jobId"),
            ));
        }
        if !seen.insert(entry.job_id.as_str()) {
            return Err(FieldpackError::malformed(
                path,
                format!("jobs[{index}] repeats jobId '{}'", entry.job_id),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manifest_with_fetched_at(fetched_at: &str) -> String {
        format!(
            r#"{{
                "version": "1.0",
                "createdAt": "2025-09-26T13:00:00Z",
                "preparedBy": "dispatch",
                "jobs": [{{
                    "jobId": "E1",
                    "clientName": "Smith",
                    "address": {{"line1": "1 Main St", "city": "Largo", "state": "FL", "zip": "33770"}},
                    "overhead": {{
                        "imageFile": "overhead/E1.jpg",
                        "source": {{"name": "county", "url": "https://gis.example", "fetchedAt": {fetched_at}}}
                    }}
                }}]
            }}"#
        )
    }

    fn fetched_at(package: &JobIntakePackage) -> Option<DateTime<Utc>> {
        package.jobs[0]
            .overhead
            .as_ref()
            .and_then(|o| o.source.as_ref())
            .and_then(|s| s.fetched_at)
    }

    #[test]
    fn test_timestamp_string_and_number_are_equal() {
        let text = from_intake_str(&manifest_with_fetched_at("\"2025-09-26T14:00:10Z\""))
            .expect("parse string form");
        let numeric =
            from_intake_str(&manifest_with_fetched_at("1758895210")).expect("parse numeric form");

        assert!(fetched_at(&text).is_some());
        assert_eq!(fetched_at(&text), fetched_at(&numeric));
    }

    #[test]
    fn test_numeric_created_at_and_version() {
        let json = r#"{
            "version": 2,
            "createdAt": 1758895210,
            "preparedBy": "dispatch",
            "jobs": []
        }"#;
        let package = from_intake_str(json).expect("parse");
        assert_eq!(package.version, "2");
        assert_eq!(
            timestamp::format_timestamp(&package.created_at),
            "2025-09-26T14:00:10Z"
        );
    }

    #[test]
    fn test_optional_blocks_may_be_absent() {
        let json = r#"{
            "version": "1.0",
            "createdAt": "2025-09-26T14:00:10Z",
            "preparedBy": "dispatch",
            "jobs": [{
                "jobId": "E2",
                "clientName": "Jones",
                "address": {"line1": "2 Oak Ave", "city": "Tampa", "state": "FL", "zip": "33602"}
            }]
        }"#;
        let package = from_intake_str(json).expect("parse");
        assert!(package.jobs[0].overhead.is_none());
        assert!(package.jobs[0].notes.is_none());
    }

    #[test]
    fn test_legacy_zoom_scale_conversion() {
        let entry = OverheadEntry {
            image_file: "a.jpg".into(),
            source: None,
            scale_pixels_per_foot: None,
            zoom_scale: Some(1.5),
        };
        assert_eq!(entry.effective_scale(), Some(15.0));

        let explicit = OverheadEntry {
            scale_pixels_per_foot: Some(8.0),
            ..entry.clone()
        };
        assert_eq!(explicit.effective_scale(), Some(8.0));

        let neither = OverheadEntry {
            zoom_scale: None,
            ..entry
        };
        assert_eq!(neither.effective_scale(), None);
    }

    #[test]
    fn test_missing_required_field_is_malformed() {
        let json = r#"{
            "version": "1.0",
            "createdAt": "2025-09-26T14:00:10Z",
            "preparedBy": "dispatch",
            "jobs": [{"jobId": "E1", "address": {"line1": "x", "city": "y", "state": "z", "zip": "0"}}]
        }"#;
        let err = from_intake_str(json).unwrap_err();
        match err {
            FieldpackError::MalformedManifest { message, .. } => {
                assert!(message.contains("clientName"), "message: {message}")
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_invalid_json_is_malformed() {
        assert!(matches!(
            from_intake_str("{not json"),
            Err(FieldpackError::MalformedManifest { .. })
        ));
    }

    #[test]
    fn test_blank_and_duplicate_job_ids_rejected() {
        let job = |id: &str| {
            format!(
                r#"{{"jobId": "{id}", "clientName": "c", "address": {{"line1": "l", "city": "c", "state": "s", "zip": "z"}}}}"#
            )
        };
        let wrap = |jobs: String| {
            format!(
                r#"{{"version": "1", "createdAt": 0, "preparedBy": "p", "jobs": [{jobs}]}}"#
            )
        };

        let blank = wrap(job(" "));
        assert!(matches!(
            from_intake_str(&blank),
            Err(FieldpackError::MalformedManifest { .. })
        ));

        let dup = wrap(format!("{},{}", job("E1"), job("E1")));
        assert!(matches!(
            from_intake_str(&dup),
            Err(FieldpackError::MalformedManifest { .. })
        ));
    }

    #[test]
    fn test_missing_file_is_missing_manifest() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let err = read_intake_manifest(&temp.path().join(INTAKE_MANIFEST_FILE)).unwrap_err();
        assert!(matches!(err, FieldpackError::MissingManifest { .. }));
    }

    #[test]
    fn test_output_uses_canonical_timestamps() {
        let package = from_intake_str(&manifest_with_fetched_at("1758895210")).expect("parse");
        let json = to_intake_string(&package).expect("serialize");
        assert!(json.contains("\"fetchedAt\": \"2025-09-26T14:00:10Z\""));
        assert!(json.contains("\"createdAt\": \"2025-09-26T13:00:00Z\""));

        let temp = tempfile::tempdir().expect("create temp dir");
        let path = temp.path().join(INTAKE_MANIFEST_FILE);
        write_intake_manifest(&path, &package).expect("write");
        assert_eq!(read_intake_manifest(&path).expect("read back"), package);
    }
}
