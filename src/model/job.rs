//! Jobs: physical inspection sites.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::ids::JobId;
use crate::error::FieldpackError;

/// Lifecycle status of a job.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobStatus {
    #[default]
    Ready,
    InProgress,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Ready => "Ready",
            JobStatus::InProgress => "InProgress",
            JobStatus::Completed => "Completed",
            JobStatus::Failed => "Failed",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = FieldpackError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace([' ', '_', '-'], "").as_str() {
            "ready" => Ok(JobStatus::Ready),
            "inprogress" => Ok(JobStatus::InProgress),
            "completed" => Ok(JobStatus::Completed),
            "failed" => Ok(JobStatus::Failed),
            _ => Err(FieldpackError::InvalidInput(format!(
                "unknown job status '{s}' (expected Ready, InProgress, Completed or Failed)"
            ))),
        }
    }
}

/// Street address of a job site.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Address {
    pub line1: String,
    pub city: String,
    pub state: String,
    pub zip: String,
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}, {} {}", self.line1, self.city, self.state, self.zip)
    }
}

/// Environmental conditions captured at the site. Every field is optional;
/// `None` means the value was never captured.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Environment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weather_condition: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub humidity: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wind_speed: Option<f64>,
    #[serde(
        default,
        with = "crate::manifest::timestamp::optional",
        skip_serializing_if = "Option::is_none"
    )]
    pub captured_at: Option<DateTime<Utc>>,
}

impl Environment {
    pub fn is_empty(&self) -> bool {
        self.temperature.is_none()
            && self.weather_condition.is_none()
            && self.humidity.is_none()
            && self.wind_speed.is_none()
    }
}

/// Overhead image metadata for a job.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverheadImage {
    /// Filename relative to the local image storage root.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fetched_at: Option<DateTime<Utc>>,
    /// Optional calibration factor for converting pixels to feet.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale_pixels_per_foot: Option<f64>,
}

/// A physical inspection site.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub job_id: JobId,
    pub client_name: String,
    pub address: Address,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub status: JobStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inspector_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inspection_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub environment: Environment,
    #[serde(default)]
    pub overhead: OverheadImage,
}

impl Job {
    /// Creates a new `Ready` job stamped with the current time.
    pub fn new(job_id: impl Into<JobId>, client_name: impl Into<String>, address: Address) -> Self {
        let now = Utc::now();
        Self {
            job_id: job_id.into(),
            client_name: client_name.into(),
            address,
            notes: String::new(),
            status: JobStatus::Ready,
            inspector_name: None,
            inspection_date: None,
            created_at: now,
            updated_at: now,
            environment: Environment::default(),
            overhead: OverheadImage::default(),
        }
    }

    /// Sets the inspector and inspection date.
    pub fn with_inspection(mut self, inspector: impl Into<String>, date: DateTime<Utc>) -> Self {
        self.inspector_name = Some(inspector.into());
        self.inspection_date = Some(date);
        self
    }

    /// Sets the overhead image filename.
    pub fn with_overhead_image(mut self, image_path: impl Into<String>) -> Self {
        self.overhead.image_path = Some(image_path.into());
        self
    }

    /// Bumps `updated_at` to now.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn address() -> Address {
        Address {
            line1: "1 Main St".into(),
            city: "Largo".into(),
            state: "FL".into(),
            zip: "33770".into(),
        }
    }

    #[test]
    fn test_new_job_is_ready() {
        let job = Job::new("E1", "Smith", address());
        assert_eq!(job.status, JobStatus::Ready);
        assert_eq!(job.created_at, job.updated_at);
        assert!(job.environment.is_empty());
        assert!(job.overhead.image_path.is_none());
    }

    #[test]
    fn test_status_parsing() {
        assert_eq!("in progress".parse::<JobStatus>().unwrap(), JobStatus::InProgress);
        assert_eq!("Completed".parse::<JobStatus>().unwrap(), JobStatus::Completed);
        assert!("archived".parse::<JobStatus>().is_err());
    }

    #[test]
    fn test_address_display() {
        assert_eq!(address().to_string(), "1 Main St, Largo, FL 33770");
    }
}
