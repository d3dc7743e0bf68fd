//! Windows: point annotations placed on a job's overhead image.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::ids::{JobId, WindowId};
use crate::error::FieldpackError;
use crate::geometry::{Coord, Original};

/// Highest leak point count a window can record.
pub const MAX_LEAK_POINTS: u8 = 10;

/// Window construction types in the inspection catalog.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WindowType {
    Awning,
    Bay,
    Casement,
    #[serde(rename = "Double Hung")]
    DoubleHung,
    Fixed,
    Hopper,
    Jalousie,
    Picture,
    #[serde(rename = "Single Hung")]
    SingleHung,
    Sliding,
}

impl WindowType {
    /// The full catalog, in display order.
    pub const ALL: [WindowType; 10] = [
        WindowType::Awning,
        WindowType::Bay,
        WindowType::Casement,
        WindowType::DoubleHung,
        WindowType::Fixed,
        WindowType::Hopper,
        WindowType::Jalousie,
        WindowType::Picture,
        WindowType::SingleHung,
        WindowType::Sliding,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            WindowType::Awning => "Awning",
            WindowType::Bay => "Bay",
            WindowType::Casement => "Casement",
            WindowType::DoubleHung => "Double Hung",
            WindowType::Fixed => "Fixed",
            WindowType::Hopper => "Hopper",
            WindowType::Jalousie => "Jalousie",
            WindowType::Picture => "Picture",
            WindowType::SingleHung => "Single Hung",
            WindowType::Sliding => "Sliding",
        }
    }
}

impl fmt::Display for WindowType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WindowType {
    type Err = FieldpackError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        WindowType::ALL
            .into_iter()
            .find(|t| {
                t.as_str().eq_ignore_ascii_case(wanted)
                    || t.as_str().replace(' ', "").eq_ignore_ascii_case(wanted)
            })
            .ok_or_else(|| FieldpackError::InvalidInput(format!("unknown window type '{s}'")))
    }
}

/// Outcome of a window water test.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TestResult {
    #[default]
    #[serde(rename = "unset")]
    Unset,
    Pass,
    Fail,
}

impl TestResult {
    pub fn as_str(self) -> &'static str {
        match self {
            TestResult::Unset => "unset",
            TestResult::Pass => "Pass",
            TestResult::Fail => "Fail",
        }
    }
}

impl fmt::Display for TestResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TestResult {
    type Err = FieldpackError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "unset" | "none" => Ok(TestResult::Unset),
            "pass" => Ok(TestResult::Pass),
            "fail" => Ok(TestResult::Fail),
            _ => Err(FieldpackError::InvalidInput(format!(
                "unknown test result '{s}' (expected pass, fail or unset)"
            ))),
        }
    }
}

/// A single physical window on a job.
///
/// `x_position` / `y_position` are in original overhead-image pixels, never
/// viewport coordinates.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Window {
    pub window_id: WindowId,
    /// Owning job.
    pub job_id: JobId,
    pub window_number: String,
    pub x_position: f64,
    pub y_position: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window_type: Option<WindowType>,
    #[serde(default)]
    pub condition: String,
    #[serde(default)]
    pub test_result: TestResult,
    #[serde(default)]
    pub leak_points: u8,
    #[serde(default)]
    pub is_accessible: bool,
    #[serde(default)]
    pub notes: String,
    /// Measured width; 0 means unmeasured.
    #[serde(default)]
    pub width: f64,
    /// Measured height; 0 means unmeasured.
    #[serde(default)]
    pub height: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Window {
    /// Creates a window at an original-image position with a fresh ID.
    pub fn new(
        job_id: impl Into<JobId>,
        window_number: impl Into<String>,
        position: Coord<Original>,
    ) -> Self {
        let now = Utc::now();
        Self {
            window_id: WindowId::generate(),
            job_id: job_id.into(),
            window_number: window_number.into(),
            x_position: position.x,
            y_position: position.y,
            window_type: None,
            condition: String::new(),
            test_result: TestResult::Unset,
            leak_points: 0,
            is_accessible: true,
            notes: String::new(),
            width: 0.0,
            height: 0.0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Stored position in original image space.
    pub fn position(&self) -> Coord<Original> {
        Coord::new(self.x_position, self.y_position)
    }

    pub fn set_position(&mut self, position: Coord<Original>) {
        self.x_position = position.x;
        self.y_position = position.y;
        self.touch();
    }

    /// Records the leak point count, clamped to [`MAX_LEAK_POINTS`].
    pub fn set_leak_points(&mut self, count: u32) {
        self.leak_points = count.min(MAX_LEAK_POINTS as u32) as u8;
        self.touch();
    }

    pub fn is_measured(&self) -> bool {
        self.width > 0.0 && self.height > 0.0
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
