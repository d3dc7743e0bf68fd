//! Plain-text report and photo manifest.

use std::fmt;

use chrono::{DateTime, Utc};

use crate::manifest::timestamp::format_timestamp;
use crate::model::{Job, Photo, PhotoCounts, TestResult, Window};

/// File name of the text report inside an export package.
pub const REPORT_FILE: &str = "report.txt";

/// File name of the photo manifest inside an export package.
pub const PHOTOS_FILE: &str = "photos.txt";

/// A window with everything the export needs about it.
#[derive(Clone, Debug)]
pub struct WindowSnapshot {
    pub window: Window,
    pub photos: Vec<Photo>,
    pub counts: PhotoCounts,
}

/// The human-readable inspection report.
pub struct InspectionReport<'a> {
    pub job: &'a Job,
    pub windows: &'a [WindowSnapshot],
    pub exported_at: DateTime<Utc>,
}

impl fmt::Display for InspectionReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let job = self.job;
        let passed = self
            .windows
            .iter()
            .filter(|w| w.window.test_result == TestResult::Pass)
            .count();
        let failed = self
            .windows
            .iter()
            .filter(|w| w.window.test_result == TestResult::Fail)
            .count();

        writeln!(f, "Window Inspection Report")?;
        writeln!(f, "========================")?;
        writeln!(f, "Job:        {}", job.job_id)?;
        writeln!(f, "Client:     {}", job.client_name)?;
        writeln!(f, "Address:    {}", job.address)?;
        writeln!(f, "Status:     {}", job.status)?;
        if let Some(inspector) = &job.inspector_name {
            writeln!(f, "Inspector:  {inspector}")?;
        }
        if let Some(date) = &job.inspection_date {
            writeln!(f, "Inspected:  {}", format_timestamp(date))?;
        }
        writeln!(f, "Exported:   {}", format_timestamp(&self.exported_at))?;
        if let Some(scale) = job.overhead.scale_pixels_per_foot {
            writeln!(f, "Scale:      {scale} px/ft")?;
        }

        let env = &job.environment;
        if !env.is_empty() {
            writeln!(f)?;
            writeln!(f, "Conditions")?;
            if let Some(t) = env.temperature {
                writeln!(f, "  Temperature: {t} F")?;
            }
            if let Some(c) = &env.weather_condition {
                writeln!(f, "  Weather:     {c}")?;
            }
            if let Some(h) = env.humidity {
                writeln!(f, "  Humidity:    {h}%")?;
            }
            if let Some(w) = env.wind_speed {
                writeln!(f, "  Wind:        {w} mph")?;
            }
        }

        if !job.notes.is_empty() {
            writeln!(f)?;
            writeln!(f, "Notes: {}", job.notes)?;
        }

        writeln!(f)?;
        writeln!(
            f,
            "Windows: {} total, {} passed, {} failed, {} untested",
            self.windows.len(),
            passed,
            failed,
            self.windows.len() - passed - failed
        )?;

        for snapshot in self.windows {
            let w = &snapshot.window;
            writeln!(f)?;
            writeln!(f, "Window {}", w.window_number)?;
            writeln!(f, "  Position:   ({:.1}, {:.1})", w.x_position, w.y_position)?;
            if let Some(kind) = w.window_type {
                writeln!(f, "  Type:       {kind}")?;
            }
            if !w.condition.is_empty() {
                writeln!(f, "  Condition:  {}", w.condition)?;
            }
            writeln!(f, "  Test:       {}", w.test_result)?;
            if w.test_result == TestResult::Fail || w.leak_points > 0 {
                writeln!(f, "  Leaks:      {}", w.leak_points)?;
            }
            if w.is_measured() {
                writeln!(f, "  Size:       {} x {}", w.width, w.height)?;
            } else {
                writeln!(f, "  Size:       not measured")?;
            }
            if !w.is_accessible {
                writeln!(f, "  Not accessible")?;
            }
            writeln!(
                f,
                "  Photos:     {} exterior, {} interior, {} leak",
                snapshot.counts.exterior, snapshot.counts.interior, snapshot.counts.leak
            )?;
            if !w.notes.is_empty() {
                writeln!(f, "  Notes:      {}", w.notes)?;
            }
        }
        Ok(())
    }
}

/// The photo manifest: a header line, then one tab-separated line per photo.
pub struct PhotoManifest<'a>(pub &'a [WindowSnapshot]);

impl fmt::Display for PhotoManifest<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "windowNumber\twindowId\tphotoType\tassetRef\tcreatedAt")?;
        for snapshot in self.0 {
            for photo in &snapshot.photos {
                writeln!(
                    f,
                    "{}\t{}\t{}\t{}\t{}",
                    snapshot.window.window_number,
                    snapshot.window.window_id,
                    photo.photo_type,
                    photo.asset_ref,
                    format_timestamp(&photo.created_at)
                )?;
            }
        }
        Ok(())
    }
}
