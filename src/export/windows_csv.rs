//! Window table (`windows.csv`) writer and reader.
//!
//! One row per window, in the same order as the results manifest, with a
//! header row. Positions are original image pixels. Fields containing
//! commas, quotes or newlines are quoted per RFC 4180 so free-text notes
//! never shift columns.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::FieldpackError;
use crate::manifest::timestamp;
use crate::model::{PhotoCounts, TestResult, Window, WindowId, WindowType};

/// File name of the window table inside an export package.
pub const WINDOWS_CSV_FILE: &str = "windows.csv";

/// A single row of the window table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowRow {
    pub window_number: String,
    pub window_id: WindowId,
    pub x_position: f64,
    pub y_position: f64,
    pub window_type: Option<WindowType>,
    pub condition: String,
    pub test_result: TestResult,
    pub leak_points: u8,
    pub is_accessible: bool,
    pub width: f64,
    pub height: f64,
    pub exterior_photos: usize,
    pub interior_photos: usize,
    pub leak_photos: usize,
    pub notes: String,
    #[serde(with = "timestamp::required")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "timestamp::required")]
    pub updated_at: DateTime<Utc>,
}

impl WindowRow {
    pub fn from_window(window: &Window, photos: PhotoCounts) -> Self {
        Self {
            window_number: window.window_number.clone(),
            window_id: window.window_id.clone(),
            x_position: window.x_position,
            y_position: window.y_position,
            window_type: window.window_type,
            condition: window.condition.clone(),
            test_result: window.test_result,
            leak_points: window.leak_points,
            is_accessible: window.is_accessible,
            width: window.width,
            height: window.height,
            exterior_photos: photos.exterior,
            interior_photos: photos.interior,
            leak_photos: photos.leak,
            notes: window.notes.clone(),
            created_at: window.created_at,
            updated_at: window.updated_at,
        }
    }
}

/// Column names, in [`WindowRow`] field order. Written explicitly so a job
/// without windows still gets a header row.
pub const WINDOWS_CSV_HEADER: [&str; 17] = [
    "windowNumber",
    "windowId",
    "xPosition",
    "yPosition",
    "windowType",
    "condition",
    "testResult",
    "leakPoints",
    "isAccessible",
    "width",
    "height",
    "exteriorPhotos",
    "interiorPhotos",
    "leakPhotos",
    "notes",
    "createdAt",
    "updatedAt",
];

/// Writes the window table to a file.
pub fn write_windows_csv(path: &Path, rows: &[WindowRow]) -> Result<(), FieldpackError> {
    let file = File::create(path).map_err(FieldpackError::Io)?;
    write_rows(BufWriter::new(file), rows, path)?
        .flush()
        .map_err(FieldpackError::Io)?;
    Ok(())
}

/// Writes the window table to a string.
pub fn to_windows_csv_string(rows: &[WindowRow]) -> Result<String, FieldpackError> {
    let bytes = write_rows(Vec::new(), rows, Path::new("<string>"))?;
    String::from_utf8(bytes)
        .map_err(|e| FieldpackError::InvalidInput(format!("CSV output is not UTF-8: {e}")))
}

fn write_rows<W: Write>(writer: W, rows: &[WindowRow], path: &Path) -> Result<W, FieldpackError> {
    let csv_err = |source| FieldpackError::CsvWrite {
        path: path.to_path_buf(),
        source,
    };

    let mut csv_writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);
    csv_writer.write_record(WINDOWS_CSV_HEADER).map_err(csv_err)?;
    for row in rows {
        csv_writer.serialize(row).map_err(csv_err)?;
    }

    csv_writer
        .into_inner()
        .map_err(|e| FieldpackError::Io(e.into_error()))
}

/// Reads a window table from a string.
pub fn from_windows_csv_str(csv: &str) -> Result<Vec<WindowRow>, FieldpackError> {
    from_windows_csv_slice(csv.as_bytes())
}

/// Reads a window table from raw bytes.
pub fn from_windows_csv_slice(bytes: &[u8]) -> Result<Vec<WindowRow>, FieldpackError> {
    let source_path = Path::new("<bytes>");
    let mut reader = csv::Reader::from_reader(bytes);
    reader
        .deserialize()
        .map(|row| {
            row.map_err(|source| FieldpackError::CsvParse {
                path: source_path.to_path_buf(),
                source,
            })
        })
        .collect()
}
