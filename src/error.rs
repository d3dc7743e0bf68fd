use std::path::PathBuf;
use thiserror::Error;

/// The main error type for fieldpack operations.
#[derive(Debug, Error)]
pub enum FieldpackError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cannot open package source {path}: {source}")]
    AccessDenied {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("No jobs.json manifest found under {root}")]
    MissingManifest { root: PathBuf },

    #[error("Malformed manifest {path}: {message}")]
    MalformedManifest { path: PathBuf, message: String },

    #[error("Failed to write manifest {path}: {source}")]
    ManifestWrite {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Referenced asset is missing: {path}")]
    MissingAsset { path: PathBuf },

    #[error("Storage failure: {message}")]
    StorageFailure { message: String },

    #[error("Weather data unavailable: {message}")]
    WeatherUnavailable { message: String },

    #[error("Archive error for {path}: {source}")]
    Archive {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("Failed to render overlay from {path}: {source}")]
    ImageRender {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Failed to read image dimensions of {path}: {source}")]
    ImageDimensionRead {
        path: PathBuf,
        #[source]
        source: imagesize::ImageError,
    },

    #[error("Invalid image size {width}x{height} (dimensions must be positive and finite)")]
    InvalidImageSize { width: f64, height: f64 },

    #[error("Failed to write CSV {path}: {source}")]
    CsvWrite {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Failed to parse CSV {path}: {source}")]
    CsvParse {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Job not found: {job_id}")]
    JobNotFound { job_id: String },

    #[error("Window not found: {window_id}")]
    WindowNotFound { window_id: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid configuration value for {key}: {reason}")]
    ConfigInvalid { key: String, reason: String },
}

impl FieldpackError {
    pub(crate) fn storage(message: impl Into<String>) -> Self {
        FieldpackError::StorageFailure {
            message: message.into(),
        }
    }

    pub(crate) fn malformed(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        FieldpackError::MalformedManifest {
            path: path.into(),
            message: message.into(),
        }
    }
}
