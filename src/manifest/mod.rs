//! Manifest codecs for intake and results packages.
//!
//! Both manifests are versioned JSON with camelCase field names; the names
//! are part of the interchange contract between the desktop and field ends
//! and must not change. Decoding is pure over byte buffers; the path-based
//! helpers only add file access and error context.
//!
//! Parse failures and schema violations surface as
//! [`FieldpackError::MalformedManifest`], which callers must keep distinct
//! from [`FieldpackError::MissingManifest`] (file absent).

pub mod intake;
pub mod results;
pub mod timestamp;

use std::path::Path;

use serde::de::DeserializeOwned;

use crate::error::FieldpackError;

pub use intake::{
    from_intake_slice, from_intake_str, read_intake_manifest, to_intake_string,
    write_intake_manifest, JobIntakeEntry, JobIntakePackage, OverheadEntry, OverheadSource,
    INTAKE_MANIFEST_FILE,
};
pub use results::{
    from_results_slice, read_results_manifest, to_results_string, write_results_manifest,
    FieldData, FieldResultsPackage, IntakeProvenance, ResultsJob, WindowExportEntry,
    RESULTS_MANIFEST_FILE,
};

fn read_manifest_bytes(path: &Path) -> Result<Vec<u8>, FieldpackError> {
    std::fs::read(path).map_err(|source| match source.kind() {
        std::io::ErrorKind::NotFound => FieldpackError::MissingManifest {
            root: path.parent().unwrap_or(path).to_path_buf(),
        },
        _ => FieldpackError::Io(source),
    })
}

fn decode_json<T: DeserializeOwned>(bytes: &[u8], path: &Path) -> Result<T, FieldpackError> {
    serde_json::from_slice(bytes).map_err(|source| FieldpackError::malformed(path, source.to_string()))
}
