//! Import summaries.

use serde::Serialize;
use std::fmt;

use crate::model::JobId;

/// A non-fatal problem found while importing.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportWarning {
    pub job_id: Option<JobId>,
    pub message: String,
}

/// What an import did.
#[derive(Clone, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    /// Package version from the manifest.
    pub version: String,
    pub prepared_by: String,
    /// Imported jobs, in manifest order.
    pub jobs: Vec<JobId>,
    /// Jobs that already existed and were replaced.
    pub replaced: Vec<JobId>,
    /// Overhead images copied into local storage.
    pub images: usize,
    pub warnings: Vec<ImportWarning>,
}

impl ImportReport {
    pub(crate) fn warn(&mut self, job_id: Option<&JobId>, message: impl Into<String>) {
        let message = message.into();
        match job_id {
            Some(id) => tracing::warn!(job_id = %id, "{message}"),
            None => tracing::warn!("{message}"),
        }
        self.warnings.push(ImportWarning {
            job_id: job_id.cloned(),
            message,
        });
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

impl fmt::Display for ImportReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Imported {} job(s), {} overhead image(s) (package version {}, prepared by {})",
            self.jobs.len(),
            self.images,
            self.version,
            if self.prepared_by.is_empty() {
                "unknown"
            } else {
                &self.prepared_by
            }
        )?;
        for job in &self.jobs {
            if self.replaced.contains(job) {
                writeln!(f, "  {job} (replaced)")?;
            } else {
                writeln!(f, "  {job}")?;
            }
        }

        if !self.warnings.is_empty() {
            writeln!(f)?;
            writeln!(f, "Warnings ({}):", self.warnings.len())?;
            for warning in &self.warnings {
                match &warning.job_id {
                    Some(id) => writeln!(f, "  - [{id}] {}", warning.message)?,
                    None => writeln!(f, "  - {}", warning.message)?,
                }
            }
        }
        Ok(())
    }
}
