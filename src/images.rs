//! Local overhead image storage.
//!
//! Overhead images live in one flat directory and are named
//! `{jobId}_overhead.jpg`. Jobs store that file name, relative to the root,
//! in `OverheadImage::image_path`.

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::debug;

use crate::error::FieldpackError;
use crate::model::JobId;

const OVERHEAD_SUFFIX: &str = "_overhead.jpg";

/// The directory overhead images are stored in.
#[derive(Clone, Debug)]
pub struct ImageStore {
    root: PathBuf,
}

impl ImageStore {
    /// Opens (creating if needed) the storage root.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, FieldpackError> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(FieldpackError::Io)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Deterministic file name for a job's overhead image.
    ///
    /// Bytes that are unsafe in file names are percent-encoded, so distinct
    /// job IDs always get distinct files.
    pub fn overhead_file_name(job_id: &JobId) -> String {
        format!("{}{}", encode_file_component(job_id.as_str()), OVERHEAD_SUFFIX)
    }

    /// Absolute path of a stored relative file name.
    pub fn resolve(&self, file_name: &str) -> PathBuf {
        self.root.join(file_name)
    }

    /// Returns true if `file_name` names an existing file under the root.
    pub fn contains(&self, file_name: &str) -> bool {
        !file_name.is_empty() && self.resolve(file_name).is_file()
    }

    /// Copies an image straight into storage, replacing any previous image
    /// for the same job. Returns the stored file name.
    pub fn store_overhead(&self, job_id: &JobId, source: &Path) -> Result<String, FieldpackError> {
        let file_name = Self::overhead_file_name(job_id);
        fs::copy(source, self.resolve(&file_name)).map_err(FieldpackError::Io)?;
        debug!(job_id = %job_id, file = %file_name, "stored overhead image");
        Ok(file_name)
    }

    /// Starts a staging area for images that must not become visible until
    /// a store commit succeeds.
    pub fn begin_staging(&self) -> Result<StagedImages<'_>, FieldpackError> {
        let dir = tempfile::Builder::new()
            .prefix(".staging-")
            .tempdir_in(&self.root)
            .map_err(FieldpackError::Io)?;
        Ok(StagedImages {
            store: self,
            dir,
            files: Vec::new(),
        })
    }

    /// Removes a stored image. Missing files are not an error.
    pub fn remove(&self, file_name: &str) -> Result<(), FieldpackError> {
        match fs::remove_file(self.resolve(file_name)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(FieldpackError::Io(e)),
        }
    }
}

/// Images copied into a temporary directory inside the storage root.
///
/// Dropping without [`promote`](StagedImages::promote) discards them.
pub struct StagedImages<'a> {
    store: &'a ImageStore,
    dir: TempDir,
    files: Vec<String>,
}

impl StagedImages<'_> {
    /// Stages a job's overhead image and returns the file name it will have
    /// once promoted.
    pub fn stage_overhead(&mut self, job_id: &JobId, source: &Path) -> Result<String, FieldpackError> {
        let file_name = ImageStore::overhead_file_name(job_id);
        fs::copy(source, self.dir.path().join(&file_name)).map_err(FieldpackError::Io)?;
        if !self.files.contains(&file_name) {
            self.files.push(file_name.clone());
        }
        Ok(file_name)
    }

    /// Moves every staged image into the storage root, overwriting older
    /// images for the same jobs. Staging and root share a filesystem, so
    /// each move is a rename. Every file is attempted; failures are
    /// returned alongside the successes.
    pub fn promote(self) -> Promotion {
        let mut promotion = Promotion::default();
        for file_name in self.files {
            match fs::rename(self.dir.path().join(&file_name), self.store.resolve(&file_name)) {
                Ok(()) => promotion.promoted.push(file_name),
                Err(e) => promotion.failed.push((file_name, FieldpackError::Io(e))),
            }
        }
        promotion
    }
}

/// Outcome of [`StagedImages::promote`].
#[derive(Debug, Default)]
pub struct Promotion {
    pub promoted: Vec<String>,
    pub failed: Vec<(String, FieldpackError)>,
}

/// Percent-encodes every byte outside `[A-Za-z0-9._-]`, plus a leading `.`.
/// `%` itself is always encoded, which keeps the mapping injective.
fn encode_file_component(raw: &str) -> String {
    let mut encoded = String::with_capacity(raw.len());
    for (index, byte) in raw.bytes().enumerate() {
        let keep = byte.is_ascii_alphanumeric()
            || matches!(byte, b'-' | b'_')
            || (byte == b'.' && index > 0);
        if keep {
            encoded.push(char::from(byte));
        } else {
            encoded.push_str(&format!("%{byte:02X}"));
        }
    }
    encoded
}

/// Replaces characters that are unsafe in file names with `_`. Lossy; use
/// only where a collision is harmless.
pub(crate) fn sanitize_file_component(raw: &str) -> String {
    let cleaned: String = raw
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_matches('.').to_string();
    if cleaned.is_empty() {
        "_".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overhead_names_are_deterministic() {
        assert_eq!(ImageStore::overhead_file_name(&JobId::from("E1")), "E1_overhead.jpg");
        assert_eq!(
            ImageStore::overhead_file_name(&JobId::from("../etc/x y")),
            "%2E.%2Fetc%2Fx%20y_overhead.jpg"
        );
    }

    #[test]
    fn ids_that_sanitize_alike_get_distinct_names() {
        let names: Vec<String> = ["A B", "A_B", "A%20B", "A/B", "Ä"]
            .into_iter()
            .map(|id| ImageStore::overhead_file_name(&JobId::from(id)))
            .collect();
        assert_eq!(
            names,
            [
                "A%20B_overhead.jpg",
                "A_B_overhead.jpg",
                "A%2520B_overhead.jpg",
                "A%2FB_overhead.jpg",
                "%C3%84_overhead.jpg",
            ]
        );
    }

    #[test]
    fn store_overwrites_previous_image() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let store = ImageStore::open(temp.path().join("images")).expect("open");
        let a = temp.path().join("a.jpg");
        let b = temp.path().join("b.jpg");
        fs::write(&a, "first").unwrap();
        fs::write(&b, "second").unwrap();

        let job = JobId::from("E1");
        let name = store.store_overhead(&job, &a).expect("store a");
        store.store_overhead(&job, &b).expect("store b");

        assert!(store.contains(&name));
        assert_eq!(fs::read_to_string(store.resolve(&name)).unwrap(), "second");
    }

    #[test]
    fn staged_images_invisible_until_promoted() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let store = ImageStore::open(temp.path().join("images")).expect("open");
        let src = temp.path().join("src.jpg");
        fs::write(&src, "pixels").unwrap();

        let mut staged = store.begin_staging().expect("staging");
        let name = staged.stage_overhead(&JobId::from("E1"), &src).expect("stage");
        assert!(!store.contains(&name));

        let promotion = staged.promote();
        assert!(promotion.failed.is_empty());
        assert_eq!(promotion.promoted, vec![name.clone()]);
        assert!(store.contains(&name));
    }

    #[test]
    fn promotion_reports_each_failure_and_keeps_going() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let store = ImageStore::open(temp.path().join("images")).expect("open");
        let src = temp.path().join("src.jpg");
        fs::write(&src, "pixels").unwrap();
        // A non-empty directory in the way makes the rename fail.
        let blocked = ImageStore::overhead_file_name(&JobId::from("E1"));
        fs::create_dir_all(store.resolve(&blocked).join("inner")).unwrap();

        let mut staged = store.begin_staging().expect("staging");
        staged.stage_overhead(&JobId::from("E1"), &src).expect("stage E1");
        let ok = staged.stage_overhead(&JobId::from("E2"), &src).expect("stage E2");
        let promotion = staged.promote();

        assert_eq!(promotion.promoted, vec![ok.clone()]);
        assert_eq!(promotion.failed.len(), 1);
        assert_eq!(promotion.failed[0].0, blocked);
        assert!(store.contains(&ok));
    }

    #[test]
    fn dropped_staging_leaves_nothing_behind() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let store = ImageStore::open(temp.path().join("images")).expect("open");
        let src = temp.path().join("src.jpg");
        fs::write(&src, "pixels").unwrap();

        {
            let mut staged = store.begin_staging().expect("staging");
            staged.stage_overhead(&JobId::from("E1"), &src).expect("stage");
        }

        assert_eq!(fs::read_dir(store.root()).unwrap().count(), 0);
    }
}
