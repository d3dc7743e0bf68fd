//! Manifest discovery inside an arbitrary package root.
//!
//! Packages arrive as a bare folder, wrapped in one extra folder (file
//! pickers and archive tools like to add a nesting level), or occasionally
//! as a batch of sibling folders. The locator recovers the real root so the
//! user never has to navigate to it by hand.

use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::FieldpackError;
use crate::manifest::INTAKE_MANIFEST_FILE;

/// A discovered package root and its manifest.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LocatedPackage {
    /// Directory holding the manifest; asset paths resolve against it.
    pub root: PathBuf,
    pub manifest_path: PathBuf,
}

/// Finds `jobs.json` under `root`.
///
/// Precedence:
/// 1. `root` itself;
/// 2. otherwise each immediate subdirectory in file-name order, adopting the
///    first that contains the manifest (a single wrapping folder is the
///    common case of this rule);
/// 3. otherwise [`FieldpackError::MissingManifest`].
///
/// Only one level is searched. Hidden entries and `__MACOSX` folders left by
/// archivers are skipped.
pub fn locate_manifest(root: &Path) -> Result<LocatedPackage, FieldpackError> {
    if let Some(found) = manifest_in(root) {
        debug!(root = %root.display(), "manifest found at package root");
        return Ok(found);
    }

    let subdirs = list_subdirectories(root)?;
    let mut candidates = subdirs.iter().filter_map(|dir| manifest_in(dir));

    let Some(found) = candidates.next() else {
        return Err(FieldpackError::MissingManifest {
            root: root.to_path_buf(),
        });
    };

    let skipped = candidates.count();
    if skipped > 0 {
        warn!(
            adopted = %found.root.display(),
            skipped,
            "multiple package folders contain a manifest; using the first"
        );
    } else {
        debug!(adopted = %found.root.display(), "manifest found in nested folder");
    }

    Ok(found)
}

fn manifest_in(dir: &Path) -> Option<LocatedPackage> {
    let manifest_path = dir.join(INTAKE_MANIFEST_FILE);
    manifest_path.is_file().then(|| LocatedPackage {
        root: dir.to_path_buf(),
        manifest_path,
    })
}

fn list_subdirectories(root: &Path) -> Result<Vec<PathBuf>, FieldpackError> {
    let mut dirs = Vec::new();

    let walker = WalkDir::new(root)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .sort_by_file_name();

    for entry in walker {
        let entry = entry.map_err(|source| {
            let message = source.to_string();
            FieldpackError::AccessDenied {
                path: root.to_path_buf(),
                source: source
                    .into_io_error()
                    .unwrap_or_else(|| io::Error::other(message)),
            }
        })?;

        if !entry.file_type().is_dir() || is_ignored(entry.file_name().to_string_lossy().as_ref())
        {
            continue;
        }
        dirs.push(entry.into_path());
    }

    Ok(dirs)
}

fn is_ignored(name: &str) -> bool {
    name.starts_with('.') || name == "__MACOSX"
}
