//! ZIP archive reading and writing for packages.

use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Component, Path};

use tracing::debug;
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::error::FieldpackError;

const ZIP_MAGIC: [u8; 4] = *b"PK\x03\x04";

/// Returns true if `path` is a file that looks like a ZIP archive, either by
/// extension or by its leading magic bytes.
pub fn is_archive(path: &Path) -> bool {
    if !path.is_file() {
        return false;
    }
    let by_extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("zip"))
        .unwrap_or(false);
    by_extension || has_zip_magic(path)
}

fn has_zip_magic(path: &Path) -> bool {
    let mut header = [0u8; 4];
    File::open(path)
        .and_then(|mut file| file.read_exact(&mut header))
        .map(|_| header == ZIP_MAGIC)
        .unwrap_or(false)
}

/// Extracts every entry of `archive` into `dest`.
///
/// Entries whose names would escape `dest` are rejected by the ZIP reader.
pub fn extract_archive(archive: &Path, dest: &Path) -> Result<(), FieldpackError> {
    let file = File::open(archive).map_err(|source| FieldpackError::AccessDenied {
        path: archive.to_path_buf(),
        source,
    })?;

    let mut zip = ZipArchive::new(file).map_err(|source| FieldpackError::Archive {
        path: archive.to_path_buf(),
        source,
    })?;
    debug!(entries = zip.len(), archive = %archive.display(), "extracting archive");

    zip.extract(dest).map_err(|source| FieldpackError::Archive {
        path: archive.to_path_buf(),
        source,
    })
}

/// Archives `source_dir` into a deflate-compressed ZIP at `archive_path`.
///
/// The directory itself becomes the single top-level folder in the archive.
/// The archive is built in a temporary file next to `archive_path` and only
/// moved into place once complete, so a failure never leaves a partial
/// archive behind.
pub fn create_archive(source_dir: &Path, archive_path: &Path) -> Result<(), FieldpackError> {
    let parent = archive_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent).map_err(FieldpackError::Io)?;

    let base = source_dir.parent().unwrap_or(source_dir);
    let temp = tempfile::NamedTempFile::new_in(parent).map_err(FieldpackError::Io)?;

    let archive_err = |source| FieldpackError::Archive {
        path: archive_path.to_path_buf(),
        source,
    };

    let mut zip = ZipWriter::new(temp.as_file());
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for entry in WalkDir::new(source_dir).sort_by_file_name() {
        let entry = entry.map_err(|source| FieldpackError::Io(source.into()))?;
        let Some(name) = entry_name(base, entry.path()) else {
            continue;
        };

        if entry.file_type().is_dir() {
            zip.add_directory(name, options).map_err(archive_err)?;
        } else if entry.file_type().is_file() {
            zip.start_file(name, options).map_err(archive_err)?;
            let mut file = File::open(entry.path()).map_err(FieldpackError::Io)?;
            io::copy(&mut file, &mut zip).map_err(FieldpackError::Io)?;
        }
    }

    zip.finish().map_err(archive_err)?;
    temp.persist(archive_path)
        .map_err(|e| FieldpackError::Io(e.error))?;

    debug!(archive = %archive_path.display(), "archive written");
    Ok(())
}

/// ZIP entry name for `path` relative to `base`, always `/`-separated.
fn entry_name(base: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(base).ok()?;
    let parts: Vec<String> = rel
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();
    (!parts.is_empty()).then(|| parts.join("/"))
}
