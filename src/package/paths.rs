//! Resolution of paths found inside package manifests.

use std::path::{Component, Path, PathBuf};

/// Joins a manifest-relative path onto `root`.
///
/// Returns `None` for empty, absolute or `..` paths so a manifest can never
/// reach files outside the directory it was shipped in.
pub fn resolve_relative(root: &Path, relative: &str) -> Option<PathBuf> {
    let relative = Path::new(relative.trim());
    if relative.as_os_str().is_empty() {
        return None;
    }
    let mut resolved = root.to_path_buf();
    for component in relative.components() {
        match component {
            Component::Normal(part) => resolved.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    Some(resolved)
}
