//! Package structure: finding the manifest, resolving the paths it names,
//! and reading/writing archives.

pub mod archive;
pub mod locator;
mod paths;

pub use archive::{create_archive, extract_archive, is_archive};
pub use locator::{locate_manifest, LocatedPackage};
pub use paths::resolve_relative;
