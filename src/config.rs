//! Layered configuration.
//!
//! Each setting remembers where its value came from. Sources rank
//! `Default < File < Environment < Cli`; a value is only replaced by one
//! from a higher-ranked source, so layers can be applied in any order.
//!
//! The file is YAML, read from `--config` or `<data_dir>/fieldpack.yaml`:
//!
//! ```yaml
//! data_dir: /var/lib/fieldpack
//! export_dir: /srv/exports
//! marker_radius: 18
//! photo_root: /mnt/photos
//! ```

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::FieldpackError;
use crate::export::{ExportOptions, DEFAULT_MARKER_RADIUS};

/// Config file name inside the data directory.
pub const CONFIG_FILE: &str = "fieldpack.yaml";

pub const ENV_DATA_DIR: &str = "FIELDPACK_DATA_DIR";
pub const ENV_EXPORT_DIR: &str = "FIELDPACK_EXPORT_DIR";
pub const ENV_MARKER_RADIUS: &str = "FIELDPACK_MARKER_RADIUS";
pub const ENV_PHOTO_ROOT: &str = "FIELDPACK_PHOTO_ROOT";

const MAX_MARKER_RADIUS: u32 = 512;

/// Where a configuration value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    Default,
    File,
    Environment,
    Cli,
}

impl ConfigSource {
    /// Higher wins.
    pub fn precedence(&self) -> u8 {
        match self {
            ConfigSource::Default => 0,
            ConfigSource::File => 1,
            ConfigSource::Environment => 2,
            ConfigSource::Cli => 3,
        }
    }
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ConfigSource::Default => "default",
            ConfigSource::File => "file",
            ConfigSource::Environment => "environment",
            ConfigSource::Cli => "cli",
        })
    }
}

/// A configuration value with its source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigValue<T> {
    pub value: T,
    pub source: ConfigSource,
}

impl<T> ConfigValue<T> {
    pub fn new(value: T, source: ConfigSource) -> Self {
        Self { value, source }
    }

    /// Replaces the value if `source` outranks the current one.
    pub fn update(&mut self, value: T, source: ConfigSource) {
        if source.precedence() > self.source.precedence() {
            self.value = value;
            self.source = source;
        }
    }
}

/// Resolved settings.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldpackConfig {
    /// Holds the entity store, the image root and the default config file.
    pub data_dir: ConfigValue<PathBuf>,
    pub export_dir: ConfigValue<PathBuf>,
    pub marker_radius: ConfigValue<u32>,
    pub photo_root: ConfigValue<Option<PathBuf>>,
}

/// Values given on the command line.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub data_dir: Option<PathBuf>,
    pub export_dir: Option<PathBuf>,
    pub marker_radius: Option<u32>,
    pub photo_root: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    data_dir: Option<PathBuf>,
    export_dir: Option<PathBuf>,
    marker_radius: Option<u32>,
    photo_root: Option<PathBuf>,
}

impl Default for FieldpackConfig {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl FieldpackConfig {
    pub fn with_defaults() -> Self {
        Self {
            data_dir: ConfigValue::new(PathBuf::from("fieldpack-data"), ConfigSource::Default),
            export_dir: ConfigValue::new(PathBuf::from("exports"), ConfigSource::Default),
            marker_radius: ConfigValue::new(DEFAULT_MARKER_RADIUS, ConfigSource::Default),
            photo_root: ConfigValue::new(None, ConfigSource::Default),
        }
    }

    /// Resolves every layer. `config_file` overrides the default file
    /// location and must exist; the default file is optional.
    pub fn load(
        config_file: Option<&Path>,
        overrides: CliOverrides,
    ) -> Result<Self, FieldpackError> {
        let mut config = Self::with_defaults().load_from_env();
        config.update_from_cli(overrides);

        match config_file {
            Some(path) => config.load_from_file(path),
            None => {
                let path = config.data_dir.value.join(CONFIG_FILE);
                if path.is_file() {
                    config.load_from_file(&path)
                } else {
                    Ok(config)
                }
            }
        }
    }

    /// Applies values from a YAML file.
    pub fn load_from_file(mut self, path: &Path) -> Result<Self, FieldpackError> {
        let content = fs::read_to_string(path).map_err(|e| FieldpackError::ConfigInvalid {
            key: "file".to_string(),
            reason: format!("failed to read {}: {e}", path.display()),
        })?;
        let file: FileConfig =
            serde_yaml::from_str(&content).map_err(|e| FieldpackError::ConfigInvalid {
                key: "file".to_string(),
                reason: format!("failed to parse {}: {e}", path.display()),
            })?;
        tracing::debug!(path = %path.display(), "loaded config file");

        if let Some(dir) = file.data_dir {
            self.data_dir.update(dir, ConfigSource::File);
        }
        if let Some(dir) = file.export_dir {
            self.export_dir.update(dir, ConfigSource::File);
        }
        if let Some(radius) = file.marker_radius {
            self.marker_radius
                .update(check_marker_radius(radius)?, ConfigSource::File);
        }
        if let Some(root) = file.photo_root {
            self.photo_root.update(Some(root), ConfigSource::File);
        }
        Ok(self)
    }

    /// Applies `FIELDPACK_*` environment variables.
    pub fn load_from_env(self) -> Self {
        self.load_from_lookup(|key| std::env::var(key).ok())
    }

    /// Applies environment-style values from `lookup`. Invalid values are
    /// logged and ignored.
    pub fn load_from_lookup(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(dir) = lookup(ENV_DATA_DIR).filter(|v| !v.is_empty()) {
            self.data_dir.update(dir.into(), ConfigSource::Environment);
        }
        if let Some(dir) = lookup(ENV_EXPORT_DIR).filter(|v| !v.is_empty()) {
            self.export_dir.update(dir.into(), ConfigSource::Environment);
        }
        if let Some(raw) = lookup(ENV_MARKER_RADIUS) {
            match raw
                .trim()
                .parse::<u32>()
                .map_err(|e| FieldpackError::ConfigInvalid {
                    key: "marker_radius".into(),
                    reason: e.to_string(),
                })
                .and_then(check_marker_radius)
            {
                Ok(radius) => self.marker_radius.update(radius, ConfigSource::Environment),
                Err(e) => tracing::warn!("ignoring {ENV_MARKER_RADIUS}='{raw}': {e}"),
            }
        }
        if let Some(root) = lookup(ENV_PHOTO_ROOT).filter(|v| !v.is_empty()) {
            self.photo_root.update(Some(root.into()), ConfigSource::Environment);
        }
        self
    }

    pub fn update_from_cli(&mut self, overrides: CliOverrides) {
        if let Some(dir) = overrides.data_dir {
            self.data_dir.update(dir, ConfigSource::Cli);
        }
        if let Some(dir) = overrides.export_dir {
            self.export_dir.update(dir, ConfigSource::Cli);
        }
        if let Some(radius) = overrides.marker_radius {
            self.marker_radius.update(radius, ConfigSource::Cli);
        }
        if let Some(root) = overrides.photo_root {
            self.photo_root.update(Some(root), ConfigSource::Cli);
        }
    }

    /// Directory holding overhead images.
    pub fn image_root(&self) -> PathBuf {
        self.data_dir.value.join("images")
    }

    pub fn export_options(&self) -> ExportOptions {
        ExportOptions {
            output_dir: self.export_dir.value.clone(),
            marker_radius: self.marker_radius.value,
            photo_root: self.photo_root.value.clone(),
        }
    }

    /// Every setting as `(key, value, source)`, for display.
    pub fn entries(&self) -> Vec<(&'static str, String, ConfigSource)> {
        vec![
            (
                "data_dir",
                self.data_dir.value.display().to_string(),
                self.data_dir.source,
            ),
            (
                "export_dir",
                self.export_dir.value.display().to_string(),
                self.export_dir.source,
            ),
            (
                "marker_radius",
                self.marker_radius.value.to_string(),
                self.marker_radius.source,
            ),
            (
                "photo_root",
                self.photo_root
                    .value
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "(unset)".to_string()),
                self.photo_root.source,
            ),
        ]
    }
}

fn check_marker_radius(radius: u32) -> Result<u32, FieldpackError> {
    if (1..=MAX_MARKER_RADIUS).contains(&radius) {
        Ok(radius)
    } else {
        Err(FieldpackError::ConfigInvalid {
            key: "marker_radius".into(),
            reason: format!("must be between 1 and {MAX_MARKER_RADIUS}, got {radius}"),
        })
    }
}
