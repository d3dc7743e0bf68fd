//! Photos attached to windows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::ids::{PhotoId, WindowId};
use crate::error::FieldpackError;

/// What a photo shows.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PhotoType {
    Exterior,
    Interior,
    Leak,
}

impl PhotoType {
    pub fn as_str(self) -> &'static str {
        match self {
            PhotoType::Exterior => "Exterior",
            PhotoType::Interior => "Interior",
            PhotoType::Leak => "Leak",
        }
    }
}

impl fmt::Display for PhotoType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PhotoType {
    type Err = FieldpackError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "exterior" => Ok(PhotoType::Exterior),
            "interior" => Ok(PhotoType::Interior),
            "leak" => Ok(PhotoType::Leak),
            _ => Err(FieldpackError::InvalidInput(format!(
                "unknown photo type '{s}' (expected exterior, interior or leak)"
            ))),
        }
    }
}

/// A photo reference owned by one window.
///
/// `asset_ref` is an opaque identifier into platform photo storage; photo
/// bytes never live in the entity store.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Photo {
    pub photo_id: PhotoId,
    pub window_id: WindowId,
    pub photo_type: PhotoType,
    pub asset_ref: String,
    pub created_at: DateTime<Utc>,
}

impl Photo {
    pub fn new(window_id: WindowId, photo_type: PhotoType, asset_ref: impl Into<String>) -> Self {
        Self {
            photo_id: PhotoId::generate(),
            window_id,
            photo_type,
            asset_ref: asset_ref.into(),
            created_at: Utc::now(),
        }
    }
}

/// Per-category photo counts for a window.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PhotoCounts {
    pub exterior: usize,
    pub interior: usize,
    pub leak: usize,
}

impl PhotoCounts {
    pub fn tally<'a>(photos: impl IntoIterator<Item = &'a Photo>) -> Self {
        let mut counts = Self::default();
        for photo in photos {
            match photo.photo_type {
                PhotoType::Exterior => counts.exterior += 1,
                PhotoType::Interior => counts.interior += 1,
                PhotoType::Leak => counts.leak += 1,
            }
        }
        counts
    }

    pub fn total(&self) -> usize {
        self.exterior + self.interior + self.leak
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tally_counts_each_type() {
        let window = WindowId::from("w1");
        let photos = vec![
            Photo::new(window.clone(), PhotoType::Exterior, "a"),
            Photo::new(window.clone(), PhotoType::Exterior, "b"),
            Photo::new(window.clone(), PhotoType::Leak, "c"),
        ];
        let counts = PhotoCounts::tally(&photos);
        assert_eq!(counts.exterior, 2);
        assert_eq!(counts.interior, 0);
        assert_eq!(counts.leak, 1);
        assert_eq!(counts.total(), 3);
    }

    #[test]
    fn test_photo_type_parsing() {
        assert_eq!("Interior".parse::<PhotoType>().unwrap(), PhotoType::Interior);
        assert!("selfie".parse::<PhotoType>().is_err());
    }
}
