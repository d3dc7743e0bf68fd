//! Conversion between original image space and displayed viewport space.
//!
//! The displayed image is never cropped: it is scaled to fit its container
//! while preserving aspect ratio, so one axis fills the container exactly and
//! the other is centered between symmetric empty bands (letterbox bands above
//! and below, or pillarbox bands left and right).
//!
//! When the two aspect ratios differ by less than a tolerance the layout is
//! treated as a perfect fit and each axis is scaled independently with no
//! offset. This keeps near-zero bands from accumulating rounding error. The
//! default tolerance of 0.2 is load-bearing: changing it moves where markers
//! render for slightly mismatched viewports.

use std::str::FromStr;

use super::coord::Coord;
use super::space::{Display, Original};
use crate::error::FieldpackError;

/// Aspect-ratio difference below which a layout counts as a perfect fit.
pub const DEFAULT_FIT_TOLERANCE: f64 = 0.2;

/// Width and height of an image or viewport, in pixels of its own space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ImageSize {
    pub width: f64,
    pub height: f64,
}

impl ImageSize {
    #[inline]
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Size of a decoded raster.
    #[inline]
    pub fn from_pixels(width: u32, height: u32) -> Self {
        Self::new(width as f64, height as f64)
    }

    /// Returns true if both dimensions are finite and strictly positive.
    #[inline]
    pub fn is_usable(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }

    /// Width over height, or `None` when the ratio is undefined.
    pub fn aspect_ratio(&self) -> Option<f64> {
        self.is_usable().then(|| self.width / self.height)
    }

    /// Rejects sizes whose aspect ratio is undefined.
    ///
    /// Images must pass through this before their size is used for mapping.
    pub fn validated(self) -> Result<Self, FieldpackError> {
        if self.is_usable() {
            Ok(self)
        } else {
            Err(FieldpackError::InvalidImageSize {
                width: self.width,
                height: self.height,
            })
        }
    }

    /// Reads the native dimensions of an image file from its header.
    pub fn read_from_file(path: &std::path::Path) -> Result<Self, FieldpackError> {
        let size = imagesize::size(path).map_err(|source| FieldpackError::ImageDimensionRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::new(size.width as f64, size.height as f64).validated()
    }
}

impl FromStr for ImageSize {
    type Err = FieldpackError;

    /// Parses `WIDTHxHEIGHT`, e.g. `1024x768`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || FieldpackError::InvalidInput(format!("'{s}' is not a WIDTHxHEIGHT size"));
        let (w, h) = s
            .split_once(['x', 'X'])
            .ok_or_else(invalid)?;
        let width: f64 = w.trim().parse().map_err(|_| invalid())?;
        let height: f64 = h.trim().parse().map_err(|_| invalid())?;
        Ok(Self::new(width, height))
    }
}

/// How an image sits inside its container after aspect-fit scaling.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum FitLayout {
    /// Aspect ratios within tolerance: independent per-axis scale, no bands.
    PerfectFit { scale_x: f64, scale_y: f64 },
    /// Image relatively wider: full width, bands above and below.
    Letterbox { scale: f64, offset_y: f64 },
    /// Image relatively taller: full height, bands left and right.
    Pillarbox { scale: f64, offset_x: f64 },
}

impl FitLayout {
    /// Resolves the layout of `original` fitted into `displayed`.
    ///
    /// Returns `None` when either size has a non-positive or non-finite
    /// dimension.
    pub fn resolve(original: ImageSize, displayed: ImageSize, tolerance: f64) -> Option<Self> {
        let image_ar = original.aspect_ratio()?;
        let frame_ar = displayed.aspect_ratio()?;

        let layout = if (image_ar - frame_ar).abs() < tolerance {
            FitLayout::PerfectFit {
                scale_x: displayed.width / original.width,
                scale_y: displayed.height / original.height,
            }
        } else if image_ar > frame_ar {
            let scale = displayed.width / original.width;
            FitLayout::Letterbox {
                scale,
                offset_y: (displayed.height - original.height * scale) / 2.0,
            }
        } else {
            let scale = displayed.height / original.height;
            FitLayout::Pillarbox {
                scale,
                offset_x: (displayed.width - original.width * scale) / 2.0,
            }
        };

        Some(layout)
    }

    /// Maps an original-space point into the viewport.
    pub fn to_display(&self, point: Coord<Original>) -> Coord<Display> {
        match *self {
            FitLayout::PerfectFit { scale_x, scale_y } => {
                Coord::new(point.x * scale_x, point.y * scale_y)
            }
            FitLayout::Letterbox { scale, offset_y } => {
                Coord::new(point.x * scale, point.y * scale + offset_y)
            }
            FitLayout::Pillarbox { scale, offset_x } => {
                Coord::new(point.x * scale + offset_x, point.y * scale)
            }
        }
    }

    /// Maps a viewport point back into original image space.
    pub fn to_original(&self, point: Coord<Display>) -> Coord<Original> {
        match *self {
            FitLayout::PerfectFit { scale_x, scale_y } => {
                Coord::new(point.x / scale_x, point.y / scale_y)
            }
            FitLayout::Letterbox { scale, offset_y } => {
                Coord::new(point.x / scale, (point.y - offset_y) / scale)
            }
            FitLayout::Pillarbox { scale, offset_x } => {
                Coord::new((point.x - offset_x) / scale, point.y / scale)
            }
        }
    }

    /// The rectangle the image occupies inside the viewport, as its
    /// top-left corner and size.
    pub fn image_frame(&self, original: ImageSize) -> (Coord<Display>, ImageSize) {
        let top_left = self.to_display(Coord::origin());
        let bottom_right = self.to_display(Coord::new(original.width, original.height));
        (
            top_left,
            ImageSize::new(bottom_right.x - top_left.x, bottom_right.y - top_left.y),
        )
    }

    /// Returns true if a viewport point lands on the image rather than a band.
    pub fn contains_display_point(&self, original: ImageSize, point: Coord<Display>) -> bool {
        let (top_left, size) = self.image_frame(original);
        point.x >= top_left.x
            && point.y >= top_left.y
            && point.x <= top_left.x + size.width
            && point.y <= top_left.y + size.height
    }
}

/// Maps an original-space point into the viewport with the default tolerance.
pub fn to_display(
    point: Coord<Original>,
    original: ImageSize,
    displayed: ImageSize,
) -> Coord<Display> {
    to_display_with_tolerance(point, original, displayed, DEFAULT_FIT_TOLERANCE)
}

/// Maps an original-space point into the viewport.
///
/// Returns the origin instead of dividing by zero when either size is
/// degenerate.
pub fn to_display_with_tolerance(
    point: Coord<Original>,
    original: ImageSize,
    displayed: ImageSize,
    tolerance: f64,
) -> Coord<Display> {
    match FitLayout::resolve(original, displayed, tolerance) {
        Some(layout) => layout.to_display(point),
        None => Coord::origin(),
    }
}

/// Maps a viewport point into original image space with the default tolerance.
pub fn to_original(
    point: Coord<Display>,
    original: ImageSize,
    displayed: ImageSize,
) -> Coord<Original> {
    to_original_with_tolerance(point, original, displayed, DEFAULT_FIT_TOLERANCE)
}

/// Exact inverse of [`to_display_with_tolerance`] for the same tolerance.
///
/// Points outside the image frame are not clamped; see [`clamp_to_image`].
pub fn to_original_with_tolerance(
    point: Coord<Display>,
    original: ImageSize,
    displayed: ImageSize,
    tolerance: f64,
) -> Coord<Original> {
    match FitLayout::resolve(original, displayed, tolerance) {
        Some(layout) => layout.to_original(point),
        None => Coord::origin(),
    }
}

/// Clamps an original-space point to `[0, width] x [0, height]`.
pub fn clamp_to_image(point: Coord<Original>, original: ImageSize) -> Coord<Original> {
    Coord::new(
        point.x.clamp(0.0, original.width.max(0.0)),
        point.y.clamp(0.0, original.height.max(0.0)),
    )
}
