//! Coordinate space marker types.
//!
//! These are zero-sized types (ZSTs) used as type parameters to distinguish
//! original-image positions from on-screen positions at compile time.

use std::fmt;

/// Marker type for original image pixel space.
///
/// This is the pixel grid of the decoded raster at its native resolution,
/// with (0, 0) at the top-left corner. Every stored window position lives
/// in this space.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub enum Original {}

/// Marker type for displayed viewport space.
///
/// Positions relative to the top-left corner of the container the image is
/// fitted into, including any letterbox or pillarbox bands.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub enum Display {}

impl fmt::Debug for Original {
    fn fmt(&self, _: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {}
    }
}

impl fmt::Debug for Display {
    fn fmt(&self, _: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {}
    }
}
