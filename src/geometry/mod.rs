//! Geometry for window placement on overhead imagery.
//!
//! Window positions are always stored in original image pixel space so that
//! re-display at any viewport size reproduces the same physical location.
//! The [`mapper`] functions convert between that space and the viewport the
//! image is shown in.
//!
//! # Example
//!
//! ```
//! use fieldpack::geometry::{mapper, Coord, ImageSize, Original};
//!
//! let original = ImageSize::new(400.0, 100.0);
//! let viewport = ImageSize::new(200.0, 100.0);
//!
//! let shown = mapper::to_display(Coord::<Original>::new(0.0, 50.0), original, viewport);
//! assert_eq!((shown.x, shown.y), (0.0, 50.0));
//! ```

mod coord;
pub mod mapper;
mod space;

pub use coord::Coord;
pub use mapper::{FitLayout, ImageSize, DEFAULT_FIT_TOLERANCE};
pub use space::{Display, Original};
