//! Typed 2D points using PhantomData for compile-time space safety.

use std::marker::PhantomData;

/// A 2D point with a type-level marker for the coordinate space.
///
/// The `TSpace` parameter should be either [`Original`](super::Original) or
/// [`Display`](super::Display), so a viewport tap can never be persisted as
/// an image position without going through the mapper.
#[derive(Clone, Copy, PartialEq)]
pub struct Coord<TSpace> {
    pub x: f64,
    pub y: f64,
    _space: PhantomData<TSpace>,
}

impl<TSpace> Coord<TSpace> {
    /// Creates a new point with the given x and y values.
    #[inline]
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            _space: PhantomData,
        }
    }

    /// The origin of the space.
    #[inline]
    pub fn origin() -> Self {
        Self::new(0.0, 0.0)
    }

    /// Returns true if both components are finite (not NaN or infinite).
    #[inline]
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    /// Returns true if both components are within `eps` of `other`.
    #[inline]
    pub fn approx_eq(&self, other: &Self, eps: f64) -> bool {
        (self.x - other.x).abs() <= eps && (self.y - other.y).abs() <= eps
    }
}

impl<TSpace> std::fmt::Debug for Coord<TSpace> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Coord")
            .field("x", &self.x)
            .field("y", &self.y)
            .finish()
    }
}

impl<TSpace> Default for Coord<TSpace> {
    fn default() -> Self {
        Self::origin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Display, Original};

    #[test]
    fn test_coord_creation() {
        let coord: Coord<Original> = Coord::new(10.0, 20.0);
        assert_eq!(coord.x, 10.0);
        assert_eq!(coord.y, 20.0);
        assert_eq!(Coord::<Display>::default(), Coord::origin());
    }

    #[test]
    fn test_coord_is_finite() {
        let finite: Coord<Original> = Coord::new(10.0, 20.0);
        assert!(finite.is_finite());

        let nan: Coord<Original> = Coord::new(f64::NAN, 20.0);
        assert!(!nan.is_finite());

        let inf: Coord<Display> = Coord::new(10.0, f64::INFINITY);
        assert!(!inf.is_finite());
    }

    #[test]
    fn test_approx_eq() {
        let a: Coord<Original> = Coord::new(1.0, 2.0);
        assert!(a.approx_eq(&Coord::new(1.0 + 1e-12, 2.0), 1e-9));
        assert!(!a.approx_eq(&Coord::new(1.1, 2.0), 1e-9));
    }
}
