#![allow(dead_code)]

use fieldpack::geometry::{Coord, FitLayout, ImageSize, Original, DEFAULT_FIT_TOLERANCE};
use proptest::prelude::*;
use proptest::test_runner::{Config as ProptestConfig, FileFailurePersistence};

pub fn proptest_config() -> ProptestConfig {
    let cases = std::env::var("PROPTEST_CASES")
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(256);

    let mut config = ProptestConfig::with_failure_persistence(FileFailurePersistence::WithSource(
        "proptest-regressions",
    ));
    config.cases = cases;
    config.max_shrink_iters = 1024;
    config
}

/// Round-trip tolerance scaled to the image size.
pub fn eps_for(original: ImageSize) -> f64 {
    original.width.max(original.height) * 1e-9 + 1e-9
}

pub fn arb_size() -> impl Strategy<Value = ImageSize> {
    (1.0f64..4000.0, 1.0f64..4000.0).prop_map(|(w, h)| ImageSize::new(w, h))
}

/// A point inside (or on the edge of) `size`.
pub fn arb_point_in(size: ImageSize) -> impl Strategy<Value = Coord<Original>> {
    (0.0f64..=1.0, 0.0f64..=1.0)
        .prop_map(move |(fx, fy)| Coord::new(fx * size.width, fy * size.height))
}

/// Original size, viewport size and a point, with the layout resolving to
/// the branch `pick` accepts.
pub fn arb_case(
    pick: fn(&FitLayout) -> bool,
) -> impl Strategy<Value = (ImageSize, ImageSize, Coord<Original>)> {
    (arb_size(), arb_size())
        .prop_filter("layout branch", move |(original, viewport)| {
            FitLayout::resolve(*original, *viewport, DEFAULT_FIT_TOLERANCE)
                .map(|layout| pick(&layout))
                .unwrap_or(false)
        })
        .prop_flat_map(|(original, viewport)| {
            arb_point_in(original).prop_map(move |p| (original, viewport, p))
        })
}

/// Cases whose aspect ratios differ by less than the tolerance.
pub fn arb_near_fit_case() -> impl Strategy<Value = (ImageSize, ImageSize, Coord<Original>)> {
    (arb_size(), 0.05f64..5.0, -0.02f64..0.02)
        .prop_map(|(original, scale, skew)| {
            let viewport = ImageSize::new(
                original.width * scale,
                original.height * scale * (1.0 + skew),
            );
            (original, viewport)
        })
        .prop_filter("perfect fit", |(original, viewport)| {
            matches!(
                FitLayout::resolve(*original, *viewport, DEFAULT_FIT_TOLERANCE),
                Some(FitLayout::PerfectFit { .. })
            )
        })
        .prop_flat_map(|(original, viewport)| {
            arb_point_in(original).prop_map(move |p| (original, viewport, p))
        })
}

pub fn is_letterbox(layout: &FitLayout) -> bool {
    matches!(layout, FitLayout::Letterbox { .. })
}

pub fn is_pillarbox(layout: &FitLayout) -> bool {
    matches!(layout, FitLayout::Pillarbox { .. })
}
