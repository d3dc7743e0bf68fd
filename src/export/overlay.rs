//! Annotated overhead image: one colored, numbered marker per window.

use std::io::ErrorKind;
use std::path::Path;

use image::{ImageFormat, ImageReader, Rgb, RgbImage};
use tracing::debug;

use super::font;
use crate::error::FieldpackError;
use crate::model::{TestResult, Window};

/// File name of the annotated overhead image inside an export package.
pub const OVERLAY_FILE: &str = "overhead_with_dots.jpg";

/// Marker radius in original image pixels.
pub const DEFAULT_MARKER_RADIUS: u32 = 14;

const PASS_GREEN: Rgb<u8> = Rgb([22, 163, 74]);
const FAIL_RED: Rgb<u8> = Rgb([220, 38, 38]);
const UNSET_BLUE: Rgb<u8> = Rgb([37, 99, 235]);
const LABEL_WHITE: Rgb<u8> = Rgb([255, 255, 255]);

/// Fill color for a window's marker.
pub fn marker_color(result: TestResult) -> Rgb<u8> {
    match result {
        TestResult::Pass => PASS_GREEN,
        TestResult::Fail => FAIL_RED,
        TestResult::Unset => UNSET_BLUE,
    }
}

/// Draws a filled circle labelled with the window number at each window's
/// stored position. Markers partly outside the image are clipped; markers
/// entirely outside it and windows with non-finite positions are skipped.
/// Returns the number of markers that touch the image.
pub fn draw_markers(image: &mut RgbImage, windows: &[Window], radius: u32) -> usize {
    let r = i64::from(radius.max(1));
    let label_box = (r as f64 * std::f64::consts::SQRT_2) as i64;
    let mut drawn = 0;

    for window in windows {
        let position = window.position();
        if !position.is_finite() {
            debug!(window_id = %window.window_id, "skipping marker with non-finite position");
            continue;
        }
        let reach = r as f64;
        if position.x + reach < 0.0
            || position.y + reach < 0.0
            || position.x - reach >= f64::from(image.width())
            || position.y - reach >= f64::from(image.height())
        {
            debug!(window_id = %window.window_id, "marker lies outside the image");
            continue;
        }
        // Bounded to the canvas plus the radius, so the pixel math below
        // cannot overflow.
        let cx = position.x.round() as i64;
        let cy = position.y.round() as i64;

        let color = marker_color(window.test_result);
        for dy in -r..=r {
            for dx in -r..=r {
                if dx * dx + dy * dy <= r * r {
                    font::put_clipped(image, cx + dx, cy + dy, color);
                }
            }
        }

        let label = window.window_number.trim();
        if !label.is_empty() {
            let scale = font::fitting_scale(label, label_box);
            font::draw_text_centered(image, label, (cx, cy), scale, LABEL_WHITE);
        }
        drawn += 1;
    }
    drawn
}

/// Loads `source` at native resolution, draws the window markers and writes
/// the result to `dest` as JPEG.
pub fn render_overlay(
    source: &Path,
    dest: &Path,
    windows: &[Window],
    radius: u32,
) -> Result<(), FieldpackError> {
    let reader = ImageReader::open(source)
        .and_then(|reader| reader.with_guessed_format())
        .map_err(|e| match e.kind() {
            ErrorKind::NotFound => FieldpackError::MissingAsset {
                path: source.to_path_buf(),
            },
            _ => FieldpackError::Io(e),
        })?;
    let mut canvas = reader
        .decode()
        .map_err(|source_err| FieldpackError::ImageRender {
            path: source.to_path_buf(),
            source: source_err,
        })?
        .to_rgb8();

    let drawn = draw_markers(&mut canvas, windows, radius);
    canvas
        .save_with_format(dest, ImageFormat::Jpeg)
        .map_err(|source_err| FieldpackError::ImageRender {
            path: dest.to_path_buf(),
            source: source_err,
        })?;
    debug!(markers = drawn, dest = %dest.display(), "rendered overlay");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Coord;

    fn window_at(x: f64, y: f64, number: &str, result: TestResult) -> Window {
        let mut window = Window::new("E1", number, Coord::new(x, y));
        window.test_result = result;
        window
    }

    #[test]
    fn marker_colors_follow_test_result() {
        let mut image = RgbImage::new(100, 40);
        let windows = [
            window_at(15.0, 20.0, "", TestResult::Pass),
            window_at(50.0, 20.0, "", TestResult::Fail),
            window_at(85.0, 20.0, "", TestResult::Unset),
        ];
        assert_eq!(draw_markers(&mut image, &windows, 10), 3);
        assert_eq!(*image.get_pixel(15, 20), PASS_GREEN);
        assert_eq!(*image.get_pixel(50, 20), FAIL_RED);
        assert_eq!(*image.get_pixel(85, 20), UNSET_BLUE);
        assert_eq!(*image.get_pixel(15, 2), Rgb([0, 0, 0]));
    }

    #[test]
    fn label_is_drawn_in_white_inside_the_marker() {
        let mut image = RgbImage::new(60, 60);
        draw_markers(&mut image, &[window_at(30.0, 30.0, "8", TestResult::Fail)], 14);
        let white = (16..=44)
            .flat_map(|y| (16..=44).map(move |x| (x, y)))
            .filter(|&(x, y)| *image.get_pixel(x, y) == LABEL_WHITE)
            .count();
        assert!(white > 0);
        assert_eq!(*image.get_pixel(30, 17), FAIL_RED);
    }

    #[test]
    fn markers_past_the_edge_are_clipped() {
        let mut image = RgbImage::new(20, 20);
        let windows = [
            window_at(-5.0, -5.0, "1", TestResult::Pass),
            window_at(25.0, 10.0, "2", TestResult::Fail),
            window_at(500.0, 500.0, "3", TestResult::Pass),
            window_at(f64::NAN, 3.0, "4", TestResult::Pass),
        ];
        assert_eq!(draw_markers(&mut image, &windows, 14), 2);
        assert_eq!(*image.get_pixel(0, 0), PASS_GREEN);
        assert_eq!(*image.get_pixel(19, 10), FAIL_RED);
    }

    #[test]
    fn huge_positions_are_skipped_without_overflow() {
        let mut image = RgbImage::new(10, 10);
        let windows = [
            window_at(1e300, 5.0, "1", TestResult::Pass),
            window_at(5.0, -1e300, "2", TestResult::Pass),
            window_at(f64::MAX, f64::MAX, "3", TestResult::Fail),
            window_at(5.0, 5.0, "", TestResult::Fail),
        ];
        assert_eq!(draw_markers(&mut image, &windows, 14), 1);
        assert_eq!(*image.get_pixel(5, 5), FAIL_RED);
    }

    #[test]
    fn missing_source_is_a_missing_asset() {
        let dir = tempfile::tempdir().unwrap();
        let err = render_overlay(
            &dir.path().join("nope.jpg"),
            &dir.path().join("out.jpg"),
            &[],
            DEFAULT_MARKER_RADIUS,
        )
        .unwrap_err();
        assert!(matches!(err, FieldpackError::MissingAsset { .. }));
    }

    #[test]
    fn renders_jpeg_at_native_resolution() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("overhead.png");
        RgbImage::from_pixel(64, 48, Rgb([200, 200, 200]))
            .save_with_format(&source, ImageFormat::Png)
            .unwrap();
        let dest = dir.path().join(OVERLAY_FILE);

        render_overlay(
            &source,
            &dest,
            &[window_at(32.0, 24.0, "1", TestResult::Pass)],
            DEFAULT_MARKER_RADIUS,
        )
        .unwrap();

        let size = imagesize::size(&dest).unwrap();
        assert_eq!((size.width, size.height), (64, 48));
    }
}
