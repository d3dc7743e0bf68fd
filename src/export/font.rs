//! A 5x7 bitmap font for marker labels.
//!
//! Labels are short window numbers, so the font covers digits, upper-case
//! letters and a little punctuation. Lower-case input is drawn upper-case;
//! anything else is drawn as `?`.

use image::{Rgb, RgbImage};

pub(crate) const GLYPH_WIDTH: i64 = 5;
pub(crate) const GLYPH_HEIGHT: i64 = 7;
/// Blank columns between glyphs.
const SPACING: i64 = 1;

const UNKNOWN: [u8; 7] = [0x0E, 0x11, 0x01, 0x02, 0x04, 0x00, 0x04];

/// Row bitmaps, top to bottom; bit 4 is the leftmost column.
fn glyph(c: char) -> [u8; 7] {
    match c.to_ascii_uppercase() {
        '0' => [0x0E, 0x11, 0x13, 0x15, 0x19, 0x11, 0x0E],
        '1' => [0x04, 0x0C, 0x04, 0x04, 0x04, 0x04, 0x0E],
        '2' => [0x0E, 0x11, 0x01, 0x02, 0x04, 0x08, 0x1F],
        '3' => [0x1F, 0x02, 0x04, 0x02, 0x01, 0x11, 0x0E],
        '4' => [0x02, 0x06, 0x0A, 0x12, 0x1F, 0x02, 0x02],
        '5' => [0x1F, 0x10, 0x1E, 0x01, 0x01, 0x11, 0x0E],
        '6' => [0x06, 0x08, 0x10, 0x1E, 0x11, 0x11, 0x0E],
        '7' => [0x1F, 0x01, 0x02, 0x04, 0x08, 0x08, 0x08],
        '8' => [0x0E, 0x11, 0x11, 0x0E, 0x11, 0x11, 0x0E],
        '9' => [0x0E, 0x11, 0x11, 0x0F, 0x01, 0x02, 0x0C],
        'A' => [0x0E, 0x11, 0x11, 0x11, 0x1F, 0x11, 0x11],
        'B' => [0x1E, 0x11, 0x11, 0x1E, 0x11, 0x11, 0x1E],
        'C' => [0x0E, 0x11, 0x10, 0x10, 0x10, 0x11, 0x0E],
        'D' => [0x1C, 0x12, 0x11, 0x11, 0x11, 0x12, 0x1C],
        'E' => [0x1F, 0x10, 0x10, 0x1E, 0x10, 0x10, 0x1F],
        'F' => [0x1F, 0x10, 0x10, 0x1E, 0x10, 0x10, 0x10],
        'G' => [0x0E, 0x11, 0x10, 0x17, 0x11, 0x11, 0x0F],
        'H' => [0x11, 0x11, 0x11, 0x1F, 0x11, 0x11, 0x11],
        'I' => [0x0E, 0x04, 0x04, 0x04, 0x04, 0x04, 0x0E],
        'J' => [0x07, 0x02, 0x02, 0x02, 0x02, 0x12, 0x0C],
        'K' => [0x11, 0x12, 0x14, 0x18, 0x14, 0x12, 0x11],
        'L' => [0x10, 0x10, 0x10, 0x10, 0x10, 0x10, 0x1F],
        'M' => [0x11, 0x1B, 0x15, 0x15, 0x11, 0x11, 0x11],
        'N' => [0x11, 0x11, 0x19, 0x15, 0x13, 0x11, 0x11],
        'O' => [0x0E, 0x11, 0x11, 0x11, 0x11, 0x11, 0x0E],
        'P' => [0x1E, 0x11, 0x11, 0x1E, 0x10, 0x10, 0x10],
        'Q' => [0x0E, 0x11, 0x11, 0x11, 0x15, 0x12, 0x0D],
        'R' => [0x1E, 0x11, 0x11, 0x1E, 0x14, 0x12, 0x11],
        'S' => [0x0F, 0x10, 0x10, 0x0E, 0x01, 0x01, 0x1E],
        'T' => [0x1F, 0x04, 0x04, 0x04, 0x04, 0x04, 0x04],
        'U' => [0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x0E],
        'V' => [0x11, 0x11, 0x11, 0x11, 0x11, 0x0A, 0x04],
        'W' => [0x11, 0x11, 0x11, 0x15, 0x15, 0x15, 0x0A],
        'X' => [0x11, 0x11, 0x0A, 0x04, 0x0A, 0x11, 0x11],
        'Y' => [0x11, 0x11, 0x11, 0x0A, 0x04, 0x04, 0x04],
        'Z' => [0x1F, 0x01, 0x02, 0x04, 0x08, 0x10, 0x1F],
        '-' => [0x00, 0x00, 0x00, 0x1F, 0x00, 0x00, 0x00],
        '.' => [0x00, 0x00, 0x00, 0x00, 0x00, 0x0C, 0x0C],
        '#' => [0x0A, 0x0A, 0x1F, 0x0A, 0x1F, 0x0A, 0x0A],
        '/' => [0x00, 0x01, 0x02, 0x04, 0x08, 0x10, 0x00],
        ' ' => [0x00; 7],
        _ => UNKNOWN,
    }
}

/// Width in pixels of `text` at `scale`, including the bold stroke.
pub(crate) fn text_width(text: &str, scale: i64) -> i64 {
    let glyphs = text.chars().count() as i64;
    if glyphs == 0 {
        return 0;
    }
    (glyphs * (GLYPH_WIDTH + SPACING) - SPACING) * scale + 1
}

/// Largest integer scale at which `text` fits in a `box_size` square,
/// never below 1.
pub(crate) fn fitting_scale(text: &str, box_size: i64) -> i64 {
    let mut scale = (box_size / GLYPH_HEIGHT).max(1);
    while scale > 1 && text_width(text, scale) > box_size {
        scale -= 1;
    }
    scale
}

/// Draws `text` in bold, centered on `(cx, cy)`. Pixels outside the image
/// are skipped.
pub(crate) fn draw_text_centered(
    image: &mut RgbImage,
    text: &str,
    (cx, cy): (i64, i64),
    scale: i64,
    color: Rgb<u8>,
) {
    let width = text_width(text, scale);
    let height = GLYPH_HEIGHT * scale;
    let left = cx - width / 2;
    let top = cy - height / 2;

    for (index, c) in text.chars().enumerate() {
        let origin_x = left + index as i64 * (GLYPH_WIDTH + SPACING) * scale;
        for (row, bits) in glyph(c).iter().enumerate() {
            for col in 0..GLYPH_WIDTH {
                if bits & (0x10 >> col) == 0 {
                    continue;
                }
                let x0 = origin_x + col * scale;
                let y0 = top + row as i64 * scale;
                // One extra column per cell gives the bold stroke.
                for dy in 0..scale {
                    for dx in 0..=scale {
                        put_clipped(image, x0 + dx, y0 + dy, color);
                    }
                }
            }
        }
    }
}

pub(crate) fn put_clipped(image: &mut RgbImage, x: i64, y: i64, color: Rgb<u8>) {
    if x < 0 || y < 0 || x >= image.width() as i64 || y >= image.height() as i64 {
        return;
    }
    image.put_pixel(x as u32, y as u32, color);
}
