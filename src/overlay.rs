use std::collections::HashMap;

use image::{Rgb, RgbImage};
use imageproc::drawing::draw_line_segment_mut;

use crate::{
    codes::{ScanSession, TrackedCode},
    vision::geometry::Polygon,
};

const OUTLINE: Rgb<u8> = Rgb([0, 255, 0]);
const TEXT: Rgb<u8> = Rgb([0, 255, 0]);
const TEXT_BACKGROUND: Rgb<u8> = Rgb([0, 0, 0]);
const TEXT_SCALE: i32 = 3;
const MARGIN: i32 = 10;

/// Copy of `frame` with every tracked outline and the status text drawn on it.
pub fn render(
    frame: &RgbImage,
    tracked: &HashMap<String, TrackedCode>,
    unique: usize,
    session: &ScanSession,
) -> RgbImage {
    let mut image = frame.clone();

    for code in tracked.values() {
        draw_outline(&mut image, &code.polygon, OUTLINE);
    }

    let mut y = MARGIN;
    for line in status_lines(unique, session) {
        draw_text(&mut image, MARGIN, y, &line);
        y += 9 * TEXT_SCALE;
    }

    image
}

pub fn status_lines(unique: usize, session: &ScanSession) -> Vec<String> {
    let mut lines = vec![format!("CODES: {unique}")];
    if let Some(elapsed) = session.milestone {
        lines.push(format!("TIME: {:.2}S", elapsed.as_secs_f64()));
    }
    lines
}

fn draw_outline(image: &mut RgbImage, polygon: &Polygon, color: Rgb<u8>) {
    if polygon.len() < 2 {
        return;
    }

    for (i, start) in polygon.iter().enumerate() {
        let end = polygon[(i + 1) % polygon.len()];
        let (sx, sy) = (start.x as f32, start.y as f32);
        let (ex, ey) = (end.x as f32, end.y as f32);

        // widen across the minor axis
        let (ox, oy) = if (ey - sy).abs() > (ex - sx).abs() {
            (1.0, 0.0)
        } else {
            (0.0, 1.0)
        };
        draw_line_segment_mut(image, (sx, sy), (ex, ey), color);
        draw_line_segment_mut(image, (sx + ox, sy + oy), (ex + ox, ey + oy), color);
    }
}

fn fill_rect(image: &mut RgbImage, left: i32, top: i32, right: i32, bottom: i32, color: Rgb<u8>) {
    let width = image.width() as i32;
    let height = image.height() as i32;
    let left = left.max(0);
    let top = top.max(0);
    let right = right.min(width - 1);
    let bottom = bottom.min(height - 1);

    for y in top..=bottom {
        for x in left..=right {
            image.put_pixel(x as u32, y as u32, color);
        }
    }
}

fn draw_text(image: &mut RgbImage, x: i32, y: i32, text: &str) {
    let advance = 6 * TEXT_SCALE;
    let width = text.chars().count() as i32 * advance;
    fill_rect(
        image,
        x - TEXT_SCALE,
        y - TEXT_SCALE,
        x + width,
        y + 8 * TEXT_SCALE,
        TEXT_BACKGROUND,
    );

    let mut cx = x;
    for ch in text.chars().flat_map(|c| c.to_uppercase()) {
        if let Some(glyph) = glyph_bits(ch) {
            for (row, pattern) in glyph.iter().enumerate() {
                for col in 0..5 {
                    if (pattern >> (4 - col)) & 1 == 1 {
                        let px = cx + col * TEXT_SCALE;
                        let py = y + row as i32 * TEXT_SCALE;
                        fill_rect(
                            image,
                            px,
                            py,
                            px + TEXT_SCALE - 1,
                            py + TEXT_SCALE - 1,
                            TEXT,
                        );
                    }
                }
            }
        }
        cx += advance;
    }
}

fn glyph_bits(ch: char) -> Option<[u8; 7]> {
    match ch {
        'C' => Some([
            0b01110, 0b10001, 0b10000, 0b10000, 0b10000, 0b10001, 0b01110,
        ]),
        'D' => Some([
            0b11110, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b11110,
        ]),
        'E' => Some([
            0b11111, 0b10000, 0b11110, 0b10000, 0b10000, 0b10000, 0b11111,
        ]),
        'I' => Some([
            0b01110, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100, 0b01110,
        ]),
        'O' => Some([
            0b01110, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b01110,
        ]),
        'S' => Some([
            0b01111, 0b10000, 0b01110, 0b00001, 0b00001, 0b10001, 0b01110,
        ]),
        'T' => Some([
            0b11111, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100,
        ]),
        '0' => Some([
            0b01110, 0b10001, 0b10011, 0b10101, 0b11001, 0b10001, 0b01110,
        ]),
        '1' => Some([
            0b00100, 0b01100, 0b00100, 0b00100, 0b00100, 0b00100, 0b01110,
        ]),
        '2' => Some([
            0b01110, 0b10001, 0b00001, 0b00010, 0b00100, 0b01000, 0b11111,
        ]),
        '3' => Some([
            0b11110, 0b00001, 0b00001, 0b01110, 0b00001, 0b00001, 0b11110,
        ]),
        '4' => Some([
            0b00010, 0b00110, 0b01010, 0b10010, 0b11111, 0b00010, 0b00010,
        ]),
        '5' => Some([
            0b11111, 0b10000, 0b11110, 0b00001, 0b00001, 0b10001, 0b01110,
        ]),
        '6' => Some([
            0b00110, 0b01000, 0b10000, 0b11110, 0b10001, 0b10001, 0b01110,
        ]),
        '7' => Some([
            0b11111, 0b00001, 0b00010, 0b00100, 0b01000, 0b01000, 0b01000,
        ]),
        '8' => Some([
            0b01110, 0b10001, 0b10001, 0b01110, 0b10001, 0b10001, 0b01110,
        ]),
        '9' => Some([
            0b01110, 0b10001, 0b10001, 0b01111, 0b00001, 0b00010, 0b01100,
        ]),
        ':' => Some([0, 0b00110, 0b00110, 0, 0b00110, 0b00110, 0]),
        '.' => Some([0, 0, 0, 0, 0, 0b00110, 0b00110]),
        ' ' => Some([0, 0, 0, 0, 0, 0, 0]),
        _ => None,
    }
}
