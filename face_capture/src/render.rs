use crate::frame::Frame;
use face_proto::Detection;
use image::{Rgb, RgbImage};
use std::fmt;

pub const STROKE_WIDTH: i64 = 4;
/// Gap between the bottom of a label and the top edge of its box.
pub const LABEL_OFFSET: i64 = 10;
const FONT_SCALE: i64 = 3;
const GLYPH_WIDTH: i64 = 5;
const GLYPH_HEIGHT: i64 = 7;
const GLYPH_ADVANCE: i64 = GLYPH_WIDTH + 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityColor {
    Alert,
    Match,
}

impl IdentityColor {
    pub fn for_detection(detection: &Detection) -> Self {
        if detection.is_unknown() {
            IdentityColor::Alert
        } else {
            IdentityColor::Match
        }
    }

    pub fn rgb(self) -> Rgb<u8> {
        match self {
            IdentityColor::Alert => Rgb([0xff, 0x38, 0x60]),
            IdentityColor::Match => Rgb([0x00, 0xd1, 0xb2]),
        }
    }

    pub fn hex(self) -> &'static str {
        match self {
            IdentityColor::Alert => "#ff3860",
            IdentityColor::Match => "#00d1b2",
        }
    }
}

/// One line of the result list, in detection order.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultEntry {
    pub name: String,
    pub score: Option<f64>,
    pub color: IdentityColor,
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl fmt::Display for ResultEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.score {
            Some(score) => write!(f, "{} — Match: {:.2}", self.name, score),
            None => write!(f, "{}", self.name),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RenderedResult {
    pub image: RgbImage,
    pub entries: Vec<ResultEntry>,
}

impl RenderedResult {
    pub fn face_count(&self) -> usize {
        self.entries.len()
    }

    pub fn summary(&self) -> String {
        format!("Faces Detected: {}", self.face_count())
    }
}

/// Draws every detection onto a copy of `frame` and builds the result list.
/// The input frame is left untouched.
pub fn render(frame: &Frame, detections: &[Detection]) -> RenderedResult {
    let mut image = frame.pixels.clone();
    let mut entries = Vec::with_capacity(detections.len());

    for detection in detections {
        let color = IdentityColor::for_detection(detection);
        let x = detection.x as i64;
        let y = detection.y as i64;

        stroke_rect(
            &mut image,
            x,
            y,
            detection.w as i64,
            detection.h as i64,
            color.rgb(),
        );
        draw_label(
            &mut image,
            x,
            y - LABEL_OFFSET - GLYPH_HEIGHT * FONT_SCALE,
            &detection.name,
            color.rgb(),
        );

        entries.push(ResultEntry {
            name: detection.name.clone(),
            score: detection.match_score(),
            color,
            x: detection.x,
            y: detection.y,
            w: detection.w,
            h: detection.h,
        });
    }

    RenderedResult { image, entries }
}

fn put_pixel(image: &mut RgbImage, x: i64, y: i64, color: Rgb<u8>) {
    if x < 0 || y < 0 || x >= image.width() as i64 || y >= image.height() as i64 {
        return;
    }
    image.put_pixel(x as u32, y as u32, color);
}

fn fill_rect(image: &mut RgbImage, left: i64, top: i64, right: i64, bottom: i64, color: Rgb<u8>) {
    let left = left.max(0);
    let top = top.max(0);
    let right = right.min(image.width() as i64 - 1);
    let bottom = bottom.min(image.height() as i64 - 1);

    for y in top..=bottom {
        for x in left..=right {
            put_pixel(image, x, y, color);
        }
    }
}

/// Outline of `w`x`h` at `(x, y)`, stroke laid inside the box edge.
fn stroke_rect(image: &mut RgbImage, x: i64, y: i64, w: i64, h: i64, color: Rgb<u8>) {
    if w <= 0 || h <= 0 {
        return;
    }
    let right = x + w - 1;
    let bottom = y + h - 1;
    let stroke = STROKE_WIDTH.min(w).min(h);

    fill_rect(image, x, y, right, y + stroke - 1, color);
    fill_rect(image, x, bottom - stroke + 1, right, bottom, color);
    fill_rect(image, x, y, x + stroke - 1, bottom, color);
    fill_rect(image, right - stroke + 1, y, right, bottom, color);
}

fn draw_label(image: &mut RgbImage, mut x: i64, top: i64, text: &str, color: Rgb<u8>) {
    for ch in text.chars().flat_map(|c| c.to_uppercase()) {
        let glyph = glyph_bits(ch).unwrap_or(UNKNOWN_GLYPH);
        for (row, pattern) in glyph.iter().enumerate() {
            for col in 0..GLYPH_WIDTH {
                if (pattern >> (GLYPH_WIDTH - 1 - col)) & 1 == 1 {
                    let px = x + col * FONT_SCALE;
                    let py = top + row as i64 * FONT_SCALE;
                    fill_rect(
                        image,
                        px,
                        py,
                        px + FONT_SCALE - 1,
                        py + FONT_SCALE - 1,
                        color,
                    );
                }
            }
        }
        x += GLYPH_ADVANCE * FONT_SCALE;
    }
}

const UNKNOWN_GLYPH: [u8; 7] = [
    0b01110, 0b10001, 0b00001, 0b00110, 0b00100, 0b00000, 0b00100,
];

fn glyph_bits(ch: char) -> Option<[u8; 7]> {
    let bits = match ch {
        'A' => [0b01110, 0b10001, 0b10001, 0b11111, 0b10001, 0b10001, 0b10001],
        'B' => [0b11110, 0b10001, 0b10001, 0b11110, 0b10001, 0b10001, 0b11110],
        'C' => [0b01110, 0b10001, 0b10000, 0b10000, 0b10000, 0b10001, 0b01110],
        'D' => [0b11100, 0b10010, 0b10001, 0b10001, 0b10001, 0b10010, 0b11100],
        'E' => [0b11111, 0b10000, 0b11110, 0b10000, 0b10000, 0b10000, 0b11111],
        'F' => [0b11111, 0b10000, 0b11110, 0b10000, 0b10000, 0b10000, 0b10000],
        'G' => [0b01110, 0b10001, 0b10000, 0b10111, 0b10001, 0b10001, 0b01111],
        'H' => [0b10001, 0b10001, 0b10001, 0b11111, 0b10001, 0b10001, 0b10001],
        'I' => [0b01110, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100, 0b01110],
        'J' => [0b00111, 0b00010, 0b00010, 0b00010, 0b00010, 0b10010, 0b01100],
        'K' => [0b10001, 0b10010, 0b10100, 0b11000, 0b10100, 0b10010, 0b10001],
        'L' => [0b10000, 0b10000, 0b10000, 0b10000, 0b10000, 0b10000, 0b11111],
        'M' => [0b10001, 0b11011, 0b10101, 0b10101, 0b10001, 0b10001, 0b10001],
        'N' => [0b10001, 0b11001, 0b10101, 0b10101, 0b10011, 0b10001, 0b10001],
        'O' => [0b01110, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b01110],
        'P' => [0b11110, 0b10001, 0b10001, 0b11110, 0b10000, 0b10000, 0b10000],
        'Q' => [0b01110, 0b10001, 0b10001, 0b10001, 0b10101, 0b10010, 0b01101],
        'R' => [0b11110, 0b10001, 0b10001, 0b11110, 0b10100, 0b10010, 0b10001],
        'S' => [0b01111, 0b10000, 0b01110, 0b00001, 0b00001, 0b10001, 0b01110],
        'T' => [0b11111, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100],
        'U' => [0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b01110],
        'V' => [0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b01010, 0b00100],
        'W' => [0b10001, 0b10001, 0b10001, 0b10101, 0b10101, 0b11011, 0b10001],
        'X' => [0b10001, 0b10001, 0b01010, 0b00100, 0b01010, 0b10001, 0b10001],
        'Y' => [0b10001, 0b10001, 0b01010, 0b00100, 0b00100, 0b00100, 0b00100],
        'Z' => [0b11111, 0b00001, 0b00010, 0b00100, 0b01000, 0b10000, 0b11111],
        '0' => [0b01110, 0b10001, 0b10011, 0b10101, 0b11001, 0b10001, 0b01110],
        '1' => [0b00100, 0b01100, 0b00100, 0b00100, 0b00100, 0b00100, 0b01110],
        '2' => [0b01110, 0b10001, 0b00001, 0b00010, 0b00100, 0b01000, 0b11111],
        '3' => [0b11110, 0b00001, 0b00001, 0b01110, 0b00001, 0b00001, 0b11110],
        '4' => [0b00010, 0b00110, 0b01010, 0b10010, 0b11111, 0b00010, 0b00010],
        '5' => [0b11111, 0b10000, 0b11110, 0b00001, 0b00001, 0b10001, 0b01110],
        '6' => [0b00110, 0b01000, 0b10000, 0b11110, 0b10001, 0b10001, 0b01110],
        '7' => [0b11111, 0b00001, 0b00010, 0b00100, 0b01000, 0b01000, 0b01000],
        '8' => [0b01110, 0b10001, 0b10001, 0b01110, 0b10001, 0b10001, 0b01110],
        '9' => [0b01110, 0b10001, 0b10001, 0b01111, 0b00001, 0b00010, 0b01100],
        '-' => [0, 0, 0, 0b11111, 0, 0, 0],
        '_' => [0, 0, 0, 0, 0, 0, 0b11111],
        '.' => [0, 0, 0, 0, 0, 0b00110, 0b00110],
        '\'' => [0b00100, 0b00100, 0b01000, 0, 0, 0, 0],
        ' ' => [0; 7],
        _ => return None,
    };
    Some(bits)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BACKGROUND: Rgb<u8> = Rgb([20, 20, 20]);

    fn frame() -> Frame {
        Frame::new(RgbImage::from_pixel(320, 240, BACKGROUND))
    }

    fn detection(name: &str, distance: f64, x: i32, y: i32, w: i32, h: i32) -> Detection {
        Detection {
            name: name.to_string(),
            distance: Some(distance),
            x,
            y,
            w,
            h,
        }
    }

    #[test]
    fn test_matched_identity() {
        let result = render(&frame(), &[detection("Alice", 0.12, 10, 20, 100, 120)]);

        assert_eq!(result.face_count(), 1);
        assert_eq!(result.summary(), "Faces Detected: 1");
        assert_eq!(result.entries[0].to_string(), "Alice — Match: 0.88");
        assert_eq!(result.entries[0].score, Some(0.88));
        assert_eq!(result.entries[0].color, IdentityColor::Match);

        let match_rgb = IdentityColor::Match.rgb();
        assert_eq!(*result.image.get_pixel(10, 20), match_rgb);
        assert_eq!(*result.image.get_pixel(13, 80), match_rgb);
        assert_eq!(*result.image.get_pixel(109, 139), match_rgb);
        assert_eq!(*result.image.get_pixel(60, 80), BACKGROUND);
        assert_eq!(*result.image.get_pixel(14, 80), BACKGROUND);
    }

    #[test]
    fn test_unknown_identity() {
        let result = render(&frame(), &[detection("Unknown", 0.9, 5, 5, 50, 50)]);

        assert_eq!(result.entries[0].to_string(), "Unknown");
        assert_eq!(result.entries[0].score, None);
        assert_eq!(result.entries[0].color, IdentityColor::Alert);
        assert_eq!(*result.image.get_pixel(5, 5), IdentityColor::Alert.rgb());
        assert_eq!(*result.image.get_pixel(54, 54), IdentityColor::Alert.rgb());
    }

    #[test]
    fn test_entries_follow_detection_order() {
        let detections = vec![
            detection("Unknown", 1.0, 200, 100, 40, 40),
            detection("Bob", 0.3, 20, 100, 40, 40),
            detection("Alice", 0.25, 100, 100, 40, 40),
        ];
        let result = render(&frame(), &detections);

        let names: Vec<_> = result.entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["Unknown", "Bob", "Alice"]);
        assert_eq!(result.face_count(), detections.len());
        assert_eq!(result.entries[1].score, Some(0.7));
        assert_eq!(result.entries[2].score, Some(0.75));
    }

    #[test]
    fn test_label_sits_above_box_in_same_color() {
        let result = render(&frame(), &[detection("Alice", 0.1, 10, 60, 80, 80)]);

        let label_top = 60 - LABEL_OFFSET - GLYPH_HEIGHT * FONT_SCALE;
        // Top row of 'A' is 0b01110, so its second column is lit.
        let lit = result
            .image
            .get_pixel((10 + FONT_SCALE) as u32, label_top as u32);
        assert_eq!(*lit, IdentityColor::Match.rgb());
        // The gap between label and box stays clear.
        assert_eq!(*result.image.get_pixel(12, 55), BACKGROUND);
    }

    #[test]
    fn test_render_is_pure_and_deterministic() {
        let input = frame();
        let detections = vec![detection("Carol", 0.2, 30, 40, 60, 60)];

        let first = render(&input, &detections);
        let second = render(&input, &detections);

        assert!(input.pixels.pixels().all(|p| *p == BACKGROUND));
        assert_eq!(first.image, second.image);
        assert_eq!(first.entries, second.entries);
    }

    #[test]
    fn test_boxes_outside_the_frame_are_clipped() {
        let detections = vec![
            detection("Unknown", 1.0, -30, -30, 60, 60),
            detection("Dave", 0.4, 300, 220, 100, 100),
            detection("Empty", 0.4, 50, 50, 0, 0),
        ];
        let result = render(&frame(), &detections);

        assert_eq!(result.face_count(), 3);
        assert_eq!(*result.image.get_pixel(0, 26), IdentityColor::Alert.rgb());
        assert_eq!(*result.image.get_pixel(300, 239), IdentityColor::Match.rgb());
    }

    #[test]
    fn test_unsupported_characters_draw_fallback_glyph() {
        assert!(glyph_bits('É').is_none());
        let accented = render(&frame(), &[detection("É", 0.1, 10, 60, 80, 80)]);
        let other = render(&frame(), &[detection("Ø", 0.1, 10, 60, 80, 80)]);

        let top = 60 - LABEL_OFFSET - GLYPH_HEIGHT * FONT_SCALE;
        let bottom_row = top + 6 * FONT_SCALE;
        let lit = IdentityColor::Match.rgb();
        // First row of the fallback is 0b01110, last row 0b00100.
        assert_eq!(*accented.image.get_pixel(10, top as u32), BACKGROUND);
        assert_eq!(*accented.image.get_pixel((10 + FONT_SCALE) as u32, top as u32), lit);
        assert_eq!(*accented.image.get_pixel((10 + 2 * FONT_SCALE) as u32, bottom_row as u32), lit);
        assert_eq!(*accented.image.get_pixel((10 + FONT_SCALE) as u32, bottom_row as u32), BACKGROUND);
        assert_eq!(accented.image, other.image);
        // The list keeps the name as sent.
        assert_eq!(accented.entries[0].name, "É");
    }

    #[test]
    fn test_no_detections() {
        let input = frame();
        let result = render(&input, &[]);

        assert_eq!(result.summary(), "Faces Detected: 0");
        assert_eq!(result.image, input.pixels);
    }
}
