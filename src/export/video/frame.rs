//! Scene frame rasterization for the video renderer.
//!
//! Paints a fixed 1280×720 RGB frame: dark background, cover-fit scene
//! image, then a translucent lower-third band with the word-wrapped
//! narrative. Glyphs come from a system font; a machine with no usable
//! font still renders the band, just without text.

use crate::defaults::{VIDEO_HEIGHT, VIDEO_MAX_LINES, VIDEO_MAX_LINE_CHARS, VIDEO_WIDTH};
use ab_glyph::{Font, FontVec, PxScale, ScaleFont};
use image::imageops::FilterType;

/// Background behind scenes without an image.
const BACKGROUND: [u8; 3] = [14, 14, 22];

/// Height of the text band in pixels.
const BAND_HEIGHT: u32 = 190;

/// Opacity of the band over the scene.
const BAND_ALPHA: f32 = 0.55;

/// Text size and line advance in pixels.
const TEXT_PX: f32 = 30.0;
const LINE_HEIGHT: u32 = 40;

/// Left/right text margin inside the band.
const TEXT_MARGIN: u32 = 64;

/// One rendered RGB24 frame.
pub struct Frame {
    pub width: u32,
    pub height: u32,
    /// Row-major RGB bytes, `width * height * 3` long.
    pub data: Vec<u8>,
}

impl Frame {
    fn filled(width: u32, height: u32, color: [u8; 3]) -> Self {
        let mut data = Vec::with_capacity((width * height * 3) as usize);
        for _ in 0..width * height {
            data.extend_from_slice(&color);
        }
        Self {
            width,
            height,
            data,
        }
    }

    fn put(&mut self, x: u32, y: u32, color: [u8; 3]) {
        if x < self.width && y < self.height {
            let idx = ((y * self.width + x) * 3) as usize;
            self.data[idx..idx + 3].copy_from_slice(&color);
        }
    }

    fn get(&self, x: u32, y: u32) -> [u8; 3] {
        let idx = ((y * self.width + x) * 3) as usize;
        [self.data[idx], self.data[idx + 1], self.data[idx + 2]]
    }

    fn blend(&mut self, x: u32, y: u32, color: [u8; 3], alpha: f32) {
        if x >= self.width || y >= self.height {
            return;
        }
        let base = self.get(x, y);
        let mixed = [
            (base[0] as f32 * (1.0 - alpha) + color[0] as f32 * alpha) as u8,
            (base[1] as f32 * (1.0 - alpha) + color[1] as f32 * alpha) as u8,
            (base[2] as f32 * (1.0 - alpha) + color[2] as f32 * alpha) as u8,
        ];
        self.put(x, y, mixed);
    }
}

/// Greedy word-wrap to at most `max_chars` per line.
///
/// Words longer than a line are hard-split rather than overflowing. The
/// caller caps the visible line count.
pub fn wrap_text(text: &str, max_chars: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut line = String::new();

    for word in text.split_whitespace() {
        let mut word = word;
        // Hard-split words that cannot fit any line
        while word.chars().count() > max_chars {
            if !line.is_empty() {
                lines.push(std::mem::take(&mut line));
            }
            let split: String = word.chars().take(max_chars).collect();
            word = &word[split.len()..];
            lines.push(split);
        }
        if word.is_empty() {
            continue;
        }

        let needed = if line.is_empty() {
            word.chars().count()
        } else {
            line.chars().count() + 1 + word.chars().count()
        };
        if needed > max_chars && !line.is_empty() {
            lines.push(std::mem::take(&mut line));
        }
        if !line.is_empty() {
            line.push(' ');
        }
        line.push_str(word);
    }
    if !line.is_empty() {
        lines.push(line);
    }
    lines
}

/// Paint one scene frame.
///
/// `image_bytes` is the encoded scene image; a decode failure degrades to
/// the bare background (the caller already logged the condition that lost
/// the image, if any).
pub fn paint_scene(image_bytes: Option<&[u8]>, narrative: &str, font: Option<&FontVec>) -> Frame {
    let mut frame = Frame::filled(VIDEO_WIDTH, VIDEO_HEIGHT, BACKGROUND);

    if let Some(bytes) = image_bytes {
        match image::load_from_memory(bytes) {
            Ok(img) => blit_cover(&mut frame, &img),
            Err(e) => {
                eprintln!("dreamquest: scene image failed to decode: {}", e);
            }
        }
    }

    draw_band(&mut frame);

    if !narrative.trim().is_empty() {
        if let Some(font) = font {
            let mut lines = wrap_text(narrative, VIDEO_MAX_LINE_CHARS);
            lines.truncate(VIDEO_MAX_LINES);
            draw_lines(&mut frame, &lines, font);
        }
    }

    frame
}

/// Scale the image with a cover fit (fill the frame, crop overflow,
/// preserve aspect) and blit it centered.
fn blit_cover(frame: &mut Frame, img: &image::DynamicImage) {
    let (iw, ih) = (img.width(), img.height());
    if iw == 0 || ih == 0 {
        return;
    }

    let scale = (frame.width as f32 / iw as f32).max(frame.height as f32 / ih as f32);
    let scaled_w = (iw as f32 * scale).round().max(1.0) as u32;
    let scaled_h = (ih as f32 * scale).round().max(1.0) as u32;

    let scaled = img
        .resize_exact(scaled_w, scaled_h, FilterType::Triangle)
        .to_rgb8();

    let off_x = (scaled_w.saturating_sub(frame.width)) / 2;
    let off_y = (scaled_h.saturating_sub(frame.height)) / 2;

    for y in 0..frame.height.min(scaled_h) {
        for x in 0..frame.width.min(scaled_w) {
            let px = scaled.get_pixel(x + off_x, y + off_y);
            frame.put(x, y, [px[0], px[1], px[2]]);
        }
    }
}

/// Translucent lower-third band the text sits on.
fn draw_band(frame: &mut Frame) {
    let top = frame.height - BAND_HEIGHT;
    for y in top..frame.height {
        for x in 0..frame.width {
            frame.blend(x, y, [0, 0, 0], BAND_ALPHA);
        }
    }
}

/// Draw wrapped lines vertically centered within the band.
fn draw_lines(frame: &mut Frame, lines: &[String], font: &FontVec) {
    let band_top = frame.height - BAND_HEIGHT;
    let text_height = lines.len() as u32 * LINE_HEIGHT;
    let mut y = band_top + (BAND_HEIGHT.saturating_sub(text_height)) / 2 + LINE_HEIGHT * 3 / 4;

    for line in lines {
        draw_line(frame, line, TEXT_MARGIN, y, font);
        y += LINE_HEIGHT;
    }
}

fn draw_line(frame: &mut Frame, text: &str, x: u32, baseline_y: u32, font: &FontVec) {
    let scaled = font.as_scaled(PxScale::from(TEXT_PX));
    let mut pen_x = x as f32;

    let mut prev_glyph = None;
    for c in text.chars() {
        let glyph_id = scaled.glyph_id(c);
        if let Some(prev) = prev_glyph {
            pen_x += scaled.kern(prev, glyph_id);
        }
        let glyph = glyph_id.with_scale_and_position(
            PxScale::from(TEXT_PX),
            ab_glyph::point(pen_x, baseline_y as f32),
        );
        if let Some(outlined) = font.outline_glyph(glyph) {
            let bounds = outlined.px_bounds();
            outlined.draw(|gx, gy, coverage| {
                let px = bounds.min.x as i32 + gx as i32;
                let py = bounds.min.y as i32 + gy as i32;
                if px >= 0 && py >= 0 {
                    frame.blend(px as u32, py as u32, [235, 231, 220], coverage);
                }
            });
        }
        pen_x += scaled.h_advance(glyph_id);
        prev_glyph = Some(glyph_id);
    }
}

/// Common system font locations, most-preferred first.
const FONT_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/usr/share/fonts/liberation-sans/LiberationSans-Regular.ttf",
    "/usr/share/fonts/truetype/noto/NotoSans-Regular.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
];

/// Load a system font for the text overlay, if one can be found.
///
/// Returning None degrades frames to image + band without glyphs — the
/// render still completes.
pub fn load_system_font() -> Option<FontVec> {
    for path in FONT_CANDIDATES {
        if let Ok(bytes) = std::fs::read(path) {
            if let Ok(font) = FontVec::try_from_vec(bytes) {
                return Some(font);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrap_respects_max_width() {
        let lines = wrap_text("the quick brown fox jumps over the lazy dog", 10);
        assert!(lines.iter().all(|l| l.chars().count() <= 10));
        assert_eq!(lines.join(" "), "the quick brown fox jumps over the lazy dog");
    }

    #[test]
    fn wrap_is_greedy() {
        let lines = wrap_text("aa bb cc dd", 5);
        assert_eq!(lines, vec!["aa bb", "cc dd"]);
    }

    #[test]
    fn wrap_hard_splits_oversized_words() {
        let lines = wrap_text("tiny incomprehensibilities end", 10);
        assert!(lines.iter().all(|l| l.chars().count() <= 10));
        assert!(lines.concat().contains("incompr"));
    }

    #[test]
    fn wrap_empty_text_yields_no_lines() {
        assert!(wrap_text("", 10).is_empty());
        assert!(wrap_text("   ", 10).is_empty());
    }

    #[test]
    fn frame_has_fixed_geometry() {
        let frame = paint_scene(None, "", None);
        assert_eq!(frame.width, 1280);
        assert_eq!(frame.height, 720);
        assert_eq!(frame.data.len(), 1280 * 720 * 3);
    }

    #[test]
    fn background_fills_imageless_frame() {
        let frame = paint_scene(None, "", None);
        assert_eq!(frame.get(640, 100), BACKGROUND);
    }

    #[test]
    fn band_darkens_lower_third() {
        let frame = paint_scene(None, "", None);
        let above = frame.get(640, frame.height - BAND_HEIGHT - 10);
        let inside = frame.get(640, frame.height - BAND_HEIGHT / 2);
        assert!(inside[0] < above[0]);
    }

    #[test]
    fn broken_image_degrades_to_background() {
        let frame = paint_scene(Some(b"not an image"), "", None);
        assert_eq!(frame.get(640, 100), BACKGROUND);
    }

    #[test]
    fn cover_fit_fills_entire_frame() {
        // A 2x2 solid white PNG, scaled to cover 1280x720
        let mut png = Vec::new();
        let img = image::RgbImage::from_pixel(2, 2, image::Rgb([255, 255, 255]));
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut std::io::Cursor::new(&mut png), image::ImageFormat::Png)
            .unwrap();

        let frame = paint_scene(Some(&png), "", None);
        // Corners above the band are image, not background
        assert_eq!(frame.get(0, 0), [255, 255, 255]);
        assert_eq!(frame.get(frame.width - 1, 0), [255, 255, 255]);
        assert_eq!(frame.get(640, 360), [255, 255, 255]);
    }

    #[test]
    fn cover_fit_crops_wide_images_centrally() {
        // Wide image: left half red, right half blue. Cover fit on 16:9
        // from 4:1 crops the sides; the center column keeps both colors
        // meeting in the middle.
        let mut img = image::RgbImage::new(400, 100);
        for (x, _, px) in img.enumerate_pixels_mut() {
            *px = if x < 200 {
                image::Rgb([255, 0, 0])
            } else {
                image::Rgb([0, 0, 255])
            };
        }
        let mut png = Vec::new();
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut std::io::Cursor::new(&mut png), image::ImageFormat::Png)
            .unwrap();

        let frame = paint_scene(Some(&png), "", None);
        let left = frame.get(10, 100);
        let right = frame.get(frame.width - 10, 100);
        assert!(left[0] > 200 && left[2] < 50, "left should be red: {:?}", left);
        assert!(right[2] > 200 && right[0] < 50, "right should be blue: {:?}", right);
    }

    #[test]
    fn text_marks_pixels_when_font_available() {
        let Some(font) = load_system_font() else {
            // Machine has no system fonts; the degraded path is the test
            return;
        };
        let without = paint_scene(None, "", None);
        let with = paint_scene(None, "The quick brown fox jumps.", Some(&font));
        assert_ne!(without.data, with.data);
    }
}
