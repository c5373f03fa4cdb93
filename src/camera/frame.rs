use std::io::Cursor;

use anyhow::{Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Utc};
use image::{codecs::jpeg::JpegEncoder, Rgb, RgbImage};
use imageproc::{drawing::draw_filled_rect_mut, rect::Rect};

pub const JPEG_QUALITY: u8 = 80;

pub const STUB_BACKGROUND: [u8; 3] = [40, 40, 40];
pub const STUB_LABEL_COLOR: [u8; 3] = [255, 255, 255];
pub const READ_FAILURE_COLOR: [u8; 3] = [255, 255, 255];
const STUB_LABEL: &str = "STUB STREAM";

/// One decoded RGB image (height × width × 3, 8-bit).
#[derive(Debug, Clone)]
pub struct Frame {
    pub image: RgbImage,
    pub captured_at: DateTime<Utc>,
}

impl Frame {
    pub fn new(image: RgbImage) -> Self {
        Self {
            image,
            captured_at: Utc::now(),
        }
    }

    pub fn solid(width: u32, height: u32, color: [u8; 3]) -> Self {
        Self::new(RgbImage::from_pixel(width.max(1), height.max(1), Rgb(color)))
    }

    /// Dark placeholder with a "STUB STREAM" label, used when no camera is available.
    pub fn stub(width: u32, height: u32) -> Self {
        let mut frame = Self::solid(width, height, STUB_BACKGROUND);
        draw_label(&mut frame.image, STUB_LABEL, 20, 20, 3, STUB_LABEL_COLOR);
        frame
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn to_jpeg(&self) -> Result<Vec<u8>> {
        let mut buffer = Cursor::new(Vec::new());
        JpegEncoder::new_with_quality(&mut buffer, JPEG_QUALITY)
            .encode_image(&self.image)
            .context("failed to encode frame as JPEG")?;
        Ok(buffer.into_inner())
    }

    pub fn to_data_uri(&self) -> Result<String> {
        Ok(jpeg_data_uri(&self.to_jpeg()?))
    }
}

pub fn jpeg_data_uri(jpeg: &[u8]) -> String {
    format!("data:image/jpeg;base64,{}", STANDARD.encode(jpeg))
}

/// 1×1 image sent before the first frame has been produced.
pub fn empty_frame_data_uri() -> Result<String> {
    Frame::solid(1, 1, [0, 0, 0]).to_data_uri()
}

// 5×7 glyphs, one byte per row, low 5 bits used (MSB on the left).
fn glyph(ch: char) -> Option<[u8; 7]> {
    let rows = match ch {
        'A' => [0b01110, 0b10001, 0b10001, 0b11111, 0b10001, 0b10001, 0b10001],
        'B' => [0b11110, 0b10001, 0b10001, 0b11110, 0b10001, 0b10001, 0b11110],
        'E' => [0b11111, 0b10000, 0b10000, 0b11110, 0b10000, 0b10000, 0b11111],
        'M' => [0b10001, 0b11011, 0b10101, 0b10101, 0b10001, 0b10001, 0b10001],
        'R' => [0b11110, 0b10001, 0b10001, 0b11110, 0b10100, 0b10010, 0b10001],
        'S' => [0b01111, 0b10000, 0b10000, 0b01110, 0b00001, 0b00001, 0b11110],
        'T' => [0b11111, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100],
        'U' => [0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b01110],
        ' ' => [0; 7],
        _ => return None,
    };
    Some(rows)
}

/// Each lit glyph cell becomes a `scale`-sized block; `draw_filled_rect_mut`
/// clips blocks that fall outside the image.
fn draw_label(image: &mut RgbImage, text: &str, x: u32, y: u32, scale: u32, color: [u8; 3]) {
    let advance = 6 * scale;
    for (i, ch) in text.chars().enumerate() {
        let Some(rows) = glyph(ch) else {
            continue;
        };
        let origin_x = x + i as u32 * advance;
        for (row, &bits) in rows.iter().enumerate() {
            for col in (0..5u32).filter(|col| bits & (1u8 << (4 - col)) != 0) {
                let cell = Rect::at(
                    (origin_x + col * scale) as i32,
                    (y + row as u32 * scale) as i32,
                )
                .of_size(scale, scale);
                draw_filled_rect_mut(image, cell, Rgb(color));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stub_frame_has_background_and_label() {
        let frame = Frame::stub(640, 480);
        assert_eq!((frame.width(), frame.height()), (640, 480));
        assert_eq!(frame.image.get_pixel(600, 400).0, STUB_BACKGROUND);

        let lit = frame
            .image
            .pixels()
            .filter(|p| p.0 == STUB_LABEL_COLOR)
            .count();
        assert!(lit > 0);
        // First row of the leading 'S' starts one cell in.
        assert_eq!(frame.image.get_pixel(20, 20).0, STUB_BACKGROUND);
        assert_eq!(frame.image.get_pixel(23, 20).0, STUB_LABEL_COLOR);
    }

    #[test]
    fn label_is_clipped_on_tiny_frames() {
        let frame = Frame::stub(8, 8);
        assert_eq!((frame.width(), frame.height()), (8, 8));
    }

    #[test]
    fn data_uri_is_base64_jpeg() {
        let uri = Frame::solid(4, 4, READ_FAILURE_COLOR).to_data_uri().unwrap();
        let payload = uri.strip_prefix("data:image/jpeg;base64,").unwrap();
        let bytes = STANDARD.decode(payload).unwrap();
        // JPEG SOI marker
        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn empty_frame_uri_decodes() {
        let uri = empty_frame_data_uri().unwrap();
        assert!(uri.starts_with("data:image/jpeg;base64,"));
    }
}
