//! Raw frame container and JPEG encoding.
//!
//! Frames are packed RGB8. The capture layer produces them; the detect layer
//! reads them and draws annotations into a copy before encoding.

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use image::codecs::jpeg::JpegEncoder;
use image::{ExtendedColorType, ImageEncoder};

/// One decoded frame from a stream.
#[derive(Clone, Debug)]
pub struct Frame {
    /// Packed RGB8, row-major, no stride padding.
    pub pixels: Vec<u8>,
    pub width: u32,
    pub height: u32,
    /// Wall-clock time at materialization.
    pub captured_at: DateTime<Utc>,
}

impl Frame {
    pub fn new(pixels: Vec<u8>, width: u32, height: u32) -> Result<Self> {
        let expected = (width as usize) * (height as usize) * 3;
        if pixels.len() != expected {
            return Err(anyhow!(
                "frame buffer size mismatch: got {} bytes, expected {} for {}x{} RGB",
                pixels.len(),
                expected,
                width,
                height
            ));
        }
        Ok(Self {
            pixels,
            width,
            height,
            captured_at: Utc::now(),
        })
    }

    /// Encode the frame as JPEG.
    pub fn encode_jpeg(&self) -> Result<Vec<u8>> {
        encode_rgb_jpeg(&self.pixels, self.width, self.height)
    }
}

const JPEG_QUALITY: u8 = 85;

/// Encode a packed RGB8 buffer as JPEG.
pub fn encode_rgb_jpeg(pixels: &[u8], width: u32, height: u32) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY);
    encoder
        .write_image(pixels, width, height, ExtendedColorType::Rgb8)
        .context("encode frame as jpeg")?;
    Ok(out)
}
