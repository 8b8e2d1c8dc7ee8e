//! Box rendering for evidence and live-view frames.
//!
//! Draws 2 px outlines into a copy of the frame's RGB buffer, one stable
//! colour per class label, then encodes the result as JPEG. All detections
//! that survived the confidence threshold are drawn, including classes outside
//! the interest set, so the evidence image keeps its visual context.

use anyhow::Result;

use super::backend::Detection;
use crate::frame::{encode_rgb_jpeg, Frame};

const OUTLINE_PX: u32 = 2;

const PALETTE: [[u8; 3]; 6] = [
    [230, 57, 70],   // red
    [42, 157, 143],  // teal
    [233, 196, 106], // amber
    [69, 123, 157],  // steel blue
    [144, 190, 109], // green
    [181, 101, 167], // violet
];

/// Render `detections` onto `frame` and return the annotated JPEG.
pub fn render_annotated(frame: &Frame, detections: &[Detection]) -> Result<Vec<u8>> {
    let mut pixels = frame.pixels.clone();
    for detection in detections {
        let color = class_color(&detection.label);
        draw_outline(
            &mut pixels,
            frame.width,
            frame.height,
            &detection.bbox,
            color,
        );
    }
    encode_rgb_jpeg(&pixels, frame.width, frame.height)
}

fn class_color(label: &str) -> [u8; 3] {
    let mut acc: usize = 0;
    for byte in label.bytes() {
        acc = acc.wrapping_mul(31).wrapping_add(byte as usize);
    }
    PALETTE[acc % PALETTE.len()]
}

fn draw_outline(
    pixels: &mut [u8],
    width: u32,
    height: u32,
    bbox: &crate::detect::BoundingBox,
    color: [u8; 3],
) {
    let x0 = to_px(bbox.x, width);
    let y0 = to_px(bbox.y, height);
    let x1 = to_px(bbox.x + bbox.w, width);
    let y1 = to_px(bbox.y + bbox.h, height);

    for t in 0..OUTLINE_PX {
        // Horizontal edges.
        for x in x0..=x1 {
            put(pixels, width, height, x, y0.saturating_add(t), color);
            put(pixels, width, height, x, y1.saturating_sub(t), color);
        }
        // Vertical edges.
        for y in y0..=y1 {
            put(pixels, width, height, x0.saturating_add(t), y, color);
            put(pixels, width, height, x1.saturating_sub(t), y, color);
        }
    }
}

fn to_px(normalized: f32, extent: u32) -> u32 {
    let clamped = normalized.clamp(0.0, 1.0);
    ((clamped * extent as f32) as u32).min(extent.saturating_sub(1))
}

fn put(pixels: &mut [u8], width: u32, height: u32, x: u32, y: u32, color: [u8; 3]) {
    if x >= width || y >= height {
        return;
    }
    let offset = ((y * width + x) * 3) as usize;
    pixels[offset..offset + 3].copy_from_slice(&color);
}
