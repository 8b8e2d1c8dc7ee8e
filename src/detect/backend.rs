//! Detector boundary trait.

use anyhow::Result;

use crate::frame::Frame;

/// One candidate detection from the external model.
#[derive(Clone, Debug, PartialEq)]
pub struct Detection {
    /// Class label as the model names it ("person", "vehicle", ...).
    pub label: String,
    /// Model confidence, 0.0..=1.0.
    pub confidence: f32,
    pub bbox: BoundingBox,
}

/// Axis-aligned box in normalized 0..1 frame coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

/// External object detector: one frame in, candidate detections out.
///
/// Implementations run synchronously from the calling supervisor's point of
/// view and must not retain the frame beyond the call. Returning an empty list
/// is not an error.
pub trait Detector: Send + Sync {
    /// Backend identifier, for logs.
    fn name(&self) -> &'static str;

    /// Run inference on a frame.
    fn infer(&self, frame: &Frame) -> Result<Vec<Detection>>;
}
