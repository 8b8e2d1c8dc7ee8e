//! Object detection boundary and result shaping.
//!
//! The detector itself is external: frame in, list of labelled boxes out.
//! `DetectionAdapter` applies the confidence threshold, counts interest
//! classes, and renders the annotated evidence JPEG.

mod adapter;
mod annotate;
mod backend;
pub mod backends;

pub use adapter::{DetectionAdapter, DetectionOutcome};
pub use annotate::render_annotated;
pub use backend::{BoundingBox, Detection, Detector};
pub use backends::http::HttpDetector;
pub use backends::stub::StubDetector;
