//! Detector backends.
//!
//! `http`: remote model server (frame JPEG in, JSON detections out).
//! `stub`: scripted detector for tests and `stub://` runs.

pub mod http;
pub mod stub;
