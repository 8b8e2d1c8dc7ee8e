//! Capture-handle lifecycle and freshest-frame sampling.
//!
//! `CaptureBackend` is the decoder boundary: given a resolved URL it opens a
//! `CaptureHandle`, a stateful decode session the registry owns exclusively.
//! Supervisors never hold a handle; they borrow one inside
//! [`registry::CaptureRegistry::with_handle`] for the duration of a single
//! sampling call.

mod registry;
mod sampler;
mod stub;

pub use registry::CaptureRegistry;
pub use sampler::{sample_latest, SamplerConfig};
pub use stub::{StubCaptureBackend, StubHandle};

use crate::frame::Frame;
use anyhow::Result;

/// One open decode session bound to a resolved stream URL.
pub trait CaptureHandle: Send {
    /// Advance the decode position without materializing pixel data.
    /// Used to discard buffered frames cheaply.
    fn advance(&mut self) -> Result<()>;

    /// Decode and return the frame at the current position.
    fn materialize(&mut self) -> Result<Frame>;

    /// False once the session is broken or the source ended; the registry
    /// reopens on the next acquire.
    fn is_open(&self) -> bool;

    /// Release decoder resources. Idempotent.
    fn close(&mut self);
}

/// Opens capture handles for resolved URLs.
pub trait CaptureBackend: Send + Sync {
    fn open(&self, url: &str) -> Result<Box<dyn CaptureHandle>>;
}
