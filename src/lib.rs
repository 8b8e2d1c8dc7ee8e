//! skywatch - multi-stream detection orchestration
//!
//! This crate runs one detection loop per configured video stream:
//!
//! 1. `capture`: capture-handle lifecycle (open, reuse, reconnect-on-demand)
//!    and freshest-frame sampling
//! 2. `detect`: external detector boundary plus threshold/interest filtering
//!    and frame annotation
//! 3. `live_cache`: latest annotated frame per stream, read by viewers on
//!    their own cadence
//! 4. `suppress`: per (stream, class) cooldown so repeated sightings do not
//!    re-alert inside the window
//! 5. `persist`: evidence JPEG storage (local disk or remote object store)
//! 6. `notify`: best-effort HTTP POST to the downstream event receiver
//! 7. `supervisor`: the per-stream cycle state machine and failure containment
//!
//! A stream's failure never halts another stream; each supervisor owns its
//! cycle end to end and only shares the three locked stores (capture registry,
//! live cache, suppression map).

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

pub mod api;
pub mod capture;
pub mod config;
pub mod detect;
pub mod error;
pub mod frame;
pub mod live_cache;
pub mod notify;
pub mod persist;
pub mod resolve;
pub mod suppress;
pub mod supervisor;

pub use capture::{
    CaptureBackend, CaptureHandle, CaptureRegistry, SamplerConfig, StubCaptureBackend,
};
pub use detect::{
    Detection, DetectionAdapter, DetectionOutcome, Detector, HttpDetector, StubDetector,
};
pub use error::{CycleFailure, FailureKind};
pub use frame::Frame;
pub use live_cache::{CachedFrame, LiveViewCache};
pub use notify::{DetectionEvent, HttpNotifier, Notifier};
pub use persist::{HttpObjectStore, ImageStore, LocalImageStore, PersistenceDispatcher};
pub use resolve::{DirectResolver, SourceResolver, StreamlinkResolver};
pub use suppress::SuppressionEngine;
pub use supervisor::{CycleReport, DetectionEngine, StreamSupervisor};

/// Identity of one configured stream. Immutable for the stream's lifetime.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct StreamSource {
    /// Stable numeric id (e.g. a CCTV identifier).
    pub id: u32,
    /// Source locator. Either a directly decodable URL or something the
    /// configured resolver turns into one (e.g. a YouTube page URL).
    pub locator: String,
}

impl StreamSource {
    pub fn new(id: u32, locator: impl Into<String>) -> Self {
        Self {
            id,
            locator: locator.into(),
        }
    }
}

/// Seconds since the Unix epoch. Fails only if the system clock predates 1970.
pub fn now_s() -> Result<u64> {
    Ok(SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs())
}
