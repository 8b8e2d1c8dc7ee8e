//! Latest annotated frame per stream.
//!
//! The cache decouples the viewer read path from the detection cadence: a
//! publish overwrites the entry, reads return the last published frame (or
//! nothing before the first cycle completes). The lock is held only for the
//! single map operation, never across a detection cycle, so a read can only
//! ever wait out one in-progress publish.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};

/// The most recent annotated frame for one stream.
#[derive(Clone, Debug)]
pub struct CachedFrame {
    pub jpeg: Arc<Vec<u8>>,
    pub captured_at: DateTime<Utc>,
}

#[derive(Default)]
pub struct LiveViewCache {
    frames: Mutex<HashMap<u32, CachedFrame>>,
}

impl LiveViewCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite the cached entry for `stream_id`.
    pub fn publish(&self, stream_id: u32, jpeg: Arc<Vec<u8>>, captured_at: DateTime<Utc>) {
        let Ok(mut frames) = self.frames.lock() else {
            log::error!("live cache lock poisoned; dropping publish for stream {stream_id}");
            return;
        };
        frames.insert(stream_id, CachedFrame { jpeg, captured_at });
    }

    /// Last published frame, or `None` if no cycle has completed yet for this
    /// stream. Callers must handle the absent case; it is not an error.
    pub fn read(&self, stream_id: u32) -> Option<CachedFrame> {
        let frames = self.frames.lock().ok()?;
        frames.get(&stream_id).cloned()
    }
}
