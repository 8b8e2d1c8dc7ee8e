//! Synthetic capture backend for tests and `stub://` runs.
//!
//! Generates frames with a slowly drifting pattern so downstream stages see
//! changing pixel data. A handle can be configured to break after serving a
//! fixed number of frames, which exercises the registry's reconnect path.

use anyhow::{anyhow, Result};
use std::sync::atomic::{AtomicU64, Ordering};

use super::{CaptureBackend, CaptureHandle};
use crate::frame::Frame;

pub struct StubCaptureBackend {
    width: u32,
    height: u32,
    fail_after: Option<u64>,
    opened: AtomicU64,
}

impl StubCaptureBackend {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            fail_after: None,
            opened: AtomicU64::new(0),
        }
    }

    /// Handles from this backend mark themselves closed after serving
    /// `frames` materializations.
    pub fn with_fail_after(mut self, frames: u64) -> Self {
        self.fail_after = Some(frames);
        self
    }

    /// Total handles opened, across all sources.
    pub fn opened(&self) -> u64 {
        self.opened.load(Ordering::SeqCst)
    }
}

impl CaptureBackend for StubCaptureBackend {
    fn open(&self, url: &str) -> Result<Box<dyn CaptureHandle>> {
        if !url.starts_with("stub://") {
            return Err(anyhow!("stub backend only opens stub:// urls, got '{url}'"));
        }
        self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(StubHandle {
            width: self.width,
            height: self.height,
            served: 0,
            position: 0,
            fail_after: self.fail_after,
            open: true,
        }))
    }
}

pub struct StubHandle {
    width: u32,
    height: u32,
    served: u64,
    position: u64,
    fail_after: Option<u64>,
    open: bool,
}

impl CaptureHandle for StubHandle {
    fn advance(&mut self) -> Result<()> {
        if !self.open {
            return Err(anyhow!("stub handle is closed"));
        }
        self.position += 1;
        Ok(())
    }

    fn materialize(&mut self) -> Result<Frame> {
        if !self.open {
            return Err(anyhow!("stub handle is closed"));
        }
        self.position += 1;
        self.served += 1;

        let pixel_count = (self.width * self.height * 3) as usize;
        let mut pixels = vec![0u8; pixel_count];
        for (i, pixel) in pixels.iter_mut().enumerate() {
            *pixel = ((i as u64 + self.position) % 256) as u8;
        }

        if let Some(limit) = self.fail_after {
            if self.served >= limit {
                self.open = false;
            }
        }

        Frame::new(pixels, self.width, self.height)
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn close(&mut self) {
        self.open = false;
    }
}
