//! Freshest-frame sampling.
//!
//! Live sources buffer frames faster than the detection cadence consumes them.
//! Before materializing, the sampler advances the decode position past the
//! frames that accumulated during the pacing window so the returned frame is
//! the most recently available one, never a stale queued one. The discard loop
//! is bounded so a source producing faster than its nominal rate cannot spin
//! the supervisor.

use anyhow::Context;

use super::CaptureHandle;
use crate::error::CycleFailure;
use crate::frame::Frame;

#[derive(Clone, Copy, Debug)]
pub struct SamplerConfig {
    /// Nominal frame rate of the source.
    pub source_fps: u32,
    /// Seconds of buffered frames to discard per sample. This is also the
    /// deliberate pacing mechanism: it throttles inference to the configured
    /// cadence instead of processing every decoded frame.
    pub pacing_secs: f64,
    /// Hard cap on discarded frames per sample.
    pub max_discard: u32,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            source_fps: 30,
            pacing_secs: 0.2,
            max_discard: 120,
        }
    }
}

impl SamplerConfig {
    /// Frames to skip before materializing.
    pub fn discard_count(&self) -> u32 {
        let estimated = (self.source_fps as f64 * self.pacing_secs).floor() as u32;
        estimated.min(self.max_discard)
    }
}

/// Return the single freshest frame from `handle`.
///
/// Advances past `discard_count` buffered frames without materializing pixel
/// data, then materializes exactly one frame. A discard error is treated the
/// same as a materialization error: the source is no longer delivering.
pub fn sample_latest(
    handle: &mut dyn CaptureHandle,
    config: &SamplerConfig,
) -> Result<Frame, CycleFailure> {
    for _ in 0..config.discard_count() {
        handle
            .advance()
            .context("advance past buffered frame")
            .map_err(CycleFailure::frame_unavailable)?;
    }
    handle
        .materialize()
        .context("materialize sampled frame")
        .map_err(CycleFailure::frame_unavailable)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{anyhow, Result};
    use chrono::Utc;

    /// Handle that counts advances and materializations.
    struct CountingHandle {
        advanced: u32,
        materialized: u32,
        fail_materialize: bool,
    }

    impl CountingHandle {
        fn new() -> Self {
            Self {
                advanced: 0,
                materialized: 0,
                fail_materialize: false,
            }
        }
    }

    impl CaptureHandle for CountingHandle {
        fn advance(&mut self) -> Result<()> {
            self.advanced += 1;
            Ok(())
        }

        fn materialize(&mut self) -> Result<Frame> {
            if self.fail_materialize {
                return Err(anyhow!("decode error"));
            }
            self.materialized += 1;
            Ok(Frame {
                pixels: vec![0u8; 4 * 4 * 3],
                width: 4,
                height: 4,
                captured_at: Utc::now(),
            })
        }

        fn is_open(&self) -> bool {
            true
        }

        fn close(&mut self) {}
    }

    #[test]
    fn discards_pacing_window_then_materializes_once() {
        let mut handle = CountingHandle::new();
        let config = SamplerConfig {
            source_fps: 30,
            pacing_secs: 0.2,
            max_discard: 120,
        };
        sample_latest(&mut handle, &config).unwrap();
        assert_eq!(handle.advanced, 6); // 30 fps * 0.2 s
        assert_eq!(handle.materialized, 1);
    }

    #[test]
    fn discard_is_bounded_by_max() {
        let mut handle = CountingHandle::new();
        let config = SamplerConfig {
            source_fps: 120,
            pacing_secs: 5.0,
            max_discard: 10,
        };
        sample_latest(&mut handle, &config).unwrap();
        assert_eq!(handle.advanced, 10);
    }

    #[test]
    fn materialize_failure_maps_to_frame_unavailable() {
        let mut handle = CountingHandle::new();
        handle.fail_materialize = true;
        let failure = sample_latest(&mut handle, &SamplerConfig::default()).unwrap_err();
        assert_eq!(failure.kind, crate::FailureKind::FrameUnavailable);
    }
}
