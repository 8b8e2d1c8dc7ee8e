//! Per-stream detection loop: cycle state machine and failure containment.
//!
//! `DetectionEngine` holds the shared components and executes one cycle for
//! one stream: Sampling -> Detecting -> Caching -> Suppressing -> Persisting
//! (optional) -> Notifying (optional). Stages run strictly sequentially for a
//! given stream, which is what keeps the suppression read-then-update safe per
//! key without stream-level coordination.
//!
//! `StreamSupervisor` wraps the engine in an unbounded loop on a dedicated
//! thread. Any retryable failure is caught at this boundary, logged, and the
//! cycle restarts after the retry delay; nothing propagates to other streams.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use serde::Serialize;
use std::collections::BTreeMap;

use crate::capture::{sample_latest, CaptureRegistry, SamplerConfig};
use crate::detect::DetectionAdapter;
use crate::error::CycleFailure;
use crate::live_cache::LiveViewCache;
use crate::notify::{DetectionEvent, Notifier};
use crate::persist::PersistenceDispatcher;
use crate::suppress::SuppressionEngine;
use crate::StreamSource;

/// What one completed cycle did, for logs and the on-demand endpoint.
#[derive(Clone, Debug, Default, Serialize)]
pub struct CycleReport {
    pub stream_id: u32,
    /// Interest-class counts seen this cycle (before suppression).
    pub counts: BTreeMap<String, u32>,
    /// Counts that passed suppression this cycle.
    pub passed_suppression: BTreeMap<String, u32>,
    /// Evidence reference, when persistence ran and succeeded.
    pub image_path: Option<String>,
    pub notified: bool,
    /// Set when the event occurred but storage failed; no notification was
    /// sent and the event is unrecorded.
    pub persistence_failed: bool,
    /// Set when the downstream send failed; the event is not re-queued.
    pub notification_failed: bool,
}

pub struct DetectionEngine {
    pub registry: Arc<CaptureRegistry>,
    pub sampler: SamplerConfig,
    pub adapter: Arc<DetectionAdapter>,
    pub cache: Arc<LiveViewCache>,
    pub suppression: Arc<SuppressionEngine>,
    pub dispatcher: Arc<PersistenceDispatcher>,
    pub notifier: Arc<dyn Notifier>,
    pub cooldown: Duration,
}

impl DetectionEngine {
    /// Run one full cycle for `source`.
    ///
    /// Sampling and detection failures abort the cycle (`Err`); persistence
    /// and notification failures are absorbed here and surface only as report
    /// flags, because the cycle's remaining obligations (the cached live frame
    /// is already published) are done.
    pub fn run_cycle(&self, source: &StreamSource) -> Result<CycleReport, CycleFailure> {
        // Sampling: borrow the handle for exactly one sampling call.
        let frame = self
            .registry
            .with_handle(source, |handle| sample_latest(handle, &self.sampler))?;
        let captured_at = frame.captured_at;

        // Detecting.
        let outcome = self
            .adapter
            .detect(&frame)
            .map_err(CycleFailure::detection_failed)?;

        // Caching: publish every annotated frame, qualifying or not, so
        // viewers always see the latest inference.
        self.cache
            .publish(source.id, outcome.annotated_jpeg.clone(), captured_at);

        let mut report = CycleReport {
            stream_id: source.id,
            counts: outcome.counts.clone(),
            ..CycleReport::default()
        };

        if !outcome.qualifies {
            return Ok(report);
        }

        // Suppressing.
        let passed = self
            .suppression
            .filter(source.id, &outcome.counts, self.cooldown)
            .map_err(CycleFailure::detection_failed)?;
        report.passed_suppression = passed.clone();
        if passed.is_empty() {
            log::debug!(
                "stream {}: detection suppressed inside cooldown window",
                source.id
            );
            return Ok(report);
        }

        // Persisting. A storage failure leaves the event unrecorded and
        // skips notification; the cycle itself still completes.
        let image_path =
            match self
                .dispatcher
                .persist(&outcome.annotated_jpeg, source.id, captured_at)
            {
                Ok(path) => path,
                Err(e) => {
                    let failure = CycleFailure::persistence_failed(e);
                    log::warn!("stream {}: {}", source.id, failure);
                    report.persistence_failed = true;
                    return Ok(report);
                }
            };
        report.image_path = Some(image_path.clone());

        // Notifying: single attempt, never retried.
        let event = DetectionEvent::new(source.id, captured_at, image_path, passed);
        match self.notifier.notify(&event) {
            Ok(()) => {
                report.notified = true;
                log::info!(
                    "stream {}: notified {:?} -> {}",
                    source.id,
                    event.objects,
                    event.image_path
                );
            }
            Err(e) => {
                let failure = CycleFailure::notification_failed(e);
                log::warn!("stream {}: {}", source.id, failure);
                report.notification_failed = true;
            }
        }

        Ok(report)
    }
}

pub struct StreamSupervisor {
    engine: Arc<DetectionEngine>,
    source: StreamSource,
    /// Pause after a successful cycle.
    cycle_delay: Duration,
    /// Pause after a retryable failure before restarting from Sampling.
    retry_delay: Duration,
    shutdown: Arc<AtomicBool>,
}

impl StreamSupervisor {
    pub fn new(
        engine: Arc<DetectionEngine>,
        source: StreamSource,
        cycle_delay: Duration,
        retry_delay: Duration,
        shutdown: Arc<AtomicBool>,
    ) -> Self {
        Self {
            engine,
            source,
            cycle_delay,
            retry_delay,
            shutdown,
        }
    }

    /// Loop until shutdown. Every failure is converted into a logged outcome
    /// plus a delayed restart; this function never panics out of a cycle.
    pub fn run(&self) {
        log::info!(
            "stream {}: supervisor started ({})",
            self.source.id,
            self.source.locator
        );
        while !self.shutdown.load(Ordering::SeqCst) {
            let delay = match self.engine.run_cycle(&self.source) {
                Ok(report) => {
                    if !report.counts.is_empty() {
                        log::debug!("stream {}: counts {:?}", self.source.id, report.counts);
                    }
                    self.cycle_delay
                }
                Err(failure) => {
                    log::warn!("stream {}: cycle failed: {}", self.source.id, failure);
                    self.retry_delay
                }
            };
            // Sleep in short slices so shutdown stays responsive.
            let mut remaining = delay;
            while remaining > Duration::ZERO && !self.shutdown.load(Ordering::SeqCst) {
                let slice = remaining.min(Duration::from_millis(100));
                std::thread::sleep(slice);
                remaining = remaining.saturating_sub(slice);
            }
        }
        log::info!("stream {}: supervisor stopped", self.source.id);
    }

    /// Spawn the supervisor on its own named thread.
    pub fn spawn(self) -> std::io::Result<JoinHandle<()>> {
        std::thread::Builder::new()
            .name(format!("stream-{}", self.source.id))
            .spawn(move || self.run())
    }
}
