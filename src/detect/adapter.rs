//! Detection adapter: threshold filtering, interest-class counting, and
//! annotated-evidence rendering around the external detector.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use anyhow::{Context, Result};

use super::annotate::render_annotated;
use super::backend::Detector;
use crate::frame::Frame;

/// Result of one inference pass over one frame.
#[derive(Clone, Debug)]
pub struct DetectionOutcome {
    /// Annotated frame, JPEG-encoded once and shared between the live cache
    /// and the persistence path.
    pub annotated_jpeg: Arc<Vec<u8>>,
    /// Per-class counts, interest classes only.
    pub counts: BTreeMap<String, u32>,
    /// True iff at least one interest class has count >= 1.
    pub qualifies: bool,
}

pub struct DetectionAdapter {
    detector: Arc<dyn Detector>,
    confidence_threshold: f32,
    interest_classes: BTreeSet<String>,
}

impl DetectionAdapter {
    pub fn new(
        detector: Arc<dyn Detector>,
        confidence_threshold: f32,
        interest_classes: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            detector,
            confidence_threshold,
            interest_classes: interest_classes.into_iter().collect(),
        }
    }

    /// Run the detector once and shape the result.
    ///
    /// Candidates below the confidence threshold are dropped entirely.
    /// Surviving candidates are all drawn into the annotated image; only
    /// interest classes contribute to `counts` and to `qualifies`. No
    /// detections at all is a valid outcome, not an error.
    pub fn detect(&self, frame: &Frame) -> Result<DetectionOutcome> {
        let candidates = self
            .detector
            .infer(frame)
            .with_context(|| format!("detector '{}' inference", self.detector.name()))?;

        let confident: Vec<_> = candidates
            .into_iter()
            .filter(|d| d.confidence >= self.confidence_threshold)
            .collect();

        let mut counts: BTreeMap<String, u32> = BTreeMap::new();
        for detection in &confident {
            if self.interest_classes.contains(&detection.label) {
                *counts.entry(detection.label.clone()).or_insert(0) += 1;
            }
        }
        let qualifies = counts.values().any(|&count| count >= 1);

        let annotated_jpeg = render_annotated(frame, &confident).context("render annotations")?;

        Ok(DetectionOutcome {
            annotated_jpeg: Arc::new(annotated_jpeg),
            counts,
            qualifies,
        })
    }
}
