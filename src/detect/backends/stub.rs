//! Scripted detector for tests and stub runs.

use std::sync::Mutex;

use anyhow::Result;

use crate::detect::backend::{Detection, Detector};
use crate::frame::Frame;

/// Returns a fixed detection list, or a per-call script that repeats its last
/// entry once exhausted.
pub struct StubDetector {
    script: Mutex<Script>,
}

struct Script {
    steps: Vec<Vec<Detection>>,
    cursor: usize,
}

impl StubDetector {
    /// Every call returns the same detections.
    pub fn returning(detections: Vec<Detection>) -> Self {
        Self::scripted(vec![detections])
    }

    /// Call N returns `steps[N]`; past the end, the last step repeats.
    pub fn scripted(steps: Vec<Vec<Detection>>) -> Self {
        Self {
            script: Mutex::new(Script { steps, cursor: 0 }),
        }
    }
}

impl Detector for StubDetector {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn infer(&self, _frame: &Frame) -> Result<Vec<Detection>> {
        let mut script = self
            .script
            .lock()
            .map_err(|_| anyhow::anyhow!("stub detector script lock poisoned"))?;
        if script.steps.is_empty() {
            return Ok(Vec::new());
        }
        let index = script.cursor.min(script.steps.len() - 1);
        script.cursor += 1;
        Ok(script.steps[index].clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::BoundingBox;

    #[test]
    fn script_repeats_last_step() {
        let person = Detection {
            label: "person".to_string(),
            confidence: 0.9,
            bbox: BoundingBox::default(),
        };
        let detector = StubDetector::scripted(vec![Vec::new(), vec![person]]);
        let frame = Frame::new(vec![0u8; 4 * 4 * 3], 4, 4).unwrap();

        assert!(detector.infer(&frame).unwrap().is_empty());
        assert_eq!(detector.infer(&frame).unwrap().len(), 1);
        assert_eq!(detector.infer(&frame).unwrap().len(), 1);
    }
}
