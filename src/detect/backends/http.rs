//! Remote detector over HTTP.
//!
//! The model runs in its own service. This backend POSTs the frame as JPEG and
//! parses the response: a JSON array of `{label, confidence, bbox: [x,y,w,h]}`
//! with normalized coordinates.

use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;

use crate::detect::backend::{BoundingBox, Detection, Detector};
use crate::frame::Frame;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

pub struct HttpDetector {
    endpoint: String,
    agent: ureq::Agent,
}

#[derive(Debug, Deserialize)]
struct WireDetection {
    label: String,
    confidence: f32,
    bbox: [f32; 4],
}

impl HttpDetector {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self::with_timeout(endpoint, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(endpoint: impl Into<String>, timeout: Duration) -> Self {
        Self {
            endpoint: endpoint.into(),
            agent: ureq::AgentBuilder::new()
                .timeout_connect(Duration::from_secs(5))
                .timeout(timeout)
                .build(),
        }
    }
}

impl Detector for HttpDetector {
    fn name(&self) -> &'static str {
        "http"
    }

    fn infer(&self, frame: &Frame) -> Result<Vec<Detection>> {
        let jpeg = frame.encode_jpeg()?;
        let response = self
            .agent
            .post(&self.endpoint)
            .set("Content-Type", "image/jpeg")
            .send_bytes(&jpeg)
            .with_context(|| format!("POST frame to detector at {}", self.endpoint))?;

        let body = response.into_string().context("read detector response")?;
        let wire: Vec<WireDetection> =
            serde_json::from_str(&body).context("parse detector response json")?;

        wire.into_iter()
            .map(|d| {
                if !(0.0..=1.0).contains(&d.confidence) {
                    return Err(anyhow!(
                        "detector returned confidence {} outside 0..1 for '{}'",
                        d.confidence,
                        d.label
                    ));
                }
                Ok(Detection {
                    label: d.label,
                    confidence: d.confidence,
                    bbox: BoundingBox {
                        x: d.bbox[0],
                        y: d.bbox[1],
                        w: d.bbox[2],
                        h: d.bbox[3],
                    },
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_format_parses() {
        let body = r#"[{"label":"person","confidence":0.92,"bbox":[0.1,0.2,0.3,0.4]}]"#;
        let wire: Vec<WireDetection> = serde_json::from_str(body).unwrap();
        assert_eq!(wire.len(), 1);
        assert_eq!(wire[0].label, "person");
        assert!((wire[0].confidence - 0.92).abs() < 1e-6);
        assert_eq!(wire[0].bbox, [0.1, 0.2, 0.3, 0.4]);
    }
}
