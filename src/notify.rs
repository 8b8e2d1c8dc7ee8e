//! Downstream event notification.
//!
//! Best-effort, single attempt, no retry queue: a lost event is acceptable
//! because the next cycle will usually re-observe the same condition, subject
//! to suppression. The wire shape matches the downstream receiver's contract.

use std::collections::BTreeMap;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One qualifying detection event, as sent downstream.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DetectionEvent {
    /// `YYYY-MM-DD`
    pub event_date: String,
    /// `HH:MM:SS`
    pub event_time: String,
    pub stream_id: u32,
    /// Reference returned by the persistence dispatcher.
    pub image_path: String,
    /// Per-class counts that passed suppression.
    pub objects: BTreeMap<String, u32>,
}

impl DetectionEvent {
    pub fn new(
        stream_id: u32,
        at: DateTime<Utc>,
        image_path: String,
        objects: BTreeMap<String, u32>,
    ) -> Self {
        Self {
            event_date: at.format("%Y-%m-%d").to_string(),
            event_time: at.format("%H:%M:%S").to_string(),
            stream_id,
            image_path,
            objects,
        }
    }
}

/// Sends a detection event downstream. One attempt; the caller logs failures
/// and moves on.
pub trait Notifier: Send + Sync {
    fn notify(&self, event: &DetectionEvent) -> Result<()>;
}

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// POSTs the event as JSON to the configured endpoint.
pub struct HttpNotifier {
    endpoint: String,
    agent: ureq::Agent,
}

impl HttpNotifier {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            agent: ureq::AgentBuilder::new()
                .timeout_connect(Duration::from_secs(5))
                .timeout(DEFAULT_TIMEOUT)
                .build(),
        }
    }
}

impl Notifier for HttpNotifier {
    fn notify(&self, event: &DetectionEvent) -> Result<()> {
        let body = serde_json::to_string(event).context("serialize detection event")?;
        // Transport failures and non-2xx statuses both surface as Err.
        self.agent
            .post(&self.endpoint)
            .set("Content-Type", "application/json")
            .send_string(&body)
            .with_context(|| format!("POST detection event to {}", self.endpoint))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn event_serializes_to_receiver_wire_shape() {
        let at = Utc.with_ymd_and_hms(2026, 8, 23, 14, 5, 33).unwrap();
        let mut objects = BTreeMap::new();
        objects.insert("person".to_string(), 2u32);

        let event = DetectionEvent::new(101, at, "101/2026-08-23/14-05-33.jpg".into(), objects);
        let json: serde_json::Value = serde_json::to_value(&event).unwrap();

        assert_eq!(json["eventDate"], "2026-08-23");
        assert_eq!(json["eventTime"], "14:05:33");
        assert_eq!(json["streamId"], 101);
        assert_eq!(json["imagePath"], "101/2026-08-23/14-05-33.jpg");
        assert_eq!(json["objects"]["person"], 2);
    }
}
