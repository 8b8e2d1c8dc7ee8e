//! Per (stream, class) notification cooldown.
//!
//! This is a rate-limit policy, not a cache: entries are never evicted. The
//! map is bounded by configuration (finite streams times finite interest
//! classes), so unbounded growth cannot occur in practice. Check and update
//! happen under one critical section, so two overlapping cycles could never
//! both pass the same key.

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{anyhow, Result};

use crate::now_s;

#[derive(Default)]
pub struct SuppressionEngine {
    /// (stream id, class) -> epoch seconds of the last accepted notification.
    last_sent: Mutex<HashMap<(u32, String), u64>>,
}

impl SuppressionEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep only the classes whose cooldown has elapsed, updating their
    /// last-sent timestamp in the same critical section. A class with no
    /// recorded timestamp is eligible immediately.
    pub fn filter(
        &self,
        stream_id: u32,
        counts: &BTreeMap<String, u32>,
        cooldown: Duration,
    ) -> Result<BTreeMap<String, u32>> {
        let now = now_s()?;
        self.filter_at(stream_id, counts, cooldown, now)
    }

    /// `filter` against an explicit clock, for tests and replay.
    pub fn filter_at(
        &self,
        stream_id: u32,
        counts: &BTreeMap<String, u32>,
        cooldown: Duration,
        now_epoch_s: u64,
    ) -> Result<BTreeMap<String, u32>> {
        let mut last_sent = self
            .last_sent
            .lock()
            .map_err(|_| anyhow!("suppression map lock poisoned"))?;

        let mut passed = BTreeMap::new();
        for (class, &count) in counts {
            let key = (stream_id, class.clone());
            let eligible = match last_sent.get(&key) {
                None => true,
                Some(&sent_at) => now_epoch_s.saturating_sub(sent_at) >= cooldown.as_secs(),
            };
            if eligible {
                last_sent.insert(key, now_epoch_s);
                passed.insert(class.clone(), count);
            }
        }
        Ok(passed)
    }
}
