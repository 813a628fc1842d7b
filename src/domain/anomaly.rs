// THD anomaly history domain model
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::VecDeque;

use super::harmonic::THD_LIMIT;

pub const DEFAULT_ANOMALY_CAPACITY: usize = 50;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThdHistoryEntry {
    pub time: String,
    pub thd: f64,
    pub is_anomaly: bool,
    pub is_live: bool,
    pub observed_at: DateTime<Utc>,
}

/// Bounded THD trend. Only the newest entry is ever marked live.
#[derive(Debug, Clone, Serialize)]
#[serde(transparent)]
pub struct AnomalyHistory {
    #[serde(skip)]
    capacity: usize,
    entries: VecDeque<ThdHistoryEntry>,
}

impl AnomalyHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: VecDeque::with_capacity(capacity.max(1)),
        }
    }

    pub fn append(&mut self, time: impl Into<String>, thd: f64, now: DateTime<Utc>) {
        if let Some(last) = self.entries.back_mut() {
            last.is_live = false;
        }
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(ThdHistoryEntry {
            time: time.into(),
            thd,
            is_anomaly: thd > THD_LIMIT,
            is_live: true,
            observed_at: now,
        });
    }
}

/// Read accessors used by assertions.
#[cfg(test)]
impl AnomalyHistory {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> impl Iterator<Item = &ThdHistoryEntry> {
        self.entries.iter()
    }

    pub fn latest(&self) -> Option<&ThdHistoryEntry> {
        self.entries.back()
    }
}
