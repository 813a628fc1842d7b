// Alert domain models
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::VecDeque;

pub const DEFAULT_ALERT_CAPACITY: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertKind {
    Overload,
    Unbalanced,
    #[serde(rename = "thd")]
    HighThd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    pub id: u64,
    pub kind: AlertKind,
    pub severity: Severity,
    pub message: String,
    pub raised_at: DateTime<Utc>,
}

/// Newest-first alert log with a hard capacity.
#[derive(Debug, Clone, Serialize)]
#[serde(transparent)]
pub struct AlertLog {
    #[serde(skip)]
    capacity: usize,
    alerts: VecDeque<Alert>,
}

impl AlertLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            alerts: VecDeque::with_capacity(capacity),
        }
    }

    /// Prepends a batch, keeping the batch's own order at the head, then drops
    /// the oldest alerts beyond capacity.
    pub fn prepend(&mut self, batch: Vec<Alert>) {
        for alert in batch.into_iter().rev() {
            self.alerts.push_front(alert);
        }
        self.alerts.truncate(self.capacity);
    }

    /// Removes the alert with `id`. Returns false if no such alert is held.
    pub fn dismiss(&mut self, id: u64) -> bool {
        match self.alerts.iter().position(|a| a.id == id) {
            Some(idx) => self.alerts.remove(idx).is_some(),
            None => false,
        }
    }
}

/// Read accessors used by assertions.
#[cfg(test)]
impl AlertLog {
    pub fn len(&self) -> usize {
        self.alerts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.alerts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Alert> {
        self.alerts.iter()
    }
}
