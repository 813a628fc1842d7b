// Feed liveness domain model
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

pub const DEFAULT_LIVENESS_TIMEOUT_MS: i64 = 5_000;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LivenessState {
    pub last_update_at: DateTime<Utc>,
    pub is_active: bool,
}

/// Tracks when the feed last produced a materially new sample.
#[derive(Debug, Clone)]
pub struct LivenessTracker {
    timeout: Duration,
    state: LivenessState,
}

impl LivenessTracker {
    /// Starts active, as if a sample had just arrived at `started_at`.
    pub fn new(timeout: Duration, started_at: DateTime<Utc>) -> Self {
        Self {
            timeout,
            state: LivenessState {
                last_update_at: started_at,
                is_active: true,
            },
        }
    }

    pub fn record_update(&mut self, ts: DateTime<Utc>) {
        self.state.last_update_at = ts;
        self.state.is_active = true;
    }

    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        now - self.state.last_update_at <= self.timeout
    }

    /// Re-evaluates the stored flag. Returns the new flag when it changed.
    pub fn refresh(&mut self, now: DateTime<Utc>) -> Option<bool> {
        let active = self.is_active(now);
        if active == self.state.is_active {
            return None;
        }
        self.state.is_active = active;
        Some(active)
    }

    pub fn state(&self) -> LivenessState {
        self.state
    }
}
