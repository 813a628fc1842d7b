// Prediction summary domain model
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionSummary {
    pub compensation_level: f64,
    pub response_delay_ms: f64,
    pub next_anomaly_eta: DateTime<Utc>,
    pub confidence: f64,
}

impl PredictionSummary {
    /// Placeholder shown before the first materially changed sample.
    pub fn initial(now: DateTime<Utc>) -> Self {
        Self {
            compensation_level: 85.7,
            response_delay_ms: 12.3,
            next_anomaly_eta: now,
            confidence: 92.1,
        }
    }
}
