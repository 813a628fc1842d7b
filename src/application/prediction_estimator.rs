// Prediction estimator - Placeholder short-horizon forecast
use chrono::{DateTime, Duration, Utc};

use crate::application::noise::NoiseSource;
use crate::domain::liveness::LivenessTracker;
use crate::domain::prediction::PredictionSummary;

const ANOMALY_HORIZON_MS: f64 = 3_600_000.0;

/// Produces bounded pseudo-forecasts. Sample contents are not consulted; the
/// caller only ticks it for materially changed samples.
#[derive(Debug, Clone, Copy, Default)]
pub struct PredictionEstimator;

impl PredictionEstimator {
    pub fn tick(
        &self,
        liveness: &LivenessTracker,
        now: DateTime<Utc>,
        noise: &mut dyn NoiseSource,
    ) -> Option<PredictionSummary> {
        if !liveness.is_active(now) {
            return None;
        }

        let eta_ms = noise.uniform(0.0, ANOMALY_HORIZON_MS) as i64;
        Some(PredictionSummary {
            compensation_level: noise.uniform(80.0, 100.0),
            response_delay_ms: noise.uniform(10.0, 20.0),
            next_anomaly_eta: now + Duration::milliseconds(eta_ms),
            confidence: noise.uniform(85.0, 100.0),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::noise::RngNoise;

    #[test]
    fn test_ranges() {
        let now = Utc::now();
        let liveness = LivenessTracker::new(Duration::milliseconds(5_000), now);
        let mut noise = RngNoise::seeded(11);

        for _ in 0..500 {
            let p = PredictionEstimator.tick(&liveness, now, &mut noise).unwrap();
            assert!((0.0..=100.0).contains(&p.compensation_level));
            assert!(p.compensation_level >= 80.0);
            assert!((10.0..20.0).contains(&p.response_delay_ms));
            assert!((0.0..=100.0).contains(&p.confidence));
            assert!(p.next_anomaly_eta >= now);
            assert!(p.next_anomaly_eta < now + Duration::hours(1));
        }
    }

    #[test]
    fn test_inactive_returns_none() {
        let start = Utc::now();
        let liveness = LivenessTracker::new(Duration::milliseconds(5_000), start);
        let mut noise = RngNoise::seeded(11);
        let later = start + Duration::seconds(6);
        assert!(PredictionEstimator.tick(&liveness, later, &mut noise).is_none());
    }
}
