// Harmonic estimator - Synthetic THD profile driven by choke mode
use chrono::{DateTime, Utc};

use crate::application::noise::NoiseSource;
use crate::domain::harmonic::{HarmonicComponent, HarmonicProfile};
use crate::domain::liveness::LivenessTracker;
use crate::domain::sample::ChokeMode;

/// Amplitude used when the sample reports no current.
const FALLBACK_BASE_AMPLITUDE: f64 = 0.5;

/// Bounded synthetic estimator. It does not analyse a waveform: total THD is
/// drawn from a choke-dependent band and spread across the tracked orders.
#[derive(Debug, Clone, Default)]
pub struct HarmonicEstimator {
    profile: HarmonicProfile,
}

impl HarmonicEstimator {
    pub fn profile(&self) -> &HarmonicProfile {
        &self.profile
    }

    /// Resamples the profile from the sample's current. Returns the new total
    /// THD, or `None` when the feed is inactive and the profile stays frozen.
    pub fn tick(
        &mut self,
        base_amplitude: f64,
        choke: ChokeMode,
        liveness: &LivenessTracker,
        now: DateTime<Utc>,
        noise: &mut dyn NoiseSource,
    ) -> Option<f64> {
        if !liveness.is_active(now) {
            return None;
        }

        let base = if base_amplitude == 0.0 {
            FALLBACK_BASE_AMPLITUDE
        } else {
            base_amplitude
        };
        let total_thd = draw_total_thd(choke, noise);
        let count = self.profile.harmonics.len() as f64;

        let harmonics = self
            .profile
            .harmonics
            .iter()
            .map(|h| HarmonicComponent {
                order: h.order,
                amplitude: (base * noise.uniform(0.1, 0.4) / h.order as f64).abs(),
                phase: h.phase,
                thd: total_thd / count + noise.uniform(-0.1, 0.1),
            })
            .collect();

        self.profile = HarmonicProfile {
            harmonics,
            total_thd,
        };
        Some(total_thd)
    }

    /// Idle-time variant: perturbs the previous amplitudes by up to ±10%
    /// instead of resampling them from a base amplitude.
    pub fn drift(
        &mut self,
        choke: ChokeMode,
        liveness: &LivenessTracker,
        now: DateTime<Utc>,
        noise: &mut dyn NoiseSource,
    ) -> Option<f64> {
        if !liveness.is_active(now) {
            return None;
        }

        let total_thd = draw_total_thd(choke, noise);
        let count = self.profile.harmonics.len() as f64;

        let harmonics = self
            .profile
            .harmonics
            .iter()
            .map(|h| HarmonicComponent {
                order: h.order,
                amplitude: h.amplitude * noise.uniform(0.9, 1.1),
                phase: h.phase,
                thd: total_thd / count + noise.uniform(-0.1, 0.1),
            })
            .collect();

        self.profile = HarmonicProfile {
            harmonics,
            total_thd,
        };
        Some(total_thd)
    }
}

/// Choke off: 30% below 4.5, 40% in [4.5, 5.0), 30% in [5.0, 5.5).
/// Choke on: always within the regulated [4.5, 5.0) band.
fn draw_total_thd(choke: ChokeMode, noise: &mut dyn NoiseSource) -> f64 {
    match choke {
        ChokeMode::On => noise.uniform(4.5, 5.0),
        ChokeMode::Off => {
            let bucket = noise.unit();
            if bucket < 0.3 {
                noise.uniform(4.0, 4.5)
            } else if bucket < 0.7 {
                noise.uniform(4.5, 5.0)
            } else {
                noise.uniform(5.0, 5.5)
            }
        }
    }
}
