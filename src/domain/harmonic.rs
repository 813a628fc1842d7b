// Harmonic distortion domain models
use serde::Serialize;
use std::fmt;

use super::sample::ChokeMode;

/// Orders tracked by the estimator, fundamental first.
pub const HARMONIC_ORDERS: [u32; 5] = [1, 3, 5, 7, 9];

/// THD percentage above which a reading is treated as anomalous.
pub const THD_LIMIT: f64 = 5.0;

/// Lower bound of the regulated THD band.
pub const THD_REGULATED_FLOOR: f64 = 4.5;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HarmonicComponent {
    pub order: u32,
    pub amplitude: f64,
    pub phase: f64,
    pub thd: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HarmonicProfile {
    pub harmonics: Vec<HarmonicComponent>,
    pub total_thd: f64,
}

impl Default for HarmonicProfile {
    fn default() -> Self {
        let seed = [(0.95, 0.0, 1.2), (0.15, 45.0, 2.1), (0.08, 90.0, 3.5), (0.05, 135.0, 1.8), (0.03, 180.0, 0.9)];
        let harmonics = HARMONIC_ORDERS
            .iter()
            .zip(seed)
            .map(|(&order, (amplitude, phase, thd))| HarmonicComponent {
                order,
                amplitude,
                phase,
                thd,
            })
            .collect();

        Self {
            harmonics,
            total_thd: 2.5,
        }
    }
}

impl HarmonicProfile {
    /// Component with the lowest per-order THD.
    pub fn best_component(&self) -> Option<&HarmonicComponent> {
        self.harmonics
            .iter()
            .min_by(|a, b| a.thd.total_cmp(&b.thd))
    }

    pub fn classify(&self, choke: ChokeMode) -> Option<BestHarmonic> {
        let best = self.best_component()?;
        let (status, noise_level) = classify_thd(self.total_thd, choke);
        Some(BestHarmonic {
            order: best.order,
            amplitude: best.amplitude,
            phase: best.phase,
            thd: best.thd,
            status,
            noise_level,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum HarmonicStatus {
    Excellent,
    Good,
    High,
    #[serde(rename = "Below Target")]
    BelowTarget,
    Optimal,
    #[serde(rename = "Above Target")]
    AboveTarget,
}

impl fmt::Display for HarmonicStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            HarmonicStatus::Excellent => "Excellent",
            HarmonicStatus::Good => "Good",
            HarmonicStatus::High => "High",
            HarmonicStatus::BelowTarget => "Below Target",
            HarmonicStatus::Optimal => "Optimal",
            HarmonicStatus::AboveTarget => "Above Target",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NoiseLevel {
    #[serde(rename = "Very Low Noise")]
    VeryLow,
    #[serde(rename = "Low Noise")]
    Low,
    #[serde(rename = "High Noise")]
    High,
    #[serde(rename = "Too Low")]
    TooLow,
    Controlled,
}

impl fmt::Display for NoiseLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            NoiseLevel::VeryLow => "Very Low Noise",
            NoiseLevel::Low => "Low Noise",
            NoiseLevel::High => "High Noise",
            NoiseLevel::TooLow => "Too Low",
            NoiseLevel::Controlled => "Controlled",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BestHarmonic {
    pub order: u32,
    pub amplitude: f64,
    pub phase: f64,
    pub thd: f64,
    pub status: HarmonicStatus,
    pub noise_level: NoiseLevel,
}

/// Status table for total THD. With the choke on, the regulated band is the
/// target; with it off, lower is better.
pub fn classify_thd(total_thd: f64, choke: ChokeMode) -> (HarmonicStatus, NoiseLevel) {
    let below = total_thd < THD_REGULATED_FLOOR;
    let above = total_thd > THD_LIMIT;
    match (choke, below, above) {
        (ChokeMode::Off, true, _) => (HarmonicStatus::Excellent, NoiseLevel::VeryLow),
        (ChokeMode::Off, _, true) => (HarmonicStatus::High, NoiseLevel::High),
        (ChokeMode::Off, _, _) => (HarmonicStatus::Good, NoiseLevel::Low),
        (ChokeMode::On, true, _) => (HarmonicStatus::BelowTarget, NoiseLevel::TooLow),
        (ChokeMode::On, _, true) => (HarmonicStatus::AboveTarget, NoiseLevel::High),
        (ChokeMode::On, _, _) => (HarmonicStatus::Optimal, NoiseLevel::Controlled),
    }
}
