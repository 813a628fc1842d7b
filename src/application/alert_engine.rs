// Alert engine - Rule evaluation over a sample and its harmonic profile
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::domain::alert::{Alert, AlertKind, Severity};
use crate::domain::harmonic::{HarmonicProfile, THD_LIMIT};
use crate::domain::sample::RawSample;

#[derive(Debug, Clone, Deserialize)]
pub struct AlertRules {
    #[serde(default = "default_overload_power")]
    pub overload_power: f64,
    #[serde(default = "default_unbalance_tolerance")]
    pub unbalance_tolerance: f64,
    #[serde(default = "default_thd_limit")]
    pub thd_limit: f64,
}

fn default_overload_power() -> f64 {
    0.005
}

fn default_unbalance_tolerance() -> f64 {
    0.1
}

fn default_thd_limit() -> f64 {
    THD_LIMIT
}

impl Default for AlertRules {
    fn default() -> Self {
        Self {
            overload_power: default_overload_power(),
            unbalance_tolerance: default_unbalance_tolerance(),
            thd_limit: default_thd_limit(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AlertEngine {
    rules: AlertRules,
    next_id: u64,
}

impl AlertEngine {
    pub fn new(rules: AlertRules) -> Self {
        Self { rules, next_id: 1 }
    }

    /// Evaluates every rule independently. Alerts come back in rule order
    /// (overload, unbalanced, THD) with fresh monotonic ids.
    pub fn evaluate(
        &mut self,
        sample: &RawSample,
        profile: &HarmonicProfile,
        now: DateTime<Utc>,
    ) -> Vec<Alert> {
        let mut alerts = Vec::new();

        if sample.power > self.rules.overload_power {
            alerts.push(self.raise(AlertKind::Overload, Severity::High, "Power overload detected".to_string(), now));
        }

        // Mixed units: amps compared directly against volts.
        if (sample.current - sample.voltage).abs() > self.rules.unbalance_tolerance {
            alerts.push(self.raise(AlertKind::Unbalanced, Severity::Medium, "Unbalanced load detected".to_string(), now));
        }

        if profile.total_thd > self.rules.thd_limit {
            let message = format!("High THD detected: {:.2}%", profile.total_thd);
            alerts.push(self.raise(AlertKind::HighThd, Severity::High, message, now));
        }

        alerts
    }

    fn raise(&mut self, kind: AlertKind, severity: Severity, message: String, now: DateTime<Utc>) -> Alert {
        let id = self.next_id;
        self.next_id += 1;
        Alert {
            id,
            kind,
            severity,
            message,
            raised_at: now,
        }
    }
}
