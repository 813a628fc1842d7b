// Control policy - Corrective directives for an inbound sample
use crate::domain::sample::{ControlDirective, RawSample};

/// Voltage above which the current setpoint is enforced.
pub const OVERVOLTAGE_THRESHOLD: f64 = 200.0;

/// Current setpoint enforced under overvoltage.
pub const CURRENT_SETPOINT: f64 = 1.5;

#[derive(Debug, Clone, Copy, Default)]
pub struct ControlPolicy;

impl ControlPolicy {
    /// Both rules are evaluated independently; the directive is empty when the
    /// sample already satisfies them.
    pub fn evaluate(&self, sample: &RawSample) -> ControlDirective {
        let mut directive = ControlDirective::default();

        if sample.voltage > OVERVOLTAGE_THRESHOLD && sample.current != CURRENT_SETPOINT {
            directive.current = Some(CURRENT_SETPOINT);
        }

        let required_relay = sample.choke.required_relay();
        if sample.relay != required_relay {
            directive.relay = Some(required_relay);
        }

        directive
    }

    /// The sample as it will read once the directive is applied at the source.
    pub fn apply(&self, sample: &RawSample, directive: &ControlDirective) -> RawSample {
        let mut corrected = sample.clone();
        if let Some(current) = directive.current {
            corrected.current = current;
        }
        if let Some(relay) = directive.relay {
            corrected.relay = relay;
        }
        corrected
    }
}
