// Telemetry sample domain models
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Relay switch position as reported by (and written back to) the feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(into = "u8")]
pub enum RelayState {
    #[default]
    Off,
    On,
}

impl From<RelayState> for u8 {
    fn from(state: RelayState) -> Self {
        match state {
            RelayState::Off => 0,
            RelayState::On => 1,
        }
    }
}

/// Choke (inductive filter) mode. The feed encodes it as `"0"` / `"1"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(into = "String")]
pub enum ChokeMode {
    #[default]
    Off,
    On,
}

impl From<ChokeMode> for String {
    fn from(mode: ChokeMode) -> Self {
        match mode {
            ChokeMode::Off => "0".to_string(),
            ChokeMode::On => "1".to_string(),
        }
    }
}

impl ChokeMode {
    /// The relay position this choke mode requires.
    pub fn required_relay(self) -> RelayState {
        match self {
            ChokeMode::Off => RelayState::Off,
            ChokeMode::On => RelayState::On,
        }
    }
}

/// One inbound telemetry reading.
#[derive(Debug, Clone, PartialEq)]
pub struct RawSample {
    pub current: f64,
    pub voltage: f64,
    pub power: f64,
    pub power_factor: f64,
    pub relay: RelayState,
    pub choke: ChokeMode,
    pub dc_current: f64,
    pub dc_voltage: f64,
    pub observed_at: DateTime<Utc>,
}

impl RawSample {
    /// True when any of the AC or switch fields differ. DC readings and the
    /// observation time do not count as a material change.
    pub fn materially_differs(&self, other: &RawSample) -> bool {
        self.current != other.current
            || self.voltage != other.voltage
            || self.power != other.power
            || self.power_factor != other.power_factor
            || self.relay != other.relay
            || self.choke != other.choke
    }
}

/// Corrective write-back. Unset fields mean "leave as is".
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ControlDirective {
    #[serde(rename = "I", skip_serializing_if = "Option::is_none")]
    pub current: Option<f64>,
    #[serde(rename = "Relay", skip_serializing_if = "Option::is_none")]
    pub relay: Option<RelayState>,
}

impl ControlDirective {
    pub fn is_empty(&self) -> bool {
        self.current.is_none() && self.relay.is_none()
    }
}

/// Read-only view of the latest sample after control corrections.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveData {
    pub current: f64,
    pub voltage: f64,
    pub power: f64,
    pub power_factor: f64,
    pub relay: RelayState,
    pub choke: ChokeMode,
    pub dc_current: f64,
    pub dc_voltage: f64,
    pub frequency_hz: f64,
    pub observed_at: Option<DateTime<Utc>>,
}

impl Default for LiveData {
    fn default() -> Self {
        Self {
            current: 0.0,
            voltage: 0.0,
            power: 0.0,
            power_factor: 0.0,
            relay: RelayState::Off,
            choke: ChokeMode::Off,
            dc_current: 0.0,
            dc_voltage: 0.0,
            frequency_hz: 50.0,
            observed_at: None,
        }
    }
}

impl LiveData {
    pub fn from_sample(sample: &RawSample, frequency_hz: f64) -> Self {
        Self {
            current: sample.current,
            voltage: sample.voltage,
            power: sample.power,
            power_factor: sample.power_factor,
            relay: sample.relay,
            choke: sample.choke,
            dc_current: sample.dc_current,
            dc_voltage: sample.dc_voltage,
            frequency_hz,
            observed_at: Some(sample.observed_at),
        }
    }
}

/// Entry of the read-only history path.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryRecord {
    pub id: String,
    pub ts: i64,
    pub current_a: Option<f64>,
    pub voltage_v: Option<f64>,
    pub power_w: Option<f64>,
    pub distribution_on: Option<bool>,
}

/// Newest-first list of the five most recent history records.
pub fn latest_history(mut records: Vec<HistoryRecord>, limit: usize) -> Vec<HistoryRecord> {
    records.sort_by(|a, b| b.ts.cmp(&a.ts));
    records.truncate(limit);
    records
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn sample(current: f64, voltage: f64, power: f64) -> RawSample {
        RawSample {
            current,
            voltage,
            power,
            power_factor: 0.0,
            relay: RelayState::Off,
            choke: ChokeMode::Off,
            dc_current: 0.0,
            dc_voltage: 0.0,
            observed_at: Utc::now(),
        }
    }

    #[test]
    fn test_material_change_ignores_dc_and_time() {
        let a = sample(1.0, 230.0, 10.0);
        let mut b = a.clone();
        b.dc_current = 3.0;
        b.observed_at = a.observed_at + chrono::Duration::seconds(5);
        assert!(!a.materially_differs(&b));

        b.choke = ChokeMode::On;
        assert!(a.materially_differs(&b));
    }

    #[test]
    fn test_directive_serializes_only_set_fields() {
        let directive = ControlDirective {
            current: None,
            relay: Some(RelayState::On),
        };
        assert_eq!(serde_json::to_string(&directive).unwrap(), r#"{"Relay":1}"#);

        let directive = ControlDirective {
            current: Some(1.5),
            relay: None,
        };
        assert_eq!(serde_json::to_string(&directive).unwrap(), r#"{"I":1.5}"#);
        assert!(ControlDirective::default().is_empty());
    }

    #[test]
    fn test_latest_history_sorts_desc_and_caps() {
        let records: Vec<HistoryRecord> = (0..8)
            .map(|i| HistoryRecord {
                id: format!("r{}", i),
                ts: (i * 37 % 8) as i64,
                current_a: None,
                voltage_v: None,
                power_w: None,
                distribution_on: None,
            })
            .collect();

        let latest = latest_history(records, 5);
        let ts: Vec<i64> = latest.iter().map(|r| r.ts).collect();
        assert_eq!(ts, vec![7, 6, 5, 4, 3]);
    }
}
