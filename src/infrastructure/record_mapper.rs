// Mapper from store records to domain types
use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::domain::sample::{ChokeMode, HistoryRecord, RawSample, RelayState};

/// Builds a sample from the live node plus the DC readings held on the root
/// node. Returns `None` when the live node is missing or not an object;
/// absent numeric fields read as 0.
pub fn sample_from_tree(root: &Value, live_child: &str, observed_at: DateTime<Utc>) -> Option<RawSample> {
    let live = root.get(live_child).filter(|v| v.is_object())?;

    Some(RawSample {
        current: number(live.get("I")),
        voltage: number(live.get("V")),
        power: number(live.get("W")),
        power_factor: number(live.get("P")),
        relay: if is_one(live.get("Relay")) { RelayState::On } else { RelayState::Off },
        choke: if is_one(live.get("Choke")) { ChokeMode::On } else { ChokeMode::Off },
        dc_current: number(root.get("DC_Current")),
        dc_voltage: number(root.get("DC_Voltage")),
        observed_at,
    })
}

/// Maps an `id -> record` object. Non-object entries are skipped.
pub fn history_from_node(node: &Value) -> Vec<HistoryRecord> {
    let Some(entries) = node.as_object() else {
        return Vec::new();
    };

    entries
        .iter()
        .filter(|(_, record)| record.is_object())
        .map(|(id, record)| HistoryRecord {
            id: id.clone(),
            ts: number(record.get("ts")) as i64,
            current_a: record.get("current_a").and_then(Value::as_f64),
            voltage_v: record.get("voltage_v").and_then(Value::as_f64),
            power_w: record.get("power_w").and_then(Value::as_f64),
            distribution_on: record.get("distribution_on").and_then(Value::as_bool),
        })
        .collect()
}

fn number(value: Option<&Value>) -> f64 {
    match value {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    }
}

fn is_one(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Number(n)) => n.as_f64() == Some(1.0),
        Some(Value::String(s)) => s.trim() == "1",
        Some(Value::Bool(b)) => *b,
        _ => false,
    }
}
