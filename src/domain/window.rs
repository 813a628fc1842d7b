// Time-series window domain models
use serde::Serialize;
use std::collections::VecDeque;

pub const DEFAULT_WINDOW_CAPACITY: usize = 20;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeSeriesPoint {
    pub label: String,
    pub value: f64,
}

/// Fixed-capacity FIFO of labeled points for a single channel.
#[derive(Debug, Clone, Serialize)]
#[serde(transparent)]
pub struct TimeSeriesWindow {
    #[serde(skip)]
    capacity: usize,
    points: VecDeque<TimeSeriesPoint>,
}

impl TimeSeriesWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            points: VecDeque::with_capacity(capacity.max(1)),
        }
    }

    pub fn append(&mut self, label: impl Into<String>, value: f64) {
        if self.points.len() == self.capacity {
            self.points.pop_front();
        }
        self.points.push_back(TimeSeriesPoint {
            label: label.into(),
            value,
        });
    }
}

/// Read accessors used by assertions.
#[cfg(test)]
impl TimeSeriesWindow {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> impl Iterator<Item = &TimeSeriesPoint> {
        self.points.iter()
    }

    pub fn labels(&self) -> Vec<&str> {
        self.points.iter().map(|p| p.label.as_str()).collect()
    }
}

/// Current, voltage and power windows sharing one label sequence.
#[derive(Debug, Clone, Serialize)]
pub struct AcWindows {
    pub current: TimeSeriesWindow,
    pub voltage: TimeSeriesWindow,
    pub power: TimeSeriesWindow,
}

impl AcWindows {
    pub fn new(capacity: usize) -> Self {
        Self {
            current: TimeSeriesWindow::new(capacity),
            voltage: TimeSeriesWindow::new(capacity),
            power: TimeSeriesWindow::new(capacity),
        }
    }

    pub fn append(&mut self, label: &str, current: f64, voltage: f64, power: f64) {
        self.current.append(label, current);
        self.voltage.append(label, voltage);
        self.power.append(label, power);
    }
}

/// DC current and DC voltage windows sharing one label sequence.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DcWindows {
    pub dc_current: TimeSeriesWindow,
    pub dc_voltage: TimeSeriesWindow,
}

impl DcWindows {
    pub fn new(capacity: usize) -> Self {
        Self {
            dc_current: TimeSeriesWindow::new(capacity),
            dc_voltage: TimeSeriesWindow::new(capacity),
        }
    }

    pub fn append(&mut self, label: &str, dc_current: f64, dc_voltage: f64) {
        self.dc_current.append(label, dc_current);
        self.dc_voltage.append(label, dc_voltage);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_evicts_oldest_at_capacity() {
        let mut window = TimeSeriesWindow::new(DEFAULT_WINDOW_CAPACITY);
        for i in 0..25 {
            window.append(format!("t{}", i), i as f64);
            assert_eq!(window.len(), (i + 1).min(DEFAULT_WINDOW_CAPACITY));
        }

        let values: Vec<f64> = window.points().map(|p| p.value).collect();
        assert_eq!(values.first(), Some(&5.0));
        assert_eq!(values.last(), Some(&24.0));
        assert!(values.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_grouped_windows_stay_aligned() {
        let mut ac = AcWindows::new(3);
        for i in 0..5 {
            ac.append(&format!("t{}", i), 1.0, 230.0, 10.0);
        }
        assert_eq!(ac.current.len(), 3);
        assert_eq!(ac.current.labels(), ac.voltage.labels());
        assert_eq!(ac.voltage.labels(), ac.power.labels());
        assert_eq!(ac.current.labels(), vec!["t2", "t3", "t4"]);
    }
}
