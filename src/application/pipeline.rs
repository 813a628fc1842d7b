// Telemetry pipeline - Owned aggregate of every derived signal
use chrono::{DateTime, Duration, Local, Utc};
use serde::Serialize;

use crate::application::alert_engine::AlertEngine;
use crate::application::control_policy::ControlPolicy;
use crate::application::harmonic_estimator::HarmonicEstimator;
use crate::application::noise::NoiseSource;
use crate::application::prediction_estimator::PredictionEstimator;
use crate::application::telemetry_channel::ChannelEvent;
use crate::domain::alert::AlertLog;
use crate::domain::anomaly::AnomalyHistory;
use crate::domain::harmonic::{BestHarmonic, HarmonicProfile};
use crate::domain::liveness::{LivenessState, LivenessTracker};
use crate::domain::prediction::PredictionSummary;
use crate::domain::sample::{ControlDirective, HistoryRecord, LiveData, RawSample, latest_history};
use crate::domain::window::{AcWindows, DcWindows};
use crate::infrastructure::config::PipelineSettings;

/// Read-only snapshot handed to the presentation layer.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineState {
    pub live: LiveData,
    pub history: Vec<HistoryRecord>,
    pub harmonics: HarmonicProfile,
    pub best_harmonic: Option<BestHarmonic>,
    pub anomaly_history: AnomalyHistory,
    pub alerts: AlertLog,
    pub prediction: PredictionSummary,
    pub liveness: LivenessState,
    pub ac_windows: AcWindows,
    pub dc_windows: DcWindows,
}

pub struct TelemetryPipeline {
    policy: ControlPolicy,
    liveness: LivenessTracker,
    ac_windows: AcWindows,
    dc_windows: DcWindows,
    harmonics: HarmonicEstimator,
    anomalies: AnomalyHistory,
    alert_engine: AlertEngine,
    alerts: AlertLog,
    predictor: PredictionEstimator,
    prediction: PredictionSummary,
    live: LiveData,
    previous: Option<RawSample>,
    history: Vec<HistoryRecord>,
    history_limit: usize,
    noise: Box<dyn NoiseSource>,
}

impl TelemetryPipeline {
    pub fn new(settings: &PipelineSettings, noise: Box<dyn NoiseSource>, started_at: DateTime<Utc>) -> Self {
        Self {
            policy: ControlPolicy,
            liveness: LivenessTracker::new(Duration::milliseconds(settings.liveness_timeout_ms), started_at),
            ac_windows: AcWindows::new(settings.window_capacity),
            dc_windows: DcWindows::new(settings.window_capacity),
            harmonics: HarmonicEstimator::default(),
            anomalies: AnomalyHistory::new(settings.anomaly_capacity),
            alert_engine: AlertEngine::new(settings.alerts.clone()),
            alerts: AlertLog::new(settings.alert_capacity),
            predictor: PredictionEstimator,
            prediction: PredictionSummary::initial(started_at),
            live: LiveData::default(),
            previous: None,
            history: Vec::new(),
            history_limit: settings.history_limit,
            noise,
        }
    }

    /// Applies one channel event. Returns the directive to write back, if any.
    pub fn handle_event(&mut self, event: ChannelEvent, now: DateTime<Utc>) -> Option<ControlDirective> {
        match event {
            ChannelEvent::Sample(sample) => self.ingest(sample, now),
            ChannelEvent::History(records) => {
                self.history = latest_history(records, self.history_limit);
                None
            }
        }
    }

    pub fn ingest(&mut self, sample: RawSample, now: DateTime<Utc>) -> Option<ControlDirective> {
        let directive = self.policy.evaluate(&sample);
        let corrected = self.policy.apply(&sample, &directive);

        let changed = self
            .previous
            .as_ref()
            .is_none_or(|prev| prev.materially_differs(&corrected));
        if changed {
            self.liveness.record_update(now);
            self.previous = Some(corrected.clone());
        }

        let frequency = self.noise.uniform(49.9, 50.1);
        self.live = LiveData::from_sample(&corrected, frequency);

        let label = time_label(now);
        self.ac_windows.append(&label, corrected.current, corrected.voltage, corrected.power);
        self.dc_windows.append(&label, corrected.dc_current, corrected.dc_voltage);

        if changed {
            self.analyse(&corrected, &label, now);
        }

        if directive.is_empty() {
            None
        } else {
            Some(directive)
        }
    }

    fn analyse(&mut self, sample: &RawSample, label: &str, now: DateTime<Utc>) {
        if let Some(total_thd) = self.harmonics.tick(
            sample.current,
            sample.choke,
            &self.liveness,
            now,
            self.noise.as_mut(),
        ) {
            self.anomalies.append(label, total_thd, now);
        }

        let raised = self.alert_engine.evaluate(sample, self.harmonics.profile(), now);
        if !raised.is_empty() {
            tracing::debug!(count = raised.len(), "Raised alerts");
            self.alerts.prepend(raised);
        }

        if let Some(prediction) = self.predictor.tick(&self.liveness, now, self.noise.as_mut()) {
            self.prediction = prediction;
        }
    }

    /// Liveness timer body. Returns the new activity flag on a transition.
    pub fn check_liveness(&mut self, now: DateTime<Utc>) -> Option<bool> {
        self.liveness.refresh(now)
    }

    /// Idle-drift timer body. Returns true when derived state moved. The
    /// stored liveness flag is brought up to date first so a published
    /// snapshot never shows an active feed while drift is frozen.
    pub fn drift(&mut self, now: DateTime<Utc>) -> bool {
        self.liveness.refresh(now);
        let choke = self.live.choke;
        match self.harmonics.drift(choke, &self.liveness, now, self.noise.as_mut()) {
            Some(total_thd) => {
                self.anomalies.append(time_label(now), total_thd, now);
                true
            }
            None => false,
        }
    }

    pub fn dismiss_alert(&mut self, id: u64) -> bool {
        self.alerts.dismiss(id)
    }

    pub fn snapshot(&self) -> PipelineState {
        let harmonics = self.harmonics.profile().clone();
        PipelineState {
            live: self.live.clone(),
            history: self.history.clone(),
            best_harmonic: harmonics.classify(self.live.choke),
            harmonics,
            anomaly_history: self.anomalies.clone(),
            alerts: self.alerts.clone(),
            prediction: self.prediction.clone(),
            liveness: self.liveness.state(),
            ac_windows: self.ac_windows.clone(),
            dc_windows: self.dc_windows.clone(),
        }
    }
}

fn time_label(now: DateTime<Utc>) -> String {
    now.with_timezone(&Local).format("%H:%M:%S").to_string()
}
