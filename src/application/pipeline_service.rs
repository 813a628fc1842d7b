// Pipeline service - Single owning task that serializes every mutation
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::application::pipeline::{PipelineState, TelemetryPipeline};
use crate::application::telemetry_channel::{ChannelError, Subscription, TelemetryChannel};
use crate::domain::sample::ControlDirective;
use crate::infrastructure::config::PipelineSettings;

const COMMAND_BUFFER: usize = 32;

#[derive(Debug)]
pub enum PipelineCommand {
    DismissAlert { id: u64, reply: oneshot::Sender<bool> },
}

/// Cloneable handle used by the presentation layer. It only reads snapshots
/// and sends commands; it never touches the pipeline directly.
#[derive(Clone)]
pub struct PipelineHandle {
    snapshots: watch::Receiver<PipelineState>,
    commands: mpsc::Sender<PipelineCommand>,
}

impl PipelineHandle {
    pub fn current(&self) -> PipelineState {
        self.snapshots.borrow().clone()
    }

    #[cfg(test)]
    pub fn subscribe(&self) -> watch::Receiver<PipelineState> {
        self.snapshots.clone()
    }

    /// Returns false when the alert is unknown or the pipeline has shut down.
    pub async fn dismiss_alert(&self, id: u64) -> bool {
        let (reply, response) = oneshot::channel();
        if self
            .commands
            .send(PipelineCommand::DismissAlert { id, reply })
            .await
            .is_err()
        {
            return false;
        }
        response.await.unwrap_or(false)
    }
}

pub struct PipelineService {
    pipeline: TelemetryPipeline,
    channel: Arc<dyn TelemetryChannel>,
    liveness_interval: Duration,
    drift_interval: Duration,
    snapshots: watch::Sender<PipelineState>,
    commands: mpsc::Receiver<PipelineCommand>,
}

impl PipelineService {
    pub fn new(
        pipeline: TelemetryPipeline,
        channel: Arc<dyn TelemetryChannel>,
        settings: &PipelineSettings,
    ) -> (Self, PipelineHandle) {
        let (snapshot_tx, snapshot_rx) = watch::channel(pipeline.snapshot());
        let (command_tx, command_rx) = mpsc::channel(COMMAND_BUFFER);

        let service = Self {
            pipeline,
            channel,
            liveness_interval: Duration::from_millis(settings.liveness_check_interval_ms.max(1)),
            drift_interval: Duration::from_millis(settings.drift_interval_ms.max(1)),
            snapshots: snapshot_tx,
            commands: command_rx,
        };
        let handle = PipelineHandle {
            snapshots: snapshot_rx,
            commands: command_tx,
        };
        (service, handle)
    }

    /// Runs until `cancel` fires. Both timers are dropped and the subscription
    /// task is joined before this returns.
    pub async fn run(mut self, cancel: CancellationToken) -> Result<(), ChannelError> {
        let Subscription { mut events, task } = self.channel.subscribe(cancel.child_token()).await?;

        let mut liveness_tick = periodic(self.liveness_interval);
        let mut drift_tick = periodic(self.drift_interval);

        let mut feed_open = true;
        tracing::info!(
            liveness_ms = self.liveness_interval.as_millis() as u64,
            drift_ms = self.drift_interval.as_millis() as u64,
            "Telemetry pipeline started"
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Telemetry pipeline shutting down");
                    break;
                }
                event = events.recv(), if feed_open => match event {
                    Some(event) => {
                        let now = Utc::now();
                        if let Some(directive) = self.pipeline.handle_event(event, now) {
                            self.dispatch(directive);
                        }
                        self.refresh_liveness(now);
                        self.publish();
                    }
                    None => {
                        tracing::warn!("Telemetry subscription ended; derived state will freeze");
                        feed_open = false;
                    }
                },
                _ = liveness_tick.tick() => {
                    if self.refresh_liveness(Utc::now()) {
                        self.publish();
                    }
                }
                _ = drift_tick.tick() => {
                    let now = Utc::now();
                    let flipped = self.refresh_liveness(now);
                    if self.pipeline.drift(now) || flipped {
                        self.publish();
                    }
                }
                Some(command) = self.commands.recv() => self.handle_command(command),
            }
        }

        drop(events);
        if let Err(e) = task.await {
            tracing::warn!(error = %e, "Telemetry subscription task failed");
        }
        tracing::debug!("Telemetry subscription joined");

        Ok(())
    }

    /// Brings the stored liveness flag up to date and reports a transition.
    fn refresh_liveness(&mut self, now: DateTime<Utc>) -> bool {
        match self.pipeline.check_liveness(now) {
            Some(true) => tracing::info!("Telemetry feed resumed"),
            Some(false) => tracing::warn!("Telemetry feed stopped; holding last values"),
            None => return false,
        }
        true
    }

    fn handle_command(&mut self, command: PipelineCommand) {
        match command {
            PipelineCommand::DismissAlert { id, reply } => {
                let removed = self.pipeline.dismiss_alert(id);
                tracing::debug!(id, removed, "Dismiss alert");
                if removed {
                    self.publish();
                }
                let _ = reply.send(removed);
            }
        }
    }

    /// Fire-and-forget write; a failure is logged and the next inbound sample
    /// re-evaluates the policy.
    fn dispatch(&self, directive: ControlDirective) {
        let channel = self.channel.clone();
        tokio::spawn(async move {
            match channel.write_directive(&directive).await {
                Ok(()) => tracing::debug!(?directive, "Control directive written"),
                Err(e) => tracing::warn!(error = %e, ?directive, "Control directive write failed"),
            }
        });
    }

    fn publish(&self) {
        self.snapshots.send_replace(self.pipeline.snapshot());
    }
}

/// Interval whose first tick is one full period away.
fn periodic(period: Duration) -> Interval {
    let mut interval = tokio::time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::noise::RngNoise;
    use crate::application::telemetry_channel::ChannelEvent;
    use crate::domain::sample::tests::sample;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tokio::sync::Notify;

    struct FakeChannel {
        events: Mutex<Option<mpsc::Receiver<ChannelEvent>>>,
        written: Mutex<Vec<ControlDirective>>,
        write_seen: Notify,
        fail_writes: bool,
        feed_stopped: Arc<AtomicBool>,
    }

    impl FakeChannel {
        fn new(events: mpsc::Receiver<ChannelEvent>, fail_writes: bool) -> Self {
            Self {
                events: Mutex::new(Some(events)),
                written: Mutex::new(Vec::new()),
                write_seen: Notify::new(),
                fail_writes,
                feed_stopped: Arc::new(AtomicBool::new(false)),
            }
        }
    }

    #[async_trait]
    impl TelemetryChannel for FakeChannel {
        async fn subscribe(&self, cancel: CancellationToken) -> Result<Subscription, ChannelError> {
            let events = self
                .events
                .lock()
                .unwrap()
                .take()
                .ok_or_else(|| ChannelError::Closed("already subscribed".to_string()))?;
            let stopped = self.feed_stopped.clone();
            let task = tokio::spawn(async move {
                cancel.cancelled().await;
                tokio::task::yield_now().await;
                stopped.store(true, Ordering::SeqCst);
            });
            Ok(Subscription { events, task })
        }

        async fn write_directive(&self, directive: &ControlDirective) -> Result<(), ChannelError> {
            self.written.lock().unwrap().push(directive.clone());
            self.write_seen.notify_one();
            if self.fail_writes {
                return Err(ChannelError::Status {
                    status: 503,
                    body: "unavailable".to_string(),
                });
            }
            Ok(())
        }
    }

    fn start(fail_writes: bool) -> (mpsc::Sender<ChannelEvent>, Arc<FakeChannel>, PipelineService, PipelineHandle) {
        let settings = PipelineSettings::default();
        let (tx, rx) = mpsc::channel(8);
        let channel = Arc::new(FakeChannel::new(rx, fail_writes));
        let pipeline = TelemetryPipeline::new(&settings, Box::new(RngNoise::seeded(5)), Utc::now());
        let (service, handle) = PipelineService::new(pipeline, channel.clone(), &settings);
        (tx, channel, service, handle)
    }

    #[tokio::test]
    async fn test_sample_dispatches_directive_and_publishes() {
        let (tx, channel, service, handle) = start(false);
        let cancel = CancellationToken::new();
        let task = tokio::spawn(service.run(cancel.clone()));

        tx.send(ChannelEvent::Sample(sample(1.0, 250.0, 0.0))).await.unwrap();
        tokio::time::timeout(Duration::from_secs(2), channel.write_seen.notified())
            .await
            .unwrap();
        assert_eq!(channel.written.lock().unwrap()[0].current, Some(1.5));

        let mut snapshots = handle.subscribe();
        let state = tokio::time::timeout(
            Duration::from_secs(2),
            snapshots.wait_for(|s| s.ac_windows.current.len() == 1),
        )
        .await
        .unwrap()
        .unwrap()
        .clone();
        assert_eq!(state.live.current, 1.5);

        cancel.cancel();
        task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_write_failure_does_not_stop_pipeline() {
        let (tx, channel, service, handle) = start(true);
        let cancel = CancellationToken::new();
        let task = tokio::spawn(service.run(cancel.clone()));

        tx.send(ChannelEvent::Sample(sample(1.0, 250.0, 0.0))).await.unwrap();
        tokio::time::timeout(Duration::from_secs(2), channel.write_seen.notified())
            .await
            .unwrap();
        tx.send(ChannelEvent::Sample(sample(1.2, 260.0, 0.0))).await.unwrap();

        let mut snapshots = handle.subscribe();
        tokio::time::timeout(
            Duration::from_secs(2),
            snapshots.wait_for(|s| s.ac_windows.voltage.len() == 2),
        )
        .await
        .unwrap()
        .unwrap();
        assert!(!task.is_finished());

        cancel.cancel();
        task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_dismiss_alert_through_handle() {
        let (tx, _channel, service, handle) = start(false);
        let cancel = CancellationToken::new();
        let task = tokio::spawn(service.run(cancel.clone()));

        tx.send(ChannelEvent::Sample(sample(0.0, 0.0, 3.0))).await.unwrap();
        let mut snapshots = handle.subscribe();
        let id = tokio::time::timeout(Duration::from_secs(2), snapshots.wait_for(|s| !s.alerts.is_empty()))
            .await
            .unwrap()
            .unwrap()
            .alerts
            .iter()
            .next()
            .map(|a| a.id)
            .unwrap();

        assert!(handle.dismiss_alert(id).await);
        assert!(!handle.dismiss_alert(id).await);
        assert!(handle.current().alerts.iter().all(|a| a.id != id));

        cancel.cancel();
        task.await.unwrap().unwrap();
        assert!(!handle.dismiss_alert(id).await);
    }

    #[tokio::test]
    async fn test_shutdown_joins_subscription_task() {
        let (_tx, channel, service, _handle) = start(false);
        let cancel = CancellationToken::new();
        let task = tokio::spawn(service.run(cancel.clone()));

        tokio::task::yield_now().await;
        assert!(!channel.feed_stopped.load(Ordering::SeqCst));

        cancel.cancel();
        task.await.unwrap().unwrap();
        assert!(channel.feed_stopped.load(Ordering::SeqCst));
    }
}
