// Realtime-database channel - SSE subscription and PATCH write-back
use crate::application::telemetry_channel::{ChannelError, ChannelEvent, Subscription, TelemetryChannel};
use crate::domain::sample::ControlDirective;
use crate::infrastructure::config::StoreSettings;
use crate::infrastructure::json_mirror::JsonMirror;
use crate::infrastructure::record_mapper::{history_from_node, sample_from_tree};
use crate::infrastructure::sse::{SseDecoder, SseFrame};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::Stream;
use futures::StreamExt;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

const EVENT_BUFFER: usize = 64;

#[derive(Debug, Clone)]
pub struct RealtimeDbChannel {
    client: reqwest::Client,
    base_url: String,
    root_path: String,
    live_child: String,
    history_child: String,
    auth_token: Option<String>,
    reconnect_delay: Duration,
}

#[derive(Debug, Deserialize)]
struct StreamPayload {
    path: String,
    data: Value,
}

impl RealtimeDbChannel {
    pub fn new(settings: &StoreSettings) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            root_path: settings.root_path.trim_matches('/').to_string(),
            live_child: settings.live_child.clone(),
            history_child: settings.history_child.clone(),
            auth_token: settings.auth_token.clone(),
            reconnect_delay: Duration::from_millis(settings.reconnect_delay_ms),
        }
    }

    fn build_url(&self, path: &str) -> String {
        let mut url = format!("{}/{}.json", self.base_url, path);
        if let Some(token) = &self.auth_token {
            url.push_str("?auth=");
            url.push_str(&urlencoding::encode(token));
        }
        url
    }

    async fn run_subscription(self, tx: mpsc::Sender<ChannelEvent>, cancel: CancellationToken) {
        let mut watcher = FeedWatcher::new(self.live_child.clone(), self.history_child.clone());

        loop {
            let result = tokio::select! {
                _ = cancel.cancelled() => break,
                result = self.stream_once(&tx, &mut watcher) => result,
            };

            match result {
                Ok(()) => tracing::info!("Telemetry stream ended by store"),
                Err(e) => tracing::warn!(error = %e, "Telemetry stream failed"),
            }
            if tx.is_closed() {
                break;
            }

            tracing::debug!(delay_ms = self.reconnect_delay.as_millis() as u64, "Reconnecting telemetry stream");
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.reconnect_delay) => {}
            }
        }

        tracing::debug!("Telemetry subscription task stopped");
    }

    async fn stream_once(&self, tx: &mpsc::Sender<ChannelEvent>, watcher: &mut FeedWatcher) -> Result<(), ChannelError> {
        let url = self.build_url(&self.root_path);
        let response = self
            .client
            .get(&url)
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ChannelError::Status { status, body });
        }
        tracing::info!(path = %self.root_path, "Subscribed to telemetry stream");

        forward_frames(sse_frames(response), tx, watcher).await
    }
}

/// Drives decoded frames through the watcher. A frame whose payload cannot be
/// decoded is dropped; the stream itself stays open.
async fn forward_frames<S>(frames: S, tx: &mpsc::Sender<ChannelEvent>, watcher: &mut FeedWatcher) -> Result<(), ChannelError>
where
    S: Stream<Item = Result<SseFrame, ChannelError>>,
{
    let mut frames = Box::pin(frames);
    while let Some(frame) = frames.next().await {
        let frame = frame?;
        match frame.event.as_str() {
            "put" | "patch" => {
                let events = match watcher.apply(&frame, Utc::now()) {
                    Ok(events) => events,
                    Err(ChannelError::Decode(e)) => {
                        tracing::warn!(error = %e, event = %frame.event, "Skipping malformed stream frame");
                        continue;
                    }
                    Err(e) => return Err(e),
                };
                for event in events {
                    if tx.send(event).await.is_err() {
                        return Ok(());
                    }
                }
            }
            "keep-alive" => {}
            "cancel" | "auth_revoked" => return Err(ChannelError::Closed(frame.event.clone())),
            other => tracing::debug!(event = other, "Ignoring stream event"),
        }
    }

    Ok(())
}

#[async_trait]
impl TelemetryChannel for RealtimeDbChannel {
    async fn subscribe(&self, cancel: CancellationToken) -> Result<Subscription, ChannelError> {
        let (tx, events) = mpsc::channel(EVENT_BUFFER);
        let task = tokio::spawn(self.clone().run_subscription(tx, cancel));
        Ok(Subscription { events, task })
    }

    async fn write_directive(&self, directive: &ControlDirective) -> Result<(), ChannelError> {
        let url = self.build_url(&format!("{}/{}", self.root_path, self.live_child));
        let response = self.client.patch(&url).json(directive).send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ChannelError::Status { status, body });
        }
        Ok(())
    }
}

fn sse_frames(response: reqwest::Response) -> impl Stream<Item = Result<SseFrame, ChannelError>> {
    async_stream::stream! {
        let mut decoder = SseDecoder::default();
        let mut body = response.bytes_stream();
        while let Some(chunk) = body.next().await {
            match chunk {
                Ok(bytes) => {
                    for frame in decoder.push(&bytes) {
                        yield Ok(frame);
                    }
                }
                Err(e) => {
                    yield Err(ChannelError::from(e));
                    break;
                }
            }
        }
    }
}

/// Keeps the mirrored tree and emits events only for the watched nodes that
/// actually changed since the last frame.
#[derive(Debug)]
struct FeedWatcher {
    mirror: JsonMirror,
    live_child: String,
    history_child: String,
    last_live: Option<[Value; 3]>,
    last_history: Option<Value>,
}

impl FeedWatcher {
    fn new(live_child: String, history_child: String) -> Self {
        Self {
            mirror: JsonMirror::default(),
            live_child,
            history_child,
            last_live: None,
            last_history: None,
        }
    }

    fn apply(&mut self, frame: &SseFrame, now: DateTime<Utc>) -> Result<Vec<ChannelEvent>, ChannelError> {
        let payload: StreamPayload =
            serde_json::from_str(&frame.data).map_err(|e| ChannelError::Decode(e.to_string()))?;

        if frame.event == "patch" {
            self.mirror.patch(&payload.path, payload.data);
        } else {
            self.mirror.put(&payload.path, payload.data);
        }

        Ok(self.changes(now))
    }

    fn changes(&mut self, now: DateTime<Utc>) -> Vec<ChannelEvent> {
        let mut events = Vec::new();
        let node = |key: &str| self.mirror.get(key).cloned().unwrap_or(Value::Null);

        let live = [node(&self.live_child), node("DC_Current"), node("DC_Voltage")];
        let history = node(&self.history_child);

        if self.last_live.as_ref() != Some(&live) {
            match sample_from_tree(self.mirror.root(), &self.live_child, now) {
                Some(sample) => events.push(ChannelEvent::Sample(sample)),
                None => tracing::warn!(node = %self.live_child, "Live node missing or malformed; holding last state"),
            }
            self.last_live = Some(live);
        }

        if self.last_history.as_ref() != Some(&history) {
            if !history.is_null() {
                events.push(ChannelEvent::History(history_from_node(&history)));
            }
            self.last_history = Some(history);
        }

        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::sample::RelayState;
    use serde_json::json;

    fn frame(event: &str, data: Value) -> SseFrame {
        SseFrame {
            event: event.to_string(),
            data: data.to_string(),
        }
    }

    fn settings(auth_token: Option<&str>) -> StoreSettings {
        StoreSettings {
            base_url: "https://power-demo.firebaseio.com/".to_string(),
            root_path: "2_AC_Power_Facter".to_string(),
            live_child: "1_AC_Power_Choke".to_string(),
            history_child: "history".to_string(),
            auth_token: auth_token.map(str::to_string),
            reconnect_delay_ms: 3_000,
        }
    }

    #[test]
    fn test_build_url() {
        let channel = RealtimeDbChannel::new(&settings(None));
        assert_eq!(
            channel.build_url("2_AC_Power_Facter/1_AC_Power_Choke"),
            "https://power-demo.firebaseio.com/2_AC_Power_Facter/1_AC_Power_Choke.json"
        );

        let channel = RealtimeDbChannel::new(&settings(Some("a b&c")));
        assert_eq!(
            channel.build_url("root"),
            "https://power-demo.firebaseio.com/root.json?auth=a%20b%26c"
        );
    }

    #[test]
    fn test_watcher_emits_only_changed_nodes() {
        let mut watcher = FeedWatcher::new("live".to_string(), "history".to_string());
        let now = Utc::now();

        let events = watcher
            .apply(
                &frame("put", json!({"path": "/", "data": {
                    "DC_Current": 0.3,
                    "live": {"I": 1.0, "V": 240.0, "Relay": 1, "Choke": "1"},
                    "history": {"a": {"ts": 5}}
                }})),
                now,
            )
            .unwrap();
        assert_eq!(events.len(), 2);
        match &events[0] {
            ChannelEvent::Sample(sample) => {
                assert_eq!(sample.voltage, 240.0);
                assert_eq!(sample.relay, RelayState::On);
                assert_eq!(sample.dc_current, 0.3);
            }
            other => panic!("expected sample, got {:?}", other),
        }
        assert!(matches!(&events[1], ChannelEvent::History(records) if records.len() == 1));

        let events = watcher
            .apply(&frame("patch", json!({"path": "/live", "data": {"I": 1.5}})), now)
            .unwrap();
        assert!(matches!(events.as_slice(), [ChannelEvent::Sample(s)] if s.current == 1.5));

        let events = watcher
            .apply(&frame("put", json!({"path": "/live/I", "data": 1.5})), now)
            .unwrap();
        assert!(events.is_empty());

        let events = watcher
            .apply(&frame("put", json!({"path": "/DC_Voltage", "data": 11.0})), now)
            .unwrap();
        assert!(matches!(events.as_slice(), [ChannelEvent::Sample(s)] if s.dc_voltage == 11.0));
    }

    #[test]
    fn test_watcher_holds_state_on_malformed_input() {
        let mut watcher = FeedWatcher::new("live".to_string(), "history".to_string());
        let events = watcher
            .apply(&frame("put", json!({"path": "/", "data": {"live": "offline"}})), Utc::now())
            .unwrap();
        assert!(events.is_empty());

        let err = watcher
            .apply(
                &SseFrame {
                    event: "put".to_string(),
                    data: "not json".to_string(),
                },
                Utc::now(),
            )
            .unwrap_err();
        assert!(matches!(err, ChannelError::Decode(_)));
    }

    fn currents(rx: &mut mpsc::Receiver<ChannelEvent>) -> Vec<f64> {
        let mut seen = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if let ChannelEvent::Sample(sample) = event {
                seen.push(sample.current);
            }
        }
        seen
    }

    #[tokio::test]
    async fn test_malformed_frame_does_not_end_stream() {
        let frames = vec![
            Ok(frame("put", json!({"path": "/", "data": {"live": {"I": 1.0, "V": 230.0}}}))),
            Ok(frame("put", json!({"data": 5}))),
            Ok(SseFrame {
                event: "patch".to_string(),
                data: "{broken".to_string(),
            }),
            Ok(frame("patch", json!({"path": "/live", "data": {"I": 2.0}}))),
        ];
        let (tx, mut rx) = mpsc::channel(8);
        let mut watcher = FeedWatcher::new("live".to_string(), "history".to_string());

        forward_frames(futures::stream::iter(frames), &tx, &mut watcher)
            .await
            .unwrap();

        assert_eq!(currents(&mut rx), vec![1.0, 2.0]);
    }

    #[tokio::test]
    async fn test_revoked_stream_closes_after_forwarding() {
        let frames = vec![
            Ok(frame("put", json!({"path": "/", "data": {"live": {"I": 1.0}}}))),
            Ok(SseFrame {
                event: "keep-alive".to_string(),
                data: "null".to_string(),
            }),
            Ok(SseFrame {
                event: "auth_revoked".to_string(),
                data: "credential is no longer valid".to_string(),
            }),
            Ok(frame("patch", json!({"path": "/live", "data": {"I": 2.0}}))),
        ];
        let (tx, mut rx) = mpsc::channel(8);
        let mut watcher = FeedWatcher::new("live".to_string(), "history".to_string());

        let err = forward_frames(futures::stream::iter(frames), &tx, &mut watcher)
            .await
            .unwrap_err();

        assert!(matches!(err, ChannelError::Closed(event) if event == "auth_revoked"));
        assert_eq!(currents(&mut rx), vec![1.0]);
    }
}
