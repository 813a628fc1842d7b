// Channel trait for the push-style telemetry store
use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::domain::sample::{ControlDirective, HistoryRecord, RawSample};

/// Typed events produced by a channel subscription.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent {
    Sample(RawSample),
    History(Vec<HistoryRecord>),
}

/// A running subscription. The task stops once the token passed to
/// `subscribe` is cancelled; the owner joins it on shutdown.
#[derive(Debug)]
pub struct Subscription {
    pub events: mpsc::Receiver<ChannelEvent>,
    pub task: JoinHandle<()>,
}

#[derive(Error, Debug)]
pub enum ChannelError {
    #[error("request to telemetry store failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("telemetry store returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed stream frame: {0}")]
    Decode(String),

    #[error("subscription closed by store: {0}")]
    Closed(String),
}

#[async_trait]
pub trait TelemetryChannel: Send + Sync {
    /// Starts delivering events until `cancel` fires.
    async fn subscribe(&self, cancel: CancellationToken) -> Result<Subscription, ChannelError>;

    /// Writes only the directive's set fields to the live-sample path.
    async fn write_directive(&self, directive: &ControlDirective) -> Result<(), ChannelError>;
}
