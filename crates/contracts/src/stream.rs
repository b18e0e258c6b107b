//! Realtime stream contracts
//!
//! Defines the realtime channel abstraction and the decoded event shapes.
//! Channels deliver raw message text; decoding happens in ingestion so a bad
//! message can be counted and dropped without stopping the channel.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::{Alert, EntityDelta};

/// Decoded stream message
///
/// Wire form: `{"event": "bus_location", "data": {...}}` or
/// `{"event": "alert", "data": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum StreamEvent {
    /// Position / status delta
    #[serde(rename = "bus_location", alias = "delta")]
    Delta(EntityDelta),

    /// Alert routed to the notification sink
    Alert(Alert),
}

/// Raw signal emitted by a realtime channel
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelSignal {
    /// Transport connected
    Connected,
    /// Transport lost or closed
    Disconnected,
    /// One raw message (JSON text)
    Message(String),
}

/// Channel signal callback type
///
/// Uses `Arc` so one callback can be shared across transport threads.
pub type ChannelCallback = Arc<dyn Fn(ChannelSignal) + Send + Sync>;

/// Realtime channel trait
///
/// Abstracts the transport that pushes live fleet messages (socket,
/// recorded replay, simulation). The pipeline owns decoding and
/// backpressure, channels only deliver signals in order.
///
/// # Example
///
/// ```ignore
/// let channel: Box<dyn RealtimeChannel> = ReplayChannel::open(path, config)?;
/// channel.subscribe(Arc::new(|signal| {
///     println!("signal: {signal:?}");
/// }));
/// channel.stop();
/// ```
pub trait RealtimeChannel: Send + Sync {
    /// Channel identifier (used for logging/metrics)
    fn channel_id(&self) -> &str;

    /// Start delivering signals to `callback`
    ///
    /// Repeated calls while subscribed must be idempotent.
    fn subscribe(&self, callback: ChannelCallback);

    /// Stop delivering signals
    fn stop(&self);

    /// Check if currently subscribed
    fn is_subscribed(&self) -> bool;

    /// Whether messages wait for queue space instead of being dropped
    ///
    /// Recorded sources return true so a full queue slows playback down.
    /// Live transports keep the default and are subject to the drop policy.
    /// Connected / Disconnected signals always wait.
    fn waits_for_consumer(&self) -> bool {
        false
    }
}

/// Connection state of the live link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkState {
    #[default]
    Disconnected,
    Connected,
    Receiving,
}

impl fmt::Display for LinkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Disconnected => "disconnected",
            Self::Connected => "connected",
            Self::Receiving => "receiving",
        };
        f.write_str(name)
    }
}

/// Ingestion output: one link event tagged with its channel
#[derive(Debug, Clone, PartialEq)]
pub struct LinkEvent {
    pub channel_id: String,
    pub kind: LinkEventKind,
}

/// Link event payload
#[derive(Debug, Clone, PartialEq)]
pub enum LinkEventKind {
    Connected,
    Disconnected,
    Event(StreamEvent),
}

impl LinkEvent {
    pub fn event(channel_id: impl Into<String>, event: StreamEvent) -> Self {
        Self {
            channel_id: channel_id.into(),
            kind: LinkEventKind::Event(event),
        }
    }
}
