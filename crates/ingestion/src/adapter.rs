//! Channel adapter trait

use std::sync::Arc;

use crate::config::IngestionMetrics;
use crate::send::EventSender;

/// Channel adapter trait
///
/// One adapter per registered realtime channel. It is responsible for:
/// 1. subscribing to the channel
/// 2. decoding raw messages
/// 3. wrapping them as `LinkEvent`
/// 4. sending downstream (handling backpressure)
pub trait ChannelAdapter: Send + Sync {
    fn channel_id(&self) -> &str;

    /// Start forwarding
    fn start(&self, sender: EventSender, metrics: Arc<IngestionMetrics>);

    /// Stop forwarding
    fn stop(&self);

    fn is_subscribed(&self) -> bool;
}
