//! Generic channel adapter
//!
//! Adapts any `RealtimeChannel` to `ChannelAdapter`, so the pipeline treats
//! replayed, simulated and live transports the same way.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use contracts::{ChannelCallback, ChannelSignal, LinkEvent, LinkEventKind, RealtimeChannel};
use tracing::{debug, trace, warn};

use crate::adapter::ChannelAdapter;
use crate::codec::decode_event;
use crate::config::IngestionMetrics;
use crate::send::EventSender;

/// Generic channel adapter
pub struct GenericChannelAdapter {
    channel_id: String,
    channel: Box<dyn RealtimeChannel>,
    subscribed: Arc<AtomicBool>,
}

impl GenericChannelAdapter {
    pub fn new(channel_id: String, channel: Box<dyn RealtimeChannel>) -> Self {
        Self {
            channel_id,
            channel,
            subscribed: Arc::new(AtomicBool::new(false)),
        }
    }
}

/// Map one raw signal to a link event, counting decode failures
fn to_link_event(
    channel_id: &str,
    signal: ChannelSignal,
    metrics: &IngestionMetrics,
) -> Option<LinkEvent> {
    let kind = match signal {
        ChannelSignal::Connected => LinkEventKind::Connected,
        ChannelSignal::Disconnected => LinkEventKind::Disconnected,
        ChannelSignal::Message(raw) => match decode_event(channel_id, &raw) {
            Ok(event) => LinkEventKind::Event(event),
            Err(e) => {
                metrics.record_decode_error();
                warn!(channel_id = %channel_id, error = %e, "dropping undecodable message");
                return None;
            }
        },
    };
    Some(LinkEvent {
        channel_id: channel_id.to_string(),
        kind,
    })
}

impl ChannelAdapter for GenericChannelAdapter {
    fn channel_id(&self) -> &str {
        &self.channel_id
    }

    fn start(&self, sender: EventSender, metrics: Arc<IngestionMetrics>) {
        if self.subscribed.swap(true, Ordering::SeqCst) {
            return;
        }

        let channel_id = self.channel_id.clone();
        let subscribed = self.subscribed.clone();
        let waits = self.channel.waits_for_consumer();

        debug!(channel_id = %channel_id, waits, "starting generic adapter");

        let callback: ChannelCallback = Arc::new(move |signal| {
            if !subscribed.load(Ordering::Relaxed) {
                return;
            }

            metrics.record_received();
            trace!(channel_id = %channel_id, "generic adapter received signal");
            if let Some(event) = to_link_event(&channel_id, signal, &metrics) {
                // link signals are never dropped
                if waits || !matches!(event.kind, LinkEventKind::Event(_)) {
                    sender.send_waiting(event, &metrics, &subscribed);
                } else {
                    sender.send(event, &metrics);
                }
            }
        });

        self.channel.subscribe(callback);
    }

    fn stop(&self) {
        if self.subscribed.swap(false, Ordering::SeqCst) {
            debug!(channel_id = %self.channel_id, "stopping generic adapter");
            self.channel.stop();
        }
    }

    fn is_subscribed(&self) -> bool {
        self.subscribed.load(Ordering::Relaxed)
    }
}
