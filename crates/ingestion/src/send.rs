//! Backpressure-aware event sending

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use async_channel::{Receiver, Sender, TrySendError};
use contracts::{DropPolicy, LinkEvent};
use tracing::{trace, warn};

use crate::config::IngestionMetrics;

const WAIT_MIN: Duration = Duration::from_micros(200);
const WAIT_MAX: Duration = Duration::from_millis(20);

/// Sending half shared by channel adapters
///
/// Holds a receiver clone only under `DropOldest`, to evict the head of the
/// queue when it is full.
#[derive(Clone)]
pub struct EventSender {
    tx: Sender<LinkEvent>,
    evict: Option<Receiver<LinkEvent>>,
}

impl EventSender {
    pub fn new(tx: Sender<LinkEvent>, rx: &Receiver<LinkEvent>, drop_policy: DropPolicy) -> Self {
        let evict = match drop_policy {
            DropPolicy::DropOldest => Some(rx.clone()),
            DropPolicy::DropNewest => None,
        };
        Self { tx, evict }
    }

    pub fn drop_policy(&self) -> DropPolicy {
        if self.evict.is_some() {
            DropPolicy::DropOldest
        } else {
            DropPolicy::DropNewest
        }
    }

    /// Send one event, applying the drop policy when the queue is full
    ///
    /// Returns false once the downstream receiver is gone.
    pub fn send(&self, event: LinkEvent, metrics: &Arc<IngestionMetrics>) -> bool {
        let channel_id = event.channel_id.clone();
        let result = match self.tx.try_send(event) {
            Err(TrySendError::Full(event)) => {
                metrics.record_dropped();
                match &self.evict {
                    None => {
                        trace!(channel_id = %channel_id, "event dropped (newest)");
                        Ok(())
                    }
                    Some(evict) => {
                        let _ = evict.try_recv();
                        trace!(channel_id = %channel_id, "event dropped (oldest)");
                        self.tx.try_send(event).map(|_| ())
                    }
                }
            }
            other => other.map(|_| ()),
        };

        metrics.update_queue_len(self.tx.len());

        match result {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                // another producer refilled the slot between evict and send
                metrics.record_dropped();
                true
            }
            Err(TrySendError::Closed(_)) => {
                warn!(channel_id = %channel_id, "ingestion channel closed");
                false
            }
        }
    }
}

impl EventSender {
    /// Send one event, waiting for queue space instead of dropping
    ///
    /// Blocks the calling channel thread until the event is queued, the
    /// receiver is gone, or `active` turns false. Returns whether the event
    /// was queued.
    pub fn send_waiting(
        &self,
        event: LinkEvent,
        metrics: &Arc<IngestionMetrics>,
        active: &AtomicBool,
    ) -> bool {
        let mut event = event;
        let mut backoff = WAIT_MIN;
        loop {
            match self.tx.try_send(event) {
                Ok(()) => {
                    metrics.update_queue_len(self.tx.len());
                    return true;
                }
                Err(TrySendError::Closed(event)) => {
                    warn!(channel_id = %event.channel_id, "ingestion channel closed");
                    return false;
                }
                Err(TrySendError::Full(pending)) => {
                    if !active.load(Ordering::Relaxed) {
                        metrics.record_dropped();
                        trace!(channel_id = %pending.channel_id, "event dropped on stop");
                        return false;
                    }
                    metrics.update_queue_len(self.tx.len());
                    event = pending;
                    thread::sleep(backoff);
                    backoff = (backoff * 2).min(WAIT_MAX);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_channel::bounded;
    use contracts::LinkEventKind;

    fn connected(seq: usize) -> LinkEvent {
        LinkEvent {
            channel_id: format!("c{seq}"),
            kind: LinkEventKind::Connected,
        }
    }

    #[test]
    fn drop_newest_keeps_queue_head() {
        let (tx, rx) = bounded(2);
        let sender = EventSender::new(tx, &rx, DropPolicy::DropNewest);
        let metrics = Arc::new(IngestionMetrics::new());
        for seq in 0..4 {
            assert!(sender.send(connected(seq), &metrics));
        }
        assert_eq!(rx.try_recv().unwrap().channel_id, "c0");
        assert_eq!(rx.try_recv().unwrap().channel_id, "c1");
        assert_eq!(metrics.snapshot().messages_dropped, 2);
    }

    #[test]
    fn drop_oldest_keeps_latest() {
        let (tx, rx) = bounded(2);
        let sender = EventSender::new(tx, &rx, DropPolicy::DropOldest);
        let metrics = Arc::new(IngestionMetrics::new());
        for seq in 0..4 {
            assert!(sender.send(connected(seq), &metrics));
        }
        assert_eq!(rx.try_recv().unwrap().channel_id, "c2");
        assert_eq!(rx.try_recv().unwrap().channel_id, "c3");
        assert_eq!(metrics.snapshot().messages_dropped, 2);
    }

    #[test]
    fn send_waiting_holds_until_space() {
        let (tx, rx) = bounded(1);
        let sender = EventSender::new(tx, &rx, DropPolicy::DropNewest);
        let metrics = Arc::new(IngestionMetrics::new());
        let active = Arc::new(AtomicBool::new(true));

        assert!(sender.send_waiting(connected(0), &metrics, &active));
        let producer = {
            let metrics = metrics.clone();
            let active = active.clone();
            thread::spawn(move || sender.send_waiting(connected(1), &metrics, &active))
        };

        thread::sleep(Duration::from_millis(30));
        assert_eq!(rx.try_recv().unwrap().channel_id, "c0");
        assert!(producer.join().unwrap());
        assert_eq!(rx.recv_blocking().unwrap().channel_id, "c1");
        assert_eq!(metrics.snapshot().messages_dropped, 0);
    }

    #[test]
    fn send_waiting_gives_up_when_inactive() {
        let (tx, rx) = bounded(1);
        let sender = EventSender::new(tx, &rx, DropPolicy::DropNewest);
        let metrics = Arc::new(IngestionMetrics::new());
        let active = AtomicBool::new(true);

        assert!(sender.send_waiting(connected(0), &metrics, &active));
        active.store(false, Ordering::SeqCst);
        assert!(!sender.send_waiting(connected(1), &metrics, &active));
        assert_eq!(metrics.snapshot().messages_dropped, 1);
    }

    #[test]
    fn closed_receiver_reports_false() {
        let (tx, rx) = bounded(2);
        let sender = EventSender::new(tx, &rx, DropPolicy::DropNewest);
        drop(rx);
        let metrics = Arc::new(IngestionMetrics::new());
        assert!(!sender.send(connected(0), &metrics));
    }
}
