//! Per-sink queue and writer task
//!
//! Each sink gets its own bounded queue, so a slow file sink drops its own
//! frames without holding back the others.

use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, instrument, warn};

use contracts::{ViewFrame, ViewSink};

use crate::error::DispatcherError;
use crate::metrics::SinkMetrics;

/// Front half of a sink: the queue the dispatcher pushes into
pub struct SinkHandle {
    name: String,
    queue: mpsc::Sender<ViewFrame>,
    metrics: Arc<SinkMetrics>,
    writer: JoinHandle<()>,
}

impl SinkHandle {
    /// Start a writer task for `sink` behind a queue of `queue_capacity` frames
    pub fn spawn<S: ViewSink + Send + 'static>(sink: S, queue_capacity: usize) -> Self {
        let (queue, frames) = mpsc::channel(queue_capacity.max(1));
        let writer = SinkWriter {
            name: sink.name().to_string(),
            sink,
            metrics: Arc::new(SinkMetrics::new()),
        };
        let name = writer.name.clone();
        let metrics = Arc::clone(&writer.metrics);

        Self {
            name,
            queue,
            metrics,
            writer: tokio::spawn(writer.run(frames)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn metrics(&self) -> &Arc<SinkMetrics> {
        &self.metrics
    }

    /// Queue a frame without waiting
    ///
    /// # Errors
    /// `QueueFull` when the sink is behind (the frame is dropped and
    /// counted), `SinkClosed` if the writer has exited.
    pub fn try_send(&self, frame: ViewFrame) -> Result<(), DispatcherError> {
        let frame = match self.queue.try_send(frame) {
            Ok(()) => {
                let backlog = self.queue.max_capacity() - self.queue.capacity();
                self.metrics.set_queue_len(backlog);
                return Ok(());
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                error!(sink = %self.name, "sink writer exited early");
                return Err(DispatcherError::SinkClosed {
                    sink_name: self.name.clone(),
                });
            }
            Err(mpsc::error::TrySendError::Full(frame)) => frame,
        };

        self.metrics.inc_dropped_count();
        observability::record_frame_dispatched(&self.name, false);
        warn!(sink = %self.name, seq = frame.seq, "sink behind, frame dropped");
        Err(DispatcherError::QueueFull {
            sink_name: self.name.clone(),
            seq: frame.seq,
        })
    }

    /// Close the queue and wait for the writer
    ///
    /// Frames already queued are written before the sink is flushed and
    /// closed.
    #[instrument(name = "sink_handle_shutdown", skip(self), fields(sink = %self.name))]
    pub async fn shutdown(self) {
        let Self { name, queue, writer, .. } = self;
        drop(queue);
        match writer.await {
            Ok(()) => debug!(sink = %name, "sink writer joined"),
            Err(e) => error!(sink = %name, error = ?e, "sink writer panicked"),
        }
    }
}

/// Back half of a sink: drains the queue into the sink
struct SinkWriter<S> {
    name: String,
    sink: S,
    metrics: Arc<SinkMetrics>,
}

impl<S: ViewSink> SinkWriter<S> {
    #[instrument(name = "sink_writer", skip_all, fields(sink = %self.name))]
    async fn run(mut self, mut frames: mpsc::Receiver<ViewFrame>) {
        debug!("sink writer started");

        while let Some(frame) = frames.recv().await {
            self.metrics.set_queue_len(frames.len());
            self.write(&frame).await;
        }

        if let Err(e) = self.sink.flush().await {
            error!(error = %e, "final flush failed");
        }
        if let Err(e) = self.sink.close().await {
            error!(error = %e, "close failed");
        }

        debug!(written = self.metrics.snapshot().write_count, "sink writer stopped");
    }

    async fn write(&mut self, frame: &ViewFrame) {
        let written = self.sink.write(frame).await;
        observability::record_frame_dispatched(&self.name, written.is_ok());
        match written {
            Ok(()) => self.metrics.record_write(frame.seq),
            Err(e) => {
                self.metrics.inc_failure_count();
                error!(seq = frame.seq, kind = frame.payload.kind(), error = %e, "frame write failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{ContractError, LinkState, ViewPayload};
    use std::sync::atomic::{AtomicU64, Ordering};
    use tokio::time::{sleep, Duration};

    struct MockSink {
        name: String,
        write_count: Arc<AtomicU64>,
        should_fail: bool,
        delay_ms: u64,
    }

    impl ViewSink for MockSink {
        fn name(&self) -> &str {
            &self.name
        }

        async fn write(&mut self, _frame: &ViewFrame) -> Result<(), ContractError> {
            if self.delay_ms > 0 {
                sleep(Duration::from_millis(self.delay_ms)).await;
            }
            if self.should_fail {
                return Err(ContractError::sink_write(&self.name, "mock failure"));
            }
            self.write_count.fetch_add(1, Ordering::Relaxed);
            Ok(())
        }

        async fn flush(&mut self) -> Result<(), ContractError> {
            Ok(())
        }

        async fn close(&mut self) -> Result<(), ContractError> {
            Ok(())
        }
    }

    fn frame(seq: u64) -> ViewFrame {
        ViewFrame {
            seq,
            payload: ViewPayload::Link {
                state: LinkState::Connected,
            },
        }
    }

    fn mock(name: &str, should_fail: bool, delay_ms: u64) -> (MockSink, Arc<AtomicU64>) {
        let write_count = Arc::new(AtomicU64::new(0));
        let sink = MockSink {
            name: name.to_string(),
            write_count: Arc::clone(&write_count),
            should_fail,
            delay_ms,
        };
        (sink, write_count)
    }

    #[tokio::test]
    async fn writes_every_queued_frame() {
        let (sink, write_count) = mock("test", false, 0);
        let handle = SinkHandle::spawn(sink, 10);

        for seq in 0..5 {
            assert!(handle.try_send(frame(seq)).is_ok());
        }

        let metrics = Arc::clone(handle.metrics());
        handle.shutdown().await;
        assert_eq!(write_count.load(Ordering::Relaxed), 5);
        assert_eq!(metrics.last_seq(), 4);
    }

    #[tokio::test]
    async fn slow_sink_drops_when_full() {
        let (sink, _) = mock("slow", false, 100);
        let handle = SinkHandle::spawn(sink, 2);

        let mut rejected = 0;
        for seq in 0..10 {
            if let Err(DispatcherError::QueueFull { .. }) = handle.try_send(frame(seq)) {
                rejected += 1;
            }
        }

        assert!(rejected > 0);
        assert_eq!(handle.metrics().dropped_count(), rejected);
        handle.shutdown().await;
    }

    #[tokio::test]
    async fn failures_are_isolated() {
        let (sink, _) = mock("failing", true, 0);
        let handle = SinkHandle::spawn(sink, 10);

        for seq in 0..3 {
            let _ = handle.try_send(frame(seq));
        }

        sleep(Duration::from_millis(50)).await;
        assert_eq!(handle.metrics().failure_count(), 3);

        handle.shutdown().await;
    }
}
