//! View frame fan-out
//!
//! One task reads the reconciler's frame channel and offers every frame to
//! each sink queue in turn. A full queue costs that sink the frame; the
//! other sinks still receive it.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument};

use contracts::{SinkConfig, SinkType, ViewFrame};

use crate::error::DispatcherError;
use crate::handle::SinkHandle;
use crate::metrics::MetricsSnapshot;
use crate::sinks::{FileSink, LogSink};

/// Final or live counters, one entry per sink in config order
pub type SinkReport = Vec<(String, MetricsSnapshot)>;

const PROGRESS_EVERY: u64 = 100;

/// Fans view frames out to sinks
pub struct Dispatcher {
    sinks: Vec<SinkHandle>,
    frames: mpsc::Receiver<ViewFrame>,
}

impl Dispatcher {
    /// Dispatch into already running sink handles
    pub fn with_handles(sinks: Vec<SinkHandle>, frames: mpsc::Receiver<ViewFrame>) -> Self {
        Self { sinks, frames }
    }

    pub fn sink_count(&self) -> usize {
        self.sinks.len()
    }

    /// Per-sink metrics
    pub fn metrics(&self) -> SinkReport {
        self.sinks
            .iter()
            .map(|sink| (sink.name().to_string(), sink.metrics().snapshot()))
            .collect()
    }

    /// Forward frames until the input closes, then drain every sink
    ///
    /// Returns the per-sink counters taken after each sink has flushed.
    #[instrument(name = "dispatcher_run", skip(self), fields(sinks = self.sinks.len()))]
    pub async fn run(self) -> SinkReport {
        let Self { sinks, mut frames } = self;
        info!("dispatcher started");

        let mut forwarded = 0u64;
        while let Some(frame) = frames.recv().await {
            for sink in &sinks {
                // drops are logged and counted by the handle
                let _ = sink.try_send(frame.clone());
            }
            forwarded += 1;
            if forwarded.is_multiple_of(PROGRESS_EVERY) {
                debug!(frames = forwarded, "dispatcher progress");
            }
        }

        info!(frames = forwarded, "frame channel closed, draining sinks");
        let mut report = Vec::with_capacity(sinks.len());
        for sink in sinks {
            let name = sink.name().to_string();
            let metrics = Arc::clone(sink.metrics());
            sink.shutdown().await;
            report.push((name, metrics.snapshot()));
        }
        info!("dispatcher stopped");
        report
    }

    /// Run on a background task
    pub fn spawn(self) -> JoinHandle<SinkReport> {
        tokio::spawn(self.run())
    }
}

/// Start one sink handle per config entry and a dispatcher over them
///
/// # Errors
/// `SinkCreation` if any sink cannot be opened; sinks started before the
/// failing entry are dropped with it.
#[instrument(name = "dispatcher_create", skip_all, fields(sinks = sink_configs.len()))]
pub fn create_dispatcher(
    sink_configs: Vec<SinkConfig>,
    frames: mpsc::Receiver<ViewFrame>,
) -> Result<Dispatcher, DispatcherError> {
    let sinks = sink_configs
        .iter()
        .map(open_sink)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Dispatcher::with_handles(sinks, frames))
}

#[instrument(
    name = "dispatcher_open_sink",
    skip(config),
    fields(sink = %config.name, sink_type = ?config.sink_type)
)]
fn open_sink(config: &SinkConfig) -> Result<SinkHandle, DispatcherError> {
    let handle = match config.sink_type {
        SinkType::Log => SinkHandle::spawn(LogSink::new(&config.name), config.queue_capacity),
        SinkType::File => {
            let sink = FileSink::from_params(&config.name, &config.params)
                .map_err(|e| DispatcherError::sink_creation(&config.name, e.to_string()))?;
            SinkHandle::spawn(sink, config.queue_capacity)
        }
    };
    debug!("sink opened");
    Ok(handle)
}
