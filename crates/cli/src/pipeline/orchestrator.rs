//! Live view orchestrator - coordinates all components.
//!
//! snapshot -> dashboard -> full frame, then
//! stream -> ingestion -> reconciler -> patch / alert / link frames -> dispatcher

use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use contracts::{
    DashboardConfig, Entity, LinkEventKind, SnapshotConfig, StreamSource, ViewFrame, ViewPayload,
};
use ingestion::{
    load_snapshot, BackpressureConfig, FileSnapshotSource, IngestionPipeline, ReplayChannel,
    ReplayConfig, SimulatedFleetChannel, SimulatedFleetConfig, StaticSnapshotSource,
};
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracker::{ActionTable, Dashboard, ReconcileEffect, Reconciler, Renderer, SceneMap, UiAction};

use super::PipelineStats;

/// Run configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub dashboard: DashboardConfig,

    /// Maximum number of stream events (None = unlimited)
    pub max_events: Option<u64>,

    /// Run timeout (None = no timeout)
    pub timeout: Option<Duration>,

    /// Metrics server port (None = disabled)
    pub metrics_port: Option<u16>,

    /// Restart a replay source at its end
    pub replay_loop: bool,

    /// Actions applied after the snapshot loads
    pub actions: Vec<UiAction>,

    /// Final scene export path
    pub scene_out: Option<PathBuf>,
}

/// Main orchestrator
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Run the live view to completion
    ///
    /// Completes when the stream ends (a finite replay disconnects), the
    /// event limit is reached or the timeout fires. Without a stream source
    /// only the initial view is produced.
    pub async fn run(self) -> Result<PipelineStats> {
        let start_time = Instant::now();
        let config = &self.config.dashboard;

        if let Some(port) = self.config.metrics_port {
            observability::init_metrics_only(port)?;
            info!("Metrics endpoint available on port {}", port);
        }

        // Snapshot
        let entities = fetch_snapshot(&config.snapshot).await;

        let mut dashboard = Dashboard::new(SceneMap::new(&config.map), config);
        let snapshot = dashboard.load_snapshot(entities.clone());

        // Dispatcher
        let (view_tx, view_rx) = mpsc::channel::<ViewFrame>(config.stream.channel_capacity);
        if config.sinks.is_empty() {
            warn!("No sinks configured - view frames will be dropped");
        }
        let dispatcher = dispatcher::create_dispatcher(config.sinks.clone(), view_rx)
            .context("Failed to create dispatcher")?;
        let active_sinks = dispatcher.sink_count();
        let dispatcher_handle = dispatcher.spawn();
        info!(active_sinks, "Dispatcher started");

        // Startup actions
        let table = ActionTable::new();
        for action in self.config.actions.iter().cloned() {
            let kind = action.kind();
            if let Err(e) = table.dispatch(&mut dashboard, action) {
                warn!(action = kind.as_str(), error = %e, "startup action failed");
            }
        }

        let mut renderer = Renderer::new();
        let mut stats = PipelineStats {
            snapshot_entities: snapshot.installed,
            snapshot_duplicates: snapshot.duplicates,
            active_sinks,
            ..Default::default()
        };

        if view_tx.send(renderer.full_frame(&dashboard)).await.is_err() {
            warn!("Dispatcher channel closed");
        }

        // Ingestion
        let mut ingestion =
            IngestionPipeline::with_config(BackpressureConfig::from(&config.stream));
        let stop_on_disconnect =
            register_source(&mut ingestion, &config.stream.source, &entities, self.config.replay_loop)?;
        stats.active_channels = ingestion.channel_count();

        let mut reconciler = Reconciler::new();

        if stats.active_channels > 0 {
            let rx = ingestion
                .take_receiver()
                .context("Failed to get ingestion receiver")?;
            ingestion.start_all();

            let max_events = self.config.max_events;
            info!(max_events = ?max_events, channels = stats.active_channels, "Live view running");

            let stream_task = async {
                while let Ok(event) = rx.recv().await {
                    stats.events_received += 1;
                    let disconnected = matches!(event.kind, LinkEventKind::Disconnected);

                    let outcome = reconciler.handle(&mut dashboard, event);

                    let mut frames = Vec::with_capacity(2);
                    if let Some(state) = outcome.link_changed {
                        frames.push(renderer.frame(ViewPayload::Link { state }));
                    }
                    match outcome.effect {
                        ReconcileEffect::Applied { entity_id, .. } => {
                            frames.extend(renderer.patch_frame(&dashboard, &entity_id));
                        }
                        ReconcileEffect::Alert(alert) => {
                            frames.push(renderer.frame(ViewPayload::Alert(alert)));
                        }
                        ReconcileEffect::Dropped { .. } | ReconcileEffect::None => {}
                    }

                    for frame in frames {
                        if view_tx.send(frame).await.is_err() {
                            warn!("Dispatcher channel closed");
                            return;
                        }
                    }

                    if disconnected && stop_on_disconnect {
                        info!("Stream ended");
                        return;
                    }
                    if max_events.is_some_and(|max| stats.events_received >= max) {
                        info!(events = stats.events_received, "Reached max events limit");
                        return;
                    }
                }
            };

            if let Some(timeout) = self.config.timeout {
                if tokio::time::timeout(timeout, stream_task).await.is_err() {
                    warn!(timeout_secs = timeout.as_secs(), "Run timed out");
                }
            } else {
                stream_task.await;
            }
        } else {
            info!("No stream source configured, initial view only");
        }

        // Shutdown
        info!("Shutting down live view...");
        ingestion.close();
        stats.ingestion = ingestion.metrics().snapshot();

        if let Some(path) = &self.config.scene_out {
            let json = dashboard.map().to_json().context("Failed to export scene")?;
            tokio::fs::write(path, json)
                .await
                .with_context(|| format!("Failed to write scene to {}", path.display()))?;
            info!(path = %path.display(), "Scene written");
        }

        stats.entities = dashboard.store().len();
        stats.markers = dashboard.overlays().marker_count();
        stats.route_lines = dashboard.overlays().line_count();
        stats.alerts_logged = dashboard.alerts().len();
        stats.frames_emitted = renderer.frames_emitted();
        stats.reconcile = reconciler.into_stats();
        dashboard.teardown();

        drop(view_tx);
        match tokio::time::timeout(Duration::from_secs(5), dispatcher_handle).await {
            Ok(Ok(sinks)) => stats.sinks = sinks,
            Ok(Err(e)) => warn!(error = %e, "Dispatcher task failed"),
            Err(_) => warn!("Dispatcher did not drain within 5s"),
        }

        stats.duration = start_time.elapsed();
        info!(
            duration_secs = stats.duration.as_secs_f64(),
            events = stats.events_received,
            "Live view shutdown complete"
        );

        Ok(stats)
    }
}

/// Fetch the activation snapshot; a failed fetch yields an empty fleet
async fn fetch_snapshot(config: &SnapshotConfig) -> Vec<Entity> {
    let fetched = match &config.path {
        Some(path) => load_snapshot(&mut FileSnapshotSource::new(path)).await,
        None => load_snapshot(&mut StaticSnapshotSource::new(config.entities.clone())).await,
    };
    fetched.unwrap_or_default()
}

/// Register the configured stream source
///
/// Returns whether the run should end when the source disconnects.
fn register_source(
    ingestion: &mut IngestionPipeline,
    source: &StreamSource,
    entities: &[Entity],
    replay_loop: bool,
) -> Result<bool> {
    match source {
        StreamSource::Replay { path, rate_hz } => {
            let channel = ReplayChannel::open(
                "replay",
                path,
                ReplayConfig {
                    rate_hz: *rate_hz,
                    loop_playback: replay_loop,
                },
            )
            .with_context(|| format!("Failed to open replay {}", path.display()))?;
            info!(path = %path.display(), messages = channel.message_count(), "Running in REPLAY mode");
            ingestion.register_channel("replay".to_string(), Box::new(channel))?;
            Ok(!replay_loop)
        }
        StreamSource::Simulated {
            rate_hz,
            seed,
            step_deg,
        } => {
            let channel = SimulatedFleetChannel::new(
                "simulated",
                entities,
                SimulatedFleetConfig {
                    rate_hz: *rate_hz,
                    seed: *seed,
                    step_deg: *step_deg,
                    ..Default::default()
                },
            );
            info!(entities = channel.entity_count(), rate_hz = *rate_hz, "Running in SIMULATED mode");
            ingestion.register_channel("simulated".to_string(), Box::new(channel))?;
            Ok(false)
        }
        StreamSource::None => Ok(false),
    }
}
