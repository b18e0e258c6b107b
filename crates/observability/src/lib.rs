//! Logging and metrics for fleetview
//!
//! `init_with_config` installs the `tracing` subscriber (and optionally the
//! Prometheus exporter) once per process. The `metrics` module holds the
//! counters and gauges the reconciler, ingestion and dispatcher record,
//! plus the in-memory aggregator behind the end-of-run summary.
//!
//! ```ignore
//! observability::init_with_config(ObservabilityConfig {
//!     log_format: LogFormat::Compact,
//!     ..Default::default()
//! })?;
//! observability::record_link_state(reconciler.state());
//! ```

pub mod metrics;

use anyhow::{Context, Result};
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub use crate::metrics::{
    record_alert, record_delta_applied, record_delta_dropped, record_frame_dispatched,
    record_link_state, record_overlay_counts, record_snapshot_loaded, record_view_frame,
    MetricsSummary, ReconcileStatsAggregator, RunningStats, StatsSummary,
};

/// Subscriber and exporter settings
#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    pub log_format: LogFormat,
    /// Serve `/metrics` on this port when set
    pub metrics_port: Option<u16>,
    /// Filter used when `RUST_LOG` is absent or unparsable
    pub fallback_filter: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_format: LogFormat::default(),
            metrics_port: None,
            fallback_filter: "info".into(),
        }
    }
}

/// Log line layout
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// One JSON object per event, with span context
    #[default]
    Json,
    /// Multi-line, for a developer terminal
    Pretty,
    /// Single line without targets
    Compact,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "pretty" => Ok(Self::Pretty),
            "compact" => Ok(Self::Compact),
            other => Err(format!("unknown log format '{other}' (json, pretty, compact)")),
        }
    }
}

fn env_filter_or(fallback: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback))
}

/// Install the global subscriber, then the exporter if a port is set
///
/// # Errors
/// Fails if a subscriber is already installed or the exporter cannot bind.
pub fn init_with_config(config: ObservabilityConfig) -> Result<()> {
    let registry = tracing_subscriber::registry().with(env_filter_or(&config.fallback_filter));
    let installed = match config.log_format {
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_thread_names(true),
            )
            .try_init(),
        LogFormat::Pretty => registry.with(fmt::layer().pretty()).try_init(),
        LogFormat::Compact => registry
            .with(fmt::layer().compact().with_target(false))
            .try_init(),
    };
    installed.context("tracing subscriber already installed")?;

    if let Some(port) = config.metrics_port {
        init_metrics_only(port)?;
    }
    tracing::debug!(format = ?config.log_format, "logging ready");
    Ok(())
}

/// Install only the Prometheus recorder, listening on every interface
pub fn init_metrics_only(port: u16) -> Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(([0, 0, 0, 0], port))
        .install()
        .with_context(|| format!("cannot serve metrics on port {port}"))?;
    tracing::info!(port, "metrics endpoint listening");
    Ok(())
}

/// Compact logging captured by the test harness
///
/// Safe to call from every test; only the first call installs.
pub fn init_test_logging() {
    let _ = tracing_subscriber::registry()
        .with(env_filter_or("debug"))
        .with(fmt::layer().compact().with_test_writer())
        .try_init();
}
