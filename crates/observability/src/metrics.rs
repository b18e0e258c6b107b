//! Live view metrics
//!
//! Records reconciliation, ingestion and dispatch metrics through the
//! `metrics` facade, and aggregates a run summary in memory.

use std::collections::HashMap;

use contracts::LinkState;
use metrics::{counter, gauge, histogram};

/// Record one applied delta
///
/// # Example
///
/// ```ignore
/// use observability::metrics::record_delta_applied;
///
/// let upserted = store.apply_update(&delta);
/// record_delta_applied(upserted, elapsed_us);
/// ```
pub fn record_delta_applied(upserted: bool, apply_us: f64) {
    counter!("fleetview_deltas_applied_total").increment(1);
    if upserted {
        counter!("fleetview_entities_upserted_total").increment(1);
    }
    histogram!("fleetview_delta_apply_us").record(apply_us);
}

/// Record a delta rejected by validation
pub fn record_delta_dropped(reason: &str) {
    counter!(
        "fleetview_deltas_dropped_total",
        "reason" => reason.to_string()
    )
    .increment(1);
}

/// Record an alert routed to the notification log
pub fn record_alert(category: &str) {
    counter!(
        "fleetview_alerts_total",
        "category" => category.to_string()
    )
    .increment(1);
}

/// Record the current link state (0 = disconnected, 1 = connected, 2 = receiving)
pub fn record_link_state(state: LinkState) {
    let value = match state {
        LinkState::Disconnected => 0.0,
        LinkState::Connected => 1.0,
        LinkState::Receiving => 2.0,
    };
    gauge!("fleetview_link_state").set(value);
    if state == LinkState::Disconnected {
        counter!("fleetview_link_disconnects_total").increment(1);
    }
}

/// Record a snapshot install
pub fn record_snapshot_loaded(entities: usize, duplicates: usize) {
    counter!("fleetview_snapshots_loaded_total").increment(1);
    gauge!("fleetview_tracked_entities").set(entities as f64);
    if duplicates > 0 {
        counter!("fleetview_snapshot_duplicate_ids_total").increment(duplicates as u64);
    }
}

/// Record store and overlay sizes
pub fn record_overlay_counts(entities: usize, markers: usize, lines: usize) {
    gauge!("fleetview_tracked_entities").set(entities as f64);
    gauge!("fleetview_markers").set(markers as f64);
    gauge!("fleetview_route_lines").set(lines as f64);
}

/// Record a view frame handed to a sink
pub fn record_frame_dispatched(sink_name: &str, success: bool) {
    let status = if success { "success" } else { "failure" };
    counter!(
        "fleetview_frames_dispatched_total",
        "sink" => sink_name.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record a rendered view frame by kind
pub fn record_view_frame(kind: &'static str) {
    counter!("fleetview_view_frames_total", "kind" => kind).increment(1);
}

/// Reconciliation aggregator
///
/// Aggregates per-event outcomes in memory for the end-of-run summary.
#[derive(Debug, Clone, Default)]
pub struct ReconcileStatsAggregator {
    pub total_events: u64,
    pub applied: u64,
    pub upserts: u64,
    pub dropped: u64,
    pub alerts: u64,
    pub disconnects: u64,

    /// Delta apply latency (microseconds)
    pub apply_stats: RunningStats,

    /// Reported speeds (km/h)
    pub speed_stats: RunningStats,

    pub alert_counts: HashMap<String, u64>,
    pub drop_reasons: HashMap<String, u64>,
}

impl ReconcileStatsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_applied(&mut self, upserted: bool, apply_us: f64, speed: Option<f64>) {
        self.total_events += 1;
        self.applied += 1;
        if upserted {
            self.upserts += 1;
        }
        self.apply_stats.push(apply_us);
        if let Some(speed) = speed {
            self.speed_stats.push(speed);
        }
    }

    pub fn record_dropped(&mut self, reason: &str) {
        self.total_events += 1;
        self.dropped += 1;
        *self.drop_reasons.entry(reason.to_string()).or_insert(0) += 1;
    }

    pub fn record_alert(&mut self, category: &str) {
        self.total_events += 1;
        self.alerts += 1;
        *self.alert_counts.entry(category.to_string()).or_insert(0) += 1;
    }

    pub fn record_disconnect(&mut self) {
        self.disconnects += 1;
    }

    /// Build summary report
    pub fn summary(&self) -> MetricsSummary {
        let deltas = self.applied + self.dropped;
        MetricsSummary {
            total_events: self.total_events,
            applied: self.applied,
            upserts: self.upserts,
            dropped: self.dropped,
            alerts: self.alerts,
            disconnects: self.disconnects,
            drop_rate: if deltas > 0 {
                self.dropped as f64 / deltas as f64 * 100.0
            } else {
                0.0
            },
            apply_us: self.apply_stats.summary(),
            speed_kmh: self.speed_stats.summary(),
            alert_counts: self.alert_counts.clone(),
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Reconciliation summary
#[derive(Debug, Clone, Default)]
pub struct MetricsSummary {
    pub total_events: u64,
    pub applied: u64,
    pub upserts: u64,
    pub dropped: u64,
    pub alerts: u64,
    pub disconnects: u64,
    pub drop_rate: f64,
    pub apply_us: StatsSummary,
    pub speed_kmh: StatsSummary,
    pub alert_counts: HashMap<String, u64>,
}

impl std::fmt::Display for MetricsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Live View Summary ===")?;
        writeln!(f, "Total events: {}", self.total_events)?;
        writeln!(f, "Deltas applied: {} (upserts: {})", self.applied, self.upserts)?;
        writeln!(f, "Deltas dropped: {} ({:.2}%)", self.dropped, self.drop_rate)?;
        writeln!(f, "Alerts: {}", self.alerts)?;
        writeln!(f, "Disconnects: {}", self.disconnects)?;
        writeln!(f, "Apply latency (us): {}", self.apply_us)?;
        writeln!(f, "Speed (km/h): {}", self.speed_kmh)?;

        if !self.alert_counts.is_empty() {
            writeln!(f, "Alerts by category:")?;
            let mut counts: Vec<_> = self.alert_counts.iter().collect();
            counts.sort();
            for (category, count) in counts {
                writeln!(f, "  {}: {}", category, count)?;
            }
        }

        Ok(())
    }
}

/// Condensed view of a [`RunningStats`]
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.count {
            0 => f.write_str("N/A"),
            n => write!(
                f,
                "mean {:.3} +/- {:.3} over [{:.3}, {:.3}] (n={n})",
                self.mean, self.std_dev, self.min, self.max
            ),
        }
    }
}

/// Streaming mean, spread and range of a sample series
///
/// Mean and variance are updated incrementally (Welford), so a long replay
/// never keeps its samples around.
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    sq_dev: f64,
    range: Option<(f64, f64)>,
}

impl RunningStats {
    pub fn push(&mut self, value: f64) {
        self.count += 1;
        let before = value - self.mean;
        self.mean += before / self.count as f64;
        self.sq_dev += before * (value - self.mean);
        self.range = Some(match self.range {
            None => (value, value),
            Some((lo, hi)) => (lo.min(value), hi.max(value)),
        });
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// Sample variance; zero until two samples exist
    pub fn variance(&self) -> f64 {
        match self.count {
            0 | 1 => 0.0,
            n => self.sq_dev / (n - 1) as f64,
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.range.map_or(0.0, |(lo, _)| lo)
    }

    pub fn max(&self) -> f64 {
        self.range.map_or(0.0, |(_, hi)| hi)
    }

    pub fn summary(&self) -> StatsSummary {
        StatsSummary {
            count: self.count,
            min: self.min(),
            max: self.max(),
            mean: self.mean,
            std_dev: self.std_dev(),
        }
    }
}
