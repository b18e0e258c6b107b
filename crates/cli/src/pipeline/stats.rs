//! Run statistics.

use std::time::Duration;

use observability::ReconcileStatsAggregator;

/// Statistics from a live view run
#[derive(Debug, Clone, Default)]
pub struct PipelineStats {
    /// Stream events received from ingestion
    pub events_received: u64,

    /// View frames handed to the dispatcher
    pub frames_emitted: u64,

    /// Snapshot records installed / repeated ids
    pub snapshot_entities: usize,
    pub snapshot_duplicates: usize,

    /// Final dashboard state
    pub entities: usize,
    pub markers: usize,
    pub route_lines: usize,
    pub alerts_logged: usize,

    pub duration: Duration,

    pub active_channels: usize,
    pub active_sinks: usize,

    /// Reconciler outcomes
    pub reconcile: ReconcileStatsAggregator,

    /// Ingestion counters at shutdown
    pub ingestion: ingestion::MetricsSnapshot,

    /// Per-sink counters at shutdown
    pub sinks: Vec<(String, dispatcher::MetricsSnapshot)>,
}

impl PipelineStats {
    /// Stream events per second
    pub fn events_per_sec(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.events_received as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║                    Live View Statistics                      ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");

        println!("📊 Overview");
        println!("   ├─ Duration: {:.2}s", self.duration.as_secs_f64());
        println!("   ├─ Events received: {}", self.events_received);
        println!("   ├─ Events/s: {:.2}", self.events_per_sec());
        println!("   ├─ View frames: {}", self.frames_emitted);
        println!("   ├─ Active channels: {}", self.active_channels);
        println!("   └─ Active sinks: {}", self.active_sinks);

        println!("\n🚌 Fleet");
        println!(
            "   ├─ Snapshot: {} entities ({} duplicate ids)",
            self.snapshot_entities, self.snapshot_duplicates
        );
        println!("   ├─ Tracked entities: {}", self.entities);
        println!("   ├─ Markers: {}", self.markers);
        println!("   ├─ Route lines: {}", self.route_lines);
        println!("   └─ Alerts logged: {}", self.alerts_logged);

        println!("\n📥 Ingestion");
        println!("   ├─ Messages received: {}", self.ingestion.messages_received);
        println!("   ├─ Dropped (backpressure): {}", self.ingestion.messages_dropped);
        println!("   └─ Decode errors: {}", self.ingestion.decode_errors);

        if !self.sinks.is_empty() {
            println!("\n📤 Sinks");
            for (i, (name, snap)) in self.sinks.iter().enumerate() {
                let prefix = if i == self.sinks.len() - 1 { "└─" } else { "├─" };
                println!(
                    "   {} {}: {} written, {} failed, {} dropped",
                    prefix, name, snap.write_count, snap.failure_count, snap.dropped_count
                );
            }
        }

        println!("\n{}", self.reconcile.summary());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_per_sec_handles_zero_duration() {
        let mut stats = PipelineStats {
            events_received: 10,
            ..Default::default()
        };
        assert_eq!(stats.events_per_sec(), 0.0);

        stats.duration = Duration::from_secs(2);
        assert_eq!(stats.events_per_sec(), 5.0);
    }
}
