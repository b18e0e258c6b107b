//! Live update reconciler
//!
//! Link state machine over the realtime stream:
//!
//! ```text
//! Disconnected --connect--> Connected --event--> Receiving
//!      ^                                             |
//!      +------------------disconnect-----------------+
//! ```
//!
//! Events are applied in arrival order with no reordering, dedup or
//! staleness checks. Disconnection is passive; a reconnect resumes without
//! a fresh snapshot.

use std::time::Instant;

use contracts::{
    Alert, EntityDelta, EntityId, LinkEvent, LinkEventKind, LinkState, MapSurface, StreamEvent,
};
use observability::ReconcileStatsAggregator;
use tracing::{debug, info, instrument, warn};

use crate::dashboard::{Dashboard, DeltaOutcome};

/// What an event did to the dashboard
#[derive(Debug, Clone, PartialEq)]
pub enum ReconcileEffect {
    /// Link transition only
    None,
    Applied {
        entity_id: EntityId,
        outcome: DeltaOutcome,
    },
    /// Delta rejected by validation; the stream continues
    Dropped { entity_id: EntityId, reason: String },
    Alert(Alert),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReconcileOutcome {
    /// New link state, if this event changed it
    pub link_changed: Option<LinkState>,
    pub effect: ReconcileEffect,
}

/// Live update reconciler
#[derive(Debug, Default)]
pub struct Reconciler {
    state: LinkState,
    stats: ReconcileStatsAggregator,
}

impl Reconciler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    pub fn stats(&self) -> &ReconcileStatsAggregator {
        &self.stats
    }

    pub fn into_stats(self) -> ReconcileStatsAggregator {
        self.stats
    }

    /// Handle one link event against the dashboard
    #[instrument(
        level = "trace",
        name = "reconciler_handle",
        skip(self, dashboard, event),
        fields(channel_id = %event.channel_id)
    )]
    pub fn handle<M: MapSurface>(
        &mut self,
        dashboard: &mut Dashboard<M>,
        event: LinkEvent,
    ) -> ReconcileOutcome {
        match event.kind {
            LinkEventKind::Connected => ReconcileOutcome {
                link_changed: self.transition(LinkState::Connected),
                effect: ReconcileEffect::None,
            },
            LinkEventKind::Disconnected => {
                let link_changed = self.transition(LinkState::Disconnected);
                if link_changed.is_some() {
                    self.stats.record_disconnect();
                }
                ReconcileOutcome {
                    link_changed,
                    effect: ReconcileEffect::None,
                }
            }
            LinkEventKind::Event(event) => {
                let link_changed = self.transition(LinkState::Receiving);
                let effect = match event {
                    StreamEvent::Delta(delta) => self.apply_delta(dashboard, delta),
                    StreamEvent::Alert(alert) => self.route_alert(dashboard, alert),
                };
                ReconcileOutcome {
                    link_changed,
                    effect,
                }
            }
        }
    }

    fn transition(&mut self, next: LinkState) -> Option<LinkState> {
        if self.state == next {
            return None;
        }
        info!(from = %self.state, to = %next, "link state changed");
        self.state = next;
        observability::record_link_state(next);
        Some(next)
    }

    fn apply_delta<M: MapSurface>(
        &mut self,
        dashboard: &mut Dashboard<M>,
        delta: EntityDelta,
    ) -> ReconcileEffect {
        if let Err(e) = delta.validate() {
            warn!(entity_id = %delta.entity_id, error = %e, "dropping invalid delta");
            observability::record_delta_dropped("invalid");
            self.stats.record_dropped("invalid");
            return ReconcileEffect::Dropped {
                entity_id: delta.entity_id,
                reason: e.to_string(),
            };
        }

        let started = Instant::now();
        let outcome = dashboard.apply_delta(&delta);
        let apply_us = started.elapsed().as_secs_f64() * 1_000_000.0;

        observability::record_delta_applied(outcome.upserted, apply_us);
        self.stats
            .record_applied(outcome.upserted, apply_us, delta.speed);
        debug!(
            entity_id = %delta.entity_id,
            upserted = outcome.upserted,
            visible = outcome.visible,
            "delta applied"
        );

        ReconcileEffect::Applied {
            entity_id: delta.entity_id,
            outcome,
        }
    }

    fn route_alert<M: MapSurface>(&mut self, dashboard: &mut Dashboard<M>, alert: Alert) -> ReconcileEffect {
        warn!(category = %alert.category, message = %alert.message, "fleet alert");
        observability::record_alert(&alert.category);
        self.stats.record_alert(&alert.category);
        dashboard.record_alert(alert.clone());
        ReconcileEffect::Alert(alert)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::SceneMap;
    use contracts::{DashboardConfig, Entity, Position};

    fn dashboard() -> Dashboard<SceneMap> {
        let config = DashboardConfig::default();
        let mut dash = Dashboard::new(SceneMap::new(&config.map), &config);
        dash.load_snapshot(vec![Entity::new("1")
            .with_label("NB-1234")
            .with_status("running")
            .with_position(6.9, 79.8)]);
        dash
    }

    fn link(kind: LinkEventKind) -> LinkEvent {
        LinkEvent {
            channel_id: "test".into(),
            kind,
        }
    }

    fn delta(delta: EntityDelta) -> LinkEvent {
        LinkEvent::event("test", StreamEvent::Delta(delta))
    }

    #[test]
    fn walks_the_link_states() {
        let mut dash = dashboard();
        let mut reconciler = Reconciler::new();
        assert_eq!(reconciler.state(), LinkState::Disconnected);

        let out = reconciler.handle(&mut dash, link(LinkEventKind::Connected));
        assert_eq!(out.link_changed, Some(LinkState::Connected));

        let out = reconciler.handle(&mut dash, delta(EntityDelta::new("1").speed(20.0)));
        assert_eq!(out.link_changed, Some(LinkState::Receiving));

        let out = reconciler.handle(&mut dash, delta(EntityDelta::new("1").speed(21.0)));
        assert_eq!(out.link_changed, None);

        let out = reconciler.handle(&mut dash, link(LinkEventKind::Disconnected));
        assert_eq!(out.link_changed, Some(LinkState::Disconnected));
        assert_eq!(reconciler.stats().disconnects, 1);
    }

    #[test]
    fn event_while_disconnected_is_applied() {
        let mut dash = dashboard();
        let mut reconciler = Reconciler::new();
        let out = reconciler.handle(&mut dash, delta(EntityDelta::new("1").position(6.95, 79.85)));
        assert_eq!(out.link_changed, Some(LinkState::Receiving));
        assert!(matches!(out.effect, ReconcileEffect::Applied { .. }));
        assert_eq!(
            dash.store().get("1").unwrap().position(),
            Some(Position::new(6.95, 79.85))
        );
    }

    #[test]
    fn invalid_delta_is_dropped_and_stream_continues() {
        let mut dash = dashboard();
        let mut reconciler = Reconciler::new();

        let out = reconciler.handle(&mut dash, delta(EntityDelta::new("1").position(120.0, 79.8)));
        assert!(matches!(out.effect, ReconcileEffect::Dropped { .. }));
        assert_eq!(
            dash.store().get("1").unwrap().position(),
            Some(Position::new(6.9, 79.8))
        );

        let out = reconciler.handle(&mut dash, delta(EntityDelta::new("1").speed(12.0)));
        assert!(matches!(out.effect, ReconcileEffect::Applied { .. }));

        let stats = reconciler.stats();
        assert_eq!(stats.dropped, 1);
        assert_eq!(stats.applied, 1);
    }

    #[test]
    fn deltas_apply_in_arrival_order() {
        let mut dash = dashboard();
        let mut reconciler = Reconciler::new();
        reconciler.handle(&mut dash, delta(EntityDelta::new("1").position(6.91, 79.81)));
        reconciler.handle(&mut dash, delta(EntityDelta::new("1").position(6.90, 79.80)));
        assert_eq!(
            dash.store().get("1").unwrap().position(),
            Some(Position::new(6.90, 79.80))
        );
    }

    #[test]
    fn alerts_reach_the_log() {
        let mut dash = dashboard();
        let mut reconciler = Reconciler::new();
        let alert = Alert {
            category: "emergency".into(),
            message: "brake failure".into(),
            entity_id: Some("1".into()),
        };
        let out = reconciler.handle(
            &mut dash,
            LinkEvent::event("test", StreamEvent::Alert(alert.clone())),
        );
        assert_eq!(out.effect, ReconcileEffect::Alert(alert.clone()));
        assert_eq!(dash.alerts().latest(), Some(&alert));
        assert_eq!(reconciler.stats().alert_counts.get("emergency"), Some(&1));
    }
}
