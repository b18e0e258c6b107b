//! Simulated fleet channel
//!
//! Generates a random walk over a set of seed entities, for running the
//! dashboard without a live transport.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use contracts::{
    Alert, ChannelCallback, ChannelSignal, Entity, EntityDelta, EntityId, EntityStatus, Position,
    RealtimeChannel, StreamEvent,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, trace};

use crate::codec::encode_event;

/// Simulated fleet configuration
#[derive(Debug, Clone)]
pub struct SimulatedFleetConfig {
    /// Messages per second
    pub rate_hz: f64,

    /// RNG seed; `None` seeds from the OS
    pub seed: Option<u64>,

    /// Max position step per tick, degrees
    pub step_deg: f64,

    /// Chance per tick of a status change
    pub status_change_probability: f64,

    /// Chance per tick of an alert
    pub alert_probability: f64,
}

impl Default for SimulatedFleetConfig {
    fn default() -> Self {
        Self {
            rate_hz: 10.0,
            seed: None,
            step_deg: 0.0005,
            status_change_probability: 0.02,
            alert_probability: 0.01,
        }
    }
}

struct Walker {
    id: EntityId,
    position: Position,
}

/// Simulated fleet channel
///
/// Each tick moves one entity (round robin) and emits a `bus_location`
/// message; occasionally changes its status or raises an alert.
pub struct SimulatedFleetChannel {
    channel_id: String,
    seeds: Vec<(EntityId, Position)>,
    config: SimulatedFleetConfig,
    subscribed: Arc<AtomicBool>,
}

impl SimulatedFleetChannel {
    /// Build over the entities that have a position
    pub fn new(channel_id: impl Into<String>, entities: &[Entity], config: SimulatedFleetConfig) -> Self {
        let seeds = entities
            .iter()
            .filter_map(|entity| entity.position().map(|p| (entity.id.clone(), p)))
            .collect();
        Self {
            channel_id: channel_id.into(),
            seeds,
            config,
            subscribed: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn entity_count(&self) -> usize {
        self.seeds.len()
    }

    fn step(rng: &mut StdRng, walker: &mut Walker, config: &SimulatedFleetConfig) -> Vec<StreamEvent> {
        let step = config.step_deg.abs();
        if step > 0.0 {
            walker.position.lat = (walker.position.lat + rng.random_range(-step..=step)).clamp(-90.0, 90.0);
            walker.position.lng = (walker.position.lng + rng.random_range(-step..=step)).clamp(-180.0, 180.0);
        }

        let mut delta = EntityDelta::new(walker.id.clone())
            .position(walker.position.lat, walker.position.lng)
            .speed(rng.random_range(0.0..60.0));
        if rng.random_bool(config.status_change_probability.clamp(0.0, 1.0)) {
            let idx = rng.random_range(0..EntityStatus::KNOWN.len());
            delta = delta.status(EntityStatus::KNOWN[idx].clone());
        }

        let mut events = vec![StreamEvent::Delta(delta)];
        if rng.random_bool(config.alert_probability.clamp(0.0, 1.0)) {
            events.push(StreamEvent::Alert(Alert {
                category: "delay".to_string(),
                message: format!("Bus {} is running behind schedule", walker.id),
                entity_id: Some(walker.id.clone()),
            }));
        }
        events
    }
}

impl RealtimeChannel for SimulatedFleetChannel {
    fn channel_id(&self) -> &str {
        &self.channel_id
    }

    fn subscribe(&self, callback: ChannelCallback) {
        if self.subscribed.swap(true, Ordering::SeqCst) {
            return;
        }

        let channel_id = self.channel_id.clone();
        let config = self.config.clone();
        let subscribed = self.subscribed.clone();
        let mut walkers: Vec<Walker> = self
            .seeds
            .iter()
            .map(|(id, position)| Walker {
                id: id.clone(),
                position: *position,
            })
            .collect();

        let rate = if config.rate_hz.is_finite() && config.rate_hz > 0.0 {
            config.rate_hz
        } else {
            SimulatedFleetConfig::default().rate_hz
        };
        let interval = Duration::from_secs_f64(1.0 / rate);

        thread::spawn(move || {
            let mut rng = match config.seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_os_rng(),
            };

            debug!(
                channel_id = %channel_id,
                entities = walkers.len(),
                rate_hz = rate,
                "simulated fleet started"
            );
            callback(ChannelSignal::Connected);

            let mut tick: usize = 0;
            while subscribed.load(Ordering::Relaxed) {
                if !walkers.is_empty() {
                    let idx = tick % walkers.len();
                    for event in Self::step(&mut rng, &mut walkers[idx], &config) {
                        callback(ChannelSignal::Message(encode_event(&event)));
                    }
                    trace!(channel_id = %channel_id, tick, "simulated tick");
                }
                tick = tick.wrapping_add(1);
                thread::sleep(interval);
            }

            callback(ChannelSignal::Disconnected);
            debug!(channel_id = %channel_id, ticks = tick, "simulated fleet stopped");
        });
    }

    fn stop(&self) {
        self.subscribed.store(false, Ordering::SeqCst);
    }

    fn is_subscribed(&self) -> bool {
        self.subscribed.load(Ordering::Relaxed)
    }
}
