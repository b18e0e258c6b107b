//! Ingestion Pipeline main entry

use std::collections::HashMap;
use std::sync::Arc;

use async_channel::{bounded, Receiver, Sender};
use contracts::{LinkEvent, RealtimeChannel};
use tracing::{debug, info, instrument};

use crate::adapter::ChannelAdapter;
use crate::config::{BackpressureConfig, IngestionMetrics};
use crate::error::{IngestionError, Result};
use crate::generic_adapter::GenericChannelAdapter;
use crate::send::EventSender;

/// Ingestion Pipeline
///
/// Manages the registered realtime channels and merges their decoded
/// events into one ordered stream.
pub struct IngestionPipeline {
    adapters: HashMap<String, Box<dyn ChannelAdapter>>,

    metrics: Arc<IngestionMetrics>,

    /// Event sender (shared by all adapters)
    tx: Sender<LinkEvent>,

    /// Kept for drop-oldest eviction; handed out once by `take_receiver`
    rx: Receiver<LinkEvent>,
    rx_taken: bool,

    config: BackpressureConfig,
}

impl IngestionPipeline {
    /// Create a pipeline with the default drop policy
    pub fn new(channel_capacity: usize) -> Self {
        Self::with_config(BackpressureConfig {
            channel_capacity,
            ..Default::default()
        })
    }

    /// Create with custom backpressure configuration
    pub fn with_config(config: BackpressureConfig) -> Self {
        let (tx, rx) = bounded(config.channel_capacity.max(1));

        Self {
            adapters: HashMap::new(),
            metrics: Arc::new(IngestionMetrics::new()),
            tx,
            rx,
            rx_taken: false,
            config,
        }
    }

    /// Register a realtime channel
    ///
    /// # Errors
    /// `AlreadyRegistered` if the id is taken.
    #[instrument(
        name = "ingestion_register_channel",
        skip(self, channel),
        fields(channel_id = %channel_id)
    )]
    pub fn register_channel(
        &mut self,
        channel_id: String,
        channel: Box<dyn RealtimeChannel>,
    ) -> Result<()> {
        if self.adapters.contains_key(&channel_id) {
            return Err(IngestionError::AlreadyRegistered { channel_id });
        }
        let adapter = GenericChannelAdapter::new(channel_id.clone(), channel);
        debug!(channel_id = %channel_id, "registered realtime channel");
        self.adapters.insert(channel_id, Box::new(adapter));
        Ok(())
    }

    /// Start all registered channels
    #[instrument(name = "ingestion_start_all", skip(self))]
    pub fn start_all(&self) {
        info!(
            count = self.adapters.len(),
            drop_policy = ?self.config.drop_policy,
            "starting all channel adapters"
        );
        for (channel_id, adapter) in &self.adapters {
            if !adapter.is_subscribed() {
                debug!(channel_id = %channel_id, "starting adapter");
                adapter.start(self.sender(), self.metrics.clone());
            }
        }
    }

    /// Stop all channels
    #[instrument(name = "ingestion_stop_all", skip(self))]
    pub fn stop_all(&self) {
        info!(count = self.adapters.len(), "stopping all channel adapters");
        for (channel_id, adapter) in &self.adapters {
            if adapter.is_subscribed() {
                debug!(channel_id = %channel_id, "stopping adapter");
                adapter.stop();
            }
        }
    }

    fn sender(&self) -> EventSender {
        EventSender::new(self.tx.clone(), &self.rx, self.config.drop_policy)
    }

    /// Get the event stream receiver
    ///
    /// Note: Can only be called once, subsequent calls return None
    pub fn take_receiver(&mut self) -> Option<Receiver<LinkEvent>> {
        if self.rx_taken {
            return None;
        }
        self.rx_taken = true;
        Some(self.rx.clone())
    }

    pub fn metrics(&self) -> Arc<IngestionMetrics> {
        self.metrics.clone()
    }

    pub fn channel_count(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_channel_subscribed(&self, channel_id: &str) -> bool {
        self.adapters
            .get(channel_id)
            .map(|a| a.is_subscribed())
            .unwrap_or(false)
    }

    /// Close the stream so the consumer sees end-of-stream once drained
    pub fn close(&self) {
        self.stop_all();
        self.tx.close();
    }
}

impl Drop for IngestionPipeline {
    fn drop(&mut self) {
        self.stop_all();
    }
}
