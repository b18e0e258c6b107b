//! # Ingestion Pipeline
//!
//! Realtime fleet event ingestion.
//!
//! Responsibilities:
//! - Register realtime channels (replay, simulated, live)
//! - Decode raw messages into `StreamEvent`
//! - Backpressure management and drop policy
//! - Send to downstream via async-channel
//! - Fetch the one-shot entity snapshot
//!
//! ## Usage Example
//!
//! ```ignore
//! use ingestion::{IngestionPipeline, ReplayChannel, ReplayConfig};
//!
//! let mut pipeline = IngestionPipeline::new(256);
//! let channel = ReplayChannel::open("replay", path, ReplayConfig::default())?;
//! pipeline.register_channel("replay".into(), Box::new(channel))?;
//!
//! let rx = pipeline.take_receiver().unwrap();
//! pipeline.start_all();
//! while let Ok(event) = rx.recv().await {
//!     // Reconcile event
//! }
//! ```

mod adapter;
mod codec;
mod config;
mod error;
mod generic_adapter;
mod mock;
mod pipeline;
mod replay;
mod send;
mod snapshot;

// Re-exports
pub use adapter::ChannelAdapter;
pub use codec::{decode_event, encode_event};
pub use config::{BackpressureConfig, DropPolicy, IngestionMetrics, MetricsSnapshot};
pub use contracts::LinkEvent;
pub use error::{IngestionError, Result};
pub use generic_adapter::GenericChannelAdapter;
pub use mock::{SimulatedFleetChannel, SimulatedFleetConfig};
pub use pipeline::IngestionPipeline;
pub use replay::{ReplayChannel, ReplayConfig};
pub use send::EventSender;
pub use snapshot::{load_snapshot, FileSnapshotSource, StaticSnapshotSource};
