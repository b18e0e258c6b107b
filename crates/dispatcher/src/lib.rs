//! # Dispatcher
//!
//! View frame distribution.
//!
//! - Consumes `ViewFrame`s produced by the renderer
//! - Fans out to every configured sink
//! - Isolates slow sinks behind bounded queues so reconciliation never blocks

pub mod dispatcher;
pub mod error;
pub mod handle;
pub mod metrics;
pub mod sinks;

pub use contracts::{ViewFrame, ViewSink};
pub use dispatcher::{create_dispatcher, Dispatcher, SinkReport};
pub use error::DispatcherError;
pub use handle::SinkHandle;
pub use metrics::{MetricsSnapshot, SinkMetrics};
pub use sinks::{FileSink, FileSinkConfig, LogSink};
