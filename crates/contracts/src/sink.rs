//! ViewSink trait - Dispatcher output interface
//!
//! Defines the abstract interface for view sinks.

use crate::{ContractError, ViewFrame};

/// View output trait
///
/// All sink implementations must implement this trait.
#[trait_variant::make(ViewSink: Send)]
pub trait LocalViewSink {
    /// Sink name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Write one view frame
    ///
    /// # Errors
    /// Returns write error (should include context)
    async fn write(&mut self, frame: &ViewFrame) -> Result<(), ContractError>;

    /// Flush buffer (if any)
    async fn flush(&mut self) -> Result<(), ContractError>;

    /// Close sink
    async fn close(&mut self) -> Result<(), ContractError>;
}
