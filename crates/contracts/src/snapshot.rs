//! SnapshotSource trait - full entity list boundary

use crate::{ContractError, Entity};

/// Snapshot source
///
/// Fetches the complete entity list once per view activation. Records come
/// back in source order; that order becomes store order.
#[trait_variant::make(SnapshotSource: Send)]
pub trait LocalSnapshotSource {
    /// Source name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Fetch the full entity list
    ///
    /// # Errors
    /// `SnapshotFetch` when the source is unreachable or unreadable.
    /// Callers log the failure and keep their current state.
    async fn fetch(&mut self) -> Result<Vec<Entity>, ContractError>;
}
