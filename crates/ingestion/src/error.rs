//! Ingestion error types

use std::path::PathBuf;

use thiserror::Error;

/// Ingestion error
#[derive(Debug, Error)]
pub enum IngestionError {
    /// Raw message could not be decoded into a stream event
    #[error("failed to decode message from {channel_id}: {message}")]
    DecodeFailed {
        channel_id: String,
        message: String,
    },

    /// Downstream receiver gone
    #[error("channel closed for {channel_id}")]
    ChannelClosed { channel_id: String },

    /// Channel is already registered
    #[error("channel {channel_id} is already registered")]
    AlreadyRegistered { channel_id: String },

    /// Recorded stream could not be opened
    #[error("cannot open replay file {}: {source}", path.display())]
    ReplayOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Ingestion Result alias
pub type Result<T> = std::result::Result<T, IngestionError>;
