//! Layered error definitions
//!
//! Categorized by source: config / transport / payload / sink

use thiserror::Error;

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Transport Errors =====
    /// Snapshot fetch failed
    #[error("snapshot fetch from '{source_name}' failed: {message}")]
    SnapshotFetch {
        source_name: String,
        message: String,
    },

    /// Realtime channel could not connect
    #[error("realtime channel '{channel_id}' connect error: {message}")]
    ChannelConnect { channel_id: String, message: String },

    // ===== Payload Errors =====
    /// Payload failed shape validation
    #[error("malformed {what}: {message}")]
    MalformedPayload { what: String, message: String },

    // ===== Sink Errors =====
    /// Sink write error
    #[error("sink '{sink_name}' write error: {message}")]
    SinkWrite { sink_name: String, message: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create snapshot fetch error
    pub fn snapshot_fetch(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SnapshotFetch {
            source_name: source_name.into(),
            message: message.into(),
        }
    }

    /// Create channel connect error
    pub fn channel_connect(channel_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ChannelConnect {
            channel_id: channel_id.into(),
            message: message.into(),
        }
    }

    /// Create malformed payload error
    pub fn malformed(what: impl Into<String>, message: impl Into<String>) -> Self {
        Self::MalformedPayload {
            what: what.into(),
            message: message.into(),
        }
    }

    /// Create sink write error
    pub fn sink_write(sink_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SinkWrite {
            sink_name: sink_name.into(),
            message: message.into(),
        }
    }

    /// True for errors caused by a single bad payload (safe to skip)
    pub fn is_malformed(&self) -> bool {
        matches!(self, Self::MalformedPayload { .. })
    }
}
