//! Protocol-level error types.

use thiserror::Error;

/// Errors from encoding, decoding, or validating wire records.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Serializing a record to bytes failed.
    #[cfg(feature = "json")]
    #[error("failed to encode record: {0}")]
    Encode(#[source] serde_json::Error),

    /// The bytes on the wire were not a valid record.
    #[cfg(feature = "json")]
    #[error("failed to decode record: {0}")]
    Decode(#[source] serde_json::Error),

    /// The record named a known command but its fields violate that
    /// command's declared layout.
    #[error("malformed `{command}` record: {reason}")]
    Format { command: String, reason: String },
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
