//! Error type shared by all replay parsing and vault operations.

use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReplayError {
    /// The bytes do not follow the declared container or header layout.
    #[error("malformed replay: {0}")]
    Format(String),

    /// A field was present but its value could not be interpreted.
    #[error("unparseable replay field: {0}")]
    Parse(String),

    /// The embedded map path cannot name a real map directory.
    #[error("illegal map path: {0}")]
    IllegalPath(String),

    /// The metadata line of a `.fafreplay` container is not valid JSON.
    #[error("invalid replay metadata: {0}")]
    Metadata(#[source] serde_json::Error),

    #[error("replay I/O failed: {0}")]
    Io(#[from] io::Error),

    #[error("replay body decompression failed: {0}")]
    Compression(#[from] lz4_flex::block::DecompressError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_failure() {
        assert_eq!(
            ReplayError::Format("header is truncated".to_string()).to_string(),
            "malformed replay: header is truncated"
        );
        assert_eq!(
            ReplayError::IllegalPath("/maps/a?b/x.lua".to_string()).to_string(),
            "illegal map path: /maps/a?b/x.lua"
        );
    }
}
