//! The two on-disk replay containers.
//!
//! - `.fafreplay`: one JSON metadata line terminated by `\n`, then the
//!   legacy byte stream compressed with lz4 (size-prepended block).
//! - `.scfareplay`: the legacy byte stream as the game engine wrote it,
//!   no metadata, no compression.
//!
//! Which parser runs is decided by file extension alone, never by content.

use std::io;
use std::path::{Path, PathBuf};

use crate::error::ReplayError;
use crate::metadata::ReplayMetadata;

/// Container format, decided by file extension (case-insensitive).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplayFormat {
    /// `.fafreplay`: metadata line plus compressed body.
    Faf,
    /// `.scfareplay`: the bare legacy byte stream.
    LegacyScfa,
}

impl ReplayFormat {
    pub fn from_path(path: &Path) -> Result<Self, ReplayError> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("fafreplay") => Ok(Self::Faf),
            Some(ext) if ext.eq_ignore_ascii_case("scfareplay") => Ok(Self::LegacyScfa),
            _ => Err(ReplayError::Format(format!(
                "unrecognized replay extension: {}",
                path.display()
            ))),
        }
    }
}

/// A replay read from disk: the raw legacy byte stream plus the metadata
/// line when the container carries one.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedReplay {
    /// `None` for the legacy `.scfareplay` container.
    pub metadata: Option<ReplayMetadata>,
    /// Decompressed legacy byte stream, starting with the replay header.
    pub body: Vec<u8>,
}

/// Reads and parses a replay file, dispatching on its extension.
pub fn read_replay_file(path: &Path) -> Result<LoadedReplay, ReplayError> {
    let format = ReplayFormat::from_path(path)?;
    let raw = std::fs::read(path)?;
    match format {
        ReplayFormat::Faf => parse_faf_replay(&raw),
        ReplayFormat::LegacyScfa => Ok(LoadedReplay {
            metadata: None,
            body: raw,
        }),
    }
}

/// Async wrapper around [`read_replay_file`]; the parse runs on the
/// blocking pool.
pub async fn load_replay(path: impl Into<PathBuf>) -> Result<LoadedReplay, ReplayError> {
    let path = path.into();
    tokio::task::spawn_blocking(move || read_replay_file(&path))
        .await
        .map_err(|e| ReplayError::Io(io::Error::other(e)))?
}

/// Parses the bytes of a `.fafreplay` container.
pub fn parse_faf_replay(raw: &[u8]) -> Result<LoadedReplay, ReplayError> {
    let newline = raw
        .iter()
        .position(|&b| b == b'\n')
        .ok_or_else(|| ReplayError::Format("missing metadata line".to_string()))?;
    let metadata: ReplayMetadata =
        serde_json::from_slice(&raw[..newline]).map_err(ReplayError::Metadata)?;
    let body = lz4_flex::decompress_size_prepended(&raw[newline + 1..])?;
    Ok(LoadedReplay {
        metadata: Some(metadata),
        body,
    })
}

/// Builds the bytes of a `.fafreplay` container from its parts.
pub fn write_faf_replay(metadata: &ReplayMetadata, body: &[u8]) -> Result<Vec<u8>, ReplayError> {
    let mut out = serde_json::to_vec(metadata).map_err(ReplayError::Metadata)?;
    out.push(b'\n');
    out.extend_from_slice(&lz4_flex::compress_prepend_size(body));
    Ok(out)
}
