//! Byte-exact parsing of the legacy replay header.
//!
//! Every replay body, in either container, starts with the same ASCII
//! prefix written by the game engine:
//!
//! ```text
//! Supreme Commander v<major>.<minor>.<build>\0\r\n\0
//! Replay v<version>\r\n
//! /maps/<folder>/<scenario>\0\r\n\x1A
//! ```
//!
//! [`ReplayHeader::sniff`] walks that grammar field by field and refuses
//! anything that deviates; there are no silent defaults. The derived values
//! a launch needs, the engine build number and the map folder name, come
//! from [`ReplayHeader::engine_build`] and [`ReplayHeader::map_folder_name`].

use crate::error::ReplayError;

/// Marker every version field must start with.
const VERSION_PREFIX: &str = "Supreme Commander v";

/// The parsed fixed prefix of a replay byte stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayHeader {
    /// Engine version marker, e.g. `"Supreme Commander v1.50.3599"`.
    pub version_marker: String,
    /// Replay format marker, e.g. `"Replay v1.9"`.
    pub replay_marker: String,
    /// Forward-slash path of the scenario inside the map archive.
    pub map_path: String,
    /// Total length of the header in bytes, including the terminator.
    pub header_len: usize,
}

impl ReplayHeader {
    /// Parses the header prefix of a replay byte stream.
    ///
    /// Trailing bytes after the header terminator are ignored; a truncated
    /// or deviating prefix fails with [`ReplayError::Format`].
    pub fn sniff(bytes: &[u8]) -> Result<Self, ReplayError> {
        let mut cursor = Cursor { bytes, pos: 0 };

        let version_marker = cursor.take_str_until(0x00, "version marker")?;
        if !version_marker.starts_with(VERSION_PREFIX) {
            return Err(ReplayError::Format(format!(
                "version marker does not start with `{VERSION_PREFIX}`"
            )));
        }
        cursor.expect(b"\r\n\0", "version terminator")?;

        let replay_marker = cursor.take_str_until(b'\r', "replay marker")?;
        cursor.expect(b"\n", "replay marker terminator")?;

        let map_path = cursor.take_str_until(0x00, "map path")?;
        cursor.expect(b"\r\n\x1a", "header terminator")?;

        Ok(Self {
            version_marker: version_marker.to_string(),
            replay_marker: replay_marker.to_string(),
            map_path: map_path.to_string(),
            header_len: cursor.pos,
        })
    }

    /// The trailing build number of the version marker
    /// (`"Supreme Commander v1.50.3599"` gives `3599`).
    pub fn engine_build(&self) -> Result<u32, ReplayError> {
        let (_, build) = self.version_marker.rsplit_once('.').ok_or_else(|| {
            ReplayError::Parse(format!("no build number in `{}`", self.version_marker))
        })?;
        build.parse().map_err(|_| {
            ReplayError::Parse(format!("bad build number in `{}`", self.version_marker))
        })
    }

    /// The map folder segment of the embedded map path: the second-to-last
    /// path segment, verbatim. Catalog lookups compare it case-insensitively.
    ///
    /// A path containing `?` cannot name a directory and fails with
    /// [`ReplayError::IllegalPath`] before any segment is inspected.
    pub fn map_folder_name(&self) -> Result<String, ReplayError> {
        if self.map_path.contains('?') {
            return Err(ReplayError::IllegalPath(self.map_path.clone()));
        }
        let segments: Vec<&str> = self.map_path.split('/').collect();
        let folder = match segments.len() {
            0 | 1 => "",
            n => segments[n - 2],
        };
        if folder.is_empty() {
            return Err(ReplayError::IllegalPath(self.map_path.clone()));
        }
        Ok(folder.to_string())
    }
}

/// Appends a header prefix in the exact layout [`ReplayHeader::sniff`]
/// expects. Used when recording replay bodies.
pub fn write_replay_header(
    out: &mut Vec<u8>,
    version_marker: &str,
    replay_marker: &str,
    map_path: &str,
) {
    out.extend_from_slice(version_marker.as_bytes());
    out.extend_from_slice(b"\0\r\n\0");
    out.extend_from_slice(replay_marker.as_bytes());
    out.extend_from_slice(b"\r\n");
    out.extend_from_slice(map_path.as_bytes());
    out.extend_from_slice(b"\0\r\n\x1a");
}

struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    /// Consumes bytes up to (and including) the terminator, returning the
    /// field in front of it as UTF-8.
    fn take_str_until(&mut self, terminator: u8, what: &str) -> Result<&'a str, ReplayError> {
        let remaining = &self.bytes[self.pos..];
        let end = remaining
            .iter()
            .position(|&b| b == terminator)
            .ok_or_else(|| ReplayError::Format(format!("{what} is unterminated")))?;
        let field = std::str::from_utf8(&remaining[..end])
            .map_err(|_| ReplayError::Format(format!("{what} is not valid UTF-8")))?;
        self.pos += end + 1;
        Ok(field)
    }

    fn expect(&mut self, expected: &[u8], what: &str) -> Result<(), ReplayError> {
        match self.bytes.get(self.pos..self.pos + expected.len()) {
            Some(actual) if actual == expected => {
                self.pos += expected.len();
                Ok(())
            }
            _ => Err(ReplayError::Format(format!("missing {what}"))),
        }
    }
}
