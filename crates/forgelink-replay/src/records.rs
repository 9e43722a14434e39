//! Auxiliary records embedded in the legacy byte stream.
//!
//! After the header terminator the stream carries tagged records, each
//! `[tag: u8][len: u32 LE][payload: len bytes]`. Chat messages and game
//! options are the two tags a client cares about; everything else is
//! skipped by length. Extraction is on demand only; loading or launching
//! a replay never walks these records.

use crate::error::ReplayError;
use crate::header::ReplayHeader;

const TAG_CHAT: u8 = 1;
const TAG_GAME_OPTION: u8 = 2;

/// One in-game chat line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub sender: String,
    pub text: String,
}

/// One lobby game option as `key`/`value` strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameOption {
    pub key: String,
    pub value: String,
}

/// Everything [`extract_records`] pulls out of a replay body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplayRecords {
    pub chat_messages: Vec<ChatMessage>,
    pub game_options: Vec<GameOption>,
}

/// Walks the records after the header of a legacy byte stream.
///
/// Unknown tags are skipped; a record extending past the end of the body
/// fails with [`ReplayError::Format`].
pub fn extract_records(body: &[u8]) -> Result<ReplayRecords, ReplayError> {
    let header = ReplayHeader::sniff(body)?;
    let mut rest = &body[header.header_len..];
    let mut records = ReplayRecords::default();

    while !rest.is_empty() {
        let (tag, payload, next) = split_record(rest)?;
        match tag {
            TAG_CHAT => {
                let (sender, text) = split_pair(payload, "chat record")?;
                records.chat_messages.push(ChatMessage {
                    sender: sender.to_string(),
                    text: text.to_string(),
                });
            }
            TAG_GAME_OPTION => {
                let (key, value) = split_pair(payload, "game option record")?;
                records.game_options.push(GameOption {
                    key: key.to_string(),
                    value: value.to_string(),
                });
            }
            other => tracing::trace!(tag = other, len = payload.len(), "skipping record"),
        }
        rest = next;
    }
    Ok(records)
}

/// Appends a chat record in the layout [`extract_records`] expects.
pub fn write_chat_record(out: &mut Vec<u8>, sender: &str, text: &str) {
    write_record(out, TAG_CHAT, sender, text);
}

/// Appends a game option record in the layout [`extract_records`] expects.
pub fn write_game_option_record(out: &mut Vec<u8>, key: &str, value: &str) {
    write_record(out, TAG_GAME_OPTION, key, value);
}

fn write_record(out: &mut Vec<u8>, tag: u8, first: &str, second: &str) {
    let len = first.len() + 1 + second.len();
    out.push(tag);
    out.extend_from_slice(&u32::try_from(len).unwrap_or(u32::MAX).to_le_bytes());
    out.extend_from_slice(first.as_bytes());
    out.push(0);
    out.extend_from_slice(second.as_bytes());
}

fn split_record(bytes: &[u8]) -> Result<(u8, &[u8], &[u8]), ReplayError> {
    if bytes.len() < 5 {
        return Err(ReplayError::Format("truncated record header".to_string()));
    }
    let tag = bytes[0];
    let len = u32::from_le_bytes([bytes[1], bytes[2], bytes[3], bytes[4]]) as usize;
    let rest = &bytes[5..];
    if rest.len() < len {
        return Err(ReplayError::Format(format!(
            "record claims {len} bytes, {} remain",
            rest.len()
        )));
    }
    Ok((tag, &rest[..len], &rest[len..]))
}

fn split_pair<'a>(payload: &'a [u8], what: &str) -> Result<(&'a str, &'a str), ReplayError> {
    let nul = payload
        .iter()
        .position(|&b| b == 0)
        .ok_or_else(|| ReplayError::Format(format!("{what} has no separator")))?;
    let first = std::str::from_utf8(&payload[..nul])
        .map_err(|_| ReplayError::Format(format!("{what} is not valid UTF-8")))?;
    let second = std::str::from_utf8(&payload[nul + 1..])
        .map_err(|_| ReplayError::Format(format!("{what} is not valid UTF-8")))?;
    Ok((first, second))
}
