//! Replay files for Forgelink.
//!
//! Parses the two on-disk replay containers (`.fafreplay` with a JSON
//! metadata line and an lz4-compressed body, `.scfareplay` as the bare
//! legacy byte stream), the byte-exact header both share, the auxiliary
//! chat/game-option records, and `faflive://` invitation URIs. The
//! [`ReplayVault`] loads a local replay directory page by page, moving
//! corrupt files to quarantine instead of failing the batch.
//!
//! # Key types
//!
//! - [`ReplayHeader`] — byte-exact header sniffing, engine build, map folder
//! - [`LoadedReplay`] / [`load_replay`] — container parsing
//! - [`ReplayMetadata`] — the `.fafreplay` metadata line
//! - [`ReplayVault`] — paged directory loading with quarantine
//! - [`LiveReplayUri`] — `faflive://` to `gpgnet://` rewriting

mod container;
mod error;
mod header;
mod metadata;
mod records;
mod uri;
mod vault;

pub use container::{
    LoadedReplay, ReplayFormat, load_replay, parse_faf_replay, read_replay_file, write_faf_replay,
};
pub use error::ReplayError;
pub use header::{ReplayHeader, write_replay_header};
pub use metadata::ReplayMetadata;
pub use records::{
    ChatMessage, GameOption, ReplayRecords, extract_records, write_chat_record,
    write_game_option_record,
};
pub use uri::LiveReplayUri;
pub use vault::{LocalReplay, QuarantinedReplay, ReplayPage, ReplayVault};
