//! Unified error type for the Forgelink stack.

use std::path::PathBuf;

use forgelink_lobby::LobbyError;
use forgelink_protocol::ProtocolError;
use forgelink_replay::ReplayError;
use forgelink_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// When using the `forgelink` meta-crate, you deal with this single error
/// type instead of importing errors from each sub-crate. The `#[from]`
/// attribute on each variant auto-generates `From` impls, so the `?`
/// operator converts sub-crate errors automatically.
///
/// The last variants have no sub-crate counterpart: they are produced at
/// the orchestrator boundary or by collaborator implementations
/// (see [`ModCatalog`](crate::ModCatalog) and
/// [`ProcessLauncher`](crate::ProcessLauncher)).
#[derive(Debug, thiserror::Error)]
pub enum ForgelinkError {
    /// A transport-level error (dial, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode, malformed record).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A lobby session error (not connected, timeout, rejected login).
    #[error(transparent)]
    Lobby(#[from] LobbyError),

    /// A replay parsing or vault error.
    #[error(transparent)]
    Replay(#[from] ReplayError),

    /// The map catalog has no entry for the folder named in the replay.
    #[error("unknown map folder: {0}")]
    MapNotFound(String),

    /// The mod catalog could not update or activate the requested mods.
    #[error("mod update failed: {0}")]
    ModUpdate(String),

    /// The process launcher could not start the game.
    #[error("game process failed to launch: {0}")]
    Launch(String),

    /// A vault file could not be parsed and was moved to quarantine.
    #[error("corrupt replay file {}: {reason}", .path.display())]
    CorruptReplay { path: PathBuf, reason: String },
}
