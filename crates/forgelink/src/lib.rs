//! # Forgelink
//!
//! Client connectivity and replay toolkit for FA-style lobby servers.
//!
//! Forgelink gives a game client one stack for talking to the lobby
//! server and for working with replays: a correlated request/response
//! session over WebSocket, the legacy replay containers, the local vault,
//! and live replay invitations. The [`GameLaunchOrchestrator`] ties those
//! together and calls out to the embedding client through five small
//! collaborator traits for everything it deliberately does not do itself
//! (map downloads, mod patching, preferences, notifications, process
//! spawning).
//!
//! # Key types
//!
//! - [`GameLaunchOrchestrator`] — resolve replays and live games into
//!   [`LaunchCommand`]s
//! - [`LobbyClient`] — the lobby session handle (re-exported from
//!   `forgelink-lobby`)
//! - [`ReplayVault`] — the paged local replay directory (re-exported from
//!   `forgelink-replay`)
//! - [`MapCatalog`], [`ModCatalog`], [`Preferences`], [`NotificationSink`],
//!   [`ProcessLauncher`] — the collaborator seams
//! - [`ForgelinkError`] — one error type over the whole stack
//!
//! # Quick start
//!
//! ```rust,no_run
//! use forgelink::prelude::*;
//!
//! // Implement the five collaborator traits for your client, then:
//! // let lobby = LobbyClient::start(LobbyConfig::default(), WsConnector);
//! // let orchestrator = GameLaunchOrchestrator::new(
//! //     lobby, vault, maps, mods, preferences, notifications, launcher,
//! // );
//! // orchestrator.lobby().connect_and_log_in("alice", "hunter2").await?;
//! // orchestrator.run_replay(path).await?;
//! ```

mod collaborators;
mod error;
mod launch;
mod types;

pub use collaborators::{MapCatalog, ModCatalog, NotificationSink, Preferences, ProcessLauncher};
pub use error::ForgelinkError;
pub use launch::{GameLaunchOrchestrator, guess_mod_by_filename};
pub use types::{DEFAULT_FEATURED_MOD, LastGameSettings, LaunchCommand, MapInfo};

pub use forgelink_lobby::{ConnectionState, LobbyClient, LobbyConfig, LobbyError, RequestKind};
pub use forgelink_protocol::{
    Faction, GameLaunch, GameUid, NewGameInfo, PlayerUid, ProtocolError, RelayCommand,
    ServerCommand, Visibility, Welcome,
};
pub use forgelink_replay::{
    LiveReplayUri, LoadedReplay, LocalReplay, QuarantinedReplay, ReplayError, ReplayHeader,
    ReplayMetadata, ReplayPage, ReplayRecords, ReplayVault, load_replay,
};
pub use forgelink_transport::{TransportError, WsConnector};

/// Everything an embedding client typically needs, in one import.
pub mod prelude {
    pub use crate::{
        ConnectionState, DEFAULT_FEATURED_MOD, Faction, ForgelinkError, GameLaunch,
        GameLaunchOrchestrator, GameUid, LastGameSettings, LaunchCommand, LiveReplayUri,
        LobbyClient, LobbyConfig, LobbyError, LocalReplay, MapCatalog, MapInfo, ModCatalog,
        NewGameInfo, NotificationSink, PlayerUid, Preferences, ProcessLauncher, ReplayError,
        ReplayMetadata, ReplayPage, ReplayVault, ServerCommand, Visibility, Welcome, WsConnector,
        guess_mod_by_filename, load_replay,
    };
}
