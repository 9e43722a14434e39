//! Value types shared between the orchestrator and its collaborators.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use forgelink_protocol::GameUid;
use serde::{Deserialize, Serialize};

/// Technical name of the platform's default featured mod.
///
/// Used when a bare replay file name carries no mod segment
/// (see [`guess_mod_by_filename`](crate::guess_mod_by_filename)).
pub const DEFAULT_FEATURED_MOD: &str = "faf";

/// A fully resolved instruction for the process launcher.
///
/// Everything the game process needs is carried here; the launcher does
/// not consult the lobby or the vault again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchCommand {
    /// Watch a replay from a local file.
    Replay {
        path: PathBuf,
        /// Server-assigned replay id. `None` for the legacy container,
        /// which carries no metadata.
        replay_id: Option<u64>,
        featured_mod: String,
        /// Engine build the replay was recorded with.
        engine_build: u32,
        /// Featured-mod file versions keyed by file id.
        mod_versions: BTreeMap<String, u64>,
        /// UIDs of sim mods active in the recorded game.
        sim_mods: BTreeSet<String>,
        /// Map folder named by the replay header.
        map_folder: String,
    },
    /// Watch a game in progress through the relay server.
    LiveReplay {
        /// Rewritten `gpgnet://` target the game process streams from.
        uri: String,
        game_id: u64,
        featured_mod: String,
        map_name: Option<String>,
    },
    /// Start a hosted, joined, or matchmade game with the arguments the
    /// lobby server issued.
    Game {
        uid: GameUid,
        featured_mod: String,
        args: Vec<String>,
    },
}

/// One entry in the map catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapInfo {
    /// Folder name on disk, unique within the catalog.
    pub folder_name: String,
    pub display_name: String,
    /// Catalog version, if the map is versioned.
    pub version: Option<u64>,
}

/// Host settings remembered across sessions to prefill the next host
/// dialog.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastGameSettings {
    pub title: String,
    pub password: Option<String>,
    pub featured_mod: String,
    pub map_folder: String,
    pub min_rating: Option<i64>,
    pub max_rating: Option<i64>,
    pub enforce_rating: bool,
}
