//! The JSON metadata line of a `.fafreplay` container.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Metadata the replay server prepends to a downloaded replay.
///
/// Every field is optional on the wire; unknown fields are ignored so that
/// server-side additions never break older clients.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReplayMetadata {
    /// Server-assigned replay id. Absent from locally recorded games.
    #[serde(default)]
    pub uid: Option<u64>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub host: Option<String>,
    /// Map folder name as the server knows it.
    #[serde(default, rename = "mapname")]
    pub map_name: Option<String>,
    #[serde(default)]
    pub featured_mod: String,
    /// Featured-mod file versions keyed by file id.
    #[serde(default)]
    pub featured_mod_versions: BTreeMap<String, u64>,
    /// Active sim mods, UID to display name.
    #[serde(default)]
    pub sim_mods: BTreeMap<String, String>,
    #[serde(default)]
    pub num_players: Option<u32>,
    /// Unix timestamps with sub-second precision, as the server writes them.
    #[serde(default)]
    pub launched_at: Option<f64>,
    #[serde(default)]
    pub game_end: Option<f64>,
}
