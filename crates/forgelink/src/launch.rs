//! The Game Launch Orchestrator.
//!
//! Ties the stack together: replays come from the vault or a live URI,
//! live games go through the lobby client, and every path ends in one
//! resolved [`LaunchCommand`] handed to the process launcher. The flow
//! for a local replay is:
//!   1. Load and parse the container (the extension decides the format)
//!   2. Sniff the binary header → engine build, map folder
//!   3. Resolve the map and activate mods through the catalogs
//!   4. Hand the command to the launcher
//!
//! Anything that fails on the way is reported once through the
//! notification sink and returned to the caller.

use std::collections::{BTreeMap, BTreeSet};
use std::ffi::OsStr;
use std::path::Path;

use forgelink_lobby::LobbyClient;
use forgelink_protocol::{Faction, GameLaunch, GameUid, NewGameInfo};
use forgelink_replay::{
    LiveReplayUri, LoadedReplay, ReplayHeader, ReplayPage, ReplayRecords, ReplayVault,
    extract_records, load_replay,
};

use crate::collaborators::{MapCatalog, ModCatalog, NotificationSink, Preferences, ProcessLauncher};
use crate::error::ForgelinkError;
use crate::types::{DEFAULT_FEATURED_MOD, LastGameSettings, LaunchCommand};

/// Derives a featured-mod technical name from a bare replay file name.
///
/// Files recorded by the game follow a two-dot convention,
/// `<date> <title>[.<mod>].<ext>`; with a mod segment present the
/// second-to-last dot segment names the mod, otherwise the platform
/// default applies. This is an advisory guess for files without embedded
/// metadata, nothing validates the result against the mod catalog.
pub fn guess_mod_by_filename(file_name: &str) -> &str {
    let segments: Vec<&str> = file_name.split('.').collect();
    if segments.len() > 2 {
        segments[segments.len() - 2]
    } else {
        DEFAULT_FEATURED_MOD
    }
}

/// Resolves launch requests into [`LaunchCommand`]s.
///
/// Owns a [`LobbyClient`] handle and a [`ReplayVault`], and calls out
/// through the five collaborator traits for everything the embedding
/// client provides. All methods take `&self`; the orchestrator itself
/// keeps no mutable state.
pub struct GameLaunchOrchestrator<M, D, P, N, L>
where
    M: MapCatalog,
    D: ModCatalog,
    P: Preferences,
    N: NotificationSink,
    L: ProcessLauncher,
{
    lobby: LobbyClient,
    vault: ReplayVault,
    maps: M,
    mods: D,
    preferences: P,
    notifications: N,
    launcher: L,
}

impl<M, D, P, N, L> GameLaunchOrchestrator<M, D, P, N, L>
where
    M: MapCatalog,
    D: ModCatalog,
    P: Preferences,
    N: NotificationSink,
    L: ProcessLauncher,
{
    pub fn new(
        lobby: LobbyClient,
        vault: ReplayVault,
        maps: M,
        mods: D,
        preferences: P,
        notifications: N,
        launcher: L,
    ) -> Self {
        Self {
            lobby,
            vault,
            maps,
            mods,
            preferences,
            notifications,
            launcher,
        }
    }

    /// The lobby client handle, for login, state and push subscriptions.
    pub fn lobby(&self) -> &LobbyClient {
        &self.lobby
    }

    pub fn vault(&self) -> &ReplayVault {
        &self.vault
    }

    /// Watches a local replay file.
    ///
    /// Dispatches on the file extension, derives the launch command from
    /// the container (replay id, featured mod, engine build, version pins,
    /// sim mods, map folder), resolves the map and activates mods, then
    /// hands off to the launcher.
    pub async fn run_replay(&self, path: &Path) -> Result<(), ForgelinkError> {
        let result = self.resolve_and_launch_replay(path).await;
        self.notify_on_error(result, "replayCouldNotBeStarted").await
    }

    async fn resolve_and_launch_replay(&self, path: &Path) -> Result<(), ForgelinkError> {
        let LoadedReplay { metadata, body } = load_replay(path).await?;
        let header = ReplayHeader::sniff(&body)?;
        let engine_build = header.engine_build()?;
        let map_folder = header.map_folder_name()?;

        let metadata = metadata.unwrap_or_default();
        let featured_mod = if metadata.featured_mod.is_empty() {
            let file_name = path.file_name().and_then(OsStr::to_str).unwrap_or_default();
            guess_mod_by_filename(file_name).to_string()
        } else {
            metadata.featured_mod
        };

        let map = self
            .maps
            .find_by_map_folder_name(&map_folder)
            .await
            .ok_or_else(|| ForgelinkError::MapNotFound(map_folder.clone()))?;

        let sim_mods: BTreeSet<String> = metadata.sim_mods.into_keys().collect();
        self.mods
            .update_and_activate_mod_versions(&metadata.featured_mod_versions, &sim_mods)
            .await?;

        tracing::info!(
            path = %path.display(),
            replay_id = ?metadata.uid,
            %featured_mod,
            engine_build,
            map = %map.display_name,
            "launching replay"
        );
        self.launcher
            .launch(LaunchCommand::Replay {
                path: path.to_path_buf(),
                replay_id: metadata.uid,
                featured_mod,
                engine_build,
                mod_versions: metadata.featured_mod_versions,
                sim_mods,
                map_folder,
            })
            .await
    }

    /// Watches a game in progress from a `faflive://` invitation.
    pub async fn run_replay_uri(&self, uri: &str) -> Result<(), ForgelinkError> {
        let result = self.resolve_and_launch_live(uri).await;
        self.notify_on_error(result, "liveReplayCouldNotBeStarted")
            .await
    }

    async fn resolve_and_launch_live(&self, uri: &str) -> Result<(), ForgelinkError> {
        let parsed = LiveReplayUri::parse(uri)?;
        let featured_mod = parsed
            .mod_name
            .clone()
            .unwrap_or_else(|| DEFAULT_FEATURED_MOD.to_string());

        tracing::info!(game_id = parsed.game_id, %featured_mod, "launching live replay");
        self.launcher
            .launch(LaunchCommand::LiveReplay {
                uri: parsed.launch_uri(),
                game_id: parsed.game_id,
                featured_mod,
                map_name: parsed.map_name,
            })
            .await
    }

    /// Hosts a game on the lobby server and starts the game process with
    /// the arguments the server answers with.
    ///
    /// The host settings are stored as the new last-game preferences
    /// before anything can fail. A mod update failure is reported but
    /// does not stop the host: the game starts with whatever versions
    /// are on disk.
    pub async fn host_game(&self, mut info: NewGameInfo) -> Result<(), ForgelinkError> {
        // An empty password box means an open game, not a game whose
        // password is "".
        info.password = info.password.filter(|password| !password.is_empty());

        self.preferences
            .store_last_game(LastGameSettings {
                title: info.title.clone(),
                password: info.password.clone(),
                featured_mod: info.featured_mod.clone(),
                map_folder: info.map_folder.clone(),
                min_rating: info.min_rating,
                max_rating: info.max_rating,
                enforce_rating: info.enforce_rating,
            })
            .await;

        let sim_mods: BTreeSet<String> = info.sim_mods.iter().cloned().collect();
        if let Err(error) = self
            .mods
            .update_and_activate_mod_versions(&BTreeMap::new(), &sim_mods)
            .await
        {
            tracing::warn!(%error, "hosting with mods as they are on disk");
            self.notifications
                .add_immediate_error_notification(&error, "game.create.errorUpdatingMods")
                .await;
        }

        let result = self.submit_host(info).await;
        self.notify_on_error(result, "game.create.failed").await
    }

    async fn submit_host(&self, info: NewGameInfo) -> Result<(), ForgelinkError> {
        let launch = self.lobby.host_game(info).await?;
        self.launch_game(launch).await
    }

    /// Joins a hosted game. An empty password is treated as no password.
    pub async fn join_game(
        &self,
        uid: GameUid,
        password: Option<String>,
    ) -> Result<(), ForgelinkError> {
        let password = password.filter(|password| !password.is_empty());
        let result = self.submit_join(uid, password).await;
        self.notify_on_error(result, "games.couldNotJoin").await
    }

    async fn submit_join(
        &self,
        uid: GameUid,
        password: Option<String>,
    ) -> Result<(), ForgelinkError> {
        let launch = self.lobby.join_game(uid, password).await?;
        self.launch_game(launch).await
    }

    /// Queues for matchmaking and starts the game once a match is found.
    ///
    /// Resolution can take minutes; cancel with
    /// [`stop_search_matchmaker`](Self::stop_search_matchmaker).
    pub async fn start_search_matchmaker(&self, faction: Faction) -> Result<(), ForgelinkError> {
        let result = self.submit_search(faction).await;
        self.notify_on_error(result, "matchmaker.searchFailed").await
    }

    async fn submit_search(&self, faction: Faction) -> Result<(), ForgelinkError> {
        let launch = self.lobby.start_search_matchmaker(faction).await?;
        self.launch_game(launch).await
    }

    /// Tells the server to take this client out of the matchmaker queue.
    pub async fn stop_search_matchmaker(&self) -> Result<(), ForgelinkError> {
        Ok(self.lobby.stop_search_matchmaker().await?)
    }

    async fn launch_game(&self, launch: GameLaunch) -> Result<(), ForgelinkError> {
        tracing::info!(
            uid = %launch.uid,
            featured_mod = %launch.featured_mod,
            "launching game process"
        );
        self.launcher
            .launch(LaunchCommand::Game {
                uid: launch.uid,
                featured_mod: launch.featured_mod,
                args: launch.args,
            })
            .await
    }

    /// Extracts chat messages and game options from a replay on demand.
    ///
    /// This data is not needed to launch, so it is parsed only when
    /// something wants to display it.
    pub async fn enrich(&self, path: &Path) -> Result<ReplayRecords, ForgelinkError> {
        let replay = load_replay(path).await?;
        Ok(extract_records(&replay.body)?)
    }

    /// Loads one page of the local replay vault.
    ///
    /// Corrupt files are already quarantined by the vault; this reports
    /// each one through the notification sink, then returns the page.
    pub async fn load_local_replay_page(
        &self,
        page_size: usize,
        page: usize,
    ) -> Result<ReplayPage, ForgelinkError> {
        let page = self.vault.load_local_page(page_size, page).await?;
        for quarantined in &page.quarantined {
            let error = ForgelinkError::CorruptReplay {
                path: quarantined.path.clone(),
                reason: quarantined.error.to_string(),
            };
            self.notifications
                .add_immediate_error_notification(&error, "corruptedReplayFiles.notification")
                .await;
        }
        Ok(page)
    }

    /// The stored settings of the last hosted game, for prefilling a host
    /// dialog.
    pub async fn last_game_settings(&self) -> Option<LastGameSettings> {
        self.preferences.last_game().await
    }

    /// Reports a failed result through the sink and passes it on.
    async fn notify_on_error<T>(
        &self,
        result: Result<T, ForgelinkError>,
        message_key: &str,
    ) -> Result<T, ForgelinkError> {
        if let Err(error) = &result {
            tracing::warn!(%error, key = message_key, "operation failed");
            self.notifications
                .add_immediate_error_notification(error, message_key)
                .await;
        }
        result
    }
}
