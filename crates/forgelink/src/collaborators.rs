//! Collaborator seams the orchestrator calls out through.
//!
//! Forgelink does not download maps, patch mods, persist preferences,
//! render notifications, or spawn the game process itself; those belong
//! to the embedding client. Each concern is one small async trait; the
//! [`GameLaunchOrchestrator`](crate::GameLaunchOrchestrator) is generic
//! over all five, and tests substitute recording mocks.
//!
//! All traits are `Send + Sync + 'static` and their futures are `Send`,
//! so an orchestrator can be driven from any Tokio task.

use std::collections::{BTreeMap, BTreeSet};
use std::future::Future;

use crate::error::ForgelinkError;
use crate::types::{LastGameSettings, LaunchCommand, MapInfo};

/// Looks up maps the client has available (installed or downloadable).
///
/// # Example
///
/// ```rust
/// use forgelink::{MapCatalog, MapInfo};
///
/// /// Serves a fixed map list, for tests and offline use.
/// struct StaticCatalog(Vec<MapInfo>);
///
/// impl MapCatalog for StaticCatalog {
///     async fn find_by_map_folder_name(&self, folder: &str) -> Option<MapInfo> {
///         self.0
///             .iter()
///             .find(|map| map.folder_name.eq_ignore_ascii_case(folder))
///             .cloned()
///     }
/// }
/// ```
pub trait MapCatalog: Send + Sync + 'static {
    /// Resolves a map by the folder name a replay header or game record
    /// carries. Folder names compare case-insensitively: recorders disagree
    /// about case, the filesystem does not.
    ///
    /// `None` means the map is not available and cannot be fetched, and
    /// the launch fails with
    /// [`ForgelinkError::MapNotFound`](crate::ForgelinkError::MapNotFound).
    fn find_by_map_folder_name(
        &self,
        folder: &str,
    ) -> impl Future<Output = Option<MapInfo>> + Send;
}

/// Updates featured-mod files and activates sim mods before a launch.
pub trait ModCatalog: Send + Sync + 'static {
    /// Brings featured-mod files to the given versions and activates the
    /// given sim mods.
    ///
    /// An empty `versions` map means "latest"; it is passed when hosting,
    /// where no recorded version pins exist. Failures should be reported
    /// as [`ForgelinkError::ModUpdate`](crate::ForgelinkError::ModUpdate).
    fn update_and_activate_mod_versions(
        &self,
        versions: &BTreeMap<String, u64>,
        sim_mods: &BTreeSet<String>,
    ) -> impl Future<Output = Result<(), ForgelinkError>> + Send;
}

/// Remembers the last-used host settings between sessions.
///
/// Storage is the implementation's problem; failures to persist must not
/// fail the launch, so both methods are infallible from the orchestrator's
/// point of view.
pub trait Preferences: Send + Sync + 'static {
    /// Returns the settings of the last hosted game, if any were stored.
    fn last_game(&self) -> impl Future<Output = Option<LastGameSettings>> + Send;

    /// Stores the settings of the game being hosted right now.
    fn store_last_game(&self, settings: LastGameSettings) -> impl Future<Output = ()> + Send;
}

/// Receives user-facing error notifications.
pub trait NotificationSink: Send + Sync + 'static {
    /// Reports an error the user must see immediately.
    ///
    /// `message_key` names the localized message; looking it up and
    /// rendering it is the sink's job.
    fn add_immediate_error_notification(
        &self,
        error: &ForgelinkError,
        message_key: &str,
    ) -> impl Future<Output = ()> + Send;
}

/// Starts the game process from a resolved [`LaunchCommand`].
///
/// The orchestrator hands the command over and is done; watching or
/// terminating the child process is the implementation's concern.
pub trait ProcessLauncher: Send + Sync + 'static {
    /// Starts the game process. Failures should be reported as
    /// [`ForgelinkError::Launch`](crate::ForgelinkError::Launch).
    fn launch(
        &self,
        command: LaunchCommand,
    ) -> impl Future<Output = Result<(), ForgelinkError>> + Send;
}
