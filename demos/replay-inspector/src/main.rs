//! Inspects local replays with the forgelink stack.
//!
//! Point it at a replay directory to page through the vault the way a client
//! does on startup (corrupt files get moved to `<dir>/corrupt`), or at a
//! single file to resolve the launch command that watching it would produce.
//!
//! Usage:
//!     replay-inspector <replays-dir | replay-file>
//!
//! Set `RUST_LOG` to override the default `forgelink=info` filter.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use forgelink::prelude::*;
use tracing_subscriber::EnvFilter;

const PAGE_SIZE: usize = 50;

type Inspector =
    GameLaunchOrchestrator<AnyMap, NoMods, NoPreferences, StderrNotifications, PrintLauncher>;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("forgelink=info".parse()?))
        .init();

    let Some(target) = std::env::args().nth(1).map(PathBuf::from) else {
        eprintln!("usage: replay-inspector <replays-dir | replay-file>");
        std::process::exit(2);
    };

    if target.is_dir() {
        let inspector = inspector_for(&target);
        inspect_directory(&inspector).await?;
    } else {
        let dir = target.parent().unwrap_or(Path::new(".")).to_path_buf();
        let inspector = inspector_for(&dir);
        if inspector.run_replay(&target).await.is_err() {
            // Already reported through the notification sink.
            std::process::exit(1);
        }
        describe_records(&inspector, &target).await;
    }
    Ok(())
}

/// Builds an orchestrator whose collaborators print instead of touching a
/// real install. The lobby client stays idle; nothing here connects.
fn inspector_for(replays_dir: &Path) -> Inspector {
    let lobby = LobbyClient::start(LobbyConfig::default(), WsConnector);
    let vault = ReplayVault::new(replays_dir, replays_dir.join("corrupt"));
    GameLaunchOrchestrator::new(
        lobby,
        vault,
        AnyMap,
        NoMods,
        NoPreferences,
        StderrNotifications,
        PrintLauncher,
    )
}

async fn inspect_directory(inspector: &Inspector) -> Result<(), ForgelinkError> {
    let mut page_number = 1;
    let mut readable = 0;
    loop {
        let page = inspector
            .load_local_replay_page(PAGE_SIZE, page_number)
            .await?;
        for replay in &page.replays {
            describe_replay(inspector, replay).await;
            readable += 1;
        }
        if page_number >= page.page_count {
            break;
        }
        page_number += 1;
    }
    println!("{readable} readable replays");
    Ok(())
}

async fn describe_replay(inspector: &Inspector, replay: &LocalReplay) {
    let name = replay
        .path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("<non-utf8 name>");
    match &replay.metadata {
        Some(metadata) => println!(
            "{name}: \"{}\" [{}] on {}",
            metadata.title,
            metadata.featured_mod,
            metadata.map_name.as_deref().unwrap_or("unknown map"),
        ),
        None => println!("{name}: legacy recording, no metadata"),
    }
    describe_records(inspector, &replay.path).await;
}

async fn describe_records(inspector: &Inspector, path: &Path) {
    match inspector.enrich(path).await {
        Ok(records) => println!(
            "    {} chat messages, {} game options",
            records.chat_messages.len(),
            records.game_options.len(),
        ),
        Err(error) => println!("    body not readable: {error}"),
    }
}

/// Accepts every folder; the inspector has no map install to check against.
struct AnyMap;

impl MapCatalog for AnyMap {
    async fn find_by_map_folder_name(&self, folder: &str) -> Option<MapInfo> {
        Some(MapInfo {
            folder_name: folder.to_string(),
            display_name: folder.to_string(),
            version: None,
        })
    }
}

struct NoMods;

impl ModCatalog for NoMods {
    async fn update_and_activate_mod_versions(
        &self,
        _versions: &BTreeMap<String, u64>,
        _sim_mods: &BTreeSet<String>,
    ) -> Result<(), ForgelinkError> {
        Ok(())
    }
}

struct NoPreferences;

impl Preferences for NoPreferences {
    async fn last_game(&self) -> Option<LastGameSettings> {
        None
    }

    async fn store_last_game(&self, _settings: LastGameSettings) {}
}

struct StderrNotifications;

impl NotificationSink for StderrNotifications {
    async fn add_immediate_error_notification(&self, error: &ForgelinkError, message_key: &str) {
        eprintln!("[{message_key}] {error}");
    }
}

/// Prints the resolved command instead of spawning a game process.
struct PrintLauncher;

impl ProcessLauncher for PrintLauncher {
    async fn launch(&self, command: LaunchCommand) -> Result<(), ForgelinkError> {
        println!("would launch: {command:#?}");
        Ok(())
    }
}
