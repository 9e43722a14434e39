//! Integration tests for the game launch orchestrator.
//!
//! The five collaborators are recording mocks; the lobby side, where a
//! scenario needs one, is a hand-rolled WebSocket server driven from the
//! test body. Replay fixtures are real files in temporary directories.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tempfile::TempDir;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message;

use forgelink::prelude::*;
use forgelink_protocol::WireRecord;
use forgelink_replay::{
    write_chat_record, write_faf_replay, write_game_option_record, write_replay_header,
};

// ---------------------------------------------------------------------------
// Recording collaborators
// ---------------------------------------------------------------------------

#[derive(Clone, Default)]
struct StaticMaps {
    known: Arc<Mutex<Vec<MapInfo>>>,
    requests: Arc<Mutex<Vec<String>>>,
}

impl StaticMaps {
    fn with_folders(folders: &[&str]) -> Self {
        let maps = StaticMaps::default();
        maps.known.lock().unwrap().extend(folders.iter().map(|folder| MapInfo {
            folder_name: folder.to_string(),
            display_name: folder.to_string(),
            version: None,
        }));
        maps
    }
}

impl MapCatalog for StaticMaps {
    async fn find_by_map_folder_name(&self, folder: &str) -> Option<MapInfo> {
        self.requests.lock().unwrap().push(folder.to_string());
        self.known
            .lock()
            .unwrap()
            .iter()
            .find(|map| map.folder_name.eq_ignore_ascii_case(folder))
            .cloned()
    }
}

#[derive(Clone, Default)]
struct RecordingMods {
    calls: Arc<Mutex<Vec<(BTreeMap<String, u64>, BTreeSet<String>)>>>,
    fail: bool,
}

impl ModCatalog for RecordingMods {
    async fn update_and_activate_mod_versions(
        &self,
        versions: &BTreeMap<String, u64>,
        sim_mods: &BTreeSet<String>,
    ) -> Result<(), ForgelinkError> {
        self.calls
            .lock()
            .unwrap()
            .push((versions.clone(), sim_mods.clone()));
        if self.fail {
            Err(ForgelinkError::ModUpdate("mod vault unreachable".into()))
        } else {
            Ok(())
        }
    }
}

#[derive(Clone, Default)]
struct MemoryPreferences {
    stored: Arc<Mutex<Option<LastGameSettings>>>,
}

impl Preferences for MemoryPreferences {
    async fn last_game(&self) -> Option<LastGameSettings> {
        self.stored.lock().unwrap().clone()
    }

    async fn store_last_game(&self, settings: LastGameSettings) {
        *self.stored.lock().unwrap() = Some(settings);
    }
}

/// Records `(error message, message key)` pairs.
#[derive(Clone, Default)]
struct RecordingSink {
    notifications: Arc<Mutex<Vec<(String, String)>>>,
}

impl NotificationSink for RecordingSink {
    async fn add_immediate_error_notification(&self, error: &ForgelinkError, message_key: &str) {
        self.notifications
            .lock()
            .unwrap()
            .push((error.to_string(), message_key.to_string()));
    }
}

#[derive(Clone, Default)]
struct RecordingLauncher {
    commands: Arc<Mutex<Vec<LaunchCommand>>>,
}

impl ProcessLauncher for RecordingLauncher {
    async fn launch(&self, command: LaunchCommand) -> Result<(), ForgelinkError> {
        self.commands.lock().unwrap().push(command);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

type TestOrchestrator = GameLaunchOrchestrator<
    StaticMaps,
    RecordingMods,
    MemoryPreferences,
    RecordingSink,
    RecordingLauncher,
>;

struct Harness {
    orchestrator: TestOrchestrator,
    maps: StaticMaps,
    mods: RecordingMods,
    preferences: MemoryPreferences,
    notifications: RecordingSink,
    launcher: RecordingLauncher,
    replays_dir: PathBuf,
    quarantine_dir: PathBuf,
    _root: TempDir,
}

/// Builds an orchestrator over temporary vault directories. `server_addr`
/// is only dialed by scenarios that log in first.
fn harness(server_addr: &str, map_folders: &[&str], mods: RecordingMods) -> Harness {
    let root = TempDir::new().expect("temp dir should create");
    let replays_dir = root.path().join("replays");
    let quarantine_dir = root.path().join("corrupt");
    fs::create_dir_all(&replays_dir).expect("replay dir should create");

    let config = LobbyConfig {
        server_addr: server_addr.to_string(),
        request_timeout: Duration::from_secs(5),
        connect_attempts: 1,
        reconnect_backoff: Duration::from_millis(10),
    };
    let lobby = LobbyClient::start(config, WsConnector);
    let vault = ReplayVault::new(&replays_dir, &quarantine_dir);

    let maps = StaticMaps::with_folders(map_folders);
    let preferences = MemoryPreferences::default();
    let notifications = RecordingSink::default();
    let launcher = RecordingLauncher::default();

    let orchestrator = GameLaunchOrchestrator::new(
        lobby,
        vault,
        maps.clone(),
        mods.clone(),
        preferences.clone(),
        notifications.clone(),
        launcher.clone(),
    );
    Harness {
        orchestrator,
        maps,
        mods,
        preferences,
        notifications,
        launcher,
        replays_dir,
        quarantine_dir,
        _root: root,
    }
}

/// Harness without a reachable lobby server, for replay-only scenarios.
fn offline_harness(map_folders: &[&str]) -> Harness {
    harness("127.0.0.1:9", map_folders, RecordingMods::default())
}

// ---------------------------------------------------------------------------
// Lobby server side
// ---------------------------------------------------------------------------

struct TestServer {
    listener: TcpListener,
}

struct ServerConn {
    ws: WebSocketStream<TcpStream>,
}

impl TestServer {
    async fn bind() -> (Self, String) {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("should bind test listener");
        let addr = listener.local_addr().expect("local addr").to_string();
        (Self { listener }, addr)
    }

    async fn accept(&self) -> ServerConn {
        let (stream, _) = self.listener.accept().await.expect("should accept");
        let ws = tokio_tungstenite::accept_async(stream)
            .await
            .expect("handshake should succeed");
        ServerConn { ws }
    }
}

impl ServerConn {
    async fn recv_record(&mut self) -> WireRecord {
        loop {
            let msg = self
                .ws
                .next()
                .await
                .expect("connection should stay open")
                .expect("frame should be readable");
            match msg {
                Message::Binary(data) => {
                    return serde_json::from_slice(&data).expect("record should parse");
                }
                Message::Text(text) => {
                    return serde_json::from_str(&text).expect("record should parse");
                }
                Message::Close(_) => panic!("client closed the connection unexpectedly"),
                _ => continue,
            }
        }
    }

    async fn send_command(&mut self, command: &ServerCommand) {
        let json = serde_json::to_string(&command.encode()).expect("record should serialize");
        self.ws
            .send(Message::Text(json.into()))
            .await
            .expect("send should succeed");
    }
}

/// Drives the login handshake from both sides.
async fn log_in(client: &LobbyClient, server: &TestServer) -> ServerConn {
    let connect = {
        let client = client.clone();
        tokio::spawn(async move { client.connect_and_log_in("alice", "hunter2").await })
    };
    let mut conn = server.accept().await;
    let login = conn.recv_record().await;
    assert_eq!(login.command, "login");
    conn.send_command(&ServerCommand::Welcome(Welcome {
        session: 7122,
        player_uid: PlayerUid(42),
        username: "alice".to_string(),
    }))
    .await;
    connect
        .await
        .expect("connect task should not panic")
        .expect("login should succeed");
    conn
}

fn game_launch(uid: u32, args: &[&str]) -> ServerCommand {
    ServerCommand::GameLaunch(GameLaunch {
        uid: GameUid(uid),
        featured_mod: "faf".to_string(),
        args: args.iter().map(|a| a.to_string()).collect(),
    })
}

fn new_game_info(title: &str, password: Option<&str>) -> NewGameInfo {
    NewGameInfo {
        title: title.to_string(),
        password: password.map(str::to_string),
        featured_mod: "faf".to_string(),
        map_folder: "scmp_009".to_string(),
        visibility: Visibility::Public,
        min_rating: Some(500),
        max_rating: None,
        enforce_rating: false,
        sim_mods: vec!["9e8ea941-c306-4751-b367-f00000000005".to_string()],
    }
}

// ---------------------------------------------------------------------------
// Replay fixtures
// ---------------------------------------------------------------------------

const MAP_PATH: &str = "/maps/forbidden pass.v0001/forbidden pass.scmap";

fn legacy_body(map_path: &str) -> Vec<u8> {
    let mut body = Vec::new();
    write_replay_header(
        &mut body,
        "Supreme Commander v1.50.3599",
        "Replay v1.9",
        map_path,
    );
    body
}

fn write_file(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, bytes).expect("fixture should write");
    path
}

// ---------------------------------------------------------------------------
// Local replay launches
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_run_replay_resolves_the_faf_container() {
    let h = offline_harness(&["forbidden pass.v0001"]);

    let metadata = ReplayMetadata {
        uid: Some(8246215),
        title: "Open 1v1".to_string(),
        featured_mod: "blackops".to_string(),
        featured_mod_versions: BTreeMap::from([("1".to_string(), 3599)]),
        sim_mods: BTreeMap::from([(
            "9e8ea941-c306-4751-b367-f00000000005".to_string(),
            "Hotbuild".to_string(),
        )]),
        ..ReplayMetadata::default()
    };
    let bytes = write_faf_replay(&metadata, &legacy_body(MAP_PATH)).unwrap();
    let path = write_file(&h.replays_dir, "8246215.fafreplay", &bytes);

    h.orchestrator.run_replay(&path).await.unwrap();

    let commands = h.launcher.commands.lock().unwrap();
    assert_eq!(
        *commands,
        vec![LaunchCommand::Replay {
            path: path.clone(),
            replay_id: Some(8246215),
            featured_mod: "blackops".to_string(),
            engine_build: 3599,
            mod_versions: BTreeMap::from([("1".to_string(), 3599)]),
            sim_mods: BTreeSet::from(["9e8ea941-c306-4751-b367-f00000000005".to_string()]),
            map_folder: "forbidden pass.v0001".to_string(),
        }]
    );

    // The catalogs were consulted with exactly what the replay named.
    assert_eq!(
        *h.maps.requests.lock().unwrap(),
        vec!["forbidden pass.v0001".to_string()]
    );
    let mod_calls = h.mods.calls.lock().unwrap();
    assert_eq!(mod_calls.len(), 1);
    assert_eq!(mod_calls[0].0.get("1"), Some(&3599));
    assert!(h.notifications.notifications.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_run_replay_guesses_the_mod_for_legacy_files() {
    let h = offline_harness(&["forbidden pass.v0001"]);
    let path = write_file(
        &h.replays_dir,
        "110621-2128 Saltrock Colony.blackops.SCFAReplay",
        &legacy_body(MAP_PATH),
    );

    h.orchestrator.run_replay(&path).await.unwrap();

    let commands = h.launcher.commands.lock().unwrap();
    match &commands[0] {
        LaunchCommand::Replay {
            replay_id,
            featured_mod,
            mod_versions,
            sim_mods,
            ..
        } => {
            assert_eq!(*replay_id, None);
            assert_eq!(featured_mod, "blackops");
            assert!(mod_versions.is_empty());
            assert!(sim_mods.is_empty());
        }
        other => panic!("expected a replay launch, got {other:?}"),
    }
}

#[tokio::test]
async fn test_run_replay_fails_and_notifies_when_the_map_is_unknown() {
    let h = offline_harness(&[]);
    let path = write_file(&h.replays_dir, "game.scfareplay", &legacy_body(MAP_PATH));

    let err = h.orchestrator.run_replay(&path).await.unwrap_err();
    assert!(matches!(err, ForgelinkError::MapNotFound(ref folder) if folder == "forbidden pass.v0001"));

    let notifications = h.notifications.notifications.lock().unwrap();
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].1, "replayCouldNotBeStarted");
    assert!(notifications[0].0.contains("forbidden pass.v0001"));
    assert!(h.launcher.commands.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_run_replay_notifies_on_a_corrupt_file() {
    let h = offline_harness(&["forbidden pass.v0001"]);
    let path = write_file(
        &h.replays_dir,
        "bad.fafreplay",
        b"garbage without a newline",
    );

    let err = h.orchestrator.run_replay(&path).await.unwrap_err();
    assert!(matches!(err, ForgelinkError::Replay(_)));

    let notifications = h.notifications.notifications.lock().unwrap();
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].1, "replayCouldNotBeStarted");
    assert!(h.launcher.commands.lock().unwrap().is_empty());
}

// ---------------------------------------------------------------------------
// Live replay URIs
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_run_replay_uri_rewrites_to_the_relay_scheme() {
    let h = offline_harness(&[]);

    h.orchestrator
        .run_replay_uri("faflive://example.com/123/456.scfareplay?mod=faf&map=map%20name")
        .await
        .unwrap();

    let commands = h.launcher.commands.lock().unwrap();
    assert_eq!(
        *commands,
        vec![LaunchCommand::LiveReplay {
            uri: "gpgnet://example.com/123/456.scfareplay".to_string(),
            game_id: 123,
            featured_mod: "faf".to_string(),
            map_name: Some("map name".to_string()),
        }]
    );
}

#[tokio::test]
async fn test_run_replay_uri_defaults_the_featured_mod() {
    let h = offline_harness(&[]);

    h.orchestrator
        .run_replay_uri("faflive://example.com/9/1.scfareplay")
        .await
        .unwrap();

    let commands = h.launcher.commands.lock().unwrap();
    match &commands[0] {
        LaunchCommand::LiveReplay { featured_mod, map_name, .. } => {
            assert_eq!(featured_mod, DEFAULT_FEATURED_MOD);
            assert_eq!(*map_name, None);
        }
        other => panic!("expected a live replay launch, got {other:?}"),
    }
}

#[tokio::test]
async fn test_run_replay_uri_notifies_on_a_malformed_uri() {
    let h = offline_harness(&[]);

    let err = h
        .orchestrator
        .run_replay_uri("https://example.com/123/456.scfareplay")
        .await
        .unwrap_err();
    assert!(matches!(err, ForgelinkError::Replay(_)));

    let notifications = h.notifications.notifications.lock().unwrap();
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].1, "liveReplayCouldNotBeStarted");
}

// ---------------------------------------------------------------------------
// Vault paging
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_load_local_replay_page_notifies_once_per_corrupt_file() {
    let h = offline_harness(&[]);
    let good = write_faf_replay(&ReplayMetadata::default(), &legacy_body(MAP_PATH)).unwrap();
    write_file(&h.replays_dir, "a.fafreplay", &good);
    write_file(&h.replays_dir, "b.scfareplay", &legacy_body(MAP_PATH));
    write_file(&h.replays_dir, "c.fafreplay", b"garbage without a newline");
    write_file(&h.replays_dir, "d.fafreplay", b"{}\n\x0a\x00\x00\x00");

    let page = h.orchestrator.load_local_replay_page(10, 1).await.unwrap();

    assert_eq!(page.replays.len(), 2);
    assert_eq!(page.quarantined.len(), 2);
    for quarantined in &page.quarantined {
        let moved_to = quarantined.moved_to.as_ref().expect("file should move");
        assert!(moved_to.starts_with(&h.quarantine_dir));
        assert!(moved_to.exists());
    }

    let notifications = h.notifications.notifications.lock().unwrap();
    assert_eq!(notifications.len(), 2);
    for (message, key) in notifications.iter() {
        assert_eq!(key, "corruptedReplayFiles.notification");
        assert!(message.starts_with("corrupt replay file"));
    }
}

// ---------------------------------------------------------------------------
// Hosting, joining, matchmaking
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_host_game_stores_prefs_and_launches_with_server_args() {
    let (server, addr) = TestServer::bind().await;
    let h = harness(&addr, &[], RecordingMods::default());
    let mut conn = log_in(h.orchestrator.lobby(), &server).await;

    // An empty password means an open game.
    let host = h.orchestrator.host_game(new_game_info("Open 1v1", Some("")));
    let server_side = async {
        let record = conn.recv_record().await;
        assert_eq!(record.command, "host_game");
        assert_eq!(record.str_field(0).unwrap(), "Open 1v1");
        assert_eq!(record.opt_str_field(1).unwrap(), None);
        conn.send_command(&game_launch(123, &["/numgames", "42"])).await;
    };
    let (result, ()) = tokio::join!(host, server_side);
    result.unwrap();

    let stored = h.preferences.stored.lock().unwrap().clone().unwrap();
    assert_eq!(stored.title, "Open 1v1");
    assert_eq!(stored.password, None);
    assert_eq!(stored.map_folder, "scmp_009");
    assert_eq!(stored.min_rating, Some(500));
    assert_eq!(
        h.orchestrator.last_game_settings().await,
        Some(stored)
    );

    // Hosting pins no versions; the sim mod set still goes through.
    let mod_calls = h.mods.calls.lock().unwrap();
    assert_eq!(mod_calls.len(), 1);
    assert!(mod_calls[0].0.is_empty());
    assert!(
        mod_calls[0]
            .1
            .contains("9e8ea941-c306-4751-b367-f00000000005")
    );

    let commands = h.launcher.commands.lock().unwrap();
    assert_eq!(
        *commands,
        vec![LaunchCommand::Game {
            uid: GameUid(123),
            featured_mod: "faf".to_string(),
            args: vec!["/numgames".to_string(), "42".to_string()],
        }]
    );
    assert!(h.notifications.notifications.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_host_game_survives_a_mod_update_failure() {
    let (server, addr) = TestServer::bind().await;
    let failing = RecordingMods {
        fail: true,
        ..RecordingMods::default()
    };
    let h = harness(&addr, &[], failing);
    let mut conn = log_in(h.orchestrator.lobby(), &server).await;

    let host = h.orchestrator.host_game(new_game_info("Open 1v1", None));
    let server_side = async {
        let record = conn.recv_record().await;
        assert_eq!(record.command, "host_game");
        conn.send_command(&game_launch(7, &[])).await;
    };
    let (result, ()) = tokio::join!(host, server_side);
    result.unwrap();

    // The failure was reported, but the game still hosted and launched.
    let notifications = h.notifications.notifications.lock().unwrap();
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].1, "game.create.errorUpdatingMods");
    assert_eq!(h.launcher.commands.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_host_game_without_a_connection_notifies() {
    let h = offline_harness(&[]);

    let err = h
        .orchestrator
        .host_game(new_game_info("Open 1v1", None))
        .await
        .unwrap_err();
    assert!(matches!(err, ForgelinkError::Lobby(LobbyError::NotConnected)));

    let notifications = h.notifications.notifications.lock().unwrap();
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].1, "game.create.failed");
    // The settings were still remembered for the next attempt.
    assert!(h.preferences.stored.lock().unwrap().is_some());
}

#[tokio::test]
async fn test_join_game_passes_the_server_args_through() {
    let (server, addr) = TestServer::bind().await;
    let h = harness(&addr, &[], RecordingMods::default());
    let mut conn = log_in(h.orchestrator.lobby(), &server).await;

    let join = h.orchestrator.join_game(GameUid(5), Some("".to_string()));
    let server_side = async {
        let record = conn.recv_record().await;
        assert_eq!(record.command, "join_game");
        assert_eq!(record.uint_field(0).unwrap(), 5);
        assert_eq!(record.opt_str_field(1).unwrap(), None);
        conn.send_command(&game_launch(5, &["/team", "2"])).await;
    };
    let (result, ()) = tokio::join!(join, server_side);
    result.unwrap();

    let commands = h.launcher.commands.lock().unwrap();
    match &commands[0] {
        LaunchCommand::Game { uid, args, .. } => {
            assert_eq!(*uid, GameUid(5));
            assert_eq!(args, &["/team".to_string(), "2".to_string()]);
        }
        other => panic!("expected a game launch, got {other:?}"),
    }
}

#[tokio::test]
async fn test_matchmaker_search_launches_the_match() {
    let (server, addr) = TestServer::bind().await;
    let h = harness(&addr, &[], RecordingMods::default());
    let mut conn = log_in(h.orchestrator.lobby(), &server).await;

    let search = h.orchestrator.start_search_matchmaker(Faction::Cybran);
    let server_side = async {
        let record = conn.recv_record().await;
        assert_eq!(record.command, "search_matchmaker");
        assert_eq!(record.str_field(0).unwrap(), "cybran");
        conn.send_command(&game_launch(900, &[])).await;
    };
    let (result, ()) = tokio::join!(search, server_side);
    result.unwrap();

    assert_eq!(h.launcher.commands.lock().unwrap().len(), 1);
    assert!(h.notifications.notifications.lock().unwrap().is_empty());
}

// ---------------------------------------------------------------------------
// Enrichment
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_enrich_extracts_chat_and_game_options() {
    let h = offline_harness(&[]);
    let mut body = legacy_body(MAP_PATH);
    write_chat_record(&mut body, "alice", "gl hf");
    write_game_option_record(&mut body, "Victory", "demoralization");
    let path = write_file(&h.replays_dir, "chatty.scfareplay", &body);

    let records = h.orchestrator.enrich(&path).await.unwrap();

    assert_eq!(records.chat_messages.len(), 1);
    assert_eq!(records.chat_messages[0].sender, "alice");
    assert_eq!(records.chat_messages[0].text, "gl hf");
    assert_eq!(records.game_options.len(), 1);
    assert_eq!(records.game_options[0].key, "Victory");
    // Enrichment is a query; nothing was launched or reported.
    assert!(h.launcher.commands.lock().unwrap().is_empty());
    assert!(h.notifications.notifications.lock().unwrap().is_empty());
}
