//! Typed commands layered over [`WireRecord`]s.
//!
//! Three command families share the wire:
//!
//! - [`ClientCommand`]: lobby requests the client sends (snake_case names).
//! - [`ServerCommand`]: lobby messages the server sends (snake_case names).
//! - [`RelayCommand`]: peer connectivity instructions relayed between the
//!   lobby and the running game process. These keep their legacy PascalCase
//!   names on the wire.
//!
//! Decoding validates arity and field types against each command's declared
//! layout and fails with [`ProtocolError::Format`] on violation. A record
//! whose command name is unknown decodes losslessly into the family's
//! `Unrecognized` variant instead of failing, so protocol additions on the
//! server never break older clients.

use crate::error::ProtocolError;
use crate::types::{
    Faction, FieldValue, GameLaunch, GameUid, NewGameInfo, PlayerUid, Visibility, Welcome,
    WireRecord,
};

// ---------------------------------------------------------------------------
// Relay commands
// ---------------------------------------------------------------------------

/// Peer connectivity instructions exchanged with the game process.
///
/// Wire layouts:
/// - `HostGame`: map_folder
/// - `JoinGame`: peer_address, username, peer_uid
/// - `ConnectToPeer`: peer_address, username, peer_uid
/// - `DisconnectFromPeer`: peer_uid
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayCommand {
    HostGame {
        map_folder: String,
    },
    JoinGame {
        peer_address: String,
        username: String,
        peer_uid: PlayerUid,
    },
    ConnectToPeer {
        peer_address: String,
        username: String,
        peer_uid: PlayerUid,
    },
    DisconnectFromPeer {
        peer_uid: PlayerUid,
    },
    /// A relay instruction this client version does not know. Kept verbatim
    /// so it can be forwarded or logged without loss.
    Unrecognized {
        command: String,
        args: Vec<FieldValue>,
    },
}

impl RelayCommand {
    pub fn command_name(&self) -> &str {
        match self {
            Self::HostGame { .. } => "HostGame",
            Self::JoinGame { .. } => "JoinGame",
            Self::ConnectToPeer { .. } => "ConnectToPeer",
            Self::DisconnectFromPeer { .. } => "DisconnectFromPeer",
            Self::Unrecognized { command, .. } => command,
        }
    }

    pub fn encode(&self) -> WireRecord {
        match self {
            Self::HostGame { map_folder } => {
                WireRecord::new("HostGame", vec![map_folder.as_str().into()])
            }
            Self::JoinGame {
                peer_address,
                username,
                peer_uid,
            } => WireRecord::new(
                "JoinGame",
                vec![
                    peer_address.as_str().into(),
                    username.as_str().into(),
                    (*peer_uid).into(),
                ],
            ),
            Self::ConnectToPeer {
                peer_address,
                username,
                peer_uid,
            } => WireRecord::new(
                "ConnectToPeer",
                vec![
                    peer_address.as_str().into(),
                    username.as_str().into(),
                    (*peer_uid).into(),
                ],
            ),
            Self::DisconnectFromPeer { peer_uid } => {
                WireRecord::new("DisconnectFromPeer", vec![(*peer_uid).into()])
            }
            Self::Unrecognized { command, args } => WireRecord::new(command.clone(), args.clone()),
        }
    }

    pub fn decode(record: WireRecord) -> Result<Self, ProtocolError> {
        let decoded = match record.command.as_str() {
            "HostGame" => {
                record.expect_args(1)?;
                Some(Self::HostGame {
                    map_folder: record.str_field(0)?.to_string(),
                })
            }
            "JoinGame" => {
                record.expect_args(3)?;
                Some(Self::JoinGame {
                    peer_address: record.str_field(0)?.to_string(),
                    username: record.str_field(1)?.to_string(),
                    peer_uid: PlayerUid(record.uint_field(2)?),
                })
            }
            "ConnectToPeer" => {
                record.expect_args(3)?;
                Some(Self::ConnectToPeer {
                    peer_address: record.str_field(0)?.to_string(),
                    username: record.str_field(1)?.to_string(),
                    peer_uid: PlayerUid(record.uint_field(2)?),
                })
            }
            "DisconnectFromPeer" => {
                record.expect_args(1)?;
                Some(Self::DisconnectFromPeer {
                    peer_uid: PlayerUid(record.uint_field(0)?),
                })
            }
            _ => None,
        };
        Ok(match decoded {
            Some(command) => command,
            None => Self::Unrecognized {
                command: record.command,
                args: record.args,
            },
        })
    }
}

// ---------------------------------------------------------------------------
// Server commands
// ---------------------------------------------------------------------------

/// Messages the lobby server sends to the client.
///
/// Wire layouts:
/// - `welcome`: session, player_uid, username
/// - `game_info`: uid, title, host, featured_mod, map_folder, num_players,
///   max_players
/// - `player_info`: uid, username, rating_mean, rating_deviation
/// - `game_launch`: uid, featured_mod, then zero or more process arguments
/// - `matchmaker_info`: queue, players_in_queue
/// - `authentication_failed`: reason
/// - `notice`: style, text
/// - `pong`: no fields
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerCommand {
    Welcome(Welcome),
    GameInfo {
        uid: GameUid,
        title: String,
        host: String,
        featured_mod: String,
        map_folder: String,
        num_players: u32,
        max_players: u32,
    },
    PlayerInfo {
        uid: PlayerUid,
        username: String,
        rating_mean: i64,
        rating_deviation: i64,
    },
    GameLaunch(GameLaunch),
    MatchmakerInfo {
        queue: String,
        players_in_queue: u32,
    },
    AuthenticationFailed {
        reason: String,
    },
    Notice {
        style: String,
        text: String,
    },
    Pong,
    /// A server message this client version does not know.
    Unrecognized {
        command: String,
        args: Vec<FieldValue>,
    },
}

impl ServerCommand {
    pub fn command_name(&self) -> &str {
        match self {
            Self::Welcome(_) => "welcome",
            Self::GameInfo { .. } => "game_info",
            Self::PlayerInfo { .. } => "player_info",
            Self::GameLaunch(_) => "game_launch",
            Self::MatchmakerInfo { .. } => "matchmaker_info",
            Self::AuthenticationFailed { .. } => "authentication_failed",
            Self::Notice { .. } => "notice",
            Self::Pong => "pong",
            Self::Unrecognized { command, .. } => command,
        }
    }

    pub fn encode(&self) -> WireRecord {
        match self {
            Self::Welcome(welcome) => WireRecord::new(
                "welcome",
                vec![
                    FieldValue::Int(welcome.session as i64),
                    welcome.player_uid.into(),
                    welcome.username.as_str().into(),
                ],
            ),
            Self::GameInfo {
                uid,
                title,
                host,
                featured_mod,
                map_folder,
                num_players,
                max_players,
            } => WireRecord::new(
                "game_info",
                vec![
                    (*uid).into(),
                    title.as_str().into(),
                    host.as_str().into(),
                    featured_mod.as_str().into(),
                    map_folder.as_str().into(),
                    (*num_players).into(),
                    (*max_players).into(),
                ],
            ),
            Self::PlayerInfo {
                uid,
                username,
                rating_mean,
                rating_deviation,
            } => WireRecord::new(
                "player_info",
                vec![
                    (*uid).into(),
                    username.as_str().into(),
                    (*rating_mean).into(),
                    (*rating_deviation).into(),
                ],
            ),
            Self::GameLaunch(launch) => {
                let mut args: Vec<FieldValue> =
                    vec![launch.uid.into(), launch.featured_mod.as_str().into()];
                args.extend(launch.args.iter().map(|arg| arg.as_str().into()));
                WireRecord::new("game_launch", args)
            }
            Self::MatchmakerInfo {
                queue,
                players_in_queue,
            } => WireRecord::new(
                "matchmaker_info",
                vec![queue.as_str().into(), (*players_in_queue).into()],
            ),
            Self::AuthenticationFailed { reason } => {
                WireRecord::new("authentication_failed", vec![reason.as_str().into()])
            }
            Self::Notice { style, text } => WireRecord::new(
                "notice",
                vec![style.as_str().into(), text.as_str().into()],
            ),
            Self::Pong => WireRecord::new("pong", vec![]),
            Self::Unrecognized { command, args } => WireRecord::new(command.clone(), args.clone()),
        }
    }

    pub fn decode(record: WireRecord) -> Result<Self, ProtocolError> {
        let decoded = match record.command.as_str() {
            "welcome" => {
                record.expect_args(3)?;
                Some(Self::Welcome(Welcome {
                    session: record.u64_field(0)?,
                    player_uid: PlayerUid(record.uint_field(1)?),
                    username: record.str_field(2)?.to_string(),
                }))
            }
            "game_info" => {
                record.expect_args(7)?;
                Some(Self::GameInfo {
                    uid: GameUid(record.uint_field(0)?),
                    title: record.str_field(1)?.to_string(),
                    host: record.str_field(2)?.to_string(),
                    featured_mod: record.str_field(3)?.to_string(),
                    map_folder: record.str_field(4)?.to_string(),
                    num_players: record.uint_field(5)?,
                    max_players: record.uint_field(6)?,
                })
            }
            "player_info" => {
                record.expect_args(4)?;
                Some(Self::PlayerInfo {
                    uid: PlayerUid(record.uint_field(0)?),
                    username: record.str_field(1)?.to_string(),
                    rating_mean: record.int_field(2)?,
                    rating_deviation: record.int_field(3)?,
                })
            }
            "game_launch" => {
                record.expect_min_args(2)?;
                let mut args = Vec::with_capacity(record.args.len() - 2);
                for index in 2..record.args.len() {
                    args.push(record.str_field(index)?.to_string());
                }
                Some(Self::GameLaunch(GameLaunch {
                    uid: GameUid(record.uint_field(0)?),
                    featured_mod: record.str_field(1)?.to_string(),
                    args,
                }))
            }
            "matchmaker_info" => {
                record.expect_args(2)?;
                Some(Self::MatchmakerInfo {
                    queue: record.str_field(0)?.to_string(),
                    players_in_queue: record.uint_field(1)?,
                })
            }
            "authentication_failed" => {
                record.expect_args(1)?;
                Some(Self::AuthenticationFailed {
                    reason: record.str_field(0)?.to_string(),
                })
            }
            "notice" => {
                record.expect_args(2)?;
                Some(Self::Notice {
                    style: record.str_field(0)?.to_string(),
                    text: record.str_field(1)?.to_string(),
                })
            }
            "pong" => {
                record.expect_args(0)?;
                Some(Self::Pong)
            }
            _ => None,
        };
        Ok(match decoded {
            Some(command) => command,
            None => Self::Unrecognized {
                command: record.command,
                args: record.args,
            },
        })
    }
}

// ---------------------------------------------------------------------------
// Client commands
// ---------------------------------------------------------------------------

/// Requests the client sends to the lobby server.
///
/// Wire layouts:
/// - `login`: username, password
/// - `host_game`: title, password, featured_mod, map_folder, visibility,
///   min_rating, max_rating, enforce_rating, sim_mods
/// - `join_game`: uid, password
/// - `search_matchmaker`: faction
/// - `stop_search_matchmaker`: no fields
/// - `ping`: no fields
///
/// Sim-mod UIDs travel as one semicolon-joined string field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientCommand {
    Login {
        username: String,
        password: String,
    },
    HostGame(NewGameInfo),
    JoinGame {
        uid: GameUid,
        password: Option<String>,
    },
    SearchMatchmaker {
        faction: Faction,
    },
    StopSearchMatchmaker,
    Ping,
    /// A relay instruction forwarded to the server on behalf of the game
    /// process.
    Relay(RelayCommand),
}

impl ClientCommand {
    pub fn command_name(&self) -> &str {
        match self {
            Self::Login { .. } => "login",
            Self::HostGame(_) => "host_game",
            Self::JoinGame { .. } => "join_game",
            Self::SearchMatchmaker { .. } => "search_matchmaker",
            Self::StopSearchMatchmaker => "stop_search_matchmaker",
            Self::Ping => "ping",
            Self::Relay(relay) => relay.command_name(),
        }
    }

    pub fn encode(&self) -> WireRecord {
        match self {
            Self::Login { username, password } => WireRecord::new(
                "login",
                vec![username.as_str().into(), password.as_str().into()],
            ),
            Self::HostGame(info) => WireRecord::new(
                "host_game",
                vec![
                    info.title.as_str().into(),
                    info.password.clone().into(),
                    info.featured_mod.as_str().into(),
                    info.map_folder.as_str().into(),
                    info.visibility.as_wire().into(),
                    info.min_rating.into(),
                    info.max_rating.into(),
                    info.enforce_rating.into(),
                    info.sim_mods.join(";").into(),
                ],
            ),
            Self::JoinGame { uid, password } => WireRecord::new(
                "join_game",
                vec![(*uid).into(), password.clone().into()],
            ),
            Self::SearchMatchmaker { faction } => {
                WireRecord::new("search_matchmaker", vec![faction.as_wire().into()])
            }
            Self::StopSearchMatchmaker => WireRecord::new("stop_search_matchmaker", vec![]),
            Self::Ping => WireRecord::new("ping", vec![]),
            Self::Relay(relay) => relay.encode(),
        }
    }

    pub fn decode(record: WireRecord) -> Result<Self, ProtocolError> {
        let decoded = match record.command.as_str() {
            "login" => {
                record.expect_args(2)?;
                Some(Self::Login {
                    username: record.str_field(0)?.to_string(),
                    password: record.str_field(1)?.to_string(),
                })
            }
            "host_game" => {
                record.expect_args(9)?;
                let visibility_name = record.str_field(4)?;
                let visibility = Visibility::from_wire(visibility_name).ok_or_else(|| {
                    record.malformed(format!("unknown visibility `{visibility_name}`"))
                })?;
                let sim_mods_joined = record.str_field(8)?;
                let sim_mods = if sim_mods_joined.is_empty() {
                    Vec::new()
                } else {
                    sim_mods_joined.split(';').map(str::to_string).collect()
                };
                Some(Self::HostGame(NewGameInfo {
                    title: record.str_field(0)?.to_string(),
                    password: record.opt_str_field(1)?.map(str::to_string),
                    featured_mod: record.str_field(2)?.to_string(),
                    map_folder: record.str_field(3)?.to_string(),
                    visibility,
                    min_rating: record.opt_int_field(5)?,
                    max_rating: record.opt_int_field(6)?,
                    enforce_rating: record.bool_field(7)?,
                    sim_mods,
                }))
            }
            "join_game" => {
                record.expect_args(2)?;
                Some(Self::JoinGame {
                    uid: GameUid(record.uint_field(0)?),
                    password: record.opt_str_field(1)?.map(str::to_string),
                })
            }
            "search_matchmaker" => {
                record.expect_args(1)?;
                let faction_name = record.str_field(0)?;
                let faction = Faction::from_wire(faction_name).ok_or_else(|| {
                    record.malformed(format!("unknown faction `{faction_name}`"))
                })?;
                Some(Self::SearchMatchmaker { faction })
            }
            "stop_search_matchmaker" => {
                record.expect_args(0)?;
                Some(Self::StopSearchMatchmaker)
            }
            "ping" => {
                record.expect_args(0)?;
                Some(Self::Ping)
            }
            _ => None,
        };
        Ok(match decoded {
            Some(command) => command,
            // Anything else is a relay instruction or an unknown record;
            // both come back through the relay family.
            None => Self::Relay(RelayCommand::decode(record)?),
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
