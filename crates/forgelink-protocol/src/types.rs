//! Record and field primitives shared by every Forgelink command.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

/// Unique identifier of a player account on the lobby server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerUid(pub u32);

impl fmt::Display for PlayerUid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P-{}", self.0)
    }
}

/// Unique identifier of a hosted game, assigned by the lobby server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GameUid(pub u32);

impl fmt::Display for GameUid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "G-{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Field values
// ---------------------------------------------------------------------------

/// A single positional field inside a [`WireRecord`].
///
/// The protocol is positional, not keyed: a command declares how many fields
/// it carries and what each position means. `Null` stands in for an optional
/// field the sender left unset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Int(i64),
    Str(String),
}

impl FieldValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(value) => Some(value.as_str()),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<u32> for FieldValue {
    fn from(value: u32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<PlayerUid> for FieldValue {
    fn from(value: PlayerUid) -> Self {
        Self::Int(i64::from(value.0))
    }
}

impl From<GameUid> for FieldValue {
    fn from(value: GameUid) -> Self {
        Self::Int(i64::from(value.0))
    }
}

/// `None` encodes as `Null`, `Some` as the inner value.
impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(inner) => inner.into(),
            None => Self::Null,
        }
    }
}

// ---------------------------------------------------------------------------
// Wire records
// ---------------------------------------------------------------------------

/// One protocol message: a command name plus its positional fields.
///
/// Accessors validate position and type in one step and fail with a
/// [`ProtocolError::Format`] naming the offending command, so decoders never
/// have to build their own error strings for layout violations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireRecord {
    pub command: String,
    #[serde(default)]
    pub args: Vec<FieldValue>,
}

impl WireRecord {
    pub fn new(command: impl Into<String>, args: Vec<FieldValue>) -> Self {
        Self {
            command: command.into(),
            args,
        }
    }

    pub(crate) fn malformed(&self, reason: impl Into<String>) -> ProtocolError {
        ProtocolError::Format {
            command: self.command.clone(),
            reason: reason.into(),
        }
    }

    /// Fails unless the record carries exactly `count` fields.
    pub fn expect_args(&self, count: usize) -> Result<(), ProtocolError> {
        if self.args.len() == count {
            Ok(())
        } else {
            Err(self.malformed(format!("expected {count} fields, got {}", self.args.len())))
        }
    }

    /// Fails unless the record carries at least `count` fields.
    pub fn expect_min_args(&self, count: usize) -> Result<(), ProtocolError> {
        if self.args.len() >= count {
            Ok(())
        } else {
            Err(self.malformed(format!(
                "expected at least {count} fields, got {}",
                self.args.len()
            )))
        }
    }

    pub fn field(&self, index: usize) -> Result<&FieldValue, ProtocolError> {
        self.args
            .get(index)
            .ok_or_else(|| self.malformed(format!("missing field {index}")))
    }

    pub fn str_field(&self, index: usize) -> Result<&str, ProtocolError> {
        self.field(index)?
            .as_str()
            .ok_or_else(|| self.malformed(format!("field {index} must be a string")))
    }

    pub fn int_field(&self, index: usize) -> Result<i64, ProtocolError> {
        self.field(index)?
            .as_int()
            .ok_or_else(|| self.malformed(format!("field {index} must be an integer")))
    }

    pub fn bool_field(&self, index: usize) -> Result<bool, ProtocolError> {
        self.field(index)?
            .as_bool()
            .ok_or_else(|| self.malformed(format!("field {index} must be a boolean")))
    }

    /// Reads a non-negative integer field that must fit in a `u32`.
    pub fn uint_field(&self, index: usize) -> Result<u32, ProtocolError> {
        let value = self.int_field(index)?;
        u32::try_from(value).map_err(|_| self.malformed(format!("field {index} out of range")))
    }

    /// Reads a non-negative integer field that must fit in a `u64`.
    pub fn u64_field(&self, index: usize) -> Result<u64, ProtocolError> {
        let value = self.int_field(index)?;
        u64::try_from(value).map_err(|_| self.malformed(format!("field {index} out of range")))
    }

    /// Reads an optional string field; `Null` maps to `None`.
    pub fn opt_str_field(&self, index: usize) -> Result<Option<&str>, ProtocolError> {
        match self.field(index)? {
            FieldValue::Null => Ok(None),
            other => other
                .as_str()
                .map(Some)
                .ok_or_else(|| self.malformed(format!("field {index} must be a string or null"))),
        }
    }

    /// Reads an optional integer field; `Null` maps to `None`.
    pub fn opt_int_field(&self, index: usize) -> Result<Option<i64>, ProtocolError> {
        match self.field(index)? {
            FieldValue::Null => Ok(None),
            other => other
                .as_int()
                .map(Some)
                .ok_or_else(|| self.malformed(format!("field {index} must be an integer or null"))),
        }
    }
}

// ---------------------------------------------------------------------------
// Shared value types
// ---------------------------------------------------------------------------

/// Who can discover a hosted game in the lobby listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Visibility {
    Public,
    Private,
}

impl Visibility {
    pub fn as_wire(self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Private => "private",
        }
    }

    pub fn from_wire(value: &str) -> Option<Self> {
        match value {
            "public" => Some(Self::Public),
            "private" => Some(Self::Private),
            _ => None,
        }
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_wire())
    }
}

/// Playable faction, used when queueing for matchmaking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Faction {
    Uef,
    Cybran,
    Aeon,
    Seraphim,
}

impl Faction {
    pub fn as_wire(self) -> &'static str {
        match self {
            Self::Uef => "uef",
            Self::Cybran => "cybran",
            Self::Aeon => "aeon",
            Self::Seraphim => "seraphim",
        }
    }

    pub fn from_wire(value: &str) -> Option<Self> {
        match value {
            "uef" => Some(Self::Uef),
            "cybran" => Some(Self::Cybran),
            "aeon" => Some(Self::Aeon),
            "seraphim" => Some(Self::Seraphim),
            _ => None,
        }
    }
}

impl fmt::Display for Faction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_wire())
    }
}

/// Settings for a game to be hosted, carried by the `host_game` record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewGameInfo {
    pub title: String,
    /// `None` hosts an open game; `Some` protects it with a password.
    pub password: Option<String>,
    pub featured_mod: String,
    pub map_folder: String,
    pub visibility: Visibility,
    pub min_rating: Option<i64>,
    pub max_rating: Option<i64>,
    pub enforce_rating: bool,
    /// UIDs of sim mods that must be active in the hosted game.
    pub sim_mods: Vec<String>,
}

/// Payload of the server's `welcome` record, completing a login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Welcome {
    pub session: u64,
    pub player_uid: PlayerUid,
    pub username: String,
}

/// Payload of the server's `game_launch` record: everything the client
/// needs to start the game process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameLaunch {
    pub uid: GameUid,
    pub featured_mod: String,
    /// Extra process arguments, passed through to the launcher verbatim.
    pub args: Vec<String>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
