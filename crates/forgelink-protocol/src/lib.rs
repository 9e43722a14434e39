//! Wire protocol for the Forgelink lobby connection.
//!
//! The lobby server speaks a positional record protocol: every message is a
//! command name plus an ordered list of loosely typed fields (strings,
//! integers, booleans, or null). This crate models those records as
//! [`WireRecord`], layers typed command enums on top of them, and provides
//! pluggable codecs for the byte representation:
//!
//! - [`types`] holds the record and field primitives plus shared value types.
//! - [`commands`] maps records to and from [`ClientCommand`],
//!   [`ServerCommand`], and [`RelayCommand`].
//! - [`codec`] turns records into bytes and back; JSON is the default.
//!
//! Records with an unknown command name decode losslessly into an
//! `Unrecognized` variant so that a newer server never breaks an older
//! client.

pub mod codec;
pub mod commands;
pub mod error;
pub mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use commands::{ClientCommand, RelayCommand, ServerCommand};
pub use error::ProtocolError;
pub use types::{
    Faction, FieldValue, GameLaunch, GameUid, NewGameInfo, PlayerUid, Visibility, Welcome,
    WireRecord,
};
