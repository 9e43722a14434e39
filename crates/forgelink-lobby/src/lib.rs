//! Lobby server session for Forgelink.
//!
//! The client runs as an isolated Tokio task (actor model) owning the
//! connection, the request/response correlation table, and the subscriber
//! lists. The protocol carries no request identifiers, so at most one
//! request of each kind may be outstanding and responses are matched back
//! by command kind alone.
//!
//! # Key types
//!
//! - [`LobbyClient`] — send requests to the running session task
//! - [`LobbyConfig`] — server address, timeout, and dial retry settings
//! - [`ConnectionState`] — session lifecycle state machine
//! - [`RequestKind`] — the correlation key for outstanding requests
//! - [`LobbyError`] — everything that can go wrong with a request

mod client;
mod config;
mod correlator;
mod error;
mod state;

pub use client::LobbyClient;
pub use config::LobbyConfig;
pub use correlator::RequestKind;
pub use error::LobbyError;
pub use state::ConnectionState;
