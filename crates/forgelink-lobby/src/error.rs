//! Lobby session error types.

use forgelink_protocol::ProtocolError;
use forgelink_transport::TransportError;
use thiserror::Error;

use crate::correlator::RequestKind;

/// Errors surfaced by the lobby client.
#[derive(Debug, Error)]
pub enum LobbyError {
    /// A request was submitted while not logged in.
    #[error("not connected to the lobby server")]
    NotConnected,

    /// A connection attempt was started while one is active.
    #[error("already connected to the lobby server")]
    AlreadyConnected,

    /// A request of this kind is already waiting for its response.
    #[error("a {0} request is already in progress")]
    AlreadyInProgress(RequestKind),

    /// The connection dropped while the request was outstanding.
    #[error("connection to the lobby server was lost")]
    ConnectionLost,

    /// No response arrived within the configured request timeout.
    #[error("{0} request timed out")]
    Timeout(RequestKind),

    /// The server rejected the login.
    #[error("authentication failed: {reason}")]
    AuthenticationFailed { reason: String },

    /// `reconnect` was called before any login attempt stored credentials.
    #[error("no stored credentials to reconnect with")]
    NoCredentials,

    /// The client task is no longer running.
    #[error("lobby client is not running")]
    ClientStopped,

    /// Transport-level failure.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Protocol-level failure.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
