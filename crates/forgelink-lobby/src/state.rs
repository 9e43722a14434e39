//! Connection lifecycle states.

use std::fmt;

/// Lifecycle state of the lobby connection.
///
/// The connection cycles `Disconnected -> Connecting -> Connected` and drops
/// back to `Disconnected` from anywhere, whether the client asked for it or
/// the network decided. There is no half-open state: a failed login is a
/// plain `Disconnected`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    /// No connection to the lobby server.
    Disconnected,
    /// Dialing the server or waiting for the login to complete.
    Connecting,
    /// Logged in; requests and push messages flow.
    Connected,
}

impl ConnectionState {
    /// Whether protocol requests may be submitted in this state.
    pub fn is_connected(self) -> bool {
        matches!(self, Self::Connected)
    }

    /// Whether a new connection attempt may start from this state.
    pub fn can_connect(self) -> bool {
        matches!(self, Self::Disconnected)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
        };
        f.write_str(name)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
