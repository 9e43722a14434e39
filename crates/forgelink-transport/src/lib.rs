//! Transport abstraction for the Forgelink lobby connection.
//!
//! Provides the [`Connector`] and [`Connection`] traits that abstract over
//! how the client reaches the lobby server, plus the default WebSocket
//! implementation. The traits move opaque byte frames; framing their
//! contents is the protocol crate's job.
//!
//! # Feature Flags
//!
//! - `websocket` (default) — WebSocket connector via `tokio-tungstenite`

mod error;
#[cfg(feature = "websocket")]
mod websocket;

pub use error::TransportError;
#[cfg(feature = "websocket")]
pub use websocket::{WsConnection, WsConnector};

use std::fmt;
use std::future::Future;

/// Opaque identifier for a connection, unique within the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Creates a new `ConnectionId` from a raw `u64`.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Dials a remote server and produces connections.
///
/// Returned futures must be `Send`: the lobby client drives dialing from
/// spawned tasks.
pub trait Connector: Send + Sync + 'static {
    /// The connection type produced by this connector.
    type Conn: Connection;

    /// Dials the given address and performs the protocol handshake.
    fn connect(
        &self,
        addr: &str,
    ) -> impl Future<Output = Result<Self::Conn, TransportError>> + Send;
}

/// A single established connection that can send and receive byte frames.
///
/// Methods take `&self` so one task can read while another writes; the
/// connection is shared behind an `Arc` by its users.
pub trait Connection: Send + Sync + 'static {
    /// Sends one frame to the server.
    fn send(&self, data: &[u8]) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Receives the next frame from the server.
    ///
    /// Returns `Ok(None)` when the connection is cleanly closed.
    fn recv(&self) -> impl Future<Output = Result<Option<Vec<u8>>, TransportError>> + Send;

    /// Closes the connection.
    fn close(&self) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Returns the unique identifier for this connection.
    fn id(&self) -> ConnectionId;
}
