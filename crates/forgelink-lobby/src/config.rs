//! Lobby client configuration.

use std::time::Duration;

/// Configuration for a [`LobbyClient`](crate::LobbyClient).
#[derive(Debug, Clone)]
pub struct LobbyConfig {
    /// Address of the lobby server. A bare `host:port` dials `ws://`.
    pub server_addr: String,
    /// How long a correlated request may stay unanswered before it fails
    /// with a timeout. Also bounds the connect-and-login handshake.
    pub request_timeout: Duration,
    /// How many times one connection attempt dials before giving up.
    pub connect_attempts: u32,
    /// Base delay between dial attempts; grows linearly per attempt with
    /// some random jitter on top.
    pub reconnect_backoff: Duration,
}

impl Default for LobbyConfig {
    fn default() -> Self {
        Self {
            server_addr: "127.0.0.1:8001".to_string(),
            request_timeout: Duration::from_secs(10),
            connect_attempts: 3,
            reconnect_backoff: Duration::from_millis(500),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LobbyConfig::default();
        assert_eq!(config.server_addr, "127.0.0.1:8001");
        assert_eq!(config.request_timeout, Duration::from_secs(10));
        assert_eq!(config.connect_attempts, 3);
        assert_eq!(config.reconnect_backoff, Duration::from_millis(500));
    }

    #[test]
    fn test_config_can_be_customized() {
        let config = LobbyConfig {
            server_addr: "lobby.example.com:443".to_string(),
            request_timeout: Duration::from_millis(50),
            ..LobbyConfig::default()
        };
        assert_eq!(config.server_addr, "lobby.example.com:443");
        assert_eq!(config.request_timeout, Duration::from_millis(50));
        assert_eq!(config.connect_attempts, 3);
    }
}
