//! Request/response correlation.
//!
//! The lobby protocol carries no request IDs: a response is matched to an
//! outstanding request purely by its command kind. That only works because
//! at most one request of each kind may be outstanding at a time; the
//! table enforces this and rejects a second submission of the same kind.
//!
//! When several outstanding kinds accept the same response kind (every
//! launch-style request is answered by `game_launch`), the response
//! resolves the earliest-submitted of them. Entries remember their
//! submission order for exactly that tie-break, and so that a connection
//! loss can fail them in the order they were submitted.

use std::collections::HashMap;
use std::fmt;
use std::time::Instant;

use forgelink_protocol::ServerCommand;
use tokio::sync::oneshot;

use crate::error::LobbyError;

/// The kinds of request that wait for a correlated response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
    Login,
    HostGame,
    JoinGame,
    SearchMatchmaker,
    Ping,
}

impl RequestKind {
    /// Whether `response` is the kind of message that answers this request.
    pub(crate) fn matches(self, response: &ServerCommand) -> bool {
        match self {
            Self::Login => matches!(
                response,
                ServerCommand::Welcome(_) | ServerCommand::AuthenticationFailed { .. }
            ),
            Self::HostGame | Self::JoinGame | Self::SearchMatchmaker => {
                matches!(response, ServerCommand::GameLaunch(_))
            }
            Self::Ping => matches!(response, ServerCommand::Pong),
        }
    }
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Login => "login",
            Self::HostGame => "host_game",
            Self::JoinGame => "join_game",
            Self::SearchMatchmaker => "search_matchmaker",
            Self::Ping => "ping",
        };
        f.write_str(name)
    }
}

/// Channel on which a pending request's outcome is delivered.
pub(crate) type ReplySender = oneshot::Sender<Result<ServerCommand, LobbyError>>;

/// One outstanding request.
pub(crate) struct PendingRequest {
    pub(crate) kind: RequestKind,
    pub(crate) seq: u64,
    pub(crate) deadline: Instant,
    pub(crate) reply: ReplySender,
}

/// Table of outstanding requests, keyed by kind.
#[derive(Default)]
pub(crate) struct PendingTable {
    entries: HashMap<RequestKind, PendingRequest>,
    next_seq: u64,
}

impl PendingTable {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Registers an outstanding request. Hands the reply sender back if a
    /// request of the same kind is already pending, leaving that one
    /// untouched.
    pub(crate) fn insert(
        &mut self,
        kind: RequestKind,
        deadline: Instant,
        reply: ReplySender,
    ) -> Result<(), ReplySender> {
        if self.entries.contains_key(&kind) {
            return Err(reply);
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        self.entries.insert(
            kind,
            PendingRequest {
                kind,
                seq,
                deadline,
                reply,
            },
        );
        Ok(())
    }

    /// Removes and returns the pending request answered by `response`.
    ///
    /// If several outstanding kinds accept the response, the
    /// earliest-submitted wins. Returns `None` when nothing is waiting for
    /// this kind of message; the caller treats it as a push message.
    pub(crate) fn resolve_matching(
        &mut self,
        response: &ServerCommand,
    ) -> Option<PendingRequest> {
        let kind = self
            .entries
            .values()
            .filter(|pending| pending.kind.matches(response))
            .min_by_key(|pending| pending.seq)
            .map(|pending| pending.kind)?;
        self.entries.remove(&kind)
    }

    /// Removes the pending request of the given kind, if any.
    pub(crate) fn remove(&mut self, kind: RequestKind) -> Option<PendingRequest> {
        self.entries.remove(&kind)
    }

    /// Removes every pending request, in submission order.
    pub(crate) fn drain_in_order(&mut self) -> Vec<PendingRequest> {
        let mut drained: Vec<PendingRequest> =
            self.entries.drain().map(|(_, pending)| pending).collect();
        drained.sort_by_key(|pending| pending.seq);
        drained
    }

    /// Removes and returns the requests whose deadline has passed, in
    /// submission order.
    pub(crate) fn expire(&mut self, now: Instant) -> Vec<PendingRequest> {
        let expired_kinds: Vec<RequestKind> = self
            .entries
            .values()
            .filter(|pending| pending.deadline <= now)
            .map(|pending| pending.kind)
            .collect();
        let mut expired: Vec<PendingRequest> = expired_kinds
            .into_iter()
            .filter_map(|kind| self.entries.remove(&kind))
            .collect();
        expired.sort_by_key(|pending| pending.seq);
        expired
    }

    /// The nearest deadline across all outstanding requests.
    pub(crate) fn earliest_deadline(&self) -> Option<Instant> {
        self.entries.values().map(|pending| pending.deadline).min()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use forgelink_protocol::{GameLaunch, GameUid, PlayerUid, Welcome};

    use super::*;

    fn reply_channel() -> (ReplySender, oneshot::Receiver<Result<ServerCommand, LobbyError>>) {
        oneshot::channel()
    }

    fn far_deadline() -> Instant {
        Instant::now() + Duration::from_secs(3600)
    }

    fn game_launch() -> ServerCommand {
        ServerCommand::GameLaunch(GameLaunch {
            uid: GameUid(1),
            featured_mod: "faf".to_string(),
            args: vec![],
        })
    }

    fn welcome() -> ServerCommand {
        ServerCommand::Welcome(Welcome {
            session: 1,
            player_uid: PlayerUid(42),
            username: "alice".to_string(),
        })
    }

    #[test]
    fn test_insert_same_kind_twice_returns_reply() {
        let mut table = PendingTable::new();
        let (first, _first_rx) = reply_channel();
        let (second, _second_rx) = reply_channel();

        assert!(table.insert(RequestKind::HostGame, far_deadline(), first).is_ok());
        assert!(table.insert(RequestKind::HostGame, far_deadline(), second).is_err());
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_distinct_kinds_may_be_outstanding_together() {
        let mut table = PendingTable::new();
        let (host, _host_rx) = reply_channel();
        let (join, _join_rx) = reply_channel();
        let (ping, _ping_rx) = reply_channel();

        assert!(table.insert(RequestKind::HostGame, far_deadline(), host).is_ok());
        assert!(table.insert(RequestKind::JoinGame, far_deadline(), join).is_ok());
        assert!(table.insert(RequestKind::Ping, far_deadline(), ping).is_ok());
        assert_eq!(table.len(), 3);
    }

    #[test]
    fn test_resolve_removes_the_entry() {
        let mut table = PendingTable::new();
        let (reply, _rx) = reply_channel();
        table.insert(RequestKind::Ping, far_deadline(), reply).unwrap();

        let resolved = table.resolve_matching(&ServerCommand::Pong).unwrap();
        assert_eq!(resolved.kind, RequestKind::Ping);
        assert!(table.is_empty());
        assert!(table.resolve_matching(&ServerCommand::Pong).is_none());
    }

    #[test]
    fn test_welcome_resolves_login_only() {
        let mut table = PendingTable::new();
        let (login, _login_rx) = reply_channel();
        let (host, _host_rx) = reply_channel();
        table.insert(RequestKind::HostGame, far_deadline(), host).unwrap();
        table.insert(RequestKind::Login, far_deadline(), login).unwrap();

        let resolved = table.resolve_matching(&welcome()).unwrap();
        assert_eq!(resolved.kind, RequestKind::Login);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_authentication_failure_resolves_login() {
        let mut table = PendingTable::new();
        let (login, _login_rx) = reply_channel();
        table.insert(RequestKind::Login, far_deadline(), login).unwrap();

        let response = ServerCommand::AuthenticationFailed {
            reason: "bad password".to_string(),
        };
        let resolved = table.resolve_matching(&response).unwrap();
        assert_eq!(resolved.kind, RequestKind::Login);
    }

    #[test]
    fn test_launch_resolves_earliest_submitted_launch_kind() {
        let mut table = PendingTable::new();
        let (search, _search_rx) = reply_channel();
        let (host, _host_rx) = reply_channel();
        table
            .insert(RequestKind::SearchMatchmaker, far_deadline(), search)
            .unwrap();
        table.insert(RequestKind::HostGame, far_deadline(), host).unwrap();

        let first = table.resolve_matching(&game_launch()).unwrap();
        assert_eq!(first.kind, RequestKind::SearchMatchmaker);
        let second = table.resolve_matching(&game_launch()).unwrap();
        assert_eq!(second.kind, RequestKind::HostGame);
    }

    #[test]
    fn test_unmatched_response_resolves_nothing() {
        let mut table = PendingTable::new();
        let (host, _host_rx) = reply_channel();
        table.insert(RequestKind::HostGame, far_deadline(), host).unwrap();

        assert!(table.resolve_matching(&ServerCommand::Pong).is_none());
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_drain_preserves_submission_order() {
        let mut table = PendingTable::new();
        let (host, _host_rx) = reply_channel();
        let (join, _join_rx) = reply_channel();
        let (ping, _ping_rx) = reply_channel();
        table.insert(RequestKind::HostGame, far_deadline(), host).unwrap();
        table.insert(RequestKind::JoinGame, far_deadline(), join).unwrap();
        table.insert(RequestKind::Ping, far_deadline(), ping).unwrap();

        let drained = table.drain_in_order();
        let kinds: Vec<RequestKind> = drained.iter().map(|pending| pending.kind).collect();
        assert_eq!(
            kinds,
            vec![RequestKind::HostGame, RequestKind::JoinGame, RequestKind::Ping]
        );
        assert!(table.is_empty());
    }

    #[test]
    fn test_remove_takes_only_the_named_kind() {
        let mut table = PendingTable::new();
        let (login, _login_rx) = reply_channel();
        let (ping, _ping_rx) = reply_channel();
        table.insert(RequestKind::Login, far_deadline(), login).unwrap();
        table.insert(RequestKind::Ping, far_deadline(), ping).unwrap();

        let removed = table.remove(RequestKind::Login).unwrap();
        assert_eq!(removed.kind, RequestKind::Login);
        assert!(table.remove(RequestKind::Login).is_none());
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_expire_removes_only_past_deadlines_in_order() {
        let mut table = PendingTable::new();
        let now = Instant::now();
        let (stale_a, _a_rx) = reply_channel();
        let (stale_b, _b_rx) = reply_channel();
        let (fresh, _fresh_rx) = reply_channel();
        table
            .insert(RequestKind::HostGame, now - Duration::from_secs(2), stale_a)
            .unwrap();
        table
            .insert(RequestKind::JoinGame, now - Duration::from_secs(1), stale_b)
            .unwrap();
        table
            .insert(RequestKind::Ping, now + Duration::from_secs(3600), fresh)
            .unwrap();

        let expired = table.expire(now);
        let kinds: Vec<RequestKind> = expired.iter().map(|pending| pending.kind).collect();
        assert_eq!(kinds, vec![RequestKind::HostGame, RequestKind::JoinGame]);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_same_kind_allowed_again_after_expiry() {
        let mut table = PendingTable::new();
        let now = Instant::now();
        let (stale, _stale_rx) = reply_channel();
        table
            .insert(RequestKind::HostGame, now - Duration::from_secs(1), stale)
            .unwrap();
        table.expire(now);

        let (retry, _retry_rx) = reply_channel();
        assert!(table.insert(RequestKind::HostGame, far_deadline(), retry).is_ok());
    }

    #[test]
    fn test_earliest_deadline() {
        let mut table = PendingTable::new();
        assert!(table.earliest_deadline().is_none());

        let now = Instant::now();
        let near = now + Duration::from_secs(1);
        let far = now + Duration::from_secs(60);
        let (a, _a_rx) = reply_channel();
        let (b, _b_rx) = reply_channel();
        table.insert(RequestKind::HostGame, far, a).unwrap();
        table.insert(RequestKind::Ping, near, b).unwrap();

        assert_eq!(table.earliest_deadline(), Some(near));
    }
}
