//! Lobby client: a handle plus the background task that owns the session.
//!
//! All mutable session state (the connection, the pending-request table,
//! the subscriber lists, the stored credentials) lives in one actor task.
//! Handles talk to it through an mpsc channel, so no lock is ever held
//! across the socket.
//!
//! Dialing and reading happen in helper tasks that report back through an
//! internal event channel. Every event carries the connection epoch it was
//! produced under; the actor bumps the epoch whenever the connection
//! changes, so a frame or close notice from a torn-down connection can
//! never leak into the session that replaced it.

use std::sync::Arc;
use std::time::{Duration, Instant};

use forgelink_protocol::{
    ClientCommand, Codec, Faction, GameLaunch, GameUid, JsonCodec, NewGameInfo, ProtocolError,
    RelayCommand, ServerCommand, Welcome, WireRecord,
};
use forgelink_transport::{Connection, Connector, TransportError};
use rand::Rng;
use tokio::sync::{mpsc, oneshot};

use crate::config::LobbyConfig;
use crate::correlator::{PendingTable, ReplySender, RequestKind};
use crate::error::LobbyError;
use crate::state::ConnectionState;

/// How long the actor may sleep when no request deadline is armed.
const IDLE_TICK: Duration = Duration::from_secs(60);

// ---------------------------------------------------------------------------
// Handle
// ---------------------------------------------------------------------------

/// Handle to the lobby session task.
///
/// Cheap to clone; every clone talks to the same connection. The task shuts
/// down once all handles are dropped.
#[derive(Clone)]
pub struct LobbyClient {
    cmd_tx: mpsc::Sender<Command>,
}

impl LobbyClient {
    /// Spawns a lobby session task using the JSON codec.
    pub fn start<T: Connector>(config: LobbyConfig, connector: T) -> Self {
        Self::start_with_codec(config, connector, JsonCodec)
    }

    /// Spawns a lobby session task with a custom codec.
    pub fn start_with_codec<T: Connector, C: Codec>(
        config: LobbyConfig,
        connector: T,
        codec: C,
    ) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel(64);
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        let actor = ClientActor {
            config,
            connector: Arc::new(connector),
            codec,
            state: ConnectionState::Disconnected,
            epoch: 0,
            conn: None,
            credentials: None,
            pending: PendingTable::new(),
            state_subs: Vec::new(),
            message_subs: Vec::new(),
            cmd_rx,
            event_tx,
            event_rx,
        };
        tokio::spawn(actor.run());

        Self { cmd_tx }
    }

    /// Connects to the configured server and logs in.
    ///
    /// Completes once the server's welcome arrives; on any failure the
    /// state settles back at disconnected.
    pub async fn connect_and_log_in(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Welcome, LobbyError> {
        let response = self
            .request(|reply| Command::Connect {
                username: username.to_string(),
                password: password.to_string(),
                reply,
            })
            .await?;
        match response {
            ServerCommand::Welcome(welcome) => Ok(welcome),
            other => Err(unexpected_response(RequestKind::Login, &other)),
        }
    }

    /// Reconnects with the credentials from the last login attempt.
    pub async fn reconnect(&self) -> Result<Welcome, LobbyError> {
        let response = self.request(|reply| Command::Reconnect { reply }).await?;
        match response {
            ServerCommand::Welcome(welcome) => Ok(welcome),
            other => Err(unexpected_response(RequestKind::Login, &other)),
        }
    }

    /// Drops the connection. Outstanding requests fail with
    /// [`LobbyError::ConnectionLost`]; a no-op when already disconnected.
    pub async fn disconnect(&self) -> Result<(), LobbyError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::Disconnect { reply: reply_tx })
            .await
            .map_err(|_| LobbyError::ClientStopped)?;
        reply_rx.await.map_err(|_| LobbyError::ClientStopped)
    }

    /// Asks the server to host a game. Resolves with the launch message.
    pub async fn host_game(&self, info: NewGameInfo) -> Result<GameLaunch, LobbyError> {
        self.launch_request(RequestKind::HostGame, ClientCommand::HostGame(info))
            .await
    }

    /// Asks the server to join a hosted game. Resolves with the launch
    /// message.
    pub async fn join_game(
        &self,
        uid: GameUid,
        password: Option<String>,
    ) -> Result<GameLaunch, LobbyError> {
        self.launch_request(RequestKind::JoinGame, ClientCommand::JoinGame { uid, password })
            .await
    }

    /// Queues for matchmaking. Resolves with the launch message once the
    /// matchmaker found a game.
    pub async fn start_search_matchmaker(
        &self,
        faction: Faction,
    ) -> Result<GameLaunch, LobbyError> {
        self.launch_request(
            RequestKind::SearchMatchmaker,
            ClientCommand::SearchMatchmaker { faction },
        )
        .await
    }

    /// Cancels a matchmaker search on the server. The outstanding search
    /// request keeps waiting until the server answers or it times out;
    /// there is no per-request cancellation.
    pub async fn stop_search_matchmaker(&self) -> Result<(), LobbyError> {
        self.send(ClientCommand::StopSearchMatchmaker).await
    }

    /// Round-trips a ping through the server.
    pub async fn ping(&self) -> Result<(), LobbyError> {
        let response = self
            .request(|reply| Command::Submit {
                kind: RequestKind::Ping,
                command: ClientCommand::Ping,
                reply,
            })
            .await?;
        match response {
            ServerCommand::Pong => Ok(()),
            other => Err(unexpected_response(RequestKind::Ping, &other)),
        }
    }

    /// Forwards a relay instruction from the game process to the server.
    pub async fn send_relay(&self, command: RelayCommand) -> Result<(), LobbyError> {
        self.send(ClientCommand::Relay(command)).await
    }

    /// Subscribes to connection state transitions. Every transition is
    /// delivered to every subscriber, in order, for the lifetime of the
    /// client.
    pub async fn subscribe_state(
        &self,
    ) -> Result<mpsc::UnboundedReceiver<ConnectionState>, LobbyError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::SubscribeState { reply: reply_tx })
            .await
            .map_err(|_| LobbyError::ClientStopped)?;
        reply_rx.await.map_err(|_| LobbyError::ClientStopped)
    }

    /// Subscribes to push messages that no pending request consumed. The
    /// stream ends when the current session ends.
    pub async fn subscribe_messages(
        &self,
    ) -> Result<mpsc::UnboundedReceiver<ServerCommand>, LobbyError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::SubscribeMessages { reply: reply_tx })
            .await
            .map_err(|_| LobbyError::ClientStopped)?;
        reply_rx.await.map_err(|_| LobbyError::ClientStopped)
    }

    /// Current connection state.
    pub async fn state(&self) -> Result<ConnectionState, LobbyError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::CurrentState { reply: reply_tx })
            .await
            .map_err(|_| LobbyError::ClientStopped)?;
        reply_rx.await.map_err(|_| LobbyError::ClientStopped)
    }

    async fn launch_request(
        &self,
        kind: RequestKind,
        command: ClientCommand,
    ) -> Result<GameLaunch, LobbyError> {
        let response = self
            .request(|reply| Command::Submit { kind, command, reply })
            .await?;
        match response {
            ServerCommand::GameLaunch(launch) => Ok(launch),
            other => Err(unexpected_response(kind, &other)),
        }
    }

    async fn request(
        &self,
        build: impl FnOnce(ReplySender) -> Command,
    ) -> Result<ServerCommand, LobbyError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.cmd_tx
            .send(build(reply_tx))
            .await
            .map_err(|_| LobbyError::ClientStopped)?;
        reply_rx.await.map_err(|_| LobbyError::ClientStopped)?
    }

    async fn send(&self, command: ClientCommand) -> Result<(), LobbyError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::Send {
                command,
                reply: reply_tx,
            })
            .await
            .map_err(|_| LobbyError::ClientStopped)?;
        reply_rx.await.map_err(|_| LobbyError::ClientStopped)?
    }
}

fn unexpected_response(kind: RequestKind, response: &ServerCommand) -> LobbyError {
    LobbyError::Protocol(ProtocolError::Format {
        command: response.command_name().to_string(),
        reason: format!("unexpected response to a {kind} request"),
    })
}

// ---------------------------------------------------------------------------
// Commands and events
// ---------------------------------------------------------------------------

/// Commands sent from handles to the session task.
pub(crate) enum Command {
    Connect {
        username: String,
        password: String,
        reply: ReplySender,
    },
    Reconnect {
        reply: ReplySender,
    },
    Disconnect {
        reply: oneshot::Sender<()>,
    },
    /// A correlated request: registered in the pending table, answered by
    /// a matching server message.
    Submit {
        kind: RequestKind,
        command: ClientCommand,
        reply: ReplySender,
    },
    /// A fire-and-forget command; acknowledged once written to the socket.
    Send {
        command: ClientCommand,
        reply: oneshot::Sender<Result<(), LobbyError>>,
    },
    SubscribeState {
        reply: oneshot::Sender<mpsc::UnboundedReceiver<ConnectionState>>,
    },
    SubscribeMessages {
        reply: oneshot::Sender<mpsc::UnboundedReceiver<ServerCommand>>,
    },
    CurrentState {
        reply: oneshot::Sender<ConnectionState>,
    },
}

/// Events reported to the session task by its dial and read helpers.
enum Event<C> {
    Dialed {
        epoch: u64,
        result: Result<C, TransportError>,
    },
    Frame {
        epoch: u64,
        data: Vec<u8>,
    },
    Closed {
        epoch: u64,
        error: Option<TransportError>,
    },
}

#[derive(Clone)]
struct Credentials {
    username: String,
    password: String,
}

// ---------------------------------------------------------------------------
// Session task
// ---------------------------------------------------------------------------

struct ClientActor<T: Connector, C: Codec> {
    config: LobbyConfig,
    connector: Arc<T>,
    codec: C,
    state: ConnectionState,
    /// Bumped whenever the connection changes; events from older epochs
    /// are ignored.
    epoch: u64,
    conn: Option<Arc<T::Conn>>,
    credentials: Option<Credentials>,
    pending: PendingTable,
    state_subs: Vec<mpsc::UnboundedSender<ConnectionState>>,
    message_subs: Vec<mpsc::UnboundedSender<ServerCommand>>,
    cmd_rx: mpsc::Receiver<Command>,
    event_tx: mpsc::UnboundedSender<Event<T::Conn>>,
    event_rx: mpsc::UnboundedReceiver<Event<T::Conn>>,
}

impl<T: Connector, C: Codec> ClientActor<T, C> {
    async fn run(mut self) {
        tracing::info!("lobby client task started");

        loop {
            let deadline = self
                .pending
                .earliest_deadline()
                .map(tokio::time::Instant::from_std)
                .unwrap_or_else(|| tokio::time::Instant::now() + IDLE_TICK);

            tokio::select! {
                maybe_cmd = self.cmd_rx.recv() => match maybe_cmd {
                    Some(command) => self.handle_command(command).await,
                    // All handles dropped: shut down.
                    None => break,
                },
                maybe_event = self.event_rx.recv() => {
                    if let Some(event) = maybe_event {
                        self.handle_event(event).await;
                    }
                }
                _ = tokio::time::sleep_until(deadline) => self.expire_requests().await,
            }
        }

        self.teardown_connection().await;
        tracing::info!("lobby client task stopped");
    }

    async fn handle_command(&mut self, command: Command) {
        match command {
            Command::Connect {
                username,
                password,
                reply,
            } => {
                self.start_connect(Credentials { username, password }, reply)
                    .await;
            }
            Command::Reconnect { reply } => match self.credentials.clone() {
                Some(credentials) => self.start_connect(credentials, reply).await,
                None => {
                    let _ = reply.send(Err(LobbyError::NoCredentials));
                }
            },
            Command::Disconnect { reply } => {
                if self.state != ConnectionState::Disconnected {
                    tracing::info!("disconnecting from the lobby server");
                    self.teardown_connection().await;
                }
                let _ = reply.send(());
            }
            Command::Submit {
                kind,
                command,
                reply,
            } => {
                self.submit_request(kind, command, reply).await;
            }
            Command::Send { command, reply } => {
                let result = if self.state.is_connected() {
                    self.send_command(&command).await
                } else {
                    Err(LobbyError::NotConnected)
                };
                let _ = reply.send(result);
            }
            Command::SubscribeState { reply } => {
                let (tx, rx) = mpsc::unbounded_channel();
                self.state_subs.push(tx);
                let _ = reply.send(rx);
            }
            Command::SubscribeMessages { reply } => {
                let (tx, rx) = mpsc::unbounded_channel();
                self.message_subs.push(tx);
                let _ = reply.send(rx);
            }
            Command::CurrentState { reply } => {
                let _ = reply.send(self.state);
            }
        }
    }

    async fn handle_event(&mut self, event: Event<T::Conn>) {
        match event {
            Event::Dialed { epoch, result } => {
                if epoch != self.epoch {
                    // Stale dial result; dropping it closes its socket.
                    return;
                }
                match result {
                    Ok(conn) => self.on_dialed(conn).await,
                    Err(e) => {
                        tracing::warn!(error = %e, "could not reach the lobby server");
                        self.set_state(ConnectionState::Disconnected);
                        self.fail_login(LobbyError::Transport(e));
                    }
                }
            }
            Event::Frame { epoch, data } => {
                if epoch == self.epoch {
                    self.on_frame(&data).await;
                }
            }
            Event::Closed { epoch, error } => {
                if epoch != self.epoch {
                    return;
                }
                match error {
                    Some(e) => tracing::warn!(error = %e, "lobby connection lost"),
                    None => tracing::info!("lobby server closed the connection"),
                }
                self.teardown_connection().await;
            }
        }
    }

    async fn start_connect(&mut self, credentials: Credentials, reply: ReplySender) {
        match self.state {
            ConnectionState::Connected => {
                let _ = reply.send(Err(LobbyError::AlreadyConnected));
                return;
            }
            ConnectionState::Connecting => {
                let _ = reply.send(Err(LobbyError::AlreadyInProgress(RequestKind::Login)));
                return;
            }
            ConnectionState::Disconnected => {}
        }

        // The login is pending from the moment dialing starts; its
        // deadline covers dial plus handshake.
        let deadline = Instant::now() + self.config.request_timeout;
        if let Err(reply) = self.pending.insert(RequestKind::Login, deadline, reply) {
            let _ = reply.send(Err(LobbyError::AlreadyInProgress(RequestKind::Login)));
            return;
        }
        self.credentials = Some(credentials);
        self.set_state(ConnectionState::Connecting);
        self.epoch += 1;

        let connector = Arc::clone(&self.connector);
        let addr = self.config.server_addr.clone();
        let attempts = self.config.connect_attempts;
        let backoff = self.config.reconnect_backoff;
        let events = self.event_tx.clone();
        let epoch = self.epoch;
        tracing::info!(addr = %addr, "connecting to the lobby server");
        tokio::spawn(async move {
            let result = dial(connector, addr, attempts, backoff).await;
            let _ = events.send(Event::Dialed { epoch, result });
        });
    }

    async fn on_dialed(&mut self, conn: T::Conn) {
        let conn = Arc::new(conn);
        tracing::debug!(conn_id = %conn.id(), "connected, logging in");
        self.conn = Some(Arc::clone(&conn));
        tokio::spawn(read_loop(conn, self.epoch, self.event_tx.clone()));

        let Some(credentials) = self.credentials.clone() else {
            return;
        };
        let login = ClientCommand::Login {
            username: credentials.username,
            password: credentials.password,
        };
        // A send failure tears the connection down and fails the pending
        // login with the sweep.
        let _ = self.send_command(&login).await;
    }

    async fn submit_request(
        &mut self,
        kind: RequestKind,
        command: ClientCommand,
        reply: ReplySender,
    ) {
        if !self.state.is_connected() {
            let _ = reply.send(Err(LobbyError::NotConnected));
            return;
        }
        let deadline = Instant::now() + self.config.request_timeout;
        if let Err(reply) = self.pending.insert(kind, deadline, reply) {
            let _ = reply.send(Err(LobbyError::AlreadyInProgress(kind)));
            return;
        }
        tracing::debug!(%kind, "request submitted");
        let _ = self.send_command(&command).await;
    }

    async fn on_frame(&mut self, data: &[u8]) {
        let record: WireRecord = match self.codec.decode(data) {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!(error = %e, "undecodable frame, skipping");
                return;
            }
        };
        let message = match ServerCommand::decode(record) {
            Ok(message) => message,
            Err(e) => {
                tracing::warn!(error = %e, "malformed record, skipping");
                return;
            }
        };
        self.dispatch_message(message).await;
    }

    async fn dispatch_message(&mut self, message: ServerCommand) {
        match self.pending.resolve_matching(&message) {
            Some(pending) => match message {
                ServerCommand::AuthenticationFailed { reason } => {
                    tracing::warn!(%reason, "authentication failed");
                    let _ = pending
                        .reply
                        .send(Err(LobbyError::AuthenticationFailed { reason }));
                    self.teardown_connection().await;
                }
                ServerCommand::Welcome(welcome) => {
                    tracing::info!(
                        player_uid = %welcome.player_uid,
                        username = %welcome.username,
                        "logged in"
                    );
                    self.set_state(ConnectionState::Connected);
                    let _ = pending.reply.send(Ok(ServerCommand::Welcome(welcome)));
                }
                response => {
                    tracing::debug!(
                        kind = %pending.kind,
                        command = response.command_name(),
                        "request resolved"
                    );
                    let _ = pending.reply.send(Ok(response));
                }
            },
            None => {
                if let ServerCommand::Unrecognized { command, .. } = &message {
                    tracing::debug!(%command, "unrecognized server command");
                }
                self.message_subs
                    .retain(|sub| sub.send(message.clone()).is_ok());
            }
        }
    }

    /// Encodes and sends one command over the current connection.
    async fn send_command(&mut self, command: &ClientCommand) -> Result<(), LobbyError> {
        let Some(conn) = self.conn.clone() else {
            return Err(LobbyError::NotConnected);
        };
        let record = command.encode();
        let bytes = match self.codec.encode(&record) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::error!(command = command.command_name(), error = %e, "encode failed");
                return Err(LobbyError::Protocol(e));
            }
        };
        if let Err(e) = conn.send(&bytes).await {
            tracing::warn!(error = %e, "send failed");
            self.teardown_connection().await;
            return Err(LobbyError::ConnectionLost);
        }
        Ok(())
    }

    /// Drops the connection, fails every outstanding request in submission
    /// order, and ends session-scoped message subscriptions. State
    /// subscribers observe the transition before the failures land.
    async fn teardown_connection(&mut self) {
        self.epoch += 1;
        if let Some(conn) = self.conn.take() {
            let _ = conn.close().await;
        }
        self.set_state(ConnectionState::Disconnected);
        for pending in self.pending.drain_in_order() {
            let _ = pending.reply.send(Err(LobbyError::ConnectionLost));
        }
        self.message_subs.clear();
    }

    async fn expire_requests(&mut self) {
        let mut login_expired = false;
        for pending in self.pending.expire(Instant::now()) {
            tracing::warn!(kind = %pending.kind, "request timed out");
            if pending.kind == RequestKind::Login {
                login_expired = true;
            }
            let _ = pending.reply.send(Err(LobbyError::Timeout(pending.kind)));
        }
        // A login that timed out leaves no usable session behind.
        if login_expired && self.state != ConnectionState::Connected {
            self.teardown_connection().await;
        }
    }

    fn fail_login(&mut self, error: LobbyError) {
        if let Some(pending) = self.pending.remove(RequestKind::Login) {
            let _ = pending.reply.send(Err(error));
        }
    }

    fn set_state(&mut self, next: ConnectionState) {
        if self.state == next {
            return;
        }
        tracing::info!(from = %self.state, to = %next, "connection state changed");
        self.state = next;
        self.state_subs.retain(|sub| sub.send(next).is_ok());
    }
}

// ---------------------------------------------------------------------------
// Helper tasks
// ---------------------------------------------------------------------------

/// Dials with linear backoff plus jitter between attempts.
async fn dial<T: Connector>(
    connector: Arc<T>,
    addr: String,
    attempts: u32,
    backoff: Duration,
) -> Result<T::Conn, TransportError> {
    let attempts = attempts.max(1);
    let mut attempt = 1u32;
    loop {
        match connector.connect(&addr).await {
            Ok(conn) => return Ok(conn),
            Err(e) => {
                if attempt >= attempts {
                    return Err(e);
                }
                let jitter = Duration::from_millis(rand::rng().random_range(0..100u64));
                let delay = backoff * attempt + jitter;
                tracing::debug!(
                    attempt,
                    error = %e,
                    delay_ms = delay.as_millis() as u64,
                    "dial failed, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

/// Forwards inbound frames to the session task until the connection ends.
async fn read_loop<C: Connection>(
    conn: Arc<C>,
    epoch: u64,
    events: mpsc::UnboundedSender<Event<C>>,
) {
    loop {
        match conn.recv().await {
            Ok(Some(data)) => {
                if events.send(Event::Frame { epoch, data }).is_err() {
                    return;
                }
            }
            Ok(None) => {
                let _ = events.send(Event::Closed { epoch, error: None });
                return;
            }
            Err(e) => {
                let _ = events.send(Event::Closed {
                    epoch,
                    error: Some(e),
                });
                return;
            }
        }
    }
}
