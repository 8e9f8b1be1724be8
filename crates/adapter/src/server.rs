//! TCP server for the agent adapter
//!
//! Handles incoming connections and manages client lifecycle.
//! Uses tokio for async networking.

use std::hash::{Hash, Hasher};
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, oneshot, watch, RwLock};
use tracing::{debug, info, warn};

use crate::core::GameSnapshot;
use crate::error::CommandError;
use crate::protocol::*;
use crate::runtime::{AdapterStatus, InboundCommand, InboundPayload, OutboundMessage};
use crate::types::{CardId, GameCommand};

/// Stable 64-bit FNV-1a hasher for deterministic `state_hash`.
///
/// `DefaultHasher` output is not guaranteed stable across Rust versions.
#[derive(Debug, Clone)]
struct Fnv1aHasher {
    state: u64,
}

impl Fnv1aHasher {
    const OFFSET_BASIS: u64 = 0xcbf29ce484222325;
    const PRIME: u64 = 0x100000001b3;

    fn new() -> Self {
        Self {
            state: Self::OFFSET_BASIS,
        }
    }
}

impl Hasher for Fnv1aHasher {
    fn finish(&self) -> u64 {
        self.state
    }

    fn write(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.state ^= b as u64;
            self.state = self.state.wrapping_mul(Self::PRIME);
        }
    }
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub protocol_version: String,
    pub max_pending_commands: usize,
    pub log_path: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 7878,
            protocol_version: PROTOCOL_VERSION.to_string(),
            max_pending_commands: 16,
            log_path: None,
        }
    }
}

impl ServerConfig {
    /// Read `PAIRS_AI_*` environment variables over the defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`ServerConfig::from_env`], reading variables through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let text = |name: &str| {
            lookup(name)
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        };
        let defaults = Self::default();

        Self {
            host: text("PAIRS_AI_HOST").unwrap_or(defaults.host),
            port: text("PAIRS_AI_PORT")
                .and_then(|raw| parse_value("PAIRS_AI_PORT", &raw))
                .unwrap_or(defaults.port),
            max_pending_commands: text("PAIRS_AI_MAX_PENDING")
                .and_then(|raw| parse_value("PAIRS_AI_MAX_PENDING", &raw))
                .unwrap_or(defaults.max_pending_commands),
            log_path: text("PAIRS_AI_LOG_PATH"),
            ..defaults
        }
    }

    /// Check if the adapter is disabled via environment
    pub fn is_disabled() -> bool {
        disabled_value(std::env::var("PAIRS_AI_DISABLED").ok().as_deref())
    }
}

fn disabled_value(raw: Option<&str>) -> bool {
    raw.map(str::trim)
        .is_some_and(|v| v == "1" || v.eq_ignore_ascii_case("true"))
}

fn parse_value<T: std::str::FromStr>(name: &str, raw: &str) -> Option<T> {
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!(var = name, value = raw, "ignoring malformed value");
            None
        }
    }
}

/// Handle to a connected client
struct ClientHandle {
    id: usize,
    handshaken: bool,
    stream_observations: bool,
    last_seq: Option<u64>,
    tx: mpsc::UnboundedSender<ClientOutbound>,
}

/// Shared server state
struct ServerState {
    config: ServerConfig,
    clients: RwLock<Vec<ClientHandle>>,
    /// Lock order: `controller` before `clients`.
    controller: RwLock<Option<usize>>,
    status_tx: Option<watch::Sender<AdapterStatus>>,
}

impl ServerState {
    async fn is_handshaken(&self, client_id: usize) -> bool {
        self.clients
            .read()
            .await
            .iter()
            .any(|c| c.id == client_id && c.handshaken)
    }

    /// Record `seq` if it is strictly greater than the client's last one.
    async fn check_and_update_seq(&self, client_id: usize, seq: u64) -> bool {
        let mut clients = self.clients.write().await;
        let Some(client) = clients.iter_mut().find(|c| c.id == client_id) else {
            return true;
        };
        match client.last_seq {
            Some(prev) if seq <= prev => false,
            _ => {
                client.last_seq = Some(seq);
                true
            }
        }
    }

    async fn publish_status(&self) {
        let Some(tx) = self.status_tx.as_ref() else {
            return;
        };
        let controller = *self.controller.read().await;
        let clients = self.clients.read().await;
        let status = AdapterStatus {
            client_count: clients.len() as u16,
            controller_id: controller,
            streaming_count: clients
                .iter()
                .filter(|c| c.handshaken && c.stream_observations)
                .count() as u16,
        };
        tx.send_replace(status);
    }

    async fn send_to(&self, client_id: usize, msg: ClientOutbound) {
        let clients = self.clients.read().await;
        if let Some(c) = clients.iter().find(|c| c.id == client_id) {
            let _ = c.tx.send(msg);
        }
    }

    async fn broadcast(&self, msg: ClientOutbound) {
        let clients = self.clients.read().await;
        for c in clients.iter().filter(|c| c.handshaken && c.stream_observations) {
            let _ = c.tx.send(msg.clone());
        }
    }
}

#[derive(Debug, Clone)]
enum ClientOutbound {
    Ack(AckMessage),
    Error(ErrorMessage),
    Welcome(WelcomeMessage),
    Observation(ObservationMessage),
}

impl ClientOutbound {
    fn encode_into(&self, buf: &mut Vec<u8>) -> serde_json::Result<()> {
        match self {
            ClientOutbound::Ack(v) => serde_json::to_writer(&mut *buf, v),
            ClientOutbound::Error(v) => serde_json::to_writer(&mut *buf, v),
            ClientOutbound::Welcome(v) => serde_json::to_writer(&mut *buf, v),
            ClientOutbound::Observation(v) => serde_json::to_writer(&mut *buf, v),
        }
    }
}

/// Append every wire line to `path`, one per line.
fn spawn_wire_log(path: String) -> mpsc::UnboundedSender<Vec<u8>> {
    let (tx, mut rx) = mpsc::unbounded_channel::<Vec<u8>>();
    tokio::spawn(async move {
        use tokio::fs::OpenOptions;

        let mut file = match OpenOptions::new().create(true).append(true).open(&path).await {
            Ok(f) => f,
            Err(e) => {
                warn!(%path, error = %e, "cannot open adapter wire log");
                return;
            }
        };
        while let Some(mut line) = rx.recv().await {
            line.push(b'\n');
            if file.write_all(&line).await.is_err() {
                break;
            }
        }
        let _ = file.flush().await;
    });
    tx
}

/// Start the TCP server.
///
/// `ready_tx` receives the bound address (useful with port 0). `status_tx`, when
/// given, is updated whenever clients connect, disconnect, or change role.
pub async fn run_server(
    config: ServerConfig,
    command_tx: mpsc::Sender<InboundCommand>,
    mut out_rx: mpsc::UnboundedReceiver<OutboundMessage>,
    ready_tx: Option<oneshot::Sender<SocketAddr>>,
    status_tx: Option<watch::Sender<AdapterStatus>>,
) -> anyhow::Result<()> {
    let wire_log_tx = config.log_path.clone().map(spawn_wire_log);

    let listener = TcpListener::bind((config.host.as_str(), config.port)).await?;
    let bound = listener.local_addr()?;
    info!(addr = %bound, "adapter listening");
    if let Some(tx) = ready_tx {
        let _ = tx.send(bound);
    }

    let state = Arc::new(ServerState {
        config,
        clients: RwLock::new(Vec::new()),
        controller: RwLock::new(None),
        status_tx,
    });

    // Outbound dispatcher.
    {
        let state = Arc::clone(&state);
        tokio::spawn(async move {
            while let Some(msg) = out_rx.recv().await {
                match msg {
                    OutboundMessage::ToClientAck { client_id, ack } => {
                        state.send_to(client_id, ClientOutbound::Ack(ack)).await
                    }
                    OutboundMessage::ToClientObservation { client_id, obs } => {
                        state.send_to(client_id, ClientOutbound::Observation(obs)).await
                    }
                    OutboundMessage::BroadcastObservation { obs } => {
                        state.broadcast(ClientOutbound::Observation(obs)).await
                    }
                }
            }
        });
    }

    let mut client_id_counter = 0usize;
    loop {
        let (socket, addr) = listener.accept().await?;
        client_id_counter += 1;
        let client_id = client_id_counter;
        info!(client_id, %addr, "client connected");

        let state = Arc::clone(&state);
        let command_tx = command_tx.clone();
        let wire_log_tx = wire_log_tx.clone();
        tokio::spawn(async move {
            if let Err(e) = handle_client(socket, client_id, &state, command_tx, wire_log_tx).await {
                warn!(client_id, error = %e, "client error");
            }
            info!(client_id, "client disconnected");
        });
    }
}

/// Handle a single client connection
async fn handle_client(
    socket: TcpStream,
    client_id: usize,
    state: &Arc<ServerState>,
    command_tx: mpsc::Sender<InboundCommand>,
    wire_log_tx: Option<mpsc::UnboundedSender<Vec<u8>>>,
) -> anyhow::Result<()> {
    let (reader, mut writer) = tokio::io::split(socket);
    let mut reader = BufReader::new(reader);

    let (tx, mut rx) = mpsc::unbounded_channel::<ClientOutbound>();
    state.clients.write().await.push(ClientHandle {
        id: client_id,
        handshaken: false,
        stream_observations: false,
        last_seq: None,
        tx: tx.clone(),
    });
    state.publish_status().await;

    let wire_log_out = wire_log_tx.clone();
    let write_task = tokio::spawn(async move {
        let mut buf: Vec<u8> = Vec::with_capacity(4096);
        while let Some(msg) = rx.recv().await {
            buf.clear();
            if msg.encode_into(&mut buf).is_err() {
                continue;
            }
            if let Some(log) = wire_log_out.as_ref() {
                let _ = log.send(buf.clone());
            }
            buf.push(b'\n');
            if writer.write_all(&buf).await.is_err() || writer.flush().await.is_err() {
                break;
            }
        }
    });

    let reject = |seq: u64, code: ErrorCode, message: &str| {
        debug!(client_id, seq, ?code, reason = message, "rejecting message");
        let _ = tx.send(ClientOutbound::Error(create_error(seq, code, message)));
    };

    let mut line = String::new();
    loop {
        line.clear();
        if reader.read_line(&mut line).await? == 0 {
            break;
        }

        let raw_line = line.trim_end_matches(['\n', '\r']);
        let trimmed = raw_line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if let Some(log) = wire_log_tx.as_ref() {
            let _ = log.send(raw_line.as_bytes().to_vec());
        }

        match parse_message(trimmed) {
            Ok(ParsedMessage::Hello(hello)) => {
                if state.is_handshaken(client_id).await
                    && !state.check_and_update_seq(client_id, hello.seq).await
                {
                    reject(hello.seq, ErrorCode::InvalidCommand, "seq must be strictly increasing");
                    continue;
                }

                if !is_compatible_version(&hello.protocol_version) {
                    reject(
                        hello.seq,
                        ErrorCode::ProtocolMismatch,
                        &format!("Protocol version {} not supported", hello.protocol_version),
                    );
                    break;
                }

                // First client to hello becomes controller.
                let (role, controller_id) = {
                    let mut controller = state.controller.write().await;
                    let role = match *controller {
                        None => {
                            *controller = Some(client_id);
                            info!(client_id, "client is now controller");
                            AssignedRole::Controller
                        }
                        Some(id) if id == client_id => AssignedRole::Controller,
                        Some(_) => AssignedRole::Observer,
                    };
                    let mut clients = state.clients.write().await;
                    if let Some(client) = clients.iter_mut().find(|c| c.id == client_id) {
                        client.handshaken = true;
                        client.last_seq = Some(hello.seq);
                        client.stream_observations = hello.requested.stream_observations;
                    }
                    (role, controller.map(|id| id as u64))
                };
                debug!(client_id, client = %hello.client.name, ?role, "handshake complete");

                let welcome = create_welcome(
                    hello.seq,
                    &state.config.protocol_version,
                    client_id as u64,
                    role,
                    controller_id,
                );
                let _ = tx.send(ClientOutbound::Welcome(welcome));

                if hello.requested.stream_observations
                    && command_tx
                        .try_send(InboundCommand {
                            client_id,
                            seq: hello.seq,
                            payload: InboundPayload::SnapshotRequest,
                        })
                        .is_err()
                {
                    warn!(client_id, "command queue full; initial observation not scheduled");
                    reject(hello.seq, ErrorCode::Backpressure, "Command queue is full");
                }
                state.publish_status().await;
            }

            Ok(ParsedMessage::Command(cmd)) => {
                if !state.is_handshaken(client_id).await {
                    reject(cmd.seq, ErrorCode::HandshakeRequired, "Send hello before command");
                    continue;
                }
                if !state.check_and_update_seq(client_id, cmd.seq).await {
                    reject(cmd.seq, ErrorCode::InvalidCommand, "seq must be strictly increasing");
                    continue;
                }
                if *state.controller.read().await != Some(client_id) {
                    reject(cmd.seq, ErrorCode::NotController, "Only controller may send commands");
                    continue;
                }

                let command = match map_command(&cmd) {
                    Ok(c) => c,
                    Err(e) => {
                        reject(cmd.seq, e.code(), &e.to_string());
                        continue;
                    }
                };

                // The game loop acks once the command is applied.
                if command_tx
                    .try_send(InboundCommand {
                        client_id,
                        seq: cmd.seq,
                        payload: InboundPayload::Command(command),
                    })
                    .is_err()
                {
                    reject(cmd.seq, ErrorCode::Backpressure, "Command queue is full");
                }
            }

            Ok(ParsedMessage::Control(ctrl)) => {
                if !state.is_handshaken(client_id).await {
                    reject(ctrl.seq, ErrorCode::HandshakeRequired, "Send hello before control");
                    continue;
                }
                if !state.check_and_update_seq(client_id, ctrl.seq).await {
                    reject(ctrl.seq, ErrorCode::InvalidCommand, "seq must be strictly increasing");
                    continue;
                }

                let result = {
                    let mut controller = state.controller.write().await;
                    match (ctrl.action, *controller) {
                        (ControlAction::Claim, None) => {
                            *controller = Some(client_id);
                            Ok(())
                        }
                        (ControlAction::Claim, Some(id)) if id == client_id => Ok(()),
                        (ControlAction::Claim, Some(_)) => {
                            Err((ErrorCode::ControllerActive, "Controller already assigned"))
                        }
                        (ControlAction::Release, Some(id)) if id == client_id => {
                            *controller = None;
                            Ok(())
                        }
                        (ControlAction::Release, _) => {
                            Err((ErrorCode::NotController, "Only controller may release"))
                        }
                    }
                };
                match result {
                    Ok(()) => {
                        info!(client_id, action = ?ctrl.action, "controller changed");
                        let _ = tx.send(ClientOutbound::Ack(create_ack(ctrl.seq)));
                        state.publish_status().await;
                    }
                    Err((code, message)) => reject(ctrl.seq, code, message),
                }
            }

            Ok(ParsedMessage::Unknown(unknown)) => {
                if state.is_handshaken(client_id).await
                    && !state.check_and_update_seq(client_id, unknown.seq).await
                {
                    reject(unknown.seq, ErrorCode::InvalidCommand, "seq must be strictly increasing");
                    continue;
                }
                reject(
                    unknown.seq,
                    ErrorCode::InvalidCommand,
                    &format!("Unknown message type: {}", unknown.msg_type),
                );
            }

            Err(e) => {
                let seq = extract_seq_best_effort(trimmed).unwrap_or(0);
                reject(seq, ErrorCode::InvalidCommand, &format!("JSON parse error: {}", e));
            }
        }
    }

    // Remove the client and promote the next controller if needed.
    {
        let mut controller = state.controller.write().await;
        let mut clients = state.clients.write().await;
        clients.retain(|c| c.id != client_id);

        if *controller == Some(client_id) {
            *controller = clients.iter().filter(|c| c.handshaken).map(|c| c.id).min();
            match *controller {
                Some(new_id) => info!(new_id, "controller promoted"),
                None => info!(client_id, "controller released"),
            }
        }
    }
    state.publish_status().await;

    drop(tx);
    let _ = write_task.await;
    Ok(())
}

/// Map a protocol command into a game command.
pub fn map_command(cmd: &CommandMessage) -> Result<GameCommand, CommandError> {
    match (cmd.action, cmd.card) {
        (CommandAction::Select, None) => Err(CommandError::MissingCard),
        (CommandAction::Select, Some(card)) => u8::try_from(card)
            .map(|id| GameCommand::Select(CardId(id)))
            .map_err(|_| CommandError::CardOutOfRange(card)),
        (CommandAction::Restart, None) => Ok(GameCommand::Restart),
        (CommandAction::Restart, Some(_)) => Err(CommandError::UnexpectedCard),
    }
}

/// Hash of everything an observation exposes, except `seq` and `ts`.
///
/// Hidden symbols are not hashed, so the hash cannot leak them.
pub fn state_hash(snap: &GameSnapshot) -> StateHash {
    let mut hasher = Fnv1aHasher::new();
    snap.episode_id.hash(&mut hasher);
    snap.seed.hash(&mut hasher);
    snap.phase.as_str().hash(&mut hasher);
    snap.matched_pairs.hash(&mut hasher);
    snap.total_pairs.hash(&mut hasher);
    snap.input_locked.hash(&mut hasher);
    snap.won.hash(&mut hasher);
    snap.selection.iter().for_each(|id| id.0.hash(&mut hasher));
    for card in &snap.cards {
        card.id.0.hash(&mut hasher);
        card.state.as_str().hash(&mut hasher);
        card.visible_symbol().map(|s| s.glyph()).hash(&mut hasher);
    }
    StateHash(hasher.finish())
}

/// Build an observation message from an engine snapshot
pub fn build_observation(seq: u64, snap: &GameSnapshot) -> ObservationMessage {
    let cards = snap
        .cards
        .iter()
        .map(|c| CardObservation {
            id: c.id.0,
            state: c.state.into(),
            symbol: c.visible_symbol().map(|s| s.glyph().to_string()),
        })
        .collect();

    ObservationMessage {
        msg_type: ObservationType::Observation,
        seq,
        ts: current_timestamp_ms(),
        episode_id: snap.episode_id,
        seed: snap.seed,
        phase: snap.phase.into(),
        playable: snap.playable(),
        matched_pairs: snap.matched_pairs,
        total_pairs: snap.total_pairs,
        input_locked: snap.input_locked,
        won: snap.won,
        selection: snap.selection.iter().map(|id| id.0).collect(),
        cards,
        state_hash: state_hash(snap),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{CardSnapshot, Phase};
    use crate::types::{CardState, Symbol};

    fn command(action: CommandAction, card: Option<u64>) -> CommandMessage {
        CommandMessage {
            msg_type: CommandType::Command,
            seq: 1,
            ts: 0,
            action,
            card,
        }
    }

    fn snapshot() -> GameSnapshot {
        let mut snap = GameSnapshot::default();
        for (i, g) in ['A', 'B', 'A', 'B'].into_iter().enumerate() {
            snap.cards.push(CardSnapshot {
                id: CardId(i as u8),
                symbol: Symbol::new(g),
                state: CardState::Hidden,
            });
        }
        snap.total_pairs = 2;
        snap.episode_id = 1;
        snap
    }

    #[test]
    fn test_config_lookup() {
        let config = ServerConfig::from_lookup(|name| match name {
            "PAIRS_AI_HOST" => Some(" 0.0.0.0 ".to_string()),
            "PAIRS_AI_PORT" => Some("99999".to_string()),
            "PAIRS_AI_MAX_PENDING" => Some(" 4 ".to_string()),
            "PAIRS_AI_LOG_PATH" => Some("  ".to_string()),
            _ => None,
        });
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 7878);
        assert_eq!(config.max_pending_commands, 4);
        assert_eq!(config.log_path, None);
        assert_eq!(config.protocol_version, PROTOCOL_VERSION);
    }

    #[test]
    fn test_parse_value() {
        assert_eq!(parse_value::<u16>("X", " 8080 "), Some(8080));
        assert_eq!(parse_value::<u16>("X", "http"), None);
        assert_eq!(parse_value::<usize>("X", ""), None);
    }

    #[test]
    fn test_disabled_value() {
        assert!(disabled_value(Some("1")));
        assert!(disabled_value(Some(" TRUE ")));
        assert!(!disabled_value(Some("0")));
        assert!(!disabled_value(Some("yes")));
        assert!(!disabled_value(None));
    }

    #[test]
    fn test_map_command() {
        assert_eq!(
            map_command(&command(CommandAction::Select, Some(3))),
            Ok(GameCommand::Select(CardId(3)))
        );
        assert_eq!(
            map_command(&command(CommandAction::Restart, None)),
            Ok(GameCommand::Restart)
        );
        assert_eq!(
            map_command(&command(CommandAction::Select, None)),
            Err(CommandError::MissingCard)
        );
        assert_eq!(
            map_command(&command(CommandAction::Select, Some(256))),
            Err(CommandError::CardOutOfRange(256))
        );
        assert_eq!(
            map_command(&command(CommandAction::Restart, Some(1))),
            Err(CommandError::UnexpectedCard)
        );
    }

    #[test]
    fn test_observation_hides_face_down_symbols() {
        let mut snap = snapshot();
        snap.cards[1].state = CardState::Revealed;
        snap.cards[2].state = CardState::Matched;

        let obs = build_observation(7, &snap);
        assert_eq!(obs.seq, 7);
        assert_eq!(obs.cards[0].symbol, None);
        assert_eq!(obs.cards[1].symbol.as_deref(), Some("B"));
        assert_eq!(obs.cards[2].symbol.as_deref(), Some("A"));
        assert_eq!(obs.cards[3].symbol, None);

        let v = serde_json::to_value(&obs).unwrap();
        assert!(v["cards"][0].get("symbol").is_none());
        assert_eq!(v["cards"][1]["state"], "revealed");
        assert_eq!(v["phase"], "idle");
    }

    #[test]
    fn test_state_hash_ignores_hidden_symbols() {
        let a = snapshot();
        let mut b = snapshot();
        b.cards[0].symbol = Symbol::new('B');
        b.cards[1].symbol = Symbol::new('A');
        assert_eq!(state_hash(&a), state_hash(&b));
    }

    #[test]
    fn test_state_hash_changes_with_visible_state() {
        let a = snapshot();
        let mut b = snapshot();
        b.cards[0].state = CardState::Revealed;
        b.selection.push(CardId(0));
        b.phase = Phase::OneRevealed;
        assert_ne!(state_hash(&a), state_hash(&b));

        let mut c = snapshot();
        c.episode_id = 2;
        assert_ne!(state_hash(&a), state_hash(&c));
    }

    #[test]
    fn test_state_hash_is_stable() {
        assert_eq!(state_hash(&snapshot()), state_hash(&snapshot()));
    }
}
