use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;

use tui_pairs::adapter::protocol::{create_hello, create_select};
use tui_pairs::adapter::{
    ack_for, run_server, Adapter, AdapterStatus, InboundCommand, InboundPayload,
    ObservationStream, OutboundMessage, ServerConfig,
};
use tui_pairs::core::Deck;
use tui_pairs::engine::{Engine, GameConfig, NullView};
use tui_pairs::types::{CardId, GameCommand, Symbol, SymbolSet};

const TIMEOUT: Duration = Duration::from_secs(2);

struct Server {
    addr: SocketAddr,
    cmd_rx: mpsc::Receiver<InboundCommand>,
    out_tx: mpsc::UnboundedSender<OutboundMessage>,
    status_rx: watch::Receiver<AdapterStatus>,
    handle: JoinHandle<()>,
}

async fn start_server(max_pending: usize) -> Server {
    let config = ServerConfig {
        port: 0,
        max_pending_commands: max_pending,
        ..ServerConfig::default()
    };

    let (cmd_tx, cmd_rx) = mpsc::channel::<InboundCommand>(max_pending);
    let (out_tx, out_rx) = mpsc::unbounded_channel::<OutboundMessage>();
    let (ready_tx, ready_rx) = oneshot::channel();
    let (status_tx, status_rx) = watch::channel(AdapterStatus::default());

    let handle = tokio::spawn(async move {
        let _ = run_server(config, cmd_tx, out_rx, Some(ready_tx), Some(status_tx)).await;
    });

    let addr = tokio::time::timeout(TIMEOUT, ready_rx)
        .await
        .expect("server did not signal ready")
        .expect("ready channel dropped");

    Server {
        addr,
        cmd_rx,
        out_tx,
        status_rx,
        handle,
    }
}

impl Server {
    async fn next_inbound(&mut self) -> InboundCommand {
        tokio::time::timeout(TIMEOUT, self.cmd_rx.recv())
            .await
            .expect("timed out waiting for inbound command")
            .expect("command channel closed")
    }

    async fn wait_status(&mut self, pred: impl Fn(&AdapterStatus) -> bool) -> AdapterStatus {
        tokio::time::timeout(TIMEOUT, async {
            loop {
                let current = *self.status_rx.borrow_and_update();
                if pred(&current) {
                    return current;
                }
                self.status_rx.changed().await.expect("status sender dropped");
            }
        })
        .await
        .expect("timed out waiting for status")
    }
}

struct Client {
    lines: Lines<BufReader<OwnedReadHalf>>,
    writer: OwnedWriteHalf,
}

impl Client {
    async fn connect(addr: SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).await.expect("connect failed");
        let (read_half, writer) = stream.into_split();
        Self {
            lines: BufReader::new(read_half).lines(),
            writer,
        }
    }

    async fn send(&mut self, line: &str) {
        self.writer.write_all(line.as_bytes()).await.unwrap();
        self.writer.write_all(b"\n").await.unwrap();
        self.writer.flush().await.unwrap();
    }

    async fn send_json<T: serde::Serialize>(&mut self, msg: &T) {
        let line = serde_json::to_string(msg).unwrap();
        self.send(&line).await;
    }

    async fn recv(&mut self) -> serde_json::Value {
        let line = tokio::time::timeout(TIMEOUT, self.lines.next_line())
            .await
            .expect("timed out waiting for line")
            .unwrap()
            .expect("connection closed");
        serde_json::from_str(&line).unwrap()
    }

    async fn hello(&mut self, seq: u64) -> serde_json::Value {
        self.send_json(&create_hello(seq, "e2e-test", "1.0.0")).await;
        let welcome = self.recv().await;
        assert_eq!(welcome["type"], "welcome");
        welcome
    }
}

fn reference_engine() -> Engine<NullView> {
    let set = SymbolSet::new(['A', 'B']).unwrap();
    let mut engine = Engine::new(GameConfig::seeded(9), set, NullView);
    let order = ['A', 'B', 'A', 'B'].map(Symbol::new);
    engine.initialize_with_deck(Deck::from_order(order).unwrap());
    engine
}

#[tokio::test]
async fn hello_command_ack_and_observation() {
    let mut server = start_server(8).await;
    let mut client = Client::connect(server.addr).await;

    let welcome = client.hello(1).await;
    assert_eq!(welcome["seq"], 1);
    assert_eq!(welcome["role"], "controller");
    assert_eq!(welcome["protocol_version"], "1.0.0");
    assert_eq!(welcome["game_id"], "tui-pairs");

    // A streaming client asks for the current state right after the handshake.
    let request = server.next_inbound().await;
    assert_eq!(request.payload, InboundPayload::SnapshotRequest);
    let client_id = request.client_id;

    client.send_json(&create_select(2, 0)).await;
    let inbound = server.next_inbound().await;
    assert_eq!(inbound.seq, 2);
    assert_eq!(inbound.client_id, client_id);
    assert_eq!(inbound.payload, InboundPayload::Command(GameCommand::Select(CardId(0))));

    let mut engine = reference_engine();
    let outcome = match inbound.payload {
        InboundPayload::Command(command) => engine.apply(command),
        InboundPayload::SnapshotRequest => unreachable!(),
    };
    server
        .out_tx
        .send(OutboundMessage::ToClientAck {
            client_id,
            ack: ack_for(inbound.seq, outcome),
        })
        .unwrap();

    let ack = client.recv().await;
    assert_eq!(ack["type"], "ack");
    assert_eq!(ack["seq"], 2);
    assert_eq!(ack["status"], "ok");

    let mut stream = ObservationStream::new();
    let obs = stream.observe(&engine.snapshot());
    server
        .out_tx
        .send(OutboundMessage::BroadcastObservation { obs })
        .unwrap();

    let obs = client.recv().await;
    assert_eq!(obs["type"], "observation");
    assert_eq!(obs["phase"], "one_revealed");
    assert_eq!(obs["cards"][0]["state"], "revealed");
    assert_eq!(obs["cards"][0]["symbol"], "A");
    assert_eq!(obs["cards"][1]["state"], "hidden");
    assert!(obs["cards"][1].get("symbol").is_none());
    assert_eq!(obs["selection"], serde_json::json!([0]));

    server.handle.abort();
}

#[tokio::test]
async fn ignored_selection_acks_with_reason() {
    let mut server = start_server(8).await;
    let mut client = Client::connect(server.addr).await;
    client.hello(1).await;
    let client_id = server.next_inbound().await.client_id;

    let mut engine = reference_engine();
    for (seq, card) in [(2u64, 0u8), (3, 0)] {
        client.send_json(&create_select(seq, card)).await;
        let inbound = server.next_inbound().await;
        let outcome = match inbound.payload {
            InboundPayload::Command(command) => engine.apply(command),
            InboundPayload::SnapshotRequest => unreachable!(),
        };
        server
            .out_tx
            .send(OutboundMessage::ToClientAck {
                client_id,
                ack: ack_for(inbound.seq, outcome),
            })
            .unwrap();
    }

    assert_eq!(client.recv().await["status"], "ok");
    let ack = client.recv().await;
    assert_eq!(ack["seq"], 3);
    assert_eq!(ack["status"], "ignored");
    assert_eq!(ack["reason"], "already_selected");

    server.handle.abort();
}

#[tokio::test]
async fn command_before_hello_requires_handshake() {
    let server = start_server(8).await;
    let mut client = Client::connect(server.addr).await;

    client.send_json(&create_select(1, 0)).await;
    let err = client.recv().await;
    assert_eq!(err["type"], "error");
    assert_eq!(err["code"], "handshake_required");
    assert_eq!(err["seq"], 1);

    server.handle.abort();
}

#[tokio::test]
async fn malformed_commands_are_rejected() {
    let mut server = start_server(8).await;
    let mut client = Client::connect(server.addr).await;
    client.hello(1).await;
    server.next_inbound().await;

    client
        .send(r#"{"type":"command","seq":2,"ts":0,"action":"select"}"#)
        .await;
    assert_eq!(client.recv().await["code"], "invalid_command");

    client
        .send(r#"{"type":"command","seq":3,"ts":0,"action":"select","card":300}"#)
        .await;
    assert_eq!(client.recv().await["code"], "invalid_command");

    // Replayed seq.
    client.send_json(&create_select(3, 0)).await;
    assert_eq!(client.recv().await["code"], "invalid_command");

    client.send("{not json").await;
    assert_eq!(client.recv().await["code"], "invalid_command");

    client.send(r#"{"type":"dance","seq":9}"#).await;
    let err = client.recv().await;
    assert_eq!(err["code"], "invalid_command");
    assert_eq!(err["seq"], 9);

    assert!(server.cmd_rx.try_recv().is_err());
    server.handle.abort();
}

#[tokio::test]
async fn protocol_mismatch_closes_connection() {
    let server = start_server(8).await;
    let mut client = Client::connect(server.addr).await;

    client.send_json(&create_hello(1, "old-bot", "2.0.0")).await;
    let err = client.recv().await;
    assert_eq!(err["code"], "protocol_mismatch");

    let closed = tokio::time::timeout(TIMEOUT, client.lines.next_line())
        .await
        .expect("timed out waiting for close")
        .unwrap();
    assert!(closed.is_none());

    server.handle.abort();
}

#[tokio::test]
async fn observer_cannot_command_or_claim() {
    let mut server = start_server(8).await;
    let mut controller = Client::connect(server.addr).await;
    controller.hello(1).await;
    let controller_id = server.next_inbound().await.client_id;

    let mut observer = Client::connect(server.addr).await;
    let welcome = observer.hello(1).await;
    assert_eq!(welcome["role"], "observer");
    assert_eq!(welcome["controller_id"], controller_id as u64);
    server.next_inbound().await;

    observer.send_json(&create_select(2, 0)).await;
    assert_eq!(observer.recv().await["code"], "not_controller");

    observer
        .send(r#"{"type":"control","seq":3,"ts":0,"action":"claim"}"#)
        .await;
    assert_eq!(observer.recv().await["code"], "controller_active");

    observer
        .send(r#"{"type":"control","seq":4,"ts":0,"action":"release"}"#)
        .await;
    assert_eq!(observer.recv().await["code"], "not_controller");

    // Once the controller releases, the observer may claim.
    controller
        .send(r#"{"type":"control","seq":2,"ts":0,"action":"release"}"#)
        .await;
    assert_eq!(controller.recv().await["type"], "ack");
    server.wait_status(|s| s.controller_id.is_none()).await;

    observer
        .send(r#"{"type":"control","seq":5,"ts":0,"action":"claim"}"#)
        .await;
    let ack = observer.recv().await;
    assert_eq!(ack["type"], "ack");
    assert_eq!(ack["seq"], 5);

    server.handle.abort();
}

#[tokio::test]
async fn full_queue_reports_backpressure() {
    let server = start_server(1).await;
    let mut client = Client::connect(server.addr).await;

    // The snapshot request from hello fills the only slot; nothing drains it.
    client.hello(1).await;

    client.send_json(&create_select(2, 0)).await;
    let err = client.recv().await;
    assert_eq!(err["code"], "backpressure");
    assert_eq!(err["seq"], 2);

    server.handle.abort();
}

#[tokio::test]
async fn full_queue_at_hello_reports_backpressure() {
    let mut server = start_server(1).await;

    let mut first = Client::connect(server.addr).await;
    first.hello(1).await;
    // Status is published after the snapshot request is queued.
    server.wait_status(|s| s.streaming_count == 1).await;

    // The first snapshot request is still queued; the second does not fit.
    let mut second = Client::connect(server.addr).await;
    let welcome = second.hello(1).await;
    assert_eq!(welcome["role"], "observer");
    let err = second.recv().await;
    assert_eq!(err["type"], "error");
    assert_eq!(err["code"], "backpressure");
    assert_eq!(err["seq"], 1);

    server.handle.abort();
}

#[tokio::test]
async fn controller_is_promoted_after_disconnect() {
    let mut server = start_server(8).await;

    let mut first = Client::connect(server.addr).await;
    first.hello(1).await;
    let first_id = server.next_inbound().await.client_id;

    let mut second = Client::connect(server.addr).await;
    second.hello(1).await;
    let second_id = server.next_inbound().await.client_id;

    let status = server.wait_status(|s| s.client_count == 2).await;
    assert_eq!(status.controller_id, Some(first_id));
    assert_eq!(status.streaming_count, 2);

    drop(first);
    let status = server.wait_status(|s| s.client_count == 1).await;
    assert_eq!(status.controller_id, Some(second_id));

    second.send_json(&create_select(2, 1)).await;
    let inbound = server.next_inbound().await;
    assert_eq!(inbound.client_id, second_id);
    assert_eq!(inbound.payload, InboundPayload::Command(GameCommand::Select(CardId(1))));

    server.handle.abort();
}

#[test]
fn disabled_adapter_does_not_start() {
    std::env::set_var("PAIRS_AI_DISABLED", "1");
    let adapter = Adapter::start_from_env().expect("start_from_env");
    std::env::remove_var("PAIRS_AI_DISABLED");
    assert!(adapter.is_none());
}
