//! Adapter runtime integration.
//!
//! Bridges the synchronous game loop with the async TCP server. The server runs
//! on its own tokio runtime; the loop only touches channels.

use anyhow::Context;
use tokio::runtime::Runtime;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error};

use crate::core::GameSnapshot;
use crate::engine::SelectOutcome;
use crate::protocol::{create_ack, create_ack_ignored, AckMessage, ObservationMessage, StateHash};
use crate::server::{build_observation, run_server, state_hash, ServerConfig};
use crate::types::GameCommand;

/// Message delivered to the game loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundCommand {
    pub client_id: usize,
    pub seq: u64,
    pub payload: InboundPayload,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InboundPayload {
    Command(GameCommand),
    /// A client finished its handshake and wants the current state.
    SnapshotRequest,
}

/// Outbound message to be delivered by the server.
#[derive(Debug, Clone)]
pub enum OutboundMessage {
    ToClientAck { client_id: usize, ack: AckMessage },
    ToClientObservation { client_id: usize, obs: ObservationMessage },
    BroadcastObservation { obs: ObservationMessage },
}

/// Connection summary for the status panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AdapterStatus {
    pub client_count: u16,
    pub controller_id: Option<usize>,
    pub streaming_count: u16,
}

/// Numbers observations and suppresses repeat broadcasts of an unchanged state.
///
/// Only broadcasts move the change baseline. A snapshot sent to one client
/// does not, so the other streaming clients still get the broadcast.
#[derive(Debug, Default)]
pub struct ObservationStream {
    seq: u64,
    last_broadcast: Option<StateHash>,
}

impl ObservationStream {
    pub fn new() -> Self {
        Self::default()
    }

    /// Always build an observation.
    pub fn observe(&mut self, snap: &GameSnapshot) -> ObservationMessage {
        self.seq += 1;
        build_observation(self.seq, snap)
    }

    /// Build an observation only if the state hash moved since the last broadcast.
    pub fn observe_changed(&mut self, snap: &GameSnapshot) -> Option<ObservationMessage> {
        let hash = state_hash(snap);
        if self.last_broadcast == Some(hash) {
            return None;
        }
        self.last_broadcast = Some(hash);
        Some(self.observe(snap))
    }
}

/// Ack for an applied command. Ignored selections carry their reason.
pub fn ack_for(seq: u64, outcome: Option<SelectOutcome>) -> AckMessage {
    match outcome {
        Some(SelectOutcome::Ignored(reason)) => create_ack_ignored(seq, reason),
        _ => create_ack(seq),
    }
}

/// Running adapter instance.
pub struct Adapter {
    _rt: Runtime,
    cmd_rx: mpsc::Receiver<InboundCommand>,
    out_tx: mpsc::UnboundedSender<OutboundMessage>,
    status_rx: watch::Receiver<AdapterStatus>,
    stream: ObservationStream,
}

impl Adapter {
    /// Start the adapter from environment variables.
    ///
    /// Returns `Ok(None)` if `PAIRS_AI_DISABLED` is set.
    pub fn start_from_env() -> anyhow::Result<Option<Self>> {
        if ServerConfig::is_disabled() {
            debug!("adapter disabled via PAIRS_AI_DISABLED");
            return Ok(None);
        }
        Self::start(ServerConfig::from_env()).map(Some)
    }

    pub fn start(config: ServerConfig) -> anyhow::Result<Self> {
        let max_pending = config.max_pending_commands.max(1);
        let (cmd_tx, cmd_rx) = mpsc::channel::<InboundCommand>(max_pending);
        let (out_tx, out_rx) = mpsc::unbounded_channel::<OutboundMessage>();
        let (status_tx, status_rx) = watch::channel(AdapterStatus::default());

        let rt = Runtime::new().context("failed to create adapter runtime")?;
        rt.spawn(async move {
            if let Err(e) = run_server(config, cmd_tx, out_rx, None, Some(status_tx)).await {
                error!(error = %e, "adapter server stopped");
            }
        });

        Ok(Self {
            _rt: rt,
            cmd_rx,
            out_tx,
            status_rx,
            stream: ObservationStream::new(),
        })
    }

    pub fn try_recv(&mut self) -> Option<InboundCommand> {
        self.cmd_rx.try_recv().ok()
    }

    pub fn send(&self, msg: OutboundMessage) {
        let _ = self.out_tx.send(msg);
    }

    pub fn status(&self) -> AdapterStatus {
        *self.status_rx.borrow()
    }

    /// Acknowledge a command the game loop just applied.
    pub fn ack(&self, cmd: &InboundCommand, outcome: Option<SelectOutcome>) {
        self.send(OutboundMessage::ToClientAck {
            client_id: cmd.client_id,
            ack: ack_for(cmd.seq, outcome),
        });
    }

    /// Send the current state to one client, whether or not it changed.
    pub fn send_snapshot(&mut self, client_id: usize, snap: &GameSnapshot) {
        let obs = self.stream.observe(snap);
        self.send(OutboundMessage::ToClientObservation { client_id, obs });
    }

    /// Broadcast an observation if the state changed. Returns whether one was sent.
    pub fn publish(&mut self, snap: &GameSnapshot) -> bool {
        match self.stream.observe_changed(snap) {
            Some(obs) => {
                self.send(OutboundMessage::BroadcastObservation { obs });
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::IgnoreReason;
    use crate::protocol::AckStatus;

    #[test]
    fn stream_suppresses_unchanged_states() {
        let mut stream = ObservationStream::new();
        let mut snap = GameSnapshot::default();

        let first = stream.observe_changed(&snap).expect("first observation");
        assert_eq!(first.seq, 1);
        assert!(stream.observe_changed(&snap).is_none());

        snap.episode_id = 2;
        let second = stream.observe_changed(&snap).expect("state changed");
        assert_eq!(second.seq, 2);
        assert_ne!(first.state_hash, second.state_hash);
    }

    #[test]
    fn forced_observation_still_advances_seq() {
        let mut stream = ObservationStream::new();
        let snap = GameSnapshot::default();
        assert_eq!(stream.observe(&snap).seq, 1);
        assert_eq!(stream.observe(&snap).seq, 2);
        assert_eq!(stream.observe_changed(&snap).map(|o| o.seq), Some(3));
        assert!(stream.observe_changed(&snap).is_none());
    }

    #[test]
    fn snapshot_for_one_client_does_not_swallow_broadcast() {
        let mut stream = ObservationStream::new();
        let mut snap = GameSnapshot::default();
        assert!(stream.observe_changed(&snap).is_some());

        // A new client's snapshot request is served in the same tick as a change.
        snap.episode_id = 7;
        let direct = stream.observe(&snap);
        let broadcast = stream
            .observe_changed(&snap)
            .expect("streaming clients still see the new state");
        assert_eq!(direct.state_hash, broadcast.state_hash);
        assert!(broadcast.seq > direct.seq);
        assert!(stream.observe_changed(&snap).is_none());
    }

    #[test]
    fn ack_reflects_outcome() {
        let ack = ack_for(3, Some(SelectOutcome::Ignored(IgnoreReason::AlreadyMatched)));
        assert_eq!(ack.status, AckStatus::Ignored);
        assert_eq!(ack.reason.as_deref(), Some("already_matched"));

        let ack = ack_for(4, Some(SelectOutcome::Revealed));
        assert_eq!(ack.status, AckStatus::Ok);
        assert_eq!(ack.seq, 4);

        // Restart has no outcome.
        assert_eq!(ack_for(5, None).status, AckStatus::Ok);
    }
}
