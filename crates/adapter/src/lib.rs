//! Adapter module - agent control via TCP socket with JSON protocol
//!
//! External agents play the game over a **line-delimited JSON protocol**:
//!
//! 1. **Connection**: client connects (default `127.0.0.1:7878`)
//! 2. **Handshake**: client sends `hello`, server answers `welcome`
//! 3. **Controller assignment**: the first client to hello controls the game;
//!    others observe. `control` claims or releases the role.
//! 4. **Commanding**: the controller sends `select` / `restart` commands; the
//!    game loop applies them and answers with an `ack` (`ok` or `ignored`)
//! 5. **Observations**: every state change is broadcast to streaming clients.
//!    Face-down cards never reveal their symbol.
//!
//! # Environment Variables
//!
//! - `PAIRS_AI_HOST`: bind address (default: "127.0.0.1")
//! - `PAIRS_AI_PORT`: port number (default: 7878)
//! - `PAIRS_AI_DISABLED`: "1" or "true" disables the adapter
//! - `PAIRS_AI_MAX_PENDING`: command queue bound (default: 16)
//! - `PAIRS_AI_LOG_PATH`: append every wire line to this file
//!
//! # Example Protocol Flow
//!
//! ```text
//! Client -> Server: {"type":"hello","seq":1,"ts":0,"client":{"name":"bot","version":"0.1"},"protocol_version":"1.0.0"}
//! Server -> Client: {"type":"welcome","seq":1,"ts":...,"protocol_version":"1.0.0","client_id":1,"role":"controller",...}
//! Server -> Client: {"type":"observation","seq":1,...,"cards":[{"id":0,"state":"hidden"},...],"state_hash":"..."}
//! Client -> Server: {"type":"command","seq":2,"ts":0,"action":"select","card":0}
//! Server -> Client: {"type":"ack","seq":2,"ts":...,"status":"ok"}
//! ```

pub mod error;
pub mod protocol;
pub mod runtime;
pub mod server;

pub use tui_pairs_core as core;
pub use tui_pairs_engine as engine;
pub use tui_pairs_types as types;

pub use error::CommandError;
pub use runtime::{
    ack_for, Adapter, AdapterStatus, InboundCommand, InboundPayload, ObservationStream,
    OutboundMessage,
};
pub use server::{build_observation, map_command, run_server, state_hash, ServerConfig};
