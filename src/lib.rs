//! TUI Pairs (workspace facade crate).
//!
//! Re-exports the workspace crates under one roof so the binary, integration
//! tests, and benches can use `tui_pairs::{core, engine, term, ...}`.

pub use tui_pairs_adapter as adapter;
pub use tui_pairs_core as core;
pub use tui_pairs_engine as engine;
pub use tui_pairs_input as input;
pub use tui_pairs_term as term;
pub use tui_pairs_types as types;
