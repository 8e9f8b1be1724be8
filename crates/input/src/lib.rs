//! Terminal input module (engine-facing).
//!
//! Maps `crossterm` key and mouse events into [`InputAction`]s and resolves them
//! against a grid cursor into [`crate::types::GameCommand`]s. Nothing here knows
//! how the board is drawn; mouse hits are translated by the term crate.

pub mod handler;
pub mod map;

pub use tui_pairs_types as types;

pub use handler::CursorHandler;
pub use map::{handle_key_event, left_click, should_quit, Direction, InputAction};
