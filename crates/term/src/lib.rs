//! Terminal "game renderer" module.
//!
//! A small, game-oriented rendering layer: the engine drives a [`TermBoard`]
//! through the `BoardView` trait, [`GameView`] turns that board into a
//! [`FrameBuffer`], and [`TerminalRenderer`] flushes frames as diffs.
//! No ratatui widgets; every cell is placed explicitly.

pub mod board;
pub mod fb;
pub mod game_view;
pub mod renderer;

pub use tui_pairs_core as core;
pub use tui_pairs_engine as engine;
pub use tui_pairs_types as types;

pub use board::{TermBoard, Tile};
pub use fb::{Cell, CellStyle, FrameBuffer, Rgb};
pub use game_view::{
    symbol_color, AdapterStatusView, BoardLayout, GameView, Viewport, TILE_H, TILE_W,
};
pub use renderer::{encode_diff_into, encode_full_into, TerminalRenderer};
