//! Core types module - shared data structures and constants
//!
//! This module defines the fundamental value types used throughout the application.
//! Everything here is plain data, usable from the engine, the terminal view, and the
//! agent protocol alike.
//!
//! # Cards
//!
//! A game is played over a [`SymbolSet`] of N distinct face values. Every symbol is
//! dealt twice, so a board holds `2N` cards addressed by a stable [`CardId`] (the
//! position index in the deck).
//!
//! # Game Timing Constants
//!
//! Timing values are in milliseconds:
//!
//! | Constant | Value | Description |
//! |----------|-------|-------------|
//! | `TICK_MS` | 16 | Fixed timestep interval (~60 FPS) |
//! | `MISMATCH_DELAY_MS` | 1000 | How long a non-matching pair stays face up |
//! | `WIN_DELAY_MS` | 300 | Pause between the final match and the win announcement |
//!
//! # Examples
//!
//! ```
//! use tui_pairs_types::{CardState, GameCommand, SymbolSet, DEFAULT_PAIRS};
//!
//! let symbols = SymbolSet::reference();
//! assert_eq!(symbols.len(), DEFAULT_PAIRS);
//! assert_eq!(symbols.card_count(), 16);
//!
//! assert_eq!(CardState::from_str("matched"), Some(CardState::Matched));
//! assert_eq!(GameCommand::Restart.as_str(), "restart");
//! ```

use thiserror::Error;

/// Number of pairs in the reference configuration.
pub const DEFAULT_PAIRS: usize = 8;

/// Largest symbol set a board supports (card ids must fit in a `u8`).
pub const MAX_SYMBOLS: usize = 127;

/// Fixed timestep interval in milliseconds (16ms ≈ 60 FPS)
pub const TICK_MS: u32 = 16;

/// How long both faces of a mismatched pair stay visible before flipping back.
pub const MISMATCH_DELAY_MS: u32 = 1000;

/// Delay between the final match and the win announcement.
pub const WIN_DELAY_MS: u32 = 300;

/// Maximum number of cards face up awaiting evaluation.
pub const SELECTION_CAPACITY: usize = 2;

/// Glyphs of the reference symbol set.
///
/// Single-column glyphs keep the terminal framebuffer aligned.
pub const REFERENCE_GLYPHS: [char; DEFAULT_PAIRS] = ['A', 'B', 'C', 'D', 'E', 'F', 'G', 'H'];


/// A card face value.
///
/// Two cards match when their symbols are equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Symbol(char);

impl Symbol {
    pub const fn new(glyph: char) -> Self {
        Self(glyph)
    }

    pub fn glyph(&self) -> char {
        self.0
    }
}

/// Reasons a symbol set cannot be used for a board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SymbolSetError {
    #[error("symbol set is empty")]
    Empty,
    #[error("symbol {0:?} appears more than once")]
    Duplicate(char),
    #[error("symbol set has {0} symbols, at most {MAX_SYMBOLS} are supported")]
    TooMany(usize),
}

/// Ordered set of distinct symbols a deck is dealt from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolSet {
    symbols: Vec<Symbol>,
}

impl SymbolSet {
    /// Build a set from glyphs, rejecting empty, duplicate, or oversized input.
    pub fn new(glyphs: impl IntoIterator<Item = char>) -> Result<Self, SymbolSetError> {
        let mut symbols: Vec<Symbol> = Vec::new();
        for glyph in glyphs {
            let symbol = Symbol::new(glyph);
            if symbols.contains(&symbol) {
                return Err(SymbolSetError::Duplicate(glyph));
            }
            symbols.push(symbol);
        }

        if symbols.is_empty() {
            return Err(SymbolSetError::Empty);
        }
        if symbols.len() > MAX_SYMBOLS {
            return Err(SymbolSetError::TooMany(symbols.len()));
        }
        Ok(Self { symbols })
    }

    /// The eight-symbol set used by the game binary.
    pub fn reference() -> Self {
        Self {
            symbols: REFERENCE_GLYPHS.iter().copied().map(Symbol::new).collect(),
        }
    }

    /// Number of distinct symbols (N).
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Number of cards in a full deck (2N).
    pub fn card_count(&self) -> usize {
        self.symbols.len() * 2
    }

    pub fn as_slice(&self) -> &[Symbol] {
        &self.symbols
    }

    pub fn iter(&self) -> impl Iterator<Item = Symbol> + '_ {
        self.symbols.iter().copied()
    }

    pub fn contains(&self, symbol: Symbol) -> bool {
        self.symbols.contains(&symbol)
    }

    /// Position of a symbol in the set (stable across games).
    pub fn index_of(&self, symbol: Symbol) -> Option<usize> {
        self.symbols.iter().position(|s| *s == symbol)
    }
}

impl Default for SymbolSet {
    fn default() -> Self {
        Self::reference()
    }
}

/// Stable identity of a card: its position in the deck, in `[0, 2N)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CardId(pub u8);

impl CardId {
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

impl From<u8> for CardId {
    fn from(value: u8) -> Self {
        Self(value)
    }
}

/// Card visibility state.
///
/// - **Hidden**: face down
/// - **Revealed**: face up, part of the current selection
/// - **Matched**: face up for the rest of the game
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CardState {
    Hidden,
    Revealed,
    Matched,
}

impl CardState {
    /// Parse card state from string (case-insensitive)
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "hidden" => Some(CardState::Hidden),
            "revealed" => Some(CardState::Revealed),
            "matched" => Some(CardState::Matched),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CardState::Hidden => "hidden",
            CardState::Revealed => "revealed",
            CardState::Matched => "matched",
        }
    }

    /// Whether the face is currently visible.
    pub fn is_face_up(&self) -> bool {
        !matches!(self, CardState::Hidden)
    }
}

/// Commands that drive the game.
///
/// These are produced by both human input and the agent adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameCommand {
    /// The player picked a card.
    Select(CardId),
    /// Throw away the current board and deal a new one.
    Restart,
}

impl GameCommand {
    /// Protocol name of the command.
    pub fn as_str(&self) -> &'static str {
        match self {
            GameCommand::Select(_) => "select",
            GameCommand::Restart => "restart",
        }
    }
}

/// Number of grid columns used to lay out `card_count` cards.
///
/// The grid is as close to square as possible: `ceil(sqrt(card_count))`.
pub fn grid_columns(card_count: usize) -> usize {
    let mut cols = 1usize;
    while cols * cols < card_count {
        cols += 1;
    }
    cols
}

/// Number of grid rows for `card_count` cards laid out over [`grid_columns`].
pub fn grid_rows(card_count: usize) -> usize {
    let cols = grid_columns(card_count);
    card_count.div_ceil(cols).max(1)
}
