//! Core game data module - pure, deterministic, and testable
//!
//! This module contains the data model of a pairs game: cards, the shuffled deck,
//! and the per-game session. It has **zero dependencies** on UI, networking, or I/O.
//!
//! - **Deterministic**: the same seed deals the same sequence of decks
//! - **Testable**: every invariant is checked by unit tests next to the code
//! - **Portable**: usable from the terminal game, the agent adapter, or headless tests
//!
//! # Module Structure
//!
//! - [`deck`]: cards and the 2N-card deck (two of every symbol)
//! - [`rng`]: seeded random source with a Fisher–Yates shuffle
//! - [`session`]: selection, matched-pair count, input lock, phase
//! - [`snapshot`]: read-only copy of a session for observers
//!
//! # Example
//!
//! ```
//! use tui_pairs_core::{Deck, DeckRng, Session};
//! use tui_pairs_types::SymbolSet;
//!
//! let symbols = SymbolSet::reference();
//! let mut rng = DeckRng::new(12345);
//! let deck = Deck::shuffled(&symbols, &mut rng);
//! assert!(deck.is_well_formed(&symbols));
//!
//! let session = Session::new(1, deck);
//! assert_eq!(session.total_pairs(), 8);
//! ```

pub mod deck;
pub mod rng;
pub mod session;
pub mod snapshot;

pub use tui_pairs_types as types;

// Re-export commonly used types for convenience
pub use deck::{Card, CardFace, Deck, DeckError};
pub use rng::DeckRng;
pub use session::{IgnoreReason, Phase, Selection, Session};
pub use snapshot::{CardSnapshot, GameSnapshot};
