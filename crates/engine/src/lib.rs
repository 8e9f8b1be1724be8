//! Game engine module - the deterministic pairs state machine
//!
//! The engine turns card picks and elapsed time into session transitions and
//! tells a [`BoardView`] what to draw. It has no knowledge of terminals or sockets,
//! so the whole game can be driven and asserted on headlessly.
//!
//! # Module Structure
//!
//! - [`engine`]: [`Engine`], selection guards, match evaluation, win detection
//! - [`scheduler`]: one-shot deferred actions tagged with their session
//! - [`view`]: the [`BoardView`] trait plus headless and recording views
//! - [`config`]: [`GameConfig`] (seed and delays, from environment variables)
//!
//! # Example
//!
//! ```
//! use tui_pairs_engine::{Engine, GameConfig, RecordingView, SelectOutcome};
//! use tui_pairs_types::{CardId, SymbolSet};
//!
//! let mut engine = Engine::new(GameConfig::seeded(7), SymbolSet::reference(), RecordingView::new());
//!
//! // The first pick only reveals a card.
//! assert_eq!(engine.select(CardId(0)), SelectOutcome::Revealed);
//!
//! // Picking it again is ignored.
//! assert!(engine.select(CardId(0)).is_ignored());
//!
//! // Let any pending mismatch flip back.
//! engine.tick(1_000);
//! ```

pub mod config;
pub mod engine;
pub mod scheduler;
pub mod view;

pub use tui_pairs_core as core;
pub use tui_pairs_types as types;

pub use config::GameConfig;
pub use engine::{Engine, SelectOutcome};
pub use scheduler::{DeferredAction, Scheduler};
pub use view::{BoardView, NullView, RecordingView, ViewEvent};
