//! TermBoard: the terminal's side of the [`BoardView`] boundary.
//!
//! Holds exactly what the engine told the view, nothing more. The game loop
//! renders it through [`crate::GameView`].

use crate::engine::BoardView;
use crate::core::CardFace;
use crate::types::{CardId, Symbol};

/// Visual state of one card tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tile {
    pub id: CardId,
    pub symbol: Symbol,
    pub face_up: bool,
    pub matched: bool,
}

#[derive(Debug, Clone, Default)]
pub struct TermBoard {
    tiles: Vec<Tile>,
    input_enabled: bool,
    win_announced: bool,
    dirty: bool,
}

impl TermBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    pub fn tile(&self, id: CardId) -> Option<&Tile> {
        self.tiles.get(id.index())
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    pub fn input_enabled(&self) -> bool {
        self.input_enabled
    }

    pub fn win_announced(&self) -> bool {
        self.win_announced
    }

    pub fn matched_pairs(&self) -> usize {
        self.tiles.iter().filter(|t| t.matched).count() / 2
    }

    pub fn total_pairs(&self) -> usize {
        self.tiles.len() / 2
    }

    /// Whether anything changed since the last call.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    fn update(&mut self, id: CardId, f: impl FnOnce(&mut Tile)) {
        if let Some(tile) = self.tiles.get_mut(id.index()) {
            f(tile);
            self.dirty = true;
        }
    }
}

impl BoardView for TermBoard {
    fn render(&mut self, cards: &[CardFace]) {
        self.tiles.clear();
        self.tiles.extend(cards.iter().map(|c| Tile {
            id: c.id,
            symbol: c.symbol,
            face_up: false,
            matched: false,
        }));
        self.win_announced = false;
        self.dirty = true;
    }

    fn show_face(&mut self, id: CardId) {
        self.update(id, |t| t.face_up = true);
    }

    fn hide_face(&mut self, id: CardId) {
        self.update(id, |t| t.face_up = false);
    }

    fn mark_matched(&mut self, id: CardId) {
        self.update(id, |t| {
            t.face_up = true;
            t.matched = true;
        });
    }

    fn set_input_enabled(&mut self, enabled: bool) {
        self.input_enabled = enabled;
        self.dirty = true;
    }

    fn announce_win(&mut self) {
        self.win_announced = true;
        self.dirty = true;
    }
}
