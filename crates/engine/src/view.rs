//! Board view boundary.
//!
//! The engine never draws anything itself. It tells a [`BoardView`] what changed,
//! and the view reports card picks back through [`crate::Engine::select`].

use crate::core::CardFace;
use crate::types::CardId;

/// Rendering side of the game.
pub trait BoardView {
    /// Discard every card visual and draw one face-down card per entry.
    fn render(&mut self, cards: &[CardFace]);
    fn show_face(&mut self, id: CardId);
    fn hide_face(&mut self, id: CardId);
    fn mark_matched(&mut self, id: CardId);
    fn set_input_enabled(&mut self, enabled: bool);
    fn announce_win(&mut self);
}

/// A view that draws nothing (headless runs, benchmarks).
#[derive(Debug, Clone, Copy, Default)]
pub struct NullView;

impl BoardView for NullView {
    fn render(&mut self, _cards: &[CardFace]) {}
    fn show_face(&mut self, _id: CardId) {}
    fn hide_face(&mut self, _id: CardId) {}
    fn mark_matched(&mut self, _id: CardId) {}
    fn set_input_enabled(&mut self, _enabled: bool) {}
    fn announce_win(&mut self) {}
}

/// One call the engine made on its view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewEvent {
    Render(Vec<CardFace>),
    ShowFace(CardId),
    HideFace(CardId),
    MarkMatched(CardId),
    SetInputEnabled(bool),
    AnnounceWin,
}

/// Records every call, in order.
#[derive(Debug, Clone, Default)]
pub struct RecordingView {
    pub events: Vec<ViewEvent>,
}

impl RecordingView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drain recorded events.
    pub fn take(&mut self) -> Vec<ViewEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn count(&self, pred: impl Fn(&ViewEvent) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }

    pub fn win_announcements(&self) -> usize {
        self.count(|e| matches!(e, ViewEvent::AnnounceWin))
    }
}

impl BoardView for RecordingView {
    fn render(&mut self, cards: &[CardFace]) {
        self.events.push(ViewEvent::Render(cards.to_vec()));
    }

    fn show_face(&mut self, id: CardId) {
        self.events.push(ViewEvent::ShowFace(id));
    }

    fn hide_face(&mut self, id: CardId) {
        self.events.push(ViewEvent::HideFace(id));
    }

    fn mark_matched(&mut self, id: CardId) {
        self.events.push(ViewEvent::MarkMatched(id));
    }

    fn set_input_enabled(&mut self, enabled: bool) {
        self.events.push(ViewEvent::SetInputEnabled(enabled));
    }

    fn announce_win(&mut self) {
        self.events.push(ViewEvent::AnnounceWin);
    }
}

/// Drive two views from one engine.
impl<A: BoardView, B: BoardView> BoardView for (A, B) {
    fn render(&mut self, cards: &[CardFace]) {
        self.0.render(cards);
        self.1.render(cards);
    }

    fn show_face(&mut self, id: CardId) {
        self.0.show_face(id);
        self.1.show_face(id);
    }

    fn hide_face(&mut self, id: CardId) {
        self.0.hide_face(id);
        self.1.hide_face(id);
    }

    fn mark_matched(&mut self, id: CardId) {
        self.0.mark_matched(id);
        self.1.mark_matched(id);
    }

    fn set_input_enabled(&mut self, enabled: bool) {
        self.0.set_input_enabled(enabled);
        self.1.set_input_enabled(enabled);
    }

    fn announce_win(&mut self) {
        self.0.announce_win();
        self.1.announce_win();
    }
}
