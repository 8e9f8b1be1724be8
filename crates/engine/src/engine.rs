//! Game engine - the pairs state machine
//!
//! The engine owns the session, the deck RNG, the deferred-action queue, and the
//! board view it drives. Every transition happens inside one of its public methods:
//!
//! - [`Engine::initialize`] / [`Engine::restart`] deal a new session
//! - [`Engine::select`] handles a card pick from the view
//! - [`Engine::tick`] advances the engine clock and fires due deferred actions
//!
//! Time is explicit: callers tick the engine with elapsed milliseconds, the same
//! fixed-timestep model the game loop uses for rendering.

use crate::config::GameConfig;
use crate::core::{Deck, DeckRng, GameSnapshot, IgnoreReason, Session};
use crate::scheduler::{Deferred, DeferredAction, Scheduler};
use crate::types::{CardId, CardState, GameCommand, SymbolSet};
use crate::view::BoardView;

/// Result of a card pick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SelectOutcome {
    /// Dropped by the input guards; nothing changed.
    Ignored(IgnoreReason),
    /// First card of a pair is face up.
    Revealed,
    /// Second card matched the first. `pairs` is the new matched-pair count.
    Matched { pairs: usize },
    /// Second card did not match; both flip back after the mismatch delay.
    Mismatched,
}

impl SelectOutcome {
    pub fn is_ignored(&self) -> bool {
        matches!(self, SelectOutcome::Ignored(_))
    }
}

pub struct Engine<V: BoardView> {
    config: GameConfig,
    symbols: SymbolSet,
    rng: DeckRng,
    session: Session,
    scheduler: Scheduler,
    /// Engine clock in milliseconds (advanced by `tick`).
    clock_ms: u64,
    view: V,
}

impl<V: BoardView> Engine<V> {
    /// Create an engine and deal the first game.
    pub fn new(config: GameConfig, symbols: SymbolSet, view: V) -> Self {
        let rng = match config.seed {
            Some(seed) => DeckRng::new(seed),
            None => DeckRng::from_entropy(),
        };
        let mut engine = Self {
            config,
            symbols,
            rng,
            session: Session::new(0, Deck::default()),
            scheduler: Scheduler::new(),
            clock_ms: 0,
            view,
        };
        engine.initialize();
        engine
    }

    /// Deal a new shuffled deck and start a fresh session.
    pub fn initialize(&mut self) {
        let deck = Deck::shuffled(&self.symbols, &mut self.rng);
        self.install(deck);
    }

    /// Start a fresh session over a fixed deck order.
    pub fn initialize_with_deck(&mut self, deck: Deck) {
        self.install(deck);
    }

    /// Throw away the current session and deal a new one.
    pub fn restart(&mut self) {
        tracing::debug!(
            episode_id = self.session.episode_id,
            matched_pairs = self.session.matched_pairs,
            "restart"
        );
        self.initialize();
    }

    fn install(&mut self, deck: Deck) {
        let episode_id = self.session.episode_id.wrapping_add(1);
        self.session = Session::new(episode_id, deck);

        let faces = self.session.deck.faces();
        self.view.render(&faces);
        self.view.set_input_enabled(true);

        tracing::debug!(
            episode_id,
            cards = faces.len(),
            seed = self.rng.seed(),
            "dealt new session"
        );
    }

    /// Apply a command from input or the agent adapter.
    ///
    /// Restart has no outcome of its own and reports `None`.
    pub fn apply(&mut self, command: GameCommand) -> Option<SelectOutcome> {
        match command {
            GameCommand::Select(id) => Some(self.select(id)),
            GameCommand::Restart => {
                self.restart();
                None
            }
        }
    }

    /// Handle a card pick reported by the view.
    pub fn select(&mut self, id: CardId) -> SelectOutcome {
        if let Some(reason) = self.session.reject_reason(id) {
            tracing::trace!(card = id.0, reason = reason.as_str(), "selection ignored");
            return SelectOutcome::Ignored(reason);
        }

        self.session.set_state(id, CardState::Revealed);
        self.view.show_face(id);
        self.session.selection.push(id);

        if self.session.selection.len() < 2 {
            return SelectOutcome::Revealed;
        }

        self.session.input_locked = true;
        self.view.set_input_enabled(false);
        self.evaluate_selection()
    }

    fn evaluate_selection(&mut self) -> SelectOutcome {
        let (first, second) = (self.session.selection[0], self.session.selection[1]);
        let same = match (self.session.card(first), self.session.card(second)) {
            (Some(a), Some(b)) => a.symbol == b.symbol,
            _ => false,
        };

        if !same {
            let due_ms = self.clock_ms + self.config.mismatch_delay_ms as u64;
            self.scheduler.schedule(
                due_ms,
                self.session.episode_id,
                DeferredAction::HideMismatch { first, second },
            );
            tracing::debug!(first = first.0, second = second.0, due_ms, "mismatch");
            return SelectOutcome::Mismatched;
        }

        for id in [first, second] {
            self.session.set_state(id, CardState::Matched);
            self.view.mark_matched(id);
        }
        self.session.matched_pairs += 1;
        self.reset_selection();

        let pairs = self.session.matched_pairs;
        tracing::debug!(
            first = first.0,
            second = second.0,
            pairs,
            total = self.session.total_pairs(),
            "match"
        );

        if pairs == self.session.total_pairs() {
            self.session.won = true;
            let due_ms = self.clock_ms + self.config.win_delay_ms as u64;
            self.scheduler
                .schedule(due_ms, self.session.episode_id, DeferredAction::AnnounceWin);
            tracing::info!(episode_id = self.session.episode_id, "all pairs found");
        }

        SelectOutcome::Matched { pairs }
    }

    fn reset_selection(&mut self) {
        self.session.selection.clear();
        self.session.input_locked = false;
        self.view.set_input_enabled(true);
    }

    /// Advance the engine clock and fire every deferred action that came due.
    ///
    /// Returns true if any action changed the current session.
    pub fn tick(&mut self, elapsed_ms: u32) -> bool {
        self.clock_ms += elapsed_ms as u64;

        let mut changed = false;
        while let Some(deferred) = self.scheduler.pop_due(self.clock_ms) {
            changed |= self.fire(deferred);
        }
        changed
    }

    fn fire(&mut self, deferred: Deferred) -> bool {
        if deferred.episode_id != self.session.episode_id {
            tracing::debug!(
                scheduled_for = deferred.episode_id,
                current = self.session.episode_id,
                action = ?deferred.action,
                "dropping stale deferred action"
            );
            return false;
        }

        match deferred.action {
            DeferredAction::HideMismatch { first, second } => {
                for id in [first, second] {
                    self.session.set_state(id, CardState::Hidden);
                    self.view.hide_face(id);
                }
                self.reset_selection();
                true
            }
            DeferredAction::AnnounceWin => {
                if self.session.win_announced {
                    return false;
                }
                self.session.win_announced = true;
                self.view.announce_win();
                true
            }
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn symbols(&self) -> &SymbolSet {
        &self.symbols
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    pub fn view_mut(&mut self) -> &mut V {
        &mut self.view
    }

    pub fn seed(&self) -> u64 {
        self.rng.seed()
    }

    pub fn clock_ms(&self) -> u64 {
        self.clock_ms
    }

    /// Deferred actions still queued, including stale ones.
    pub fn pending_timers(&self) -> usize {
        self.scheduler.len()
    }

    /// Time until the next deferred action is due, if any.
    pub fn next_deadline_in_ms(&self) -> Option<u64> {
        self.scheduler
            .next_deadline_ms()
            .map(|due| due.saturating_sub(self.clock_ms))
    }

    pub fn snapshot_into(&self, out: &mut GameSnapshot) {
        out.fill_from(&self.session);
        out.seed = self.rng.seed();
        out.pending_timers = self.scheduler.pending_for(self.session.episode_id) as u32;
    }

    pub fn snapshot(&self) -> GameSnapshot {
        let mut s = GameSnapshot::default();
        self.snapshot_into(&mut s);
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Phase;
    use crate::types::Symbol;
    use crate::view::{RecordingView, ViewEvent};

    fn engine_with_order(order: &[char]) -> Engine<RecordingView> {
        let glyphs: Vec<char> = {
            let mut g: Vec<char> = order.to_vec();
            g.sort_unstable();
            g.dedup();
            g
        };
        let symbols = SymbolSet::new(glyphs).unwrap();
        let mut engine = Engine::new(GameConfig::seeded(1), symbols, RecordingView::new());
        let deck = Deck::from_order(order.iter().copied().map(Symbol::new)).unwrap();
        engine.initialize_with_deck(deck);
        engine.view_mut().take();
        engine
    }

    #[test]
    fn new_engine_renders_hidden_board_and_enables_input() {
        let engine = Engine::new(
            GameConfig::seeded(7),
            SymbolSet::reference(),
            RecordingView::new(),
        );

        let events = &engine.view().events;
        assert_eq!(events.len(), 2);
        match &events[0] {
            ViewEvent::Render(faces) => {
                assert_eq!(faces.len(), 16);
                for (i, f) in faces.iter().enumerate() {
                    assert_eq!(f.id, CardId(i as u8));
                }
            }
            other => panic!("expected render, got {:?}", other),
        }
        assert_eq!(events[1], ViewEvent::SetInputEnabled(true));

        let s = engine.session();
        assert_eq!(s.episode_id, 1);
        assert_eq!(s.phase(), Phase::Idle);
        assert!(s.deck.is_well_formed(&SymbolSet::reference()));
        assert_eq!(s.state_counts(), (16, 0, 0));
    }

    #[test]
    fn first_pick_reveals_without_locking() {
        let mut e = engine_with_order(&['B', 'A', 'A', 'B']);
        assert_eq!(e.select(CardId(1)), SelectOutcome::Revealed);

        assert_eq!(e.view().events, vec![ViewEvent::ShowFace(CardId(1))]);
        assert_eq!(e.session().card(CardId(1)).unwrap().state, CardState::Revealed);
        assert!(!e.session().input_locked);
        assert_eq!(e.session().phase(), Phase::OneRevealed);
    }

    #[test]
    fn repeated_pick_of_same_card_is_not_duplicated() {
        let mut e = engine_with_order(&['B', 'A', 'A', 'B']);
        e.select(CardId(1));
        assert_eq!(
            e.select(CardId(1)),
            SelectOutcome::Ignored(IgnoreReason::AlreadySelected)
        );
        assert_eq!(e.session().selection.as_slice(), &[CardId(1)]);
        assert_eq!(e.view().events.len(), 1);
    }

    #[test]
    fn match_marks_both_and_resets_selection() {
        let mut e = engine_with_order(&['B', 'A', 'A', 'B']);
        e.select(CardId(1));
        assert_eq!(e.select(CardId(2)), SelectOutcome::Matched { pairs: 1 });

        assert_eq!(
            e.view().events,
            vec![
                ViewEvent::ShowFace(CardId(1)),
                ViewEvent::ShowFace(CardId(2)),
                ViewEvent::SetInputEnabled(false),
                ViewEvent::MarkMatched(CardId(1)),
                ViewEvent::MarkMatched(CardId(2)),
                ViewEvent::SetInputEnabled(true),
            ]
        );
        let s = e.session();
        assert_eq!(s.matched_pairs, 1);
        assert!(s.selection.is_empty());
        assert!(!s.input_locked);
        assert_eq!(s.card(CardId(1)).unwrap().state, CardState::Matched);
        assert_eq!(s.card(CardId(2)).unwrap().state, CardState::Matched);
        assert_eq!(e.pending_timers(), 0);
    }

    #[test]
    fn mismatch_locks_until_delay_elapses() {
        let mut e = engine_with_order(&['B', 'A', 'A', 'B']);
        e.select(CardId(0));
        assert_eq!(e.select(CardId(1)), SelectOutcome::Mismatched);
        assert!(e.session().input_locked);
        assert_eq!(e.session().phase(), Phase::Evaluating);

        // A third pick is dropped while the pair is pending.
        assert_eq!(
            e.select(CardId(3)),
            SelectOutcome::Ignored(IgnoreReason::InputLocked)
        );

        assert!(!e.tick(999));
        assert!(e.session().input_locked);
        assert_eq!(e.session().card(CardId(0)).unwrap().state, CardState::Revealed);

        assert!(e.tick(1));
        let s = e.session();
        assert!(!s.input_locked);
        assert!(s.selection.is_empty());
        assert_eq!(s.card(CardId(0)).unwrap().state, CardState::Hidden);
        assert_eq!(s.card(CardId(1)).unwrap().state, CardState::Hidden);

        let tail: Vec<ViewEvent> = e.view().events.iter().rev().take(3).rev().cloned().collect();
        assert_eq!(
            tail,
            vec![
                ViewEvent::HideFace(CardId(0)),
                ViewEvent::HideFace(CardId(1)),
                ViewEvent::SetInputEnabled(true),
            ]
        );

        // Input is accepted again.
        assert_eq!(e.select(CardId(3)), SelectOutcome::Revealed);
    }

    #[test]
    fn matched_cards_cannot_be_picked_again() {
        let mut e = engine_with_order(&['B', 'A', 'A', 'B']);
        e.select(CardId(1));
        e.select(CardId(2));
        assert_eq!(
            e.select(CardId(2)),
            SelectOutcome::Ignored(IgnoreReason::AlreadyMatched)
        );
    }

    #[test]
    fn unknown_card_is_ignored() {
        let mut e = engine_with_order(&['B', 'A', 'A', 'B']);
        assert_eq!(
            e.select(CardId(4)),
            SelectOutcome::Ignored(IgnoreReason::UnknownCard)
        );
        assert!(e.view().events.is_empty());
    }

    #[test]
    fn reference_example_wins_once_after_delay() {
        let mut e = engine_with_order(&['B', 'A', 'A', 'B']);

        e.select(CardId(1));
        assert_eq!(e.select(CardId(2)), SelectOutcome::Matched { pairs: 1 });
        e.select(CardId(0));
        assert_eq!(e.select(CardId(3)), SelectOutcome::Matched { pairs: 2 });

        assert!(e.session().won);
        assert_eq!(e.session().phase(), Phase::Won);
        assert_eq!(e.view().win_announcements(), 0);

        e.tick(299);
        assert_eq!(e.view().win_announcements(), 0);
        e.tick(1);
        assert_eq!(e.view().win_announcements(), 1);

        for _ in 0..100 {
            e.tick(16);
        }
        assert_eq!(e.view().win_announcements(), 1);
        assert!(e.session().win_announced);
    }

    #[test]
    fn restart_drops_pending_mismatch_from_previous_session() {
        let mut e = engine_with_order(&['B', 'A', 'A', 'B']);
        e.select(CardId(0));
        e.select(CardId(1));
        assert_eq!(e.pending_timers(), 1);

        e.restart();
        assert_eq!(e.session().episode_id, 3);
        e.select(CardId(0));
        assert_eq!(e.session().card(CardId(0)).unwrap().state, CardState::Revealed);

        // The old timer fires but must not touch the new session.
        assert!(!e.tick(1000));
        assert_eq!(e.pending_timers(), 0);
        assert_eq!(e.session().card(CardId(0)).unwrap().state, CardState::Revealed);
        assert_eq!(e.session().selection.as_slice(), &[CardId(0)]);
    }

    #[test]
    fn restart_after_win_suppresses_stale_announcement() {
        let mut e = engine_with_order(&['A', 'A']);
        e.select(CardId(0));
        e.select(CardId(1));
        assert!(e.session().won);

        e.restart();
        e.tick(10_000);
        assert_eq!(e.view().win_announcements(), 0);
        assert!(!e.session().won);
    }

    #[test]
    fn apply_routes_commands() {
        let mut e = engine_with_order(&['B', 'A', 'A', 'B']);
        assert_eq!(
            e.apply(GameCommand::Select(CardId(0))),
            Some(SelectOutcome::Revealed)
        );
        assert_eq!(e.apply(GameCommand::Restart), None);
        assert!(e.session().selection.is_empty());
    }

    #[test]
    fn snapshot_reports_session_and_live_timers() {
        let mut e = engine_with_order(&['B', 'A', 'A', 'B']);
        e.select(CardId(0));
        e.select(CardId(1));

        let snap = e.snapshot();
        assert_eq!(snap.cards.len(), 4);
        assert_eq!(snap.selection, vec![CardId(0), CardId(1)]);
        assert!(snap.input_locked);
        assert_eq!(snap.phase, Phase::Evaluating);
        assert_eq!(snap.pending_timers, 1);
        assert_eq!(snap.seed, 1);

        e.restart();
        assert_eq!(e.snapshot().pending_timers, 0);
    }

    #[test]
    fn next_deadline_counts_down() {
        let mut e = engine_with_order(&['B', 'A', 'A', 'B']);
        assert_eq!(e.next_deadline_in_ms(), None);
        e.select(CardId(0));
        e.select(CardId(1));
        assert_eq!(e.next_deadline_in_ms(), Some(1000));
        e.tick(400);
        assert_eq!(e.next_deadline_in_ms(), Some(600));
    }
}
