//! Session module - the complete mutable state of one game
//!
//! A session is created by every (re)start and replaced wholesale by the next one.
//! The engine owns exactly one session at a time; `episode_id` tags it so that
//! deferred work scheduled for an earlier session can be recognised as stale.

use arrayvec::ArrayVec;

use crate::deck::{Card, Deck};
use crate::types::{CardId, CardState, SELECTION_CAPACITY};

/// Cards currently face up and awaiting evaluation, in reveal order.
pub type Selection = ArrayVec<CardId, SELECTION_CAPACITY>;

/// Coarse position in the per-session state machine.
///
/// `Idle -> OneRevealed -> Evaluating -> Idle`, until every pair is found (`Won`).
/// A matching second card goes straight back to `Idle`; `Evaluating` is only
/// observable while a mismatch is waiting to flip back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Idle,
    OneRevealed,
    Evaluating,
    Won,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::OneRevealed => "one_revealed",
            Phase::Evaluating => "evaluating",
            Phase::Won => "won",
        }
    }
}

/// Why a selection was dropped without effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IgnoreReason {
    /// Two cards are already face up and waiting to be evaluated.
    InputLocked,
    /// The card belongs to a pair that was already found.
    AlreadyMatched,
    /// The card is the one face-up card of the current selection.
    AlreadySelected,
    /// No card has this id.
    UnknownCard,
}

impl IgnoreReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            IgnoreReason::InputLocked => "input_locked",
            IgnoreReason::AlreadyMatched => "already_matched",
            IgnoreReason::AlreadySelected => "already_selected",
            IgnoreReason::UnknownCard => "unknown_card",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Session {
    pub episode_id: u32,
    pub deck: Deck,
    pub selection: Selection,
    pub matched_pairs: usize,
    pub input_locked: bool,
    /// Every pair has been found.
    pub won: bool,
    /// The win notification has been delivered to the view.
    pub win_announced: bool,
}

impl Session {
    pub fn new(episode_id: u32, deck: Deck) -> Self {
        Self {
            episode_id,
            deck,
            selection: Selection::new(),
            matched_pairs: 0,
            input_locked: false,
            won: false,
            win_announced: false,
        }
    }

    pub fn total_pairs(&self) -> usize {
        self.deck.pair_count()
    }

    pub fn card(&self, id: CardId) -> Option<&Card> {
        self.deck.get(id)
    }

    pub fn phase(&self) -> Phase {
        if self.won {
            return Phase::Won;
        }
        match self.selection.len() {
            0 => Phase::Idle,
            1 => Phase::OneRevealed,
            _ => Phase::Evaluating,
        }
    }

    /// Guard applied before a selection takes effect.
    ///
    /// Returns `None` when the card may be revealed.
    pub fn reject_reason(&self, id: CardId) -> Option<IgnoreReason> {
        if self.input_locked {
            return Some(IgnoreReason::InputLocked);
        }
        let Some(card) = self.deck.get(id) else {
            return Some(IgnoreReason::UnknownCard);
        };
        if card.is_matched() {
            return Some(IgnoreReason::AlreadyMatched);
        }
        if self.selection.len() == 1 && self.selection[0] == id {
            return Some(IgnoreReason::AlreadySelected);
        }
        None
    }

    /// Set a card's state. Unknown ids are ignored.
    pub fn set_state(&mut self, id: CardId, state: CardState) {
        if let Some(card) = self.deck.get_mut(id) {
            card.state = state;
        }
    }

    /// Number of cards in each state: (hidden, revealed, matched).
    pub fn state_counts(&self) -> (usize, usize, usize) {
        self.deck
            .iter()
            .fold((0, 0, 0), |(h, r, m), card| match card.state {
                CardState::Hidden => (h + 1, r, m),
                CardState::Revealed => (h, r + 1, m),
                CardState::Matched => (h, r, m + 1),
            })
    }
}
