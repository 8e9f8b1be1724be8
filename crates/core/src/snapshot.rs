use crate::session::{Phase, Session};
use crate::types::{CardId, CardState, Symbol};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CardSnapshot {
    pub id: CardId,
    pub symbol: Symbol,
    pub state: CardState,
}

impl CardSnapshot {
    /// The symbol, if the card is face up.
    pub fn visible_symbol(&self) -> Option<Symbol> {
        self.state.is_face_up().then_some(self.symbol)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GameSnapshot {
    pub cards: Vec<CardSnapshot>,
    pub selection: Vec<CardId>,
    pub matched_pairs: u32,
    pub total_pairs: u32,
    pub input_locked: bool,
    pub won: bool,
    pub win_announced: bool,
    pub phase: Phase,
    pub episode_id: u32,
    pub seed: u64,
    pub pending_timers: u32,
}

impl GameSnapshot {
    /// Fill from a session, reusing the card buffer.
    pub fn fill_from(&mut self, session: &Session) {
        self.cards.clear();
        self.cards.extend(session.deck.iter().map(|c| CardSnapshot {
            id: c.id,
            symbol: c.symbol,
            state: c.state,
        }));
        self.selection.clear();
        self.selection.extend(session.selection.iter().copied());
        self.matched_pairs = session.matched_pairs as u32;
        self.total_pairs = session.total_pairs() as u32;
        self.input_locked = session.input_locked;
        self.won = session.won;
        self.win_announced = session.win_announced;
        self.phase = session.phase();
        self.episode_id = session.episode_id;
    }

    pub fn playable(&self) -> bool {
        !self.won && !self.input_locked
    }
}

impl Default for GameSnapshot {
    fn default() -> Self {
        Self {
            cards: Vec::new(),
            selection: Vec::new(),
            matched_pairs: 0,
            total_pairs: 0,
            input_locked: false,
            won: false,
            win_announced: false,
            phase: Phase::Idle,
            episode_id: 0,
            seed: 0,
            pending_timers: 0,
        }
    }
}
