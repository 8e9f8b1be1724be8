//! Deck module - cards and the shuffled deal
//!
//! A deck holds exactly two cards per symbol. Card identities are deck positions,
//! so `deck.get(CardId(i))` is the card at index `i`.

use thiserror::Error;

use crate::rng::DeckRng;
use crate::types::{CardId, CardState, Symbol, SymbolSet};

/// One card on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Card {
    pub id: CardId,
    pub symbol: Symbol,
    pub state: CardState,
}

impl Card {
    pub fn new(id: CardId, symbol: Symbol) -> Self {
        Self {
            id,
            symbol,
            state: CardState::Hidden,
        }
    }

    pub fn is_matched(&self) -> bool {
        self.state == CardState::Matched
    }

    pub fn face(&self) -> CardFace {
        CardFace {
            id: self.id,
            symbol: self.symbol,
        }
    }
}

/// What a board view needs to draw a card: identity and value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CardFace {
    pub id: CardId,
    pub symbol: Symbol,
}

/// Reasons an explicit card order cannot form a deck.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DeckError {
    #[error("a deck needs an even number of cards, got {0}")]
    OddLength(usize),
    #[error("deck has {0} cards, which exceeds the card id range")]
    TooLarge(usize),
    #[error("symbol {0:?} appears {1} times, expected exactly 2")]
    NotPaired(char, usize),
}

/// Ordered sequence of 2N cards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Deck {
    cards: Vec<Card>,
}

impl Deck {
    /// Deal a fresh deck: every symbol twice, shuffled.
    pub fn shuffled(symbols: &SymbolSet, rng: &mut DeckRng) -> Self {
        let mut values: Vec<Symbol> = symbols.iter().chain(symbols.iter()).collect();
        rng.shuffle(&mut values);
        Self::from_values(values)
    }

    /// Build a deck from an explicit order (replays, tests).
    ///
    /// The order must contain every symbol exactly twice.
    pub fn from_order(order: impl IntoIterator<Item = Symbol>) -> Result<Self, DeckError> {
        let values: Vec<Symbol> = order.into_iter().collect();
        if values.len() % 2 != 0 {
            return Err(DeckError::OddLength(values.len()));
        }
        if values.len() > u8::MAX as usize {
            return Err(DeckError::TooLarge(values.len()));
        }
        for symbol in &values {
            let count = values.iter().filter(|v| *v == symbol).count();
            if count != 2 {
                return Err(DeckError::NotPaired(symbol.glyph(), count));
            }
        }
        Ok(Self::from_values(values))
    }

    fn from_values(values: Vec<Symbol>) -> Self {
        let cards = values
            .into_iter()
            .enumerate()
            .map(|(i, symbol)| Card::new(CardId(i as u8), symbol))
            .collect();
        Self { cards }
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// Number of pairs (N).
    pub fn pair_count(&self) -> usize {
        self.cards.len() / 2
    }

    pub fn get(&self, id: CardId) -> Option<&Card> {
        self.cards.get(id.index())
    }

    pub fn get_mut(&mut self, id: CardId) -> Option<&mut Card> {
        self.cards.get_mut(id.index())
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    pub fn iter(&self) -> impl Iterator<Item = &Card> {
        self.cards.iter()
    }

    pub fn faces(&self) -> Vec<CardFace> {
        self.cards.iter().map(Card::face).collect()
    }

    /// Symbols in deck order.
    pub fn symbols(&self) -> impl Iterator<Item = Symbol> + '_ {
        self.cards.iter().map(|c| c.symbol)
    }

    /// Whether the deck holds exactly two cards of every symbol in `symbols`
    /// and nothing else.
    pub fn is_well_formed(&self, symbols: &SymbolSet) -> bool {
        if self.cards.len() != symbols.card_count() {
            return false;
        }
        symbols
            .iter()
            .all(|s| self.cards.iter().filter(|c| c.symbol == s).count() == 2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sym(c: char) -> Symbol {
        Symbol::new(c)
    }

    #[test]
    fn shuffled_deck_has_two_of_each_symbol() {
        let symbols = SymbolSet::reference();
        let mut rng = DeckRng::new(42);
        let deck = Deck::shuffled(&symbols, &mut rng);

        assert_eq!(deck.len(), 16);
        assert_eq!(deck.pair_count(), 8);
        assert!(deck.is_well_formed(&symbols));
    }

    #[test]
    fn shuffled_deck_starts_hidden_with_positional_ids() {
        let symbols = SymbolSet::reference();
        let deck = Deck::shuffled(&symbols, &mut DeckRng::new(3));

        for (i, card) in deck.iter().enumerate() {
            assert_eq!(card.id, CardId(i as u8));
            assert_eq!(card.state, CardState::Hidden);
        }
    }

    #[test]
    fn from_order_keeps_order() {
        let deck = Deck::from_order([sym('B'), sym('A'), sym('A'), sym('B')]).unwrap();
        let glyphs: Vec<char> = deck.symbols().map(|s| s.glyph()).collect();
        assert_eq!(glyphs, vec!['B', 'A', 'A', 'B']);
    }

    #[test]
    fn from_order_rejects_unpaired_symbols() {
        assert_eq!(
            Deck::from_order([sym('A'), sym('A'), sym('A')]),
            Err(DeckError::OddLength(3))
        );
        assert_eq!(
            Deck::from_order([sym('A'), sym('B'), sym('A'), sym('C')]),
            Err(DeckError::NotPaired('B', 1))
        );
        assert_eq!(
            Deck::from_order([sym('A'), sym('A'), sym('A'), sym('A')]),
            Err(DeckError::NotPaired('A', 4))
        );
    }

    #[test]
    fn well_formed_checks_against_the_symbol_set() {
        let deck = Deck::from_order([sym('A'), sym('B'), sym('B'), sym('A')]).unwrap();
        assert!(deck.is_well_formed(&SymbolSet::new(['A', 'B']).unwrap()));
        assert!(!deck.is_well_formed(&SymbolSet::new(['A', 'C']).unwrap()));
        assert!(!deck.is_well_formed(&SymbolSet::new(['A', 'B', 'C']).unwrap()));
    }

    #[test]
    fn faces_carry_identity_and_value() {
        let deck = Deck::from_order([sym('x'), sym('x')]).unwrap();
        let faces = deck.faces();
        assert_eq!(
            faces,
            vec![
                CardFace { id: CardId(0), symbol: sym('x') },
                CardFace { id: CardId(1), symbol: sym('x') },
            ]
        );
    }
}
