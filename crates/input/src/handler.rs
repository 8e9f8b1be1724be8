//! Grid cursor for keyboard play.
//!
//! Turns [`InputAction`]s into [`GameCommand`]s. The cursor wraps around both
//! axes and skips the empty slots of a partially filled last row.

use crate::map::{Direction, InputAction};
use crate::types::{grid_columns, CardId, GameCommand};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CursorHandler {
    card_count: usize,
    cols: usize,
    index: usize,
}

impl CursorHandler {
    pub fn new(card_count: usize) -> Self {
        Self {
            card_count,
            cols: grid_columns(card_count),
            index: 0,
        }
    }

    /// Adopt a new board size, keeping the cursor in range.
    pub fn resize(&mut self, card_count: usize) {
        self.card_count = card_count;
        self.cols = grid_columns(card_count);
        if self.index >= card_count {
            self.index = 0;
        }
    }

    pub fn position(&self) -> CardId {
        CardId(self.index as u8)
    }

    /// Column and row of the cursor.
    pub fn cell(&self) -> (usize, usize) {
        (self.index % self.cols, self.index / self.cols)
    }

    pub fn move_to(&mut self, id: CardId) {
        if id.index() < self.card_count {
            self.index = id.index();
        }
    }

    /// Apply an input action. Movement only updates the cursor.
    pub fn apply(&mut self, action: InputAction) -> Option<GameCommand> {
        match action {
            InputAction::Move(dir) => {
                self.step(dir);
                None
            }
            InputAction::Select => {
                if self.card_count == 0 {
                    return None;
                }
                Some(GameCommand::Select(self.position()))
            }
            InputAction::Restart => Some(GameCommand::Restart),
        }
    }

    fn step(&mut self, dir: Direction) {
        if self.card_count == 0 {
            return;
        }
        let (col, row) = self.cell();
        let rows = self.card_count.div_ceil(self.cols);
        // Cells in a given row (the last one may be short).
        let row_len = |r: usize| (self.card_count - r * self.cols).min(self.cols);
        // Rows that have a card in column `c`.
        let col_len = |c: usize| {
            let full = self.card_count / self.cols;
            if c < self.card_count % self.cols {
                full + 1
            } else {
                full
            }
        };

        let (col, row) = match dir {
            Direction::Left => ((col + row_len(row) - 1) % row_len(row), row),
            Direction::Right => ((col + 1) % row_len(row), row),
            Direction::Up => (col, (row + col_len(col) - 1) % col_len(col)),
            Direction::Down => (col, (row + 1) % col_len(col)),
        };
        debug_assert!(row < rows);
        self.index = row * self.cols + col;
    }
}
