//! One-shot deferred actions.
//!
//! Time only moves when the engine is ticked, so the queue is driven by a
//! millisecond clock owned by the engine rather than by wall time. Every entry
//! carries the episode id of the session that scheduled it.

use crate::types::CardId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeferredAction {
    /// Flip a mismatched pair back over and release the input lock.
    HideMismatch { first: CardId, second: CardId },
    /// Tell the view the game is won.
    AnnounceWin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deferred {
    pub due_ms: u64,
    pub episode_id: u32,
    pub action: DeferredAction,
    /// Insertion order, breaks ties between equal deadlines.
    order: u64,
}

#[derive(Debug, Clone, Default)]
pub struct Scheduler {
    queue: Vec<Deferred>,
    next_order: u64,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, due_ms: u64, episode_id: u32, action: DeferredAction) {
        let order = self.next_order;
        self.next_order = self.next_order.wrapping_add(1);
        self.queue.push(Deferred {
            due_ms,
            episode_id,
            action,
            order,
        });
    }

    /// Remove and return the earliest entry due at or before `now_ms`.
    pub fn pop_due(&mut self, now_ms: u64) -> Option<Deferred> {
        let idx = self
            .queue
            .iter()
            .enumerate()
            .filter(|(_, d)| d.due_ms <= now_ms)
            .min_by_key(|(_, d)| (d.due_ms, d.order))
            .map(|(i, _)| i)?;
        Some(self.queue.swap_remove(idx))
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Entries scheduled by the given episode.
    pub fn pending_for(&self, episode_id: u32) -> usize {
        self.queue
            .iter()
            .filter(|d| d.episode_id == episode_id)
            .count()
    }

    pub fn next_deadline_ms(&self) -> Option<u64> {
        self.queue.iter().map(|d| d.due_ms).min()
    }
}
