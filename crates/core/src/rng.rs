//! RNG module - seeded deck shuffling
//!
//! Decks are shuffled with an in-place Fisher–Yates pass driven by a seeded
//! ChaCha8 stream, so a seed fully determines every deal of a game (useful for
//! replays and agent training) while each permutation stays equally likely.

use rand::{Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Deterministic random source for dealing decks.
#[derive(Debug, Clone)]
pub struct DeckRng {
    seed: u64,
    inner: ChaCha8Rng,
}

impl DeckRng {
    /// Create a new RNG with the given seed
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            inner: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Create an RNG seeded from OS entropy.
    pub fn from_entropy() -> Self {
        Self::new(rand::thread_rng().next_u64())
    }

    /// Seed this RNG was created with.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn next_u32(&mut self) -> u32 {
        self.inner.next_u32()
    }

    /// Uniform value in `[0, bound]` (inclusive).
    pub fn next_inclusive(&mut self, bound: usize) -> usize {
        self.inner.gen_range(0..=bound)
    }

    /// Shuffle a slice using Fisher–Yates.
    ///
    /// Walks from the last index down to 1, swapping each element with a uniformly
    /// chosen index in `[0, i]`.
    pub fn shuffle<T>(&mut self, slice: &mut [T]) {
        for i in (1..slice.len()).rev() {
            let j = self.next_inclusive(i);
            slice.swap(i, j);
        }
    }
}

impl Default for DeckRng {
    fn default() -> Self {
        Self::new(1)
    }
}
