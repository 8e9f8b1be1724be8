//! Engine configuration.

use std::env;

use crate::types::{MISMATCH_DELAY_MS, WIN_DELAY_MS};

/// Gameplay settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameConfig {
    /// Deck seed. `None` draws one from OS entropy.
    pub seed: Option<u64>,
    pub mismatch_delay_ms: u32,
    pub win_delay_ms: u32,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            seed: None,
            mismatch_delay_ms: MISMATCH_DELAY_MS,
            win_delay_ms: WIN_DELAY_MS,
        }
    }
}

impl GameConfig {
    /// Seeded config with default delays.
    pub fn seeded(seed: u64) -> Self {
        Self {
            seed: Some(seed),
            ..Self::default()
        }
    }

    /// Create from environment variables.
    ///
    /// - `PAIRS_SEED`: deck seed (u64)
    /// - `PAIRS_MISMATCH_DELAY_MS`: mismatch reveal time
    /// - `PAIRS_WIN_DELAY_MS`: delay before the win announcement
    ///
    /// Malformed values fall back to the defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Same as [`GameConfig::from_env`], reading variables through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        fn var<T: std::str::FromStr>(
            lookup: &impl Fn(&str) -> Option<String>,
            name: &str,
        ) -> Option<T> {
            lookup(name).and_then(|raw| parse_value(name, &raw))
        }
        let defaults = Self::default();
        Self {
            seed: var(&lookup, "PAIRS_SEED"),
            mismatch_delay_ms: var(&lookup, "PAIRS_MISMATCH_DELAY_MS").unwrap_or(defaults.mismatch_delay_ms),
            win_delay_ms: var(&lookup, "PAIRS_WIN_DELAY_MS").unwrap_or(defaults.win_delay_ms),
        }
    }
}

/// Parse a trimmed variable value. Blank values are unset; malformed ones are
/// logged and dropped.
fn parse_value<T: std::str::FromStr>(name: &str, raw: &str) -> Option<T> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    match trimmed.parse() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!(var = name, value = trimmed, "ignoring malformed value");
            None
        }
    }
}
