//! Explorer state - the powers and tokens held at one point in an exploration.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Name of a persistent capability (e.g. "wall-jump").
pub type Power = String;

/// Name of a countable, consumable resource type (e.g. "key").
pub type Token = String;

/// The mutable state of the explorer.
///
/// Every exploration step owns its own copy; mutating one never affects
/// another step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct State {
    /// Powers currently possessed.
    pub powers: BTreeSet<Power>,

    /// Token type -> number held. Counts may go negative when more is spent
    /// than was gained.
    pub tokens: BTreeMap<Token, i64>,

    /// Application-defined state that the core does not interpret.
    #[serde(default)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl State {
    /// Create an empty state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a power (builder form).
    pub fn with_power(mut self, power: impl Into<Power>) -> Self {
        self.gain_power(power);
        self
    }

    /// Set a token count (builder form).
    pub fn with_tokens(mut self, token: impl Into<Token>, count: i64) -> Self {
        self.tokens.insert(token.into(), count);
        self
    }

    pub fn has_power(&self, power: &str) -> bool {
        self.powers.contains(power)
    }

    /// Number of tokens of the given type held, 0 when none were ever gained.
    pub fn token_count(&self, token: &str) -> i64 {
        self.tokens.get(token).copied().unwrap_or(0)
    }

    pub fn gain_power(&mut self, power: impl Into<Power>) {
        self.powers.insert(power.into());
    }

    /// Remove a power. Losing a power that is not held is a no-op.
    pub fn lose_power(&mut self, power: &str) {
        self.powers.remove(power);
    }

    /// Add `delta` tokens of the given type (negative to spend).
    pub fn adjust_tokens(&mut self, token: impl Into<Token>, delta: i64) {
        *self.tokens.entry(token.into()).or_insert(0) += delta;
    }
}
