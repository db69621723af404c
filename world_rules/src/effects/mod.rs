//! Transition effects - the changes to explorer state and to the graph that
//! happen when a transition is taken.
//!
//! Effects are plain data here. Applying them needs a decision graph and
//! lives with the graph store in `decision_core`.

use serde::{Deserialize, Serialize};

use crate::error::{RulesError, RulesResult};
use crate::requirement::Requirement;
use crate::state::{Power, Token};

/// One entry of a gain or lose list.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Grant {
    Power(Power),
    /// A token type and an amount.
    Tokens(Token, i64),
}

/// Replaces the requirement of one transition. `None` clears it back to
/// always-satisfied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alteration {
    pub decision: String,
    pub transition: String,
    pub requirement: Option<Requirement>,
}

/// What a list of tag deltas applies to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TagTarget {
    Decision(String),
    /// A (decision, transition) pair.
    Transition(String, String),
}

/// An ordered list of `+tag` / `-tag` instructions for one target.
///
/// Deltas are kept as written and validated when applied, so a malformed
/// entry surfaces as an error at the point of use.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagChange {
    pub target: TagTarget,
    pub deltas: Vec<String>,
}

impl TagChange {
    pub fn new(target: TagTarget, deltas: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            target,
            deltas: deltas.into_iter().map(Into::into).collect(),
        }
    }

    /// Parse every delta, failing on the first malformed one.
    pub fn parsed_deltas(&self) -> RulesResult<Vec<TagDelta>> {
        self.deltas.iter().map(|d| TagDelta::parse(d)).collect()
    }
}

/// A single parsed tag instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagDelta {
    Add(String),
    Remove(String),
}

impl TagDelta {
    /// Parse `+tag` or `-tag`.
    pub fn parse(delta: &str) -> RulesResult<Self> {
        if let Some(tag) = delta.strip_prefix('+') {
            Ok(TagDelta::Add(tag.to_string()))
        } else if let Some(tag) = delta.strip_prefix('-') {
            Ok(TagDelta::Remove(tag.to_string()))
        } else {
            Err(RulesError::MalformedTagDelta {
                delta: delta.to_string(),
            })
        }
    }
}

/// The effects of traversing a transition.
///
/// `next` and `cycle` control what the transition carries after it fires;
/// see [`TransitionEffects::advanced`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransitionEffects {
    #[serde(default)]
    pub gain: Vec<Grant>,
    #[serde(default)]
    pub lose: Vec<Grant>,
    #[serde(default)]
    pub alters: Vec<Alteration>,
    #[serde(default)]
    pub tags: Vec<TagChange>,
    #[serde(default)]
    pub next: Option<Box<TransitionEffects>>,
    #[serde(default)]
    pub cycle: bool,
}

impl TransitionEffects {
    /// Create an empty (no-op) effects record.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_gain(mut self, grant: Grant) -> Self {
        self.gain.push(grant);
        self
    }

    pub fn with_gains(mut self, grants: impl IntoIterator<Item = Grant>) -> Self {
        self.gain.extend(grants);
        self
    }

    pub fn with_loss(mut self, grant: Grant) -> Self {
        self.lose.push(grant);
        self
    }

    pub fn with_alteration(
        mut self,
        decision: impl Into<String>,
        transition: impl Into<String>,
        requirement: Option<Requirement>,
    ) -> Self {
        self.alters.push(Alteration {
            decision: decision.into(),
            transition: transition.into(),
            requirement,
        });
        self
    }

    pub fn with_tag_change(mut self, change: TagChange) -> Self {
        self.tags.push(change);
        self
    }

    pub fn with_next(mut self, next: TransitionEffects) -> Self {
        self.next = Some(Box::new(next));
        self
    }

    /// Mark these effects as cycling.
    pub fn cycling(mut self) -> Self {
        self.cycle = true;
        self
    }

    /// Whether applying these effects would change nothing, now or later.
    pub fn is_empty(&self) -> bool {
        self.gain.is_empty()
            && self.lose.is_empty()
            && self.alters.is_empty()
            && self.tags.is_empty()
            && self.next.is_none()
            && !self.cycle
    }

    /// Merge two effects records.
    ///
    /// Gain, lose, and alters lists are concatenated with `a` first. Tag
    /// changes with the same target have their delta lists concatenated in
    /// the same order; other tag changes pass through. `next` records merge
    /// recursively and `cycle` is the OR of both sides.
    ///
    /// This is not symmetric: `merge(a, b)` and `merge(b, a)` replay tag
    /// deltas in different orders, and chained `next`/`cycle` effects can be
    /// distorted when both sides carry them.
    pub fn merge(a: &TransitionEffects, b: &TransitionEffects) -> TransitionEffects {
        let mut tags = Vec::with_capacity(a.tags.len() + b.tags.len());
        let mut consumed = vec![false; b.tags.len()];

        for change in &a.tags {
            let mut merged = change.clone();
            // Only the first `a` entry for a target absorbs `b`'s entries
            for (i, other) in b.tags.iter().enumerate() {
                if !consumed[i] && other.target == change.target {
                    merged.deltas.extend(other.deltas.iter().cloned());
                    consumed[i] = true;
                }
            }
            tags.push(merged);
        }
        tags.extend(
            b.tags
                .iter()
                .zip(consumed)
                .filter(|(_, used)| !used)
                .map(|(change, _)| change.clone()),
        );

        let next = match (&a.next, &b.next) {
            (None, None) => None,
            (Some(n), None) | (None, Some(n)) => Some(n.clone()),
            (Some(x), Some(y)) => Some(Box::new(TransitionEffects::merge(x, y))),
        };

        TransitionEffects {
            gain: a.gain.iter().chain(&b.gain).cloned().collect(),
            lose: a.lose.iter().chain(&b.lose).cloned().collect(),
            alters: a.alters.iter().chain(&b.alters).cloned().collect(),
            tags,
            next,
            cycle: a.cycle || b.cycle,
        }
    }

    /// The effects a transition carries after these effects have fired.
    ///
    /// With a `next` record, that record takes over; if these effects cycle
    /// they are appended (without their own `next`) to the end of the new
    /// chain so they come around again. Without a `next`, cycling effects
    /// stay as they are and non-cycling ones are discarded.
    pub fn advanced(&self) -> TransitionEffects {
        match &self.next {
            None if self.cycle => self.clone(),
            None => TransitionEffects::new(),
            Some(next) => {
                let mut successor = (**next).clone();
                if self.cycle {
                    let mut again = self.clone();
                    again.next = None;
                    successor.push_tail(again);
                }
                successor
            }
        }
    }

    /// Attach `tail` after the last record of this chain.
    fn push_tail(&mut self, tail: TransitionEffects) {
        let mut slot = &mut self.next;
        while let Some(next) = slot {
            slot = &mut next.next;
        }
        *slot = Some(Box::new(tail));
    }

    /// Number of records in the `next` chain, counting this one.
    pub fn chain_len(&self) -> usize {
        let mut len = 1;
        let mut cursor = self;
        while let Some(next) = &cursor.next {
            len += 1;
            cursor = next;
        }
        len
    }
}
