//! Decisions - the nodes of a decision graph.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use world_rules::NamingConfig;

use super::TransitionId;

/// Stable handle of a decision inside one graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DecisionId(pub usize);

impl std::fmt::Display for DecisionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "d{}", self.0)
    }
}

/// Structural role of a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DecisionKind {
    /// An explored (or explicitly created) decision.
    Normal,
    /// Stands in for territory that has not been explored yet.
    Placeholder,
    /// A terminal decision reached through an ending.
    Ending,
}

impl DecisionKind {
    /// Classify a decision by its reserved name prefix.
    pub fn classify(name: &str, naming: &NamingConfig) -> Self {
        if naming.is_placeholder_name(name) {
            DecisionKind::Placeholder
        } else if naming.is_ending_name(name) {
            DecisionKind::Ending
        } else {
            DecisionKind::Normal
        }
    }
}

/// A named point in the explored world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub(crate) name: String,
    pub(crate) kind: DecisionKind,
    pub(crate) tags: BTreeSet<String>,
    pub(crate) annotations: Vec<String>,

    /// Outgoing transitions by name. Names are unique per decision.
    pub(crate) outgoing: BTreeMap<String, TransitionId>,

    /// Transitions that lead here, from any decision.
    pub(crate) incoming: BTreeSet<TransitionId>,
}

impl Decision {
    pub(crate) fn new(name: String, kind: DecisionKind) -> Self {
        Self {
            name,
            kind,
            tags: BTreeSet::new(),
            annotations: Vec::new(),
            outgoing: BTreeMap::new(),
            incoming: BTreeSet::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> DecisionKind {
        self.kind
    }

    pub fn is_placeholder(&self) -> bool {
        self.kind == DecisionKind::Placeholder
    }

    pub fn tags(&self) -> &BTreeSet<String> {
        &self.tags
    }

    pub fn annotations(&self) -> &[String] {
        &self.annotations
    }

    /// Names of the outgoing transitions, in sorted order.
    pub fn transition_names(&self) -> impl Iterator<Item = &str> {
        self.outgoing.keys().map(String::as_str)
    }

    pub(crate) fn has_transition(&self, name: &str) -> bool {
        self.outgoing.contains_key(name)
    }
}
