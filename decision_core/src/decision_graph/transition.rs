//! Transitions - named, directed edges between decisions.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use world_rules::{Requirement, TransitionEffects};

use super::DecisionId;

/// Stable handle of a transition inside one graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TransitionId(pub usize);

impl std::fmt::Display for TransitionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "t{}", self.0)
    }
}

/// Everything about a transition except where it goes.
///
/// Used to add transitions with properties in one call, and to carry
/// properties across when surgery recreates an edge.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransitionProperties {
    #[serde(default)]
    pub requirement: Requirement,
    #[serde(default)]
    pub effects: TransitionEffects,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default)]
    pub annotations: Vec<String>,
}

impl TransitionProperties {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_requirement(mut self, requirement: Requirement) -> Self {
        self.requirement = requirement;
        self
    }

    pub fn with_effects(mut self, effects: TransitionEffects) -> Self {
        self.effects = effects;
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    pub fn with_annotation(mut self, annotation: impl Into<String>) -> Self {
        self.annotations.push(annotation.into());
        self
    }
}

/// Combine the properties of two transitions that are being merged into one.
///
/// Tags are unioned and annotations concatenated (`a` first). Requirements
/// combine into a conjunction unless one side is trivially satisfied.
/// Effects merge with [`TransitionEffects::merge`], which is order
/// sensitive.
pub fn merge_properties(
    a: &TransitionProperties,
    b: &TransitionProperties,
) -> TransitionProperties {
    let requirement = match (&a.requirement, &b.requirement) {
        (Requirement::Nothing, other) | (other, Requirement::Nothing) => other.clone(),
        (x, y) => Requirement::all([x.clone(), y.clone()]),
    };

    TransitionProperties {
        requirement,
        effects: TransitionEffects::merge(&a.effects, &b.effects),
        tags: a.tags.union(&b.tags).cloned().collect(),
        annotations: a.annotations.iter().chain(&b.annotations).cloned().collect(),
    }
}

/// A directed edge of the decision graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    pub(crate) name: String,
    pub(crate) source: DecisionId,
    pub(crate) destination: DecisionId,
    pub(crate) properties: TransitionProperties,

    /// The edge at `destination` that leads back to `source`.
    pub(crate) reciprocal: Option<TransitionId>,
}

impl Transition {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source(&self) -> DecisionId {
        self.source
    }

    pub fn destination(&self) -> DecisionId {
        self.destination
    }

    pub fn reciprocal(&self) -> Option<TransitionId> {
        self.reciprocal
    }

    pub fn properties(&self) -> &TransitionProperties {
        &self.properties
    }

    pub fn requirement(&self) -> &Requirement {
        &self.properties.requirement
    }

    pub fn effects(&self) -> &TransitionEffects {
        &self.properties.effects
    }

    pub fn tags(&self) -> &BTreeSet<String> {
        &self.properties.tags
    }

    pub fn annotations(&self) -> &[String] {
        &self.properties.annotations
    }

    /// Whether this transition starts and ends at the same decision.
    pub fn is_action(&self) -> bool {
        self.source == self.destination
    }
}
