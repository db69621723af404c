//! Decision Graph - the store of decisions and transitions.
//!
//! Decisions and transitions live in an arena keyed by stable handles, with
//! a name index on top. All public operations take names; handles are an
//! internal detail that keeps reciprocal links valid while edges move.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;
use world_rules::{NamingConfig, Requirement, State, TransitionEffects};

use super::{Decision, DecisionId, DecisionKind, Transition, TransitionId, TransitionProperties};
use crate::error::{GraphError, GraphResult};

/// A directed multigraph of named decisions and named transitions.
///
/// Invariants:
/// - every transition's source and destination exist;
/// - transition names are unique among the outgoing edges of a decision;
/// - a transition's reciprocal, when set, is an edge at its destination that
///   leads back to its source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionGraph {
    naming: NamingConfig,

    pub(crate) decisions: BTreeMap<DecisionId, Decision>,
    pub(crate) transitions: BTreeMap<TransitionId, Transition>,

    /// Index: decision name -> handle.
    by_name: BTreeMap<String, DecisionId>,

    next_decision: usize,
    next_transition: usize,

    /// Counter used to mint placeholder names. Never decreases.
    unknown_count: u64,
}

impl Default for DecisionGraph {
    fn default() -> Self {
        Self::with_naming(NamingConfig::default())
    }
}

impl DecisionGraph {
    /// Create a new empty graph with the default reserved names.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_naming(naming: NamingConfig) -> Self {
        Self {
            naming,
            decisions: BTreeMap::new(),
            transitions: BTreeMap::new(),
            by_name: BTreeMap::new(),
            next_decision: 0,
            next_transition: 0,
            unknown_count: 0,
        }
    }

    pub fn naming(&self) -> &NamingConfig {
        &self.naming
    }

    // ---- lookups ---------------------------------------------------------

    pub(crate) fn decision_id(&self, name: &str) -> GraphResult<DecisionId> {
        self.by_name
            .get(name)
            .copied()
            .ok_or_else(|| GraphError::UnknownDecision {
                name: name.to_string(),
            })
    }

    pub(crate) fn transition_id(
        &self,
        decision: &str,
        transition: &str,
    ) -> GraphResult<TransitionId> {
        let id = self.decision_id(decision)?;
        self.decisions[&id]
            .outgoing
            .get(transition)
            .copied()
            .ok_or_else(|| GraphError::UnknownTransition {
                decision: decision.to_string(),
                transition: transition.to_string(),
            })
    }

    pub(crate) fn decision_name(&self, id: DecisionId) -> &str {
        &self.decisions[&id].name
    }

    fn transition_ref(&self, decision: &str, transition: &str) -> GraphResult<&Transition> {
        let id = self.transition_id(decision, transition)?;
        Ok(&self.transitions[&id])
    }

    fn transition_mut(&mut self, decision: &str, transition: &str) -> GraphResult<&mut Transition> {
        let id = self.transition_id(decision, transition)?;
        self.transitions
            .get_mut(&id)
            .ok_or_else(|| GraphError::UnknownTransition {
                decision: decision.to_string(),
                transition: transition.to_string(),
            })
    }

    fn decision_mut(&mut self, name: &str) -> GraphResult<&mut Decision> {
        let id = self.decision_id(name)?;
        self.decisions
            .get_mut(&id)
            .ok_or_else(|| GraphError::UnknownDecision {
                name: name.to_string(),
            })
    }

    pub fn contains_decision(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    pub fn decision(&self, name: &str) -> Option<&Decision> {
        self.by_name.get(name).map(|id| &self.decisions[id])
    }

    pub fn transition(&self, decision: &str, transition: &str) -> Option<&Transition> {
        self.transition_ref(decision, transition).ok()
    }

    /// All decision names, in sorted order.
    pub fn decisions(&self) -> impl Iterator<Item = &str> {
        self.by_name.keys().map(String::as_str)
    }

    pub fn decision_count(&self) -> usize {
        self.decisions.len()
    }

    pub fn transition_count(&self) -> usize {
        self.transitions.len()
    }

    pub fn decision_kind(&self, name: &str) -> GraphResult<DecisionKind> {
        let id = self.decision_id(name)?;
        Ok(self.decisions[&id].kind)
    }

    /// Whether the decision is a placeholder for unexplored territory.
    pub fn is_unknown(&self, name: &str) -> GraphResult<bool> {
        Ok(self.decision_kind(name)? == DecisionKind::Placeholder)
    }

    // ---- arena primitives ------------------------------------------------

    /// Insert a decision without checking for an existing one.
    pub(crate) fn insert_decision(
        &mut self,
        name: String,
        tags: BTreeSet<String>,
        annotations: Vec<String>,
    ) -> DecisionId {
        let id = DecisionId(self.next_decision);
        self.next_decision += 1;

        let kind = DecisionKind::classify(&name, &self.naming);
        let mut decision = Decision::new(name.clone(), kind);
        decision.tags = tags;
        decision.annotations = annotations;
        if kind == DecisionKind::Placeholder {
            decision.tags.insert(self.naming.unknown_tag.clone());
        }

        self.by_name.insert(name, id);
        self.decisions.insert(id, decision);
        id
    }

    /// Insert a transition without checking names.
    pub(crate) fn insert_transition(
        &mut self,
        source: DecisionId,
        name: String,
        destination: DecisionId,
        properties: TransitionProperties,
    ) -> TransitionId {
        let id = TransitionId(self.next_transition);
        self.next_transition += 1;

        if let Some(src) = self.decisions.get_mut(&source) {
            src.outgoing.insert(name.clone(), id);
        }
        if let Some(dest) = self.decisions.get_mut(&destination) {
            dest.incoming.insert(id);
        }
        self.transitions.insert(
            id,
            Transition {
                name,
                source,
                destination,
                properties,
                reciprocal: None,
            },
        );
        id
    }

    /// Remove a transition from the arena and every index, severing any
    /// reciprocal link that names it.
    pub(crate) fn detach_transition(&mut self, id: TransitionId) -> Option<Transition> {
        let transition = self.transitions.remove(&id)?;
        if let Some(src) = self.decisions.get_mut(&transition.source) {
            src.outgoing.remove(&transition.name);
        }
        if let Some(dest) = self.decisions.get_mut(&transition.destination) {
            dest.incoming.remove(&id);
        }
        self.sever_references_to(id, None);
        Some(transition)
    }

    /// Clear the reciprocal of every transition that names `id`, except
    /// `keep`.
    pub(crate) fn sever_references_to(&mut self, id: TransitionId, keep: Option<TransitionId>) {
        for (other, transition) in self.transitions.iter_mut() {
            if transition.reciprocal == Some(id) && Some(*other) != keep {
                transition.reciprocal = None;
            }
        }
    }

    /// Point a transition at a new destination, keeping its handle.
    pub(crate) fn move_destination(&mut self, id: TransitionId, destination: DecisionId) {
        let Some(transition) = self.transitions.get_mut(&id) else {
            return;
        };
        let old = std::mem::replace(&mut transition.destination, destination);
        if let Some(dest) = self.decisions.get_mut(&old) {
            dest.incoming.remove(&id);
        }
        if let Some(dest) = self.decisions.get_mut(&destination) {
            dest.incoming.insert(id);
        }
    }

    /// Move a transition to a new source under a (possibly new) name,
    /// keeping its handle.
    pub(crate) fn move_source(&mut self, id: TransitionId, source: DecisionId, name: String) {
        let Some(transition) = self.transitions.get_mut(&id) else {
            return;
        };
        let old_source = std::mem::replace(&mut transition.source, source);
        let old_name = std::mem::replace(&mut transition.name, name.clone());
        if let Some(src) = self.decisions.get_mut(&old_source) {
            src.outgoing.remove(&old_name);
        }
        if let Some(src) = self.decisions.get_mut(&source) {
            src.outgoing.insert(name, id);
        }
    }

    /// Make `a` and `b` each other's reciprocal, clearing any stale partner
    /// that still points at either of them.
    pub(crate) fn link_reciprocals(&mut self, a: TransitionId, b: TransitionId) {
        self.sever_references_to(a, Some(b));
        self.sever_references_to(b, Some(a));
        for (id, partner) in [(a, b), (b, a)] {
            if let Some(transition) = self.transitions.get_mut(&id) {
                transition.reciprocal = Some(partner);
            }
        }
    }

    // ---- decisions -------------------------------------------------------

    /// Add a new decision with no tags or annotations.
    pub fn add_decision(&mut self, name: &str) -> GraphResult<()> {
        self.add_decision_with(name, &[], &[])
    }

    /// Add a new decision. Names carrying a reserved prefix become
    /// placeholders or endings.
    pub fn add_decision_with(
        &mut self,
        name: &str,
        tags: &[&str],
        annotations: &[&str],
    ) -> GraphResult<()> {
        if self.contains_decision(name) {
            return Err(GraphError::DuplicateDecision {
                name: name.to_string(),
            });
        }
        self.insert_decision(
            name.to_string(),
            tags.iter().map(|t| t.to_string()).collect(),
            annotations.iter().map(|a| a.to_string()).collect(),
        );
        Ok(())
    }

    /// Remove a decision together with every transition into or out of it.
    pub fn remove_decision(&mut self, name: &str) -> GraphResult<()> {
        let id = self.decision_id(name)?;
        self.remove_decision_by_id(id);
        Ok(())
    }

    pub(crate) fn remove_decision_by_id(&mut self, id: DecisionId) {
        let Some(decision) = self.decisions.get(&id) else {
            return;
        };
        let incident: BTreeSet<TransitionId> = decision
            .outgoing
            .values()
            .chain(decision.incoming.iter())
            .copied()
            .collect();
        for transition in incident {
            self.detach_transition(transition);
        }
        if let Some(decision) = self.decisions.remove(&id) {
            debug!(decision = %decision.name, "Removed decision");
            self.by_name.remove(&decision.name);
        }
    }

    pub fn decision_tags(&self, name: &str) -> GraphResult<&BTreeSet<String>> {
        let id = self.decision_id(name)?;
        Ok(&self.decisions[&id].tags)
    }

    pub fn decision_annotations(&self, name: &str) -> GraphResult<&[String]> {
        let id = self.decision_id(name)?;
        Ok(&self.decisions[&id].annotations)
    }

    pub fn tag_decision(&mut self, name: &str, tag: &str) -> GraphResult<()> {
        self.decision_mut(name)?.tags.insert(tag.to_string());
        Ok(())
    }

    /// Remove a tag. Returns whether the tag was present.
    pub fn untag_decision(&mut self, name: &str, tag: &str) -> GraphResult<bool> {
        Ok(self.decision_mut(name)?.tags.remove(tag))
    }

    pub fn annotate_decision(&mut self, name: &str, annotation: &str) -> GraphResult<()> {
        self.decision_mut(name)?
            .annotations
            .push(annotation.to_string());
        Ok(())
    }

    // ---- adding transitions ---------------------------------------------

    /// Fail unless `name` is free at `decision`.
    fn check_free_name(&self, decision: DecisionId, name: &str) -> GraphResult<()> {
        if self.decisions[&decision].has_transition(name) {
            return Err(GraphError::DuplicateEdgeName {
                decision: self.decision_name(decision).to_string(),
                transition: name.to_string(),
            });
        }
        Ok(())
    }

    /// Connect two existing decisions, optionally with a reciprocal edge
    /// named `reciprocal` leading back.
    pub fn add_connecting_edge(
        &mut self,
        from: &str,
        name: &str,
        to: &str,
        reciprocal: Option<&str>,
    ) -> GraphResult<()> {
        self.add_connecting_edge_with(
            from,
            name,
            to,
            reciprocal,
            TransitionProperties::new(),
            TransitionProperties::new(),
        )
    }

    /// Like [`add_connecting_edge`](Self::add_connecting_edge), with
    /// properties for the forward and the reciprocal edge.
    pub fn add_connecting_edge_with(
        &mut self,
        from: &str,
        name: &str,
        to: &str,
        reciprocal: Option<&str>,
        properties: TransitionProperties,
        reciprocal_properties: TransitionProperties,
    ) -> GraphResult<()> {
        let source = self.decision_id(from)?;
        let destination = self.decision_id(to)?;
        self.check_free_name(source, name)?;
        if let Some(rev) = reciprocal {
            self.check_free_name(destination, rev)?;
            if source == destination && rev == name {
                return Err(GraphError::DuplicateEdgeName {
                    decision: from.to_string(),
                    transition: name.to_string(),
                });
            }
        }

        let forward = self.insert_transition(source, name.to_string(), destination, properties);
        if let Some(rev) = reciprocal {
            let back =
                self.insert_transition(destination, rev.to_string(), source, reciprocal_properties);
            self.link_reciprocals(forward, back);
        }
        Ok(())
    }

    fn mint_placeholder_name(&mut self) -> String {
        loop {
            let name = self.naming.placeholder_name(self.unknown_count);
            self.unknown_count += 1;
            if !self.contains_decision(&name) {
                return name;
            }
        }
    }

    /// Add an edge from `from` to a freshly minted placeholder decision.
    ///
    /// Unless `with_reciprocal` is false, a reciprocal edge named by
    /// [`NamingConfig::return_transition`] leads back from the placeholder.
    /// Returns the placeholder's name.
    pub fn add_unexplored_edge(
        &mut self,
        from: &str,
        name: &str,
        with_reciprocal: bool,
    ) -> GraphResult<String> {
        self.add_unexplored_edge_with(
            from,
            name,
            with_reciprocal,
            TransitionProperties::new(),
            TransitionProperties::new(),
        )
    }

    pub fn add_unexplored_edge_with(
        &mut self,
        from: &str,
        name: &str,
        with_reciprocal: bool,
        properties: TransitionProperties,
        reciprocal_properties: TransitionProperties,
    ) -> GraphResult<String> {
        let source = self.decision_id(from)?;
        self.check_free_name(source, name)?;

        let placeholder = self.mint_placeholder_name();
        let destination = self.insert_decision(placeholder.clone(), BTreeSet::new(), Vec::new());
        let forward = self.insert_transition(source, name.to_string(), destination, properties);
        if with_reciprocal {
            let rev = self.naming.return_transition.clone();
            let back = self.insert_transition(destination, rev, source, reciprocal_properties);
            self.link_reciprocals(forward, back);
        }
        Ok(placeholder)
    }

    /// Add a self-edge: an action that can be taken without moving.
    pub fn add_action(
        &mut self,
        decision: &str,
        name: &str,
        requirement: Option<Requirement>,
        effects: Option<TransitionEffects>,
    ) -> GraphResult<()> {
        let id = self.decision_id(decision)?;
        self.check_free_name(id, name)?;
        let properties = TransitionProperties {
            requirement: requirement.unwrap_or_default(),
            effects: effects.unwrap_or_default(),
            ..TransitionProperties::default()
        };
        self.insert_transition(id, name.to_string(), id, properties);
        Ok(())
    }

    /// Add an edge to the shared ending decision for `ending`.
    ///
    /// Both the edge and the ending decision are named with the ending
    /// prefix, and both carry the ending tag. Returns the ending decision's
    /// name.
    pub fn add_ending(&mut self, decision: &str, ending: &str) -> GraphResult<String> {
        self.add_ending_with(decision, ending, TransitionProperties::new())
    }

    pub fn add_ending_with(
        &mut self,
        decision: &str,
        ending: &str,
        mut properties: TransitionProperties,
    ) -> GraphResult<String> {
        let source = self.decision_id(decision)?;
        let name = self.naming.ending_name(ending);
        self.check_free_name(source, &name)?;

        let tag = self.naming.ending_tag.clone();
        let destination = match self.by_name.get(&name) {
            Some(id) => *id,
            None => self.insert_decision(name.clone(), BTreeSet::new(), Vec::new()),
        };
        if let Some(end) = self.decisions.get_mut(&destination) {
            end.tags.insert(tag.clone());
        }
        properties.tags.insert(tag);
        self.insert_transition(source, name.clone(), destination, properties);
        Ok(name)
    }

    /// Remove a single transition, severing its reciprocal link.
    pub fn remove_transition(&mut self, decision: &str, transition: &str) -> GraphResult<()> {
        let id = self.transition_id(decision, transition)?;
        self.detach_transition(id);
        Ok(())
    }

    // ---- transition queries ----------------------------------------------

    /// Destination of a transition, or `None` when it does not exist.
    pub fn get_destination(&self, decision: &str, transition: &str) -> Option<&str> {
        self.transition(decision, transition)
            .map(|t| self.decision_name(t.destination))
    }

    pub fn destination(&self, decision: &str, transition: &str) -> GraphResult<&str> {
        let t = self.transition_ref(decision, transition)?;
        Ok(self.decision_name(t.destination))
    }

    /// Transition name -> destination name for every outgoing edge.
    pub fn destinations_from(&self, decision: &str) -> GraphResult<BTreeMap<&str, &str>> {
        let id = self.decision_id(decision)?;
        Ok(self.decisions[&id]
            .outgoing
            .iter()
            .map(|(name, t)| {
                (
                    name.as_str(),
                    self.decision_name(self.transitions[t].destination),
                )
            })
            .collect())
    }

    /// Every (source, transition) pair leading to `decision`, sorted.
    pub fn all_edges_to(&self, decision: &str) -> GraphResult<Vec<(&str, &str)>> {
        let id = self.decision_id(decision)?;
        let mut edges: Vec<(&str, &str)> = self.decisions[&id]
            .incoming
            .iter()
            .map(|t| {
                let transition = &self.transitions[t];
                (self.decision_name(transition.source), transition.name.as_str())
            })
            .collect();
        edges.sort_unstable();
        Ok(edges)
    }

    /// Names of the self-edges at `decision`.
    pub fn decision_actions(&self, decision: &str) -> GraphResult<Vec<&str>> {
        let id = self.decision_id(decision)?;
        Ok(self.decisions[&id]
            .outgoing
            .iter()
            .filter(|(_, t)| self.transitions[*t].is_action())
            .map(|(name, _)| name.as_str())
            .collect())
    }

    pub fn transition_tags(
        &self,
        decision: &str,
        transition: &str,
    ) -> GraphResult<&BTreeSet<String>> {
        Ok(self.transition_ref(decision, transition)?.tags())
    }

    pub fn transition_annotations(
        &self,
        decision: &str,
        transition: &str,
    ) -> GraphResult<&[String]> {
        Ok(self.transition_ref(decision, transition)?.annotations())
    }

    pub fn tag_transition(
        &mut self,
        decision: &str,
        transition: &str,
        tag: &str,
    ) -> GraphResult<()> {
        self.transition_mut(decision, transition)?
            .properties
            .tags
            .insert(tag.to_string());
        Ok(())
    }

    /// Remove a tag. Returns whether the tag was present.
    pub fn untag_transition(
        &mut self,
        decision: &str,
        transition: &str,
        tag: &str,
    ) -> GraphResult<bool> {
        Ok(self
            .transition_mut(decision, transition)?
            .properties
            .tags
            .remove(tag))
    }

    pub fn annotate_transition(
        &mut self,
        decision: &str,
        transition: &str,
        annotation: &str,
    ) -> GraphResult<()> {
        self.transition_mut(decision, transition)?
            .properties
            .annotations
            .push(annotation.to_string());
        Ok(())
    }

    pub fn get_transition_requirement(
        &self,
        decision: &str,
        transition: &str,
    ) -> GraphResult<&Requirement> {
        Ok(self.transition_ref(decision, transition)?.requirement())
    }

    pub fn set_transition_requirement(
        &mut self,
        decision: &str,
        transition: &str,
        requirement: Requirement,
    ) -> GraphResult<()> {
        self.transition_mut(decision, transition)?.properties.requirement = requirement;
        Ok(())
    }

    pub fn get_transition_effects(
        &self,
        decision: &str,
        transition: &str,
    ) -> GraphResult<&TransitionEffects> {
        Ok(self.transition_ref(decision, transition)?.effects())
    }

    pub fn set_transition_effects(
        &mut self,
        decision: &str,
        transition: &str,
        effects: TransitionEffects,
    ) -> GraphResult<()> {
        self.transition_mut(decision, transition)?.properties.effects = effects;
        Ok(())
    }

    pub fn get_transition_properties(
        &self,
        decision: &str,
        transition: &str,
    ) -> GraphResult<&TransitionProperties> {
        Ok(self.transition_ref(decision, transition)?.properties())
    }

    pub fn set_transition_properties(
        &mut self,
        decision: &str,
        transition: &str,
        properties: TransitionProperties,
    ) -> GraphResult<()> {
        self.transition_mut(decision, transition)?.properties = properties;
        Ok(())
    }

    /// Whether the transition's requirement is satisfied by `state`.
    pub fn is_traversable(
        &self,
        decision: &str,
        transition: &str,
        state: &State,
    ) -> GraphResult<bool> {
        Ok(self
            .get_transition_requirement(decision, transition)?
            .evaluate(state))
    }

    // ---- reciprocals -----------------------------------------------------

    /// Name of the transition's reciprocal, if it has one.
    pub fn transition_reciprocal(
        &self,
        decision: &str,
        transition: &str,
    ) -> GraphResult<Option<&str>> {
        let t = self.transition_ref(decision, transition)?;
        Ok(t.reciprocal.map(|r| self.transitions[&r].name.as_str()))
    }

    /// Set or clear the reciprocal of a transition.
    ///
    /// A reciprocal must exist at the transition's destination and lead
    /// back to `decision`. With `set_both`, the reciprocal is pointed back
    /// at this transition too, and any previous partners of either edge
    /// lose their stale links. Clearing with `set_both` also clears the
    /// other side when it names this transition.
    pub fn set_transition_reciprocal(
        &mut self,
        decision: &str,
        transition: &str,
        reciprocal: Option<&str>,
        set_both: bool,
    ) -> GraphResult<()> {
        let id = self.transition_id(decision, transition)?;
        let Some(rev) = reciprocal else {
            let old = self
                .transitions
                .get_mut(&id)
                .and_then(|t| t.reciprocal.take());
            if let (true, Some(old)) = (set_both, old) {
                if let Some(partner) = self.transitions.get_mut(&old) {
                    if partner.reciprocal == Some(id) {
                        partner.reciprocal = None;
                    }
                }
            }
            return Ok(());
        };

        let (source, destination) = {
            let t = &self.transitions[&id];
            (t.source, t.destination)
        };
        let invalid = |reason: String| GraphError::InvalidReciprocal {
            decision: decision.to_string(),
            transition: transition.to_string(),
            reciprocal: rev.to_string(),
            reason,
        };
        let rev_id = self.decisions[&destination]
            .outgoing
            .get(rev)
            .copied()
            .ok_or_else(|| {
                invalid(format!(
                    "'{}' has no such transition",
                    self.decision_name(destination)
                ))
            })?;
        let back_to = self.transitions[&rev_id].destination;
        if back_to != source {
            return Err(invalid(format!(
                "it leads to '{}' instead of back to '{}'",
                self.decision_name(back_to),
                decision
            )));
        }

        if set_both {
            self.link_reciprocals(id, rev_id);
        } else if let Some(t) = self.transitions.get_mut(&id) {
            t.reciprocal = Some(rev_id);
        }
        debug!(decision, transition, reciprocal = rev, set_both, "Set reciprocal");
        Ok(())
    }
}

/// Make `base` unique among the names for which `taken` is true.
///
/// Returns `base` itself when free. Otherwise a numeric suffix is counted
/// up until the name is free: from 1 for a plain name, or from one past the
/// suffix `base` already carries, so `door.1` becomes `door.2` rather than
/// `door.1.1`.
pub fn unique_name(base: &str, taken: impl Fn(&str) -> bool, separator: &str) -> String {
    if !taken(base) {
        return base.to_string();
    }
    let (stem, mut n) = match base.rsplit_once(separator) {
        Some((stem, suffix))
            if !stem.is_empty() && suffix.bytes().all(|b| b.is_ascii_digit()) =>
        {
            match suffix.parse::<u64>() {
                Ok(n) => (stem, n.saturating_add(1)),
                Err(_) => (base, 1),
            }
        }
        _ => (base, 1),
    };
    loop {
        let candidate = format!("{}{}{}", stem, separator, n);
        if !taken(&candidate) {
            return candidate;
        }
        n = n.saturating_add(1);
    }
}
