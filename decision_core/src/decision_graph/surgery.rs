//! Graph surgery - operations that move edges around while keeping the
//! reciprocal invariant intact.

use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;
use world_rules::{Requirement, TransitionEffects};

use super::{
    merge_properties, unique_name, DecisionGraph, DecisionId, TransitionId, TransitionProperties,
};
use crate::error::{GraphError, GraphResult};

/// Extra properties layered onto the edges and the decision produced by
/// [`DecisionGraph::replace_unexplored`].
///
/// Requirements and effects replace whatever the merged edges carried;
/// tags and annotations extend it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReplaceOptions {
    pub requirement: Option<Requirement>,
    pub effects: Option<TransitionEffects>,
    pub tags: Vec<String>,
    pub annotations: Vec<String>,

    pub reciprocal_requirement: Option<Requirement>,
    pub reciprocal_effects: Option<TransitionEffects>,
    pub reciprocal_tags: Vec<String>,
    pub reciprocal_annotations: Vec<String>,

    /// Added to the decision the placeholder resolves into.
    pub decision_tags: Vec<String>,
    pub decision_annotations: Vec<String>,
}

impl ReplaceOptions {
    fn layer_primary(&self, props: &mut TransitionProperties) {
        layer(props, &self.requirement, &self.effects, &self.tags, &self.annotations);
    }

    fn layer_reciprocal(&self, props: &mut TransitionProperties) {
        layer(
            props,
            &self.reciprocal_requirement,
            &self.reciprocal_effects,
            &self.reciprocal_tags,
            &self.reciprocal_annotations,
        );
    }
}

fn layer(
    props: &mut TransitionProperties,
    requirement: &Option<Requirement>,
    effects: &Option<TransitionEffects>,
    tags: &[String],
    annotations: &[String],
) {
    if let Some(requirement) = requirement {
        props.requirement = requirement.clone();
    }
    if let Some(effects) = effects {
        props.effects = effects.clone();
    }
    props.tags.extend(tags.iter().cloned());
    props.annotations.extend(annotations.iter().cloned());
}

/// An edge that will be retargeted, with the new name of its reciprocal
/// if that reciprocal moves along with it.
struct Redirect {
    edge: TransitionId,
    relocate: Option<(TransitionId, String)>,
}

impl DecisionGraph {
    /// Point an existing transition at a different destination.
    ///
    /// Nothing happens when the destination does not change. With
    /// `swap_reciprocal`, the transition's reciprocal moves to leave from
    /// the new destination instead; if its name is taken there, the call
    /// fails with [`GraphError::NameCollision`] unless
    /// `error_on_collision` is false, in which case the moved reciprocal
    /// gets a fresh [`unique_name`]. Without `swap_reciprocal` the
    /// reciprocal link is severed on both sides and the old reciprocal edge
    /// stays where it is.
    pub fn retarget_transition(
        &mut self,
        decision: &str,
        transition: &str,
        new_destination: &str,
        swap_reciprocal: bool,
        error_on_collision: bool,
    ) -> GraphResult<()> {
        let id = self.transition_id(decision, transition)?;
        let target = self.decision_id(new_destination)?;
        if self.transitions[&id].destination == target {
            return Ok(());
        }

        let relocate = if swap_reciprocal {
            self.plan_relocation(
                id,
                Some(target),
                new_destination,
                error_on_collision,
                &BTreeSet::new(),
            )?
        } else {
            None
        };

        debug!(
            decision,
            transition,
            to = new_destination,
            swap_reciprocal,
            "Retargeting transition"
        );
        self.apply_redirect(Redirect { edge: id, relocate }, target);
        Ok(())
    }

    /// Work out whether the reciprocal of `edge` can move to leave from
    /// `target`, and under which name.
    ///
    /// `target` is `None` when the decision is about to be created. `claimed`
    /// holds names at the target reserved by other parts of the same
    /// operation.
    fn plan_relocation(
        &self,
        edge: TransitionId,
        target: Option<DecisionId>,
        target_name: &str,
        error_on_collision: bool,
        claimed: &BTreeSet<String>,
    ) -> GraphResult<Option<(TransitionId, String)>> {
        let Some(rev) = self.transitions[&edge].reciprocal else {
            return Ok(None);
        };
        if rev == edge {
            return Ok(None);
        }
        let name = &self.transitions[&rev].name;
        let outgoing = target.map(|t| &self.decisions[&t].outgoing);
        // The reciprocal may already leave from the target under its own name
        let taken = |candidate: &str| {
            claimed.contains(candidate)
                || outgoing
                    .and_then(|o| o.get(candidate))
                    .is_some_and(|other| *other != rev)
        };
        if !taken(name.as_str()) {
            return Ok(Some((rev, name.clone())));
        }
        if error_on_collision {
            return Err(GraphError::NameCollision {
                decision: target_name.to_string(),
                transition: name.clone(),
            });
        }
        Ok(Some((
            rev,
            unique_name(name, taken, &self.naming().suffix_separator),
        )))
    }

    /// Carry out a validated retarget. Cannot fail.
    fn apply_redirect(&mut self, redirect: Redirect, target: DecisionId) {
        let Redirect { edge, relocate } = redirect;
        self.move_destination(edge, target);
        match relocate {
            Some((rev, name)) => {
                self.move_source(rev, target, name);
                self.link_reciprocals(edge, rev);
            }
            None => {
                if let Some(t) = self.transitions.get_mut(&edge) {
                    t.reciprocal = None;
                }
                self.sever_references_to(edge, None);
            }
        }
    }

    /// Resolve the placeholder at the end of `(decision, transition)` into
    /// the decision `connect_to`, creating it if needed.
    ///
    /// Every other edge that led to the placeholder is retargeted to
    /// `connect_to`, taking its reciprocal along. The placeholder is then
    /// removed, and the primary edge is recreated to lead to `connect_to`.
    /// When `reciprocal` is given, an edge of that name leads back from
    /// `connect_to`; if `connect_to` already has an edge of that name it
    /// must lead to a placeholder, which is resolved into `decision` the
    /// same way and whose edge properties are merged in.
    ///
    /// Validation happens up front; on error the graph is unchanged.
    pub fn replace_unexplored(
        &mut self,
        decision: &str,
        transition: &str,
        connect_to: &str,
        reciprocal: Option<&str>,
        options: ReplaceOptions,
    ) -> GraphResult<()> {
        let primary = self.transition_id(decision, transition)?;
        let from = self.transitions[&primary].source;
        let placeholder = self.transitions[&primary].destination;
        let placeholder_name = self.decision_name(placeholder).to_string();

        if !self.decisions[&placeholder].is_placeholder() {
            return Err(GraphError::NotUnexplored {
                decision: decision.to_string(),
                transition: transition.to_string(),
                destination: placeholder_name,
            });
        }
        let merge_error = |reason: String| GraphError::PlaceholderMerge {
            placeholder: placeholder_name.clone(),
            reason,
        };
        if from == placeholder {
            return Err(merge_error(format!(
                "'{}' leaves from the placeholder itself",
                transition
            )));
        }

        let existing = self.decision_id(connect_to).ok();
        match existing {
            Some(id) if id == placeholder => {
                return Err(merge_error("it cannot be resolved into itself".to_string()))
            }
            Some(id) if self.decisions[&id].is_placeholder() => {
                return Err(merge_error(format!("'{}' is itself unexplored", connect_to)))
            }
            None if self.naming().is_placeholder_name(connect_to) => {
                return Err(merge_error(format!(
                    "'{}' is a reserved placeholder name",
                    connect_to
                )))
            }
            _ => {}
        }

        // An existing `connect_to -> reciprocal` edge must lead to a
        // placeholder, which gets resolved into `from`.
        let mut adopted: Option<(TransitionId, DecisionId)> = None;
        if let (Some(rev), Some(target)) = (reciprocal, existing) {
            if target == from && rev == transition {
                return Err(GraphError::DuplicateEdgeName {
                    decision: decision.to_string(),
                    transition: transition.to_string(),
                });
            }
            if let Some(rev_id) = self.decisions[&target].outgoing.get(rev).copied() {
                let other = self.transitions[&rev_id].destination;
                if !self.decisions[&other].is_placeholder() {
                    return Err(GraphError::ReciprocalNotUnknown {
                        decision: connect_to.to_string(),
                        transition: rev.to_string(),
                        destination: self.decision_name(other).to_string(),
                    });
                }
                adopted = Some((rev_id, other));
            }
        }
        let second = adopted
            .map(|(_, other)| other)
            .filter(|other| *other != placeholder);

        // Plan every redirect before touching anything
        let leaving = |source: DecisionId| source == placeholder || Some(source) == second;
        let primary_rev = self.transitions[&primary].reciprocal;
        let adopted_edge = adopted.map(|(edge, _)| edge);

        // Names reserved per receiving decision (`None` is the one about to
        // be created). Resolving into `from` itself shares one entry.
        let mut claimed: BTreeMap<Option<DecisionId>, BTreeSet<String>> = BTreeMap::new();
        if let Some(rev) = reciprocal {
            claimed.entry(existing).or_default().insert(rev.to_string());
        }

        let mut into_target = Vec::new();
        for edge in self.decisions[&placeholder].incoming.iter().copied() {
            let source = self.transitions[&edge].source;
            if edge == primary || Some(edge) == adopted_edge || leaving(source) {
                continue;
            }
            // A reciprocal shared with the primary edge is replaced, not moved
            let relocate = if self.transitions[&edge].reciprocal == primary_rev {
                None
            } else {
                let names = claimed.entry(existing).or_default();
                let relocate = self.plan_relocation(edge, existing, connect_to, true, names)?;
                if let Some((_, name)) = &relocate {
                    names.insert(name.clone());
                }
                relocate
            };
            into_target.push((edge, relocate));
        }

        let mut into_from = Vec::new();
        if let Some(other) = second {
            for edge in self.decisions[&other].incoming.iter().copied() {
                let source = self.transitions[&edge].source;
                if Some(edge) == adopted_edge || leaving(source) {
                    continue;
                }
                let names = claimed.entry(Some(from)).or_default();
                let relocate = self.plan_relocation(edge, Some(from), decision, true, names)?;
                if let Some((_, name)) = &relocate {
                    names.insert(name.clone());
                }
                into_from.push((edge, relocate));
            }
        }

        debug!(
            decision,
            transition,
            placeholder = %placeholder_name,
            connect_to,
            redirected = into_target.len() + into_from.len(),
            "Resolving placeholder"
        );

        // Create or augment the resolved decision
        let target = match existing {
            Some(id) => {
                if let Some(d) = self.decisions.get_mut(&id) {
                    d.tags.extend(options.decision_tags.iter().cloned());
                    d.annotations.extend(options.decision_annotations.iter().cloned());
                }
                id
            }
            None => self.insert_decision(
                connect_to.to_string(),
                options.decision_tags.iter().cloned().collect(),
                options.decision_annotations.clone(),
            ),
        };

        for (edge, relocate) in into_target {
            self.apply_redirect(Redirect { edge, relocate }, target);
        }
        for (edge, relocate) in into_from {
            self.apply_redirect(Redirect { edge, relocate }, from);
        }

        // Capture what the merged edges carried
        let props_of = |graph: &DecisionGraph, id: Option<TransitionId>| {
            id.and_then(|id| graph.transitions.get(&id))
                .map(|t| t.properties.clone())
                .unwrap_or_default()
        };
        let adopted_rev = adopted_edge
            .and_then(|edge| self.transitions[&edge].reciprocal)
            .filter(|r| Some(*r) != primary_rev);
        let mut primary_props = merge_properties(
            &props_of(self, Some(primary)),
            &props_of(self, adopted_rev),
        );
        let mut reverse_props = merge_properties(
            &props_of(self, primary_rev.filter(|_| reciprocal.is_some())),
            &props_of(self, adopted_edge),
        );

        // Drop the placeholder(s); this takes the primary edge with it
        self.remove_decision_by_id(placeholder);
        if let Some(other) = second {
            self.remove_decision_by_id(other);
        }

        let unknown_tag = self.naming().unknown_tag.clone();
        primary_props.tags.remove(&unknown_tag);
        options.layer_primary(&mut primary_props);
        let forward = self.insert_transition(from, transition.to_string(), target, primary_props);

        if let Some(rev) = reciprocal {
            reverse_props.tags.remove(&unknown_tag);
            options.layer_reciprocal(&mut reverse_props);
            let back = self.insert_transition(target, rev.to_string(), from, reverse_props);
            self.link_reciprocals(forward, back);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use world_rules::Grant;

    /// Names of the edges leaving each decision, for tests that compare shapes.
    fn shape(graph: &DecisionGraph) -> BTreeMap<String, BTreeMap<String, String>> {
        graph
            .decisions()
            .map(|d| {
                let dests: BTreeMap<String, String> = graph
                    .destinations_from(d)
                    .map(|m| {
                        m.into_iter()
                            .map(|(k, v)| (k.to_string(), v.to_string()))
                            .collect()
                    })
                    .unwrap_or_default();
                (d.to_string(), dests)
            })
            .collect()
    }

    fn assert_consistent(graph: &DecisionGraph) {
        for (id, t) in &graph.transitions {
            assert!(graph.decisions.contains_key(&t.source), "{} has no source", id);
            assert!(graph.decisions.contains_key(&t.destination), "{} has no destination", id);
            if let Some(r) = t.reciprocal {
                let rev = &graph.transitions[&r];
                assert_eq!(rev.source, t.destination);
                assert_eq!(rev.destination, t.source);
            }
        }
    }

    fn edges(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn triangle() -> DecisionGraph {
        let mut graph = DecisionGraph::new();
        for name in ["A", "B", "C"] {
            graph.add_decision(name).unwrap();
        }
        graph.add_connecting_edge("A", "east", "B", Some("west")).unwrap();
        graph
    }

    #[test]
    fn test_retarget_same_destination_is_noop() {
        let mut graph = triangle();
        let before = graph.clone();
        graph
            .retarget_transition("A", "east", "B", true, true)
            .unwrap();
        assert_eq!(graph, before);
        graph
            .retarget_transition("A", "east", "B", false, false)
            .unwrap();
        assert_eq!(graph, before);
    }

    #[test]
    fn test_retarget_swaps_reciprocal() {
        let mut graph = triangle();
        graph
            .set_transition_requirement("B", "west", Requirement::power("climb"))
            .unwrap();
        graph
            .retarget_transition("A", "east", "C", true, true)
            .unwrap();

        assert_eq!(graph.destination("A", "east").unwrap(), "C");
        assert_eq!(graph.destination("C", "west").unwrap(), "A");
        assert!(graph.get_destination("B", "west").is_none());
        assert_eq!(graph.transition_reciprocal("A", "east").unwrap(), Some("west"));
        assert_eq!(graph.transition_reciprocal("C", "west").unwrap(), Some("east"));
        assert_eq!(
            graph.get_transition_requirement("C", "west").unwrap(),
            &Requirement::power("climb")
        );
        assert_consistent(&graph);
    }

    #[test]
    fn test_retarget_without_swap_severs() {
        let mut graph = triangle();
        graph
            .retarget_transition("A", "east", "C", false, true)
            .unwrap();

        assert_eq!(graph.destination("A", "east").unwrap(), "C");
        assert_eq!(graph.destination("B", "west").unwrap(), "A");
        assert_eq!(graph.transition_reciprocal("A", "east").unwrap(), None);
        assert_eq!(graph.transition_reciprocal("B", "west").unwrap(), None);
        assert_consistent(&graph);
    }

    #[test]
    fn test_retarget_collision() {
        let mut graph = triangle();
        graph.add_connecting_edge("C", "west", "B", None).unwrap();
        let before = graph.clone();

        let err = graph
            .retarget_transition("A", "east", "C", true, true)
            .unwrap_err();
        assert!(
            matches!(err, GraphError::NameCollision { ref decision, ref transition }
                if decision == "C" && transition == "west")
        );
        assert_eq!(graph, before);

        graph
            .retarget_transition("A", "east", "C", true, false)
            .unwrap();
        assert_eq!(graph.transition_reciprocal("A", "east").unwrap(), Some("west.1"));
        assert_eq!(graph.destination("C", "west.1").unwrap(), "A");
        assert_eq!(graph.destination("C", "west").unwrap(), "B");
        assert_consistent(&graph);
    }

    #[test]
    fn test_retarget_unknown_names() {
        let mut graph = triangle();
        assert!(matches!(
            graph.retarget_transition("A", "up", "C", true, true),
            Err(GraphError::UnknownTransition { .. })
        ));
        assert!(matches!(
            graph.retarget_transition("A", "east", "D", true, true),
            Err(GraphError::UnknownDecision { .. })
        ));
    }

    #[test]
    fn test_replace_unexplored_round_trip() {
        let mut graph = DecisionGraph::new();
        graph.add_decision("A").unwrap();
        let placeholder = graph.add_unexplored_edge("A", "n", true).unwrap();

        graph
            .replace_unexplored("A", "n", "B", None, ReplaceOptions::default())
            .unwrap();

        assert_eq!(graph.destination("A", "n").unwrap(), "B");
        assert!(!graph.contains_decision(&placeholder));
        for (_, t) in &graph.transitions {
            assert_ne!(graph.decision_name(t.source), placeholder);
            assert_ne!(graph.decision_name(t.destination), placeholder);
        }
        assert_eq!(graph.transition_reciprocal("A", "n").unwrap(), None);
        assert_consistent(&graph);
    }

    #[test]
    fn test_replace_unexplored_with_reciprocal() {
        let mut graph = DecisionGraph::new();
        graph.add_decision("Hall").unwrap();
        graph.add_unexplored_edge("Hall", "north", true).unwrap();

        graph
            .replace_unexplored(
                "Hall",
                "north",
                "Kitchen",
                Some("south"),
                ReplaceOptions::default(),
            )
            .unwrap();

        assert_eq!(graph.destination("Kitchen", "south").unwrap(), "Hall");
        assert_eq!(graph.transition_reciprocal("Hall", "north").unwrap(), Some("south"));
        assert_eq!(graph.transition_reciprocal("Kitchen", "south").unwrap(), Some("north"));
        assert!(graph.get_destination("Kitchen", "return").is_none());
        assert_eq!(graph.decision_count(), 2);
        assert_consistent(&graph);
    }

    #[test]
    fn test_replace_keeps_properties_and_layers_options() {
        let mut graph = DecisionGraph::new();
        graph.add_decision("Hall").unwrap();
        graph
            .add_unexplored_edge_with(
                "Hall",
                "north",
                true,
                TransitionProperties::new()
                    .with_requirement(Requirement::power("lamp"))
                    .with_tag("dark")
                    .with_tag("unknown")
                    .with_annotation("drafty"),
                TransitionProperties::new().with_tag("steep"),
            )
            .unwrap();

        let options = ReplaceOptions {
            effects: Some(TransitionEffects::new().with_gain(Grant::Power("map".into()))),
            tags: vec!["explored".into()],
            reciprocal_requirement: Some(Requirement::tokens("rope", 1)),
            decision_tags: vec!["warm".into()],
            ..ReplaceOptions::default()
        };
        graph
            .replace_unexplored("Hall", "north", "Kitchen", Some("south"), options)
            .unwrap();

        let forward = graph.get_transition_properties("Hall", "north").unwrap();
        assert_eq!(forward.requirement, Requirement::power("lamp"));
        assert!(forward.tags.contains("dark"));
        assert!(forward.tags.contains("explored"));
        assert!(!forward.tags.contains("unknown"));
        assert_eq!(forward.annotations, vec!["drafty"]);
        assert_eq!(forward.effects.gain, vec![Grant::Power("map".into())]);

        let back = graph.get_transition_properties("Kitchen", "south").unwrap();
        assert!(back.tags.contains("steep"));
        assert_eq!(back.requirement, Requirement::tokens("rope", 1));
        assert!(graph.decision_tags("Kitchen").unwrap().contains("warm"));
    }

    #[test]
    fn test_replace_merges_other_incoming_edges() {
        // Two doors into the same unexplored room
        let mut graph = DecisionGraph::new();
        graph.add_decision("Hall").unwrap();
        graph.add_decision("Study").unwrap();
        let room = graph.add_unexplored_edge("Hall", "north", true).unwrap();
        graph
            .add_connecting_edge("Study", "east", &room, Some("west"))
            .unwrap();

        graph
            .replace_unexplored(
                "Hall",
                "north",
                "Library",
                Some("south"),
                ReplaceOptions::default(),
            )
            .unwrap();

        assert_eq!(graph.destination("Study", "east").unwrap(), "Library");
        assert_eq!(graph.destination("Library", "west").unwrap(), "Study");
        assert_eq!(graph.transition_reciprocal("Study", "east").unwrap(), Some("west"));
        assert_eq!(
            shape(&graph),
            BTreeMap::from([
                ("Hall".to_string(), edges(&[("north", "Library")])),
                ("Library".to_string(), edges(&[("south", "Hall"), ("west", "Study")])),
                ("Study".to_string(), edges(&[("east", "Library")])),
            ])
        );
        assert_consistent(&graph);
    }

    #[test]
    fn test_replace_into_existing_decision() {
        let mut graph = DecisionGraph::new();
        graph.add_decision("Hall").unwrap();
        graph.add_decision("Kitchen").unwrap();
        graph.add_unexplored_edge("Hall", "north", true).unwrap();
        graph.add_unexplored_edge("Kitchen", "south", true).unwrap();

        graph
            .replace_unexplored(
                "Hall",
                "north",
                "Kitchen",
                Some("south"),
                ReplaceOptions::default(),
            )
            .unwrap();

        // Both placeholders are gone and the two sides are linked
        assert_eq!(graph.decisions().collect::<Vec<_>>(), vec!["Hall", "Kitchen"]);
        assert_eq!(graph.destination("Hall", "north").unwrap(), "Kitchen");
        assert_eq!(graph.destination("Kitchen", "south").unwrap(), "Hall");
        assert_eq!(graph.transition_reciprocal("Kitchen", "south").unwrap(), Some("north"));
        assert_eq!(graph.transition_count(), 2);
        assert_consistent(&graph);
    }

    #[test]
    fn test_replace_merges_second_placeholder_properties() {
        let mut graph = DecisionGraph::new();
        graph.add_decision("Hall").unwrap();
        graph.add_decision("Kitchen").unwrap();
        graph.add_unexplored_edge("Hall", "north", true).unwrap();
        graph
            .add_unexplored_edge_with(
                "Kitchen",
                "south",
                true,
                TransitionProperties::new().with_tag("tiled"),
                TransitionProperties::new().with_requirement(Requirement::power("key")),
            )
            .unwrap();

        graph
            .replace_unexplored(
                "Hall",
                "north",
                "Kitchen",
                Some("south"),
                ReplaceOptions::default(),
            )
            .unwrap();

        assert!(graph.transition_tags("Kitchen", "south").unwrap().contains("tiled"));
        assert_eq!(
            graph.get_transition_requirement("Hall", "north").unwrap(),
            &Requirement::power("key")
        );
    }

    #[test]
    fn test_replace_same_placeholder_adopts_edge() {
        // Kitchen already has a door into the very room being resolved
        let mut graph = DecisionGraph::new();
        graph.add_decision("Hall").unwrap();
        graph.add_decision("Kitchen").unwrap();
        let room = graph.add_unexplored_edge("Hall", "north", true).unwrap();
        graph
            .add_connecting_edge("Kitchen", "hatch", &room, None)
            .unwrap();
        graph.tag_transition("Kitchen", "hatch", "small").unwrap();

        graph
            .replace_unexplored(
                "Hall",
                "north",
                "Kitchen",
                Some("hatch"),
                ReplaceOptions::default(),
            )
            .unwrap();

        assert_eq!(graph.destination("Kitchen", "hatch").unwrap(), "Hall");
        assert!(graph.transition_tags("Kitchen", "hatch").unwrap().contains("small"));
        assert!(!graph.contains_decision(&room));
        assert_consistent(&graph);
    }

    #[test]
    fn test_replace_second_placeholder_redirects_its_edges() {
        let mut graph = DecisionGraph::new();
        for name in ["Hall", "Kitchen", "Pantry"] {
            graph.add_decision(name).unwrap();
        }
        graph.add_unexplored_edge("Hall", "north", true).unwrap();
        let other = graph.add_unexplored_edge("Kitchen", "south", true).unwrap();
        graph
            .add_connecting_edge("Pantry", "out", &other, Some("in"))
            .unwrap();

        graph
            .replace_unexplored(
                "Hall",
                "north",
                "Kitchen",
                Some("south"),
                ReplaceOptions::default(),
            )
            .unwrap();

        assert_eq!(graph.destination("Pantry", "out").unwrap(), "Hall");
        assert_eq!(graph.destination("Hall", "in").unwrap(), "Pantry");
        assert!(!graph.contains_decision(&other));
        assert_consistent(&graph);
    }

    #[test]
    fn test_replace_errors_leave_graph_unchanged() {
        let mut graph = DecisionGraph::new();
        graph.add_decision("Hall").unwrap();
        graph.add_decision("Kitchen").unwrap();
        graph.add_connecting_edge("Hall", "door", "Kitchen", None).unwrap();
        let room = graph.add_unexplored_edge("Hall", "north", true).unwrap();
        graph.add_connecting_edge("Kitchen", "south", "Hall", None).unwrap();
        let before = graph.clone();

        let err = graph
            .replace_unexplored("Hall", "door", "Cellar", None, ReplaceOptions::default())
            .unwrap_err();
        assert!(matches!(err, GraphError::NotUnexplored { .. }));
        assert_eq!(graph, before);

        let err = graph
            .replace_unexplored(
                "Hall",
                "north",
                "Kitchen",
                Some("south"),
                ReplaceOptions::default(),
            )
            .unwrap_err();
        assert!(
            matches!(err, GraphError::ReciprocalNotUnknown { ref destination, .. }
                if destination == "Hall")
        );
        assert_eq!(graph, before);

        let err = graph
            .replace_unexplored("Hall", "north", &room, None, ReplaceOptions::default())
            .unwrap_err();
        assert!(matches!(err, GraphError::PlaceholderMerge { .. }));
        assert_eq!(graph, before);

        let err = graph
            .replace_unexplored("Hall", "north", "_u:77", None, ReplaceOptions::default())
            .unwrap_err();
        assert!(matches!(err, GraphError::PlaceholderMerge { .. }));
        assert_eq!(graph, before);

        let err = graph
            .replace_unexplored("Hall", "up", "Attic", None, ReplaceOptions::default())
            .unwrap_err();
        assert!(matches!(err, GraphError::UnknownTransition { .. }));
        assert_eq!(graph, before);
    }

    #[test]
    fn test_replace_relocation_collision_is_checked_first() {
        let mut graph = DecisionGraph::new();
        for name in ["Hall", "Study", "Kitchen"] {
            graph.add_decision(name).unwrap();
        }
        let room = graph.add_unexplored_edge("Hall", "north", true).unwrap();
        graph
            .add_connecting_edge("Study", "east", &room, Some("west"))
            .unwrap();
        // Kitchen already uses "west"
        graph.add_connecting_edge("Kitchen", "west", "Hall", None).unwrap();
        let before = graph.clone();

        let err = graph
            .replace_unexplored("Hall", "north", "Kitchen", None, ReplaceOptions::default())
            .unwrap_err();
        assert!(matches!(
            err,
            GraphError::NameCollision { ref transition, .. } if transition == "west"
        ));
        assert_eq!(graph, before);
    }

    /// Hall has two unexplored exits; Study and Pantry each have a door into
    /// one of the unexplored rooms, with reciprocals named by the arguments.
    fn two_rooms_with_doors(study_back: &str, pantry_back: &str) -> DecisionGraph {
        let mut graph = DecisionGraph::new();
        for name in ["Hall", "Study", "Pantry"] {
            graph.add_decision(name).unwrap();
        }
        let first = graph.add_unexplored_edge("Hall", "north", true).unwrap();
        let second = graph.add_unexplored_edge("Hall", "loop", true).unwrap();
        graph
            .add_connecting_edge("Study", "door", &first, Some(study_back))
            .unwrap();
        graph
            .add_connecting_edge("Pantry", "hatch", &second, Some(pantry_back))
            .unwrap();
        graph
    }

    #[test]
    fn test_replace_into_own_source_shares_claimed_names() {
        let mut graph = two_rooms_with_doors("back", "back");
        let before = graph.clone();

        // Both relocated reciprocals would land on Hall as "back"
        let err = graph
            .replace_unexplored(
                "Hall",
                "north",
                "Hall",
                Some("loop"),
                ReplaceOptions::default(),
            )
            .unwrap_err();
        assert!(
            matches!(err, GraphError::NameCollision { ref decision, ref transition }
                if decision == "Hall" && transition == "back")
        );
        assert_eq!(graph, before);
    }

    #[test]
    fn test_replace_into_own_source() {
        let mut graph = two_rooms_with_doors("back", "up");

        graph
            .replace_unexplored(
                "Hall",
                "north",
                "Hall",
                Some("loop"),
                ReplaceOptions::default(),
            )
            .unwrap();

        assert_eq!(
            shape(&graph),
            BTreeMap::from([
                (
                    "Hall".to_string(),
                    edges(&[
                        ("back", "Study"),
                        ("loop", "Hall"),
                        ("north", "Hall"),
                        ("up", "Pantry"),
                    ])
                ),
                ("Pantry".to_string(), edges(&[("hatch", "Hall")])),
                ("Study".to_string(), edges(&[("door", "Hall")])),
            ])
        );
        assert_eq!(graph.transition_count(), 6);
        assert_eq!(graph.transition_reciprocal("Study", "door").unwrap(), Some("back"));
        assert_eq!(graph.transition_reciprocal("Pantry", "hatch").unwrap(), Some("up"));
        assert_eq!(graph.transition_reciprocal("Hall", "north").unwrap(), Some("loop"));
        assert_consistent(&graph);
    }
}
