//! Applying transition effects to a graph and an explorer state.

use world_rules::{Grant, Requirement, State, TagDelta, TagTarget, TransitionEffects};

use super::{DecisionGraph, DecisionId, TransitionId};
use crate::error::GraphResult;

enum ResolvedTarget {
    Decision(DecisionId),
    Transition(TransitionId),
}

/// Apply `effects` to `graph` and `state`.
///
/// Order: gains, then losses, then requirement alterations, then tag
/// deltas. Losing a power that is not held and removing a tag that is not
/// present are both tolerated. Every alteration and tag target, and every
/// tag delta, is checked before anything changes.
pub fn apply_effects(
    effects: &TransitionEffects,
    graph: &mut DecisionGraph,
    state: &mut State,
) -> GraphResult<()> {
    let mut tag_plan = Vec::with_capacity(effects.tags.len());
    for change in &effects.tags {
        let deltas = change.parsed_deltas()?;
        let target = match &change.target {
            TagTarget::Decision(name) => ResolvedTarget::Decision(graph.decision_id(name)?),
            TagTarget::Transition(decision, transition) => {
                ResolvedTarget::Transition(graph.transition_id(decision, transition)?)
            }
        };
        tag_plan.push((target, deltas));
    }
    let mut alterations = Vec::with_capacity(effects.alters.len());
    for alter in &effects.alters {
        let id = graph.transition_id(&alter.decision, &alter.transition)?;
        alterations.push((id, alter.requirement.clone().unwrap_or(Requirement::Nothing)));
    }

    for grant in &effects.gain {
        match grant {
            Grant::Power(power) => state.gain_power(power.clone()),
            Grant::Tokens(token, amount) => state.adjust_tokens(token.clone(), *amount),
        }
    }
    for grant in &effects.lose {
        match grant {
            Grant::Power(power) => state.lose_power(power),
            Grant::Tokens(token, amount) => state.adjust_tokens(token.clone(), -*amount),
        }
    }

    for (id, requirement) in alterations {
        if let Some(transition) = graph.transitions.get_mut(&id) {
            transition.properties.requirement = requirement;
        }
    }

    for (target, deltas) in tag_plan {
        let tags = match target {
            ResolvedTarget::Decision(id) => graph.decisions.get_mut(&id).map(|d| &mut d.tags),
            ResolvedTarget::Transition(id) => graph
                .transitions
                .get_mut(&id)
                .map(|t| &mut t.properties.tags),
        };
        let Some(tags) = tags else { continue };
        for delta in deltas {
            match delta {
                TagDelta::Add(tag) => {
                    tags.insert(tag);
                }
                TagDelta::Remove(tag) => {
                    tags.remove(&tag);
                }
            }
        }
    }
    Ok(())
}

impl DecisionGraph {
    /// Apply the effects of a transition, then replace them with what the
    /// transition carries afterwards (see [`TransitionEffects::advanced`]).
    pub fn apply_transition_effects(
        &mut self,
        decision: &str,
        transition: &str,
        state: &mut State,
    ) -> GraphResult<()> {
        let id = self.transition_id(decision, transition)?;
        let effects = self.transitions[&id].properties.effects.clone();
        apply_effects(&effects, self, state)?;
        if let Some(t) = self.transitions.get_mut(&id) {
            t.properties.effects = effects.advanced();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GraphError;
    use pretty_assertions::assert_eq;
    use world_rules::{RulesError, TagChange};

    fn graph() -> DecisionGraph {
        let mut graph = DecisionGraph::new();
        graph.add_decision("Hall").unwrap();
        graph.add_decision("Vault").unwrap();
        graph
            .add_connecting_edge("Hall", "door", "Vault", Some("out"))
            .unwrap();
        graph
            .set_transition_requirement("Hall", "door", Requirement::power("key"))
            .unwrap();
        graph
    }

    #[test]
    fn test_gains_then_losses() {
        let mut g = graph();
        let mut state = State::new().with_power("torch").with_tokens("coin", 5);
        let effects = TransitionEffects::new()
            .with_gain(Grant::Power("key".into()))
            .with_gain(Grant::Tokens("coin".into(), 2))
            .with_loss(Grant::Power("key".into()))
            .with_loss(Grant::Power("never held".into()))
            .with_loss(Grant::Tokens("coin".into(), 10));

        apply_effects(&effects, &mut g, &mut state).unwrap();
        // Gained then lost within the same application
        assert!(!state.has_power("key"));
        assert!(state.has_power("torch"));
        assert_eq!(state.token_count("coin"), -3);
    }

    #[test]
    fn test_alterations() {
        let mut g = graph();
        let mut state = State::new();
        let effects = TransitionEffects::new()
            .with_alteration("Hall", "door", None)
            .with_alteration("Vault", "out", Some(Requirement::Impossible));

        apply_effects(&effects, &mut g, &mut state).unwrap();
        assert_eq!(g.get_transition_requirement("Hall", "door").unwrap(), &Requirement::Nothing);
        assert_eq!(
            g.get_transition_requirement("Vault", "out").unwrap(),
            &Requirement::Impossible
        );
    }

    #[test]
    fn test_tag_deltas_replay_in_order() {
        let mut g = graph();
        g.tag_decision("Vault", "sealed").unwrap();
        let mut state = State::new();
        let effects = TransitionEffects::new()
            .with_tag_change(TagChange::new(
                TagTarget::Decision("Vault".into()),
                ["-sealed", "+open", "-open", "+looted", "-missing"],
            ))
            .with_tag_change(TagChange::new(
                TagTarget::Transition("Hall".into(), "door".into()),
                ["+unlocked"],
            ));

        apply_effects(&effects, &mut g, &mut state).unwrap();
        assert_eq!(
            g.decision_tags("Vault").unwrap().iter().collect::<Vec<_>>(),
            vec!["looted"]
        );
        assert!(g.transition_tags("Hall", "door").unwrap().contains("unlocked"));
    }

    #[test]
    fn test_validation_precedes_mutation() {
        let mut g = graph();
        let before = g.clone();
        let mut state = State::new();

        let malformed = TransitionEffects::new()
            .with_gain(Grant::Power("key".into()))
            .with_tag_change(TagChange::new(TagTarget::Decision("Vault".into()), ["open"]));
        let err = apply_effects(&malformed, &mut g, &mut state).unwrap_err();
        assert!(matches!(
            err,
            GraphError::Rules(RulesError::MalformedTagDelta { ref delta }) if delta == "open"
        ));
        assert_eq!(g, before);
        assert_eq!(state, State::new());

        let dangling = TransitionEffects::new()
            .with_gain(Grant::Power("key".into()))
            .with_alteration("Hall", "window", None);
        let err = apply_effects(&dangling, &mut g, &mut state).unwrap_err();
        assert!(matches!(err, GraphError::UnknownTransition { .. }));
        assert_eq!(state, State::new());

        let missing = TransitionEffects::new()
            .with_tag_change(TagChange::new(TagTarget::Decision("Attic".into()), ["+dusty"]));
        let err = apply_effects(&missing, &mut g, &mut state).unwrap_err();
        assert!(matches!(err, GraphError::UnknownDecision { .. }));
        assert_eq!(g, before);
    }

    #[test]
    fn test_transition_effects_advance() {
        let mut g = graph();
        let mut state = State::new();
        let effects = TransitionEffects::new()
            .with_gain(Grant::Tokens("coin".into(), 1))
            .with_next(TransitionEffects::new().with_gain(Grant::Tokens("coin".into(), 10)));
        g.set_transition_effects("Hall", "door", effects).unwrap();

        g.apply_transition_effects("Hall", "door", &mut state).unwrap();
        assert_eq!(state.token_count("coin"), 1);
        g.apply_transition_effects("Hall", "door", &mut state).unwrap();
        assert_eq!(state.token_count("coin"), 11);
        // One-shot chain is exhausted
        g.apply_transition_effects("Hall", "door", &mut state).unwrap();
        assert_eq!(state.token_count("coin"), 11);
        assert!(g.get_transition_effects("Hall", "door").unwrap().is_empty());
    }

    #[test]
    fn test_cycling_transition_effects_repeat() {
        let mut g = graph();
        let mut state = State::new();
        let effects = TransitionEffects::new()
            .with_gain(Grant::Tokens("coin".into(), 1))
            .cycling();
        g.set_transition_effects("Hall", "door", effects.clone()).unwrap();

        for _ in 0..3 {
            g.apply_transition_effects("Hall", "door", &mut state).unwrap();
        }
        assert_eq!(state.token_count("coin"), 3);
        assert_eq!(g.get_transition_effects("Hall", "door").unwrap(), &effects);
    }
}
