//! Exploration - the step-by-step history of discovering a decision graph.
//!
//! Each step owns a full copy of the graph and the explorer state as they
//! were at that point, along with the explorer's position and the
//! transition taken to get there. Steps are only ever appended; every step
//! operation works on copies of the latest step, so an error leaves the
//! history untouched.

mod warning;

pub use warning::*;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;
use world_rules::{ExplorationConfig, Requirement, State, TransitionEffects};

use crate::decision_graph::{apply_effects, DecisionGraph, ReplaceOptions};
use crate::error::{ExplorationError, ExplorationResult, GraphError};

/// Unique identifier for an exploration, used to correlate log events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExplorationId(pub Uuid);

impl ExplorationId {
    /// Create a new random exploration ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ExplorationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ExplorationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One recorded point of an exploration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub graph: DecisionGraph,
    /// Where the explorer is. Always a decision of `graph`.
    pub position: String,
    pub state: State,
    /// The transition taken to arrive here; `None` for the first step.
    pub arrived_by: Option<String>,
}

/// A borrowed view of one step, with the transition taken *from* it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Situation<'a> {
    pub graph: &'a DecisionGraph,
    pub position: &'a str,
    pub state: &'a State,
    pub transition: Option<&'a str>,
}

/// The full history of an exploration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Exploration {
    id: ExplorationId,
    config: ExplorationConfig,
    steps: Vec<Step>,
    warnings: Vec<TransitionBlocked>,
}

impl Default for Exploration {
    fn default() -> Self {
        Self::with_config(ExplorationConfig::default())
    }
}

impl Exploration {
    /// Create an empty exploration. Call [`start`](Self::start) before
    /// taking any steps.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ExplorationConfig) -> Self {
        Self {
            id: ExplorationId::new(),
            config,
            steps: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn id(&self) -> ExplorationId {
        self.id
    }

    pub fn config(&self) -> &ExplorationConfig {
        &self.config
    }

    /// Number of steps recorded.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Every blocked-transition warning raised so far, oldest first.
    pub fn warnings(&self) -> &[TransitionBlocked] {
        &self.warnings
    }

    fn out_of_range(&self, step: usize) -> ExplorationError {
        ExplorationError::StepOutOfRange {
            step,
            len: self.steps.len(),
        }
    }

    fn step(&self, step: usize) -> ExplorationResult<&Step> {
        self.steps.get(step).ok_or_else(|| self.out_of_range(step))
    }

    fn step_mut(&mut self, step: usize) -> ExplorationResult<&mut Step> {
        let len = self.steps.len();
        self.steps
            .get_mut(step)
            .ok_or(ExplorationError::StepOutOfRange { step, len })
    }

    fn latest(&self) -> ExplorationResult<&Step> {
        self.steps.last().ok_or(ExplorationError::NotStarted)
    }

    fn latest_mut(&mut self) -> ExplorationResult<&mut Step> {
        self.steps.last_mut().ok_or(ExplorationError::NotStarted)
    }

    // ---- accessors -------------------------------------------------------

    pub fn get_graph_at_step(&self, step: usize) -> Option<&DecisionGraph> {
        self.steps.get(step).map(|s| &s.graph)
    }

    pub fn graph_at_step(&self, step: usize) -> ExplorationResult<&DecisionGraph> {
        Ok(&self.step(step)?.graph)
    }

    pub fn get_position_at_step(&self, step: usize) -> Option<&str> {
        self.steps.get(step).map(|s| s.position.as_str())
    }

    pub fn position_at_step(&self, step: usize) -> ExplorationResult<&str> {
        Ok(&self.step(step)?.position)
    }

    pub fn get_state_at_step(&self, step: usize) -> Option<&State> {
        self.steps.get(step).map(|s| &s.state)
    }

    pub fn state_at_step(&self, step: usize) -> ExplorationResult<&State> {
        Ok(&self.step(step)?.state)
    }

    /// The transition taken from `step` to reach the next step. `None` for
    /// the latest step and for steps out of range.
    pub fn get_transition_at_step(&self, step: usize) -> Option<&str> {
        self.steps.get(step.checked_add(1)?)?.arrived_by.as_deref()
    }

    /// The transition taken from `step`; `None` for the latest step.
    pub fn transition_at_step(&self, step: usize) -> ExplorationResult<Option<&str>> {
        self.step(step)?;
        Ok(self.get_transition_at_step(step))
    }

    /// The transition taken to arrive at `step`; `None` for the first step.
    pub fn arrival_transition(&self, step: usize) -> ExplorationResult<Option<&str>> {
        Ok(self.step(step)?.arrived_by.as_deref())
    }

    pub fn get_situation_at_step(&self, step: usize) -> Option<Situation<'_>> {
        let s = self.steps.get(step)?;
        Some(Situation {
            graph: &s.graph,
            position: &s.position,
            state: &s.state,
            transition: self.get_transition_at_step(step),
        })
    }

    pub fn situation_at_step(&self, step: usize) -> ExplorationResult<Situation<'_>> {
        self.get_situation_at_step(step)
            .ok_or_else(|| self.out_of_range(step))
    }

    pub fn current_graph(&self) -> ExplorationResult<&DecisionGraph> {
        Ok(&self.latest()?.graph)
    }

    pub fn current_position(&self) -> ExplorationResult<&str> {
        Ok(&self.latest()?.position)
    }

    pub fn current_state(&self) -> ExplorationResult<&State> {
        Ok(&self.latest()?.state)
    }

    pub fn current_situation(&self) -> ExplorationResult<Situation<'_>> {
        let last = self.steps.len().checked_sub(1).ok_or(ExplorationError::NotStarted)?;
        self.situation_at_step(last)
    }

    // ---- editing the latest step ------------------------------------------

    /// The latest graph, for edits that should not count as a step (e.g.
    /// adding a connection noticed after arriving).
    pub fn current_graph_mut(&mut self) -> ExplorationResult<&mut DecisionGraph> {
        Ok(&mut self.latest_mut()?.graph)
    }

    pub fn gain_power_now(&mut self, power: &str) -> ExplorationResult<()> {
        self.latest_mut()?.state.gain_power(power);
        Ok(())
    }

    pub fn lose_power_now(&mut self, power: &str) -> ExplorationResult<()> {
        self.latest_mut()?.state.lose_power(power);
        Ok(())
    }

    pub fn adjust_tokens_now(&mut self, token: &str, delta: i64) -> ExplorationResult<()> {
        self.latest_mut()?.state.adjust_tokens(token, delta);
        Ok(())
    }

    pub fn update_requirement_now(
        &mut self,
        decision: &str,
        transition: &str,
        requirement: Requirement,
    ) -> ExplorationResult<()> {
        self.latest_mut()?
            .graph
            .set_transition_requirement(decision, transition, requirement)?;
        Ok(())
    }

    /// Apply free-standing effects to the latest graph and state.
    pub fn apply_effects_now(&mut self, effects: &TransitionEffects) -> ExplorationResult<()> {
        let step = self.latest_mut()?;
        apply_effects(effects, &mut step.graph, &mut step.state)?;
        Ok(())
    }

    /// Apply a transition's effects to the latest graph and state, advancing
    /// the effects the transition carries.
    pub fn apply_transition_effects_now(
        &mut self,
        decision: &str,
        transition: &str,
    ) -> ExplorationResult<()> {
        let step = self.latest_mut()?;
        step.graph
            .apply_transition_effects(decision, transition, &mut step.state)?;
        Ok(())
    }

    pub fn apply_transition_effects_at_step(
        &mut self,
        step: usize,
        decision: &str,
        transition: &str,
    ) -> ExplorationResult<()> {
        let step = self.step_mut(step)?;
        step.graph
            .apply_transition_effects(decision, transition, &mut step.state)?;
        Ok(())
    }

    pub fn traversable_at_step(
        &self,
        step: usize,
        decision: &str,
        transition: &str,
    ) -> ExplorationResult<bool> {
        let s = self.step(step)?;
        Ok(s.graph.is_traversable(decision, transition, &s.state)?)
    }

    pub fn traversable_now(&self, decision: &str, transition: &str) -> ExplorationResult<bool> {
        let s = self.latest()?;
        Ok(s.graph.is_traversable(decision, transition, &s.state)?)
    }

    // ---- taking steps ------------------------------------------------------

    /// Record the first step: the explorer at `decision`, which has an
    /// unexplored edge for each of `connections`.
    pub fn start(
        &mut self,
        decision: &str,
        connections: &[&str],
        initial_state: Option<State>,
    ) -> ExplorationResult<()> {
        if !self.steps.is_empty() {
            return Err(ExplorationError::AlreadyStarted);
        }

        let mut graph = DecisionGraph::with_naming(self.config.naming.clone());
        graph.add_decision(decision)?;
        for name in connections {
            graph.add_unexplored_edge(decision, name, true)?;
        }

        info!(exploration = %self.id, position = %decision, "Exploration started");
        self.steps.push(Step {
            graph,
            position: decision.to_string(),
            state: initial_state.unwrap_or_default(),
            arrived_by: None,
        });
        Ok(())
    }

    /// The latest step, and whether `transition` from the current position
    /// is blocked by its requirement.
    fn depart(&self, transition: &str) -> ExplorationResult<(&Step, bool)> {
        let current = self.latest()?;
        let requirement = current
            .graph
            .get_transition_requirement(&current.position, transition)
            .map_err(|err| match err {
                GraphError::UnknownTransition { decision, transition } => {
                    ExplorationError::NoSuchTransition { decision, transition }
                }
                other => other.into(),
            })?;
        Ok((current, !requirement.evaluate(&current.state)))
    }

    fn record_step(&mut self, departed: &str, blocked: bool, step: Step) {
        let from_step = self.steps.len().saturating_sub(1);
        let transition = step.arrived_by.clone().unwrap_or_default();
        if blocked {
            warn!(
                exploration = %self.id,
                step = from_step,
                decision = %departed,
                transition = %transition,
                "Transition requirements not met; taking it anyway"
            );
            self.warnings.push(TransitionBlocked {
                step: from_step,
                decision: departed.to_string(),
                transition: transition.clone(),
            });
        }
        info!(
            exploration = %self.id,
            step = self.steps.len(),
            position = %step.position,
            transition = %transition,
            "Step recorded"
        );
        self.steps.push(step);
    }

    /// Take `transition`, which must lead to an unexplored region, and
    /// name the newly found decision `destination`.
    ///
    /// The new decision gets an unexplored edge for each of `connections`,
    /// and a `reciprocal` edge back to the current position when one is
    /// named.
    pub fn explore(
        &mut self,
        transition: &str,
        destination: &str,
        connections: &[&str],
        reciprocal: Option<&str>,
    ) -> ExplorationResult<()> {
        let (current, blocked) = self.depart(transition)?;
        if current.graph.contains_decision(destination) {
            return Err(ExplorationError::DestinationExists {
                destination: destination.to_string(),
            });
        }

        let here = current.position.clone();
        let mut graph = current.graph.clone();
        let mut state = current.state.clone();
        graph.replace_unexplored(
            &here,
            transition,
            destination,
            reciprocal,
            ReplaceOptions::default(),
        )?;
        for name in connections {
            graph.add_unexplored_edge(destination, name, true)?;
        }
        graph.apply_transition_effects(&here, transition, &mut state)?;

        self.record_step(
            &here,
            blocked,
            Step {
                graph,
                position: destination.to_string(),
                state,
                arrived_by: Some(transition.to_string()),
            },
        );
        Ok(())
    }

    /// Take `transition`, which must lead to an unexplored region, and
    /// discover that it leads to the already known `destination`.
    pub fn return_to(
        &mut self,
        transition: &str,
        destination: &str,
        reciprocal: Option<&str>,
    ) -> ExplorationResult<()> {
        let (current, blocked) = self.depart(transition)?;
        if !current.graph.contains_decision(destination) {
            return Err(ExplorationError::DestinationMissing {
                destination: destination.to_string(),
            });
        }

        let here = current.position.clone();
        let mut graph = current.graph.clone();
        let mut state = current.state.clone();
        graph.replace_unexplored(
            &here,
            transition,
            destination,
            reciprocal,
            ReplaceOptions::default(),
        )?;
        graph.apply_transition_effects(&here, transition, &mut state)?;

        self.record_step(
            &here,
            blocked,
            Step {
                graph,
                position: destination.to_string(),
                state,
                arrived_by: Some(transition.to_string()),
            },
        );
        Ok(())
    }

    /// Take an action at the current position.
    ///
    /// The action is created if it does not exist yet. Otherwise its
    /// requirement is replaced by `requirement`, and a missing one clears it
    /// to always satisfied; its effects are replaced only when `effects` is
    /// given. Either way this happens before the action is taken.
    pub fn take_action(
        &mut self,
        action: &str,
        requirement: Option<Requirement>,
        effects: Option<TransitionEffects>,
    ) -> ExplorationResult<()> {
        let current = self.latest()?;
        let here = current.position.clone();
        let mut graph = current.graph.clone();
        let mut state = current.state.clone();

        match graph.transition(&here, action).map(|t| t.is_action()) {
            None => graph.add_action(&here, action, requirement, effects)?,
            Some(false) => {
                return Err(ExplorationError::NotAnAction {
                    decision: here,
                    transition: action.to_string(),
                })
            }
            Some(true) => {
                graph.set_transition_requirement(&here, action, requirement.unwrap_or_default())?;
                if let Some(effects) = effects {
                    graph.set_transition_effects(&here, action, effects)?;
                }
            }
        }

        let blocked = !graph.is_traversable(&here, action, &current.state)?;
        graph.apply_transition_effects(&here, action, &mut state)?;

        self.record_step(
            &here,
            blocked,
            Step {
                graph,
                position: here.clone(),
                state,
                arrived_by: Some(action.to_string()),
            },
        );
        Ok(())
    }

    /// Take a transition whose destination is already known.
    pub fn retrace(&mut self, transition: &str) -> ExplorationResult<()> {
        let (current, blocked) = self.depart(transition)?;
        let here = current.position.clone();
        let destination = current.graph.destination(&here, transition)?.to_string();
        if current.graph.is_unknown(&destination)? {
            return Err(ExplorationError::LeadsToUnknown {
                decision: here,
                transition: transition.to_string(),
                destination,
            });
        }

        let mut graph = current.graph.clone();
        let mut state = current.state.clone();
        graph.apply_transition_effects(&here, transition, &mut state)?;

        self.record_step(
            &here,
            blocked,
            Step {
                graph,
                position: destination,
                state,
                arrived_by: Some(transition.to_string()),
            },
        );
        Ok(())
    }

    /// Move to `destination` without following any transition.
    ///
    /// The step is recorded under a warp transition name built from
    /// `message`; that name must not be an existing transition at the
    /// current position.
    pub fn warp(
        &mut self,
        destination: &str,
        message: Option<&str>,
        effects: Option<TransitionEffects>,
    ) -> ExplorationResult<()> {
        let current = self.latest()?;
        let here = current.position.clone();
        if !current.graph.contains_decision(destination) {
            return Err(ExplorationError::DestinationMissing {
                destination: destination.to_string(),
            });
        }
        let name = self.config.naming.warp_name(here == destination, message);
        if current.graph.get_destination(&here, &name).is_some() {
            return Err(ExplorationError::WarpNameTaken {
                decision: here,
                transition: name,
            });
        }

        let mut graph = current.graph.clone();
        let mut state = current.state.clone();
        if let Some(effects) = effects {
            apply_effects(&effects, &mut graph, &mut state)?;
        }

        self.record_step(
            &here,
            false,
            Step {
                graph,
                position: destination.to_string(),
                state,
                arrived_by: Some(name),
            },
        );
        Ok(())
    }

    /// Record time passing at the current position.
    pub fn wait(
        &mut self,
        message: Option<&str>,
        effects: Option<TransitionEffects>,
    ) -> ExplorationResult<()> {
        let here = self.current_position()?.to_string();
        self.warp(&here, message, effects)
    }
}
