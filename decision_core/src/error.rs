//! Error types for the graph store and the exploration history.

use thiserror::Error;
use world_rules::RulesError;

/// Structural errors raised by the decision graph store and surgery.
///
/// Every operation validates before it mutates, so a returned error means
/// the graph was left exactly as it was.
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("decision '{name}' already exists")]
    DuplicateDecision { name: String },

    #[error("decision '{name}' does not exist")]
    UnknownDecision { name: String },

    #[error("decision '{decision}' has no transition named '{transition}'")]
    UnknownTransition { decision: String, transition: String },

    #[error("decision '{decision}' already has a transition named '{transition}'")]
    DuplicateEdgeName { decision: String, transition: String },

    #[error("'{reciprocal}' cannot be the reciprocal of '{transition}' at '{decision}': {reason}")]
    InvalidReciprocal {
        decision: String,
        transition: String,
        reciprocal: String,
        reason: String,
    },

    #[error("cannot move reciprocal '{transition}' to '{decision}': name already in use")]
    NameCollision { decision: String, transition: String },

    #[error("transition '{transition}' at '{decision}' leads to explored '{destination}'")]
    NotUnexplored {
        decision: String,
        transition: String,
        destination: String,
    },

    #[error("reciprocal '{transition}' at '{decision}' already leads to explored '{destination}'")]
    ReciprocalNotUnknown {
        decision: String,
        transition: String,
        destination: String,
    },

    #[error("cannot resolve placeholder '{placeholder}': {reason}")]
    PlaceholderMerge { placeholder: String, reason: String },

    #[error(transparent)]
    Rules(#[from] RulesError),
}

/// Errors raised by exploration steps and accessors.
#[derive(Debug, Error)]
pub enum ExplorationError {
    #[error("the exploration has not been started")]
    NotStarted,

    #[error("the exploration has already been started")]
    AlreadyStarted,

    #[error("step {step} is out of range (the exploration has {len} steps)")]
    StepOutOfRange { step: usize, len: usize },

    #[error("cannot explore to '{destination}': it already exists (return to it instead)")]
    DestinationExists { destination: String },

    #[error("decision '{destination}' does not exist yet (explore it instead)")]
    DestinationMissing { destination: String },

    #[error("cannot take '{transition}' from '{decision}': no such transition")]
    NoSuchTransition { decision: String, transition: String },

    #[error("cannot retrace '{transition}' from '{decision}': '{destination}' is unexplored")]
    LeadsToUnknown {
        decision: String,
        transition: String,
        destination: String,
    },

    #[error("'{transition}' at '{decision}' is not an action (it leads elsewhere)")]
    NotAnAction { decision: String, transition: String },

    #[error("cannot warp using '{transition}': that transition already exists at '{decision}'")]
    WarpNameTaken { decision: String, transition: String },

    #[error(transparent)]
    Graph(#[from] GraphError),
}

/// Result type alias for graph operations.
pub type GraphResult<T> = Result<T, GraphError>;

/// Result type alias for exploration operations.
pub type ExplorationResult<T> = Result<T, ExplorationError>;
