//! # Decision Core
//!
//! Records how an explorer discovers a world. The world is a directed
//! multigraph of named decisions and transitions, where unexplored
//! territory is held by placeholder decisions until it is visited.
//! Requirements, state and effects come from `world_rules`.
//!
//! ## Core Components
//!
//! - **decision_graph**: the graph store, edge surgery and effect application
//! - **exploration**: the append-only history of graph snapshots, positions
//!   and states
//! - **error**: structural and exploration error kinds
//!
//! ## Design Philosophy
//!
//! - **Validate, then mutate**: a failed operation leaves the graph unchanged
//! - **Record what happened**: taking a transition whose requirement is unmet
//!   is logged as a warning, and the step is still recorded

pub mod decision_graph;
pub mod error;
pub mod exploration;

pub use decision_graph::*;
pub use error::*;
pub use exploration::*;
