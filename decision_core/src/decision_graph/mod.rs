//! Decision Graph module - the explored world as a directed multigraph.
//!
//! The graph consists of:
//! - **Decisions**: named points, some of them placeholders for unexplored
//!   territory or shared endings
//! - **Transitions**: named directed edges, unique per source, each with a
//!   requirement, effects, tags, annotations and an optional reciprocal
//! - **Surgery**: retargeting edges and resolving placeholders without
//!   breaking reciprocal links

mod decision;
mod effects;
mod graph;
mod surgery;
mod transition;

pub use decision::*;
pub use effects::*;
pub use graph::*;
pub use surgery::*;
pub use transition::*;
