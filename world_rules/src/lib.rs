//! # World Rules
//!
//! The rules layer of the exploration model: what an explorer holds, what a
//! transition demands of them, and what taking it changes. This crate knows
//! nothing about the decision graph itself.
//!
//! ## Core Components
//!
//! - **requirement**: the requirement expression language and its evaluator
//! - **state**: powers and tokens held by the explorer
//! - **effects**: gains, losses, requirement alterations and tag deltas
//! - **config**: reserved names, loadable from TOML

pub mod config;
pub mod effects;
pub mod error;
pub mod requirement;
pub mod state;

pub use config::*;
pub use effects::*;
pub use error::*;
pub use requirement::*;
pub use state::*;
