//! Policy warnings raised while exploring.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A step was taken along a transition whose requirement the explorer did
/// not meet. The step is still recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionBlocked {
    /// Index of the step the transition was taken from.
    pub step: usize,
    pub decision: String,
    pub transition: String,
}

impl fmt::Display for TransitionBlocked {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "the requirements for transition '{}' from decision '{}' are not met at step {}",
            self.transition, self.decision, self.step
        )
    }
}
