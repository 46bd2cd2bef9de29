//! Simulation data types.

use serde::{Deserialize, Serialize};

/// Record of a trial at a single step.
///
/// Contains the current step and the virus counts after the update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Current simulation step.
    pub step: usize,

    /// Total virus population.
    pub total_pop: usize,

    /// Viruses resistant to every drug of the treatment (treated patients only).
    pub resist_pop: Option<usize>,
}

/// Records of a whole trial, one per step.
pub type Trajectory = Vec<Record>;
