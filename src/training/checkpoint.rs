//! Persisted best parameters

use serde::{Deserialize, Serialize};

use crate::vector::Vector;

/// Current checkpoint format version.
pub const CHECKPOINT_VERSION: u32 = 1;

/// Best parameters found so far and the evaluation that earned them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub version: u32,
    /// Iteration that produced the parameters; 0 for the initial ones.
    pub iteration: usize,
    /// `None` for checkpoints imported from a bare parameter list.
    pub evaluation: Option<f64>,
    pub parameters: Vector,
}

impl Checkpoint {
    pub fn new(iteration: usize, evaluation: f64, parameters: Vector) -> Self {
        Self {
            version: CHECKPOINT_VERSION,
            iteration,
            evaluation: Some(evaluation),
            parameters,
        }
    }

    /// Checkpoint holding parameters only.
    pub fn parameters_only(parameters: Vector) -> Self {
        Self {
            version: CHECKPOINT_VERSION,
            iteration: 0,
            evaluation: None,
            parameters,
        }
    }
}
