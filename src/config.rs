//! Run configuration
//!
//! A [`TrainerConfig`] collects every tunable of a training or evaluation
//! run. It is loaded from JSON, where every field is optional, and command
//! line flags are applied on top.
//!
//! ```json
//! {
//!   "layout": "classic",
//!   "opponent": "chasing",
//!   "evaluation": { "trials": 100, "seed": 7 },
//!   "step_size": { "initial": 0.001 }
//! }
//! ```

use std::{fs, path::Path};

use serde::{Deserialize, Serialize};

use crate::{
    Error, Result,
    features::SafetyConfig,
    maze::{Maze, OpponentKind},
    training::{EvaluationConfig, GradientConfig, StepSizeConfig},
};

/// Configuration for a training run.
///
/// # Examples
///
/// ```
/// use pursuit::{config::TrainerConfig, maze::OpponentKind};
///
/// let config = TrainerConfig::default()
///     .with_layout("lattice")
///     .with_opponent(OpponentKind::Random)
///     .with_trials(20)
///     .with_seed(42);
/// config.validate()?;
/// # Ok::<(), pursuit::Error>(())
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainerConfig {
    /// Built-in maze layout name
    pub layout: String,
    /// Opponent the policy is trained against
    pub opponent: OpponentKind,
    pub evaluation: EvaluationConfig,
    pub gradient: GradientConfig,
    pub step_size: StepSizeConfig,
    pub safety: SafetyConfig,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            layout: "classic".to_string(),
            opponent: OpponentKind::default(),
            evaluation: EvaluationConfig::default(),
            gradient: GradientConfig::default(),
            step_size: StepSizeConfig::default(),
            safety: SafetyConfig::default(),
        }
    }
}

impl TrainerConfig {
    /// Read a JSON configuration file. Missing fields keep their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|source| Error::Io {
            operation: format!("read config {path:?}"),
            source,
        })?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Write the configuration as pretty-printed JSON.
    pub fn save(&self, path: &Path) -> Result<()> {
        let text = serde_json::to_string_pretty(self)?;
        fs::write(path, text).map_err(|source| Error::Io {
            operation: format!("write config {path:?}"),
            source,
        })
    }

    pub fn validate(&self) -> Result<()> {
        Maze::builtin(&self.layout)?;
        self.evaluation.validate()?;
        self.gradient.validate()?;
        self.step_size.validate()?;
        self.safety.validate()
    }

    pub fn with_layout(mut self, layout: impl Into<String>) -> Self {
        self.layout = layout.into();
        self
    }

    pub fn with_opponent(mut self, opponent: OpponentKind) -> Self {
        self.opponent = opponent;
        self
    }

    pub fn with_trials(mut self, trials: usize) -> Self {
        self.evaluation.trials = trials;
        self
    }

    /// Seed both the playouts and the gradient perturbations.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.evaluation.seed = seed;
        self.gradient.seed = seed;
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.evaluation.workers = Some(workers);
        self
    }

    pub fn with_perturbations(mut self, perturbations: usize) -> Self {
        self.gradient.perturbations = perturbations;
        self
    }

    pub fn with_step_ceiling(mut self, step_ceiling: usize) -> Self {
        self.evaluation.step_ceiling = step_ceiling;
        self
    }

    pub fn with_step_size(mut self, step_size: StepSizeConfig) -> Self {
        self.step_size = step_size;
        self
    }

    pub fn with_safety(mut self, safety: SafetyConfig) -> Self {
        self.safety = safety;
        self
    }
}
