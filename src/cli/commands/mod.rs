//! Subcommands and the flags they share

pub mod evaluate;
pub mod features;
pub mod train;

use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use clap::Args;

use crate::{
    adapters::CsvCheckpointRepository,
    config::TrainerConfig,
    features::FeatureExtractor,
    maze::{Game, Maze, OpponentKind},
    policy::LinearPolicy,
    ports::CheckpointRepository,
};

/// Run settings; flags override values from `--config`.
#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    /// JSON configuration file
    #[arg(long, short = 'c')]
    pub config: Option<PathBuf>,

    /// Built-in maze layout (classic, lattice, ring)
    #[arg(long, short = 'l')]
    pub layout: Option<String>,

    /// Opponent controlling the adversaries (chasing or random)
    #[arg(long, short = 'o')]
    pub opponent: Option<OpponentKind>,

    /// Playouts per evaluation
    #[arg(long, short = 't')]
    pub trials: Option<usize>,

    /// Random seed for playouts and perturbations
    #[arg(long)]
    pub seed: Option<u64>,

    /// Worker threads for playouts (defaults to the number of CPUs)
    #[arg(long, short = 'w')]
    pub workers: Option<usize>,

    /// Ticks after which an unfinished playout is scored as is
    #[arg(long)]
    pub step_ceiling: Option<usize>,
}

impl RunArgs {
    /// Configuration file (or defaults) with the flags applied, validated.
    pub fn resolve(&self) -> Result<TrainerConfig> {
        let mut config = match &self.config {
            Some(path) => TrainerConfig::load(path)
                .with_context(|| format!("loading configuration from {}", path.display()))?,
            None => TrainerConfig::default(),
        };
        if let Some(layout) = &self.layout {
            config = config.with_layout(layout.clone());
        }
        if let Some(opponent) = self.opponent {
            config = config.with_opponent(opponent);
        }
        if let Some(trials) = self.trials {
            config = config.with_trials(trials);
        }
        if let Some(seed) = self.seed {
            config = config.with_seed(seed);
        }
        if let Some(workers) = self.workers {
            config = config.with_workers(workers);
        }
        if let Some(step_ceiling) = self.step_ceiling {
            config = config.with_step_ceiling(step_ceiling);
        }
        config.validate().context("invalid configuration")?;
        Ok(config)
    }
}

/// Game factory for the configured layout.
pub(crate) fn game_factory(config: &TrainerConfig) -> Result<impl Fn(u64) -> Game + Sync + use<>> {
    let maze = Arc::new(
        Maze::builtin(&config.layout)
            .with_context(|| format!("loading layout {}", config.layout))?,
    );
    Ok(move |seed| Game::new(maze.clone(), seed))
}

/// Linear policy from a checkpoint, or the hand-tuned starting point.
pub(crate) fn load_policy(
    checkpoint: Option<&PathBuf>,
    extractor: FeatureExtractor,
) -> Result<LinearPolicy> {
    match checkpoint {
        Some(path) => {
            let checkpoint = CsvCheckpointRepository::new()
                .load(path)
                .with_context(|| format!("loading checkpoint {}", path.display()))?;
            LinearPolicy::new(checkpoint.parameters, extractor)
                .with_context(|| format!("checkpoint {} does not fit the policy", path.display()))
        }
        None => Ok(LinearPolicy::initial(extractor)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_defaults() {
        let args = RunArgs {
            layout: Some("ring".to_string()),
            opponent: Some(OpponentKind::Random),
            trials: Some(3),
            seed: Some(11),
            ..RunArgs::default()
        };
        let config = args.resolve().unwrap();
        assert_eq!(config.layout, "ring");
        assert_eq!(config.opponent, OpponentKind::Random);
        assert_eq!(config.evaluation.trials, 3);
        assert_eq!(config.gradient.seed, 11);
    }

    #[test]
    fn invalid_flags_are_reported() {
        let args = RunArgs {
            trials: Some(0),
            ..RunArgs::default()
        };
        assert!(args.resolve().is_err());
    }
}
