//! Features command - show the feature vector of every legal move

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;

use super::{RunArgs, game_factory, load_policy};
use crate::{
    cli::output::{print_kv, print_section, print_subsection},
    features::{FEATURE_NAMES, FeatureExtractor},
    maze::{Direction, Game},
    policy::LinearPolicy,
    ports::{MazeQuery, Policy, Simulation},
};

#[derive(Parser, Debug)]
#[command(about = "Print the features of each legal move")]
pub struct FeaturesArgs {
    #[command(flatten)]
    pub run: RunArgs,

    /// Ticks to play before inspecting the position
    #[arg(long, default_value_t = 0)]
    pub ticks: usize,

    /// Policy that plays the ticks and scores the moves
    #[arg(long)]
    pub checkpoint: Option<PathBuf>,

    /// Print JSON instead of a table
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Debug, Serialize)]
pub struct MoveFeatures {
    pub direction: Direction,
    pub value: f64,
    pub features: Vec<(String, f64)>,
}

pub fn execute(args: FeaturesArgs) -> Result<()> {
    let config = args.run.resolve()?;
    let mut policy = load_policy(args.checkpoint.as_ref(), FeatureExtractor::new(config.safety))?;
    let new_game = game_factory(&config)?;
    let mut game = new_game(config.evaluation.seed);
    let mut opponent = config.opponent.build::<Game>(config.evaluation.seed);

    for _ in 0..args.ticks {
        if game.is_terminal() {
            break;
        }
        let agent_move = policy.select_move(&game, None)?;
        let adversary_moves = opponent.select_move(&game, None)?;
        game.advance(agent_move, &adversary_moves)?;
    }

    let moves = describe_moves(&policy, &game)?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&moves)?);
        return Ok(());
    }

    print_section(&format!("Position after {} ticks", game.tick()));
    println!("{game}");
    print_kv("Score", &game.score().to_string());
    print_kv(
        "Last move",
        &format!("{:?}", game.agent_last_direction()),
    );
    for entry in &moves {
        print_subsection(&format!("{:?} (value {:.4})", entry.direction, entry.value));
        for (name, value) in &entry.features {
            print_kv(name, &format!("{value:.4}"));
        }
    }
    Ok(())
}

/// Features and value of every legal move from the agent's node.
pub fn describe_moves(policy: &LinearPolicy, game: &Game) -> Result<Vec<MoveFeatures>> {
    let node = game.agent_node();
    game.possible_directions(node)
        .into_iter()
        .map(|direction| -> Result<MoveFeatures> {
            let features = policy
                .extractor()
                .features(game, node, direction)
                .with_context(|| format!("features of {direction:?} at node {node}"))?;
            Ok(MoveFeatures {
                direction,
                value: policy.value(game, direction)?,
                features: FEATURE_NAMES
                    .iter()
                    .map(|name| name.to_string())
                    .zip(features.iter())
                    .collect(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{features::FEATURE_DIM, maze::Maze};

    #[test]
    fn every_legal_move_is_described() {
        let game = Game::new(Arc::new(Maze::builtin("lattice").unwrap()), 0);
        let policy = LinearPolicy::initial(FeatureExtractor::default());
        let moves = describe_moves(&policy, &game).unwrap();

        assert_eq!(
            moves.len(),
            game.possible_directions(game.agent_node()).len()
        );
        assert!(moves.iter().all(|m| m.features.len() == FEATURE_DIM));
    }
}
