//! Common test utilities for the pursuit test suite.
//!
//! Small mazes and cheap run settings shared by the integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use pursuit::{
    config::TrainerConfig,
    maze::{Game, Maze, OpponentKind},
    ports::{MazeQuery, Simulation},
};
use rand::{SeedableRng, rngs::StdRng, seq::IndexedRandom};

/// Built-in maze by name.
pub fn maze(name: &str) -> Arc<Maze> {
    Arc::new(Maze::builtin(name).expect("built-in layout"))
}

/// Settings small enough for a test to run a few training iterations.
pub fn quick_config(layout: &str) -> TrainerConfig {
    let mut config = TrainerConfig::default()
        .with_layout(layout)
        .with_opponent(OpponentKind::Chasing)
        .with_trials(3)
        .with_seed(7)
        .with_workers(2)
        .with_step_ceiling(80);
    config.safety.depth_limit = 20;
    config.safety.first_phase_depth = 6;
    config.safety.count_depth = 5;
    config
}

/// Positions reached by random agent moves against the chasing opponent.
///
/// Returns every non-terminal position visited, the starting one included.
pub fn random_positions(layout: &str, seed: u64, ticks: usize) -> Vec<Game> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut game = Game::new(maze(layout), seed);
    let mut opponent = OpponentKind::Chasing.build::<Game>(seed);
    let mut positions = Vec::new();
    for _ in 0..ticks {
        if game.is_terminal() {
            break;
        }
        positions.push(game.clone());
        let moves = game.possible_directions(game.agent_node());
        let agent_move = *moves.choose(&mut rng).expect("every node has a move");
        let adversary_moves = opponent.select_move(&game, None).expect("opponent move");
        game.advance(agent_move, &adversary_moves).expect("legal tick");
    }
    positions
}
