//! Fixed opponent policies
//!
//! Opponents are plain [`Policy`] implementations producing one move per
//! adversary. They are never trained. Caged adversaries always get
//! [`Direction::Neutral`]; free ones never reverse unless forced to.

use std::{fmt, str::FromStr, time::Instant};

use rand::{Rng, SeedableRng, rngs::StdRng, seq::IndexedRandom};
use serde::{Deserialize, Serialize};

use crate::{
    Error, Result,
    maze::{AdversaryState, Direction},
    ports::{AdversaryMoves, MazeQuery, Policy},
};

/// Probability that a chasing adversary follows its greedy choice.
pub const CHASE_CONSISTENCY: f64 = 0.9;

fn forward_options<G: MazeQuery + ?Sized>(state: &G, adversary: &AdversaryState) -> Vec<Direction> {
    let all = state.possible_directions(adversary.node);
    let reverse = adversary.last_direction.opposite();
    let forward: Vec<Direction> = all
        .iter()
        .copied()
        .filter(|&d| adversary.last_direction == Direction::Neutral || d != reverse)
        .collect();
    if forward.is_empty() { all } else { forward }
}

/// Every free adversary picks a uniformly random non-reversing move.
#[derive(Debug, Clone)]
pub struct RandomAdversaries {
    rng: StdRng,
}

impl RandomAdversaries {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl<G: MazeQuery + ?Sized> Policy<G, AdversaryMoves> for RandomAdversaries {
    fn select_move(&mut self, state: &G, _deadline: Option<Instant>) -> Result<AdversaryMoves> {
        let moves = state
            .adversaries()
            .iter()
            .map(|adversary| {
                if adversary.is_caged() {
                    return Direction::Neutral;
                }
                forward_options(state, adversary)
                    .choose(&mut self.rng)
                    .copied()
                    .unwrap_or(Direction::Neutral)
            })
            .collect();
        Ok(moves)
    }

    fn name(&self) -> &str {
        "random"
    }

    fn fork(&self, seed: u64) -> Box<dyn Policy<G, AdversaryMoves>> {
        Box::new(Self::new(seed))
    }
}

/// Threatening adversaries close in on the agent along shortest paths,
/// vulnerable ones run away. With probability `1 - CHASE_CONSISTENCY`
/// an adversary moves randomly instead.
#[derive(Debug, Clone)]
pub struct ChasingAdversaries {
    rng: StdRng,
}

impl ChasingAdversaries {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    fn greedy<G: MazeQuery + ?Sized>(
        state: &G,
        adversary: &AdversaryState,
        options: &[Direction],
    ) -> Option<Direction> {
        let target = state.agent_node();
        let distance_after = |d: Direction| {
            state
                .neighbor(adversary.node, d)
                .and_then(|next| state.shortest_path_distance(next, target))
                .unwrap_or(usize::MAX)
        };
        if adversary.is_vulnerable() {
            options.iter().copied().max_by_key(|&d| {
                // max_by_key keeps the last maximum; negate order to keep the first
                (distance_after(d), std::cmp::Reverse(d as u8))
            })
        } else {
            options.iter().copied().min_by_key(|&d| distance_after(d))
        }
    }
}

impl<G: MazeQuery + ?Sized> Policy<G, AdversaryMoves> for ChasingAdversaries {
    fn select_move(&mut self, state: &G, _deadline: Option<Instant>) -> Result<AdversaryMoves> {
        let mut moves = Vec::with_capacity(state.adversaries().len());
        for adversary in state.adversaries() {
            if adversary.is_caged() {
                moves.push(Direction::Neutral);
                continue;
            }
            let options = forward_options(state, adversary);
            let chosen = if self.rng.random::<f64>() < CHASE_CONSISTENCY {
                Self::greedy(state, adversary, &options)
            } else {
                options.choose(&mut self.rng).copied()
            };
            moves.push(chosen.unwrap_or(Direction::Neutral));
        }
        Ok(moves)
    }

    fn name(&self) -> &str {
        "chasing"
    }

    fn fork(&self, seed: u64) -> Box<dyn Policy<G, AdversaryMoves>> {
        Box::new(Self::new(seed))
    }
}

/// Opponent selection for configuration and the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OpponentKind {
    #[default]
    Chasing,
    Random,
}

impl OpponentKind {
    pub const ALL: [OpponentKind; 2] = [OpponentKind::Chasing, OpponentKind::Random];

    /// Instantiate the opponent with its own random stream.
    pub fn build<G: MazeQuery + ?Sized + 'static>(self, seed: u64) -> Box<dyn Policy<G, AdversaryMoves>> {
        match self {
            OpponentKind::Chasing => Box::new(ChasingAdversaries::new(seed)),
            OpponentKind::Random => Box::new(RandomAdversaries::new(seed)),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OpponentKind::Chasing => "chasing",
            OpponentKind::Random => "random",
        }
    }
}

impl fmt::Display for OpponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OpponentKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let key = s.trim().to_ascii_lowercase();
        OpponentKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == key)
            .ok_or_else(|| Error::ParseOpponent {
                input: s.to_string(),
                expected: OpponentKind::ALL.map(|k| k.as_str()).join(", "),
            })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::maze::{Game, Maze};

    fn ring_game(adversary: AdversaryState) -> Game {
        Game::new(Arc::new(Maze::builtin("ring").unwrap()), 0)
            .with_adversaries(vec![adversary])
            .unwrap()
    }

    #[test]
    fn caged_adversaries_stay_neutral() {
        let game = Game::new(Arc::new(Maze::builtin("classic").unwrap()), 1);
        let mut opponent = RandomAdversaries::new(5);
        let moves = opponent.select_move(&game, None).unwrap();
        assert_eq!(moves, vec![Direction::Neutral; 4]);
    }

    #[test]
    fn adversaries_do_not_reverse() {
        let game = ring_game(AdversaryState::roaming(3, Direction::Up));
        let mut opponent = RandomAdversaries::new(11);
        for _ in 0..20 {
            let moves = opponent.select_move(&game, None).unwrap();
            assert_ne!(moves[0], Direction::Down);
        }
    }

    #[test]
    fn chaser_closes_distance_when_threatening() {
        // agent at 0, adversary at 3 heading neutral: both neighbours are
        // one step from the agent, so any greedy choice reduces distance
        let game = ring_game(AdversaryState::roaming(3, Direction::Neutral));
        let mut opponent = ChasingAdversaries::new(2);
        let mut closer = 0;
        for _ in 0..50 {
            let moves = opponent.select_move(&game, None).unwrap();
            let next = game.neighbor(3, moves[0]).unwrap();
            if game.shortest_path_distance(next, 0) == Some(1) {
                closer += 1;
            }
        }
        assert_eq!(closer, 50);
    }

    #[test]
    fn opponent_kind_parses_case_insensitively() {
        assert_eq!("Chasing".parse::<OpponentKind>().unwrap(), OpponentKind::Chasing);
        assert_eq!("random".parse::<OpponentKind>().unwrap(), OpponentKind::Random);
        assert!(matches!(
            "smart".parse::<OpponentKind>(),
            Err(Error::ParseOpponent { .. })
        ));
    }

    #[test]
    fn forked_opponents_replay_identically() {
        let game = ring_game(AdversaryState::roaming(3, Direction::Neutral));
        let base = RandomAdversaries::new(0);
        let mut a = Policy::<Game, AdversaryMoves>::fork(&base, 9);
        let mut b = Policy::<Game, AdversaryMoves>::fork(&base, 9);
        for _ in 0..10 {
            assert_eq!(
                a.select_move(&game, None).unwrap(),
                b.select_move(&game, None).unwrap()
            );
        }
    }
}
