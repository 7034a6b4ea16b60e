//! Reference maze simulation
//!
//! The training core only talks to games through [`crate::ports::MazeQuery`]
//! and [`crate::ports::Simulation`]. This module provides a compact
//! implementation of both so the crate can train and evaluate end to end:
//!
//! - [`layout`]: ASCII layouts turned into a node graph with a precomputed
//!   shortest-path table
//! - [`game`]: agent, adversaries, pills and scoring
//! - [`adversaries`]: fixed opponent policies

pub mod adversaries;
pub mod game;
pub mod layout;

use serde::{Deserialize, Serialize};

pub use adversaries::{ChasingAdversaries, OpponentKind, RandomAdversaries};
pub use game::Game;
pub use layout::Maze;

/// Index of a node in the maze graph.
pub type NodeIndex = usize;

/// Movement direction. `Neutral` means no movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Up,
    Right,
    Down,
    Left,
    Neutral,
}

impl Direction {
    /// The four real moves, in the order used throughout the crate.
    pub const MOVES: [Direction; 4] = [
        Direction::Up,
        Direction::Right,
        Direction::Down,
        Direction::Left,
    ];

    pub fn opposite(self) -> Direction {
        match self {
            Direction::Up => Direction::Down,
            Direction::Right => Direction::Left,
            Direction::Down => Direction::Up,
            Direction::Left => Direction::Right,
            Direction::Neutral => Direction::Neutral,
        }
    }

    /// Slot in a per-node neighbour table; `None` for `Neutral`.
    pub(crate) fn slot(self) -> Option<usize> {
        match self {
            Direction::Up => Some(0),
            Direction::Right => Some(1),
            Direction::Down => Some(2),
            Direction::Left => Some(3),
            Direction::Neutral => None,
        }
    }

    /// Grid offset as (row, column) delta.
    pub(crate) fn offset(self) -> (isize, isize) {
        match self {
            Direction::Up => (-1, 0),
            Direction::Right => (0, 1),
            Direction::Down => (1, 0),
            Direction::Left => (0, -1),
            Direction::Neutral => (0, 0),
        }
    }
}

/// State of one adversary.
///
/// An adversary is *caged* while `lair_time > 0`, *vulnerable* while it is
/// free and `vulnerable_time > 0`, and a *threat* otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdversaryState {
    pub node: NodeIndex,
    pub last_direction: Direction,
    pub lair_time: u32,
    pub vulnerable_time: u32,
}

impl AdversaryState {
    /// Free, threatening adversary at `node` heading in `last_direction`.
    pub fn roaming(node: NodeIndex, last_direction: Direction) -> Self {
        Self {
            node,
            last_direction,
            lair_time: 0,
            vulnerable_time: 0,
        }
    }

    /// Adversary waiting in the lair; it appears at `release_node`.
    pub fn caged(release_node: NodeIndex, lair_time: u32) -> Self {
        Self {
            node: release_node,
            last_direction: Direction::Neutral,
            lair_time,
            vulnerable_time: 0,
        }
    }

    pub fn with_vulnerable_time(mut self, ticks: u32) -> Self {
        self.vulnerable_time = ticks;
        self
    }

    pub fn is_caged(&self) -> bool {
        self.lair_time > 0
    }

    pub fn is_vulnerable(&self) -> bool {
        !self.is_caged() && self.vulnerable_time > 0
    }

    pub fn is_threat(&self) -> bool {
        !self.is_caged() && self.vulnerable_time == 0
    }
}
