//! Game state and rules of the reference simulation

use std::{fmt, sync::Arc};

use rand::{Rng, SeedableRng, rngs::StdRng};

use crate::{
    Error, Result,
    maze::{AdversaryState, Direction, Maze, NodeIndex},
    ports::{MazeQuery, Simulation},
};

pub const PILL_SCORE: i64 = 10;
pub const POWER_PILL_SCORE: i64 = 50;
/// Score for the first adversary eaten per power pill; doubles for each further one.
pub const ADVERSARY_SCORE: i64 = 200;
pub const VULNERABLE_TIME: u32 = 40;
pub const ADVERSARY_COUNT: usize = 4;

const LAIR_TIMES: [u32; ADVERSARY_COUNT] = [2, 12, 22, 32];
const LAIR_JITTER: u32 = 4;
const REENTRY_LAIR_TIME: u32 = 15;

/// Complete state of one game.
///
/// Cloning is cheap apart from the pill vectors; the maze graph is shared.
#[derive(Debug, Clone)]
pub struct Game {
    maze: Arc<Maze>,
    agent: NodeIndex,
    agent_last: Direction,
    adversaries: Vec<AdversaryState>,
    pills: Vec<bool>,
    power_pills: Vec<bool>,
    active_pills: usize,
    total_pills: usize,
    score: i64,
    tick: usize,
    captured: bool,
    eaten_streak: u32,
}

impl Game {
    /// Fresh game on `maze`. The seed only affects adversary lair times.
    pub fn new(maze: Arc<Maze>, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let release = maze.release_node();
        let adversaries = LAIR_TIMES
            .iter()
            .map(|&base| AdversaryState::caged(release, base + rng.random_range(0..=LAIR_JITTER)))
            .collect();

        let n = maze.node_count();
        let mut pills = vec![false; n];
        let mut power_pills = vec![false; n];
        for &node in maze.pills() {
            pills[node] = true;
        }
        for &node in maze.power_pills() {
            power_pills[node] = true;
        }
        let total_pills = maze.pills().len() + maze.power_pills().len();

        Self {
            agent: maze.agent_start(),
            agent_last: Direction::Neutral,
            adversaries,
            pills,
            power_pills,
            active_pills: total_pills,
            total_pills,
            score: 0,
            tick: 0,
            captured: false,
            eaten_streak: 0,
            maze,
        }
    }

    /// Place the agent explicitly.
    pub fn with_agent(mut self, node: NodeIndex, last_direction: Direction) -> Result<Self> {
        self.check_node(node)?;
        self.agent = node;
        self.agent_last = last_direction;
        Ok(self)
    }

    /// Replace the adversaries.
    pub fn with_adversaries(mut self, adversaries: Vec<AdversaryState>) -> Result<Self> {
        for adversary in &adversaries {
            self.check_node(adversary.node)?;
        }
        self.adversaries = adversaries;
        Ok(self)
    }

    /// Keep only the given pills and power pills active.
    pub fn with_pills(mut self, pills: &[NodeIndex], power_pills: &[NodeIndex]) -> Result<Self> {
        self.pills.fill(false);
        self.power_pills.fill(false);
        for &node in pills {
            self.check_node(node)?;
            self.pills[node] = true;
        }
        for &node in power_pills {
            self.check_node(node)?;
            self.power_pills[node] = true;
        }
        self.active_pills = self.pills.iter().chain(&self.power_pills).filter(|p| **p).count();
        Ok(self)
    }

    pub fn maze(&self) -> &Arc<Maze> {
        &self.maze
    }

    pub fn is_captured(&self) -> bool {
        self.captured
    }

    fn check_node(&self, node: NodeIndex) -> Result<()> {
        let node_count = self.maze.node_count();
        if node >= node_count {
            return Err(Error::InvalidNode { node, node_count });
        }
        Ok(())
    }

    fn move_agent(&mut self, requested: Direction) {
        if let Some(next) = self.maze.neighbor(self.agent, requested) {
            self.agent = next;
            self.agent_last = requested;
        } else if let Some(next) = self.maze.neighbor(self.agent, self.agent_last) {
            self.agent = next;
        }
    }

    fn eat_at_agent(&mut self) {
        let node = self.agent;
        if self.pills[node] {
            self.pills[node] = false;
            self.active_pills -= 1;
            self.score += PILL_SCORE;
        }
        if self.power_pills[node] {
            self.power_pills[node] = false;
            self.active_pills -= 1;
            self.score += POWER_PILL_SCORE;
            self.eaten_streak = 0;
            for adversary in self.adversaries.iter_mut().filter(|a| !a.is_caged()) {
                adversary.vulnerable_time = VULNERABLE_TIME;
            }
        }
    }

    fn move_adversary(&mut self, index: usize, requested: Direction) {
        let maze = &self.maze;
        let adversary = &mut self.adversaries[index];

        if adversary.is_caged() {
            adversary.lair_time -= 1;
            if adversary.lair_time == 0 {
                adversary.node = maze.release_node();
                adversary.last_direction = Direction::Neutral;
            }
            return;
        }

        if adversary.vulnerable_time > 0 {
            adversary.vulnerable_time -= 1;
            if self.tick % 2 == 1 {
                return;
            }
        }

        let reverse = adversary.last_direction.opposite();
        let options: Vec<Direction> = maze
            .possible_directions(adversary.node)
            .into_iter()
            .filter(|&d| d != reverse || adversary.last_direction == Direction::Neutral)
            .collect();
        let chosen = if options.contains(&requested) {
            Some(requested)
        } else if options.contains(&adversary.last_direction) {
            Some(adversary.last_direction)
        } else {
            options.first().copied().or(Some(reverse))
        };

        if let Some(direction) = chosen
            && let Some(next) = maze.neighbor(adversary.node, direction)
        {
            adversary.node = next;
            adversary.last_direction = direction;
        }
    }

    fn resolve_collisions(&mut self, agent_before: NodeIndex, adversaries_before: &[NodeIndex]) {
        let release = self.maze.release_node();
        for (adversary, &before) in self.adversaries.iter_mut().zip(adversaries_before) {
            if adversary.is_caged() {
                continue;
            }
            let same_node = adversary.node == self.agent;
            let swapped = adversary.node == agent_before && before == self.agent;
            if !(same_node || swapped) {
                continue;
            }
            if adversary.is_vulnerable() {
                self.score += ADVERSARY_SCORE << self.eaten_streak.min(8);
                self.eaten_streak += 1;
                *adversary = AdversaryState::caged(release, REENTRY_LAIR_TIME);
            } else {
                self.captured = true;
            }
        }
    }
}

impl MazeQuery for Game {
    fn node_count(&self) -> usize {
        self.maze.node_count()
    }

    fn neighbor(&self, node: NodeIndex, direction: Direction) -> Option<NodeIndex> {
        self.maze.neighbor(node, direction)
    }

    fn is_junction(&self, node: NodeIndex) -> bool {
        self.maze.is_junction(node)
    }

    fn possible_directions(&self, node: NodeIndex) -> Vec<Direction> {
        self.maze.possible_directions(node)
    }

    fn shortest_path_distance(&self, from: NodeIndex, to: NodeIndex) -> Option<usize> {
        self.maze.distance(from, to)
    }

    fn adversaries(&self) -> &[AdversaryState] {
        &self.adversaries
    }

    fn adversary_release_node(&self) -> NodeIndex {
        self.maze.release_node()
    }

    fn agent_node(&self) -> NodeIndex {
        self.agent
    }

    fn agent_last_direction(&self) -> Direction {
        self.agent_last
    }

    fn is_pill_available(&self, node: NodeIndex) -> bool {
        self.pills.get(node).copied().unwrap_or(false)
    }

    fn is_power_pill_available(&self, node: NodeIndex) -> bool {
        self.power_pills.get(node).copied().unwrap_or(false)
    }

    fn active_pill_nodes(&self) -> Vec<NodeIndex> {
        active_nodes(&self.pills)
    }

    fn active_power_pill_nodes(&self) -> Vec<NodeIndex> {
        active_nodes(&self.power_pills)
    }

    fn active_pill_count(&self) -> usize {
        self.active_pills
    }

    fn total_pill_count(&self) -> usize {
        self.total_pills
    }

    fn vulnerability_duration(&self) -> u32 {
        VULNERABLE_TIME
    }
}

impl Simulation for Game {
    fn score(&self) -> i64 {
        self.score
    }

    fn is_terminal(&self) -> bool {
        self.captured || self.active_pills == 0
    }

    fn tick(&self) -> usize {
        self.tick
    }

    fn advance(&mut self, agent_move: Direction, adversary_moves: &[Direction]) -> Result<()> {
        if adversary_moves.len() != self.adversaries.len() {
            return Err(Error::AdversaryMoveCount {
                expected: self.adversaries.len(),
                got: adversary_moves.len(),
            });
        }
        if self.is_terminal() {
            return Ok(());
        }

        let agent_before = self.agent;
        let adversaries_before: Vec<NodeIndex> = self.adversaries.iter().map(|a| a.node).collect();

        self.move_agent(agent_move);
        self.eat_at_agent();
        for (index, &requested) in adversary_moves.iter().enumerate() {
            self.move_adversary(index, requested);
        }
        self.resolve_collisions(agent_before, &adversaries_before);

        self.tick += 1;
        Ok(())
    }
}

fn active_nodes(flags: &[bool]) -> Vec<NodeIndex> {
    flags
        .iter()
        .enumerate()
        .filter_map(|(node, &active)| active.then_some(node))
        .collect()
}

impl fmt::Display for Game {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in 0..self.maze.height() {
            for col in 0..self.maze.width() {
                let Some(node) = self.maze.node_at(row, col) else {
                    write!(f, "#")?;
                    continue;
                };
                let adversary = self
                    .adversaries
                    .iter()
                    .find(|a| !a.is_caged() && a.node == node);
                let cell = if node == self.agent {
                    'P'
                } else if let Some(adversary) = adversary {
                    if adversary.is_vulnerable() { 'g' } else { 'G' }
                } else if self.power_pills[node] {
                    'o'
                } else if self.pills[node] {
                    '.'
                } else {
                    ' '
                };
                write!(f, "{cell}")?;
            }
            writeln!(f)?;
        }
        write!(f, "score {} | tick {}", self.score, self.tick)
    }
}
