//! Adversary reachability and safe-path searches
//!
//! A node is *safe* at depth `t` when no adversary can occupy it within
//! `t + eat_margin` ticks. The searches below walk the maze breadth-first
//! from the node a candidate move leads to and drop every node that is not
//! safe at the depth it is reached.
//!
//! Free adversaries are assumed to keep running to the next junction before
//! they can choose a direction, which is what makes the estimate tighter
//! than plain shortest-path distances.

use std::collections::{HashSet, VecDeque};

use serde::{Deserialize, Serialize};

use crate::{
    Error, Result,
    maze::{Direction, NodeIndex},
    ports::MazeQuery,
};

/// Normalisation constant for every path-length feature.
pub const MAX_PATH_LENGTH: usize = 221;

/// Search parameters for the safety features.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SafetyConfig {
    /// Capture proximity in ticks.
    pub eat_margin: usize,
    /// Depth at which the safe-path search stops.
    pub depth_limit: usize,
    /// Depth of the node-by-node phase before junction hopping starts.
    pub first_phase_depth: usize,
    /// Depth at which safe branches are counted.
    pub count_depth: usize,
    /// Branch count that maps to a feature value of 1.
    pub count_cap: usize,
}

impl Default for SafetyConfig {
    fn default() -> Self {
        Self {
            eat_margin: 1,
            depth_limit: 60,
            first_phase_depth: 16,
            count_depth: 12,
            count_cap: 8,
        }
    }
}

impl SafetyConfig {
    pub fn validate(&self) -> Result<()> {
        if self.depth_limit == 0 || self.depth_limit > MAX_PATH_LENGTH {
            return Err(Error::InvalidConfiguration {
                message: format!(
                    "safety.depth_limit must be in 1..={MAX_PATH_LENGTH}, got {}",
                    self.depth_limit
                ),
            });
        }
        if self.first_phase_depth == 0 || self.count_depth == 0 || self.count_cap == 0 {
            return Err(Error::InvalidConfiguration {
                message: "safety.first_phase_depth, count_depth and count_cap must be positive"
                    .to_string(),
            });
        }
        Ok(())
    }
}

/// Node of a breadth-first search tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct SearchNode {
    pub node: NodeIndex,
    pub predecessor: NodeIndex,
    pub depth: usize,
}

impl SearchNode {
    pub fn new(node: NodeIndex, predecessor: NodeIndex, depth: usize) -> Self {
        Self {
            node,
            predecessor,
            depth,
        }
    }

    fn key(&self) -> (NodeIndex, NodeIndex, usize) {
        (self.node, self.predecessor, self.depth)
    }
}

/// Children of a search node, never stepping straight back.
pub(crate) fn expand<G: MazeQuery + ?Sized>(game: &G, parent: &SearchNode) -> Vec<SearchNode> {
    game.possible_directions(parent.node)
        .into_iter()
        .filter_map(|d| game.neighbor(parent.node, d))
        .filter(|&next| next != parent.predecessor)
        .map(|next| SearchNode::new(next, parent.node, parent.depth + 1))
        .collect()
}

/// First direction at `node` other than straight back against `heading`.
fn continuation<G: MazeQuery + ?Sized>(game: &G, node: NodeIndex, heading: Direction) -> Option<Direction> {
    let back = heading.opposite();
    game.possible_directions(node).into_iter().find(|&d| d != back)
}

/// Nodes from `node` along `direction` up to and including the next junction.
///
/// Corners are followed. When `direction` is blocked at `node` but `node` was
/// entered moving that way, the corridor's continuation is taken instead. The
/// walk also stops at a dead end or when it comes back round to `node`.
///
/// # Errors
///
/// [`Error::NeutralDirection`] for `Direction::Neutral`, and
/// [`Error::NoTurnAvailable`] when `direction` is blocked and does not
/// continue the corridor.
pub fn junction_path<G: MazeQuery + ?Sized>(
    game: &G,
    node: NodeIndex,
    direction: Direction,
) -> Result<Vec<NodeIndex>> {
    if direction == Direction::Neutral {
        return Err(Error::NeutralDirection { node });
    }
    let node_count = game.node_count();
    if node >= node_count {
        return Err(Error::InvalidNode { node, node_count });
    }
    if game.is_junction(node) {
        return Ok(vec![node]);
    }

    let mut heading = direction;
    if game.neighbor(node, heading).is_none() {
        if !game.possible_directions(node).contains(&heading.opposite()) {
            return Err(Error::NoTurnAvailable { node, direction });
        }
        match continuation(game, node, heading) {
            Some(turn) => heading = turn,
            None => return Ok(vec![node]),
        }
    }

    let mut path = vec![node];
    let mut current = node;
    while !game.is_junction(current) {
        if game.neighbor(current, heading).is_none() {
            match continuation(game, current, heading) {
                Some(turn) => heading = turn,
                None => break,
            }
        }
        let Some(next) = game.neighbor(current, heading) else {
            break;
        };
        if next == node {
            break;
        }
        path.push(next);
        current = next;
    }
    Ok(path)
}

#[derive(Debug, Clone)]
enum Threat {
    Caged { countdown: usize },
    Roaming { path: Vec<NodeIndex> },
}

/// Safety queries over one game state.
///
/// Adversary paths are derived once on construction; build a new analyzer
/// for every state.
pub struct SafetyAnalyzer<'a, G: ?Sized> {
    game: &'a G,
    config: SafetyConfig,
    threats: Vec<Threat>,
    release_node: NodeIndex,
}

impl<'a, G: MazeQuery + ?Sized> SafetyAnalyzer<'a, G> {
    pub fn new(game: &'a G, config: SafetyConfig) -> Result<Self> {
        let mut threats = Vec::new();
        for adversary in game.adversaries() {
            if adversary.is_caged() {
                threats.push(Threat::Caged {
                    countdown: adversary.lair_time as usize,
                });
            } else if adversary.is_threat() {
                let path = if adversary.last_direction == Direction::Neutral {
                    vec![adversary.node]
                } else {
                    junction_path(game, adversary.node, adversary.last_direction)?
                };
                threats.push(Threat::Roaming { path });
            }
        }
        Ok(Self {
            game,
            config,
            threats,
            release_node: game.adversary_release_node(),
        })
    }

    pub fn config(&self) -> &SafetyConfig {
        &self.config
    }

    /// True if some adversary can be on `node` within `time_limit` ticks.
    pub fn reachable_by_adversary(&self, node: NodeIndex, time_limit: usize) -> bool {
        self.threats.iter().any(|threat| match threat {
            Threat::Caged { countdown } => self
                .game
                .shortest_path_distance(self.release_node, node)
                .is_some_and(|d| countdown + d <= time_limit),
            Threat::Roaming { path } => {
                let on_path = path
                    .iter()
                    .take(time_limit.saturating_add(1))
                    .any(|&n| n == node);
                let Some(&junction) = path.last() else {
                    return on_path;
                };
                let to_junction = path.len() - 1;
                on_path
                    || self
                        .game
                        .shortest_path_distance(junction, node)
                        .is_some_and(|d| to_junction + d <= time_limit)
            }
        })
    }

    fn is_safe(&self, node: NodeIndex, depth: usize) -> bool {
        !self.reachable_by_adversary(node, depth + self.config.eat_margin)
    }

    fn origin(&self, start: NodeIndex, direction: Direction) -> Result<SearchNode> {
        let next = self
            .game
            .neighbor(start, direction)
            .ok_or(Error::InvalidMove {
                node: start,
                direction,
            })?;
        Ok(SearchNode::new(next, start, 1))
    }

    /// Node-by-node safe search. Returns the deepest safe depth and the
    /// search nodes that survived to `limit`.
    fn safe_frontier(&self, origin: SearchNode, limit: usize) -> (usize, Vec<SearchNode>) {
        let mut queue = VecDeque::from([origin]);
        let mut seen = HashSet::from([origin.key()]);
        let mut max_depth = 0;
        let mut survivors = Vec::new();

        while let Some(current) = queue.pop_front() {
            if !self.is_safe(current.node, current.depth) {
                continue;
            }
            max_depth = max_depth.max(current.depth);
            if current.depth >= limit {
                survivors.push(current);
                continue;
            }
            for child in expand(self.game, &current) {
                if seen.insert(child.key()) {
                    queue.push_back(child);
                }
            }
        }
        (max_depth.min(limit), survivors)
    }

    /// Longest safe path after taking `direction` from `start`, searched
    /// node by node. In `[0, depth_limit / MAX_PATH_LENGTH]`.
    pub fn longest_safe_path(&self, start: NodeIndex, direction: Direction) -> Result<f64> {
        let origin = self.origin(start, direction)?;
        let (depth, _) = self.safe_frontier(origin, self.config.depth_limit);
        Ok(depth as f64 / MAX_PATH_LENGTH as f64)
    }

    /// Two-phase variant: a short node-by-node search, then whole corridor
    /// segments at a time between junctions. Same range as
    /// [`Self::longest_safe_path`].
    pub fn longest_safe_path_two_phase(&self, start: NodeIndex, direction: Direction) -> Result<f64> {
        let limit = self.config.depth_limit;
        let origin = self.origin(start, direction)?;
        let first_limit = self.config.first_phase_depth.min(limit);
        let (mut best, survivors) = self.safe_frontier(origin, first_limit);
        if survivors.is_empty() || best >= limit {
            return Ok(best as f64 / MAX_PATH_LENGTH as f64);
        }

        let mut queue: VecDeque<SearchNode> = survivors.iter().copied().collect();
        let mut seen: HashSet<_> = survivors.iter().map(SearchNode::key).collect();

        while let Some(current) = queue.pop_front() {
            for step in expand(self.game, &current) {
                match self.hop(step, limit) {
                    Hop::Junction(junction) => {
                        best = best.max(junction.depth);
                        if seen.insert(junction.key()) {
                            queue.push_back(junction);
                        }
                    }
                    Hop::Stopped(depth) => best = best.max(depth),
                }
                if best >= limit {
                    return Ok(limit as f64 / MAX_PATH_LENGTH as f64);
                }
            }
        }
        Ok(best.min(limit) as f64 / MAX_PATH_LENGTH as f64)
    }

    /// Follow one corridor segment starting with `step` until a junction,
    /// an unsafe node, a dead end or the depth limit.
    fn hop(&self, step: SearchNode, limit: usize) -> Hop {
        let mut current = step;
        loop {
            if !self.is_safe(current.node, current.depth) {
                return Hop::Stopped(current.depth - 1);
            }
            if current.depth >= limit {
                return Hop::Stopped(current.depth);
            }
            if self.game.is_junction(current.node) {
                return Hop::Junction(current);
            }
            match expand(self.game, &current).first() {
                Some(next) => current = *next,
                None => return Hop::Stopped(current.depth),
            }
        }
    }

    /// Number of safe branches at `count_depth`, capped and scaled to `[0, 1]`.
    pub fn safe_path_count(&self, start: NodeIndex, direction: Direction) -> Result<f64> {
        let origin = self.origin(start, direction)?;
        let (_, survivors) = self.safe_frontier(origin, self.config.count_depth);
        let cap = self.config.count_cap;
        Ok(survivors.len().min(cap) as f64 / cap as f64)
    }

    /// 1 if every remaining pill lies on the safe stretch of the corridor
    /// ahead, 0 otherwise.
    pub fn completability(&self, start: NodeIndex, direction: Direction) -> Result<f64> {
        let origin = self.origin(start, direction)?;
        let path = junction_path(self.game, origin.node, direction)?;
        let mut collected = 0;
        for (offset, &node) in path.iter().enumerate() {
            if !self.is_safe(node, offset + 1) {
                break;
            }
            if self.game.is_pill_available(node) || self.game.is_power_pill_available(node) {
                collected += 1;
            }
        }
        Ok(if collected == self.game.active_pill_count() {
            1.0
        } else {
            0.0
        })
    }
}

enum Hop {
    Junction(SearchNode),
    Stopped(usize),
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::maze::{AdversaryState, Game, Maze};

    fn ring_with(adversaries: Vec<AdversaryState>) -> Game {
        Game::new(Arc::new(Maze::builtin("ring").unwrap()), 0)
            .with_adversaries(adversaries)
            .unwrap()
    }

    #[test]
    fn junction_path_follows_corners_and_stops_on_cycle() {
        let game = ring_with(vec![]);
        assert_eq!(junction_path(&game, 3, Direction::Up).unwrap(), vec![3, 1, 0, 2]);
    }

    #[test]
    fn junction_path_rejects_neutral_and_dead_turns() {
        let game = ring_with(vec![]);
        assert!(matches!(
            junction_path(&game, 0, Direction::Neutral),
            Err(Error::NeutralDirection { node: 0 })
        ));

        // straight horizontal corridor: Up is blocked and does not continue it
        let maze = Arc::new(Maze::builtin("lattice").unwrap());
        let corridor = maze.node_at(1, 2).unwrap();
        let game = Game::new(maze, 0);
        assert!(matches!(
            junction_path(&game, corridor, Direction::Up),
            Err(Error::NoTurnAvailable { .. })
        ));
        assert_eq!(junction_path(&game, corridor, Direction::Right).unwrap().len(), 2);
    }

    #[test]
    fn junction_path_at_junction_is_single_node() {
        let maze = Arc::new(Maze::builtin("lattice").unwrap());
        let game = Game::new(maze.clone(), 0);
        let junction = (0..maze.node_count())
            .find(|&n| maze.is_junction(n))
            .unwrap();
        assert_eq!(
            junction_path(&game, junction, Direction::Up).unwrap(),
            vec![junction]
        );
    }

    #[test]
    fn caged_adversary_arrives_after_countdown() {
        let game = ring_with(vec![AdversaryState::caged(1, 3)]);
        let analyzer = SafetyAnalyzer::new(&game, SafetyConfig::default()).unwrap();
        // release node 1 is two steps from node 2
        assert!(!analyzer.reachable_by_adversary(2, 4));
        assert!(analyzer.reachable_by_adversary(2, 5));
    }

    #[test]
    fn vulnerable_adversaries_are_ignored() {
        let game = ring_with(vec![
            AdversaryState::roaming(1, Direction::Left).with_vulnerable_time(10),
        ]);
        let analyzer = SafetyAnalyzer::new(&game, SafetyConfig::default()).unwrap();
        for node in 0..4 {
            assert!(!analyzer.reachable_by_adversary(node, 100));
        }
    }

    #[test]
    fn moving_toward_adversary_is_less_safe() {
        let game = ring_with(vec![AdversaryState::roaming(3, Direction::Up)]);
        let analyzer = SafetyAnalyzer::new(&game, SafetyConfig::default()).unwrap();
        let toward = analyzer.longest_safe_path(0, Direction::Right).unwrap();
        let away = analyzer.longest_safe_path(0, Direction::Down).unwrap();
        assert_eq!(toward, 0.0);
        assert!(toward < away);
        assert!(
            analyzer.longest_safe_path_two_phase(0, Direction::Right).unwrap()
                < analyzer.longest_safe_path_two_phase(0, Direction::Down).unwrap()
        );
    }

    #[test]
    fn invalid_move_is_an_error() {
        let game = ring_with(vec![]);
        let analyzer = SafetyAnalyzer::new(&game, SafetyConfig::default()).unwrap();
        assert!(matches!(
            analyzer.longest_safe_path(0, Direction::Up),
            Err(Error::InvalidMove { node: 0, direction: Direction::Up })
        ));
        assert!(analyzer.safe_path_count(0, Direction::Neutral).is_err());
    }

    #[test]
    fn no_threats_reaches_depth_limit() {
        let game = ring_with(vec![]);
        let config = SafetyConfig::default();
        let analyzer = SafetyAnalyzer::new(&game, config).unwrap();
        let expected = config.depth_limit as f64 / MAX_PATH_LENGTH as f64;
        assert_eq!(analyzer.longest_safe_path(0, Direction::Down).unwrap(), expected);
        assert_eq!(
            analyzer.longest_safe_path_two_phase(0, Direction::Down).unwrap(),
            expected
        );
    }

    #[test]
    fn completability_requires_every_pill_on_safe_corridor() {
        let game = ring_with(vec![]).with_pills(&[2, 3], &[]).unwrap();
        let analyzer = SafetyAnalyzer::new(&game, SafetyConfig::default()).unwrap();
        assert_eq!(analyzer.completability(0, Direction::Down).unwrap(), 1.0);

        let game = ring_with(vec![AdversaryState::roaming(3, Direction::Left)])
            .with_pills(&[2, 3], &[])
            .unwrap();
        let analyzer = SafetyAnalyzer::new(&game, SafetyConfig::default()).unwrap();
        assert_eq!(analyzer.completability(0, Direction::Down).unwrap(), 0.0);
    }

    #[test]
    fn reachability_is_monotonic_in_time() {
        let maze = Arc::new(Maze::builtin("classic").unwrap());
        let nodes = maze.node_count();
        for offset in 0..5 {
            let mut adversaries: Vec<AdversaryState> = (offset..nodes)
                .step_by(37)
                .filter_map(|node| {
                    let direction = *maze.possible_directions(node).first()?;
                    Some(AdversaryState::roaming(node, direction))
                })
                .collect();
            adversaries.push(AdversaryState::caged(offset * 11 % nodes, offset as u32 * 3));
            let game = Game::new(maze.clone(), 0)
                .with_adversaries(adversaries)
                .unwrap();
            let analyzer = SafetyAnalyzer::new(&game, SafetyConfig::default()).unwrap();
            for node in 0..nodes {
                let mut reached = false;
                for t in 0..80 {
                    let now = analyzer.reachable_by_adversary(node, t);
                    assert!(!reached || now, "node {node} lost at t = {t}");
                    reached = now;
                }
            }
        }
    }

    fn counting(count_depth: usize, count_cap: usize) -> SafetyConfig {
        SafetyConfig {
            count_depth,
            count_cap,
            ..SafetyConfig::default()
        }
    }

    #[test]
    fn safe_path_count_counts_branches_and_saturates() {
        let maze = Arc::new(Maze::builtin("lattice").unwrap());
        let start = maze.node_at(5, 3).unwrap();
        let game = Game::new(maze, 0).with_adversaries(vec![]).unwrap();

        let wide = SafetyAnalyzer::new(&game, counting(4, 200)).unwrap();
        let branches = wide.safe_path_count(start, Direction::Up).unwrap() * 200.0;
        assert!(branches >= 2.0, "only {branches} branches");
        assert!(branches < 200.0);

        for cap in [1, 2] {
            let capped = SafetyAnalyzer::new(&game, counting(4, cap)).unwrap();
            assert_eq!(capped.safe_path_count(start, Direction::Up).unwrap(), 1.0);
        }
    }

    #[test]
    fn safe_path_count_drops_as_a_threat_closes_in() {
        let maze = Arc::new(Maze::builtin("lattice").unwrap());
        let agent = maze.node_at(5, 1).unwrap();
        let count = |adversaries: Vec<AdversaryState>| {
            let game = Game::new(maze.clone(), 0)
                .with_agent(agent, Direction::Neutral)
                .unwrap()
                .with_adversaries(adversaries)
                .unwrap();
            SafetyAnalyzer::new(&game, counting(4, 100))
                .unwrap()
                .safe_path_count(agent, Direction::Right)
                .unwrap()
        };

        let open = count(vec![]);
        assert!(open > 0.0);
        let mut previous = open;
        for column in (2..=5).rev() {
            let threat = maze.node_at(5, column).unwrap();
            let now = count(vec![AdversaryState::roaming(threat, Direction::Left)]);
            assert!(now <= previous, "column {column}: {now} > {previous}");
            previous = now;
        }
        assert_eq!(previous, 0.0);
    }
}
