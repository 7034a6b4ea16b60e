//! Per-move feature vectors

use std::collections::{HashSet, VecDeque};

use crate::{
    Error, Result,
    features::{
        safety::{MAX_PATH_LENGTH, SafetyAnalyzer, SafetyConfig, SearchNode, expand, junction_path},
        schema::{self, BASE_DIM, FEATURE_DIM},
    },
    maze::{AdversaryState, Direction, NodeIndex},
    ports::MazeQuery,
    vector::Vector,
};

/// Computes feature vectors for candidate moves.
#[derive(Debug, Clone, Copy, Default)]
pub struct FeatureExtractor {
    config: SafetyConfig,
}

impl FeatureExtractor {
    pub fn new(config: SafetyConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SafetyConfig {
        &self.config
    }

    /// The [`BASE_DIM`] base features of moving from `node` in `direction`.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidMove`] if `direction` is not traversable from `node`.
    pub fn base_features<G: MazeQuery + ?Sized>(
        &self,
        game: &G,
        node: NodeIndex,
        direction: Direction,
    ) -> Result<Vector> {
        let node_count = game.node_count();
        if node >= node_count {
            return Err(Error::InvalidNode { node, node_count });
        }
        if game.neighbor(node, direction).is_none() {
            return Err(Error::InvalidMove { node, direction });
        }

        let analyzer = SafetyAnalyzer::new(game, self.config)?;
        let (threats, vulnerable): (Vec<&AdversaryState>, Vec<&AdversaryState>) = game
            .adversaries()
            .iter()
            .filter(|a| !a.is_caged())
            .partition(|a| a.is_threat());
        let threats: Vec<NodeIndex> = threats.iter().map(|a| a.node).collect();
        let vulnerable: Vec<NodeIndex> = vulnerable.iter().map(|a| a.node).collect();

        let last = game.agent_last_direction();
        let reversal = last != Direction::Neutral && direction == last.opposite();

        let mut f = vec![0.0; BASE_DIM];
        f[schema::SAFE_PATH_LENGTH] = analyzer.longest_safe_path_two_phase(node, direction)?;
        f[schema::SAFE_PATH_COUNT] = analyzer.safe_path_count(node, direction)?;
        f[schema::JUNCTION_DISTANCE] = junction_distance(game, node, direction)?;
        f[schema::PILL_DENSITY] = pill_density(game, node, direction)?;
        f[schema::PILL_DISTANCE] = minimum_distance(game, node, direction, &game.active_pill_nodes())?;
        f[schema::POWER_PILL_DISTANCE] =
            minimum_distance(game, node, direction, &game.active_power_pill_nodes())?;
        f[schema::THREAT_DISTANCE] = minimum_distance(game, node, direction, &threats)?;
        f[schema::VULNERABLE_DISTANCE] = minimum_distance(game, node, direction, &vulnerable)?;
        f[schema::VULNERABILITY_TIME] = remaining_vulnerability(game);
        f[schema::COMPLETABLE] = analyzer.completability(node, direction)?;
        f[schema::REVERSAL] = if reversal { 1.0 } else { 0.0 };
        f[schema::PILLS_REMAINING] = remaining_pills(game);
        Ok(Vector::from(f))
    }

    /// Base features followed by the derived entries, [`FEATURE_DIM`] in total.
    pub fn features<G: MazeQuery + ?Sized>(
        &self,
        game: &G,
        node: NodeIndex,
        direction: Direction,
    ) -> Result<Vector> {
        extend_features(&self.base_features(game, node, direction)?)
    }
}

/// Append the derived entries to a base vector. The first [`BASE_DIM`]
/// entries of the result are the input, unchanged.
pub fn extend_features(base: &Vector) -> Result<Vector> {
    if base.dimension() != BASE_DIM {
        return Err(Error::DimensionMismatch {
            expected: BASE_DIM,
            got: base.dimension(),
        });
    }
    let mut values = Vec::with_capacity(FEATURE_DIM);
    values.extend_from_slice(base.as_slice());
    values.extend(schema::derived(base.as_slice()));
    Ok(Vector::from(values))
}

/// Shortest walk length from `start` via `direction` to any node in `goals`,
/// scaled by [`MAX_PATH_LENGTH`]. Returns 1 when `goals` is empty or no goal
/// can be reached.
///
/// The search never steps straight back. If it comes round to `start` before
/// meeting a goal, the remaining frontier is finished with shortest-path
/// distances instead.
pub fn minimum_distance<G: MazeQuery + ?Sized>(
    game: &G,
    start: NodeIndex,
    direction: Direction,
    goals: &[NodeIndex],
) -> Result<f64> {
    if goals.is_empty() {
        return Ok(1.0);
    }
    let next = game.neighbor(start, direction).ok_or(Error::InvalidMove {
        node: start,
        direction,
    })?;
    let goals: HashSet<NodeIndex> = goals.iter().copied().collect();
    if goals.contains(&start) {
        return Ok(0.0);
    }

    let scale = |depth: usize| depth.min(MAX_PATH_LENGTH) as f64 / MAX_PATH_LENGTH as f64;
    let origin = SearchNode::new(next, start, 1);
    let mut queue = VecDeque::from([origin]);
    let mut seen = HashSet::from([(origin.node, origin.predecessor, origin.depth)]);

    while let Some(current) = queue.pop_front() {
        if current.node == start {
            let best = std::iter::once(current)
                .chain(queue.iter().copied())
                .flat_map(|frontier| {
                    goals.iter().filter_map(move |&goal| {
                        game.shortest_path_distance(frontier.node, goal)
                            .map(|d| frontier.depth + d)
                    })
                })
                .min()
                .unwrap_or(MAX_PATH_LENGTH);
            return Ok(scale(best));
        }
        if goals.contains(&current.node) {
            return Ok(scale(current.depth));
        }
        if current.depth >= MAX_PATH_LENGTH {
            continue;
        }
        for child in expand(game, &current) {
            if seen.insert((child.node, child.predecessor, child.depth)) {
                queue.push_back(child);
            }
        }
    }
    Ok(1.0)
}

/// Length of the corridor ahead up to the next junction, scaled.
pub fn junction_distance<G: MazeQuery + ?Sized>(
    game: &G,
    start: NodeIndex,
    direction: Direction,
) -> Result<f64> {
    let path = corridor_ahead(game, start, direction)?;
    Ok(path.len() as f64 / MAX_PATH_LENGTH as f64)
}

/// Fraction of the corridor ahead that still carries a pill or power pill.
pub fn pill_density<G: MazeQuery + ?Sized>(
    game: &G,
    start: NodeIndex,
    direction: Direction,
) -> Result<f64> {
    let path = corridor_ahead(game, start, direction)?;
    let pills = path
        .iter()
        .filter(|&&n| game.is_pill_available(n) || game.is_power_pill_available(n))
        .count();
    Ok(pills as f64 / path.len() as f64)
}

fn corridor_ahead<G: MazeQuery + ?Sized>(
    game: &G,
    start: NodeIndex,
    direction: Direction,
) -> Result<Vec<NodeIndex>> {
    let next = game.neighbor(start, direction).ok_or(Error::InvalidMove {
        node: start,
        direction,
    })?;
    junction_path(game, next, direction)
}

/// Longest remaining vulnerability among free adversaries, scaled to `[0, 1]`.
pub fn remaining_vulnerability<G: MazeQuery + ?Sized>(game: &G) -> f64 {
    let duration = game.vulnerability_duration();
    if duration == 0 {
        return 0.0;
    }
    let remaining = game
        .adversaries()
        .iter()
        .filter(|a| a.is_vulnerable())
        .map(|a| a.vulnerable_time)
        .max()
        .unwrap_or(0);
    (remaining as f64 / duration as f64).min(1.0)
}

/// Remaining pills and power pills as a fraction of the starting amount.
pub fn remaining_pills<G: MazeQuery + ?Sized>(game: &G) -> f64 {
    match game.total_pill_count() {
        0 => 0.0,
        total => game.active_pill_count() as f64 / total as f64,
    }
}
