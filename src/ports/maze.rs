//! Maze port - the queries the feature engine needs from a game state
//!
//! The safety analysis and feature extraction never look at a concrete game.
//! They only ask graph questions (adjacency, junctions, shortest paths) and
//! read adversary and pill state through [`MazeQuery`]. Playouts additionally
//! need to score and advance a game, which [`Simulation`] adds.

use crate::{
    Result,
    maze::{AdversaryState, Direction, NodeIndex},
};

/// Read-only view of a maze graph and the entities on it.
///
/// Directions returned by [`MazeQuery::possible_directions`] are always
/// traversable, i.e. `neighbor(node, d)` is `Some` for each of them.
pub trait MazeQuery {
    /// Number of nodes in the graph.
    fn node_count(&self) -> usize;

    /// Node reached by moving one step from `node` in `direction`.
    fn neighbor(&self, node: NodeIndex, direction: Direction) -> Option<NodeIndex>;

    /// A junction has more than two traversable neighbours.
    fn is_junction(&self, node: NodeIndex) -> bool;

    /// Traversable directions at `node`, in `Direction::MOVES` order.
    fn possible_directions(&self, node: NodeIndex) -> Vec<Direction>;

    /// Length of the shortest path between two nodes, if one exists.
    fn shortest_path_distance(&self, from: NodeIndex, to: NodeIndex) -> Option<usize>;

    /// Current state of every adversary.
    fn adversaries(&self) -> &[AdversaryState];

    /// Node where caged adversaries enter the maze.
    fn adversary_release_node(&self) -> NodeIndex;

    fn agent_node(&self) -> NodeIndex;

    fn agent_last_direction(&self) -> Direction;

    fn is_pill_available(&self, node: NodeIndex) -> bool;

    fn is_power_pill_available(&self, node: NodeIndex) -> bool;

    fn active_pill_nodes(&self) -> Vec<NodeIndex>;

    fn active_power_pill_nodes(&self) -> Vec<NodeIndex>;

    /// Remaining pills plus remaining power pills.
    fn active_pill_count(&self) -> usize;

    /// Pills plus power pills the maze started with.
    fn total_pill_count(&self) -> usize;

    /// Number of ticks an adversary stays vulnerable after a power pill.
    fn vulnerability_duration(&self) -> u32;
}

/// A game that can be played forward.
pub trait Simulation: MazeQuery + Send {
    fn score(&self) -> i64;

    /// True once the agent was captured or nothing is left to eat.
    fn is_terminal(&self) -> bool;

    /// Ticks played so far.
    fn tick(&self) -> usize;

    /// Advance one tick with the agent's move and one move per adversary.
    ///
    /// # Errors
    ///
    /// Returns an error if `adversary_moves` does not hold exactly one
    /// direction per adversary.
    fn advance(&mut self, agent_move: Direction, adversary_moves: &[Direction]) -> Result<()>;
}
