//! Maze layouts and the node graph derived from them
//!
//! Layouts are written as ASCII grids:
//!
//! | char | meaning                              |
//! |------|--------------------------------------|
//! | `#`  | wall                                 |
//! | `.`  | corridor with a pill                 |
//! | `o`  | corridor with a power pill           |
//! | ` `  | empty corridor                       |
//! | `P`  | agent start (empty corridor)         |
//! | `G`  | adversary release node (empty corridor) |
//!
//! Every non-wall cell becomes a node, numbered row by row. Shortest-path
//! distances between all node pairs are computed once with breadth-first
//! search, so [`Maze::distance`] is a table lookup.

use std::collections::VecDeque;

use crate::{
    Error, Result,
    maze::{Direction, NodeIndex},
};

const UNREACHABLE: u32 = u32::MAX;

/// Twenty-one by eleven maze with five horizontal corridors.
pub const CLASSIC: &str = "\
#####################
#o.................o#
#.###.####.####.###.#
#...................#
#.#####.#####.#####.#
#.........G.........#
#.#####.#####.#####.#
#.........P.........#
#.###.####.####.###.#
#o.................o#
#####################";

/// Small lattice, handy for quick runs.
pub const LATTICE: &str = "\
#######
#o...o#
#.#.#.#
#..G..#
#.#.#.#
#o.P.o#
#######";

/// Four nodes on a single cycle, no junctions.
pub const RING: &str = "\
####
#PG#
#..#
####";

const BUILTIN: [(&str, &str); 3] = [("classic", CLASSIC), ("lattice", LATTICE), ("ring", RING)];

/// Immutable maze graph.
#[derive(Debug, Clone)]
pub struct Maze {
    name: String,
    width: usize,
    height: usize,
    positions: Vec<(usize, usize)>,
    neighbors: Vec<[Option<NodeIndex>; 4]>,
    distances: Vec<u32>,
    pills: Vec<NodeIndex>,
    power_pills: Vec<NodeIndex>,
    agent_start: NodeIndex,
    release_node: NodeIndex,
}

impl Maze {
    /// Names accepted by [`Maze::builtin`].
    pub fn builtin_names() -> Vec<&'static str> {
        BUILTIN.iter().map(|(name, _)| *name).collect()
    }

    /// Load one of the bundled layouts by name.
    pub fn builtin(name: &str) -> Result<Self> {
        let key = name.trim().to_ascii_lowercase();
        let (name, text) = BUILTIN
            .iter()
            .find(|(candidate, _)| *candidate == key)
            .ok_or_else(|| Error::UnknownLayout {
                name: name.to_string(),
                expected: Self::builtin_names().join(", "),
            })?;
        Self::parse(name, text)
    }

    /// Build a maze from an ASCII layout.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidLayout`] for unknown characters, a missing or
    /// repeated `P`/`G` marker, or a layout without pills.
    pub fn parse(name: &str, text: &str) -> Result<Self> {
        let rows: Vec<Vec<char>> = text
            .lines()
            .map(|line| line.trim_end_matches('\r'))
            .filter(|line| !line.trim().is_empty())
            .map(|line| line.chars().collect())
            .collect();
        let height = rows.len();
        let width = rows.iter().map(Vec::len).max().unwrap_or(0);
        if height == 0 || width == 0 {
            return Err(Error::InvalidLayout {
                message: format!("layout '{name}' is empty"),
            });
        }

        let mut grid: Vec<Option<NodeIndex>> = vec![None; width * height];
        let mut positions = Vec::new();
        let mut pills = Vec::new();
        let mut power_pills = Vec::new();
        let mut agent_start = None;
        let mut release_node = None;

        for (row, line) in rows.iter().enumerate() {
            for (col, &cell) in line.iter().enumerate() {
                if cell == '#' {
                    continue;
                }
                let node = positions.len();
                match cell {
                    '.' => pills.push(node),
                    'o' => power_pills.push(node),
                    ' ' => {}
                    'P' => {
                        if agent_start.replace(node).is_some() {
                            return Err(Error::InvalidLayout {
                                message: format!("layout '{name}' has more than one 'P'"),
                            });
                        }
                    }
                    'G' => {
                        if release_node.replace(node).is_some() {
                            return Err(Error::InvalidLayout {
                                message: format!("layout '{name}' has more than one 'G'"),
                            });
                        }
                    }
                    other => {
                        return Err(Error::InvalidLayout {
                            message: format!(
                                "unexpected character '{other}' at row {row}, column {col} in '{name}'"
                            ),
                        });
                    }
                }
                grid[row * width + col] = Some(node);
                positions.push((row, col));
            }
        }

        let agent_start = agent_start.ok_or_else(|| Error::InvalidLayout {
            message: format!("layout '{name}' has no agent start 'P'"),
        })?;
        let release_node = release_node.ok_or_else(|| Error::InvalidLayout {
            message: format!("layout '{name}' has no release node 'G'"),
        })?;
        if pills.is_empty() && power_pills.is_empty() {
            return Err(Error::InvalidLayout {
                message: format!("layout '{name}' has no pills"),
            });
        }

        let neighbors = positions
            .iter()
            .map(|&(row, col)| {
                let mut slots = [None; 4];
                for direction in Direction::MOVES {
                    let (dr, dc) = direction.offset();
                    let (Some(r), Some(c)) =
                        (row.checked_add_signed(dr), col.checked_add_signed(dc))
                    else {
                        continue;
                    };
                    if r < height && c < width {
                        if let (Some(slot), Some(node)) = (direction.slot(), grid[r * width + c]) {
                            slots[slot] = Some(node);
                        }
                    }
                }
                slots
            })
            .collect::<Vec<_>>();

        let distances = all_pairs_distances(&neighbors);

        Ok(Self {
            name: name.to_string(),
            width,
            height,
            positions,
            neighbors,
            distances,
            pills,
            power_pills,
            agent_start,
            release_node,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn node_count(&self) -> usize {
        self.positions.len()
    }

    /// Grid coordinates (row, column) of a node.
    pub fn position(&self, node: NodeIndex) -> Option<(usize, usize)> {
        self.positions.get(node).copied()
    }

    pub fn neighbor(&self, node: NodeIndex, direction: Direction) -> Option<NodeIndex> {
        let slot = direction.slot()?;
        self.neighbors.get(node)?[slot]
    }

    pub fn possible_directions(&self, node: NodeIndex) -> Vec<Direction> {
        Direction::MOVES
            .into_iter()
            .filter(|&direction| self.neighbor(node, direction).is_some())
            .collect()
    }

    pub fn is_junction(&self, node: NodeIndex) -> bool {
        self.neighbors
            .get(node)
            .is_some_and(|slots| slots.iter().flatten().count() > 2)
    }

    pub fn distance(&self, from: NodeIndex, to: NodeIndex) -> Option<usize> {
        let n = self.node_count();
        if from >= n || to >= n {
            return None;
        }
        match self.distances[from * n + to] {
            UNREACHABLE => None,
            d => Some(d as usize),
        }
    }

    /// Nodes that start with a pill.
    pub fn pills(&self) -> &[NodeIndex] {
        &self.pills
    }

    /// Nodes that start with a power pill.
    pub fn power_pills(&self) -> &[NodeIndex] {
        &self.power_pills
    }

    pub fn agent_start(&self) -> NodeIndex {
        self.agent_start
    }

    pub fn release_node(&self) -> NodeIndex {
        self.release_node
    }

    /// Node at grid coordinates, if that cell is open.
    pub fn node_at(&self, row: usize, col: usize) -> Option<NodeIndex> {
        self.positions.iter().position(|&p| p == (row, col))
    }
}

fn all_pairs_distances(neighbors: &[[Option<NodeIndex>; 4]]) -> Vec<u32> {
    let n = neighbors.len();
    let mut distances = vec![UNREACHABLE; n * n];
    let mut queue = VecDeque::with_capacity(n);

    for source in 0..n {
        let row = &mut distances[source * n..(source + 1) * n];
        row[source] = 0;
        queue.clear();
        queue.push_back(source);
        while let Some(node) = queue.pop_front() {
            let next_distance = row[node] + 1;
            for neighbor in neighbors[node].iter().flatten() {
                if row[*neighbor] == UNREACHABLE {
                    row[*neighbor] = next_distance;
                    queue.push_back(*neighbor);
                }
            }
        }
    }

    distances
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ring_is_a_four_cycle_without_junctions() {
        let maze = Maze::builtin("ring").unwrap();
        assert_eq!(maze.node_count(), 4);
        for node in 0..4 {
            assert_eq!(maze.possible_directions(node).len(), 2);
            assert!(!maze.is_junction(node));
        }
        assert_eq!(maze.neighbor(0, Direction::Right), Some(1));
        assert_eq!(maze.neighbor(0, Direction::Down), Some(2));
        assert_eq!(maze.neighbor(0, Direction::Up), None);
        assert_eq!(maze.distance(0, 3), Some(2));
        assert_eq!(maze.distance(1, 2), Some(2));
    }

    #[test]
    fn classic_has_no_dead_ends() {
        let maze = Maze::builtin("classic").unwrap();
        for node in 0..maze.node_count() {
            assert!(
                maze.possible_directions(node).len() >= 2,
                "node {node} at {:?} is a dead end",
                maze.position(node)
            );
        }
        assert_eq!(maze.power_pills().len(), 4);
        let start = maze.agent_start();
        for node in 0..maze.node_count() {
            assert!(maze.distance(start, node).is_some());
        }
    }

    #[test]
    fn distances_are_symmetric() {
        let maze = Maze::builtin("lattice").unwrap();
        for a in 0..maze.node_count() {
            for b in 0..maze.node_count() {
                assert_eq!(maze.distance(a, b), maze.distance(b, a));
            }
        }
    }

    #[test]
    fn parse_rejects_bad_layouts() {
        assert!(matches!(
            Maze::parse("bad", "#P.x#"),
            Err(Error::InvalidLayout { .. })
        ));
        assert!(Maze::parse("no-release", "#P..#").is_err());
        assert!(Maze::parse("no-pills", "#PG #").is_err());
        assert!(matches!(
            Maze::builtin("nowhere"),
            Err(Error::UnknownLayout { .. })
        ));
    }
}
