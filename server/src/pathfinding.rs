//! Path finding over an area's walkable tiles
//!
//! The simulation only talks to [`PathFinder`]; [`TileGraph`] is the grid
//! implementation every area ships with.

use ::pathfinding::prelude::astar;
use shared::{Path, Vector};
use std::cmp::Ordering;
use std::collections::HashMap;

pub type NodeId = usize;

/// Search costs are kept in thousandths of a tile so they stay `Ord`
const STRAIGHT_COST: u32 = 1000;
const DIAGONAL_COST: u32 = 1414;

pub trait PathFinder: Send + Sync {
    /// Walkable node closest to `point`, if any is near
    fn nearest_node(&self, point: Vector) -> Option<NodeId>;

    fn node_position(&self, node: NodeId) -> Vector;

    /// Node positions from `from` to `to`, both included
    fn find_path(&self, from: NodeId, to: NodeId) -> Option<Path>;

    /// Every walkable node
    fn nodes(&self) -> Vec<NodeId>;

    /// Replaces the extra traversal cost of entering each node
    fn set_node_weights(&mut self, weights: HashMap<NodeId, f32>);
}

/// 8-connected grid where each walkable tile is a node at its integer
/// coordinates. Diagonal steps may not cut blocked corners.
#[derive(Debug, Clone)]
pub struct TileGraph {
    width: usize,
    height: usize,
    walkable: Vec<bool>,
    weights: HashMap<NodeId, f32>,
}

const NEIGHBOURS: [(i64, i64); 8] = [
    (1, 0),
    (-1, 0),
    (0, 1),
    (0, -1),
    (1, 1),
    (1, -1),
    (-1, 1),
    (-1, -1),
];

impl TileGraph {
    pub fn new(width: usize, height: usize, walkable: Vec<bool>) -> Self {
        debug_assert_eq!(walkable.len(), width * height);
        Self {
            width,
            height,
            walkable,
            weights: HashMap::new(),
        }
    }

    /// Parses rows of `.` (walkable) and anything else (blocked). Short rows
    /// are padded with blocked tiles.
    pub fn from_rows<S: AsRef<str>>(rows: &[S]) -> Self {
        let height = rows.len();
        let width = rows
            .iter()
            .map(|row| row.as_ref().chars().count())
            .max()
            .unwrap_or(0);
        let mut walkable = vec![false; width * height];
        for (y, row) in rows.iter().enumerate() {
            for (x, tile) in row.as_ref().chars().enumerate() {
                walkable[y * width + x] = tile == '.';
            }
        }
        Self::new(width, height, walkable)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn is_walkable(&self, x: i64, y: i64) -> bool {
        self.node_at(x, y).is_some()
    }

    fn node_at(&self, x: i64, y: i64) -> Option<NodeId> {
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
            return None;
        }
        let node = y as usize * self.width + x as usize;
        self.walkable[node].then_some(node)
    }

    fn coords_of(&self, node: NodeId) -> (i64, i64) {
        ((node % self.width) as i64, (node / self.width) as i64)
    }

    fn neighbours(&self, node: NodeId) -> impl Iterator<Item = (NodeId, u32)> + '_ {
        let (x, y) = self.coords_of(node);
        NEIGHBOURS.iter().filter_map(move |&(dx, dy)| {
            let next = self.node_at(x + dx, y + dy)?;
            if dx != 0 && dy != 0 {
                // no squeezing diagonally past a blocked tile
                self.node_at(x + dx, y)?;
                self.node_at(x, y + dy)?;
                return Some((next, DIAGONAL_COST + self.weight_of(next)));
            }
            Some((next, STRAIGHT_COST + self.weight_of(next)))
        })
    }

    fn weight_of(&self, node: NodeId) -> u32 {
        let weight = self.weights.get(&node).copied().unwrap_or(0.0);
        (weight.max(0.0) * STRAIGHT_COST as f32).round() as u32
    }

    /// Octile distance, admissible since weights only add cost
    fn heuristic(&self, a: NodeId, b: NodeId) -> u32 {
        let (ax, ay) = self.coords_of(a);
        let (bx, by) = self.coords_of(b);
        let dx = ax.abs_diff(bx) as u32;
        let dy = ay.abs_diff(by) as u32;
        let (long, short) = if dx > dy { (dx, dy) } else { (dy, dx) };
        (long - short) * STRAIGHT_COST + short * DIAGONAL_COST
    }
}

impl PathFinder for TileGraph {
    fn nearest_node(&self, point: Vector) -> Option<NodeId> {
        let tile = point.round();
        let (tx, ty) = (tile.x as i64, tile.y as i64);
        if let Some(node) = self.node_at(tx, ty) {
            return Some(node);
        }

        NEIGHBOURS
            .iter()
            .filter_map(|&(dx, dy)| self.node_at(tx + dx, ty + dy))
            .min_by(|a, b| {
                let da = self.node_position(*a).squared_distance(point);
                let db = self.node_position(*b).squared_distance(point);
                da.partial_cmp(&db).unwrap_or(Ordering::Equal).then(a.cmp(b))
            })
    }

    fn node_position(&self, node: NodeId) -> Vector {
        let (x, y) = self.coords_of(node);
        Vector::new(x as f32, y as f32)
    }

    fn find_path(&self, from: NodeId, to: NodeId) -> Option<Path> {
        if from >= self.walkable.len() || to >= self.walkable.len() {
            return None;
        }
        if !self.walkable[from] || !self.walkable[to] {
            return None;
        }

        let (nodes, _cost) = astar(
            &from,
            |&node| self.neighbours(node),
            |&node| self.heuristic(node, to),
            |&node| node == to,
        )?;
        Some(nodes.into_iter().map(|node| self.node_position(node)).collect())
    }

    fn nodes(&self) -> Vec<NodeId> {
        (0..self.walkable.len())
            .filter(|node| self.walkable[*node])
            .collect()
    }

    fn set_node_weights(&mut self, weights: HashMap<NodeId, f32>) {
        self.weights = weights;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use shared::path_length;

    fn open_field(size: usize) -> TileGraph {
        TileGraph::new(size, size, vec![true; size * size])
    }

    #[test]
    fn test_from_rows() {
        let graph = TileGraph::from_rows(&["..#", ".", "..."]);
        assert_eq!(graph.width(), 3);
        assert_eq!(graph.height(), 3);
        assert!(graph.is_walkable(0, 0));
        assert!(!graph.is_walkable(2, 0));
        assert!(!graph.is_walkable(1, 1));
        assert!(graph.is_walkable(2, 2));
        assert_eq!(graph.nodes().len(), 6);
    }

    #[test]
    fn test_nearest_node_rounds_to_tile() {
        let graph = open_field(5);
        let node = graph.nearest_node(Vector::new(2.4, 3.6)).unwrap();
        assert_eq!(graph.node_position(node), Vector::new(2.0, 4.0));
    }

    #[test]
    fn test_nearest_node_falls_back_to_adjacent() {
        let graph = TileGraph::from_rows(&["...", ".#.", "..."]);
        let node = graph.nearest_node(Vector::new(1.2, 1.4)).unwrap();
        assert_eq!(graph.node_position(node), Vector::new(1.0, 2.0));
        assert!(graph.nearest_node(Vector::new(40.0, 40.0)).is_none());
    }

    #[test]
    fn test_straight_path_includes_both_ends() {
        let graph = open_field(5);
        let from = graph.nearest_node(Vector::new(0.0, 0.0)).unwrap();
        let to = graph.nearest_node(Vector::new(3.0, 0.0)).unwrap();
        let path = graph.find_path(from, to).unwrap();
        assert_eq!(path.first(), Some(&Vector::new(0.0, 0.0)));
        assert_eq!(path.last(), Some(&Vector::new(3.0, 0.0)));
        assert_eq!(path.len(), 4);
    }

    #[test]
    fn test_diagonal_path_is_shortest() {
        let graph = open_field(6);
        let from = graph.nearest_node(Vector::new(0.0, 0.0)).unwrap();
        let to = graph.nearest_node(Vector::new(4.0, 4.0)).unwrap();
        let path = graph.find_path(from, to).unwrap();
        assert_approx_eq!(path_length(path[0], &path[1..]), 4.0 * 2f32.sqrt(), 1e-4);
    }

    #[test]
    fn test_path_around_wall_without_cutting_corners() {
        let graph = TileGraph::from_rows(&["...", "##.", "..."]);
        let from = graph.nearest_node(Vector::new(0.0, 0.0)).unwrap();
        let to = graph.nearest_node(Vector::new(0.0, 2.0)).unwrap();
        let path = graph.find_path(from, to).unwrap();

        assert!(path.contains(&Vector::new(2.0, 1.0)));
        for pair in path.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            if a.x != b.x && a.y != b.y {
                assert!(graph.is_walkable(b.x as i64, a.y as i64));
                assert!(graph.is_walkable(a.x as i64, b.y as i64));
            }
        }
    }

    #[test]
    fn test_unreachable_returns_none() {
        let graph = TileGraph::from_rows(&[".#.", "###", "..."]);
        let from = graph.nearest_node(Vector::new(0.0, 0.0)).unwrap();
        let to = graph.nearest_node(Vector::new(2.0, 2.0)).unwrap();
        assert!(graph.find_path(from, to).is_none());
    }

    #[test]
    fn test_same_node_path() {
        let graph = open_field(3);
        let node = graph.nearest_node(Vector::new(1.0, 1.0)).unwrap();
        assert_eq!(graph.find_path(node, node), Some(vec![Vector::new(1.0, 1.0)]));
    }

    #[test]
    fn test_equal_cost_paths_are_deterministic() {
        let graph = open_field(8);
        let from = graph.nearest_node(Vector::new(0.0, 0.0)).unwrap();
        let to = graph.nearest_node(Vector::new(6.0, 2.0)).unwrap();

        let first = graph.find_path(from, to).unwrap();
        assert_approx_eq!(
            path_length(first[0], &first[1..]),
            4.0 + 2.0 * 2f32.sqrt(),
            1e-4
        );
        for _ in 0..10 {
            assert_eq!(graph.clone().find_path(from, to).unwrap(), first);
        }
    }

    #[test]
    fn test_weights_steer_around_crowded_node() {
        let mut graph = open_field(3);
        let from = graph.nearest_node(Vector::new(0.0, 1.0)).unwrap();
        let to = graph.nearest_node(Vector::new(2.0, 1.0)).unwrap();
        let crowded = graph.nearest_node(Vector::new(1.0, 1.0)).unwrap();

        assert!(graph
            .find_path(from, to)
            .unwrap()
            .contains(&Vector::new(1.0, 1.0)));

        graph.set_node_weights(HashMap::from([(crowded, 10.0)]));
        let path = graph.find_path(from, to).unwrap();
        assert!(!path.contains(&Vector::new(1.0, 1.0)));
        assert_eq!(path.last(), Some(&Vector::new(2.0, 1.0)));
    }
}
