//! Grid A* search over cells the robot footprint can occupy.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::collections::{BinaryHeap, HashMap, HashSet};

use log::{debug, trace, warn};
use nalgebra::Point2;
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use util::maths::norm;

use super::PathSearch;
use crate::map::{CellIndex, GridMap, RobotFootprint};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Neighbour offsets along the grid axes
const STRAIGHT_MOVES: [(i64, i64); 4] = [(-1, 0), (1, 0), (0, -1), (0, 1)];

/// Neighbour offsets along the diagonals
const DIAGONAL_MOVES: [(i64, i64); 4] = [(-1, -1), (-1, 1), (1, -1), (1, 1)];

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct AStarSearch {
    params: AStarParams,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AStarParams {
    /// Maximum number of cells to expand before giving up.
    pub max_expansions: usize,

    /// If true cells may be reached diagonally.
    pub allow_diagonal: bool,
}

/// An entry in the open set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Node {
    /// Insertion order, used to break ties deterministically
    id: usize,

    cell: CellIndex,

    /// Cost so far plus heuristic, in cells
    total_cost: OrderedFloat<f64>,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl AStarSearch {
    pub fn new(params: AStarParams) -> Self {
        Self { params }
    }

    fn moves(&self) -> Vec<(i64, i64, f64)> {
        let mut moves: Vec<(i64, i64, f64)> =
            STRAIGHT_MOVES.iter().map(|&(di, dj)| (di, dj, 1.0)).collect();

        if self.params.allow_diagonal {
            moves.extend(
                DIAGONAL_MOVES
                    .iter()
                    .map(|&(di, dj)| (di, dj, std::f64::consts::SQRT_2)),
            );
        }

        moves
    }
}

impl Default for AStarParams {
    fn default() -> Self {
        Self {
            max_expansions: 200_000,
            allow_diagonal: true,
        }
    }
}

impl PathSearch for AStarSearch {
    fn replan(
        &self,
        map: &GridMap,
        start: CellIndex,
        goal: CellIndex,
        footprint: &RobotFootprint,
    ) -> Option<Vec<Point2<f64>>> {
        if !map.in_range(start) || !map.in_range(goal) {
            warn!("Start {} or goal {} is outside the map", start, goal);
            return None;
        }

        let moves = self.moves();

        let mut heap = BinaryHeap::new();
        let mut cost_so_far: HashMap<CellIndex, f64> = HashMap::new();
        let mut came_from: HashMap<CellIndex, CellIndex> = HashMap::new();
        let mut closed: HashSet<CellIndex> = HashSet::new();
        let mut num_nodes = 0;

        cost_so_far.insert(start, 0.0);
        heap.push(Node {
            id: num_nodes,
            cell: start,
            total_cost: OrderedFloat(heuristic(start, goal)),
        });

        while let Some(node) = heap.pop() {
            if node.cell == goal {
                let path = reconstruct(&came_from, goal);
                debug!(
                    "A* reached the goal after expanding {} cells, path has {} points",
                    closed.len(),
                    path.len()
                );
                return Some(path.into_iter().map(|c| map.cell_to_world(c)).collect());
            }

            if !closed.insert(node.cell) {
                continue;
            }

            if closed.len() > self.params.max_expansions {
                warn!(
                    "A* gave up after expanding {} cells",
                    self.params.max_expansions
                );
                return None;
            }

            let base_cost = match cost_so_far.get(&node.cell) {
                Some(&c) => c,
                None => continue,
            };

            for &(di, dj, step_cost) in moves.iter() {
                let next = CellIndex::new(node.cell.i + di, node.cell.j + dj);

                if closed.contains(&next) || !map.is_footprint_clear(next, footprint) {
                    continue;
                }

                let cost = base_cost + step_cost;
                let improved = match cost_so_far.get(&next) {
                    Some(&c) => cost < c,
                    None => true,
                };

                if improved {
                    cost_so_far.insert(next, cost);
                    came_from.insert(next, node.cell);

                    num_nodes += 1;
                    heap.push(Node {
                        id: num_nodes,
                        cell: next,
                        total_cost: OrderedFloat(cost + heuristic(next, goal)),
                    });
                }
            }
        }

        trace!("A* open set exhausted without reaching {}", goal);

        None
    }
}

impl Ord for Node {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // Flipped so that the heap pops the lowest cost, and the oldest node on a tie
        other
            .total_cost
            .cmp(&self.total_cost)
            .then_with(|| other.id.cmp(&self.id))
    }
}

impl PartialOrd for Node {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

// ------------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Straight line distance between two cells, in cells.
fn heuristic(cell: CellIndex, goal: CellIndex) -> f64 {
    norm(
        &[cell.i as f64, cell.j as f64],
        &[goal.i as f64, goal.j as f64],
    )
    .unwrap_or(0.0)
}

/// Walk back from the goal to the start.
fn reconstruct(came_from: &HashMap<CellIndex, CellIndex>, goal: CellIndex) -> Vec<CellIndex> {
    let mut path = vec![goal];
    let mut current = goal;

    while let Some(&prev) = came_from.get(&current) {
        path.push(prev);
        current = prev;
    }

    path.reverse();
    path
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use comms_if::nav::CELL_OCCUPIED;

    fn map_with_wall(gap_row: Option<usize>) -> GridMap {
        // 7x7 map with a vertical wall in column 3
        let mut cells = vec![0; 49];
        for i in 0..7 {
            if Some(i) != gap_row {
                cells[i * 7 + 3] = CELL_OCCUPIED;
            }
        }

        GridMap::new(7, 7, 0.5, Point2::new(0.0, 0.0), "map", cells).unwrap()
    }

    #[test]
    fn test_straight_path() {
        let map = GridMap::new(5, 5, 1.0, Point2::new(0.0, 0.0), "map", vec![0; 25]).unwrap();
        let search = AStarSearch::new(AStarParams::default());
        let footprint = RobotFootprint::square(1.0);

        let path = search
            .replan(&map, CellIndex::new(0, 0), CellIndex::new(0, 4), &footprint)
            .unwrap();

        assert_eq!(path.len(), 5);
        assert_eq!(path[0], Point2::new(0.0, 0.0));
        assert_eq!(path[4], Point2::new(4.0, 0.0));

        // Diagonal moves take the shortcut
        let path = search
            .replan(&map, CellIndex::new(0, 0), CellIndex::new(4, 4), &footprint)
            .unwrap();
        assert_eq!(path.len(), 5);
    }

    #[test]
    fn test_path_through_gap() {
        let map = map_with_wall(Some(5));
        let search = AStarSearch::new(AStarParams::default());
        let footprint = RobotFootprint::square(0.5);

        let start = CellIndex::new(1, 0);
        let goal = CellIndex::new(1, 6);
        let path = search.replan(&map, start, goal, &footprint).unwrap();

        assert_eq!(path.first(), Some(&map.cell_to_world(start)));
        assert_eq!(path.last(), Some(&map.cell_to_world(goal)));

        // Every point is free and the wall is crossed at the gap
        for p in path.iter() {
            assert!(map.is_footprint_clear(map.world_to_cell(p), &footprint));
        }
        assert!(path
            .iter()
            .any(|p| map.world_to_cell(p) == CellIndex::new(5, 3)));
    }

    #[test]
    fn test_unreachable() {
        let map = map_with_wall(None);
        let search = AStarSearch::new(AStarParams::default());
        let footprint = RobotFootprint::square(0.5);

        assert_eq!(
            search.replan(&map, CellIndex::new(1, 0), CellIndex::new(1, 6), &footprint),
            None
        );

        // Outside the map
        assert_eq!(
            search.replan(&map, CellIndex::new(1, 0), CellIndex::new(9, 9), &footprint),
            None
        );
    }

    #[test]
    fn test_expansion_limit() {
        let map = GridMap::new(20, 20, 1.0, Point2::new(0.0, 0.0), "map", vec![0; 400]).unwrap();
        let search = AStarSearch::new(AStarParams {
            max_expansions: 3,
            allow_diagonal: false,
        });

        assert_eq!(
            search.replan(
                &map,
                CellIndex::new(0, 0),
                CellIndex::new(19, 19),
                &RobotFootprint::square(1.0)
            ),
            None
        );
    }

    #[test]
    fn test_start_is_goal() {
        let map = GridMap::new(3, 3, 1.0, Point2::new(0.0, 0.0), "map", vec![0; 9]).unwrap();
        let search = AStarSearch::new(AStarParams::default());

        let path = search
            .replan(
                &map,
                CellIndex::new(1, 1),
                CellIndex::new(1, 1),
                &RobotFootprint::square(1.0),
            )
            .unwrap();

        assert_eq!(path, vec![Point2::new(1.0, 1.0)]);
    }
}
