//! Best-first search over the fine tile grid.

use std::{cmp::Ordering, collections::BinaryHeap, f32::consts::SQRT_2};

use realmwalk_core::{GridDimensions, TileCoord, Walkability};

use crate::snapshot::PlanningGrid;

/// Reusable buffers for the fine search.
///
/// Per-tile state is tagged with an epoch so preparing a new search is
/// constant time instead of clearing every buffer.
#[derive(Debug, Default)]
pub(crate) struct SearchScratch {
    epoch: u32,
    seen: Vec<u32>,
    closed: Vec<u32>,
    g_score: Vec<f32>,
    parent: Vec<usize>,
    open: BinaryHeap<OpenNode>,
    sequence: u64,
}

impl SearchScratch {
    fn prepare(&mut self, tile_count: usize) {
        if self.seen.len() != tile_count {
            self.seen = vec![0; tile_count];
            self.closed = vec![0; tile_count];
            self.g_score = vec![f32::INFINITY; tile_count];
            self.parent = vec![usize::MAX; tile_count];
            self.epoch = 0;
        }

        self.epoch = self.epoch.wrapping_add(1);
        if self.epoch == 0 {
            self.seen.fill(0);
            self.closed.fill(0);
            self.epoch = 1;
        }

        self.open.clear();
        self.sequence = 0;
    }

    /// Finds a route from `start` (exclusive) to `goal` (inclusive).
    ///
    /// Returns `None` once the open set is exhausted without reaching the goal.
    pub(crate) fn search<W: Walkability + ?Sized>(
        &mut self,
        grid: &PlanningGrid<'_, W>,
        start: TileCoord,
        goal: TileCoord,
    ) -> Option<Vec<TileCoord>> {
        let dimensions = grid.dimensions();
        let start_index = dimensions.index(start)?;
        let goal_index = dimensions.index(goal)?;
        if start_index == goal_index {
            return Some(Vec::new());
        }

        self.prepare(dimensions.tile_count());
        let epoch = self.epoch;

        self.seen[start_index] = epoch;
        self.g_score[start_index] = 0.0;
        self.parent[start_index] = start_index;
        self.push(start_index, heuristic(start, goal));

        while let Some(node) = self.open.pop() {
            if self.closed[node.index] == epoch {
                continue;
            }
            self.closed[node.index] = epoch;

            if node.index == goal_index {
                return Some(self.reconstruct(dimensions, start_index, goal_index));
            }

            let current = tile_at(dimensions, node.index);
            let current_g = self.g_score[node.index];

            for neighbor in current.neighbors(dimensions) {
                let Some(neighbor_index) = dimensions.index(neighbor) else {
                    continue;
                };
                if self.closed[neighbor_index] == epoch {
                    continue;
                }
                if !grid.is_passable(neighbor) {
                    continue;
                }

                let cost = grid.cost(neighbor);
                if !cost.is_finite() {
                    continue;
                }

                let tentative = current_g + step_length(current, neighbor) * cost;
                if self.seen[neighbor_index] == epoch && tentative >= self.g_score[neighbor_index]
                {
                    continue;
                }

                self.seen[neighbor_index] = epoch;
                self.g_score[neighbor_index] = tentative;
                self.parent[neighbor_index] = node.index;
                self.push(neighbor_index, tentative + heuristic(neighbor, goal));
            }
        }

        None
    }

    fn push(&mut self, index: usize, f_score: f32) {
        self.open.push(OpenNode {
            f_score,
            sequence: self.sequence,
            index,
        });
        self.sequence += 1;
    }

    fn reconstruct(
        &self,
        dimensions: GridDimensions,
        start_index: usize,
        goal_index: usize,
    ) -> Vec<TileCoord> {
        let mut waypoints = Vec::new();
        let mut cursor = goal_index;
        while cursor != start_index {
            waypoints.push(tile_at(dimensions, cursor));
            cursor = self.parent[cursor];
        }
        waypoints.reverse();
        waypoints
    }
}

/// Entry in the open set, ordered so the heap pops the lowest f-score first
/// and the earliest insertion among equal scores.
#[derive(Clone, Copy, Debug)]
struct OpenNode {
    f_score: f32,
    sequence: u64,
    index: usize,
}

impl Ord for OpenNode {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .f_score
            .total_cmp(&self.f_score)
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

impl PartialOrd for OpenNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for OpenNode {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for OpenNode {}

fn heuristic(from: TileCoord, to: TileCoord) -> f32 {
    from.manhattan_distance(to) as f32
}

fn step_length(from: TileCoord, to: TileCoord) -> f32 {
    if from.x() != to.x() && from.y() != to.y() {
        SQRT_2
    } else {
        1.0
    }
}

fn tile_at(dimensions: GridDimensions, index: usize) -> TileCoord {
    let width = usize::try_from(dimensions.width()).unwrap_or(1).max(1);
    TileCoord::new((index % width) as u32, (index / width) as u32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::OccupancySnapshot;

    struct Open(GridDimensions);

    impl Walkability for Open {
        fn dimensions(&self) -> GridDimensions {
            self.0
        }

        fn is_walkable(&self, tile: TileCoord) -> bool {
            self.0.contains(tile)
        }
    }

    #[test]
    fn open_node_heap_prefers_low_scores_then_insertion_order() {
        let mut heap = BinaryHeap::new();
        heap.push(OpenNode {
            f_score: 3.0,
            sequence: 0,
            index: 0,
        });
        heap.push(OpenNode {
            f_score: 2.0,
            sequence: 2,
            index: 1,
        });
        heap.push(OpenNode {
            f_score: 2.0,
            sequence: 1,
            index: 2,
        });

        let order: Vec<_> = std::iter::from_fn(|| heap.pop().map(|node| node.index)).collect();
        assert_eq!(order, vec![2, 1, 0]);
    }

    #[test]
    fn scratch_is_reusable_across_searches() {
        let map = Open(GridDimensions::new(6, 6));
        let snapshot = OccupancySnapshot::default();
        let grid = PlanningGrid::new(&map, &snapshot);
        let mut scratch = SearchScratch::default();

        let first = scratch.search(&grid, TileCoord::new(0, 0), TileCoord::new(5, 0));
        let second = scratch.search(&grid, TileCoord::new(0, 0), TileCoord::new(5, 0));

        assert_eq!(first, second);
        assert_eq!(first.map(|route| route.len()), Some(5));
    }

    #[test]
    fn occupied_tiles_are_avoided() {
        let map = Open(GridDimensions::new(3, 3));
        let snapshot = OccupancySnapshot::from_tiles([
            TileCoord::new(1, 0),
            TileCoord::new(1, 1),
            TileCoord::new(1, 2),
        ]);
        let grid = PlanningGrid::new(&map, &snapshot);
        let mut scratch = SearchScratch::default();

        assert_eq!(
            scratch.search(&grid, TileCoord::new(0, 1), TileCoord::new(2, 1)),
            None
        );
    }
}
