//! Coarse cluster graph used for long-distance planning.

use std::collections::{BTreeMap, VecDeque};

use realmwalk_core::{ClusterId, GridDimensions, TileCoord, Walkability};

/// Abstract graph whose nodes are grid clusters.
///
/// Two clusters are linked when at least one pair of statically walkable tiles
/// faces each other across their shared border. Those border tiles are the
/// entrances used as hop points between fine searches.
#[derive(Clone, Debug)]
pub struct ClusterGraph {
    cluster_size: u32,
    dimensions: GridDimensions,
    entrances: BTreeMap<(ClusterId, ClusterId), Vec<TileCoord>>,
}

impl ClusterGraph {
    /// Scans every cluster border of the map for entrances.
    #[must_use]
    pub fn build<W: Walkability + ?Sized>(map: &W, cluster_size: u32) -> Self {
        let cluster_size = cluster_size.max(1);
        let dimensions = map.dimensions();
        let columns = dimensions.width().div_ceil(cluster_size);
        let rows = dimensions.height().div_ceil(cluster_size);
        let mut entrances: BTreeMap<(ClusterId, ClusterId), Vec<TileCoord>> = BTreeMap::new();

        for row in 0..rows {
            for column in 0..columns {
                let here = ClusterId::new(column, row);

                if column + 1 < columns {
                    let east = ClusterId::new(column + 1, row);
                    let border = (column + 1) * cluster_size - 1;
                    let first = row * cluster_size;
                    let last = ((row + 1) * cluster_size).min(dimensions.height());
                    for y in first..last {
                        let inside = TileCoord::new(border, y);
                        let across = TileCoord::new(border + 1, y);
                        if map.is_walkable(inside) && map.is_walkable(across) {
                            entrances.entry((here, east)).or_default().push(inside);
                            entrances.entry((east, here)).or_default().push(across);
                        }
                    }
                }

                if row + 1 < rows {
                    let south = ClusterId::new(column, row + 1);
                    let border = (row + 1) * cluster_size - 1;
                    let first = column * cluster_size;
                    let last = ((column + 1) * cluster_size).min(dimensions.width());
                    for x in first..last {
                        let inside = TileCoord::new(x, border);
                        let across = TileCoord::new(x, border + 1);
                        if map.is_walkable(inside) && map.is_walkable(across) {
                            entrances.entry((here, south)).or_default().push(inside);
                            entrances.entry((south, here)).or_default().push(across);
                        }
                    }
                }
            }
        }

        Self {
            cluster_size,
            dimensions,
            entrances,
        }
    }

    /// Edge length of a cluster in tiles.
    #[must_use]
    pub const fn cluster_size(&self) -> u32 {
        self.cluster_size
    }

    /// Dimensions of the grid the graph was built from.
    #[must_use]
    pub const fn dimensions(&self) -> GridDimensions {
        self.dimensions
    }

    /// Tiles inside `from` that step directly into `to`.
    #[must_use]
    pub fn entrances(&self, from: ClusterId, to: ClusterId) -> &[TileCoord] {
        self.entrances
            .get(&(from, to))
            .map_or(&[][..], Vec::as_slice)
    }

    /// Clusters reachable from `cluster` through at least one entrance.
    pub fn neighbors(&self, cluster: ClusterId) -> impl Iterator<Item = ClusterId> + '_ {
        let low = (cluster, ClusterId::new(0, 0));
        let high = (cluster, ClusterId::new(u32::MAX, u32::MAX));
        self.entrances.range(low..=high).map(|((_, to), _)| *to)
    }

    /// Sequence of clusters from `from` to `to`, both inclusive, with the fewest hops.
    #[must_use]
    pub fn coarse_route(&self, from: ClusterId, to: ClusterId) -> Option<Vec<ClusterId>> {
        if from == to {
            return Some(vec![from]);
        }

        let mut parents: BTreeMap<ClusterId, ClusterId> = BTreeMap::new();
        let mut queue = VecDeque::new();
        let _ = parents.insert(from, from);
        queue.push_back(from);

        while let Some(cluster) = queue.pop_front() {
            if cluster == to {
                let mut route = vec![to];
                let mut cursor = to;
                while cursor != from {
                    cursor = parents[&cursor];
                    route.push(cursor);
                }
                route.reverse();
                return Some(route);
            }

            for next in self.neighbors(cluster) {
                if parents.contains_key(&next) {
                    continue;
                }
                let _ = parents.insert(next, cluster);
                queue.push_back(next);
            }
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct WallAt {
        dimensions: GridDimensions,
        wall_column: u32,
        gap_row: Option<u32>,
    }

    impl Walkability for WallAt {
        fn dimensions(&self) -> GridDimensions {
            self.dimensions
        }

        fn is_walkable(&self, tile: TileCoord) -> bool {
            self.dimensions.contains(tile)
                && (tile.x() != self.wall_column || Some(tile.y()) == self.gap_row)
        }
    }

    #[test]
    fn entrances_are_mirrored_across_borders() {
        let map = WallAt {
            dimensions: GridDimensions::new(8, 4),
            wall_column: 99,
            gap_row: None,
        };
        let graph = ClusterGraph::build(&map, 4);
        let west = ClusterId::new(0, 0);
        let east = ClusterId::new(1, 0);

        assert_eq!(graph.entrances(west, east).len(), 4);
        assert!(graph
            .entrances(west, east)
            .iter()
            .all(|tile| tile.x() == 3));
        assert!(graph
            .entrances(east, west)
            .iter()
            .all(|tile| tile.x() == 4));
    }

    #[test]
    fn walls_on_borders_remove_links() {
        let map = WallAt {
            dimensions: GridDimensions::new(8, 4),
            wall_column: 4,
            gap_row: None,
        };
        let graph = ClusterGraph::build(&map, 4);

        assert!(graph
            .coarse_route(ClusterId::new(0, 0), ClusterId::new(1, 0))
            .is_none());
    }

    #[test]
    fn coarse_route_detours_through_open_clusters() {
        let map = WallAt {
            dimensions: GridDimensions::new(8, 8),
            wall_column: 4,
            gap_row: Some(6),
        };
        let graph = ClusterGraph::build(&map, 4);

        let route = graph
            .coarse_route(ClusterId::new(0, 0), ClusterId::new(1, 0))
            .expect("route through southern gap");
        assert_eq!(
            route,
            vec![
                ClusterId::new(0, 0),
                ClusterId::new(0, 1),
                ClusterId::new(1, 1),
                ClusterId::new(1, 0),
            ]
        );
        assert_eq!(
            graph.entrances(ClusterId::new(0, 1), ClusterId::new(1, 1)),
            &[TileCoord::new(3, 6)]
        );
    }
}
