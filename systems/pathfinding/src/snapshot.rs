use std::collections::BTreeSet;

use realmwalk_core::{AgentId, GridDimensions, OccupancyView, TileCoord, Walkability};

/// Occupied tiles frozen at the start of a planning call.
///
/// Searches consult the snapshot instead of live occupancy so the same
/// snapshot always yields the same route.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OccupancySnapshot {
    occupied: BTreeSet<TileCoord>,
}

impl OccupancySnapshot {
    /// Captures every occupied tile except the one held by `requester`.
    #[must_use]
    pub fn capture(view: &OccupancyView<'_>, requester: Option<AgentId>) -> Self {
        Self {
            occupied: view
                .iter()
                .filter(|(_, agent)| Some(*agent) != requester)
                .map(|(tile, _)| tile)
                .collect(),
        }
    }

    /// Builds a snapshot from an explicit set of occupied tiles.
    #[must_use]
    pub fn from_tiles<I: IntoIterator<Item = TileCoord>>(tiles: I) -> Self {
        Self {
            occupied: tiles.into_iter().collect(),
        }
    }

    /// Reports whether the tile was occupied when the snapshot was taken.
    #[must_use]
    pub fn is_occupied(&self, tile: TileCoord) -> bool {
        self.occupied.contains(&tile)
    }
}

/// Static walkability combined with an occupancy snapshot.
pub(crate) struct PlanningGrid<'a, W: ?Sized> {
    map: &'a W,
    occupancy: &'a OccupancySnapshot,
    dimensions: GridDimensions,
}

impl<'a, W: Walkability + ?Sized> PlanningGrid<'a, W> {
    pub(crate) fn new(map: &'a W, occupancy: &'a OccupancySnapshot) -> Self {
        Self {
            dimensions: map.dimensions(),
            map,
            occupancy,
        }
    }

    pub(crate) fn dimensions(&self) -> GridDimensions {
        self.dimensions
    }

    /// In bounds, walkable, finite cost, and unoccupied in the snapshot.
    pub(crate) fn is_passable(&self, tile: TileCoord) -> bool {
        self.dimensions.contains(tile)
            && self.map.is_walkable(tile)
            && self.map.cost(tile).is_finite()
            && !self.occupancy.is_occupied(tile)
    }

    pub(crate) fn cost(&self, tile: TileCoord) -> f32 {
        self.map.cost(tile)
    }
}
