//! Cluster-partitioned occupancy index.

use std::collections::{BTreeMap, BTreeSet};

use realmwalk_core::{AgentId, ClusterId, GridDimensions, OccupancyView, TileCoord, TileRect};

/// Cluster membership and tile occupancy of every agent in the world.
///
/// After an agent is inserted, [`OccupancyIndex::on_agent_moved`] is the only
/// way its tile or cluster changes.
#[derive(Clone, Debug)]
pub struct OccupancyIndex {
    cluster_size: u32,
    tiles: BTreeMap<TileCoord, AgentId>,
    clusters: BTreeMap<ClusterId, BTreeSet<AgentId>>,
    membership: BTreeMap<AgentId, ClusterId>,
}

impl OccupancyIndex {
    /// Creates an empty index with square clusters of `cluster_size` tiles.
    #[must_use]
    pub fn new(cluster_size: u32) -> Self {
        Self {
            cluster_size: cluster_size.max(1),
            tiles: BTreeMap::new(),
            clusters: BTreeMap::new(),
            membership: BTreeMap::new(),
        }
    }

    /// Edge length of a cluster in tiles.
    #[must_use]
    pub const fn cluster_size(&self) -> u32 {
        self.cluster_size
    }

    /// Cluster containing the tile.
    #[must_use]
    pub const fn cluster_of(&self, tile: TileCoord) -> ClusterId {
        ClusterId::of(tile, self.cluster_size)
    }

    /// Registers an agent standing on `tile`.
    pub fn insert(&mut self, agent: AgentId, tile: TileCoord) {
        let cluster = self.cluster_of(tile);
        let _ = self.tiles.insert(tile, agent);
        let _ = self.clusters.entry(cluster).or_default().insert(agent);
        let _ = self.membership.insert(agent, cluster);
    }

    /// Unregisters an agent that left the world from `tile`.
    pub fn remove(&mut self, agent: AgentId, tile: TileCoord) {
        if self.tiles.get(&tile) == Some(&agent) {
            let _ = self.tiles.remove(&tile);
        }
        if let Some(cluster) = self.membership.remove(&agent) {
            self.leave_cluster(agent, cluster);
        }
    }

    /// Records that `agent` moved from `old` to `new`.
    ///
    /// Cluster membership is re-keyed only when the two tiles fall into
    /// different clusters.
    pub fn on_agent_moved(&mut self, agent: AgentId, old: TileCoord, new: TileCoord) {
        if self.tiles.get(&old) == Some(&agent) {
            let _ = self.tiles.remove(&old);
        }
        let _ = self.tiles.insert(new, agent);

        let target = self.cluster_of(new);
        let previous = self.membership.insert(agent, target);
        if previous == Some(target) {
            return;
        }
        if let Some(previous) = previous {
            self.leave_cluster(agent, previous);
        }
        let _ = self.clusters.entry(target).or_default().insert(agent);
    }

    fn leave_cluster(&mut self, agent: AgentId, cluster: ClusterId) {
        if let Some(members) = self.clusters.get_mut(&cluster) {
            let _ = members.remove(&agent);
            if members.is_empty() {
                let _ = self.clusters.remove(&cluster);
            }
        }
    }

    /// Cluster the agent is registered in.
    #[must_use]
    pub fn cluster_of_agent(&self, agent: AgentId) -> Option<ClusterId> {
        self.membership.get(&agent).copied()
    }

    /// Reports whether an agent other than `exclude` stands on the tile.
    #[must_use]
    pub fn is_occupied(&self, tile: TileCoord, exclude: Option<AgentId>) -> bool {
        self.tiles
            .get(&tile)
            .is_some_and(|agent| Some(*agent) != exclude)
    }

    /// Union of the agents registered to the clusters, sorted by id.
    #[must_use]
    pub fn agents_in(&self, clusters: &BTreeSet<ClusterId>) -> Vec<AgentId> {
        self.view(true).agents_in(clusters)
    }

    /// Clusters touched by `bounds` grown by `margin` tiles.
    #[must_use]
    pub fn clusters_overlapping(
        &self,
        bounds: TileRect,
        margin: u32,
        dimensions: GridDimensions,
    ) -> BTreeSet<ClusterId> {
        self.view(true)
            .clusters_overlapping(bounds, margin, dimensions)
    }

    /// Every registered agent and the cluster it is filed under.
    pub fn memberships(&self) -> impl Iterator<Item = (AgentId, ClusterId)> + '_ {
        self.membership
            .iter()
            .map(|(agent, cluster)| (*agent, *cluster))
    }

    /// Read-only view shared with systems.
    #[must_use]
    pub fn view(&self, player_alive: bool) -> OccupancyView<'_> {
        OccupancyView::new(&self.tiles, &self.clusters, self.cluster_size, player_alive)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clusters(ids: &[(u32, u32)]) -> BTreeSet<ClusterId> {
        ids.iter()
            .map(|(column, row)| ClusterId::new(*column, *row))
            .collect()
    }

    #[test]
    fn moves_within_a_cluster_keep_membership() {
        let mut index = OccupancyIndex::new(4);
        let agent = AgentId::new(1);
        index.insert(agent, TileCoord::new(0, 0));
        index.on_agent_moved(agent, TileCoord::new(0, 0), TileCoord::new(3, 3));

        assert_eq!(index.cluster_of_agent(agent), Some(ClusterId::new(0, 0)));
        let view = index.view(true);
        assert!(view.is_occupied(TileCoord::new(3, 3), None));
        assert!(!view.is_occupied(TileCoord::new(0, 0), None));
    }

    #[test]
    fn crossing_a_border_rekeys_membership() {
        let mut index = OccupancyIndex::new(4);
        let agent = AgentId::new(7);
        index.insert(agent, TileCoord::new(3, 1));
        index.on_agent_moved(agent, TileCoord::new(3, 1), TileCoord::new(4, 1));

        let view = index.view(true);
        assert!(view.agents_in(&clusters(&[(0, 0)])).is_empty());
        assert_eq!(view.agents_in(&clusters(&[(1, 0)])), vec![agent]);
    }

    #[test]
    fn removal_leaves_no_trace() {
        let mut index = OccupancyIndex::new(8);
        let agent = AgentId::new(2);
        index.insert(agent, TileCoord::new(5, 5));
        index.remove(agent, TileCoord::new(5, 5));

        assert_eq!(index.cluster_of_agent(agent), None);
        assert!(!index.view(true).is_occupied(TileCoord::new(5, 5), None));
        assert!(index.view(true).agents_in(&clusters(&[(0, 0)])).is_empty());
    }

    #[test]
    fn stale_tile_entry_of_another_agent_is_preserved() {
        let mut index = OccupancyIndex::new(8);
        let first = AgentId::new(1);
        let second = AgentId::new(2);
        index.insert(first, TileCoord::new(1, 1));
        index.insert(second, TileCoord::new(2, 2));

        index.remove(first, TileCoord::new(2, 2));

        assert_eq!(index.view(true).occupant(TileCoord::new(2, 2)), Some(second));
    }
}
