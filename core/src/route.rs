use std::collections::VecDeque;

use crate::TileCoord;

/// Ordered waypoints from an exclusive start to an inclusive goal.
///
/// Waypoints are consumed from the front as the agent reaches them. A route
/// that is empty means "no path" or "nothing left to follow"; callers never
/// receive an error for an unreachable goal.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Route {
    waypoints: VecDeque<TileCoord>,
}

impl Route {
    /// Creates an empty route.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Next waypoint to reach, if any.
    #[must_use]
    pub fn front(&self) -> Option<TileCoord> {
        self.waypoints.front().copied()
    }

    /// Final waypoint of the route, if any.
    #[must_use]
    pub fn goal(&self) -> Option<TileCoord> {
        self.waypoints.back().copied()
    }

    /// Removes and returns the next waypoint.
    pub fn pop_front(&mut self) -> Option<TileCoord> {
        self.waypoints.pop_front()
    }

    /// Number of waypoints left.
    #[must_use]
    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    /// Reports whether no waypoints remain.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }

    /// Drops every waypoint.
    pub fn clear(&mut self) {
        self.waypoints.clear();
    }

    /// Keeps only the first `len` waypoints.
    pub fn truncate(&mut self, len: usize) {
        self.waypoints.truncate(len);
    }

    /// Iterator over the remaining waypoints in travel order.
    pub fn iter(&self) -> impl Iterator<Item = &TileCoord> {
        self.waypoints.iter()
    }

    /// Reports whether every step, starting from `start`, moves to an 8-adjacent tile.
    #[must_use]
    pub fn is_chain_from(&self, start: TileCoord) -> bool {
        let mut previous = start;
        for waypoint in &self.waypoints {
            if !previous.is_adjacent(*waypoint) {
                return false;
            }
            previous = *waypoint;
        }
        true
    }

    /// Copies the waypoints into a vector.
    #[must_use]
    pub fn to_vec(&self) -> Vec<TileCoord> {
        self.waypoints.iter().copied().collect()
    }
}

impl From<Vec<TileCoord>> for Route {
    fn from(waypoints: Vec<TileCoord>) -> Self {
        Self {
            waypoints: waypoints.into(),
        }
    }
}

impl FromIterator<TileCoord> for Route {
    fn from_iter<I: IntoIterator<Item = TileCoord>>(iter: I) -> Self {
        Self {
            waypoints: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chain_validation_detects_gaps() {
        let start = TileCoord::new(0, 0);
        let good = Route::from(vec![TileCoord::new(1, 1), TileCoord::new(2, 1)]);
        let gap = Route::from(vec![TileCoord::new(1, 1), TileCoord::new(3, 1)]);
        assert!(good.is_chain_from(start));
        assert!(!gap.is_chain_from(start));
        assert!(Route::empty().is_chain_from(start));
    }

    #[test]
    fn waypoints_are_consumed_from_the_front() {
        let mut route: Route = [TileCoord::new(1, 0), TileCoord::new(2, 0)]
            .into_iter()
            .collect();
        assert_eq!(route.goal(), Some(TileCoord::new(2, 0)));
        assert_eq!(route.pop_front(), Some(TileCoord::new(1, 0)));
        assert_eq!(route.front(), Some(TileCoord::new(2, 0)));
        assert_eq!(route.len(), 1);
    }
}
