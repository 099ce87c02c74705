#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Realmwalk simulation.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative world, and pure systems. Systems read immutable views such as
//! [`AgentView`] and [`OccupancyView`], respond with [`Command`] batches, and
//! the world applies those commands before broadcasting [`Event`] values that
//! presentation layers and other systems react to.

use std::{
    collections::{BTreeMap, BTreeSet},
    time::Duration,
};

use serde::{Deserialize, Serialize};

mod route;

pub use glam::Vec2;
pub use route::Route;

/// Location of a single tile expressed as column (`x`) and row (`y`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileCoord {
    x: u32,
    y: u32,
}

impl TileCoord {
    /// Creates a new tile coordinate.
    #[must_use]
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }

    /// Zero-based column index of the tile.
    #[must_use]
    pub const fn x(&self) -> u32 {
        self.x
    }

    /// Zero-based row index of the tile.
    #[must_use]
    pub const fn y(&self) -> u32 {
        self.y
    }

    /// Number of king moves separating two tiles.
    #[must_use]
    pub fn chebyshev_distance(self, other: TileCoord) -> u32 {
        self.x.abs_diff(other.x).max(self.y.abs_diff(other.y))
    }

    /// Computes the Manhattan distance between two tiles.
    #[must_use]
    pub fn manhattan_distance(self, other: TileCoord) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }

    /// Straight-line distance between the two tiles measured in tiles.
    #[must_use]
    pub fn euclidean_distance(self, other: TileCoord) -> f32 {
        let dx = self.x.abs_diff(other.x) as f32;
        let dy = self.y.abs_diff(other.y) as f32;
        (dx * dx + dy * dy).sqrt()
    }

    /// Reports whether `other` is one of the eight tiles surrounding `self`.
    #[must_use]
    pub fn is_adjacent(self, other: TileCoord) -> bool {
        self.chebyshev_distance(other) == 1
    }

    /// Reports whether both tiles share a row or a column.
    #[must_use]
    pub fn is_aligned_with(self, other: TileCoord) -> bool {
        self.x == other.x || self.y == other.y
    }

    /// Returns the tile displaced by the provided offset when it stays inside the grid.
    #[must_use]
    pub fn offset(self, dx: i32, dy: i32, dimensions: GridDimensions) -> Option<TileCoord> {
        let x = self.x.checked_add_signed(dx)?;
        let y = self.y.checked_add_signed(dy)?;
        let tile = TileCoord::new(x, y);
        dimensions.contains(tile).then_some(tile)
    }

    /// Enumerates the in-bounds 8-directional neighbours in a fixed order.
    pub fn neighbors(self, dimensions: GridDimensions) -> impl Iterator<Item = TileCoord> {
        NEIGHBOR_OFFSETS
            .into_iter()
            .filter_map(move |(dx, dy)| self.offset(dx, dy, dimensions))
    }

    /// Continuous position that sits exactly on this tile.
    #[must_use]
    pub fn to_position(self) -> Vec2 {
        Vec2::new(self.x as f32, self.y as f32)
    }

    /// Tile containing the provided continuous position.
    ///
    /// Negative components clamp to the first row or column.
    #[must_use]
    pub fn from_position(position: Vec2) -> Self {
        Self::new(position.x.floor().max(0.0) as u32, position.y.floor().max(0.0) as u32)
    }
}

/// Orthogonal offsets first, then diagonals.
const NEIGHBOR_OFFSETS: [(i32, i32); 8] = [
    (0, 1),
    (0, -1),
    (-1, 0),
    (1, 0),
    (-1, 1),
    (1, 1),
    (-1, -1),
    (1, -1),
];

/// Dimensions of the tile grid, read-only for the lifetime of a simulation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridDimensions {
    width: u32,
    height: u32,
}

impl GridDimensions {
    /// Creates a new dimension descriptor.
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Number of tile columns.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Number of tile rows.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Reports whether the tile lies inside the grid.
    #[must_use]
    pub const fn contains(&self, tile: TileCoord) -> bool {
        tile.x < self.width && tile.y < self.height
    }

    /// Total number of tiles.
    #[must_use]
    pub fn tile_count(&self) -> usize {
        usize::try_from(u64::from(self.width) * u64::from(self.height)).unwrap_or(0)
    }

    /// Row-major index of the tile, if it lies inside the grid.
    #[must_use]
    pub fn index(&self, tile: TileCoord) -> Option<usize> {
        if !self.contains(tile) {
            return None;
        }
        let row = usize::try_from(tile.y).ok()?;
        let column = usize::try_from(tile.x).ok()?;
        let width = usize::try_from(self.width).ok()?;
        row.checked_mul(width)?.checked_add(column)
    }

    /// Tile closest to the geometric centre of the grid.
    #[must_use]
    pub const fn center(&self) -> TileCoord {
        TileCoord::new(self.width / 2, self.height / 2)
    }
}

/// Inclusive axis-aligned rectangle expressed in tiles.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileRect {
    min: TileCoord,
    max: TileCoord,
}

impl TileRect {
    /// Creates a rectangle from two opposite corners in any order.
    #[must_use]
    pub fn from_corners(a: TileCoord, b: TileCoord) -> Self {
        Self {
            min: TileCoord::new(a.x.min(b.x), a.y.min(b.y)),
            max: TileCoord::new(a.x.max(b.x), a.y.max(b.y)),
        }
    }

    /// Rectangle centred on `center` reaching `half_extent` tiles in each direction.
    #[must_use]
    pub fn around(center: TileCoord, half_extent: u32) -> Self {
        Self {
            min: TileCoord::new(
                center.x.saturating_sub(half_extent),
                center.y.saturating_sub(half_extent),
            ),
            max: TileCoord::new(
                center.x.saturating_add(half_extent),
                center.y.saturating_add(half_extent),
            ),
        }
    }

    /// Upper-left corner.
    #[must_use]
    pub const fn min(&self) -> TileCoord {
        self.min
    }

    /// Lower-right corner, inclusive.
    #[must_use]
    pub const fn max(&self) -> TileCoord {
        self.max
    }

    /// Reports whether the tile lies inside the rectangle.
    #[must_use]
    pub const fn contains(&self, tile: TileCoord) -> bool {
        tile.x >= self.min.x && tile.x <= self.max.x && tile.y >= self.min.y && tile.y <= self.max.y
    }

    /// Grows the rectangle by `margin` tiles on every side, clipped to the grid.
    #[must_use]
    pub fn expanded(self, margin: u32, dimensions: GridDimensions) -> Self {
        let max_x = dimensions.width().saturating_sub(1);
        let max_y = dimensions.height().saturating_sub(1);
        Self {
            min: TileCoord::new(
                self.min.x.saturating_sub(margin).min(max_x),
                self.min.y.saturating_sub(margin).min(max_y),
            ),
            max: TileCoord::new(
                self.max.x.saturating_add(margin).min(max_x),
                self.max.y.saturating_add(margin).min(max_y),
            ),
        }
    }
}

/// Identifier of a fixed-size square partition of the grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ClusterId {
    column: u32,
    row: u32,
}

impl ClusterId {
    /// Creates a cluster identifier from its cluster-grid coordinates.
    #[must_use]
    pub const fn new(column: u32, row: u32) -> Self {
        Self { column, row }
    }

    /// Cluster containing the tile for the provided cluster edge length.
    ///
    /// A zero `size` is treated as one so every tile still maps somewhere.
    #[must_use]
    pub const fn of(tile: TileCoord, size: u32) -> Self {
        let size = if size == 0 { 1 } else { size };
        Self {
            column: tile.x / size,
            row: tile.y / size,
        }
    }

    /// Column of the cluster in the cluster grid.
    #[must_use]
    pub const fn column(&self) -> u32 {
        self.column
    }

    /// Row of the cluster in the cluster grid.
    #[must_use]
    pub const fn row(&self) -> u32 {
        self.row
    }
}

/// Unique handle assigned to an agent owned by the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AgentId(u32);

impl AgentId {
    /// Handle reserved for the player-controlled character.
    pub const PLAYER: AgentId = AgentId(0);

    /// Creates a new agent identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }

    /// Reports whether the handle refers to the player.
    #[must_use]
    pub const fn is_player(&self) -> bool {
        self.0 == Self::PLAYER.0
    }
}

/// Leveling stats that combat feeds experience into.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Skill {
    /// Hit points.
    Hitpoints,
    /// Melee accuracy.
    Attack,
    /// Melee power.
    Strength,
    /// Damage mitigation.
    Defense,
    /// Ranged combat.
    Ranged,
    /// Magic combat.
    Magic,
}

/// Current and maximum hit points of an agent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Health {
    current: u32,
    max: u32,
}

impl Health {
    /// Full health at the provided maximum.
    #[must_use]
    pub const fn full(max: u32) -> Self {
        Self { current: max, max }
    }

    /// Health with an explicit current value, capped at `max`.
    #[must_use]
    pub fn new(current: u32, max: u32) -> Self {
        Self {
            current: current.min(max),
            max,
        }
    }

    /// Remaining hit points.
    #[must_use]
    pub const fn current(&self) -> u32 {
        self.current
    }

    /// Maximum hit points.
    #[must_use]
    pub const fn max(&self) -> u32 {
        self.max
    }

    /// Reports whether no hit points remain.
    #[must_use]
    pub const fn is_depleted(&self) -> bool {
        self.current == 0
    }

    /// Health after subtracting damage, floor-clamped at zero.
    #[must_use]
    pub const fn damaged(self, amount: u32) -> Self {
        Self {
            current: self.current.saturating_sub(amount),
            max: self.max,
        }
    }

    /// Health restored to the maximum.
    #[must_use]
    pub const fn restored(self) -> Self {
        Self::full(self.max)
    }
}

/// Effective combat stats of the player after equipment modifiers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatStats {
    /// Melee accuracy.
    pub attack: u32,
    /// Melee power.
    pub strength: u32,
    /// Percentage-style damage reduction.
    pub defense: u32,
    /// Ranged proficiency; ranged attacks unlock above one.
    pub ranged: u32,
    /// Magic proficiency; spells unlock above one.
    pub magic: u32,
}

impl Default for CombatStats {
    fn default() -> Self {
        Self {
            attack: 1,
            strength: 1,
            defense: 1,
            ranged: 1,
            magic: 1,
        }
    }
}

/// Static description of a hostile archetype.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostileStats {
    /// Display name.
    pub name: String,
    /// Movement speed in tiles per second.
    pub speed: f32,
    /// Base attack before the player's defense is applied.
    pub attack: u32,
    /// Maximum hit points.
    pub max_health: u32,
    /// Experience value used when awarding the player.
    pub experience: u32,
}

impl Default for HostileStats {
    fn default() -> Self {
        Self {
            name: String::from("Unknown"),
            speed: 1.0,
            attack: 5,
            max_health: 50,
            experience: 10,
        }
    }
}

/// Static walkability oracle for the tile grid.
///
/// Implementations answer in constant time and never change during a
/// simulation.
pub trait Walkability {
    /// Dimensions of the grid.
    fn dimensions(&self) -> GridDimensions;

    /// Reports whether the tile is statically walkable. Out-of-bounds tiles are not.
    fn is_walkable(&self, tile: TileCoord) -> bool;

    /// Traversal cost multiplier of the tile; `f32::INFINITY` marks it impassable.
    fn cost(&self, tile: TileCoord) -> f32 {
        if self.is_walkable(tile) {
            1.0
        } else {
            f32::INFINITY
        }
    }
}

/// Fire-and-forget sink for leveling experience.
pub trait ExperienceSink {
    /// Credits `amount` experience to `skill`.
    fn add_experience(&mut self, skill: Skill, amount: u32);
}

/// Experience sink that discards everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct DiscardExperience;

impl ExperienceSink for DiscardExperience {
    fn add_experience(&mut self, _skill: Skill, _amount: u32) {}
}

impl ExperienceSink for Vec<(Skill, u32)> {
    fn add_experience(&mut self, skill: Skill, amount: u32) {
        self.push((skill, amount));
    }
}

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Counts down every timer of the listed agents and the player.
    AdvanceTimers {
        /// Simulated time that elapsed since the previous tick.
        dt: Duration,
        /// Hostiles whose timers advance this tick.
        agents: Vec<AgentId>,
    },
    /// Moves the listed agents and the player along their routes.
    AdvanceMovement {
        /// Simulated time that elapsed since the previous tick.
        dt: Duration,
        /// Hostiles that follow their routes this tick.
        agents: Vec<AgentId>,
    },
    /// Replaces an agent's route and schedules its next planning opportunity.
    AssignRoute {
        /// Agent receiving the route.
        agent: AgentId,
        /// Waypoints starting adjacent to the agent.
        route: Route,
        /// Delay before the agent becomes eligible for planning again.
        retry_after: Duration,
    },
    /// Drops an agent's route, leaving it idle.
    ClearRoute {
        /// Agent whose route is cleared.
        agent: AgentId,
    },
    /// Postpones planning after a failed attempt.
    DeferPlanning {
        /// Agent whose planning is postponed.
        agent: AgentId,
        /// Delay before the agent becomes eligible for planning again.
        retry_after: Duration,
    },
    /// Queues a single step straight toward a tile without planning a route.
    StepToward {
        /// Agent taking the coarse step.
        agent: AgentId,
        /// Tile the agent heads toward.
        toward: TileCoord,
        /// Delay before the agent becomes eligible for planning again.
        retry_after: Duration,
    },
    /// Applies a hostile's attack to the player.
    ResolveHostileAttack {
        /// Hostile that attacks.
        attacker: AgentId,
        /// Damage after mitigation and variance.
        damage: u32,
        /// Indicates whether the roll was critical.
        critical: bool,
        /// Cooldown the attacker waits before attacking again.
        cooldown: Duration,
    },
    /// Applies the player's attack to a hostile.
    ResolvePlayerAttack {
        /// Hostile that receives the damage.
        target: AgentId,
        /// Damage after variance.
        damage: u32,
        /// Indicates whether the roll was critical.
        critical: bool,
    },
    /// Selects or clears the hostile the player is focused on.
    SetPlayerTarget {
        /// Targeted hostile, if any.
        target: Option<AgentId>,
    },
    /// Creates a hostile on the provided tile.
    SpawnHostile {
        /// Archetype of the hostile.
        stats: HostileStats,
        /// Tile the hostile appears on.
        tile: TileCoord,
    },
    /// Removes a hostile that strayed too far from its spawn.
    DespawnHostile {
        /// Hostile to remove.
        agent: AgentId,
    },
    /// Revives the player after death.
    RespawnPlayer,
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Event {
    /// Indicates that the simulation clock advanced.
    TimeAdvanced {
        /// Duration of simulated time that elapsed in the tick.
        dt: Duration,
    },
    /// Confirms that an agent's tile changed.
    AgentMoved {
        /// Agent that moved.
        agent: AgentId,
        /// Tile occupied before the move.
        from: TileCoord,
        /// Tile occupied after the move.
        to: TileCoord,
    },
    /// Confirms that a route was installed.
    RouteAssigned {
        /// Agent following the route.
        agent: AgentId,
        /// Final waypoint of the route.
        goal: TileCoord,
        /// Number of waypoints.
        waypoints: usize,
    },
    /// Reports that a route could not be installed because it does not start next to the agent.
    RouteRejected {
        /// Agent the route was meant for.
        agent: AgentId,
    },
    /// Reports that the next waypoint became unavailable and the route was dropped.
    RouteBlocked {
        /// Agent whose route was dropped.
        agent: AgentId,
        /// Waypoint that could not be entered.
        at: TileCoord,
    },
    /// Reports that an agent consumed the last waypoint of its route.
    RouteCompleted {
        /// Agent that arrived.
        agent: AgentId,
        /// Tile the agent arrived on.
        tile: TileCoord,
    },
    /// Confirms that an attack connected.
    AttackLanded {
        /// Attacking agent.
        attacker: AgentId,
        /// Agent that was hit.
        target: AgentId,
        /// Indicates whether the hit was critical.
        critical: bool,
    },
    /// Reports hit points removed by an attack.
    DamageDealt {
        /// Attacking agent.
        attacker: AgentId,
        /// Agent that lost hit points.
        target: AgentId,
        /// Hit points removed.
        amount: u32,
        /// Indicates whether the hit was critical.
        critical: bool,
    },
    /// Reports that a hostile was killed and removed.
    AgentDied {
        /// Hostile that died.
        agent: AgentId,
        /// Tile it died on.
        tile: TileCoord,
    },
    /// Reports that the player's hit points reached zero.
    PlayerDied {
        /// Hostile that dealt the final blow.
        killer: AgentId,
    },
    /// Reports that the player came back to life.
    PlayerRespawned {
        /// Tile the player respawned on.
        tile: TileCoord,
    },
    /// Confirms that a hostile entered the world.
    HostileSpawned {
        /// Identifier assigned to the hostile.
        agent: AgentId,
        /// Tile the hostile occupies.
        tile: TileCoord,
    },
    /// Reports that a spawn request targeted a blocked or occupied tile.
    SpawnRejected {
        /// Tile named in the request.
        tile: TileCoord,
    },
    /// Confirms that a hostile was removed for straying from its spawn.
    HostileDespawned {
        /// Hostile that was removed.
        agent: AgentId,
        /// Tile it was removed from.
        tile: TileCoord,
    },
    /// Announces a change of the player's focused hostile.
    TargetChanged {
        /// Newly targeted hostile, if any.
        target: Option<AgentId>,
    },
}

/// Immutable representation of a single hostile's state used for queries.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AgentSnapshot {
    /// Unique identifier assigned to the hostile.
    pub id: AgentId,
    /// Tile currently occupied.
    pub tile: TileCoord,
    /// Continuous simulated position.
    pub position: Vec2,
    /// Tile the hostile spawned on.
    pub spawn: TileCoord,
    /// Hit points.
    pub health: Health,
    /// Movement speed in tiles per second.
    pub speed: f32,
    /// Base attack stat.
    pub attack: u32,
    /// Experience value awarded through combat.
    pub experience: u32,
    /// Time until the hostile may request another route.
    pub planning_in: Duration,
    /// Time until the hostile may attack again.
    pub attack_ready_in: Duration,
    /// Remaining duration of the hit flash shown after the player struck it.
    pub hit_flash: Duration,
    /// Remaining duration of the critical-hit flash.
    pub critical_flash: Duration,
    /// Number of waypoints left on the current route.
    pub route_len: usize,
    /// Indicates whether the player has this hostile targeted.
    pub targeted: bool,
}

/// Read-only snapshot describing all hostiles in the world.
#[derive(Clone, Debug, Default)]
pub struct AgentView {
    snapshots: Vec<AgentSnapshot>,
}

impl AgentView {
    /// Creates a new view from the provided snapshots.
    #[must_use]
    pub fn from_snapshots(mut snapshots: Vec<AgentSnapshot>) -> Self {
        snapshots.sort_by_key(|snapshot| snapshot.id);
        Self { snapshots }
    }

    /// Iterator over the captured snapshots in deterministic order.
    pub fn iter(&self) -> impl Iterator<Item = &AgentSnapshot> {
        self.snapshots.iter()
    }

    /// Snapshot of the provided hostile, if it exists.
    #[must_use]
    pub fn get(&self, id: AgentId) -> Option<&AgentSnapshot> {
        self.snapshots
            .binary_search_by_key(&id, |snapshot| snapshot.id)
            .ok()
            .map(|index| &self.snapshots[index])
    }

    /// Number of hostiles captured.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Reports whether no hostiles were captured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Consumes the view, yielding the underlying snapshots.
    #[must_use]
    pub fn into_vec(self) -> Vec<AgentSnapshot> {
        self.snapshots
    }
}

/// Immutable representation of the player's state.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlayerSnapshot {
    /// Tile currently occupied.
    pub tile: TileCoord,
    /// Continuous simulated position.
    pub position: Vec2,
    /// Hit points.
    pub health: Health,
    /// Effective combat stats.
    pub stats: CombatStats,
    /// Movement speed in tiles per second.
    pub speed: f32,
    /// Indicates whether the player is dead and awaiting respawn.
    pub dead: bool,
    /// Remaining invulnerability window.
    pub immune_for: Duration,
    /// Remaining duration of the under-attack indicator.
    pub under_attack_for: Duration,
    /// Remaining duration of the critical-hit indicator.
    pub critical_flash: Duration,
    /// Hostile the player is focused on.
    pub target: Option<AgentId>,
    /// Number of waypoints left on the current route.
    pub route_len: usize,
}

impl PlayerSnapshot {
    /// Reports whether hostile attacks currently have no effect.
    #[must_use]
    pub fn is_immune(&self) -> bool {
        !self.immune_for.is_zero()
    }

    /// Reports whether hostiles may attack the player right now.
    #[must_use]
    pub fn is_vulnerable(&self) -> bool {
        !self.dead && !self.is_immune()
    }
}

/// Read-only view into the occupancy index.
#[derive(Clone, Copy, Debug)]
pub struct OccupancyView<'a> {
    occupants: &'a BTreeMap<TileCoord, AgentId>,
    clusters: &'a BTreeMap<ClusterId, BTreeSet<AgentId>>,
    cluster_size: u32,
    player_alive: bool,
}

impl<'a> OccupancyView<'a> {
    /// Captures a view backed by the index's tile and cluster maps.
    #[must_use]
    pub fn new(
        occupants: &'a BTreeMap<TileCoord, AgentId>,
        clusters: &'a BTreeMap<ClusterId, BTreeSet<AgentId>>,
        cluster_size: u32,
        player_alive: bool,
    ) -> Self {
        Self {
            occupants,
            clusters,
            cluster_size,
            player_alive,
        }
    }

    /// Edge length of a cluster in tiles.
    #[must_use]
    pub const fn cluster_size(&self) -> u32 {
        self.cluster_size
    }

    /// Cluster that contains the tile.
    #[must_use]
    pub const fn cluster_of(&self, tile: TileCoord) -> ClusterId {
        ClusterId::of(tile, self.cluster_size)
    }

    /// Agent standing on the tile, ignoring a dead player.
    #[must_use]
    pub fn occupant(&self, tile: TileCoord) -> Option<AgentId> {
        self.occupants
            .get(&tile)
            .copied()
            .filter(|agent| !agent.is_player() || self.player_alive)
    }

    /// Reports whether any agent other than `exclude` stands on the tile.
    #[must_use]
    pub fn is_occupied(&self, tile: TileCoord, exclude: Option<AgentId>) -> bool {
        match self.occupant(tile) {
            Some(agent) => Some(agent) != exclude,
            None => false,
        }
    }

    /// Occupied tiles and their occupants in deterministic order.
    pub fn iter(&self) -> impl Iterator<Item = (TileCoord, AgentId)> + 'a {
        let player_alive = self.player_alive;
        self.occupants
            .iter()
            .map(|(tile, agent)| (*tile, *agent))
            .filter(move |(_, agent)| !agent.is_player() || player_alive)
    }

    /// Union of the agents registered to the provided clusters, sorted by id.
    #[must_use]
    pub fn agents_in(&self, clusters: &BTreeSet<ClusterId>) -> Vec<AgentId> {
        let mut agents: BTreeSet<AgentId> = BTreeSet::new();
        for cluster in clusters {
            if let Some(members) = self.clusters.get(cluster) {
                agents.extend(members.iter().copied());
            }
        }
        agents.into_iter().collect()
    }

    /// Clusters overlapping the rectangle after growing it by `margin` tiles.
    #[must_use]
    pub fn clusters_overlapping(
        &self,
        bounds: TileRect,
        margin: u32,
        dimensions: GridDimensions,
    ) -> BTreeSet<ClusterId> {
        let expanded = bounds.expanded(margin, dimensions);
        let first = self.cluster_of(expanded.min());
        let last = self.cluster_of(expanded.max());
        let mut clusters = BTreeSet::new();
        for row in first.row()..=last.row() {
            for column in first.column()..=last.column() {
                let _ = clusters.insert(ClusterId::new(column, row));
            }
        }
        clusters
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distances_match_expectation() {
        let origin = TileCoord::new(1, 1);
        let destination = TileCoord::new(4, 3);
        assert_eq!(origin.manhattan_distance(destination), 5);
        assert_eq!(origin.chebyshev_distance(destination), 3);
        assert!((origin.euclidean_distance(destination) - 13f32.sqrt()).abs() < 1e-6);
    }

    #[test]
    fn neighbors_stay_inside_grid() {
        let dimensions = GridDimensions::new(3, 3);
        let corner: Vec<_> = TileCoord::new(0, 0).neighbors(dimensions).collect();
        assert_eq!(corner.len(), 3);
        let center: Vec<_> = TileCoord::new(1, 1).neighbors(dimensions).collect();
        assert_eq!(center.len(), 8);
        assert!(center.iter().all(|tile| tile.is_adjacent(TileCoord::new(1, 1))));
    }

    #[test]
    fn positions_floor_into_tiles() {
        assert_eq!(TileCoord::from_position(Vec2::new(2.9, 0.1)), TileCoord::new(2, 0));
        assert_eq!(TileCoord::from_position(Vec2::new(-0.5, 3.0)), TileCoord::new(0, 3));
    }

    #[test]
    fn cluster_of_uses_integer_division() {
        assert_eq!(ClusterId::of(TileCoord::new(15, 16), 16), ClusterId::new(0, 1));
        assert_eq!(ClusterId::of(TileCoord::new(3, 3), 0), ClusterId::new(3, 3));
    }

    #[test]
    fn rect_expansion_clips_to_grid() {
        let dimensions = GridDimensions::new(20, 10);
        let rect = TileRect::around(TileCoord::new(2, 8), 1).expanded(3, dimensions);
        assert_eq!(rect.min(), TileCoord::new(0, 4));
        assert_eq!(rect.max(), TileCoord::new(6, 9));
    }

    #[test]
    fn health_never_underflows() {
        let health = Health::full(10).damaged(25);
        assert!(health.is_depleted());
        assert_eq!(health.restored().current(), 10);
    }

    #[test]
    fn occupancy_view_ignores_dead_player_and_excluded_agent() {
        let mut occupants = BTreeMap::new();
        let _ = occupants.insert(TileCoord::new(1, 1), AgentId::PLAYER);
        let _ = occupants.insert(TileCoord::new(2, 2), AgentId::new(4));
        let clusters = BTreeMap::new();

        let alive = OccupancyView::new(&occupants, &clusters, 4, true);
        assert!(alive.is_occupied(TileCoord::new(1, 1), None));
        assert!(!alive.is_occupied(TileCoord::new(1, 1), Some(AgentId::PLAYER)));
        assert!(!alive.is_occupied(TileCoord::new(2, 2), Some(AgentId::new(4))));

        let dead = OccupancyView::new(&occupants, &clusters, 4, false);
        assert!(!dead.is_occupied(TileCoord::new(1, 1), None));
        assert!(dead.is_occupied(TileCoord::new(2, 2), None));
    }

    #[test]
    fn agents_in_unknown_cluster_is_empty() {
        let occupants = BTreeMap::new();
        let clusters = BTreeMap::new();
        let view = OccupancyView::new(&occupants, &clusters, 8, true);
        let wanted: BTreeSet<_> = [ClusterId::new(9, 9)].into_iter().collect();
        assert!(view.agents_in(&wanted).is_empty());
    }
}
