//! Simulation settings loaded from TOML.

use std::{
    fs,
    path::{Path, PathBuf},
};

use realmwalk_system_combat::CombatTuning;
use realmwalk_system_hostile_ai::HostileAiConfig;
use realmwalk_system_pathfinding::PathfinderConfig;
use realmwalk_system_player_control::PlayerControlConfig;
use realmwalk_system_spawning::SpawningConfig;
use realmwalk_world::{MapError, TileMap, WorldConfig};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while loading settings or maps from disk.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read {path}")]
    Read {
        /// File that was requested.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
    /// The settings were not valid TOML for [`SimulationConfig`].
    #[error("failed to parse simulation settings")]
    Parse(#[from] toml::de::Error),
    /// The map text was malformed.
    #[error("failed to parse map")]
    Map(#[from] MapError),
}

/// Every tunable of a simulation run, grouped by the system that owns it.
///
/// Missing tables and keys fall back to their defaults, so an empty document
/// is a valid configuration.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// World construction and player parameters.
    pub world: WorldConfig,
    /// Pathfinder tunables shared by the player and hostile planners.
    pub pathfinder: PathfinderConfig,
    /// Hostile scheduler tunables.
    pub hostile_ai: HostileAiConfig,
    /// Damage and attack gating.
    pub combat: CombatTuning,
    /// Spawn cadence and roster.
    pub spawning: SpawningConfig,
    /// Player input handling.
    pub player_control: PlayerControlConfig,
    /// Session parameters of the driver itself.
    pub session: SessionConfig,
}

/// Driver-level parameters that no individual system owns.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Hostiles placed before the first frame.
    pub initial_hostiles: usize,
    /// Half extent of the view around the player, in tiles.
    pub view_radius: u32,
    /// Seed of the combat roll generator.
    pub combat_seed: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            initial_hostiles: 8,
            view_radius: 12,
            combat_seed: 0xc0_ba75,
        }
    }
}

impl SimulationConfig {
    /// Parses settings from TOML text.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    /// Reads and parses the settings file at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        Self::from_toml_str(&read(path)?)
    }
}

/// Reads a text map in the `.`/`#` format.
pub fn load_map(path: &Path) -> Result<TileMap, ConfigError> {
    Ok(read(path)?.parse()?)
}

fn read(path: &Path) -> Result<String, ConfigError> {
    fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })
}
