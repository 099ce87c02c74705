#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Headless driver for Realmwalk sessions.
//!
//! Loads settings and maps, then steps the world and every system frame by
//! frame in a deterministic order.

pub mod config;
pub mod simulation;

pub use config::{load_map, ConfigError, SessionConfig, SimulationConfig};
pub use simulation::{EventTally, ExperienceLedger, Simulation};
