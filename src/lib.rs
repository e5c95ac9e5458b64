//! Chord Survivor - chord-gated survival combat simulation
//!
//! Core modules:
//! - `sim`: Deterministic simulation (combat, spawning, waves, leveling, chords)
//! - `settings`: Difficulty and character configuration for a run
//! - `summary`: Terminal run summary handed to result/telemetry consumers
//! - `runner`: Fixed-timestep accumulator driven by frame callbacks
//! - `error`: Error type for configuration and invariant failures

pub mod error;
pub mod runner;
pub mod settings;
pub mod sim;
pub mod summary;

pub use error::SimError;
pub use runner::Runner;
pub use settings::{CharacterConfig, DifficultyConfig, DifficultyPreset, RunSettings};
pub use summary::RunSummary;

use glam::Vec2;

/// Game configuration constants
pub mod consts {
    /// Fixed simulation timestep (60 Hz)
    pub const SIM_DT: f32 = 1.0 / 60.0;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;

    /// Map dimensions (pixels)
    pub const MAP_WIDTH: f32 = 1600.0;
    pub const MAP_HEIGHT: f32 = 1200.0;
    /// Spawned enemies appear this far outside the map edge
    pub const SPAWN_EDGE_OFFSET: f32 = 40.0;
    /// Enemies drifting further than this outside the map are removed
    pub const DESPAWN_MARGIN: f32 = 300.0;

    /// Player body radius
    pub const PLAYER_RADIUS: f32 = 16.0;
    /// Pixels per second per point of the speed stat
    pub const SPEED_UNIT: f32 = 30.0;
    /// Invulnerability after taking a hit (seconds)
    pub const PLAYER_INVULN_SECS: f32 = 0.5;

    /// Hard caps on player stats
    pub const MAX_HP_CAP: i32 = 500;
    pub const MAX_LUCK: i32 = 40;
    pub const MAX_MAGIC_LEVEL: u8 = 3;
    pub const MAX_A_BULLET_COUNT: u32 = 24;

    /// Enemy body radius (boss is doubled)
    pub const ENEMY_RADIUS: f32 = 14.0;
    /// Upper bound on live enemies
    pub const MAX_ENEMIES: usize = 150;

    /// Coins
    pub const COIN_PICKUP_RADIUS: f32 = 48.0;
    pub const COIN_LIFETIME_SECS: f32 = 30.0;
}

/// Normalized angle to [-π, π)
#[inline]
pub fn normalize_angle(mut angle: f32) -> f32 {
    use std::f32::consts::PI;
    while angle >= PI {
        angle -= 2.0 * PI;
    }
    while angle < -PI {
        angle += 2.0 * PI;
    }
    angle
}

/// Convert polar (r, theta) to cartesian (x, y)
#[inline]
pub fn polar_to_cartesian(r: f32, theta: f32) -> Vec2 {
    Vec2::new(r * theta.cos(), r * theta.sin())
}

/// Unit vector from `from` toward `to`; zero when the points coincide
#[inline]
pub fn direction_between(from: Vec2, to: Vec2) -> Vec2 {
    (to - from).normalize_or_zero()
}
