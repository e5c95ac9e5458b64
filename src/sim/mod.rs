//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Seeded RNG only, injected as [`rng::RandomSource`]
//! - Stable iteration order (by entity ID)
//! - No rendering, audio or platform dependencies

pub mod autopilot;
pub mod bonus;
pub mod bullet;
pub mod chord;
pub mod collision;
pub mod combat;
pub mod leveling;
pub mod magic;
pub mod rng;
pub mod schedule;
pub mod spawn;
pub mod state;
pub mod status;
pub mod tick;
pub mod wave;

pub use bonus::{BonusCatalog, BonusKind, LevelUpBonus, LevelUpOffer};
pub use chord::{BasicChordResolver, Channel, Chord, ChordDefinition, ChordPool, ChordResolver, CodeSlot};
pub use combat::{ConditionalMultipliers, DamageParams, LuckResult};
pub use magic::MagicKind;
pub use rng::{RandomSource, SequenceRng, SimRng};
pub use spawn::EnemyKind;
pub use state::{
    Coin, Direction8, EnemyState, GameEvent, GamePhase, GameState, Magics, PlayerState, Skills,
    Stats,
};
pub use status::{StatusEffect, StatusKind, StatusTracker};
pub use tick::{TickInput, advance, tick};
pub use wave::{WaveOutcome, WaveState};
