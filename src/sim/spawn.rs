//! Enemy spawning and stat scaling
//!
//! Eligible enemy tiers widen with elapsed time; a geometric weight window
//! picks the type; stats scale with time, wave and difficulty.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::rng::RandomSource;
use super::state::{EnemyState, EnemyStats, GameEvent, GameState};
use super::status::StatusTracker;
use super::wave;
use crate::consts::*;

/// Ordered enemy tiers (weakest first) plus the boss variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EnemyKind {
    Slime,
    Goblin,
    Skeleton,
    Zombie,
    Bat,
    Ghost,
    Orc,
    Vampire,
    Golem,
    Dragon,
    Boss,
}

/// Regular tiers in unlock order
pub const ENEMY_TIERS: [EnemyKind; 10] = [
    EnemyKind::Slime,
    EnemyKind::Goblin,
    EnemyKind::Skeleton,
    EnemyKind::Zombie,
    EnemyKind::Bat,
    EnemyKind::Ghost,
    EnemyKind::Orc,
    EnemyKind::Vampire,
    EnemyKind::Golem,
    EnemyKind::Dragon,
];

/// Unscaled stats for one enemy type
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnemyBase {
    pub atk: i32,
    pub def: i32,
    pub hp: i32,
    pub speed: f32,
    pub exp: u32,
    /// Fires projectiles at the player
    pub ranged: bool,
}

impl EnemyKind {
    pub fn base(self) -> EnemyBase {
        let (atk, def, hp, speed, exp, ranged) = match self {
            EnemyKind::Slime => (4, 0, 20, 55.0, 1, false),
            EnemyKind::Goblin => (6, 1, 30, 70.0, 2, false),
            EnemyKind::Skeleton => (7, 2, 35, 60.0, 2, true),
            EnemyKind::Zombie => (9, 3, 55, 40.0, 3, false),
            EnemyKind::Bat => (6, 1, 25, 110.0, 3, false),
            EnemyKind::Ghost => (10, 2, 45, 80.0, 4, true),
            EnemyKind::Orc => (13, 5, 80, 55.0, 5, false),
            EnemyKind::Vampire => (15, 5, 90, 85.0, 6, true),
            EnemyKind::Golem => (18, 10, 160, 35.0, 8, false),
            EnemyKind::Dragon => (22, 8, 200, 65.0, 10, true),
            EnemyKind::Boss => (25, 10, 600, 45.0, 50, true),
        };
        EnemyBase { atk, def, hp, speed, exp, ranged }
    }
}

/// Tier unlock interval (seconds)
pub const TIER_UNLOCK_SECS: f32 = 60.0;
/// After this point the weakest tiers start dropping out and weights flatten
pub const LATE_GAME_SECS: f32 = 600.0;
/// Late game: one more weak tier dropped per interval
pub const TIER_RETIRE_SECS: f32 = 120.0;
pub const EARLY_WEIGHT_DECAY: f64 = 0.6;
pub const LATE_WEIGHT_DECAY: f64 = 0.85;

pub const BOSS_MIN_SECS: f32 = 120.0;
pub const BOSS_CHANCE: f64 = 0.02;
pub const LATE_BOSS_CHANCE: f64 = 0.05;

/// Seconds between spawn batches before rate multipliers
pub const BASE_SPAWN_INTERVAL: f32 = 2.0;
/// First spawn lands this far from the player
pub const FIRST_SPAWN_MIN_DIST: f32 = 220.0;
pub const FIRST_SPAWN_MAX_DIST: f32 = 320.0;

/// atk/def scale: linear in minutes and waves, offset at 1
pub fn atk_def_multiplier(elapsed: f32, wave: u32) -> f32 {
    1.0 + 0.08 * (elapsed / 60.0) + 0.05 * wave.saturating_sub(1) as f32
}

/// hp scale grows faster than atk/def
pub fn hp_multiplier(elapsed: f32, wave: u32) -> f32 {
    1.0 + 0.2 * (elapsed / 60.0) + 0.15 * wave.saturating_sub(1) as f32
}

pub fn scaled_stats(kind: EnemyKind, elapsed: f32, wave: u32, difficulty: f32, boss: bool) -> EnemyStats {
    let base = kind.base();
    let difficulty = difficulty.max(0.0) * if boss { 2.0 } else { 1.0 };
    let ad = atk_def_multiplier(elapsed, wave) * difficulty;
    let hp = ((base.hp as f32 * hp_multiplier(elapsed, wave) * difficulty).round() as i32).max(1);
    EnemyStats {
        atk: ((base.atk as f32 * ad).round() as i32).max(1),
        def: ((base.def as f32 * ad).round() as i32).max(0),
        hp,
        max_hp: hp,
        speed: base.speed,
    }
}

/// Inclusive [min, max] tier index range eligible at `elapsed`
pub fn type_window(elapsed: f32) -> (usize, usize) {
    let last = ENEMY_TIERS.len() - 1;
    let max = ((elapsed.max(0.0) / TIER_UNLOCK_SECS).floor() as usize).min(last);
    let min = if elapsed >= LATE_GAME_SECS {
        let retired = ((elapsed - LATE_GAME_SECS) / TIER_RETIRE_SECS).floor() as usize + 1;
        retired.min(max)
    } else {
        0
    };
    (min, max)
}

/// Normalised weights for each index in the window, weakest first
pub fn type_weights(min: usize, max: usize, late_game: bool) -> Vec<f64> {
    let decay = if late_game { LATE_WEIGHT_DECAY } else { EARLY_WEIGHT_DECAY };
    let raw: Vec<f64> = (min..=max).map(|i| decay.powi((i - min) as i32)).collect();
    let total: f64 = raw.iter().sum();
    raw.into_iter().map(|w| w / total).collect()
}

/// Cumulative-distribution draw over the current window
pub fn select_enemy_kind(elapsed: f32, rng: &mut dyn RandomSource) -> EnemyKind {
    let (min, max) = type_window(elapsed);
    let weights = type_weights(min, max, elapsed >= LATE_GAME_SECS);
    let roll = rng.next_f64();

    let mut cumulative = 0.0;
    let mut chosen = None;
    for (offset, w) in weights.iter().enumerate() {
        cumulative += w;
        if roll < cumulative {
            chosen = Some(min + offset);
            break;
        }
    }
    // Rounding can leave the total a hair under 1.0
    ENEMY_TIERS[chosen.unwrap_or(max)]
}

pub fn roll_boss(elapsed: f32, rng: &mut dyn RandomSource) -> bool {
    if elapsed < BOSS_MIN_SECS {
        return false;
    }
    let p = if elapsed >= LATE_GAME_SECS { LATE_BOSS_CHANCE } else { BOSS_CHANCE };
    rng.chance(p)
}

/// Near the player for the first spawn of a run, otherwise just outside a map edge
pub fn spawn_position(player_pos: Vec2, first_spawn: bool, rng: &mut dyn RandomSource) -> Vec2 {
    if first_spawn {
        let angle = rng.range_f32(0.0, std::f32::consts::TAU);
        let dist = rng.range_f32(FIRST_SPAWN_MIN_DIST, FIRST_SPAWN_MAX_DIST);
        let p = player_pos + crate::polar_to_cartesian(dist, angle);
        return Vec2::new(
            p.x.clamp(ENEMY_RADIUS, MAP_WIDTH - ENEMY_RADIUS),
            p.y.clamp(ENEMY_RADIUS, MAP_HEIGHT - ENEMY_RADIUS),
        );
    }

    match rng.index(4) {
        0 => Vec2::new(rng.range_f32(0.0, MAP_WIDTH), -SPAWN_EDGE_OFFSET),
        1 => Vec2::new(MAP_WIDTH + SPAWN_EDGE_OFFSET, rng.range_f32(0.0, MAP_HEIGHT)),
        2 => Vec2::new(rng.range_f32(0.0, MAP_WIDTH), MAP_HEIGHT + SPAWN_EDGE_OFFSET),
        _ => Vec2::new(-SPAWN_EDGE_OFFSET, rng.range_f32(0.0, MAP_HEIGHT)),
    }
}

/// Spawner bookkeeping carried across ticks
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpawnState {
    /// Seconds until the next batch
    pub timer: f32,
    pub first_spawn_done: bool,
}

/// Seconds between batches for the current wave and difficulty
pub fn spawn_interval(wave: u32, spawn_rate: f32) -> f32 {
    BASE_SPAWN_INTERVAL / (spawn_rate.max(0.01) * wave::spawn_speed_multiplier(wave))
}

/// Enemies per batch for the current wave and difficulty
pub fn batch_size(wave: u32, spawn_count: f32) -> usize {
    ((wave::wave_spawn_count(wave) as f32 * spawn_count.max(0.0)).ceil() as usize).max(1)
}

/// Run the spawn timer and add any new enemies to the state
pub fn update_spawning(state: &mut GameState, dt: f32) {
    state.spawn.timer -= dt;
    if state.spawn.timer > 0.0 {
        return;
    }

    let difficulty = &state.settings.difficulty;
    let wave = state.wave.current_wave;
    state.spawn.timer += spawn_interval(wave, difficulty.spawn_rate);
    // Never let a long stall queue up a burst
    state.spawn.timer = state.spawn.timer.max(0.0);

    let room = MAX_ENEMIES.saturating_sub(state.enemies.len());
    let count = batch_size(wave, difficulty.spawn_count).min(room);
    let stat_mult = difficulty.enemy_stat_multiplier;
    let elapsed = state.elapsed;

    for i in 0..count {
        let boss = i == 0 && roll_boss(elapsed, &mut state.rng);
        let kind = if boss {
            EnemyKind::Boss
        } else {
            select_enemy_kind(elapsed, &mut state.rng)
        };
        let first = !state.spawn.first_spawn_done;
        let pos = spawn_position(state.player.pos, first, &mut state.rng);
        state.spawn.first_spawn_done = true;

        let id = state.next_entity_id();
        state.enemies.push(EnemyState {
            id,
            pos,
            kind,
            stats: scaled_stats(kind, elapsed, wave, stat_mult, boss),
            statuses: StatusTracker::default(),
            is_boss: boss,
            knockback: Vec2::ZERO,
        });
        if boss {
            log::info!("Boss spawned at {:.1}s (wave {})", elapsed, wave);
        }
        state.events.push(GameEvent::EnemySpawned { id, kind, boss });
    }
}
