//! Ranged volleys and projectiles
//!
//! Volleys fan out from the facing angle: 30° steps alternating clockwise and
//! counter-clockwise until a 12-step lap is full, then further laps shifted by
//! a shrinking sub-step so they fill the gaps of the previous lap.

use std::collections::BTreeSet;
use std::f32::consts::PI;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::polar_to_cartesian;

/// Angular step between neighbouring bullets in one lap
pub const BULLET_STEP: f32 = PI / 6.0;
/// Bullets per full lap
pub const LAP_CAPACITY: usize = 12;

pub const PROJECTILE_SPEED: f32 = 520.0;
pub const PROJECTILE_RANGE: f32 = 420.0;
pub const RANGE_BONUS_MULT: f32 = 1.5;
pub const PROJECTILE_RADIUS: f32 = 5.0;

pub const ENEMY_PROJECTILE_SPEED: f32 = 260.0;
pub const ENEMY_PROJECTILE_RANGE: f32 = 500.0;
pub const ENEMY_PROJECTILE_RADIUS: f32 = 6.0;

/// Signed step multiple for the i-th bullet inside a lap: 0, +1, -1, +2, -2, ... +6
fn lap_step(i: usize) -> f32 {
    if i == 0 {
        0.0
    } else if i % 2 == 1 {
        i.div_ceil(2) as f32
    } else {
        -((i / 2) as f32)
    }
}

/// Offset applied to every bullet of lap `lap`: 0, 15°, 22.5°, 26.25°, ...
fn lap_offset(lap: usize) -> f32 {
    if lap == 0 {
        return 0.0;
    }
    BULLET_STEP * (1.0 - 0.5f32.powi(lap as i32))
}

/// Firing angles for a volley of `count` bullets around `base` (radians).
///
/// Positive angles turn clockwise on screen since +y points down. The first
/// bullet flies at `base` as given; the rest are normalized to [-π, π).
pub fn clockwise_bullet_angles(count: u32, base: f32) -> Vec<f32> {
    (0..count as usize)
        .map(|n| {
            if n == 0 {
                return base;
            }
            let lap = n / LAP_CAPACITY;
            let i = n % LAP_CAPACITY;
            crate::normalize_angle(base + lap_offset(lap) + lap_step(i) * BULLET_STEP)
        })
        .collect()
}

/// A player bullet
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Projectile {
    pub id: u32,
    pub pos: Vec2,
    pub velocity: Vec2,
    /// Channel base damage; defence and modifiers are applied per target
    pub base_damage: f32,
    pub lucky: bool,
    /// Distance left before the bullet fizzles
    pub range_left: f32,
    pub penetrating: bool,
    pub knockback_level: u8,
    /// Enemies this bullet has already struck
    pub hit: BTreeSet<u32>,
}

impl Projectile {
    pub fn new(id: u32, origin: Vec2, angle: f32, base_damage: f32, range: f32) -> Self {
        Self {
            id,
            pos: origin,
            velocity: polar_to_cartesian(PROJECTILE_SPEED, angle),
            base_damage,
            lucky: false,
            range_left: range,
            penetrating: false,
            knockback_level: 0,
            hit: BTreeSet::new(),
        }
    }

    /// Move one step; false once the range budget is spent
    pub fn advance(&mut self, dt: f32) -> bool {
        let step = self.velocity * dt;
        self.pos += step;
        self.range_left -= step.length();
        self.range_left > 0.0
    }

    /// True if this bullet may still damage `enemy_id`
    pub fn can_hit(&self, enemy_id: u32) -> bool {
        !self.hit.contains(&enemy_id) && (self.penetrating || self.hit.is_empty())
    }
}

/// A shot fired by a ranged enemy; single hit against the player
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnemyProjectile {
    pub id: u32,
    pub pos: Vec2,
    pub velocity: Vec2,
    pub atk: i32,
    pub range_left: f32,
}

impl EnemyProjectile {
    pub fn aimed(id: u32, from: Vec2, to: Vec2, atk: i32) -> Self {
        Self {
            id,
            pos: from,
            velocity: crate::direction_between(from, to) * ENEMY_PROJECTILE_SPEED,
            atk,
            range_left: ENEMY_PROJECTILE_RANGE,
        }
    }

    pub fn advance(&mut self, dt: f32) -> bool {
        let step = self.velocity * dt;
        self.pos += step;
        self.range_left -= step.length();
        self.range_left > 0.0 && step != Vec2::ZERO
    }
}
