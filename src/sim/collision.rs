//! Collision primitives for circles, the melee sweep and map bounds
//!
//! Everything in the arena is a circle. The melee attack is a circular sector
//! centred on the player's facing direction.

use glam::Vec2;

use crate::consts::{MAP_HEIGHT, MAP_WIDTH};
use crate::normalize_angle;

/// True when two circles touch or overlap
#[inline]
pub fn circles_overlap(a: Vec2, a_radius: f32, b: Vec2, b_radius: f32) -> bool {
    let reach = a_radius + b_radius;
    a.distance_squared(b) <= reach * reach
}

/// A circular sector swept by a melee strike
#[derive(Debug, Clone, Copy)]
pub struct MeleeArc {
    pub origin: Vec2,
    /// Facing angle in radians
    pub facing: f32,
    /// Half of the total sweep angle
    pub half_angle: f32,
    pub range: f32,
}

impl MeleeArc {
    pub fn new(origin: Vec2, facing: f32, sweep: f32, range: f32) -> Self {
        Self {
            origin,
            facing: normalize_angle(facing),
            half_angle: sweep * 0.5,
            range,
        }
    }

    /// Check if an angle is within the sweep
    pub fn contains_angle(&self, theta: f32) -> bool {
        normalize_angle(theta - self.facing).abs() <= self.half_angle
    }

    /// Check if a circle of `radius` at `center` is touched by the sweep
    ///
    /// A circle overlapping the origin always counts, whatever its bearing.
    pub fn hits_circle(&self, center: Vec2, radius: f32) -> bool {
        let offset = center - self.origin;
        let dist = offset.length();
        if dist <= radius {
            return true;
        }
        if dist - radius > self.range {
            return false;
        }
        // Widen the angular test by the angle the circle subtends
        let slack = (radius / dist).clamp(-1.0, 1.0).asin();
        normalize_angle(offset.y.atan2(offset.x) - self.facing).abs() <= self.half_angle + slack
    }
}

/// True when `pos` lies more than `margin` outside the map rectangle
pub fn outside_map(pos: Vec2, margin: f32) -> bool {
    pos.x < -margin || pos.y < -margin || pos.x > MAP_WIDTH + margin || pos.y > MAP_HEIGHT + margin
}

/// Keep a body of `radius` inside the map
pub fn clamp_to_map(pos: Vec2, radius: f32) -> Vec2 {
    Vec2::new(
        pos.x.clamp(radius, MAP_WIDTH - radius),
        pos.y.clamp(radius, MAP_HEIGHT - radius),
    )
}
