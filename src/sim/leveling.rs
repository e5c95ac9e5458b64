//! Experience curve and level accrual
//!
//! Three regimes: exponential up to [`EXP_CAP_LEVEL`], linear up to
//! [`EXP_LINEAR_END_LEVEL`], then a power-law tail. Each regime starts from
//! the previous one's final value so the curve has no jumps.

use serde::{Deserialize, Serialize};

pub const EXP_BASE: f64 = 10.0;
pub const EXP_FACTOR: f64 = 1.2;
pub const EXP_CAP_LEVEL: u32 = 10;
pub const EXP_LINEAR_STEP: f64 = 8.0;
pub const EXP_LINEAR_END_LEVEL: u32 = 30;
pub const EXP_TAIL_POWER: f64 = 1.5;
/// Each exp-bonus skill level adds this fraction to gained experience
pub const EXP_BONUS_PER_LEVEL: f32 = 0.1;

fn exp_curve(level: u32) -> f64 {
    let level = level.max(1);
    let exp_cap = EXP_BASE * EXP_FACTOR.powi(EXP_CAP_LEVEL as i32 - 1);
    if level <= EXP_CAP_LEVEL {
        EXP_BASE * EXP_FACTOR.powi(level as i32 - 1)
    } else if level <= EXP_LINEAR_END_LEVEL {
        exp_cap + EXP_LINEAR_STEP * (level - EXP_CAP_LEVEL) as f64
    } else {
        let linear_end =
            exp_cap + EXP_LINEAR_STEP * (EXP_LINEAR_END_LEVEL - EXP_CAP_LEVEL) as f64;
        linear_end * (level as f64 / EXP_LINEAR_END_LEVEL as f64).powf(EXP_TAIL_POWER)
    }
}

/// Experience needed to go from `level` to `level + 1`
pub fn exp_to_next_level(level: u32) -> u32 {
    exp_curve(level).floor() as u32
}

/// Apply the exp-bonus skill and the difficulty multiplier to a raw award
pub fn exp_gain(raw: u32, exp_bonus_level: u8, multiplier: f32) -> u32 {
    let bonus = 1.0 + EXP_BONUS_PER_LEVEL * exp_bonus_level as f32;
    (raw as f32 * bonus * multiplier.max(0.0)).round() as u32
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelProgress {
    pub level: u32,
    pub exp: u32,
    pub exp_to_next: u32,
}

impl Default for LevelProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl LevelProgress {
    pub fn new() -> Self {
        Self {
            level: 1,
            exp: 0,
            exp_to_next: exp_to_next_level(1),
        }
    }

    /// Add experience, returning how many levels were gained
    pub fn add_exp(&mut self, amount: u32) -> u32 {
        self.exp = self.exp.saturating_add(amount);
        let mut gained = 0;
        while self.exp >= self.exp_to_next {
            self.exp -= self.exp_to_next;
            self.level += 1;
            self.exp_to_next = exp_to_next_level(self.level).max(1);
            gained += 1;
        }
        gained
    }
}
