//! Damage resolution, knockback, luck and conditional skill multipliers
//!
//! One damage formula serves every source (ranged, melee, magic, enemy
//! contact). Channels only differ in the base damage they feed in.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::rng::RandomSource;
use super::state::{EnemyState, PlayerState, Skills};
use super::status::StatusKind;
use crate::consts::MAX_LUCK;
use crate::direction_between;

/// Starting attack values the per-channel slopes are measured from
pub const INITIAL_A_ATK: i32 = 10;
pub const INITIAL_B_ATK: i32 = 15;
pub const INITIAL_C_ATK: i32 = 10;

pub const RANGED_BASE_DAMAGE: f32 = 10.0;
pub const RANGED_SLOPE: f32 = 1.0;
pub const MELEE_BASE_DAMAGE: f32 = 20.0;
pub const MELEE_SLOPE: f32 = 1.2;
pub const MAGIC_SLOPE: f32 = 0.8;

/// Buffer: 1 + 0.5·L + rate·min(magicAtk, cap)
pub const BUFFER_PER_LEVEL: f32 = 0.5;
pub const BUFFER_MAGIC_RATE: f32 = 0.01;
pub const BUFFER_MAGIC_CAP: i32 = 50;
pub const BUFFER_DEFAULT_MULT: f32 = 1.5;

/// Debuffer: defence multiplier max(0.2, 0.8 − 0.18·L − rate·min(magicAtk, cap))
pub const DEBUFF_DEF_BASE: f32 = 0.8;
pub const DEBUFF_DEF_PER_LEVEL: f32 = 0.18;
pub const DEBUFF_DEF_MAGIC_RATE: f32 = 0.004;
pub const DEBUFF_DEF_FLOOR: f32 = 0.2;
pub const DEBUFF_MAGIC_CAP: i32 = 50;
/// Debuffer damage multiplier 1 + 0.22·L + rate·min(magicAtk, cap)
pub const DEBUFF_DMG_PER_LEVEL: f32 = 0.22;
pub const DEBUFF_DMG_MAGIC_RATE: f32 = 0.006;
pub const DEBUFF_DEFAULT_DEF_MULT: f32 = 0.5;
pub const DEBUFF_DEFAULT_DMG_MULT: f32 = 1.3;

pub const LUCKY_MULT: f32 = 2.0;
const ATTACKER_ATK_WEIGHT: f32 = 2.0;
const DEFENDER_DEF_WEIGHT: f32 = 0.5;

pub const KNOCKBACK_BASE_FORCE: f32 = 220.0;
pub const KNOCKBACK_PER_LEVEL: f32 = 80.0;
pub const KNOCKBACK_DECAY: f32 = 0.9;
/// Knockback below this speed snaps to zero
pub const KNOCKBACK_EPSILON: f32 = 5.0;

pub const LUCK_BASE_CHANCE: f64 = 0.06;
pub const LUCK_PER_POINT: f64 = 0.005;

pub const LAST_STAND_HP_RATIO: f32 = 0.15;
pub const LAST_STAND_ATTACK: f32 = 1.8;
pub const LAST_STAND_DURATION: f32 = 1.5;
pub const LAST_STAND_COOLDOWN: f32 = 0.6;
pub const LAST_STAND_SPEED_BONUS: i32 = 2;
pub const PEAK_ATTACK: f32 = 1.3;
pub const PEAK_DURATION: f32 = 1.2;
pub const PEAK_COOLDOWN: f32 = 0.85;

/// Inputs to the shared damage formula
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DamageParams {
    pub base_damage: f32,
    pub attacker_bonus_atk: i32,
    pub defender_def: i32,
    pub buffed: bool,
    pub debuffed: bool,
    pub buffer_level: Option<u8>,
    pub debuffer_level: Option<u8>,
    pub caster_magic_atk: i32,
    pub lucky: bool,
}

fn capped_magic(magic_atk: i32, cap: i32) -> f32 {
    magic_atk.clamp(0, cap) as f32
}

/// Attack multiplier from the attacker's buffer status
pub fn buffer_multiplier(buffed: bool, level: Option<u8>, magic_atk: i32) -> f32 {
    if !buffed {
        return 1.0;
    }
    match level {
        Some(l @ 1..=3) => {
            1.0 + BUFFER_PER_LEVEL * l as f32
                + BUFFER_MAGIC_RATE * capped_magic(magic_atk, BUFFER_MAGIC_CAP)
        }
        _ => BUFFER_DEFAULT_MULT,
    }
}

/// (defence multiplier, damage multiplier) from the defender's debuffer status
pub fn debuffer_multipliers(debuffed: bool, level: Option<u8>, magic_atk: i32) -> (f32, f32) {
    if !debuffed {
        return (1.0, 1.0);
    }
    match level {
        Some(l @ 1..=3) => {
            let m = capped_magic(magic_atk, DEBUFF_MAGIC_CAP);
            let def_mult = (DEBUFF_DEF_BASE
                - DEBUFF_DEF_PER_LEVEL * l as f32
                - DEBUFF_DEF_MAGIC_RATE * m)
                .max(DEBUFF_DEF_FLOOR);
            let dmg_mult = 1.0 + DEBUFF_DMG_PER_LEVEL * l as f32 + DEBUFF_DMG_MAGIC_RATE * m;
            (def_mult, dmg_mult)
        }
        _ => (DEBUFF_DEFAULT_DEF_MULT, DEBUFF_DEFAULT_DMG_MULT),
    }
}

/// Final damage, never below 1
pub fn damage(p: &DamageParams) -> i32 {
    let atk_mult = buffer_multiplier(p.buffed, p.buffer_level, p.caster_magic_atk);
    let (def_mult, debuff_mult) =
        debuffer_multipliers(p.debuffed, p.debuffer_level, p.caster_magic_atk);
    let lucky_mult = if p.lucky { LUCKY_MULT } else { 1.0 };

    let offence = (p.base_damage + p.attacker_bonus_atk as f32 * ATTACKER_ATK_WEIGHT)
        * atk_mult
        * debuff_mult
        * lucky_mult;
    let mitigation = p.defender_def.max(0) as f32 * def_mult * DEFENDER_DEF_WEIGHT;
    let raw = (offence - mitigation).floor();
    if raw.is_finite() {
        (raw as i32).max(1)
    } else {
        1
    }
}

pub fn ranged_base_damage(a_atk: i32) -> f32 {
    RANGED_BASE_DAMAGE + (a_atk - INITIAL_A_ATK) as f32 * RANGED_SLOPE
}

pub fn melee_base_damage(b_atk: i32) -> f32 {
    MELEE_BASE_DAMAGE + (b_atk - INITIAL_B_ATK) as f32 * MELEE_SLOPE
}

pub fn magic_base_damage(spell_constant: f32, c_atk: i32) -> f32 {
    spell_constant + (c_atk - INITIAL_C_ATK) as f32 * MAGIC_SLOPE
}

/// Damage parameters for a player-sourced hit on an enemy
pub fn player_hit_params(player: &PlayerState, enemy: &EnemyState, base: f32, lucky: bool) -> DamageParams {
    let buffer = player.statuses.get(StatusKind::Buffer);
    let debuffer = enemy.statuses.get(StatusKind::Debuffer);
    DamageParams {
        base_damage: base,
        attacker_bonus_atk: 0,
        defender_def: enemy.stats.def,
        buffed: buffer.is_some(),
        debuffed: debuffer.is_some(),
        buffer_level: buffer.map(|e| e.level),
        debuffer_level: debuffer.map(|e| e.level),
        caster_magic_atk: player.stats.c_atk,
        lucky,
    }
}

/// Damage parameters for an enemy hit on the player
pub fn enemy_hit_params(enemy_atk: i32, effective_def: i32) -> DamageParams {
    DamageParams {
        base_damage: 0.0,
        attacker_bonus_atk: enemy_atk,
        defender_def: effective_def,
        ..Default::default()
    }
}

/// Velocity imparted away from the attack origin
pub fn knockback_impulse(origin: Vec2, target: Vec2, skill_level: u8) -> Vec2 {
    direction_between(origin, target)
        * (KNOCKBACK_BASE_FORCE + KNOCKBACK_PER_LEVEL * skill_level as f32)
}

/// One tick of multiplicative knockback decay
pub fn decay_knockback(velocity: Vec2) -> Vec2 {
    let next = velocity * KNOCKBACK_DECAY;
    if next.length() < KNOCKBACK_EPSILON {
        Vec2::ZERO
    } else {
        next
    }
}

/// Outcome of one luck draw. All effects fire together or not at all.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LuckResult {
    pub is_lucky: bool,
    pub double_damage: bool,
    pub no_damage_taken: bool,
    pub reload_reduction: bool,
    pub double_time: bool,
}

impl LuckResult {
    fn all(active: bool) -> Self {
        Self {
            is_lucky: active,
            double_damage: active,
            no_damage_taken: active,
            reload_reduction: active,
            double_time: active,
        }
    }
}

/// Activation probability for a luck stat
pub fn luck_chance(luck: i32) -> f64 {
    LUCK_BASE_CHANCE + luck.clamp(0, MAX_LUCK) as f64 * LUCK_PER_POINT
}

pub fn check_luck(luck: i32, rng: &mut dyn RandomSource) -> LuckResult {
    LuckResult::all(rng.chance(luck_chance(luck)))
}

/// Modifiers from the last-stand and peak-condition skills
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConditionalMultipliers {
    pub attack: f32,
    pub duration: f32,
    /// Multiplies cooldowns (below 1 shortens them)
    pub cooldown: f32,
    pub speed_bonus: i32,
    /// Replaces the player's defence when set
    pub def_override: Option<i32>,
    pub last_stand: bool,
    pub peak_condition: bool,
}

impl Default for ConditionalMultipliers {
    fn default() -> Self {
        Self {
            attack: 1.0,
            duration: 1.0,
            cooldown: 1.0,
            speed_bonus: 0,
            def_override: None,
            last_stand: false,
            peak_condition: false,
        }
    }
}

impl ConditionalMultipliers {
    pub fn effective_def(&self, def: i32) -> i32 {
        self.def_override.unwrap_or(def)
    }
}

/// Recomputed every tick from the current hp ratio
pub fn conditional_multipliers(hp: i32, max_hp: i32, skills: &Skills, always_on: bool) -> ConditionalMultipliers {
    let mut out = ConditionalMultipliers::default();
    let ratio = if max_hp > 0 { hp as f32 / max_hp as f32 } else { 0.0 };

    if skills.last_stand && (ratio <= LAST_STAND_HP_RATIO || always_on) {
        out.last_stand = true;
        out.attack *= LAST_STAND_ATTACK;
        out.duration *= LAST_STAND_DURATION;
        out.cooldown *= LAST_STAND_COOLDOWN;
        out.speed_bonus += LAST_STAND_SPEED_BONUS;
        out.def_override = Some(0);
    }

    if skills.peak_condition && (hp == max_hp || always_on) {
        out.peak_condition = true;
        out.attack *= PEAK_ATTACK;
        out.duration *= PEAK_DURATION;
        out.cooldown *= PEAK_COOLDOWN;
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::rng::{SequenceRng, SimRng};
    use proptest::prelude::*;

    #[test]
    fn test_plain_ranged_hit() {
        // Base ranged damage at starting aAtk against def 5: floor(10 - 2.5) = 7
        let p = DamageParams {
            base_damage: ranged_base_damage(INITIAL_A_ATK),
            defender_def: 5,
            ..Default::default()
        };
        assert_eq!(damage(&p), 7);
    }

    #[test]
    fn test_lucky_doubles_offence() {
        let p = DamageParams {
            base_damage: 10.0,
            lucky: true,
            ..Default::default()
        };
        assert_eq!(damage(&p), 20);
    }

    #[test]
    fn test_buffer_levels() {
        assert_eq!(buffer_multiplier(false, Some(3), 100), 1.0);
        assert!((buffer_multiplier(true, Some(2), 0) - 2.0).abs() < 1e-6);
        // magic attack is capped
        assert!((buffer_multiplier(true, Some(1), 500) - (1.5 + 0.5)).abs() < 1e-6);
        assert_eq!(buffer_multiplier(true, None, 10), BUFFER_DEFAULT_MULT);
    }

    #[test]
    fn test_debuffer_floor() {
        let (def_mult, dmg_mult) = debuffer_multipliers(true, Some(3), 1000);
        assert_eq!(def_mult, DEBUFF_DEF_FLOOR);
        assert!(dmg_mult > 1.66);
        assert_eq!(debuffer_multipliers(true, None, 0), (DEBUFF_DEFAULT_DEF_MULT, DEBUFF_DEFAULT_DMG_MULT));
        assert_eq!(debuffer_multipliers(false, Some(2), 0), (1.0, 1.0));
    }

    #[test]
    fn test_heavy_armour_still_takes_one() {
        let p = DamageParams {
            base_damage: 1.0,
            defender_def: 10_000,
            ..Default::default()
        };
        assert_eq!(damage(&p), 1);
    }

    #[test]
    fn test_enemy_hit_uses_weighted_atk() {
        // 6 * 2 - 4 * 0.5 = 10
        assert_eq!(damage(&enemy_hit_params(6, 4)), 10);
    }

    #[test]
    fn test_knockback_decays_to_zero() {
        let mut v = knockback_impulse(Vec2::ZERO, Vec2::new(3.0, 0.0), 1);
        assert!((v.x - 300.0).abs() < 1e-3);
        for _ in 0..200 {
            v = decay_knockback(v);
        }
        assert_eq!(v, Vec2::ZERO);
        // Coincident origin produces no push
        assert_eq!(knockback_impulse(Vec2::ONE, Vec2::ONE, 3), Vec2::ZERO);
    }

    #[test]
    fn test_luck_is_all_or_nothing() {
        let mut hit = SequenceRng::new(vec![0.0]);
        let r = check_luck(0, &mut hit);
        assert!(r.is_lucky && r.double_damage && r.no_damage_taken && r.reload_reduction && r.double_time);

        let mut miss = SequenceRng::new(vec![0.99]);
        assert_eq!(check_luck(40, &mut miss), LuckResult::default());
    }

    #[test]
    fn test_luck_bounds() {
        assert!((luck_chance(0) - 0.06).abs() < 1e-12);
        assert!((luck_chance(40) - 0.26).abs() < 1e-12);
        assert_eq!(luck_chance(400), luck_chance(40));
        assert_eq!(luck_chance(-5), luck_chance(0));
    }

    #[test]
    fn test_base_luck_empirical_rate() {
        let mut rng = SimRng::new(2024);
        let trials = 100_000;
        let hits = (0..trials).filter(|_| check_luck(0, &mut rng).is_lucky).count();
        let rate = hits as f64 / trials as f64;
        assert!((rate - LUCK_BASE_CHANCE).abs() < 0.005, "rate {rate}");
    }

    #[test]
    fn test_last_stand_at_low_hp() {
        let skills = Skills { last_stand: true, ..Default::default() };
        let m = conditional_multipliers(10, 100, &skills, false);
        assert!(m.last_stand);
        assert_eq!(m.def_override, Some(0));
        assert!((m.attack - 1.8).abs() < 1e-6);
        assert_eq!(m.effective_def(12), 0);

        let healthy = conditional_multipliers(50, 100, &skills, false);
        assert_eq!(healthy, ConditionalMultipliers::default());
    }

    #[test]
    fn test_peak_condition_and_debug_stacking() {
        let skills = Skills { last_stand: true, peak_condition: true, ..Default::default() };
        let full = conditional_multipliers(100, 100, &skills, false);
        assert!(full.peak_condition && !full.last_stand);
        assert!((full.attack - PEAK_ATTACK).abs() < 1e-6);

        let forced = conditional_multipliers(60, 100, &skills, true);
        assert!(forced.peak_condition && forced.last_stand);
        assert!((forced.attack - LAST_STAND_ATTACK * PEAK_ATTACK).abs() < 1e-5);
    }

    proptest! {
        #[test]
        fn prop_damage_at_least_one(
            base in 0.0f32..500.0,
            bonus in 0i32..200,
            def in 0i32..2000,
            buffed: bool,
            debuffed: bool,
            buffer_level in proptest::option::of(0u8..5),
            debuffer_level in proptest::option::of(0u8..5),
            magic in -10i32..300,
            lucky: bool,
        ) {
            let p = DamageParams {
                base_damage: base,
                attacker_bonus_atk: bonus,
                defender_def: def,
                buffed,
                debuffed,
                buffer_level,
                debuffer_level,
                caster_magic_atk: magic,
                lucky,
            };
            prop_assert!(damage(&p) >= 1);
        }

        #[test]
        fn prop_luck_monotonic(a in -10i32..60, b in -10i32..60) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(luck_chance(lo) <= luck_chance(hi));
            prop_assert!(luck_chance(hi) <= LUCK_BASE_CHANCE + MAX_LUCK as f64 * LUCK_PER_POINT + 1e-12);
            prop_assert!(luck_chance(lo) >= LUCK_BASE_CHANCE);
        }
    }
}
