//! Magic channels (slots C and D)
//!
//! A completed magic slot picks one learned spell, weighted by its level, and
//! resolves it immediately. Spells with a lasting effect leave a status on the
//! caster or the targets; re-casting replaces the previous instance.

use serde::{Deserialize, Serialize};

use super::combat::{self, ConditionalMultipliers, LuckResult};
use super::rng::RandomSource;
use super::state::{EnemyState, PlayerState};
use super::status::{StatusEffect, StatusKind};
use crate::consts::MAX_MAGIC_LEVEL;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MagicKind {
    Thunder,
    Ice,
    Fire,
    Heal,
    Buffer,
    Hint,
}

impl MagicKind {
    pub const ALL: [MagicKind; 6] = [
        MagicKind::Thunder,
        MagicKind::Ice,
        MagicKind::Fire,
        MagicKind::Heal,
        MagicKind::Buffer,
        MagicKind::Hint,
    ];

    /// Status left behind by the spell, if any
    pub fn status(self) -> Option<StatusKind> {
        match self {
            MagicKind::Thunder | MagicKind::Heal => None,
            MagicKind::Ice => Some(StatusKind::Ice),
            MagicKind::Fire => Some(StatusKind::Fire),
            MagicKind::Buffer => Some(StatusKind::Buffer),
            MagicKind::Hint => Some(StatusKind::Hint),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            MagicKind::Thunder => "Thunder",
            MagicKind::Ice => "Ice",
            MagicKind::Fire => "Fire",
            MagicKind::Heal => "Heal",
            MagicKind::Buffer => "Buffer",
            MagicKind::Hint => "Hint",
        }
    }
}

pub const THUNDER_PER_LEVEL: f32 = 18.0;
pub const FIRE_BLAST_PER_LEVEL: f32 = 12.0;
pub const FIRE_BLAST_RADIUS: f32 = 160.0;
/// Aura pulses while the fire status is on the caster
pub const FIRE_AURA_INTERVAL: f32 = 0.5;
pub const FIRE_AURA_RADIUS: f32 = 110.0;
pub const FIRE_AURA_PER_LEVEL: f32 = 4.0;
pub const HEAL_BASE_FRACTION: f32 = 0.2;
pub const HEAL_PER_LEVEL: f32 = 0.15;
/// Seconds of duration per point of the time stat
pub const TIME_STAT_RATE: f32 = 0.5;

/// Level-scaled damage constant for damaging spells
pub fn spell_base(kind: MagicKind, level: u8) -> f32 {
    let level = level.min(MAX_MAGIC_LEVEL) as f32;
    match kind {
        MagicKind::Thunder => THUNDER_PER_LEVEL * level,
        MagicKind::Fire => FIRE_BLAST_PER_LEVEL * level,
        _ => 0.0,
    }
}

pub fn base_duration(kind: MagicKind, level: u8) -> f32 {
    let level = level.min(MAX_MAGIC_LEVEL) as f32;
    match kind {
        MagicKind::Ice => 2.0 + level,
        MagicKind::Fire => 4.0 + 2.0 * level,
        MagicKind::Buffer => 6.0 + 3.0 * level,
        MagicKind::Hint => 5.0 + 2.5 * level,
        MagicKind::Thunder | MagicKind::Heal => 0.0,
    }
}

/// (base + time bonus) scaled by the conditional multiplier, doubled on luck
pub fn effect_duration(
    kind: MagicKind,
    level: u8,
    time_stat: i32,
    cond: &ConditionalMultipliers,
    luck: &LuckResult,
) -> f32 {
    let time_bonus = time_stat.max(0) as f32 * TIME_STAT_RATE * cond.duration;
    let duration = base_duration(kind, level) + time_bonus;
    if luck.double_time { duration * 2.0 } else { duration }
}

pub fn heal_fraction(level: u8) -> f32 {
    let level = level.clamp(1, MAX_MAGIC_LEVEL);
    HEAL_BASE_FRACTION + HEAL_PER_LEVEL * (level - 1) as f32
}

/// Whether a spell is worth drawing right now
pub fn is_available(kind: MagicKind, player: &PlayerState) -> bool {
    if player.magics.level(kind) == 0 {
        return false;
    }
    match kind {
        MagicKind::Buffer | MagicKind::Hint => !kind.status().is_some_and(|s| player.statuses.has(s)),
        MagicKind::Heal => player.stats.hp < player.stats.max_hp,
        _ => true,
    }
}

pub fn any_castable(player: &PlayerState) -> bool {
    MagicKind::ALL.iter().any(|k| is_available(*k, player))
}

/// Level-weighted draw among available spells
pub fn pick_magic(player: &PlayerState, rng: &mut dyn RandomSource) -> Option<MagicKind> {
    let candidates: Vec<(MagicKind, u32)> = MagicKind::ALL
        .iter()
        .filter(|k| is_available(**k, player))
        .map(|k| (*k, player.magics.level(*k) as u32))
        .collect();
    let total: u32 = candidates.iter().map(|(_, w)| w).sum();
    if total == 0 {
        return None;
    }

    let mut roll = rng.next_f64() * total as f64;
    for (kind, weight) in &candidates {
        if roll < *weight as f64 {
            return Some(*kind);
        }
        roll -= *weight as f64;
    }
    candidates.last().map(|(k, _)| *k)
}

/// What a cast did
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CastReport {
    pub damage_dealt: i32,
    pub healed: i32,
    /// Enemy ids damaged or afflicted
    pub affected: Vec<u32>,
    pub duration: f32,
}

fn spell_hit(
    player: &PlayerState,
    enemy: &mut EnemyState,
    base: f32,
    cond: &ConditionalMultipliers,
    lucky: bool,
) -> i32 {
    let params = combat::player_hit_params(player, enemy, base * cond.attack, lucky);
    enemy.apply_damage(combat::damage(&params))
}

/// Resolve one spell against the current entities
pub fn cast_magic(
    kind: MagicKind,
    level: u8,
    player: &mut PlayerState,
    enemies: &mut [EnemyState],
    now: f32,
    cond: &ConditionalMultipliers,
    luck: &LuckResult,
) -> CastReport {
    let level = level.clamp(1, MAX_MAGIC_LEVEL);
    let duration = effect_duration(kind, level, player.stats.time, cond, luck);
    let mut report = CastReport {
        duration,
        ..Default::default()
    };

    match kind {
        MagicKind::Thunder => {
            let base = combat::magic_base_damage(spell_base(kind, level), player.stats.c_atk);
            for enemy in enemies.iter_mut().filter(|e| e.is_alive()) {
                report.damage_dealt += spell_hit(player, enemy, base, cond, luck.double_damage);
                report.affected.push(enemy.id);
            }
        }
        MagicKind::Ice => {
            for enemy in enemies.iter_mut().filter(|e| e.is_alive()) {
                enemy.statuses.apply(StatusEffect::timed(StatusKind::Ice, duration, now, level));
                enemy.statuses.apply(StatusEffect::timed(StatusKind::Debuffer, duration, now, level));
                report.affected.push(enemy.id);
            }
        }
        MagicKind::Fire => {
            let base = combat::magic_base_damage(spell_base(kind, level), player.stats.c_atk);
            for enemy in enemies.iter_mut().filter(|e| e.is_alive()) {
                if enemy.pos.distance(player.pos) <= FIRE_BLAST_RADIUS + enemy.radius() {
                    report.damage_dealt += spell_hit(player, enemy, base, cond, luck.double_damage);
                    report.affected.push(enemy.id);
                }
            }
            player.statuses.apply(StatusEffect::timed(StatusKind::Fire, duration, now, level));
        }
        MagicKind::Heal => {
            let amount = (player.stats.max_hp as f32 * heal_fraction(level)).ceil() as i32;
            let before = player.stats.hp;
            player.stats.hp = (player.stats.hp + amount).min(player.stats.max_hp);
            report.healed = player.stats.hp - before;
        }
        MagicKind::Buffer => {
            player.statuses.apply(StatusEffect::timed(StatusKind::Buffer, duration, now, level));
        }
        MagicKind::Hint => {
            player.statuses.apply(StatusEffect::timed(StatusKind::Hint, duration, now, level));
        }
    }

    report
}

/// One fire-aura pulse. Returns (enemy id, damage) for every enemy burned.
pub fn fire_aura_pulse(
    player: &PlayerState,
    enemies: &mut [EnemyState],
    cond: &ConditionalMultipliers,
) -> Vec<(u32, i32)> {
    let Some(level) = player.statuses.level(StatusKind::Fire) else {
        return Vec::new();
    };
    let base = combat::magic_base_damage(FIRE_AURA_PER_LEVEL * level as f32, player.stats.c_atk);
    enemies
        .iter_mut()
        .filter(|e| e.is_alive() && e.pos.distance(player.pos) <= FIRE_AURA_RADIUS + e.radius())
        .map(|e| (e.id, spell_hit(player, e, base, cond, false)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::RunSettings;
    use crate::sim::rng::SequenceRng;
    use crate::sim::spawn::EnemyKind;
    use crate::sim::state::EnemyStats;
    use crate::sim::status::StatusTracker;
    use glam::Vec2;

    fn player() -> PlayerState {
        PlayerState::new(&RunSettings::default())
    }

    fn enemy(id: u32, pos: Vec2) -> EnemyState {
        EnemyState {
            id,
            pos,
            kind: EnemyKind::Goblin,
            stats: EnemyStats { atk: 5, def: 0, hp: 500, max_hp: 500, speed: 50.0 },
            statuses: StatusTracker::default(),
            is_boss: false,
            knockback: Vec2::ZERO,
        }
    }

    #[test]
    fn test_duration_formula() {
        let cond = ConditionalMultipliers::default();
        let none = LuckResult::default();
        // Buffer level 2, time 4: 6 + 6 + 4 * 0.5
        assert_eq!(effect_duration(MagicKind::Buffer, 2, 4, &cond, &none), 14.0);
        let lucky = LuckResult { double_time: true, ..Default::default() };
        assert_eq!(effect_duration(MagicKind::Buffer, 2, 4, &cond, &lucky), 28.0);
        let stretched = ConditionalMultipliers { duration: 2.0, ..Default::default() };
        assert_eq!(effect_duration(MagicKind::Ice, 1, 2, &stretched, &none), 5.0);
    }

    #[test]
    fn test_thunder_hits_every_live_enemy() {
        let mut p = player();
        p.magics.thunder = 1;
        let mut enemies = vec![enemy(1, Vec2::ZERO), enemy(2, Vec2::new(1500.0, 1100.0))];
        enemies[1].stats.hp = 0;
        let report = cast_magic(
            MagicKind::Thunder,
            1,
            &mut p,
            &mut enemies,
            0.0,
            &ConditionalMultipliers::default(),
            &LuckResult::default(),
        );
        assert_eq!(report.affected, vec![1]);
        assert_eq!(report.damage_dealt, 18);
        assert_eq!(enemies[0].stats.hp, 482);
    }

    #[test]
    fn test_ice_freezes_and_debuffs() {
        let mut p = player();
        let mut enemies = vec![enemy(1, Vec2::ZERO)];
        cast_magic(
            MagicKind::Ice,
            2,
            &mut p,
            &mut enemies,
            3.0,
            &ConditionalMultipliers::default(),
            &LuckResult::default(),
        );
        assert!(enemies[0].statuses.has(StatusKind::Ice));
        assert_eq!(enemies[0].statuses.level(StatusKind::Debuffer), Some(2));
        let ice = enemies[0].statuses.get(StatusKind::Ice).and_then(|e| e.remaining(4.0));
        assert_eq!(ice, Some(3.0));
    }

    #[test]
    fn test_fire_blast_radius_and_aura() {
        let mut p = player();
        let near = p.pos + Vec2::new(50.0, 0.0);
        let far = p.pos + Vec2::new(600.0, 0.0);
        let mut enemies = vec![enemy(1, near), enemy(2, far)];
        let cond = ConditionalMultipliers::default();
        let report = cast_magic(MagicKind::Fire, 1, &mut p, &mut enemies, 0.0, &cond, &LuckResult::default());
        assert_eq!(report.affected, vec![1]);
        assert!(p.statuses.has(StatusKind::Fire));

        let burned = fire_aura_pulse(&p, &mut enemies, &cond);
        assert_eq!(burned.len(), 1);
        assert_eq!(burned[0], (1, 4));
    }

    #[test]
    fn test_heal_caps_at_max() {
        let mut p = player();
        p.stats.hp = 90;
        let report = cast_magic(
            MagicKind::Heal,
            1,
            &mut p,
            &mut [],
            0.0,
            &ConditionalMultipliers::default(),
            &LuckResult::default(),
        );
        assert_eq!(report.healed, 10);
        assert_eq!(p.stats.hp, 100);
    }

    #[test]
    fn test_recast_replaces_buffer() {
        let mut p = player();
        let cond = ConditionalMultipliers::default();
        let luck = LuckResult::default();
        cast_magic(MagicKind::Buffer, 1, &mut p, &mut [], 0.0, &cond, &luck);
        cast_magic(MagicKind::Buffer, 3, &mut p, &mut [], 1.0, &cond, &luck);
        assert_eq!(p.statuses.len(), 1);
        assert_eq!(p.statuses.level(StatusKind::Buffer), Some(3));
    }

    #[test]
    fn test_availability_skips_wasted_picks() {
        let mut p = player();
        p.magics.heal = 3;
        p.magics.buffer = 1;
        // Full hp: heal would do nothing
        assert!(!is_available(MagicKind::Heal, &p));
        let mut rng = SequenceRng::new(vec![0.99]);
        assert_eq!(pick_magic(&p, &mut rng), Some(MagicKind::Buffer));

        p.statuses.apply(StatusEffect::timed(StatusKind::Buffer, 5.0, 0.0, 1));
        assert_eq!(pick_magic(&p, &mut rng), None);

        p.stats.hp = 50;
        assert_eq!(pick_magic(&p, &mut rng), Some(MagicKind::Heal));
    }

    #[test]
    fn test_pick_weighted_by_level() {
        let mut p = player();
        p.magics.thunder = 1;
        p.magics.ice = 3;
        // Total weight 4: [0, 1) thunder, [1, 4) ice
        let mut rng = SequenceRng::new(vec![0.2, 0.3]);
        assert_eq!(pick_magic(&p, &mut rng), Some(MagicKind::Thunder));
        assert_eq!(pick_magic(&p, &mut rng), Some(MagicKind::Ice));
    }
}
