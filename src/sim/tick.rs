//! Fixed timestep simulation tick
//!
//! Core game loop that advances simulation deterministically.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::autopilot::autopilot_input;
use super::bonus::{self, LevelUpOffer};
use super::bullet::{self, EnemyProjectile, Projectile};
use super::chord::{self, Channel};
use super::collision::{self, MeleeArc};
use super::combat::{self, ConditionalMultipliers, LuckResult};
use super::leveling;
use super::rng::RandomSource;
use super::magic;
use super::schedule::ScheduledAction;
use super::spawn;
use super::state::{Coin, Direction8, GameEvent, GamePhase, GameState, Stats};
use super::status::StatusKind;
use super::wave::WaveOutcome;
use crate::consts::*;
use crate::summary::RunSummary;

/// Completed slots take a new chord after this delay
pub const SLOT_RESET_DELAY: f32 = 0.25;
pub const RANGED_COOLDOWN: f32 = 0.6;
pub const MELEE_COOLDOWN: f32 = 0.6;
pub const MAGIC_BASE_COOLDOWN: f32 = 12.0;
/// Seconds shaved off the magic cooldown per reload point
pub const MAGIC_RELOAD_STEP: f32 = 0.5;
pub const MAGIC_MIN_COOLDOWN: f32 = 2.0;

pub const MELEE_RANGE: f32 = 80.0;
pub const MELEE_RANGE_BONUS: f32 = 40.0;
/// Total melee sweep (120°)
pub const MELEE_SWEEP: f32 = std::f32::consts::TAU / 3.0;
/// Gap between multi-hit follow-up strikes
pub const MULTI_HIT_INTERVAL: f32 = 0.15;

/// Shots per second for a ranged enemy in range
pub const ENEMY_FIRE_RATE: f64 = 0.3;
pub const ENEMY_FIRE_RANGE: f32 = 450.0;
/// Bonus coins land this far from the regular one
pub const BONUS_COIN_OFFSET: f32 = 12.0;

/// Input commands for a single tick (deterministic)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TickInput {
    /// Desired movement direction (any length, zero to stand still)
    pub move_dir: Vec2,
    /// Absolute note numbers played since the previous tick
    pub notes: Vec<i32>,
    /// Pause toggle
    pub pause: bool,
    /// Pick a level-up option directly
    pub select_bonus: Option<usize>,
    /// Autopilot plays the game
    pub autopilot: bool,
}

/// Pure reducer: the state one tick later, leaving `state` untouched
pub fn advance(state: &GameState, input: &TickInput, dt: f32) -> GameState {
    let mut next = state.clone();
    tick(&mut next, input, dt);
    next
}

/// Advance the game state by one fixed timestep
pub fn tick(state: &mut GameState, input: &TickInput, dt: f32) {
    state.events.clear();

    // Handle pause toggle
    if input.pause {
        match state.phase {
            GamePhase::Playing => {
                state.phase = GamePhase::Paused;
                return;
            }
            GamePhase::Paused => state.phase = GamePhase::Playing,
            _ => {}
        }
    }

    let input = if input.autopilot {
        autopilot_input(state)
    } else {
        input.clone()
    };

    match state.phase {
        GamePhase::Paused | GamePhase::GameOver => {}
        GamePhase::LevelUp => update_level_up(state, &input),
        GamePhase::Playing => update_playing(state, &input, dt),
    }
}

fn update_playing(state: &mut GameState, input: &TickInput, dt: f32) {
    state.time_ticks += 1;
    state.elapsed += dt;

    let cond = refresh_conditions(state);

    run_scheduled(state, &cond);

    move_player(state, input, &cond, dt);
    move_enemies(state, dt);
    advance_projectiles(state, dt);

    resolve_projectile_hits(state);
    resolve_player_hits(state, &cond);
    if !state.player.is_alive() {
        end_run(state, false);
        return;
    }

    update_fire_aura(state, &cond, dt);
    enemy_ranged_attacks(state, dt);
    resolve_defeats(state);

    // Expire status effects
    let now = state.elapsed;
    for kind in state.player.statuses.expire(now) {
        state.events.push(GameEvent::StatusExpired { kind });
    }
    for enemy in &mut state.enemies {
        enemy.statuses.expire(now);
    }

    collect_coins(state);
    check_level_up(state);

    update_waves(state, dt);
    if state.phase == GamePhase::GameOver {
        return;
    }

    update_slots(state, input, &cond, dt);
    resolve_defeats(state);

    state.normalize_order();
}

/// Recompute last-stand/peak-condition and mirror them as status markers
fn refresh_conditions(state: &mut GameState) -> ConditionalMultipliers {
    let player = &mut state.player;
    let cond = combat::conditional_multipliers(
        player.stats.hp,
        player.stats.max_hp,
        &player.skills,
        state.settings.debug_conditions_always_on,
    );
    player.statuses.set_marker(StatusKind::LastStand, cond.last_stand, state.elapsed);
    player.statuses.set_marker(StatusKind::PeakCondition, cond.peak_condition, state.elapsed);
    cond
}

fn run_scheduled(state: &mut GameState, cond: &ConditionalMultipliers) {
    while let Some(action) = state.schedule.pop_due(state.elapsed) {
        match action {
            ScheduledAction::MeleeStrike { step, lucky } => {
                log::debug!("Multi-hit step {step}");
                melee_strike(state, lucky, cond);
            }
            ScheduledAction::ResetSlot(channel) => {
                let slot = &mut state.slots[channel.index()];
                slot.rearm(&state.chord_pool, &mut state.rng);
                log::debug!(
                    "Slot {channel:?} rearmed with {:?}",
                    slot.chord.as_ref().map(|c| c.id.as_str())
                );
            }
        }
    }
}

fn move_player(state: &mut GameState, input: &TickInput, cond: &ConditionalMultipliers, dt: f32) {
    let player = &mut state.player;
    let dir = input.move_dir.normalize_or_zero();
    if let Some(facing) = Direction8::from_vec(dir) {
        player.facing = facing;
    }
    let speed = (player.stats.speed + cond.speed_bonus).max(0) as f32 * SPEED_UNIT;
    player.pos = collision::clamp_to_map(player.pos + dir * speed * dt, PLAYER_RADIUS);
}

fn move_enemies(state: &mut GameState, dt: f32) {
    let target = state.player.pos;
    for enemy in &mut state.enemies {
        // Frozen enemies stay put but still get shoved
        let touching = enemy.pos.distance(target) <= enemy.radius() + PLAYER_RADIUS;
        if !enemy.statuses.has(StatusKind::Ice) && !touching {
            let dir = crate::direction_between(enemy.pos, target);
            enemy.pos += dir * enemy.stats.speed * dt;
        }
        enemy.pos += enemy.knockback * dt;
        enemy.knockback = combat::decay_knockback(enemy.knockback);
    }
    state
        .enemies
        .retain(|e| !collision::outside_map(e.pos, DESPAWN_MARGIN));
}

fn advance_projectiles(state: &mut GameState, dt: f32) {
    state
        .projectiles
        .retain_mut(|p| p.advance(dt) && !collision::outside_map(p.pos, 0.0));
    state
        .enemy_projectiles
        .retain_mut(|p| p.advance(dt) && !collision::outside_map(p.pos, 0.0));
}

fn resolve_projectile_hits(state: &mut GameState) {
    let player = &state.player;
    let enemies = &mut state.enemies;

    for proj in state.projectiles.iter_mut() {
        for enemy in enemies.iter_mut() {
            if !enemy.is_alive() || !proj.can_hit(enemy.id) {
                continue;
            }
            if !collision::circles_overlap(proj.pos, bullet::PROJECTILE_RADIUS, enemy.pos, enemy.radius()) {
                continue;
            }
            let params = combat::player_hit_params(player, enemy, proj.base_damage, proj.lucky);
            enemy.apply_damage(combat::damage(&params));
            // Push along the bullet's path
            enemy.knockback +=
                combat::knockback_impulse(proj.pos - proj.velocity, enemy.pos, proj.knockback_level);
            proj.hit.insert(enemy.id);
            if !proj.penetrating {
                break;
            }
        }
    }

    state.projectiles.retain(|p| p.penetrating || p.hit.is_empty());
}

fn resolve_player_hits(state: &mut GameState, cond: &ConditionalMultipliers) {
    let player_pos = state.player.pos;

    // Contact: the strongest touching enemy lands the hit
    let contact = state
        .enemies
        .iter()
        .filter(|e| e.is_alive())
        .filter(|e| collision::circles_overlap(e.pos, e.radius(), player_pos, PLAYER_RADIUS))
        .map(|e| e.stats.atk)
        .max();
    if let Some(atk) = contact {
        hit_player(state, atk, cond);
    }

    let mut shot: Option<i32> = None;
    state.enemy_projectiles.retain(|p| {
        let landed = collision::circles_overlap(
            p.pos,
            bullet::ENEMY_PROJECTILE_RADIUS,
            player_pos,
            PLAYER_RADIUS,
        );
        if landed {
            shot = Some(shot.map_or(p.atk, |a| a.max(p.atk)));
        }
        !landed
    });
    if let Some(atk) = shot {
        hit_player(state, atk, cond);
    }
}

fn hit_player(state: &mut GameState, atk: i32, cond: &ConditionalMultipliers) {
    if state.elapsed < state.player.invulnerable_until {
        return;
    }
    state.player.invulnerable_until = state.elapsed + PLAYER_INVULN_SECS;

    let luck = combat::check_luck(state.player.stats.luck, &mut state.rng);
    if luck.no_damage_taken {
        state.events.push(GameEvent::HitNegated);
        return;
    }

    let def = cond.effective_def(state.player.stats.def);
    let dmg = combat::damage(&combat::enemy_hit_params(atk, def));
    state.player.stats.hp = (state.player.stats.hp - dmg).max(0);
    state.events.push(GameEvent::PlayerHit { damage: dmg });
}

fn update_fire_aura(state: &mut GameState, cond: &ConditionalMultipliers, dt: f32) {
    if !state.player.statuses.has(StatusKind::Fire) {
        state.fire_aura_timer = 0.0;
        return;
    }
    state.fire_aura_timer += dt;
    while state.fire_aura_timer >= magic::FIRE_AURA_INTERVAL {
        state.fire_aura_timer -= magic::FIRE_AURA_INTERVAL;
        magic::fire_aura_pulse(&state.player, &mut state.enemies, cond);
    }
}

fn enemy_ranged_attacks(state: &mut GameState, dt: f32) {
    let player_pos = state.player.pos;
    let p = ENEMY_FIRE_RATE * dt as f64;

    let mut shots = Vec::new();
    for enemy in &state.enemies {
        if !enemy.is_alive() || !enemy.kind.base().ranged || enemy.statuses.has(StatusKind::Ice) {
            continue;
        }
        if enemy.pos.distance(player_pos) > ENEMY_FIRE_RANGE {
            continue;
        }
        if state.rng.chance(p) {
            shots.push((enemy.pos, enemy.stats.atk));
        }
    }

    for (from, atk) in shots {
        let id = state.next_entity_id();
        state
            .enemy_projectiles
            .push(EnemyProjectile::aimed(id, from, player_pos, atk));
    }
}

/// Remove dead enemies, crediting each exactly once
fn resolve_defeats(state: &mut GameState) {
    let mut defeated = Vec::new();
    state.enemies.retain(|e| {
        if e.is_alive() {
            true
        } else {
            defeated.push((e.id, e.kind, e.is_boss, e.pos));
            false
        }
    });

    let drop_rate = state.settings.difficulty.item_drop_rate as f64;
    for (id, kind, boss, pos) in defeated {
        state.enemies_defeated += 1;
        state.events.push(GameEvent::EnemyDefeated { id, kind, boss });
        if state.wave.register_kill() {
            log::info!("Wave {} quota met", state.wave.current_wave);
            state.events.push(GameEvent::WaveCompleted {
                wave: state.wave.current_wave,
            });
        }

        let exp = kind.base().exp;
        let lifetime = if boss { None } else { Some(COIN_LIFETIME_SECS) };
        let coin_id = state.next_entity_id();
        state.coins.push(Coin {
            id: coin_id,
            pos,
            exp,
            created_at: state.elapsed,
            lifetime,
        });

        if state.rng.chance(drop_rate) {
            let bonus_id = state.next_entity_id();
            state.coins.push(Coin {
                id: bonus_id,
                pos: pos + Vec2::new(BONUS_COIN_OFFSET, 0.0),
                exp: exp * 2,
                created_at: state.elapsed,
                lifetime,
            });
        }
    }
}

fn collect_coins(state: &mut GameState) {
    let now = state.elapsed;
    let player_pos = state.player.pos;

    state.coins.retain(|c| !c.is_expired(now));
    let mut collected = Vec::new();
    state.coins.retain(|c| {
        let picked = c.pos.distance(player_pos) <= COIN_PICKUP_RADIUS;
        if picked {
            collected.push(c.exp);
        }
        !picked
    });

    for raw in collected {
        let amount = leveling::exp_gain(
            raw,
            state.player.skills.exp_bonus,
            state.settings.difficulty.exp_multiplier,
        );
        state.events.push(GameEvent::CoinCollected { exp: amount });
        let gained = state.player.progress.add_exp(amount);
        if gained > 0 {
            let level = state.player.progress.level;
            log::info!("Level up! Now level {level}");
            state.pending_level_ups += gained;
            state.events.push(GameEvent::LevelUp { level });
        }
    }
}

/// Apply pending level-ups directly, or open an offer and freeze time
fn check_level_up(state: &mut GameState) {
    if state.pending_level_ups == 0 || state.level_up_offer.is_some() {
        return;
    }

    if state.settings.auto_select(&state.player.skills) {
        while state.pending_level_ups > 0 {
            state.pending_level_ups -= 1;
            let picked = bonus::auto_select_bonus(
                &state.catalog,
                &mut state.player,
                &state.settings.character,
                &mut state.rng,
            );
            if let Some(kind) = picked {
                state.events.push(GameEvent::BonusApplied { kind });
            }
        }
        return;
    }

    while state.pending_level_ups > 0 {
        let options = bonus::generate_level_up_options(
            &state.catalog,
            &state.player,
            &state.settings.character,
            &state.chord_pool,
            &mut state.rng,
        );
        if options.is_empty() {
            log::warn!("No level-up options available, skipping");
            state.pending_level_ups -= 1;
            continue;
        }
        state.level_up_offer = Some(LevelUpOffer::new(options));
        state.phase = GamePhase::LevelUp;
        return;
    }
}

/// Level-up phase: simulation time stands still until an option is chosen
fn update_level_up(state: &mut GameState, input: &TickInput) {
    let Some(offer) = state.level_up_offer.as_mut() else {
        state.phase = GamePhase::Playing;
        return;
    };

    let mut chosen = input.select_bonus.filter(|i| *i < offer.options.len());
    if chosen.is_none() {
        for note in &input.notes {
            if let Some(i) = offer.on_note(chord::pitch_class(*note)) {
                chosen = Some(i);
                break;
            }
        }
    }
    let Some(index) = chosen else {
        return;
    };

    let kind = offer.options[index].kind;
    state.level_up_offer = None;
    bonus::apply_bonus(kind, &mut state.player);
    state.events.push(GameEvent::BonusApplied { kind });
    state.pending_level_ups = state.pending_level_ups.saturating_sub(1);
    state.phase = GamePhase::Playing;

    check_level_up(state);
}

fn update_waves(state: &mut GameState, dt: f32) {
    match state.wave.update(state.elapsed) {
        WaveOutcome::Ongoing => {}
        WaveOutcome::Advanced(next) => {
            let cleared = next - 1;
            log::info!("Wave {cleared} cleared, starting wave {next}");
            state.events.push(GameEvent::WaveAdvanced { wave: next });
            if state
                .settings
                .difficulty
                .target_wave
                .is_some_and(|target| cleared >= target)
            {
                end_run(state, true);
                return;
            }
        }
        WaveOutcome::Failed => {
            log::info!(
                "Wave {} failed: {} of {} kills",
                state.wave.current_wave,
                state.wave.wave_kills,
                state.wave.wave_quota
            );
            end_run(state, false);
            return;
        }
    }

    spawn::update_spawning(state, dt);
}

/// Cooldowns, chord redraws, then note input
fn update_slots(state: &mut GameState, input: &TickInput, cond: &ConditionalMultipliers, dt: f32) {
    // Magic slots stop taking notes while every learned spell would be wasted
    let magic_enabled = magic::any_castable(&state.player);
    for slot in state.slots.iter_mut() {
        if slot.channel.is_magic() {
            slot.enabled = magic_enabled;
        }
        slot.cooldown = (slot.cooldown - dt).max(0.0);
        // Unarmed slots (empty pool entry or just enabled) retry every tick
        if slot.enabled && slot.chord.is_none() && !slot.completed {
            slot.rearm(&state.chord_pool, &mut state.rng);
        }
    }

    let mut completed = Vec::new();
    for note in &input.notes {
        completed.extend(chord::process_note(&mut state.slots, chord::pitch_class(*note)));
    }
    for channel in completed {
        complete_slot(state, channel, cond);
    }
}

/// Cooldown applied when a slot completes
pub fn slot_cooldown(channel: Channel, stats: &Stats, cond: &ConditionalMultipliers, luck: &LuckResult) -> f32 {
    let base = match channel {
        Channel::A => RANGED_COOLDOWN,
        Channel::B => MELEE_COOLDOWN,
        Channel::C | Channel::D => (MAGIC_BASE_COOLDOWN
            - MAGIC_RELOAD_STEP * stats.reload_magic.max(0) as f32)
            .max(MAGIC_MIN_COOLDOWN),
    };
    let cooldown = base * cond.cooldown;
    if luck.reload_reduction { cooldown * 0.5 } else { cooldown }
}

fn complete_slot(state: &mut GameState, channel: Channel, cond: &ConditionalMultipliers) {
    // An earlier cast this tick used up the last available spell
    if channel.is_magic() && !magic::any_castable(&state.player) {
        let slot = state.slot_mut(channel);
        slot.completed = false;
        slot.correct.clear();
        return;
    }

    let luck = combat::check_luck(state.player.stats.luck, &mut state.rng);
    log::debug!("Slot {channel:?} completed (lucky: {})", luck.is_lucky);
    state.events.push(GameEvent::SlotCompleted(channel));

    match channel {
        Channel::A => fire_volley(state, &luck, cond),
        Channel::B => {
            melee_strike(state, luck.double_damage, cond);
            for step in 1..=state.player.skills.multi_hit {
                state.schedule.push(
                    state.elapsed + MULTI_HIT_INTERVAL * step as f32,
                    ScheduledAction::MeleeStrike {
                        step,
                        lucky: luck.double_damage,
                    },
                );
            }
        }
        Channel::C | Channel::D => cast_from_slot(state, &luck, cond),
    }

    let cooldown = slot_cooldown(channel, &state.player.stats, cond, &luck);
    state.slot_mut(channel).cooldown = cooldown;
    state
        .schedule
        .push(state.elapsed + SLOT_RESET_DELAY, ScheduledAction::ResetSlot(channel));
}

fn fire_volley(state: &mut GameState, luck: &LuckResult, cond: &ConditionalMultipliers) {
    let player = &state.player;
    let angles = bullet::clockwise_bullet_angles(player.stats.a_bullet_count, player.facing.angle());
    let base = combat::ranged_base_damage(player.stats.a_atk) * cond.attack;
    let range = if player.skills.range_bonus {
        bullet::PROJECTILE_RANGE * bullet::RANGE_BONUS_MULT
    } else {
        bullet::PROJECTILE_RANGE
    };
    let origin = player.pos;
    let penetrating = player.skills.penetration;
    let knockback_level = player.skills.knockback_bonus;

    for angle in angles {
        let id = state.next_entity_id();
        let mut proj = Projectile::new(id, origin, angle, base, range);
        proj.lucky = luck.double_damage;
        proj.penetrating = penetrating;
        proj.knockback_level = knockback_level;
        state.projectiles.push(proj);
    }
}

/// One sweep of the melee arc; reads positions as they are right now
fn melee_strike(state: &mut GameState, lucky: bool, cond: &ConditionalMultipliers) {
    let player = &state.player;
    let range = if player.skills.range_bonus {
        MELEE_RANGE + MELEE_RANGE_BONUS
    } else {
        MELEE_RANGE
    };
    let arc = MeleeArc::new(player.pos, player.facing.angle(), MELEE_SWEEP, range);
    let base = combat::melee_base_damage(player.stats.b_atk) * cond.attack;

    for enemy in state.enemies.iter_mut().filter(|e| e.is_alive()) {
        if !arc.hits_circle(enemy.pos, enemy.radius()) {
            continue;
        }
        let params = combat::player_hit_params(player, enemy, base, lucky);
        enemy.apply_damage(combat::damage(&params));
        enemy.knockback += combat::knockback_impulse(arc.origin, enemy.pos, player.skills.knockback_bonus);
    }

    if player.skills.deflect {
        state
            .enemy_projectiles
            .retain(|p| !arc.hits_circle(p.pos, bullet::ENEMY_PROJECTILE_RADIUS));
    }
}

fn cast_from_slot(state: &mut GameState, luck: &LuckResult, cond: &ConditionalMultipliers) {
    let Some(kind) = magic::pick_magic(&state.player, &mut state.rng) else {
        log::debug!("No spell available to cast");
        return;
    };
    let level = state.player.magics.level(kind);
    let report = magic::cast_magic(
        kind,
        level,
        &mut state.player,
        &mut state.enemies,
        state.elapsed,
        cond,
        luck,
    );
    log::info!(
        "Cast {} lv{} ({} damage, {} healed, {:.1}s)",
        kind.name(),
        level,
        report.damage_dealt,
        report.healed,
        report.duration
    );
    state.events.push(GameEvent::MagicCast { kind, level });
}

/// Freeze the run and build its summary. Pending scheduled effects are dropped.
fn end_run(state: &mut GameState, cleared: bool) {
    if state.phase == GamePhase::GameOver {
        return;
    }
    state.phase = GamePhase::GameOver;
    state.schedule.clear();
    state.level_up_offer = None;

    let summary = RunSummary::from_state(state, cleared);
    log::info!(
        "Run over after {:.1}s: level {}, wave {}, {} defeated, cleared: {}",
        summary.survival_time,
        summary.final_level,
        summary.final_wave,
        summary.enemies_defeated,
        cleared
    );
    state.summary = Some(summary);
    state.events.push(GameEvent::GameOver { cleared });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::RunSettings;
    use crate::sim::chord::BasicChordResolver;
    use crate::sim::spawn::EnemyKind;
    use crate::sim::state::{EnemyState, EnemyStats};
    use crate::sim::status::{StatusEffect, StatusTracker};

    fn quiet_state() -> GameState {
        let mut settings = RunSettings::default();
        settings.difficulty.item_drop_rate = 0.0;
        let mut state = GameState::new(4242, settings, &BasicChordResolver);
        // No spawner interference
        state.spawn.timer = 1.0e6;
        state
    }

    fn chord_notes(state: &GameState, channel: Channel) -> Vec<i32> {
        state
            .slot(channel)
            .chord
            .as_ref()
            .map(|c| c.pitch_classes.iter().map(|pc| 60 + *pc as i32).collect())
            .unwrap_or_default()
    }

    fn place_enemy(state: &mut GameState, offset: Vec2, hp: i32) -> u32 {
        let id = state.next_entity_id();
        state.enemies.push(EnemyState {
            id,
            pos: state.player.pos + offset,
            kind: EnemyKind::Slime,
            stats: EnemyStats { atk: 10, def: 0, hp, max_hp: hp, speed: 0.0 },
            statuses: StatusTracker::default(),
            is_boss: false,
            knockback: Vec2::ZERO,
        });
        id
    }

    /// Tick while pinning every enemy in place so knockback can't carry it out of reach
    fn hold_enemies(state: &mut GameState, ticks: usize) {
        let anchors: Vec<Vec2> = state.enemies.iter().map(|e| e.pos).collect();
        for _ in 0..ticks {
            for (enemy, anchor) in state.enemies.iter_mut().zip(&anchors) {
                enemy.pos = *anchor;
                enemy.knockback = Vec2::ZERO;
            }
            idle(state, 1);
        }
    }

    fn play(state: &mut GameState, notes: Vec<i32>) {
        let input = TickInput { notes, ..Default::default() };
        tick(state, &input, SIM_DT);
    }

    fn idle(state: &mut GameState, ticks: usize) {
        for _ in 0..ticks {
            tick(state, &TickInput::default(), SIM_DT);
        }
    }

    #[test]
    fn test_tick_pause() {
        let mut state = quiet_state();
        idle(&mut state, 1);
        assert_eq!(state.phase, GamePhase::Playing);

        let pause = TickInput { pause: true, ..Default::default() };
        tick(&mut state, &pause, SIM_DT);
        assert_eq!(state.phase, GamePhase::Paused);

        let frozen = state.elapsed;
        idle(&mut state, 10);
        assert_eq!(state.elapsed, frozen);

        tick(&mut state, &pause, SIM_DT);
        assert_eq!(state.phase, GamePhase::Playing);
        assert!(state.elapsed > frozen);
    }

    #[test]
    fn test_determinism() {
        // Two states with same seed should produce identical results
        let mut state1 = GameState::new(99999, RunSettings::default(), &BasicChordResolver);
        let mut state2 = GameState::new(99999, RunSettings::default(), &BasicChordResolver);
        let input = TickInput { autopilot: true, ..Default::default() };

        for _ in 0..1200 {
            tick(&mut state1, &input, SIM_DT);
            tick(&mut state2, &input, SIM_DT);
        }

        assert_eq!(state1.time_ticks, state2.time_ticks);
        assert_eq!(state1.enemies.len(), state2.enemies.len());
        assert_eq!(state1.enemies_defeated, state2.enemies_defeated);
        assert_eq!(state1.player.stats, state2.player.stats);
        assert!((state1.player.pos - state2.player.pos).length() < 0.0001);
    }

    #[test]
    fn test_advance_leaves_input_state_untouched() {
        let state = quiet_state();
        let next = advance(&state, &TickInput::default(), SIM_DT);
        assert_eq!(state.time_ticks, 0);
        assert_eq!(next.time_ticks, 1);
    }

    #[test]
    fn test_ranged_slot_fires_volley() {
        let mut state = quiet_state();
        state.player.stats.a_bullet_count = 3;
        let notes = chord_notes(&state, Channel::A);
        assert!(!notes.is_empty());

        play(&mut state, notes);
        assert!(state.events.contains(&GameEvent::SlotCompleted(Channel::A)));
        assert_eq!(state.projectiles.len(), 3);
        assert!(state.slot(Channel::A).completed);
        assert!(state.slot(Channel::A).cooldown > 0.0);
    }

    #[test]
    fn test_slot_resets_with_new_chord() {
        let mut state = quiet_state();
        let before = state.slot(Channel::A).chord.as_ref().map(|c| c.id.clone());
        let notes = chord_notes(&state, Channel::A);
        play(&mut state, notes);

        idle(&mut state, 20);
        let slot = state.slot(Channel::A);
        assert!(!slot.completed);
        assert!(slot.correct.is_empty());
        let after = slot.chord.as_ref().map(|c| c.id.clone());
        assert!(after.is_some());
        assert_ne!(after, before);
    }

    #[test]
    fn test_cooldown_blocks_notes() {
        let mut state = quiet_state();
        let notes = chord_notes(&state, Channel::A);
        play(&mut state, notes);
        // Reset lands at 0.25s, cooldown runs to at least 0.3s
        idle(&mut state, 16);
        let notes = chord_notes(&state, Channel::A);
        play(&mut state, notes);
        assert!(!state.slot(Channel::A).completed);
    }

    #[test]
    fn test_melee_multi_hit_follow_ups() {
        let mut state = quiet_state();
        state.player.skills.multi_hit = 2;
        state.player.facing = Direction8::Right;
        let max_hp = 1000;
        place_enemy(&mut state, Vec2::new(60.0, 0.0), max_hp);

        let notes = chord_notes(&state, Channel::B);
        play(&mut state, notes);
        let first = max_hp - state.enemies[0].stats.hp;
        assert!(first == 20 || first == 40, "first strike dealt {first}");

        hold_enemies(&mut state, 21);
        let total = max_hp - state.enemies[0].stats.hp;
        assert_eq!(total, first * 3);
    }

    #[test]
    fn test_pause_freezes_follow_ups() {
        let mut state = quiet_state();
        state.player.skills.multi_hit = 1;
        place_enemy(&mut state, Vec2::new(60.0, 0.0), 1000);

        let notes = chord_notes(&state, Channel::B);
        play(&mut state, notes);
        let after_first = state.enemies[0].stats.hp;

        let pause = TickInput { pause: true, ..Default::default() };
        tick(&mut state, &pause, SIM_DT);
        hold_enemies(&mut state, 60);
        assert_eq!(state.enemies[0].stats.hp, after_first);

        tick(&mut state, &pause, SIM_DT);
        hold_enemies(&mut state, 12);
        assert!(state.enemies[0].stats.hp < after_first);
    }

    #[test]
    fn test_defeat_credited_once() {
        let mut state = quiet_state();
        state.player.skills.multi_hit = 3;
        place_enemy(&mut state, Vec2::new(60.0, 0.0), 1);

        let notes = chord_notes(&state, Channel::B);
        play(&mut state, notes);
        idle(&mut state, 40);

        assert!(state.enemies.is_empty());
        assert_eq!(state.enemies_defeated, 1);
        assert_eq!(state.wave.wave_kills, 1);
    }

    #[test]
    fn test_contact_hit_respects_invulnerability() {
        let mut state = quiet_state();
        place_enemy(&mut state, Vec2::new(10.0, 0.0), 1000);

        let mut hits = 0;
        for _ in 0..20 {
            idle(&mut state, 1);
            hits += state
                .events
                .iter()
                .filter(|e| matches!(e, GameEvent::PlayerHit { .. } | GameEvent::HitNegated))
                .count();
        }
        // 20 ticks is a third of a second, inside one invulnerability window
        assert_eq!(hits, 1);
        // Enemy atk counts double against zero defence
        assert!(state.player.stats.hp == 80 || state.player.stats.hp == 100);
    }

    #[test]
    fn test_death_ends_run_and_clears_schedule() {
        let mut state = quiet_state();
        state.player.skills.multi_hit = 3;
        let notes = chord_notes(&state, Channel::B);
        play(&mut state, notes);
        assert!(!state.schedule.is_empty());

        state.player.stats.hp = 1;
        state.player.invulnerable_until = 0.0;
        let id = place_enemy(&mut state, Vec2::ZERO, 1000);
        state.enemies.iter_mut().filter(|e| e.id == id).for_each(|e| e.stats.atk = 500);
        // A lucky dodge can delay the killing blow
        for _ in 0..600 {
            if state.phase == GamePhase::GameOver {
                break;
            }
            idle(&mut state, 1);
        }
        assert_eq!(state.phase, GamePhase::GameOver);
        assert!(state.schedule.is_empty());
        let summary = state.summary.as_ref().expect("summary built");
        assert!(!summary.cleared);

        let ticks = state.time_ticks;
        idle(&mut state, 5);
        assert_eq!(state.time_ticks, ticks);
    }

    #[test]
    fn test_level_up_offer_freezes_time() {
        let mut state = quiet_state();
        let coin_id = state.next_entity_id();
        state.coins.push(Coin {
            id: coin_id,
            pos: state.player.pos,
            exp: 10,
            created_at: 0.0,
            lifetime: None,
        });

        idle(&mut state, 1);
        assert_eq!(state.player.progress.level, 2);
        assert_eq!(state.phase, GamePhase::LevelUp);
        let offer = state.level_up_offer.clone().expect("offer open");
        assert_eq!(offer.options.len(), 3);

        let frozen = state.elapsed;
        idle(&mut state, 30);
        assert_eq!(state.elapsed, frozen);

        let pick = TickInput { select_bonus: Some(1), ..Default::default() };
        tick(&mut state, &pick, SIM_DT);
        assert_eq!(state.phase, GamePhase::Playing);
        assert_eq!(state.pending_level_ups, 0);
        assert!(state.events.contains(&GameEvent::BonusApplied { kind: offer.options[1].kind }));
    }

    #[test]
    fn test_level_up_by_chord() {
        let mut state = quiet_state();
        state.pending_level_ups = 1;
        idle(&mut state, 1);
        let offer = state.level_up_offer.clone().expect("offer open");

        let notes: Vec<i32> = offer.options[2].chord.pitch_classes.iter().map(|pc| 48 + *pc as i32).collect();
        play(&mut state, notes);
        assert_eq!(state.phase, GamePhase::Playing);
        assert!(state.events.contains(&GameEvent::BonusApplied { kind: offer.options[2].kind }));
    }

    #[test]
    fn test_auto_select_skips_offer() {
        let mut state = quiet_state();
        state.settings.character.auto_select = true;
        state.pending_level_ups = 2;
        idle(&mut state, 1);
        assert_eq!(state.phase, GamePhase::Playing);
        assert_eq!(state.pending_level_ups, 0);
        let applied = state.player.bonus_counts.iter().map(|(_, n)| *n).sum::<u32>();
        assert_eq!(applied, 2);
    }

    #[test]
    fn test_learning_magic_enables_slots() {
        let mut state = quiet_state();
        assert!(!state.slot(Channel::C).enabled);
        state.player.magics.thunder = 1;
        idle(&mut state, 1);
        assert!(state.slot(Channel::C).enabled);
        assert!(state.slot(Channel::C).chord.is_some());
    }

    #[test]
    fn test_magic_slot_casts() {
        let mut state = quiet_state();
        state.player.magics.thunder = 1;
        idle(&mut state, 1);
        let id = place_enemy(&mut state, Vec2::new(500.0, 0.0), 1000);

        let notes = chord_notes(&state, Channel::C);
        play(&mut state, notes);
        assert!(state.events.contains(&GameEvent::MagicCast { kind: crate::sim::magic::MagicKind::Thunder, level: 1 }));
        let enemy = state.enemies.iter().find(|e| e.id == id).expect("still alive");
        assert!(enemy.stats.hp < 1000);
        // 12s magic cooldown, or half of it on a lucky cast
        assert!(state.slot(Channel::C).cooldown >= 5.9);
    }

    #[test]
    fn test_magic_slot_idle_while_nothing_castable() {
        let mut state = quiet_state();
        state.player.magics.buffer = 1;
        idle(&mut state, 1);
        assert!(state.slot(Channel::C).is_accepting());

        state
            .player
            .statuses
            .apply(StatusEffect::timed(StatusKind::Buffer, 30.0, state.elapsed, 1));
        idle(&mut state, 1);
        assert!(!state.slot(Channel::C).enabled);

        let notes = chord_notes(&state, Channel::C);
        play(&mut state, notes);
        assert!(!state.events.contains(&GameEvent::SlotCompleted(Channel::C)));
        assert!(!state.slot(Channel::C).completed);
        assert_eq!(state.slot(Channel::C).cooldown, 0.0);

        // Heal alone at full health is just as idle
        let mut state = quiet_state();
        state.player.magics.heal = 1;
        idle(&mut state, 1);
        assert!(!state.slot(Channel::C).enabled);
        state.player.stats.hp -= 10;
        idle(&mut state, 1);
        assert!(state.slot(Channel::C).is_accepting());
    }

    #[test]
    fn test_buffer_expiry_reported_once() {
        let mut state = quiet_state();
        state
            .player
            .statuses
            .apply(StatusEffect::timed(StatusKind::Buffer, 0.1, state.elapsed, 1));

        let mut expired = 0;
        for _ in 0..20 {
            idle(&mut state, 1);
            expired += state
                .events
                .iter()
                .filter(|e| **e == GameEvent::StatusExpired { kind: StatusKind::Buffer })
                .count();
        }
        assert_eq!(expired, 1);
        assert!(!state.player.statuses.has(StatusKind::Buffer));
    }

    #[test]
    fn test_second_magic_slot_keeps_chord_when_first_cast_used_last_spell() {
        let mut state = quiet_state();
        state.player.magics.buffer = 1;
        idle(&mut state, 1);

        let mut notes = chord_notes(&state, Channel::C);
        notes.extend(chord_notes(&state, Channel::D));
        play(&mut state, notes);

        let casts = state.events.iter().filter(|e| matches!(e, GameEvent::MagicCast { .. })).count();
        assert_eq!(casts, 1);
        let magic_done = state
            .events
            .iter()
            .filter(|e| matches!(e, GameEvent::SlotCompleted(c) if c.is_magic()))
            .count();
        assert_eq!(magic_done, 1);
        let spared = [Channel::C, Channel::D]
            .into_iter()
            .filter(|c| !state.slot(*c).completed && state.slot(*c).cooldown == 0.0)
            .count();
        assert_eq!(spared, 1);
    }

    #[test]
    fn test_wave_timeout_without_quota_fails_run() {
        let mut state = quiet_state();
        state.wave.wave_duration = 0.1;
        idle(&mut state, 10);
        assert_eq!(state.phase, GamePhase::GameOver);
        assert_eq!(state.summary.as_ref().map(|s| s.cleared), Some(false));
    }

    #[test]
    fn test_target_wave_clear() {
        let mut state = quiet_state();
        state.settings.difficulty.target_wave = Some(1);
        state.wave.wave_duration = 0.1;
        state.wave.wave_completed = true;
        idle(&mut state, 10);
        assert_eq!(state.phase, GamePhase::GameOver);
        let summary = state.summary.as_ref().expect("summary");
        assert!(summary.cleared);
        assert_eq!(summary.waves_cleared, 1);
    }

    #[test]
    fn test_slot_cooldowns() {
        let stats = Stats { reload_magic: 4, ..Default::default() };
        let cond = ConditionalMultipliers::default();
        let plain = LuckResult::default();
        assert_eq!(slot_cooldown(Channel::A, &stats, &cond, &plain), RANGED_COOLDOWN);
        assert_eq!(slot_cooldown(Channel::C, &stats, &cond, &plain), 10.0);

        let lucky = LuckResult { reload_reduction: true, ..Default::default() };
        assert_eq!(slot_cooldown(Channel::C, &stats, &cond, &lucky), 5.0);

        let fast = Stats { reload_magic: 100, ..Default::default() };
        assert_eq!(slot_cooldown(Channel::D, &fast, &cond, &plain), MAGIC_MIN_COOLDOWN);
    }
}
