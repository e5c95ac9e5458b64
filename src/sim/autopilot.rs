//! Autopilot - plays the game for demos, soak runs and the headless runner
//!
//! Produces the same [`TickInput`] a player would, so everything downstream
//! stays on the normal input path.

use glam::Vec2;

use super::state::{GamePhase, GameState};
use super::tick::TickInput;

/// Enemies closer than this make the autopilot back off
pub const DANGER_RADIUS: f32 = 110.0;
/// Coins further than this are ignored while enemies are around
pub const COIN_GREED_RADIUS: f32 = 300.0;

/// Build the input the autopilot would play this tick
pub fn autopilot_input(state: &GameState) -> TickInput {
    let mut input = TickInput::default();

    match state.phase {
        GamePhase::LevelUp => {
            if let Some(offer) = &state.level_up_offer {
                if !offer.is_empty() {
                    // Rotate through options for some variety between runs
                    let pick = (state.time_ticks as usize + state.pending_level_ups as usize)
                        % offer.options.len();
                    input.select_bonus = Some(pick);
                }
            }
            return input;
        }
        GamePhase::Playing => {}
        _ => return input,
    }

    let player_pos = state.player.pos;

    let nearest_enemy = state
        .enemies
        .iter()
        .filter(|e| e.is_alive())
        .min_by(|a, b| {
            a.pos
                .distance_squared(player_pos)
                .partial_cmp(&b.pos.distance_squared(player_pos))
                .unwrap_or(std::cmp::Ordering::Equal)
        });

    let nearest_coin = state
        .coins
        .iter()
        .min_by(|a, b| {
            a.pos
                .distance_squared(player_pos)
                .partial_cmp(&b.pos.distance_squared(player_pos))
                .unwrap_or(std::cmp::Ordering::Equal)
        })
        .filter(|c| nearest_enemy.is_none() || c.pos.distance(player_pos) < COIN_GREED_RADIUS);

    input.move_dir = match (nearest_enemy, nearest_coin) {
        (Some(enemy), _) if enemy.pos.distance(player_pos) < DANGER_RADIUS => {
            // Back off, sliding sideways so we don't pin ourselves on a wall
            let away = (player_pos - enemy.pos).normalize_or_zero();
            let wobble = (state.time_ticks as f32 * 0.02).sin() * 0.5;
            (away + away.perp() * wobble).normalize_or_zero()
        }
        (_, Some(coin)) => (coin.pos - player_pos).normalize_or_zero(),
        // Face the nearest enemy so volleys and swings point at it
        (Some(enemy), None) => (enemy.pos - player_pos).normalize_or_zero(),
        (None, None) => Vec2::ZERO,
    };

    // Play every armed chord
    for slot in state.slots.iter().filter(|s| s.is_accepting()) {
        if let Some(chord) = &slot.chord {
            input
                .notes
                .extend(chord.pitch_classes.iter().map(|pc| 60 + *pc as i32));
        }
    }

    input
}
