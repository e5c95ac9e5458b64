//! Terminal run summary
//!
//! Built once when a run ends and handed to result/telemetry consumers.

use serde::{Deserialize, Serialize};

use crate::sim::state::{GameState, Magics, Skills, Stats};

pub const CURRENCY_PER_KILLS: u32 = 10;
pub const CURRENCY_PER_LEVEL: u32 = 2;
pub const CURRENCY_PER_WAVE: u32 = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub seed: u64,
    /// Simulated seconds survived
    pub survival_time: f32,
    pub final_level: u32,
    pub final_wave: u32,
    pub waves_cleared: u32,
    pub enemies_defeated: u32,
    pub stats: Stats,
    pub skills: Skills,
    pub magics: Magics,
    /// Meta-progression currency earned by this run
    pub currency: u32,
    pub cleared: bool,
}

/// Kills, levels and cleared waves convert to currency; a clear doubles it
pub fn earned_currency(enemies_defeated: u32, level: u32, waves_cleared: u32, cleared: bool) -> u32 {
    let base = enemies_defeated / CURRENCY_PER_KILLS
        + level * CURRENCY_PER_LEVEL
        + waves_cleared * CURRENCY_PER_WAVE;
    if cleared { base * 2 } else { base }
}

impl RunSummary {
    pub fn from_state(state: &GameState, cleared: bool) -> Self {
        let player = &state.player;
        let level = player.progress.level;
        let waves_cleared = state.wave.current_wave.saturating_sub(1);
        Self {
            seed: state.rng.seed(),
            survival_time: state.elapsed,
            final_level: level,
            final_wave: state.wave.current_wave,
            waves_cleared,
            enemies_defeated: state.enemies_defeated,
            stats: player.stats.clone(),
            skills: player.skills.clone(),
            magics: player.magics.clone(),
            currency: earned_currency(state.enemies_defeated, level, waves_cleared, cleared),
            cleared,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::RunSettings;
    use crate::sim::chord::BasicChordResolver;

    #[test]
    fn test_currency_formula() {
        assert_eq!(earned_currency(0, 1, 0, false), 2);
        assert_eq!(earned_currency(25, 4, 2, false), 2 + 8 + 10);
        assert_eq!(earned_currency(25, 4, 2, true), 40);
    }

    #[test]
    fn test_summary_from_fresh_state() {
        let state = GameState::new(99, RunSettings::default(), &BasicChordResolver);
        let summary = RunSummary::from_state(&state, false);
        assert_eq!(summary.seed, 99);
        assert_eq!(summary.final_level, 1);
        assert_eq!(summary.final_wave, 1);
        assert_eq!(summary.waves_cleared, 0);
        assert_eq!(summary.currency, 2);
        assert!(serde_json::to_string(&summary).is_ok());
    }
}
