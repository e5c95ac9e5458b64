//! Frame-driven runner
//!
//! Bridges a variable-rate frame callback to the fixed simulation timestep.
//! Input arrives between frames and is held until the next tick consumes it.

use glam::Vec2;

use crate::consts::*;
use crate::sim::{GameState, TickInput, tick};

/// Longest frame the runner will try to catch up on
pub const MAX_FRAME_DT: f32 = 0.1;

/// Owns a run and drives it from frame callbacks
pub struct Runner {
    pub state: GameState,
    accumulator: f32,
    input: TickInput,
}

impl Runner {
    pub fn new(state: GameState) -> Self {
        Self {
            state,
            accumulator: 0.0,
            input: TickInput::default(),
        }
    }

    /// Held movement direction
    pub fn set_move_dir(&mut self, dir: Vec2) {
        self.input.move_dir = dir;
    }

    pub fn set_autopilot(&mut self, on: bool) {
        self.input.autopilot = on;
    }

    /// Queue a played note for the next tick
    pub fn push_note(&mut self, note: i32) {
        self.input.notes.push(note);
    }

    pub fn toggle_pause(&mut self) {
        self.input.pause = true;
    }

    pub fn select_bonus(&mut self, index: usize) {
        self.input.select_bonus = Some(index);
    }

    /// Run as many fixed ticks as `frame_dt` covers. Returns the ticks run.
    pub fn update(&mut self, frame_dt: f32) -> u32 {
        let dt = frame_dt.clamp(0.0, MAX_FRAME_DT);
        self.accumulator += dt;

        let mut substeps = 0;
        while self.accumulator >= SIM_DT && substeps < MAX_SUBSTEPS {
            let input = self.input.clone();
            tick(&mut self.state, &input, SIM_DT);
            self.accumulator -= SIM_DT;
            substeps += 1;

            // Clear one-shot inputs after processing
            self.input.notes.clear();
            self.input.pause = false;
            self.input.select_bonus = None;
        }

        // Drop the backlog rather than spiral
        if substeps == MAX_SUBSTEPS {
            self.accumulator = self.accumulator.min(SIM_DT);
        }

        substeps
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::RunSettings;
    use crate::sim::{BasicChordResolver, Channel, GamePhase};

    fn runner() -> Runner {
        let mut state = GameState::new(5, RunSettings::default(), &BasicChordResolver);
        state.spawn.timer = 1.0e6;
        Runner::new(state)
    }

    #[test]
    fn test_long_frame_clamped() {
        let mut r = runner();
        // 0.1s covers six ticks; a one-second hitch must not run more
        assert_eq!(r.update(1.0), 6);
        assert_eq!(r.state.time_ticks, 6);
    }

    #[test]
    fn test_backlog_dropped_at_substep_cap() {
        let mut r = runner();
        r.accumulator = SIM_DT * 20.0;
        assert_eq!(r.update(0.0), MAX_SUBSTEPS);
        assert_eq!(r.state.time_ticks, MAX_SUBSTEPS as u64);
        assert!(r.accumulator <= SIM_DT);
        assert_eq!(r.update(0.0), 1);
    }

    #[test]
    fn test_short_frames_accumulate() {
        let mut r = runner();
        assert_eq!(r.update(SIM_DT * 0.5), 0);
        assert_eq!(r.update(SIM_DT * 0.6), 1);
    }

    #[test]
    fn test_notes_consumed_once() {
        let mut r = runner();
        let chord = r.state.slot(Channel::A).chord.clone().expect("armed");
        for pc in &chord.pitch_classes {
            r.push_note(72 + *pc as i32);
        }
        r.update(SIM_DT * 1.01);
        assert!(r.state.slot(Channel::A).completed);
        assert_eq!(r.state.projectiles.len(), 1);

        r.update(SIM_DT * 1.01);
        assert_eq!(r.state.projectiles.len(), 1);
    }

    #[test]
    fn test_pause_is_one_shot() {
        let mut r = runner();
        r.toggle_pause();
        r.update(SIM_DT * 3.5);
        assert_eq!(r.state.phase, GamePhase::Paused);
    }
}
