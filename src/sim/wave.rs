//! Wave progression: kill quotas, timers and spawn pacing per wave

use serde::{Deserialize, Serialize};

/// Spawn speed never exceeds this multiple of wave 1
pub const MAX_SPAWN_SPEED_MULT: f32 = 3.0;
pub const SPAWN_SPEED_PER_WAVE: f32 = 0.1;

/// Kills required to complete wave `n` (1-based)
pub fn wave_quota(n: u32) -> u32 {
    match n {
        0..=3 => 10,
        4..=6 => 20,
        7..=10 => 35,
        11..=15 => 50,
        _ => 70,
    }
}

/// Seconds wave `n` lasts before its quota is judged
pub fn wave_duration(n: u32) -> f32 {
    match n {
        0..=3 => 60.0,
        4..=10 => 90.0,
        _ => 120.0,
    }
}

/// Enemies per spawn batch for wave `n`
pub fn wave_spawn_count(n: u32) -> u32 {
    match n {
        0..=2 => 1,
        3..=5 => 2,
        6..=10 => 3,
        _ => 4,
    }
}

pub fn spawn_speed_multiplier(n: u32) -> f32 {
    (1.0 + SPAWN_SPEED_PER_WAVE * n.saturating_sub(1) as f32).min(MAX_SPAWN_SPEED_MULT)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WaveFailure {
    /// Timer ran out with kills below quota
    QuotaNotMet { kills: u32, quota: u32 },
}

/// What the wave timer decided this tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaveOutcome {
    Ongoing,
    /// Moved on to the given wave number
    Advanced(u32),
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaveState {
    pub current_wave: u32,
    pub wave_start_time: f32,
    pub wave_kills: u32,
    pub wave_quota: u32,
    pub wave_duration: f32,
    pub wave_completed: bool,
    pub failure: Option<WaveFailure>,
}

impl WaveState {
    /// Wave 1 starting at `start`
    pub fn new(start: f32) -> Self {
        Self::for_wave(1, start)
    }

    pub fn for_wave(n: u32, start: f32) -> Self {
        Self {
            current_wave: n,
            wave_start_time: start,
            wave_kills: 0,
            wave_quota: wave_quota(n),
            wave_duration: wave_duration(n),
            wave_completed: false,
            failure: None,
        }
    }

    /// Count a kill. Returns true on the kill that meets the quota.
    pub fn register_kill(&mut self) -> bool {
        self.wave_kills += 1;
        if !self.wave_completed && self.wave_kills >= self.wave_quota {
            self.wave_completed = true;
            return true;
        }
        false
    }

    /// Judge the wave once its duration has elapsed
    pub fn update(&mut self, now: f32) -> WaveOutcome {
        if self.failure.is_some() {
            return WaveOutcome::Failed;
        }
        if now - self.wave_start_time < self.wave_duration {
            return WaveOutcome::Ongoing;
        }

        if self.wave_completed {
            let next = self.current_wave + 1;
            *self = Self::for_wave(next, now);
            WaveOutcome::Advanced(next)
        } else {
            self.failure = Some(WaveFailure::QuotaNotMet {
                kills: self.wave_kills,
                quota: self.wave_quota,
            });
            WaveOutcome::Failed
        }
    }
}
