//! Timed status effects carried by the player and enemies

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StatusKind {
    /// Frozen: enemy skips movement
    Ice,
    /// Damage-over-time aura around the caster
    Fire,
    /// Attack multiplier on the caster
    Buffer,
    /// Lowered effective defence, raised damage taken
    Debuffer,
    /// Renderer highlights the active chord's notes
    Hint,
    /// Marker while the last-stand condition holds
    LastStand,
    /// Marker while the peak-condition holds
    PeakCondition,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusEffect {
    pub kind: StatusKind,
    /// Seconds; `None` lasts until explicitly removed
    pub duration: Option<f32>,
    pub start_time: f32,
    pub level: u8,
}

impl StatusEffect {
    pub fn timed(kind: StatusKind, duration: f32, start_time: f32, level: u8) -> Self {
        Self {
            kind,
            duration: Some(duration.max(0.0)),
            start_time,
            level,
        }
    }

    pub fn persistent(kind: StatusKind, start_time: f32) -> Self {
        Self {
            kind,
            duration: None,
            start_time,
            level: 0,
        }
    }

    pub fn is_expired(&self, now: f32) -> bool {
        match self.duration {
            Some(d) => now - self.start_time >= d,
            None => false,
        }
    }

    pub fn remaining(&self, now: f32) -> Option<f32> {
        self.duration
            .map(|d| (self.start_time + d - now).max(0.0))
    }
}

/// Per-entity effect list. At most one instance per kind.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatusTracker {
    effects: Vec<StatusEffect>,
}

impl StatusTracker {
    /// Apply an effect, replacing any existing instance of the same kind
    pub fn apply(&mut self, effect: StatusEffect) {
        self.effects.retain(|e| e.kind != effect.kind);
        self.effects.push(effect);
    }

    pub fn get(&self, kind: StatusKind) -> Option<&StatusEffect> {
        self.effects.iter().find(|e| e.kind == kind)
    }

    pub fn has(&self, kind: StatusKind) -> bool {
        self.get(kind).is_some()
    }

    pub fn level(&self, kind: StatusKind) -> Option<u8> {
        self.get(kind).map(|e| e.level)
    }

    pub fn remove(&mut self, kind: StatusKind) -> bool {
        let before = self.effects.len();
        self.effects.retain(|e| e.kind != kind);
        self.effects.len() != before
    }

    /// Keep a persistent marker in sync with a condition
    pub fn set_marker(&mut self, kind: StatusKind, active: bool, now: f32) {
        match (active, self.has(kind)) {
            (true, false) => self.apply(StatusEffect::persistent(kind, now)),
            (false, true) => {
                self.remove(kind);
            }
            _ => {}
        }
    }

    /// Drop expired effects, returning the kinds that ended
    pub fn expire(&mut self, now: f32) -> Vec<StatusKind> {
        let mut ended = Vec::new();
        self.effects.retain(|e| {
            if e.is_expired(now) {
                ended.push(e.kind);
                false
            } else {
                true
            }
        });
        ended
    }

    pub fn len(&self) -> usize {
        self.effects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }
}
