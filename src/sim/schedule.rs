//! Deferred effects drained by the tick loop
//!
//! Fire times are simulation seconds, so anything that freezes the sim clock
//! (pause, level-up) also freezes pending entries.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use serde::{Deserialize, Serialize};

use super::chord::Channel;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ScheduledAction {
    /// Follow-up melee strike; `step` counts from 1
    MeleeStrike { step: u8, lucky: bool },
    /// Clear a completed slot and draw its next chord
    ResetSlot(Channel),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduledEvent {
    pub fire_at: f32,
    seq: u64,
    pub action: ScheduledAction,
}

impl PartialEq for ScheduledEvent {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ScheduledEvent {}

impl PartialOrd for ScheduledEvent {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScheduledEvent {
    // Reversed so BinaryHeap pops the earliest entry; ties go to insertion order
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .fire_at
            .total_cmp(&self.fire_at)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Schedule {
    queue: BinaryHeap<ScheduledEvent>,
    next_seq: u64,
}

impl Schedule {
    pub fn push(&mut self, fire_at: f32, action: ScheduledAction) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.queue.push(ScheduledEvent { fire_at, seq, action });
    }

    /// Pop the earliest entry due at or before `now`
    pub fn pop_due(&mut self, now: f32) -> Option<ScheduledAction> {
        if self.queue.peek()?.fire_at <= now {
            self.queue.pop().map(|e| e.action)
        } else {
            None
        }
    }

    pub fn clear(&mut self) {
        self.queue.clear();
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}
