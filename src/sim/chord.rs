//! Chord-gated code slots
//!
//! Each slot holds a chord. Incoming notes are reduced to pitch classes
//! (0-11); once every distinct pitch class of the chord has been played the
//! slot completes and its channel fires.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::rng::RandomSource;

/// Chord data as supplied by an external resolver
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChordDefinition {
    pub name: String,
    /// Absolute note numbers (any octave)
    pub notes: Vec<i32>,
}

/// Looks up chord ids; implemented outside the engine in production
pub trait ChordResolver {
    fn resolve(&self, id: &str) -> Option<ChordDefinition>;
}

/// Reduce an absolute pitch to its pitch class
#[inline]
pub fn pitch_class(note: i32) -> u8 {
    note.rem_euclid(12) as u8
}

/// Root-plus-quality resolver for ids such as `C`, `F#m`, `Bbm7b5`, `GM7`
#[derive(Debug, Clone, Copy, Default)]
pub struct BasicChordResolver;

const QUALITIES: &[(&str, &[i32])] = &[
    ("", &[0, 4, 7]),
    ("m", &[0, 3, 7]),
    ("dim", &[0, 3, 6]),
    ("aug", &[0, 4, 8]),
    ("sus4", &[0, 5, 7]),
    ("7", &[0, 4, 7, 10]),
    ("M7", &[0, 4, 7, 11]),
    ("m7", &[0, 3, 7, 10]),
    ("m7b5", &[0, 3, 6, 10]),
];

/// Middle C; chords are voiced in octave 4
const OCTAVE_4_C: i32 = 60;

fn parse_root(id: &str) -> Option<(i32, &str)> {
    let mut chars = id.chars();
    let natural = match chars.next()? {
        'C' => 0,
        'D' => 2,
        'E' => 4,
        'F' => 5,
        'G' => 7,
        'A' => 9,
        'B' => 11,
        _ => return None,
    };
    let rest = &id[1..];
    if let Some(r) = rest.strip_prefix('#') {
        Some((natural + 1, r))
    } else if let Some(r) = rest.strip_prefix('b') {
        Some((natural - 1, r))
    } else {
        Some((natural, rest))
    }
}

impl ChordResolver for BasicChordResolver {
    fn resolve(&self, id: &str) -> Option<ChordDefinition> {
        let (root, suffix) = parse_root(id)?;
        let (_, intervals) = QUALITIES.iter().find(|(q, _)| *q == suffix)?;
        Some(ChordDefinition {
            name: id.to_string(),
            notes: intervals.iter().map(|i| OCTAVE_4_C + root + i).collect(),
        })
    }
}

/// A resolved chord reduced to pitch classes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chord {
    pub id: String,
    pub name: String,
    pub pitch_classes: BTreeSet<u8>,
}

impl Chord {
    /// `None` when the definition carries no notes
    pub fn from_definition(id: &str, def: ChordDefinition) -> Option<Self> {
        let pitch_classes: BTreeSet<u8> = def.notes.iter().map(|n| pitch_class(*n)).collect();
        if pitch_classes.is_empty() {
            return None;
        }
        Some(Self {
            id: id.to_string(),
            name: def.name,
            pitch_classes,
        })
    }

    pub fn contains(&self, pc: u8) -> bool {
        self.pitch_classes.contains(&pc)
    }

    /// Number of distinct pitch classes required to complete
    pub fn size(&self) -> usize {
        self.pitch_classes.len()
    }
}

/// Add `pc` to `progress` if the chord needs it. Returns true when newly complete.
pub fn accept_note(chord: &Chord, progress: &mut BTreeSet<u8>, pc: u8) -> bool {
    if !chord.contains(pc) || progress.contains(&pc) {
        return false;
    }
    progress.insert(pc);
    progress.len() >= chord.size()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct PoolEntry {
    id: String,
    chord: Option<Chord>,
}

/// The run's allowed chords, resolved once at start.
///
/// Ids the resolver did not know stay in the pool; drawing one yields no chord.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChordPool {
    entries: Vec<PoolEntry>,
}

impl ChordPool {
    pub fn resolve(ids: &[String], resolver: &dyn ChordResolver) -> Self {
        let entries = ids
            .iter()
            .map(|id| {
                let chord = resolver
                    .resolve(id)
                    .and_then(|def| Chord::from_definition(id, def));
                if chord.is_none() {
                    log::warn!("Chord id {id:?} could not be resolved");
                }
                PoolEntry { id: id.clone(), chord }
            })
            .collect();
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Draw one chord avoiding `previous`; repeats only when nothing else exists
    pub fn draw(&self, previous: Option<&str>, rng: &mut dyn RandomSource) -> Option<Chord> {
        let candidates: Vec<&PoolEntry> = self
            .entries
            .iter()
            .filter(|e| Some(e.id.as_str()) != previous)
            .collect();
        if candidates.is_empty() {
            return self.entries.first().and_then(|e| e.chord.clone());
        }
        candidates[rng.index(candidates.len())].chord.clone()
    }

    /// Draw one id not in `exclude`, with its chord if it resolved.
    /// `None` once the pool is used up.
    pub fn draw_excluding(
        &self,
        exclude: &[String],
        rng: &mut dyn RandomSource,
    ) -> Option<(String, Option<Chord>)> {
        let candidates: Vec<&PoolEntry> = self
            .entries
            .iter()
            .filter(|e| !exclude.contains(&e.id))
            .collect();
        if candidates.is_empty() {
            return None;
        }
        let entry = candidates[rng.index(candidates.len())];
        Some((entry.id.clone(), entry.chord.clone()))
    }
}

/// The four input channels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Channel {
    /// Ranged volley
    A,
    /// Melee strike
    B,
    /// Magic
    C,
    /// Magic
    D,
}

impl Channel {
    pub const ALL: [Channel; 4] = [Channel::A, Channel::B, Channel::C, Channel::D];

    pub fn index(self) -> usize {
        match self {
            Channel::A => 0,
            Channel::B => 1,
            Channel::C => 2,
            Channel::D => 3,
        }
    }

    pub fn is_magic(self) -> bool {
        matches!(self, Channel::C | Channel::D)
    }
}

/// Per-slot state: empty → armed → accumulating → completed → reset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeSlot {
    pub channel: Channel,
    pub chord: Option<Chord>,
    /// Pitch classes played so far
    pub correct: BTreeSet<u8>,
    /// Seconds until notes are accepted again
    pub cooldown: f32,
    pub completed: bool,
    pub enabled: bool,
    /// Id of the chord most recently assigned, used to avoid back-to-back repeats
    #[serde(default)]
    pub last_chord_id: Option<String>,
}

impl CodeSlot {
    pub fn new(channel: Channel) -> Self {
        Self {
            channel,
            chord: None,
            correct: BTreeSet::new(),
            cooldown: 0.0,
            completed: false,
            enabled: !channel.is_magic(),
            last_chord_id: None,
        }
    }

    pub fn is_accepting(&self) -> bool {
        self.enabled && !self.completed && self.cooldown <= 0.0 && self.chord.is_some()
    }

    /// Feed one pitch class. Returns true when this note completed the slot.
    pub fn accept_note(&mut self, pc: u8) -> bool {
        if !self.is_accepting() {
            return false;
        }
        let Some(chord) = self.chord.as_ref() else {
            return false;
        };
        if accept_note(chord, &mut self.correct, pc) {
            self.completed = true;
            return true;
        }
        false
    }

    /// Fraction of the chord played (0-1)
    pub fn progress(&self) -> f32 {
        match &self.chord {
            Some(chord) if chord.size() > 0 => self.correct.len() as f32 / chord.size() as f32,
            _ => 0.0,
        }
    }

    /// Draw a fresh chord (never the immediately previous one) and clear progress
    pub fn rearm(&mut self, pool: &ChordPool, rng: &mut dyn RandomSource) {
        let previous = self.last_chord_id.clone();
        self.chord = pool.draw(previous.as_deref(), rng);
        if let Some(chord) = &self.chord {
            self.last_chord_id = Some(chord.id.clone());
        }
        self.correct.clear();
        self.completed = false;
    }
}

/// Route one pitch class to every eligible slot; returns the channels that completed
pub fn process_note(slots: &mut [CodeSlot], pc: u8) -> Vec<Channel> {
    slots
        .iter_mut()
        .filter_map(|slot| slot.accept_note(pc).then_some(slot.channel))
        .collect()
}
