//! Game state and core simulation types
//!
//! Everything a renderer or a replay needs lives here; the whole struct is
//! serializable so a snapshot can be handed across the boundary each tick.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::bonus::{BonusCatalog, BonusKind, LevelUpOffer};
use super::bullet::{EnemyProjectile, Projectile};
use super::chord::{Channel, ChordPool, ChordResolver, CodeSlot};
use super::leveling::LevelProgress;
use super::magic::MagicKind;
use super::rng::SimRng;
use super::schedule::Schedule;
use super::spawn::{EnemyKind, SpawnState};
use super::status::{StatusKind, StatusTracker};
use super::wave::WaveState;
use crate::consts::*;
use crate::settings::RunSettings;
use crate::summary::RunSummary;

/// Current phase of gameplay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    /// Active gameplay
    Playing,
    /// Level-up offer open; simulation time is frozen
    LevelUp,
    /// Game is paused
    Paused,
    /// Run ended
    GameOver,
}

/// Eight-way facing direction (screen coordinates, +y is down)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Direction8 {
    #[default]
    Right,
    DownRight,
    Down,
    DownLeft,
    Left,
    UpLeft,
    Up,
    UpRight,
}

impl Direction8 {
    const ORDER: [Direction8; 8] = [
        Direction8::Right,
        Direction8::DownRight,
        Direction8::Down,
        Direction8::DownLeft,
        Direction8::Left,
        Direction8::UpLeft,
        Direction8::Up,
        Direction8::UpRight,
    ];

    /// Snap a movement vector to the nearest of eight directions
    pub fn from_vec(v: Vec2) -> Option<Self> {
        if v.length_squared() < 1e-6 {
            return None;
        }
        let octant = (v.y.atan2(v.x) / std::f32::consts::FRAC_PI_4).round() as i32;
        Some(Self::ORDER[octant.rem_euclid(8) as usize])
    }

    /// Facing angle in radians
    pub fn angle(self) -> f32 {
        let idx = Self::ORDER.iter().position(|d| *d == self).unwrap_or(0);
        crate::normalize_angle(idx as f32 * std::f32::consts::FRAC_PI_4)
    }
}

/// Player stat block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Stats {
    /// Ranged (slot A) attack
    pub a_atk: i32,
    /// Melee (slot B) attack
    pub b_atk: i32,
    /// Magic (slots C/D) attack
    pub c_atk: i32,
    pub speed: i32,
    /// Shortens magic slot reload
    pub reload_magic: i32,
    pub hp: i32,
    pub max_hp: i32,
    pub def: i32,
    /// Extends magic effect durations
    pub time: i32,
    pub a_bullet_count: u32,
    pub luck: i32,
}

impl Default for Stats {
    fn default() -> Self {
        Self {
            a_atk: 10,
            b_atk: 15,
            c_atk: 10,
            speed: 5,
            reload_magic: 0,
            hp: 100,
            max_hp: 100,
            def: 0,
            time: 0,
            a_bullet_count: 1,
            luck: 0,
        }
    }
}

impl Stats {
    /// Restore the documented bounds after any mutation
    pub fn clamp_invariants(&mut self) {
        self.max_hp = self.max_hp.clamp(1, MAX_HP_CAP);
        self.hp = self.hp.clamp(0, self.max_hp);
        self.luck = self.luck.clamp(0, MAX_LUCK);
        self.a_bullet_count = self.a_bullet_count.clamp(1, MAX_A_BULLET_COUNT);
    }
}

/// Passive skills unlocked through level-up bonuses
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Skills {
    pub penetration: bool,
    /// Knockback force bonus level (0-3)
    pub knockback_bonus: u8,
    pub range_bonus: bool,
    pub deflect: bool,
    /// Extra melee follow-up strikes (0-3)
    pub multi_hit: u8,
    /// +10% experience per level (0-10)
    pub exp_bonus: u8,
    pub last_stand: bool,
    pub peak_condition: bool,
    /// Level-ups apply a random bonus without the chord gate
    pub auto_select: bool,
}

/// Magic channel levels (0 = not learned, max 3)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Magics {
    pub thunder: u8,
    pub ice: u8,
    pub fire: u8,
    pub heal: u8,
    pub buffer: u8,
    pub hint: u8,
}

impl Magics {
    pub fn level(&self, kind: MagicKind) -> u8 {
        match kind {
            MagicKind::Thunder => self.thunder,
            MagicKind::Ice => self.ice,
            MagicKind::Fire => self.fire,
            MagicKind::Heal => self.heal,
            MagicKind::Buffer => self.buffer,
            MagicKind::Hint => self.hint,
        }
    }

    pub fn set_level(&mut self, kind: MagicKind, level: u8) {
        let level = level.min(MAX_MAGIC_LEVEL);
        match kind {
            MagicKind::Thunder => self.thunder = level,
            MagicKind::Ice => self.ice = level,
            MagicKind::Fire => self.fire = level,
            MagicKind::Heal => self.heal = level,
            MagicKind::Buffer => self.buffer = level,
            MagicKind::Hint => self.hint = level,
        }
    }
}

/// The player
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerState {
    pub pos: Vec2,
    pub facing: Direction8,
    pub stats: Stats,
    pub skills: Skills,
    pub magics: Magics,
    pub statuses: StatusTracker,
    pub progress: LevelProgress,
    /// How many times each stat bonus has been taken
    #[serde(default)]
    pub bonus_counts: Vec<(BonusKind, u32)>,
    /// Simulation time until which incoming hits are ignored
    #[serde(default)]
    pub invulnerable_until: f32,
}

impl PlayerState {
    pub fn new(settings: &RunSettings) -> Self {
        let character = &settings.character;
        let mut stats = character.initial_stats.clone();
        stats.clamp_invariants();
        Self {
            pos: Vec2::new(MAP_WIDTH / 2.0, MAP_HEIGHT / 2.0),
            facing: Direction8::default(),
            stats,
            skills: character.initial_skills.clone(),
            magics: character.initial_magics.clone(),
            statuses: StatusTracker::default(),
            progress: LevelProgress::new(),
            bonus_counts: Vec::new(),
            invulnerable_until: 0.0,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.stats.hp > 0
    }

    pub fn bonus_count(&self, kind: BonusKind) -> u32 {
        self.bonus_counts
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, n)| *n)
            .unwrap_or(0)
    }

    pub fn record_bonus(&mut self, kind: BonusKind) {
        match self.bonus_counts.iter_mut().find(|(k, _)| *k == kind) {
            Some((_, n)) => *n += 1,
            None => self.bonus_counts.push((kind, 1)),
        }
    }
}

/// Enemy stat block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnemyStats {
    pub atk: i32,
    pub def: i32,
    pub hp: i32,
    pub max_hp: i32,
    pub speed: f32,
}

/// An enemy entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnemyState {
    pub id: u32,
    pub pos: Vec2,
    pub kind: EnemyKind,
    pub stats: EnemyStats,
    pub statuses: StatusTracker,
    pub is_boss: bool,
    /// Decaying knockback velocity (pixels/s)
    #[serde(default)]
    pub knockback: Vec2,
}

impl EnemyState {
    pub fn radius(&self) -> f32 {
        if self.is_boss {
            ENEMY_RADIUS * 2.0
        } else {
            ENEMY_RADIUS
        }
    }

    pub fn is_alive(&self) -> bool {
        self.stats.hp > 0
    }

    /// Subtract damage, clamping hp at zero. Returns the damage actually dealt.
    pub fn apply_damage(&mut self, amount: i32) -> i32 {
        let dealt = amount.max(0).min(self.stats.hp);
        self.stats.hp -= dealt;
        dealt
    }
}

/// An experience coin
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Coin {
    pub id: u32,
    pub pos: Vec2,
    pub exp: u32,
    pub created_at: f32,
    /// `None` never expires
    pub lifetime: Option<f32>,
}

impl Coin {
    pub fn is_expired(&self, now: f32) -> bool {
        self.lifetime
            .map(|life| now - self.created_at >= life)
            .unwrap_or(false)
    }
}

/// Events emitted during a tick for renderer/audio consumers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    EnemyDefeated { id: u32, kind: EnemyKind, boss: bool },
    EnemySpawned { id: u32, kind: EnemyKind, boss: bool },
    PlayerHit { damage: i32 },
    HitNegated,
    SlotCompleted(Channel),
    MagicCast { kind: MagicKind, level: u8 },
    /// A timed effect on the player ran out
    StatusExpired { kind: StatusKind },
    CoinCollected { exp: u32 },
    LevelUp { level: u32 },
    BonusApplied { kind: BonusKind },
    WaveCompleted { wave: u32 },
    WaveAdvanced { wave: u32 },
    GameOver { cleared: bool },
}

/// Complete game state (deterministic, serializable)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameState {
    /// Read-only run configuration
    pub settings: RunSettings,
    pub rng: SimRng,
    pub phase: GamePhase,
    /// Simulation tick counter
    pub time_ticks: u64,
    /// Simulated seconds since the run started
    pub elapsed: f32,
    pub player: PlayerState,
    /// Active enemies (sorted by id for determinism)
    pub enemies: Vec<EnemyState>,
    pub projectiles: Vec<Projectile>,
    pub enemy_projectiles: Vec<EnemyProjectile>,
    pub coins: Vec<Coin>,
    pub wave: WaveState,
    /// Slots A, B, C, D in order
    pub slots: [CodeSlot; 4],
    pub chord_pool: ChordPool,
    pub schedule: Schedule,
    pub spawn: SpawnState,
    /// Bonuses level-ups draw from
    pub catalog: BonusCatalog,
    pub pending_level_ups: u32,
    pub level_up_offer: Option<LevelUpOffer>,
    /// Time accumulated toward the next fire-aura pulse
    #[serde(default)]
    pub fire_aura_timer: f32,
    pub enemies_defeated: u32,
    pub summary: Option<RunSummary>,
    /// Events from the most recent tick
    #[serde(skip)]
    pub events: Vec<GameEvent>,
    /// Next entity ID
    next_id: u32,
}

impl GameState {
    /// Create a new run with the given seed and settings
    pub fn new(seed: u64, settings: RunSettings, resolver: &dyn ChordResolver) -> Self {
        let chord_pool = ChordPool::resolve(&settings.difficulty.allowed_chords, resolver);
        let player = PlayerState::new(&settings);
        let mut state = Self {
            rng: SimRng::new(seed),
            phase: GamePhase::Playing,
            time_ticks: 0,
            elapsed: 0.0,
            player,
            enemies: Vec::new(),
            projectiles: Vec::new(),
            enemy_projectiles: Vec::new(),
            coins: Vec::new(),
            wave: WaveState::new(0.0),
            slots: Channel::ALL.map(CodeSlot::new),
            chord_pool,
            schedule: Schedule::default(),
            spawn: SpawnState::default(),
            catalog: BonusCatalog::standard(),
            pending_level_ups: 0,
            level_up_offer: None,
            fire_aura_timer: 0.0,
            enemies_defeated: 0,
            summary: None,
            events: Vec::new(),
            next_id: 1,
            settings,
        };

        let magic_enabled = super::magic::any_castable(&state.player);
        for slot in state.slots.iter_mut() {
            slot.enabled = !slot.channel.is_magic() || magic_enabled;
            slot.rearm(&state.chord_pool, &mut state.rng);
        }

        state
    }

    /// Swap in a custom bonus catalog
    pub fn with_catalog(mut self, catalog: BonusCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    /// Allocate a new entity ID
    pub fn next_entity_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub fn slot(&self, channel: Channel) -> &CodeSlot {
        &self.slots[channel.index()]
    }

    pub fn slot_mut(&mut self, channel: Channel) -> &mut CodeSlot {
        &mut self.slots[channel.index()]
    }

    /// Ensure entity lists are sorted by ID for deterministic iteration
    pub fn normalize_order(&mut self) {
        self.enemies.sort_by_key(|e| e.id);
        self.projectiles.sort_by_key(|p| p.id);
        self.enemy_projectiles.sort_by_key(|p| p.id);
        self.coins.sort_by_key(|c| c.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::chord::BasicChordResolver;

    #[test]
    fn test_direction_from_vec() {
        assert_eq!(Direction8::from_vec(Vec2::new(1.0, 0.0)), Some(Direction8::Right));
        assert_eq!(Direction8::from_vec(Vec2::new(0.0, 1.0)), Some(Direction8::Down));
        assert_eq!(Direction8::from_vec(Vec2::new(-1.0, -1.0)), Some(Direction8::UpLeft));
        assert_eq!(Direction8::from_vec(Vec2::ZERO), None);
    }

    #[test]
    fn test_stats_clamp() {
        let mut stats = Stats {
            hp: 900,
            max_hp: 9000,
            luck: 99,
            a_bullet_count: 0,
            ..Default::default()
        };
        stats.clamp_invariants();
        assert_eq!(stats.max_hp, MAX_HP_CAP);
        assert_eq!(stats.hp, MAX_HP_CAP);
        assert_eq!(stats.luck, MAX_LUCK);
        assert_eq!(stats.a_bullet_count, 1);
    }

    #[test]
    fn test_enemy_damage_clamps_at_zero() {
        let mut enemy = EnemyState {
            id: 1,
            pos: Vec2::ZERO,
            kind: EnemyKind::Slime,
            stats: EnemyStats { atk: 1, def: 0, hp: 5, max_hp: 5, speed: 10.0 },
            statuses: StatusTracker::default(),
            is_boss: false,
            knockback: Vec2::ZERO,
        };
        assert_eq!(enemy.apply_damage(12), 5);
        assert_eq!(enemy.stats.hp, 0);
        assert!(!enemy.is_alive());
    }

    #[test]
    fn test_new_state_arms_slots() {
        let state = GameState::new(7, RunSettings::default(), &BasicChordResolver);
        assert_eq!(state.phase, GamePhase::Playing);
        assert!(state.slot(Channel::A).chord.is_some());
        assert!(state.slot(Channel::A).enabled);
        // No magic learned yet
        assert!(!state.slot(Channel::C).enabled);
        assert!(!state.slot(Channel::D).enabled);
    }
}
