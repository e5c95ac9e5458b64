//! Level-up bonuses: catalog, eligibility, offers and application

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::chord::{self, Chord, ChordPool};
use super::magic::MagicKind;
use super::rng::RandomSource;
use super::state::PlayerState;
use crate::consts::*;
use crate::error::SimError;
use crate::settings::CharacterConfig;

/// Every bonus a level-up can grant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum BonusKind {
    AAtk,
    BAtk,
    CAtk,
    Speed,
    ReloadMagic,
    MaxHp,
    Def,
    Time,
    ABulletCount,
    Luck,
    Penetration,
    KnockbackBonus,
    RangeBonus,
    Deflect,
    MultiHit,
    ExpBonus,
    LastStand,
    PeakCondition,
    AutoSelect,
    Magic(MagicKind),
}

impl BonusKind {
    /// Only useful to a character that can cast
    pub fn is_magic_related(self) -> bool {
        matches!(
            self,
            BonusKind::Magic(_) | BonusKind::CAtk | BonusKind::ReloadMagic | BonusKind::Time
        )
    }

    /// Skill unlocks that are either owned or not
    pub fn is_unlock(self) -> bool {
        matches!(
            self,
            BonusKind::Penetration
                | BonusKind::RangeBonus
                | BonusKind::Deflect
                | BonusKind::LastStand
                | BonusKind::PeakCondition
                | BonusKind::AutoSelect
        )
    }
}

pub const ATTACK_BONUS_STEP: i32 = 2;
pub const MAX_HP_BONUS_STEP: i32 = 20;

/// Catalog entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BonusDef {
    pub kind: BonusKind,
    pub name: String,
    pub description: String,
    /// `None` for bonuses limited only by stat caps
    pub max_level: Option<u32>,
}

impl BonusDef {
    pub fn new(kind: BonusKind, name: &str, description: &str, max_level: Option<u32>) -> Self {
        Self {
            kind,
            name: name.to_string(),
            description: description.to_string(),
            max_level,
        }
    }
}

/// A validated, fixed set of bonuses
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BonusCatalog {
    entries: Vec<BonusDef>,
}

impl BonusCatalog {
    /// Validate and build a catalog. Malformed entries are programmer errors.
    pub fn new(entries: Vec<BonusDef>) -> Result<Self, SimError> {
        let mut seen = BTreeSet::new();
        for def in &entries {
            if !seen.insert(def.kind) {
                return Err(SimError::invariant(format!("duplicate bonus kind {:?}", def.kind)));
            }
            if def.max_level == Some(0) {
                return Err(SimError::invariant(format!("{:?} has max level 0", def.kind)));
            }
            if let BonusKind::Magic(_) = def.kind {
                match def.max_level {
                    Some(l) if l <= MAX_MAGIC_LEVEL as u32 => {}
                    other => {
                        return Err(SimError::invariant(format!(
                            "{:?} max level {other:?} exceeds {MAX_MAGIC_LEVEL}",
                            def.kind
                        )));
                    }
                }
            }
            if def.kind.is_unlock() && def.max_level != Some(1) {
                return Err(SimError::invariant(format!("{:?} is an unlock and must have max level 1", def.kind)));
            }
        }
        Ok(Self { entries })
    }

    /// The built-in catalog
    pub fn standard() -> Self {
        use BonusKind::*;
        let mut entries = vec![
            BonusDef::new(AAtk, "Sharp Shot", "+2 ranged attack", None),
            BonusDef::new(BAtk, "Heavy Blade", "+2 melee attack", None),
            BonusDef::new(CAtk, "Arcane Focus", "+2 magic attack", None),
            BonusDef::new(Speed, "Swift Feet", "+1 movement speed", Some(10)),
            BonusDef::new(ReloadMagic, "Quick Recall", "Shorter magic reload", Some(20)),
            BonusDef::new(MaxHp, "Vitality", "+20 max HP", None),
            BonusDef::new(Def, "Iron Skin", "+1 defence", None),
            BonusDef::new(Time, "Long Echo", "Longer magic effects", Some(20)),
            BonusDef::new(ABulletCount, "Spread Shot", "+1 bullet per volley", None),
            BonusDef::new(Luck, "Four Leaf", "+1 luck", Some(MAX_LUCK as u32)),
            BonusDef::new(Penetration, "Piercing", "Bullets pass through enemies", Some(1)),
            BonusDef::new(KnockbackBonus, "Impact", "Stronger knockback", Some(3)),
            BonusDef::new(RangeBonus, "Long Reach", "Longer bullet and melee range", Some(1)),
            BonusDef::new(Deflect, "Parry", "Melee destroys enemy shots", Some(1)),
            BonusDef::new(MultiHit, "Flurry", "Extra melee follow-ups", Some(3)),
            BonusDef::new(ExpBonus, "Scholar", "+10% experience", Some(10)),
            BonusDef::new(LastStand, "Last Stand", "Stronger at critical HP", Some(1)),
            BonusDef::new(PeakCondition, "Peak Condition", "Stronger at full HP", Some(1)),
            BonusDef::new(AutoSelect, "Autopilot", "Level-ups choose themselves", Some(1)),
        ];
        for kind in MagicKind::ALL {
            entries.push(BonusDef::new(
                Magic(kind),
                kind.name(),
                "Learn or strengthen a spell",
                Some(MAX_MAGIC_LEVEL as u32),
            ));
        }
        Self { entries }
    }

    pub fn entries(&self) -> &[BonusDef] {
        &self.entries
    }

    pub fn get(&self, kind: BonusKind) -> Option<&BonusDef> {
        self.entries.iter().find(|d| d.kind == kind)
    }

    /// Entries the player may still be offered
    pub fn eligible(&self, player: &PlayerState, character: &CharacterConfig) -> Vec<&BonusDef> {
        self.entries
            .iter()
            .filter(|def| is_eligible(def, player, character))
            .collect()
    }
}

/// The player's current level in a bonus kind
pub fn current_level(kind: BonusKind, player: &PlayerState) -> u32 {
    let skills = &player.skills;
    match kind {
        BonusKind::Penetration => skills.penetration as u32,
        BonusKind::RangeBonus => skills.range_bonus as u32,
        BonusKind::Deflect => skills.deflect as u32,
        BonusKind::LastStand => skills.last_stand as u32,
        BonusKind::PeakCondition => skills.peak_condition as u32,
        BonusKind::AutoSelect => skills.auto_select as u32,
        BonusKind::KnockbackBonus => skills.knockback_bonus as u32,
        BonusKind::MultiHit => skills.multi_hit as u32,
        BonusKind::ExpBonus => skills.exp_bonus as u32,
        BonusKind::Magic(m) => player.magics.level(m) as u32,
        _ => player.bonus_count(kind),
    }
}

fn is_eligible(def: &BonusDef, player: &PlayerState, character: &CharacterConfig) -> bool {
    if character.excluded_bonuses.contains(&def.kind) {
        return false;
    }
    if !character.allow_magic && def.kind.is_magic_related() {
        return false;
    }
    let stats = &player.stats;
    match def.kind {
        BonusKind::MaxHp if stats.max_hp >= MAX_HP_CAP => return false,
        BonusKind::ABulletCount if stats.a_bullet_count >= MAX_A_BULLET_COUNT => return false,
        BonusKind::Luck if stats.luck >= MAX_LUCK => return false,
        _ => {}
    }
    match def.max_level {
        Some(max) => current_level(def.kind, player) < max,
        None => true,
    }
}

/// One level-up choice with its chord gate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelUpBonus {
    pub kind: BonusKind,
    pub name: String,
    pub description: String,
    pub max_level: Option<u32>,
    pub chord: Chord,
    pub current_level: u32,
}

impl LevelUpBonus {
    fn new(def: &BonusDef, chord: Chord, player: &PlayerState) -> Self {
        Self {
            kind: def.kind,
            name: def.name.clone(),
            description: def.description.clone(),
            max_level: def.max_level,
            chord,
            current_level: current_level(def.kind, player),
        }
    }
}

/// Draw up to `character.bonus_choices` options, each with a distinct chord.
///
/// Kinds are drawn without replacement first. If that leaves the offer short
/// (few eligible kinds, or a chord that did not resolve), kinds may repeat.
/// A spent chord pool ends the draw early, so the offer can be smaller than
/// requested.
pub fn generate_level_up_options(
    catalog: &BonusCatalog,
    player: &PlayerState,
    character: &CharacterConfig,
    pool: &ChordPool,
    rng: &mut dyn RandomSource,
) -> Vec<LevelUpBonus> {
    let wanted = character.bonus_choices;
    let eligible = catalog.eligible(player, character);
    let mut remaining = eligible.clone();
    let mut used_chords: Vec<String> = Vec::new();
    let mut options = Vec::with_capacity(wanted);

    while options.len() < wanted && !remaining.is_empty() {
        let def = remaining.remove(rng.index(remaining.len()));
        let Some((id, chord)) = pool.draw_excluding(&used_chords, rng) else {
            return options;
        };
        used_chords.push(id);
        if let Some(chord) = chord {
            options.push(LevelUpBonus::new(def, chord, player));
        }
    }

    while options.len() < wanted && !eligible.is_empty() {
        let def = eligible[rng.index(eligible.len())];
        let Some((id, chord)) = pool.draw_excluding(&used_chords, rng) else {
            break;
        };
        used_chords.push(id);
        if let Some(chord) = chord {
            options.push(LevelUpBonus::new(def, chord, player));
        }
    }

    options
}

/// Permanently apply one bonus to the player
pub fn apply_bonus(kind: BonusKind, player: &mut PlayerState) {
    let stats = &mut player.stats;
    let skills = &mut player.skills;
    match kind {
        BonusKind::AAtk => stats.a_atk += ATTACK_BONUS_STEP,
        BonusKind::BAtk => stats.b_atk += ATTACK_BONUS_STEP,
        BonusKind::CAtk => stats.c_atk += ATTACK_BONUS_STEP,
        BonusKind::Speed => stats.speed += 1,
        BonusKind::ReloadMagic => stats.reload_magic += 1,
        BonusKind::MaxHp => {
            stats.max_hp += MAX_HP_BONUS_STEP;
            stats.hp += MAX_HP_BONUS_STEP;
        }
        BonusKind::Def => stats.def += 1,
        BonusKind::Time => stats.time += 1,
        BonusKind::ABulletCount => stats.a_bullet_count += 1,
        BonusKind::Luck => stats.luck += 1,
        BonusKind::Penetration => skills.penetration = true,
        BonusKind::KnockbackBonus => skills.knockback_bonus = (skills.knockback_bonus + 1).min(3),
        BonusKind::RangeBonus => skills.range_bonus = true,
        BonusKind::Deflect => skills.deflect = true,
        BonusKind::MultiHit => skills.multi_hit = (skills.multi_hit + 1).min(3),
        BonusKind::ExpBonus => skills.exp_bonus = (skills.exp_bonus + 1).min(10),
        BonusKind::LastStand => skills.last_stand = true,
        BonusKind::PeakCondition => skills.peak_condition = true,
        BonusKind::AutoSelect => skills.auto_select = true,
        BonusKind::Magic(m) => {
            let level = player.magics.level(m);
            player.magics.set_level(m, level + 1);
        }
    }
    player.stats.clamp_invariants();
    player.record_bonus(kind);
    log::debug!("Bonus applied: {kind:?}");
}

/// Pick one eligible kind at random and apply it straight away
pub fn auto_select_bonus(
    catalog: &BonusCatalog,
    player: &mut PlayerState,
    character: &CharacterConfig,
    rng: &mut dyn RandomSource,
) -> Option<BonusKind> {
    let eligible = catalog.eligible(player, character);
    if eligible.is_empty() {
        return None;
    }
    let kind = eligible[rng.index(eligible.len())].kind;
    apply_bonus(kind, player);
    Some(kind)
}

/// An open level-up choice. Notes are matched against every option at once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelUpOffer {
    pub options: Vec<LevelUpBonus>,
    /// Pitch classes played toward each option
    pub progress: Vec<BTreeSet<u8>>,
}

impl LevelUpOffer {
    pub fn new(options: Vec<LevelUpBonus>) -> Self {
        let progress = vec![BTreeSet::new(); options.len()];
        Self { options, progress }
    }

    /// Feed one pitch class. Returns the index of the first option it completed.
    pub fn on_note(&mut self, pc: u8) -> Option<usize> {
        let mut completed = None;
        for (i, (option, progress)) in self.options.iter().zip(self.progress.iter_mut()).enumerate() {
            if chord::accept_note(&option.chord, progress, pc) && completed.is_none() {
                completed = Some(i);
            }
        }
        completed
    }

    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }
}
