use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::entities::stats::StatKind;
use crate::error::RotError;

/// Stable skill identifiers. The discriminant is the slot index used by every
/// per-skill array, persisted ones included, so new skills go at the end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum SkillName {
    Alchemy = 0,
    Anatomy,
    AnimalLore,
    ItemId,
    ArmsLore,
    Parry,
    Begging,
    Blacksmith,
    Fletching,
    Peacemaking,
    Camping,
    Carpentry,
    Cartography,
    Cooking,
    DetectHidden,
    Discordance,
    EvalInt,
    Healing,
    Fishing,
    Forensics,
    Herding,
    Hiding,
    Provocation,
    Inscribe,
    Lockpicking,
    Magery,
    MagicResist,
    Tactics,
    Snooping,
    Musicianship,
    Poisoning,
    Archery,
    SpiritSpeak,
    Stealing,
    Tailoring,
    AnimalTaming,
    TasteId,
    Tinkering,
    Tracking,
    Veterinary,
    Swords,
    Macing,
    Fencing,
    Wrestling,
    Lumberjacking,
    Mining,
    Meditation,
    Stealth,
    RemoveTrap,
}

pub const SKILL_COUNT: usize = 49;

impl SkillName {
    pub const ALL: [SkillName; SKILL_COUNT] = [
        SkillName::Alchemy,
        SkillName::Anatomy,
        SkillName::AnimalLore,
        SkillName::ItemId,
        SkillName::ArmsLore,
        SkillName::Parry,
        SkillName::Begging,
        SkillName::Blacksmith,
        SkillName::Fletching,
        SkillName::Peacemaking,
        SkillName::Camping,
        SkillName::Carpentry,
        SkillName::Cartography,
        SkillName::Cooking,
        SkillName::DetectHidden,
        SkillName::Discordance,
        SkillName::EvalInt,
        SkillName::Healing,
        SkillName::Fishing,
        SkillName::Forensics,
        SkillName::Herding,
        SkillName::Hiding,
        SkillName::Provocation,
        SkillName::Inscribe,
        SkillName::Lockpicking,
        SkillName::Magery,
        SkillName::MagicResist,
        SkillName::Tactics,
        SkillName::Snooping,
        SkillName::Musicianship,
        SkillName::Poisoning,
        SkillName::Archery,
        SkillName::SpiritSpeak,
        SkillName::Stealing,
        SkillName::Tailoring,
        SkillName::AnimalTaming,
        SkillName::TasteId,
        SkillName::Tinkering,
        SkillName::Tracking,
        SkillName::Veterinary,
        SkillName::Swords,
        SkillName::Macing,
        SkillName::Fencing,
        SkillName::Wrestling,
        SkillName::Lumberjacking,
        SkillName::Mining,
        SkillName::Meditation,
        SkillName::Stealth,
        SkillName::RemoveTrap,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn name(self) -> &'static str {
        match self {
            SkillName::Alchemy => "Alchemy",
            SkillName::Anatomy => "Anatomy",
            SkillName::AnimalLore => "AnimalLore",
            SkillName::ItemId => "ItemID",
            SkillName::ArmsLore => "ArmsLore",
            SkillName::Parry => "Parry",
            SkillName::Begging => "Begging",
            SkillName::Blacksmith => "Blacksmith",
            SkillName::Fletching => "Fletching",
            SkillName::Peacemaking => "Peacemaking",
            SkillName::Camping => "Camping",
            SkillName::Carpentry => "Carpentry",
            SkillName::Cartography => "Cartography",
            SkillName::Cooking => "Cooking",
            SkillName::DetectHidden => "DetectHidden",
            SkillName::Discordance => "Discordance",
            SkillName::EvalInt => "EvalInt",
            SkillName::Healing => "Healing",
            SkillName::Fishing => "Fishing",
            SkillName::Forensics => "Forensics",
            SkillName::Herding => "Herding",
            SkillName::Hiding => "Hiding",
            SkillName::Provocation => "Provocation",
            SkillName::Inscribe => "Inscribe",
            SkillName::Lockpicking => "Lockpicking",
            SkillName::Magery => "Magery",
            SkillName::MagicResist => "MagicResist",
            SkillName::Tactics => "Tactics",
            SkillName::Snooping => "Snooping",
            SkillName::Musicianship => "Musicianship",
            SkillName::Poisoning => "Poisoning",
            SkillName::Archery => "Archery",
            SkillName::SpiritSpeak => "SpiritSpeak",
            SkillName::Stealing => "Stealing",
            SkillName::Tailoring => "Tailoring",
            SkillName::AnimalTaming => "AnimalTaming",
            SkillName::TasteId => "TasteID",
            SkillName::Tinkering => "Tinkering",
            SkillName::Tracking => "Tracking",
            SkillName::Veterinary => "Veterinary",
            SkillName::Swords => "Swords",
            SkillName::Macing => "Macing",
            SkillName::Fencing => "Fencing",
            SkillName::Wrestling => "Wrestling",
            SkillName::Lumberjacking => "Lumberjacking",
            SkillName::Mining => "Mining",
            SkillName::Meditation => "Meditation",
            SkillName::Stealth => "Stealth",
            SkillName::RemoveTrap => "RemoveTrap",
        }
    }

    /// Stat that a blocked gain of this skill may raise instead.
    pub fn governing_stat(self) -> StatKind {
        match self {
            SkillName::Parry
            | SkillName::Blacksmith
            | SkillName::Camping
            | SkillName::Carpentry
            | SkillName::Fishing
            | SkillName::Herding
            | SkillName::Tactics
            | SkillName::Swords
            | SkillName::Macing
            | SkillName::Wrestling
            | SkillName::Lumberjacking
            | SkillName::Mining
            | SkillName::ArmsLore => StatKind::Str,
            SkillName::Fletching
            | SkillName::Hiding
            | SkillName::Lockpicking
            | SkillName::Snooping
            | SkillName::Musicianship
            | SkillName::Poisoning
            | SkillName::Archery
            | SkillName::Stealing
            | SkillName::Tailoring
            | SkillName::Tinkering
            | SkillName::Fencing
            | SkillName::Stealth
            | SkillName::RemoveTrap
            | SkillName::Healing
            | SkillName::Cooking
            | SkillName::Begging => StatKind::Dex,
            _ => StatKind::Int,
        }
    }
}

impl fmt::Display for SkillName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SkillName {
    type Err = RotError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let wanted: String = value
            .chars()
            .filter(|ch| !ch.is_whitespace() && *ch != '_' && *ch != '-')
            .collect();
        SkillName::ALL
            .iter()
            .copied()
            .find(|skill| skill.name().eq_ignore_ascii_case(&wanted))
            .ok_or_else(|| RotError::UnknownSkill(value.to_string()))
    }
}

/// Fixed-point skill value with 0.1 resolution (`755` is 75.5).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SkillValue(pub u16);

impl SkillValue {
    pub const ZERO: SkillValue = SkillValue(0);

    pub fn from_points(points: u16) -> Self {
        Self(points.saturating_mul(10))
    }

    pub fn from_f64(points: f64) -> Self {
        let tenths = (points * 10.0).round().clamp(0.0, f64::from(u16::MAX));
        Self(tenths as u16)
    }

    pub fn tenths(self) -> u16 {
        self.0
    }

    pub fn as_f64(self) -> f64 {
        f64::from(self.0) / 10.0
    }

    pub fn saturating_add_tenths(self, tenths: u16) -> Self {
        Self(self.0.saturating_add(tenths))
    }
}

impl fmt::Display for SkillValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.0 / 10, self.0 % 10)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkillLock {
    #[default]
    Up,
    Down,
    Locked,
}

impl SkillLock {
    pub fn to_byte(self) -> u8 {
        match self {
            SkillLock::Up => 0,
            SkillLock::Down => 1,
            SkillLock::Locked => 2,
        }
    }

    pub fn from_byte(value: u8) -> Self {
        match value {
            1 => SkillLock::Down,
            2 => SkillLock::Locked,
            _ => SkillLock::Up,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Skill {
    pub name: SkillName,
    pub base: SkillValue,
    pub lock: SkillLock,
}

impl Skill {
    pub fn new(name: SkillName) -> Self {
        Self {
            name,
            base: SkillValue::ZERO,
            lock: SkillLock::Up,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillSet {
    skills: Vec<Skill>,
}

impl Default for SkillSet {
    fn default() -> Self {
        Self {
            skills: SkillName::ALL.iter().copied().map(Skill::new).collect(),
        }
    }
}

impl SkillSet {
    pub fn get(&self, skill: SkillName) -> Option<&Skill> {
        self.skills.get(skill.index())
    }

    pub fn get_mut(&mut self, skill: SkillName) -> Option<&mut Skill> {
        self.skills.get_mut(skill.index())
    }

    /// Current value, or zero when the slot is missing.
    pub fn value(&self, skill: SkillName) -> SkillValue {
        self.get(skill).map(|entry| entry.base).unwrap_or_default()
    }

    pub fn lock(&self, skill: SkillName) -> SkillLock {
        self.get(skill).map(|entry| entry.lock).unwrap_or_default()
    }

    pub fn set_value(&mut self, skill: SkillName, value: SkillValue) {
        if let Some(entry) = self.get_mut(skill) {
            entry.base = value;
        }
    }

    pub fn set_lock(&mut self, skill: SkillName, lock: SkillLock) {
        if let Some(entry) = self.get_mut(skill) {
            entry.lock = lock;
        }
    }

    pub fn total(&self) -> u32 {
        self.skills.iter().map(|entry| u32::from(entry.base.0)).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Skill> {
        self.skills.iter()
    }
}
