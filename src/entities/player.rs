use serde::{Deserialize, Serialize};

use crate::entities::skills::{SkillName, SkillSet};
use crate::entities::stats::Stats;
use crate::rot::ledger::RotLedger;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlayerId(pub u32);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerState {
    pub id: PlayerId,
    pub name: String,
    pub skills: SkillSet,
    pub stats: Stats,
    pub rot: RotLedger,
    /// Skill whose RoT decisions are echoed back to the player. Not persisted.
    pub rot_echo: Option<SkillName>,
}

impl PlayerState {
    pub fn new(id: PlayerId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            skills: SkillSet::default(),
            stats: Stats::default(),
            rot: RotLedger::new(),
            rot_echo: None,
        }
    }

    pub fn echoes(&self, skill: SkillName) -> bool {
        self.rot_echo == Some(skill)
    }
}
