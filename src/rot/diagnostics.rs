//! Read-only views of a player's ledger for operators and the player.
//!
//! Each query brings the ledger current first, so nothing from an expired
//! cycle is ever reported. The possible reset is the only side effect.

use chrono::{DateTime, Utc};

use crate::entities::player::PlayerState;
use crate::entities::skills::{SkillName, SkillValue};
use crate::rot::eligibility::{check_eligibility, GainStatus};
use crate::rot::gain::SkillGainController;
use crate::rot::policy::GainPolicy;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkillSnapshot {
    pub skill: SkillName,
    pub value: SkillValue,
    pub policy: GainPolicy,
    pub status: GainStatus,
    pub gained_tenths: u8,
    pub daily_cap: Option<u8>,
    pub credit_minutes: u8,
    pub last_gain: Option<DateTime<Utc>>,
    pub next_gain: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerSnapshot {
    pub epoch: DateTime<Utc>,
    pub limit_time: DateTime<Utc>,
    pub stat_increase: u8,
    pub stat_cap: u8,
    /// Skills under RoT or with activity this cycle, in table order.
    pub skills: Vec<SkillSnapshot>,
}

impl<'a> SkillGainController<'a> {
    /// Earliest time `skill` may gain again; `None` when RoT does not govern it.
    pub fn next_gain_time(
        &self,
        player: &mut PlayerState,
        skill: SkillName,
        now: DateTime<Utc>,
    ) -> Option<DateTime<Utc>> {
        let status = self.check(player, skill, now);
        next_gain_from(status, now)
    }

    /// Skills with banked rollover credit, in table order.
    pub fn banked_credits(&self, player: &mut PlayerState, now: DateTime<Utc>) -> Vec<(SkillName, u8)> {
        let scope = self.scope(player.id, &player.skills);
        player.rot.ensure_current(now, &scope);
        SkillName::ALL
            .iter()
            .copied()
            .filter_map(|skill| {
                let credit = player.rot.record(skill).credit_minutes;
                (credit > 0).then_some((skill, credit))
            })
            .collect()
    }

    pub fn skill_snapshot(
        &self,
        player: &mut PlayerState,
        skill: SkillName,
        now: DateTime<Utc>,
    ) -> SkillSnapshot {
        let status = self.check(player, skill, now);
        self.snapshot_current(player, skill, status, now)
    }

    pub fn ledger_snapshot(&self, player: &mut PlayerState, now: DateTime<Utc>) -> LedgerSnapshot {
        let (epoch, limit_time, stat_increase) = {
            let scope = self.scope(player.id, &player.skills);
            let epoch = player.rot.skill_gain_epoch(now, &scope);
            let limit_time = player.rot.limit_time(now, &scope);
            let stat_increase = player.rot.stat_increase(now, &scope);
            (epoch, limit_time, stat_increase)
        };
        let player_ref: &PlayerState = player;
        let skills = SkillName::ALL
            .iter()
            .copied()
            .filter_map(|skill| {
                let value = player_ref.skills.value(skill);
                let record = player_ref.rot.record(skill);
                let governed = self.policy().gain_policy(value) == GainPolicy::RateOverTime;
                if !governed && record.gained_tenths == 0 && record.credit_minutes == 0 {
                    return None;
                }
                let status = check_eligibility(&player_ref.rot, self.policy(), skill, value, now);
                Some(self.snapshot_current(player_ref, skill, status, now))
            })
            .collect();
        LedgerSnapshot {
            epoch,
            limit_time,
            stat_increase,
            stat_cap: self.policy().stat_cap_for_cycle(),
            skills,
        }
    }

    fn snapshot_current(
        &self,
        player: &PlayerState,
        skill: SkillName,
        status: GainStatus,
        now: DateTime<Utc>,
    ) -> SkillSnapshot {
        let value = player.skills.value(skill);
        let record = player.rot.record(skill);
        SkillSnapshot {
            skill,
            value,
            policy: self.policy().gain_policy(value),
            status,
            gained_tenths: record.gained_tenths,
            daily_cap: self.policy().daily_cap_for(value),
            credit_minutes: record.credit_minutes,
            last_gain: player.rot.last_gain_at(skill),
            next_gain: next_gain_from(status, now),
        }
    }
}

fn next_gain_from(status: GainStatus, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    match status {
        GainStatus::ReadyToGain => Some(now),
        GainStatus::InsufficientWait { remaining } => Some(now + remaining),
        GainStatus::MaxSkillGain { until_reset } => Some(now + until_reset),
        GainStatus::NotApplicable => None,
    }
}
