use chrono::{DateTime, Duration, Utc};
use rand::Rng;

use crate::entities::player::{PlayerId, PlayerState};
use crate::entities::skills::{SkillLock, SkillName, SkillSet, SkillValue};
use crate::entities::stats::StatKind;
use crate::rot::eligibility::{check_eligibility, GainStatus};
use crate::rot::ledger::{format_tenths, LedgerScope};
use crate::rot::policy::{GainPolicy, RotPolicy};
use crate::telemetry::logging::{RotLog, RotLogCategory, RotLogEntry};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GainOutcome {
    Gained { policy: GainPolicy, applied: u16 },
    Blocked(GainStatus),
    Locked,
    AtSkillCap,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatGain {
    pub stat: StatKind,
    pub value: u16,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GainReport {
    pub skill: SkillName,
    pub outcome: GainOutcome,
    pub stat_gain: Option<StatGain>,
    pub echo: Option<String>,
}

impl GainReport {
    pub fn gained(&self) -> bool {
        matches!(self.outcome, GainOutcome::Gained { applied, .. } if applied > 0)
    }
}

/// Entry point for skill gains that already passed the use-skill roll.
#[derive(Clone, Copy)]
pub struct SkillGainController<'a> {
    policy: &'a RotPolicy,
    log: &'a dyn RotLog,
}

impl<'a> SkillGainController<'a> {
    pub fn new(policy: &'a RotPolicy, log: &'a dyn RotLog) -> Self {
        Self { policy, log }
    }

    pub fn policy(&self) -> &'a RotPolicy {
        self.policy
    }

    pub fn log(&self) -> &'a dyn RotLog {
        self.log
    }

    pub(crate) fn scope<'s>(&self, player: PlayerId, skills: &'s SkillSet) -> LedgerScope<'s>
    where
        'a: 's,
    {
        LedgerScope {
            player,
            policy: self.policy,
            skills,
            log: self.log,
        }
    }

    /// Current eligibility of `skill`, after bringing the ledger current.
    /// Skills under the legacy policy never touch the ledger, so a player who
    /// never reaches RoT keeps an unengaged ledger.
    pub fn check(&self, player: &mut PlayerState, skill: SkillName, now: DateTime<Utc>) -> GainStatus {
        let value = player.skills.value(skill);
        if self.policy.gain_policy(value) == GainPolicy::Legacy {
            return GainStatus::NotApplicable;
        }
        let scope = self.scope(player.id, &player.skills);
        player.rot.ensure_current(now, &scope);
        check_eligibility(&player.rot, self.policy, skill, value, now)
    }

    /// Applies a gain of `delta_tenths` to `skill` if the system permits it.
    /// Blocked RoT gains fall back to a stat gain roll. A zero delta changes
    /// nothing and reports `Gained` with nothing applied.
    pub fn try_gain<R: Rng + ?Sized>(
        &self,
        player: &mut PlayerState,
        skill: SkillName,
        delta_tenths: u16,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> GainReport {
        if delta_tenths == 0 {
            return GainReport {
                skill,
                outcome: GainOutcome::Gained {
                    policy: self.policy.gain_policy(player.skills.value(skill)),
                    applied: 0,
                },
                stat_gain: None,
                echo: None,
            };
        }
        let status = self.check(player, skill, now);
        let value = player.skills.value(skill);
        let delta = delta_tenths;

        let outcome = if player.skills.lock(skill) != SkillLock::Up {
            GainOutcome::Locked
        } else if value >= self.policy.skill_cap {
            GainOutcome::AtSkillCap
        } else {
            match status {
                GainStatus::NotApplicable => {
                    let applied = self.raise_skill(&mut player.skills, skill, delta);
                    GainOutcome::Gained {
                        policy: GainPolicy::Legacy,
                        applied,
                    }
                }
                GainStatus::ReadyToGain => self.apply_rot_gain(player, skill, delta, now),
                blocked => {
                    self.log_block(player.id, skill, blocked, now);
                    GainOutcome::Blocked(blocked)
                }
            }
        };

        let stat_gain = match outcome {
            GainOutcome::Blocked(_) => self.offer_stat_gain(player, skill, now, rng),
            _ => None,
        };
        let echo = if player.echoes(skill) {
            Some(self.echo_line(player, skill, outcome, stat_gain))
        } else {
            None
        };
        GainReport {
            skill,
            outcome,
            stat_gain,
            echo,
        }
    }

    fn apply_rot_gain(
        &self,
        player: &mut PlayerState,
        skill: SkillName,
        delta: u16,
        now: DateTime<Utc>,
    ) -> GainOutcome {
        let value = player.skills.value(skill);
        let cap = self.policy.daily_cap_for(value).unwrap_or(u8::MAX);
        let gained = player.rot.record(skill).gained_tenths;
        let allowance = u16::from(cap.saturating_sub(gained));
        let headroom = self.policy.skill_cap.tenths().saturating_sub(value.tenths());
        let applied = delta.min(allowance).min(headroom);
        if applied == 0 {
            let until_reset = player
                .rot
                .stored_limit_time()
                .map(|limit| (limit - now).max(Duration::zero()))
                .unwrap_or_else(Duration::zero);
            return GainOutcome::Blocked(GainStatus::MaxSkillGain { until_reset });
        }

        {
            let scope = self.scope(player.id, &player.skills);
            player.rot.add_gain(skill, applied as u8, now, &scope);
            player.rot.set_last_skill_gain(skill, now, &scope);
        }
        let new_value = value.saturating_add_tenths(applied);
        player.skills.set_value(skill, new_value);
        let total = player.rot.record(skill).gained_tenths;
        self.log.record(&RotLogEntry::new(
            now,
            RotLogCategory::SkillGain,
            player.id,
            Some(skill),
            format!(
                "{} -> {}, {}/{} this cycle",
                value,
                new_value,
                format_tenths(total),
                format_tenths(cap)
            ),
        ));
        GainOutcome::Gained {
            policy: GainPolicy::RateOverTime,
            applied,
        }
    }

    fn raise_skill(&self, skills: &mut SkillSet, skill: SkillName, delta: u16) -> u16 {
        let value = skills.value(skill);
        let new_value = SkillValue(
            value
                .tenths()
                .saturating_add(delta)
                .min(self.policy.skill_cap.tenths().max(value.tenths())),
        );
        skills.set_value(skill, new_value);
        new_value.tenths() - value.tenths()
    }

    fn log_block(&self, player: PlayerId, skill: SkillName, status: GainStatus, now: DateTime<Utc>) {
        let (category, message) = match status {
            GainStatus::InsufficientWait { .. } => (
                RotLogCategory::InsufficientWait,
                format!("{} min until next gain", status.remaining_minutes()),
            ),
            GainStatus::MaxSkillGain { .. } => (
                RotLogCategory::MaxSkillGain,
                format!("daily cap reached, {} min until reset", status.remaining_minutes()),
            ),
            _ => return,
        };
        self.log.record(&RotLogEntry::new(
            now,
            category,
            player,
            Some(skill),
            message,
        ));
    }

    /// Rolls for a point in the skill's governing stat, bounded by the daily
    /// RoT stat allowance and the usual stat caps.
    pub fn offer_stat_gain<R: Rng + ?Sized>(
        &self,
        player: &mut PlayerState,
        skill: SkillName,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> Option<StatGain> {
        let stat = skill.governing_stat();
        let scope = self.scope(player.id, &player.skills);
        if player.rot.stat_increase(now, &scope) >= self.policy.stat_cap_for_cycle() {
            return None;
        }
        if !player
            .stats
            .can_raise(stat, self.policy.stat_cap, self.policy.total_stat_cap)
        {
            return None;
        }
        let chance = self.policy.stat_gain_chance;
        if chance.is_nan() || chance <= 0.0 || !rng.gen_bool(chance.min(1.0)) {
            return None;
        }
        let count = player.rot.add_stat_increase(now, &scope);
        let value = player.stats.get(stat).saturating_add(1);
        player.stats.set(stat, value);
        self.log.record(&RotLogEntry::new(
            now,
            RotLogCategory::StatGain,
            player.id,
            Some(skill),
            format!(
                "{} -> {}, {}/{} this cycle",
                stat,
                value,
                count,
                self.policy.stat_cap_for_cycle()
            ),
        ));
        Some(StatGain { stat, value })
    }

    fn echo_line(
        &self,
        player: &PlayerState,
        skill: SkillName,
        outcome: GainOutcome,
        stat_gain: Option<StatGain>,
    ) -> String {
        let mut line = match outcome {
            GainOutcome::Gained {
                policy: GainPolicy::RateOverTime,
                applied,
            } => {
                let value = player.skills.value(skill);
                let cap = self.policy.daily_cap_for(value).unwrap_or(0);
                format!(
                    "RoT {}: +{} to {} ({}/{} today)",
                    skill,
                    SkillValue(applied),
                    value,
                    format_tenths(player.rot.record(skill).gained_tenths),
                    format_tenths(cap)
                )
            }
            GainOutcome::Gained { applied, .. } => format!(
                "RoT {}: +{} to {} (below threshold, uncapped)",
                skill,
                SkillValue(applied),
                player.skills.value(skill)
            ),
            GainOutcome::Blocked(status) => format!("RoT {}: {}", skill, status),
            GainOutcome::Locked => format!("RoT {}: skill is not set to rise", skill),
            GainOutcome::AtSkillCap => format!("RoT {}: at skill cap", skill),
        };
        if let Some(gain) = stat_gain {
            line.push_str(&format!(", {} rose to {}", gain.stat, gain.value));
        }
        line
    }
}
