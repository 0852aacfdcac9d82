use std::fmt;

use chrono::{DateTime, Duration, Utc};

use crate::entities::skills::{SkillName, SkillValue};
use crate::rot::ledger::RotLedger;
use crate::rot::policy::{GainPolicy, RotPolicy};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GainStatus {
    ReadyToGain,
    InsufficientWait { remaining: Duration },
    MaxSkillGain { until_reset: Duration },
    /// Skill is below the threshold or the ruleset is legacy.
    NotApplicable,
}

impl GainStatus {
    pub fn permits_gain(self) -> bool {
        matches!(self, GainStatus::ReadyToGain | GainStatus::NotApplicable)
    }

    pub fn is_blocked(self) -> bool {
        !self.permits_gain()
    }

    /// Time left before the block lifts, rounded up to whole minutes.
    pub fn remaining_minutes(self) -> i64 {
        let remaining = match self {
            GainStatus::InsufficientWait { remaining } => remaining,
            GainStatus::MaxSkillGain { until_reset } => until_reset,
            _ => return 0,
        };
        let seconds = remaining.num_seconds().max(0);
        (seconds + 59) / 60
    }
}

impl fmt::Display for GainStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GainStatus::ReadyToGain => f.write_str("ReadyToGain"),
            GainStatus::InsufficientWait { .. } => {
                write!(f, "InsufficientWait ({} min remaining)", self.remaining_minutes())
            }
            GainStatus::MaxSkillGain { .. } => {
                write!(f, "MaxSkillGain ({} min until reset)", self.remaining_minutes())
            }
            GainStatus::NotApplicable => f.write_str("NotApplicable"),
        }
    }
}

/// Decides whether `skill` at `value` may gain at `now`. Reads the ledger as
/// is; callers bring it current first.
pub fn check_eligibility(
    ledger: &RotLedger,
    policy: &RotPolicy,
    skill: SkillName,
    value: SkillValue,
    now: DateTime<Utc>,
) -> GainStatus {
    if policy.gain_policy(value) == GainPolicy::Legacy {
        return GainStatus::NotApplicable;
    }
    let record = ledger.record(skill);
    if let Some(cap) = policy.daily_cap_for(value) {
        if record.gained_tenths >= cap {
            let until_reset = ledger
                .stored_limit_time()
                .map(|limit| (limit - now).max(Duration::zero()))
                .unwrap_or_else(Duration::zero);
            return GainStatus::MaxSkillGain { until_reset };
        }
    }
    let Some(last) = ledger.last_gain_at(skill) else {
        return GainStatus::ReadyToGain;
    };
    let wait = policy.wait_for(value);
    let elapsed = now - last;
    if elapsed < wait {
        return GainStatus::InsufficientWait {
            remaining: wait - elapsed,
        };
    }
    GainStatus::ReadyToGain
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::player::PlayerId;
    use crate::entities::skills::SkillSet;
    use crate::rot::ledger::LedgerScope;
    use crate::telemetry::logging::NullLog;
    use chrono::TimeZone;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    fn swords(points: u16) -> SkillValue {
        SkillValue::from_points(points)
    }

    fn engaged_ledger(policy: &RotPolicy, skills: &SkillSet) -> RotLedger {
        let scope = LedgerScope {
            player: PlayerId(1),
            policy,
            skills,
            log: &NullLog,
        };
        let mut ledger = RotLedger::new();
        ledger.ensure_current(start(), &scope);
        ledger.add_gain(SkillName::Swords, 1, start(), &scope);
        ledger.set_last_skill_gain(SkillName::Swords, start(), &scope);
        ledger
    }

    #[test]
    fn waits_out_the_band_cooldown() {
        let policy = RotPolicy::default();
        let skills = SkillSet::default();
        let ledger = engaged_ledger(&policy, &skills);

        let status = check_eligibility(
            &ledger,
            &policy,
            SkillName::Swords,
            swords(75),
            start() + Duration::minutes(4),
        );
        assert_eq!(
            status,
            GainStatus::InsufficientWait {
                remaining: Duration::minutes(1)
            }
        );
        assert_eq!(status.remaining_minutes(), 1);

        let status = check_eligibility(
            &ledger,
            &policy,
            SkillName::Swords,
            swords(75),
            start() + Duration::minutes(5) + Duration::seconds(1),
        );
        assert_eq!(status, GainStatus::ReadyToGain);
    }

    #[test]
    fn higher_band_waits_longer() {
        let policy = RotPolicy::default();
        let skills = SkillSet::default();
        let ledger = engaged_ledger(&policy, &skills);
        let now = start() + Duration::minutes(10);
        assert_eq!(
            check_eligibility(&ledger, &policy, SkillName::Swords, swords(95), now),
            GainStatus::InsufficientWait {
                remaining: Duration::minutes(2)
            }
        );
    }

    #[test]
    fn cap_reports_time_to_reset() {
        let policy = RotPolicy::default();
        let skills = SkillSet::default();
        let mut ledger = engaged_ledger(&policy, &skills);
        ledger.update_record(SkillName::Swords, |record| record.gained_tenths = 50);
        let now = start() + Duration::hours(20);
        assert_eq!(
            check_eligibility(&ledger, &policy, SkillName::Swords, swords(75), now),
            GainStatus::MaxSkillGain {
                until_reset: Duration::hours(4)
            }
        );
    }

    #[test]
    fn cap_wins_over_wait() {
        let policy = RotPolicy::default();
        let skills = SkillSet::default();
        let mut ledger = engaged_ledger(&policy, &skills);
        ledger.update_record(SkillName::Swords, |record| record.gained_tenths = 50);
        let status = check_eligibility(
            &ledger,
            &policy,
            SkillName::Swords,
            swords(75),
            start() + Duration::minutes(1),
        );
        assert!(matches!(status, GainStatus::MaxSkillGain { .. }));
    }

    #[test]
    fn below_threshold_is_not_applicable() {
        let policy = RotPolicy::default();
        let skills = SkillSet::default();
        let ledger = engaged_ledger(&policy, &skills);
        let status = check_eligibility(
            &ledger,
            &policy,
            SkillName::Swords,
            SkillValue(699),
            start(),
        );
        assert_eq!(status, GainStatus::NotApplicable);
        assert!(status.permits_gain());
    }

    #[test]
    fn check_leaves_ledger_untouched() {
        let policy = RotPolicy::default();
        let skills = SkillSet::default();
        let ledger = engaged_ledger(&policy, &skills);
        let before = ledger.clone();
        let _ = check_eligibility(
            &ledger,
            &policy,
            SkillName::Swords,
            swords(75),
            start() + Duration::days(5),
        );
        assert_eq!(ledger, before);
    }
}
