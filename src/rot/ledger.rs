//! Per-player skill gain ledger.
//!
//! Gain times are stored as whole minutes after `skill_gain_epoch`, daily
//! gains in tenths of a skill point. Both live in flat arrays indexed by
//! [`SkillName`] so they can be written out compactly; everything else goes
//! through [`SkillGainRecord`].
//!
//! Every accessor that takes a [`LedgerScope`] first runs
//! [`RotLedger::ensure_current`], so a ledger that sat idle across one or more
//! cycle boundaries resets itself on first touch.

use chrono::{DateTime, Duration, Utc};

use crate::entities::player::PlayerId;
use crate::entities::skills::{SkillName, SkillSet, SKILL_COUNT};
use crate::error::{RotError, RotResult};
use crate::rot::policy::RotPolicy;
use crate::telemetry::logging::{RotLog, RotLogCategory, RotLogEntry};

/// Collaborators a ledger needs to reset itself.
#[derive(Clone, Copy)]
pub struct LedgerScope<'a> {
    pub player: PlayerId,
    pub policy: &'a RotPolicy,
    pub skills: &'a SkillSet,
    pub log: &'a dyn RotLog,
}

impl<'a> LedgerScope<'a> {
    pub fn emit(
        &self,
        at: DateTime<Utc>,
        category: RotLogCategory,
        skill: Option<SkillName>,
        message: impl Into<String>,
    ) {
        self.log
            .record(&RotLogEntry::new(at, category, self.player, skill, message));
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SkillGainRecord {
    /// Gained this cycle, tenths of a point.
    pub gained_tenths: u8,
    /// Minutes after the epoch of the last gain.
    pub last_gain_offset: u16,
    /// Minutes of wait already served before the last reset.
    pub credit_minutes: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotLedger {
    skill_gain_epoch: Option<DateTime<Utc>>,
    limit_time: Option<DateTime<Utc>>,
    stat_increase: u8,
    gains: Vec<u8>,
    last_gain: Vec<u16>,
    credits: Vec<u8>,
}

impl Default for RotLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl RotLedger {
    pub fn new() -> Self {
        Self::with_skill_count(SKILL_COUNT)
    }

    pub fn with_skill_count(count: usize) -> Self {
        Self {
            skill_gain_epoch: None,
            limit_time: None,
            stat_increase: 0,
            gains: vec![0; count],
            last_gain: vec![0; count],
            credits: vec![0; count],
        }
    }

    /// Rebuilds a ledger from persisted fields. Credits always start empty.
    pub fn from_stored(
        skill_gain_epoch: Option<DateTime<Utc>>,
        limit_time: Option<DateTime<Utc>>,
        stat_increase: u8,
        gains: Vec<u8>,
        last_gain: Vec<u16>,
    ) -> Self {
        let count = gains.len().max(last_gain.len());
        let mut ledger = Self {
            skill_gain_epoch,
            limit_time,
            stat_increase,
            gains,
            last_gain,
            credits: Vec::new(),
        };
        ledger.resize(count);
        ledger
    }

    /// Fits every per-skill array to `count` slots. Existing slots keep their
    /// index; new ones start empty.
    pub fn resize(&mut self, count: usize) {
        self.gains.resize(count, 0);
        self.last_gain.resize(count, 0);
        self.credits.resize(count, 0);
    }

    pub fn skill_count(&self) -> usize {
        self.gains.len()
    }

    /// False until the first cycle has started.
    pub fn is_engaged(&self) -> bool {
        self.skill_gain_epoch.is_some()
    }

    pub fn stored_epoch(&self) -> Option<DateTime<Utc>> {
        self.skill_gain_epoch
    }

    pub fn stored_limit_time(&self) -> Option<DateTime<Utc>> {
        self.limit_time
    }

    pub fn stored_stat_increase(&self) -> u8 {
        self.stat_increase
    }

    pub fn stored_gains(&self) -> &[u8] {
        &self.gains
    }

    pub fn stored_last_gain(&self) -> &[u16] {
        &self.last_gain
    }

    /// Per-skill view; slots outside the stored arrays read as empty.
    pub fn record(&self, skill: SkillName) -> SkillGainRecord {
        self.record_at(skill.index())
    }

    fn record_at(&self, index: usize) -> SkillGainRecord {
        SkillGainRecord {
            gained_tenths: self.gains.get(index).copied().unwrap_or(0),
            last_gain_offset: self.last_gain.get(index).copied().unwrap_or(0),
            credit_minutes: self.credits.get(index).copied().unwrap_or(0),
        }
    }

    /// Applies `update` to the skill's record. Out-of-range slots are ignored.
    pub fn update_record<F>(&mut self, skill: SkillName, update: F) -> bool
    where
        F: FnOnce(&mut SkillGainRecord),
    {
        let index = skill.index();
        if index >= self.gains.len() || index >= self.last_gain.len() || index >= self.credits.len() {
            return false;
        }
        let mut record = self.record_at(index);
        update(&mut record);
        self.gains[index] = record.gained_tenths;
        self.last_gain[index] = record.last_gain_offset;
        self.credits[index] = record.credit_minutes;
        true
    }

    pub fn needs_reset(&self, now: DateTime<Utc>) -> bool {
        match self.limit_time {
            Some(limit) => now > limit,
            None => true,
        }
    }

    /// Resets the cycle if it has expired. Returns whether a reset happened.
    pub fn ensure_current(&mut self, now: DateTime<Utc>, scope: &LedgerScope<'_>) -> bool {
        if !self.needs_reset(now) {
            return false;
        }
        self.reset(now, scope);
        true
    }

    /// Operator reset: starts a new cycle at `now` even if the current one
    /// has not expired.
    pub fn force_reset(&mut self, now: DateTime<Utc>, scope: &LedgerScope<'_>) {
        self.reset(now, scope);
    }

    /// Starts a new cycle at `now`, banking partially served waits as credit.
    fn reset(&mut self, now: DateTime<Utc>, scope: &LedgerScope<'_>) {
        let count = self.skill_count();
        let mut credits = vec![0u8; count];
        let mut issued = 0usize;
        for (index, credit) in credits.iter_mut().enumerate() {
            let record = self.record_at(index);
            if record.gained_tenths == 0 {
                continue;
            }
            let skill = SkillName::from_index(index);
            match self.compute_credit(index, now, scope) {
                Ok(0) => {}
                Ok(minutes) => {
                    *credit = minutes;
                    issued += 1;
                    scope.emit(
                        now,
                        RotLogCategory::CreditsIssued,
                        skill,
                        format!(
                            "{} min credit issued, {} gained last cycle",
                            minutes,
                            format_tenths(record.gained_tenths)
                        ),
                    );
                }
                Err(err) => {
                    scope.emit(
                        now,
                        RotLogCategory::Error,
                        skill,
                        format!("credit skipped for slot {}: {}", index, err),
                    );
                }
            }
        }

        self.gains = vec![0; count];
        self.last_gain = vec![0; count];
        self.credits = credits;
        self.stat_increase = 0;
        self.skill_gain_epoch = Some(now);
        let limit = now + scope.policy.cycle_length();
        self.limit_time = Some(limit);
        scope.emit(
            now,
            RotLogCategory::CycleReset,
            None,
            format!(
                "cycle started, {} credits issued, next reset {}",
                issued,
                limit.format("%Y-%m-%d %H:%M:%S")
            ),
        );
    }

    fn compute_credit(
        &self,
        index: usize,
        now: DateTime<Utc>,
        scope: &LedgerScope<'_>,
    ) -> RotResult<u8> {
        let skill = SkillName::from_index(index)
            .ok_or_else(|| RotError::Ledger(format!("no skill at slot {}", index)))?;
        let last = self
            .last_gain_at(skill)
            .ok_or_else(|| RotError::Ledger("gain recorded without an epoch".to_string()))?;
        let wait = scope.policy.wait_for(scope.skills.value(skill));
        let elapsed = now - last;
        let remaining = (wait - elapsed).max(Duration::zero());
        Ok(ceil_minutes_u8(wait - remaining))
    }

    /// Epoch plus the stored offset, pulled earlier by any banked credit.
    pub fn last_gain_at(&self, skill: SkillName) -> Option<DateTime<Utc>> {
        let epoch = self.skill_gain_epoch?;
        let record = self.record(skill);
        let minutes = i64::from(record.last_gain_offset) - i64::from(record.credit_minutes);
        Some(epoch + Duration::minutes(minutes))
    }

    pub fn skill_gain_epoch(&mut self, now: DateTime<Utc>, scope: &LedgerScope<'_>) -> DateTime<Utc> {
        self.ensure_current(now, scope);
        *self.skill_gain_epoch.get_or_insert(now)
    }

    pub fn limit_time(&mut self, now: DateTime<Utc>, scope: &LedgerScope<'_>) -> DateTime<Utc> {
        self.ensure_current(now, scope);
        self.limit_time
            .unwrap_or_else(|| now + scope.policy.cycle_length())
    }

    pub fn last_skill_gain(
        &mut self,
        skill: SkillName,
        now: DateTime<Utc>,
        scope: &LedgerScope<'_>,
    ) -> DateTime<Utc> {
        let epoch = self.skill_gain_epoch(now, scope);
        self.last_gain_at(skill).unwrap_or(epoch)
    }

    /// Stamps the gain time for `skill` and consumes any banked credit.
    pub fn set_last_skill_gain(
        &mut self,
        skill: SkillName,
        now: DateTime<Utc>,
        scope: &LedgerScope<'_>,
    ) {
        let epoch = self.skill_gain_epoch(now, scope);
        let offset = (now - epoch).num_minutes().clamp(0, i64::from(u16::MAX)) as u16;
        let mut consumed = 0u8;
        self.update_record(skill, |record| {
            record.last_gain_offset = offset;
            consumed = record.credit_minutes;
            record.credit_minutes = 0;
        });
        if consumed > 0 {
            scope.emit(
                now,
                RotLogCategory::CreditsApplied,
                Some(skill),
                format!("{} min credit applied", consumed),
            );
        }
    }

    /// Adds `tenths` to the cycle total for `skill`, saturating at the byte range.
    pub fn add_gain(&mut self, skill: SkillName, tenths: u8, now: DateTime<Utc>, scope: &LedgerScope<'_>) {
        self.ensure_current(now, scope);
        self.update_record(skill, |record| {
            record.gained_tenths = record.gained_tenths.saturating_add(tenths);
        });
    }

    pub fn gained_this_cycle(
        &mut self,
        skill: SkillName,
        now: DateTime<Utc>,
        scope: &LedgerScope<'_>,
    ) -> u8 {
        self.ensure_current(now, scope);
        self.record(skill).gained_tenths
    }

    pub fn credit_minutes(
        &mut self,
        skill: SkillName,
        now: DateTime<Utc>,
        scope: &LedgerScope<'_>,
    ) -> u8 {
        self.ensure_current(now, scope);
        self.record(skill).credit_minutes
    }

    pub fn stat_increase(&mut self, now: DateTime<Utc>, scope: &LedgerScope<'_>) -> u8 {
        self.ensure_current(now, scope);
        self.stat_increase
    }

    pub fn add_stat_increase(&mut self, now: DateTime<Utc>, scope: &LedgerScope<'_>) -> u8 {
        self.ensure_current(now, scope);
        self.stat_increase = self.stat_increase.saturating_add(1);
        self.stat_increase
    }
}

/// Whole minutes, rounded up, clamped to a byte.
fn ceil_minutes_u8(duration: Duration) -> u8 {
    let millis = duration.num_milliseconds();
    if millis <= 0 {
        return 0;
    }
    let minutes = (millis + 59_999) / 60_000;
    minutes.min(i64::from(u8::MAX)) as u8
}

pub(crate) fn format_tenths(tenths: u8) -> String {
    format!("{}.{}", tenths / 10, tenths % 10)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::skills::SkillValue;
    use crate::telemetry::logging::MemoryLog;
    use chrono::TimeZone;
    use proptest::prelude::*;

    struct Fixture {
        policy: RotPolicy,
        skills: SkillSet,
        log: MemoryLog,
    }

    impl Fixture {
        fn new() -> Self {
            let mut skills = SkillSet::default();
            skills.set_value(SkillName::Swords, SkillValue::from_points(75));
            skills.set_value(SkillName::Magery, SkillValue::from_points(100));
            Self {
                policy: RotPolicy::default(),
                skills,
                log: MemoryLog::new(),
            }
        }

        fn scope(&self) -> LedgerScope<'_> {
            LedgerScope {
                player: PlayerId(1),
                policy: &self.policy,
                skills: &self.skills,
                log: &self.log,
            }
        }
    }

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn first_access_starts_cycle() {
        let fx = Fixture::new();
        let mut ledger = RotLedger::new();
        assert!(!ledger.is_engaged());
        let epoch = ledger.skill_gain_epoch(start(), &fx.scope());
        assert_eq!(epoch, start());
        assert_eq!(ledger.stored_limit_time(), Some(start() + Duration::hours(24)));
        assert_eq!(fx.log.count(RotLogCategory::CycleReset), 1);
    }

    #[test]
    fn limit_time_tracks_epoch_after_every_reset() {
        let fx = Fixture::new();
        let mut ledger = RotLedger::new();
        let scope = fx.scope();
        ledger.ensure_current(start(), &scope);
        let later = start() + Duration::hours(30);
        assert!(ledger.ensure_current(later, &scope));
        assert_eq!(ledger.stored_epoch(), Some(later));
        assert_eq!(ledger.stored_limit_time(), Some(later + Duration::hours(24)));
        ledger.force_reset(later + Duration::minutes(1), &scope);
        assert_eq!(
            ledger.stored_limit_time(),
            Some(later + Duration::minutes(1) + Duration::hours(24))
        );
    }

    #[test]
    fn repeated_access_within_cycle_is_stable() {
        let fx = Fixture::new();
        let scope = fx.scope();
        let mut ledger = RotLedger::new();
        ledger.ensure_current(start(), &scope);
        ledger.add_gain(SkillName::Swords, 3, start(), &scope);
        ledger.set_last_skill_gain(SkillName::Swords, start() + Duration::minutes(2), &scope);
        let snapshot = ledger.clone();
        for minute in 0..10 {
            let now = start() + Duration::minutes(minute * 60);
            ledger.ensure_current(now, &scope);
            ledger.last_skill_gain(SkillName::Swords, now, &scope);
            assert_eq!(ledger, snapshot);
        }
        assert_eq!(fx.log.count(RotLogCategory::CycleReset), 1);
    }

    #[test]
    fn reset_banks_partially_served_wait() {
        let fx = Fixture::new();
        let scope = fx.scope();
        let mut ledger = RotLedger::new();
        ledger.ensure_current(start(), &scope);
        let gain_at = start() + Duration::hours(24) - Duration::minutes(2);
        ledger.add_gain(SkillName::Swords, 1, gain_at, &scope);
        ledger.set_last_skill_gain(SkillName::Swords, gain_at, &scope);

        let reset_at = gain_at + Duration::minutes(2) + Duration::seconds(1);
        assert!(ledger.ensure_current(reset_at, &scope));
        let record = ledger.record(SkillName::Swords);
        assert_eq!(record.gained_tenths, 0);
        assert_eq!(record.last_gain_offset, 0);
        // 2m01s served rounds up to 3 minutes.
        assert_eq!(record.credit_minutes, 3);
        assert_eq!(
            ledger.last_gain_at(SkillName::Swords),
            Some(reset_at - Duration::minutes(3))
        );
        assert_eq!(fx.log.count(RotLogCategory::CreditsIssued), 1);
    }

    #[test]
    fn credit_never_exceeds_the_band_wait() {
        let fx = Fixture::new();
        let scope = fx.scope();
        let mut ledger = RotLedger::new();
        ledger.ensure_current(start(), &scope);
        ledger.add_gain(SkillName::Magery, 1, start(), &scope);
        ledger.set_last_skill_gain(SkillName::Magery, start(), &scope);
        ledger.ensure_current(start() + Duration::days(3), &scope);
        assert_eq!(ledger.record(SkillName::Magery).credit_minutes, 15);
    }

    #[test]
    fn skills_without_gain_get_no_credit() {
        let fx = Fixture::new();
        let scope = fx.scope();
        let mut ledger = RotLedger::new();
        ledger.ensure_current(start(), &scope);
        ledger.ensure_current(start() + Duration::days(2), &scope);
        assert_eq!(ledger.record(SkillName::Swords), SkillGainRecord::default());
        assert_eq!(fx.log.count(RotLogCategory::CreditsIssued), 0);
    }

    #[test]
    fn credit_is_consumed_once_by_next_gain() {
        let fx = Fixture::new();
        let scope = fx.scope();
        let mut ledger = RotLedger::new();
        ledger.ensure_current(start(), &scope);
        let gain_at = start() + Duration::hours(24) - Duration::minutes(2);
        ledger.add_gain(SkillName::Swords, 1, gain_at, &scope);
        ledger.set_last_skill_gain(SkillName::Swords, gain_at, &scope);
        let reset_at = start() + Duration::hours(24) + Duration::seconds(1);
        ledger.ensure_current(reset_at, &scope);
        assert!(ledger.record(SkillName::Swords).credit_minutes > 0);

        let next = reset_at + Duration::minutes(4);
        ledger.set_last_skill_gain(SkillName::Swords, next, &scope);
        assert_eq!(ledger.record(SkillName::Swords).credit_minutes, 0);
        assert_eq!(ledger.record(SkillName::Swords).last_gain_offset, 4);
        ledger.set_last_skill_gain(SkillName::Swords, next + Duration::minutes(5), &scope);
        assert_eq!(fx.log.count(RotLogCategory::CreditsApplied), 1);
    }

    #[test]
    fn out_of_range_slots_read_empty() {
        let mut ledger = RotLedger::with_skill_count(10);
        assert_eq!(ledger.record(SkillName::Swords), SkillGainRecord::default());
        assert!(!ledger.update_record(SkillName::Swords, |record| record.gained_tenths = 5));
        ledger.resize(SKILL_COUNT);
        assert!(ledger.update_record(SkillName::Swords, |record| record.gained_tenths = 5));
        assert_eq!(ledger.record(SkillName::Swords).gained_tenths, 5);
    }

    #[test]
    fn resize_keeps_existing_offsets() {
        let mut ledger = RotLedger::from_stored(
            Some(start()),
            Some(start() + Duration::hours(24)),
            2,
            vec![1, 2, 3],
            vec![10, 20, 30],
        );
        ledger.resize(5);
        assert_eq!(ledger.stored_gains(), &[1, 2, 3, 0, 0]);
        assert_eq!(ledger.stored_last_gain(), &[10, 20, 30, 0, 0]);
        ledger.resize(2);
        assert_eq!(ledger.stored_gains(), &[1, 2]);
        assert_eq!(ledger.stored_last_gain(), &[10, 20]);
    }

    #[test]
    fn corrupt_slot_does_not_abort_reset() {
        let fx = Fixture::new();
        let scope = fx.scope();
        // Gains stored without an epoch, plus a slot past the skill table.
        let mut gains = vec![0u8; SKILL_COUNT + 1];
        gains[SkillName::Swords.index()] = 4;
        gains[SKILL_COUNT] = 4;
        let mut ledger = RotLedger::from_stored(None, None, 3, gains, vec![0; SKILL_COUNT + 1]);
        ledger.ensure_current(start(), &scope);
        assert_eq!(fx.log.count(RotLogCategory::Error), 2);
        assert_eq!(fx.log.count(RotLogCategory::CycleReset), 1);
        assert_eq!(ledger.stored_stat_increase(), 0);
        assert!(ledger.stored_gains().iter().all(|gain| *gain == 0));
    }

    #[test]
    fn ceil_minutes_rounds_up() {
        assert_eq!(ceil_minutes_u8(Duration::zero()), 0);
        assert_eq!(ceil_minutes_u8(Duration::seconds(1)), 1);
        assert_eq!(ceil_minutes_u8(Duration::seconds(60)), 1);
        assert_eq!(ceil_minutes_u8(Duration::seconds(61)), 2);
        assert_eq!(ceil_minutes_u8(Duration::hours(10)), 255);
    }

    proptest! {
        #[test]
        fn credit_never_exceeds_wait(
            points in 70u16..120,
            gained in 1u8..50,
            offset in 0u16..1440,
            reset_after in 1i64..200_000,
        ) {
            let mut fx = Fixture::new();
            fx.skills.set_value(SkillName::Swords, SkillValue::from_points(points));
            let mut gains = vec![0; SKILL_COUNT];
            gains[SkillName::Swords.index()] = gained;
            let mut last_gain = vec![0; SKILL_COUNT];
            last_gain[SkillName::Swords.index()] = offset;
            let mut ledger = RotLedger::from_stored(
                Some(start()),
                Some(start() + Duration::hours(24)),
                0,
                gains,
                last_gain,
            );
            let reset_at = start() + Duration::hours(24) + Duration::seconds(reset_after);
            prop_assert!(ledger.ensure_current(reset_at, &fx.scope()));
            let wait = fx.policy.wait_for(SkillValue::from_points(points)).num_minutes();
            prop_assert!(i64::from(ledger.record(SkillName::Swords).credit_minutes) <= wait);
            prop_assert_eq!(ledger.record(SkillName::Swords).gained_tenths, 0);
        }

        #[test]
        fn repeated_access_does_not_reset_twice(
            gained in 0u8..50,
            offset in 0u16..1440,
            reset_after in 1i64..200_000,
            later in 0i64..86_399,
        ) {
            let fx = Fixture::new();
            let mut gains = vec![0; SKILL_COUNT];
            gains[SkillName::Swords.index()] = gained;
            let mut last_gain = vec![0; SKILL_COUNT];
            last_gain[SkillName::Swords.index()] = offset;
            let mut ledger = RotLedger::from_stored(
                Some(start()),
                Some(start() + Duration::hours(24)),
                3,
                gains,
                last_gain,
            );
            let reset_at = start() + Duration::hours(24) + Duration::seconds(reset_after);
            prop_assert!(ledger.ensure_current(reset_at, &fx.scope()));
            let after_first = ledger.clone();
            prop_assert!(!ledger.ensure_current(reset_at, &fx.scope()));
            prop_assert!(!ledger.ensure_current(reset_at + Duration::seconds(later), &fx.scope()));
            prop_assert_eq!(&ledger, &after_first);
            prop_assert_eq!(fx.log.count(RotLogCategory::CycleReset), 1);
        }
    }
}
