//! Persisted form of a [`RotLedger`].
//!
//! ```text
//! i64  skill gain epoch       (ticks)
//! i64  cycle limit time       (ticks)
//! u8   stat increase this cycle
//! u8   gained tenths          x skill count
//! u16  last gain offset (min) x skill count
//! ```
//!
//! Ticks are 100 ns units since 0001-01-01 UTC; zero is the unset value.
//! The skill count is not part of the block, the enclosing record carries it.
//! Rollover credits are not stored.

use chrono::{DateTime, Utc};

use crate::error::{RotError, RotResult};
use crate::persistence::binary::{BinaryReader, BinaryWriter};
use crate::rot::ledger::RotLedger;

pub const UNIX_EPOCH_TICKS: i64 = 621_355_968_000_000_000;
const TICKS_PER_SECOND: i64 = 10_000_000;
const NANOS_PER_TICK: i64 = 100;

pub fn encoded_len(skill_count: usize) -> usize {
    8 + 8 + 1 + skill_count * 3
}

pub fn to_ticks(value: Option<DateTime<Utc>>) -> i64 {
    let Some(value) = value else {
        return 0;
    };
    let sub_ticks = i64::from(value.timestamp_subsec_nanos()) / NANOS_PER_TICK;
    value
        .timestamp()
        .saturating_mul(TICKS_PER_SECOND)
        .saturating_add(sub_ticks)
        .saturating_add(UNIX_EPOCH_TICKS)
        .max(0)
}

pub fn from_ticks(ticks: i64) -> RotResult<Option<DateTime<Utc>>> {
    if ticks == 0 {
        return Ok(None);
    }
    if ticks < 0 {
        return Err(RotError::Decode(format!("negative date ticks {}", ticks)));
    }
    let unix_ticks = ticks - UNIX_EPOCH_TICKS;
    let seconds = unix_ticks.div_euclid(TICKS_PER_SECOND);
    let nanos = (unix_ticks.rem_euclid(TICKS_PER_SECOND) * NANOS_PER_TICK) as u32;
    DateTime::from_timestamp(seconds, nanos)
        .map(Some)
        .ok_or_else(|| RotError::Decode(format!("date ticks {} out of range", ticks)))
}

pub fn write_rot_block(writer: &mut BinaryWriter, ledger: &RotLedger) {
    writer.write_i64_le(to_ticks(ledger.stored_epoch()));
    writer.write_i64_le(to_ticks(ledger.stored_limit_time()));
    writer.write_u8(ledger.stored_stat_increase());
    writer.write_bytes(ledger.stored_gains());
    for offset in ledger.stored_last_gain() {
        writer.write_u16_le(*offset);
    }
}

/// Reads a block written with `stored_count` skills into a ledger sized for
/// `current_count`. Extra stored slots are dropped, missing ones start empty.
pub fn read_rot_block(
    reader: &mut BinaryReader<'_>,
    stored_count: usize,
    current_count: usize,
) -> RotResult<RotLedger> {
    let short = || RotError::Decode("rot block truncated".to_string());
    let epoch = from_ticks(reader.read_i64_le().ok_or_else(short)?)?;
    let limit_time = from_ticks(reader.read_i64_le().ok_or_else(short)?)?;
    let stat_increase = reader.read_u8().ok_or_else(short)?;
    let gains = reader.read_bytes(stored_count).ok_or_else(short)?.to_vec();
    let mut last_gain = Vec::with_capacity(stored_count);
    for _ in 0..stored_count {
        last_gain.push(reader.read_u16_le().ok_or_else(short)?);
    }
    let mut ledger = RotLedger::from_stored(epoch, limit_time, stat_increase, gains, last_gain);
    ledger.resize(current_count);
    Ok(ledger)
}
