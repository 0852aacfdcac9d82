//! Rate-over-time policy tables.
//!
//! The numbers here are configuration: wait and cap bands are looked up by the
//! skill's current value, lower bound inclusive, so 110.0 falls in the band that
//! starts at 110.0 while 109.9 stays in the one below.

use std::path::Path;
use std::str::FromStr;

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::entities::skills::SkillValue;
use crate::error::{RotError, RotResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Ruleset {
    #[serde(rename = "legacy")]
    Legacy,
    #[serde(rename = "rot")]
    RateOverTime,
    #[serde(rename = "rot-extended")]
    RateOverTimeExtended,
}

impl Ruleset {
    pub fn uses_rot(self) -> bool {
        !matches!(self, Ruleset::Legacy)
    }
}

impl FromStr for Ruleset {
    type Err = RotError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "legacy" => Ok(Ruleset::Legacy),
            "rot" => Ok(Ruleset::RateOverTime),
            "rot-extended" | "extended" => Ok(Ruleset::RateOverTimeExtended),
            other => Err(RotError::InvalidPolicy(format!("unknown ruleset '{other}'"))),
        }
    }
}

/// Which gain model governs a single skill check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GainPolicy {
    Legacy,
    RateOverTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaitBand {
    #[serde(with = "points")]
    pub floor: SkillValue,
    pub wait_minutes: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapBand {
    #[serde(with = "points")]
    pub floor: SkillValue,
    #[serde(with = "points")]
    pub daily_cap: SkillValue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RotPolicy {
    pub ruleset: Ruleset,
    #[serde(with = "points")]
    pub threshold: SkillValue,
    pub wait_bands: Vec<WaitBand>,
    pub cap_bands: Vec<CapBand>,
    pub cycle_minutes: u32,
    pub debug_cycle_minutes: u32,
    pub debug_cycle: bool,
    pub daily_stat_cap: u8,
    pub extended_daily_stat_cap: u8,
    pub stat_gain_chance: f64,
    pub stat_cap: u16,
    pub total_stat_cap: u32,
    #[serde(with = "points")]
    pub skill_cap: SkillValue,
}

impl Default for RotPolicy {
    fn default() -> Self {
        Self {
            ruleset: Ruleset::RateOverTime,
            threshold: SkillValue::from_points(70),
            wait_bands: vec![
                WaitBand { floor: SkillValue::from_points(70), wait_minutes: 5 },
                WaitBand { floor: SkillValue::from_points(80), wait_minutes: 8 },
                WaitBand { floor: SkillValue::from_points(90), wait_minutes: 12 },
                WaitBand { floor: SkillValue::from_points(100), wait_minutes: 15 },
            ],
            cap_bands: vec![
                CapBand { floor: SkillValue::from_points(70), daily_cap: SkillValue::from_points(5) },
                CapBand { floor: SkillValue::from_points(80), daily_cap: SkillValue::from_points(4) },
                CapBand { floor: SkillValue::from_points(90), daily_cap: SkillValue::from_points(3) },
                CapBand { floor: SkillValue::from_points(110), daily_cap: SkillValue::from_points(2) },
            ],
            cycle_minutes: 24 * 60,
            debug_cycle_minutes: 5,
            debug_cycle: false,
            daily_stat_cap: 6,
            extended_daily_stat_cap: 10,
            stat_gain_chance: 0.05,
            stat_cap: 100,
            total_stat_cap: 225,
            skill_cap: SkillValue::from_points(120),
        }
    }
}

impl RotPolicy {
    pub fn from_yaml_str(source: &str) -> RotResult<Self> {
        let policy: RotPolicy = serde_yaml::from_str(source)?;
        policy.validate()?;
        Ok(policy)
    }

    pub fn load(path: &Path) -> RotResult<Self> {
        let source = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&source)
    }

    pub fn to_yaml_string(&self) -> RotResult<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn validate(&self) -> RotResult<()> {
        let wait_floors: Vec<SkillValue> = self.wait_bands.iter().map(|band| band.floor).collect();
        let cap_floors: Vec<SkillValue> = self.cap_bands.iter().map(|band| band.floor).collect();
        check_floors("wait_bands", &wait_floors, self.threshold)?;
        check_floors("cap_bands", &cap_floors, self.threshold)?;
        if self.wait_bands.iter().any(|band| band.wait_minutes == 0) {
            return Err(RotError::InvalidPolicy("wait_bands: wait_minutes must be positive".into()));
        }
        // Credits are stored as whole minutes in a byte.
        if self.wait_bands.iter().any(|band| band.wait_minutes > u16::from(u8::MAX)) {
            return Err(RotError::InvalidPolicy("wait_bands: wait_minutes must fit in a byte".into()));
        }
        // Daily gain is stored in tenths in a byte.
        if self
            .cap_bands
            .iter()
            .any(|band| band.daily_cap.tenths() == 0 || band.daily_cap.tenths() > u16::from(u8::MAX))
        {
            return Err(RotError::InvalidPolicy(
                "cap_bands: daily_cap must be between 0.1 and 25.5".into(),
            ));
        }
        if self.cycle_minutes == 0 || self.debug_cycle_minutes == 0 {
            return Err(RotError::InvalidPolicy("cycle length must be positive".into()));
        }
        // Last-gain offsets are stored as minutes after the epoch in a u16.
        if self.cycle_minutes > u32::from(u16::MAX) || self.debug_cycle_minutes > u32::from(u16::MAX) {
            return Err(RotError::InvalidPolicy(format!(
                "cycle length must not exceed {} minutes",
                u16::MAX
            )));
        }
        if !(0.0..=1.0).contains(&self.stat_gain_chance) {
            return Err(RotError::InvalidPolicy("stat_gain_chance must be within 0..=1".into()));
        }
        Ok(())
    }

    pub fn cycle_length(&self) -> Duration {
        let minutes = if self.debug_cycle {
            self.debug_cycle_minutes
        } else {
            self.cycle_minutes
        };
        Duration::minutes(i64::from(minutes))
    }

    pub fn gain_policy(&self, value: SkillValue) -> GainPolicy {
        if self.ruleset.uses_rot() && value >= self.threshold {
            GainPolicy::RateOverTime
        } else {
            GainPolicy::Legacy
        }
    }

    /// Required wait between gains; zero below the threshold.
    pub fn wait_for(&self, value: SkillValue) -> Duration {
        if value < self.threshold {
            return Duration::zero();
        }
        let minutes = self
            .wait_bands
            .iter()
            .rev()
            .find(|band| value >= band.floor)
            .or_else(|| self.wait_bands.first())
            .map(|band| band.wait_minutes)
            .unwrap_or(0);
        Duration::minutes(i64::from(minutes))
    }

    /// Daily cap in tenths; `None` below the threshold (uncapped).
    pub fn daily_cap_for(&self, value: SkillValue) -> Option<u8> {
        if value < self.threshold {
            return None;
        }
        self.cap_bands
            .iter()
            .rev()
            .find(|band| value >= band.floor)
            .or_else(|| self.cap_bands.first())
            .map(|band| band.daily_cap.tenths().min(u16::from(u8::MAX)) as u8)
    }

    pub fn max_wait(&self) -> Duration {
        let minutes = self
            .wait_bands
            .iter()
            .map(|band| band.wait_minutes)
            .max()
            .unwrap_or(0);
        Duration::minutes(i64::from(minutes))
    }

    pub fn stat_cap_for_cycle(&self) -> u8 {
        match self.ruleset {
            Ruleset::RateOverTimeExtended => self.extended_daily_stat_cap,
            _ => self.daily_stat_cap,
        }
    }
}

fn check_floors(name: &str, floors: &[SkillValue], threshold: SkillValue) -> RotResult<()> {
    let Some(first) = floors.first() else {
        return Err(RotError::InvalidPolicy(format!("{name}: at least one band required")));
    };
    if *first > threshold {
        return Err(RotError::InvalidPolicy(format!(
            "{name}: first band starts at {first}, above threshold {threshold}"
        )));
    }
    if floors.windows(2).any(|pair| pair[0] >= pair[1]) {
        return Err(RotError::InvalidPolicy(format!("{name}: floors must be strictly ascending")));
    }
    Ok(())
}

/// Skill values appear as decimal points (`70.0`) in policy files.
mod points {
    use serde::{Deserialize, Deserializer, Serializer};

    use crate::entities::skills::SkillValue;

    pub fn serialize<S>(value: &SkillValue, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_f64(value.as_f64())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<SkillValue, D::Error>
    where
        D: Deserializer<'de>,
    {
        let points = f64::deserialize(deserializer)?;
        if !points.is_finite() || points < 0.0 {
            return Err(serde::de::Error::custom(format!("invalid skill value {points}")));
        }
        Ok(SkillValue::from_f64(points))
    }
}
