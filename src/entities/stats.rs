use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatKind {
    Str,
    Dex,
    Int,
}

impl StatKind {
    pub const ALL: [StatKind; 3] = [StatKind::Str, StatKind::Dex, StatKind::Int];

    pub fn name(self) -> &'static str {
        match self {
            StatKind::Str => "Str",
            StatKind::Dex => "Dex",
            StatKind::Int => "Int",
        }
    }
}

impl fmt::Display for StatKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatLock {
    #[default]
    Up,
    Down,
    Locked,
}

impl StatLock {
    pub fn to_byte(self) -> u8 {
        match self {
            StatLock::Up => 0,
            StatLock::Down => 1,
            StatLock::Locked => 2,
        }
    }

    pub fn from_byte(value: u8) -> Self {
        match value {
            1 => StatLock::Down,
            2 => StatLock::Locked,
            _ => StatLock::Up,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    pub str: u16,
    pub dex: u16,
    pub int: u16,
    pub str_lock: StatLock,
    pub dex_lock: StatLock,
    pub int_lock: StatLock,
}

impl Default for Stats {
    fn default() -> Self {
        Self {
            str: 10,
            dex: 10,
            int: 10,
            str_lock: StatLock::Up,
            dex_lock: StatLock::Up,
            int_lock: StatLock::Up,
        }
    }
}

impl Stats {
    pub fn get(&self, stat: StatKind) -> u16 {
        match stat {
            StatKind::Str => self.str,
            StatKind::Dex => self.dex,
            StatKind::Int => self.int,
        }
    }

    pub fn lock(&self, stat: StatKind) -> StatLock {
        match stat {
            StatKind::Str => self.str_lock,
            StatKind::Dex => self.dex_lock,
            StatKind::Int => self.int_lock,
        }
    }

    pub fn set(&mut self, stat: StatKind, value: u16) {
        match stat {
            StatKind::Str => self.str = value,
            StatKind::Dex => self.dex = value,
            StatKind::Int => self.int = value,
        }
    }

    pub fn set_lock(&mut self, stat: StatKind, lock: StatLock) {
        match stat {
            StatKind::Str => self.str_lock = lock,
            StatKind::Dex => self.dex_lock = lock,
            StatKind::Int => self.int_lock = lock,
        }
    }

    pub fn total(&self) -> u32 {
        u32::from(self.str) + u32::from(self.dex) + u32::from(self.int)
    }

    /// Whether `stat` may rise by one point under the given caps.
    pub fn can_raise(&self, stat: StatKind, per_stat_cap: u16, total_cap: u32) -> bool {
        self.lock(stat) == StatLock::Up
            && self.get(stat) < per_stat_cap
            && self.total() < total_cap
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locked_stat_cannot_raise() {
        let mut stats = Stats::default();
        stats.set_lock(StatKind::Str, StatLock::Locked);
        assert!(!stats.can_raise(StatKind::Str, 100, 225));
        assert!(stats.can_raise(StatKind::Dex, 100, 225));
    }

    #[test]
    fn caps_block_raise() {
        let mut stats = Stats::default();
        stats.set(StatKind::Int, 100);
        assert!(!stats.can_raise(StatKind::Int, 100, 225));
        stats.set(StatKind::Str, 100);
        stats.set(StatKind::Dex, 25);
        assert_eq!(stats.total(), 225);
        assert!(!stats.can_raise(StatKind::Dex, 100, 225));
    }
}
