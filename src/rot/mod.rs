//! Rate-over-time skill gain: per-player cooldowns, daily caps and rollover
//! credit for skills at or above the RoT threshold.

pub mod clock;
pub mod diagnostics;
pub mod eligibility;
pub mod gain;
pub mod ledger;
pub mod policy;
pub mod shared;

pub use clock::{Clock, ManualClock, SystemClock};
pub use diagnostics::{LedgerSnapshot, SkillSnapshot};
pub use eligibility::{check_eligibility, GainStatus};
pub use gain::{GainOutcome, GainReport, SkillGainController, StatGain};
pub use ledger::{LedgerScope, RotLedger, SkillGainRecord};
pub use policy::{GainPolicy, RotPolicy, Ruleset};
pub use shared::SharedPlayer;
