use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use rand::Rng;

use crate::entities::player::PlayerState;
use crate::entities::skills::SkillName;
use crate::error::{RotError, RotResult};
use crate::rot::gain::{GainReport, SkillGainController};

/// Player state behind a mutex, for hosts that may touch one player from
/// several threads. Eligibility and gain application run under one lock.
#[derive(Debug, Clone)]
pub struct SharedPlayer {
    inner: Arc<Mutex<PlayerState>>,
}

impl SharedPlayer {
    pub fn new(player: PlayerState) -> Self {
        Self {
            inner: Arc::new(Mutex::new(player)),
        }
    }

    pub fn with<T>(&self, f: impl FnOnce(&mut PlayerState) -> T) -> RotResult<T> {
        let mut player = self
            .inner
            .lock()
            .map_err(|_| RotError::LockPoisoned("player"))?;
        Ok(f(&mut player))
    }

    pub fn try_gain<R: Rng + ?Sized>(
        &self,
        controller: &SkillGainController<'_>,
        skill: SkillName,
        delta_tenths: u16,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> RotResult<GainReport> {
        self.with(|player| controller.try_gain(player, skill, delta_tenths, now, rng))
    }

    pub fn snapshot(&self) -> RotResult<PlayerState> {
        self.with(|player| player.clone())
    }
}
