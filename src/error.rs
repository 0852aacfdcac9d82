use thiserror::Error;

use crate::entities::player::PlayerId;

#[derive(Debug, Error)]
pub enum RotError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("policy config error: {0}")]
    Config(#[from] serde_yaml::Error),

    #[error("invalid policy: {0}")]
    InvalidPolicy(String),

    #[error("decode error: {0}")]
    Decode(String),

    #[error("ledger error: {0}")]
    Ledger(String),

    #[error("unknown skill '{0}'")]
    UnknownSkill(String),

    #[error("player save id mismatch: expected {expected:?}, got {found:?}")]
    PlayerMismatch { expected: PlayerId, found: PlayerId },

    #[error("{0} lock poisoned")]
    LockPoisoned(&'static str),

    #[error("{0}")]
    Usage(String),
}

pub type RotResult<T> = Result<T, RotError>;
