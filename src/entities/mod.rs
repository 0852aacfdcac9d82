pub mod player;
pub mod skills;
pub mod stats;
