pub mod admin;
mod config;
pub mod entities;
pub mod error;
pub mod persistence;
pub mod rot;
pub mod telemetry;

pub use error::{RotError, RotResult};

use crate::admin::commands::{execute_rot_command, parse_rot_command};
use crate::entities::player::PlayerState;
use crate::persistence::store::SaveStore;
use crate::rot::clock::{Clock, SystemClock};
use crate::rot::gain::SkillGainController;
use crate::telemetry::logging::FileLog;

pub fn run(args: &[String]) -> Result<(), RotError> {
    telemetry::logging::init_process_logging();
    let config = config::AppConfig::from_args(args)?;
    let policy = config.load_policy()?;
    match &config.policy_path {
        Some(path) => log::info!("rot policy loaded from {}", path.display()),
        None => log::info!("rot policy: built-in defaults"),
    }
    log::debug!(
        "ruleset {:?}, cycle {} min",
        policy.ruleset,
        policy.cycle_length().num_minutes()
    );

    let command = parse_rot_command(&config.command)?.ok_or_else(|| {
        RotError::Usage(format!("commands start with '!', got '{}'", config.command))
    })?;

    let rot_log = FileLog::open(&config.root)?;
    let store = SaveStore::from_root(&config.root);
    let mut player = match store.load_player(config.player_id)? {
        Some(player) => player,
        None => {
            log::info!("no save for player {}, starting fresh", config.player_id.0);
            PlayerState::new(config.player_id, format!("Player {}", config.player_id.0))
        }
    };

    let controller = SkillGainController::new(&policy, &rot_log);
    let now = SystemClock.now();
    for line in execute_rot_command(&command, &mut player, &controller, now) {
        println!("{}", line);
    }

    store.save_player(&player)?;
    Ok(())
}
