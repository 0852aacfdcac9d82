use std::path::{Path, PathBuf};

use crate::entities::player::PlayerId;
use crate::error::{RotError, RotResult};
use crate::rot::policy::{RotPolicy, Ruleset};

const USAGE: &str = "usage: rotgain <root> <player-id> [command...]";
const DEFAULT_COMMAND: &str = "!rotstatus";
const POLICY_FILE: &str = "rot.yaml";

#[derive(Debug)]
pub struct AppConfig {
    pub root: PathBuf,
    pub player_id: PlayerId,
    pub command: String,
    pub policy_path: Option<PathBuf>,
    pub ruleset: Option<Ruleset>,
    pub debug_cycle: bool,
}

impl AppConfig {
    pub fn from_args(args: &[String]) -> RotResult<Self> {
        Self::from_args_with_env(args, |key| std::env::var(key).ok())
    }

    pub fn from_args_with_env<F>(args: &[String], env: F) -> RotResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if args.len() < 3 {
            return Err(RotError::Usage(USAGE.to_string()));
        }

        let root = Path::new(&args[1]).to_path_buf();
        let player_id = args[2]
            .trim()
            .parse::<u32>()
            .map(PlayerId)
            .map_err(|_| RotError::Usage(format!("player id must be numeric, got '{}'", args[2])))?;
        let command = if args.len() > 3 {
            args[3..].join(" ")
        } else {
            DEFAULT_COMMAND.to_string()
        };

        let non_empty = |key: &str| {
            env(key).and_then(|value| {
                let trimmed = value.trim();
                if trimmed.is_empty() {
                    None
                } else {
                    Some(trimmed.to_string())
                }
            })
        };
        let policy_path = non_empty("ROT_POLICY").map(PathBuf::from).or_else(|| {
            let path = root.join(POLICY_FILE);
            path.is_file().then_some(path)
        });
        let ruleset = non_empty("ROT_RULESET")
            .map(|value| value.parse::<Ruleset>())
            .transpose()?;
        let debug_cycle = non_empty("ROT_DEBUG_CYCLE")
            .map(|value| matches!(value.as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        Ok(Self {
            root,
            player_id,
            command,
            policy_path,
            ruleset,
            debug_cycle,
        })
    }

    /// Policy from the YAML file, or built-in defaults, with the environment
    /// overrides applied on top.
    pub fn load_policy(&self) -> RotResult<RotPolicy> {
        let mut policy = match &self.policy_path {
            Some(path) => RotPolicy::load(path)?,
            None => RotPolicy::default(),
        };
        if let Some(ruleset) = self.ruleset {
            policy.ruleset = ruleset;
        }
        if self.debug_cycle {
            policy.debug_cycle = true;
        }
        policy.validate()?;
        Ok(policy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[test]
    fn from_args_requires_root_and_player() {
        let err = AppConfig::from_args_with_env(&args(&["rotgain", "/tmp"]), |_| None)
            .expect_err("usage");
        assert!(matches!(err, RotError::Usage(_)));
    }

    #[test]
    fn from_args_defaults_to_status_command() {
        let config =
            AppConfig::from_args_with_env(&args(&["rotgain", "/nonexistent-root", "12"]), |_| None)
                .expect("config");
        assert_eq!(config.player_id, PlayerId(12));
        assert_eq!(config.command, "!rotstatus");
        assert_eq!(config.policy_path, None);
        assert_eq!(config.ruleset, None);
        assert!(!config.debug_cycle);
    }

    #[test]
    fn from_args_joins_command_words_and_reads_env() {
        let env: HashMap<&str, &str> = [
            ("ROT_POLICY", " /etc/rot.yaml "),
            ("ROT_RULESET", "rot-extended"),
            ("ROT_DEBUG_CYCLE", "1"),
        ]
        .into_iter()
        .collect();
        let config = AppConfig::from_args_with_env(
            &args(&["rotgain", "/srv", "3", "!rotnext", "animal", "lore"]),
            |key| env.get(key).map(|value| value.to_string()),
        )
        .expect("config");
        assert_eq!(config.command, "!rotnext animal lore");
        assert_eq!(config.policy_path, Some(PathBuf::from("/etc/rot.yaml")));
        assert_eq!(config.ruleset, Some(Ruleset::RateOverTimeExtended));
        assert!(config.debug_cycle);
    }

    #[test]
    fn unknown_ruleset_is_rejected() {
        let result = AppConfig::from_args_with_env(&args(&["rotgain", "/srv", "3"]), |key| {
            (key == "ROT_RULESET").then(|| "modern".to_string())
        });
        assert!(matches!(result, Err(RotError::InvalidPolicy(_))));
    }

    #[test]
    fn load_policy_applies_overrides() {
        let config = AppConfig {
            root: PathBuf::from("/srv"),
            player_id: PlayerId(1),
            command: DEFAULT_COMMAND.to_string(),
            policy_path: None,
            ruleset: Some(Ruleset::Legacy),
            debug_cycle: true,
        };
        let policy = config.load_policy().expect("policy");
        assert_eq!(policy.ruleset, Ruleset::Legacy);
        assert_eq!(policy.cycle_length(), chrono::Duration::minutes(5));
    }

    #[test]
    fn root_policy_file_is_picked_up() {
        let suffix = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("time")
            .as_nanos();
        let root = std::env::temp_dir().join(format!("rotgain-config-test-{}", suffix));
        std::fs::create_dir_all(&root).expect("root");
        std::fs::write(root.join(POLICY_FILE), "ruleset: legacy\ncycle_minutes: 60\n")
            .expect("policy");
        let config = AppConfig::from_args_with_env(
            &args(&["rotgain", root.to_str().expect("utf8"), "1"]),
            |_| None,
        )
        .expect("config");
        assert_eq!(config.policy_path, Some(root.join(POLICY_FILE)));
        let policy = config.load_policy().expect("policy");
        assert_eq!(policy.ruleset, Ruleset::Legacy);
        assert_eq!(policy.cycle_length(), chrono::Duration::minutes(60));
    }
}
