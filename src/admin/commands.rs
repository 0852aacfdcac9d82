use chrono::{DateTime, Utc};

use crate::entities::player::PlayerState;
use crate::entities::skills::SkillName;
use crate::error::{RotError, RotResult};
use crate::rot::gain::SkillGainController;
use crate::rot::ledger::format_tenths;

const TIME_FORMAT: &str = "%d.%m.%Y %H:%M:%S";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RotCommand {
    Next { skill: SkillName },
    Credits { skill: Option<SkillName> },
    Reset,
    Echo { skill: Option<SkillName> },
    Status,
    Unknown(String),
}

pub fn parse_rot_command(message: &str) -> RotResult<Option<RotCommand>> {
    let trimmed = message.trim();
    if !trimmed.starts_with('!') {
        return Ok(None);
    }

    let mut parts = trimmed[1..].split_whitespace();
    let command = parts
        .next()
        .ok_or_else(|| RotError::Usage("command missing name".to_string()))?;
    let command = command.to_ascii_lowercase();
    let rest = parts.collect::<Vec<_>>().join(" ");
    let parsed = match command.as_str() {
        "rotnext" | "rotwait" => RotCommand::Next {
            skill: parse_skill(&rest)?
                .ok_or_else(|| RotError::Usage("usage: !rotnext <skill>".to_string()))?,
        },
        "rotcredits" | "rotcredit" => RotCommand::Credits {
            skill: parse_skill(&rest)?,
        },
        "rotreset" => RotCommand::Reset,
        "rotecho" => {
            if rest.is_empty() {
                return Err(RotError::Usage("usage: !rotecho <skill|off>".to_string()));
            }
            if rest.eq_ignore_ascii_case("off") {
                RotCommand::Echo { skill: None }
            } else {
                RotCommand::Echo {
                    skill: parse_skill(&rest)?,
                }
            }
        }
        "rotstatus" | "rot" => RotCommand::Status,
        _ => RotCommand::Unknown(command),
    };
    Ok(Some(parsed))
}

fn parse_skill(value: &str) -> RotResult<Option<SkillName>> {
    if value.is_empty() {
        return Ok(None);
    }
    value.parse::<SkillName>().map(Some)
}

/// Runs `command` against `player` and returns the lines to show.
pub fn execute_rot_command(
    command: &RotCommand,
    player: &mut PlayerState,
    controller: &SkillGainController<'_>,
    now: DateTime<Utc>,
) -> Vec<String> {
    match command {
        RotCommand::Next { skill } => {
            let value = player.skills.value(*skill);
            match controller.next_gain_time(player, *skill, now) {
                None => vec![format!(
                    "{} ({}) is not under rate-over-time gain.",
                    skill, value
                )],
                Some(next) if next <= now => vec![format!("{} ({}) can gain now.", skill, value)],
                Some(next) => {
                    let status = controller.check(player, *skill, now);
                    vec![format!(
                        "{} ({}) can gain at {}: {}.",
                        skill,
                        value,
                        next.format(TIME_FORMAT),
                        status
                    )]
                }
            }
        }
        RotCommand::Credits { skill: Some(skill) } => {
            let banked = controller.banked_credits(player, now);
            let minutes = banked
                .iter()
                .find(|(banked_skill, _)| banked_skill == skill)
                .map(|(_, minutes)| *minutes)
                .unwrap_or(0);
            vec![format!("{}: {} min rollover credit.", skill, minutes)]
        }
        RotCommand::Credits { skill: None } => {
            let banked = controller.banked_credits(player, now);
            if banked.is_empty() {
                return vec!["No rollover credit banked.".to_string()];
            }
            banked
                .into_iter()
                .map(|(skill, minutes)| format!("{}: {} min rollover credit.", skill, minutes))
                .collect()
        }
        RotCommand::Reset => {
            {
                let scope = controller.scope(player.id, &player.skills);
                player.rot.force_reset(now, &scope);
            }
            let banked = controller.banked_credits(player, now).len();
            let limit = player
                .rot
                .stored_limit_time()
                .map(|limit| limit.format(TIME_FORMAT).to_string())
                .unwrap_or_default();
            vec![format!(
                "Cycle reset at {}, next reset {}; {} skill(s) carry credit.",
                now.format(TIME_FORMAT),
                limit,
                banked
            )]
        }
        RotCommand::Echo { skill } => {
            player.rot_echo = *skill;
            match skill {
                Some(skill) => vec![format!("Echoing rate-over-time decisions for {}.", skill)],
                None => vec!["Rate-over-time echo off.".to_string()],
            }
        }
        RotCommand::Status => {
            let snapshot = controller.ledger_snapshot(player, now);
            let mut lines = vec![format!(
                "Cycle {} to {}, stat gains {}/{}.",
                snapshot.epoch.format(TIME_FORMAT),
                snapshot.limit_time.format(TIME_FORMAT),
                snapshot.stat_increase,
                snapshot.stat_cap
            )];
            for entry in &snapshot.skills {
                let cap = entry
                    .daily_cap
                    .map(format_tenths)
                    .unwrap_or_else(|| "-".to_string());
                lines.push(format!(
                    "{} {}: gained {}/{}, credit {} min, {}",
                    entry.skill,
                    entry.value,
                    format_tenths(entry.gained_tenths),
                    cap,
                    entry.credit_minutes,
                    entry.status
                ));
            }
            if snapshot.skills.is_empty() {
                lines.push("No skills under rate-over-time gain.".to_string());
            }
            lines
        }
        RotCommand::Unknown(name) => vec![format!("Unknown command '!{}'.", name)],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::player::PlayerId;
    use crate::entities::skills::SkillValue;
    use crate::rot::policy::RotPolicy;
    use crate::telemetry::logging::MemoryLog;
    use chrono::{Duration, TimeZone};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    fn player() -> PlayerState {
        let mut player = PlayerState::new(PlayerId(8), "Admin");
        player.skills.set_value(SkillName::Swords, SkillValue::from_points(75));
        player
    }

    #[test]
    fn parse_rot_command_ignores_non_command() {
        assert_eq!(parse_rot_command("hello").unwrap(), None);
    }

    #[test]
    fn parse_rot_command_parses_next_with_spaced_skill() {
        assert_eq!(
            parse_rot_command("!rotnext animal lore").unwrap(),
            Some(RotCommand::Next {
                skill: SkillName::AnimalLore
            })
        );
    }

    #[test]
    fn parse_rot_command_requires_skill_for_next() {
        assert!(matches!(
            parse_rot_command("!rotnext"),
            Err(RotError::Usage(_))
        ));
        assert!(matches!(
            parse_rot_command("!rotnext juggling"),
            Err(RotError::UnknownSkill(_))
        ));
    }

    #[test]
    fn parse_rot_command_parses_credits_and_echo() {
        assert_eq!(
            parse_rot_command("!rotcredits").unwrap(),
            Some(RotCommand::Credits { skill: None })
        );
        assert_eq!(
            parse_rot_command("!RotEcho swords").unwrap(),
            Some(RotCommand::Echo {
                skill: Some(SkillName::Swords)
            })
        );
        assert_eq!(
            parse_rot_command("!rotecho off").unwrap(),
            Some(RotCommand::Echo { skill: None })
        );
    }

    #[test]
    fn parse_rot_command_handles_unknown() {
        assert_eq!(
            parse_rot_command("!whoami").unwrap(),
            Some(RotCommand::Unknown("whoami".to_string()))
        );
        assert_eq!(
            parse_rot_command("!rotstatus").unwrap(),
            Some(RotCommand::Status)
        );
        assert_eq!(parse_rot_command("!rotreset").unwrap(), Some(RotCommand::Reset));
    }

    #[test]
    fn next_reports_remaining_wait() {
        let policy = RotPolicy::default();
        let log = MemoryLog::new();
        let controller = SkillGainController::new(&policy, &log);
        let mut player = player();
        let lines = execute_rot_command(
            &RotCommand::Next {
                skill: SkillName::Swords,
            },
            &mut player,
            &controller,
            start(),
        );
        assert_eq!(
            lines,
            vec!["Swords (75.0) can gain at 01.03.2024 12:05:00: InsufficientWait (5 min remaining)."
                .to_string()]
        );
    }

    #[test]
    fn next_reports_legacy_skill() {
        let policy = RotPolicy::default();
        let log = MemoryLog::new();
        let controller = SkillGainController::new(&policy, &log);
        let mut player = player();
        let lines = execute_rot_command(
            &RotCommand::Next {
                skill: SkillName::Cooking,
            },
            &mut player,
            &controller,
            start(),
        );
        assert_eq!(
            lines,
            vec!["Cooking (0.0) is not under rate-over-time gain.".to_string()]
        );
    }

    #[test]
    fn reset_banks_credit_and_credits_lists_it() {
        let policy = RotPolicy {
            stat_gain_chance: 0.0,
            ..RotPolicy::default()
        };
        let log = MemoryLog::new();
        let controller = SkillGainController::new(&policy, &log);
        let mut rng = StdRng::seed_from_u64(1);
        let mut player = player();
        controller.check(&mut player, SkillName::Swords, start());
        let gained_at = start() + Duration::minutes(10);
        assert!(controller
            .try_gain(&mut player, SkillName::Swords, 1, gained_at, &mut rng)
            .gained());

        let reset_at = gained_at + Duration::minutes(2);
        let lines = execute_rot_command(&RotCommand::Reset, &mut player, &controller, reset_at);
        assert_eq!(
            lines,
            vec!["Cycle reset at 01.03.2024 12:12:00, next reset 02.03.2024 12:12:00; 1 skill(s) carry credit."
                .to_string()]
        );
        let lines = execute_rot_command(
            &RotCommand::Credits { skill: None },
            &mut player,
            &controller,
            reset_at,
        );
        assert_eq!(lines, vec!["Swords: 2 min rollover credit.".to_string()]);
    }

    #[test]
    fn echo_sets_and_clears_player_echo() {
        let policy = RotPolicy::default();
        let log = MemoryLog::new();
        let controller = SkillGainController::new(&policy, &log);
        let mut player = player();
        execute_rot_command(
            &RotCommand::Echo {
                skill: Some(SkillName::Swords),
            },
            &mut player,
            &controller,
            start(),
        );
        assert!(player.echoes(SkillName::Swords));
        let lines = execute_rot_command(
            &RotCommand::Echo { skill: None },
            &mut player,
            &controller,
            start(),
        );
        assert_eq!(player.rot_echo, None);
        assert_eq!(lines, vec!["Rate-over-time echo off.".to_string()]);
    }

    #[test]
    fn status_lists_cycle_and_governed_skills() {
        let policy = RotPolicy::default();
        let log = MemoryLog::new();
        let controller = SkillGainController::new(&policy, &log);
        let mut player = player();
        let lines = execute_rot_command(&RotCommand::Status, &mut player, &controller, start());
        assert_eq!(
            lines,
            vec![
                "Cycle 01.03.2024 12:00:00 to 02.03.2024 12:00:00, stat gains 0/6.".to_string(),
                "Swords 75.0: gained 0.0/5.0, credit 0 min, InsufficientWait (5 min remaining)"
                    .to_string(),
            ]
        );
    }
}
