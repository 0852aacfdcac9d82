use chrono::{Duration, TimeZone, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rotgain::entities::player::{PlayerId, PlayerState};
use rotgain::entities::skills::{SkillName, SkillValue};
use rotgain::rot::clock::{Clock, ManualClock};
use rotgain::rot::gain::{GainOutcome, SkillGainController};
use rotgain::rot::policy::RotPolicy;
use rotgain::telemetry::logging::{MemoryLog, RotLogCategory};

const USAGE: &str = "usage: rot_simulate [skill] [start-points] [hours] [seed] [policy.yaml]";

struct SimArgs {
    skill: SkillName,
    start: SkillValue,
    minutes: i64,
    seed: u64,
    policy: RotPolicy,
}

fn parse_args(args: &[String]) -> Result<SimArgs, String> {
    let skill = match args.get(1) {
        Some(value) => value.parse::<SkillName>().map_err(|err| err.to_string())?,
        None => SkillName::Swords,
    };
    let start = match args.get(2) {
        Some(value) => SkillValue::from_f64(
            value
                .parse::<f64>()
                .map_err(|_| format!("start-points must be a number, got '{value}'"))?,
        ),
        None => SkillValue::from_points(75),
    };
    let hours = match args.get(3) {
        Some(value) => value
            .parse::<i64>()
            .map_err(|_| format!("hours must be an integer, got '{value}'"))?,
        None => 48,
    };
    let seed = match args.get(4) {
        Some(value) => value
            .parse::<u64>()
            .map_err(|_| format!("seed must be an integer, got '{value}'"))?,
        None => 7,
    };
    let policy = match args.get(5) {
        Some(path) => RotPolicy::load(std::path::Path::new(path)).map_err(|err| err.to_string())?,
        None => RotPolicy::default(),
    };
    let minutes = hours
        .max(1)
        .checked_mul(60)
        .ok_or_else(|| format!("hours too large, got '{hours}'"))?;
    Ok(SimArgs {
        skill,
        start,
        minutes,
        seed,
        policy,
    })
}

fn main() {
    let args: Vec<String> = std::env::args().collect();
    let sim = match parse_args(&args) {
        Ok(sim) => sim,
        Err(err) => {
            eprintln!("rot_simulate: {}", err);
            eprintln!("{}", USAGE);
            std::process::exit(2);
        }
    };

    let start = Utc
        .with_ymd_and_hms(2024, 3, 1, 0, 0, 0)
        .single()
        .unwrap_or_else(Utc::now);
    let clock = ManualClock::new(start);
    let log = MemoryLog::new();
    let controller = SkillGainController::new(&sim.policy, &log);
    let mut rng = StdRng::seed_from_u64(sim.seed);
    let mut player = PlayerState::new(PlayerId(1), "Simulated");
    player.skills.set_value(sim.skill, sim.start);

    println!(
        "rot_simulate: {} from {} for {}h (seed {})",
        sim.skill, sim.start, sim.minutes / 60, sim.seed
    );
    let mut attempts = 0usize;
    let mut gains = 0usize;
    let mut blocked = 0usize;
    let mut hour_start_value = player.skills.value(sim.skill);
    for minute in 0..sim.minutes {
        let now = clock.now();
        // One successful use roll roughly every other minute.
        if rng.gen_bool(0.5) {
            attempts += 1;
            let report = controller.try_gain(&mut player, sim.skill, 1, now, &mut rng);
            match report.outcome {
                GainOutcome::Gained { applied, .. } if applied > 0 => gains += 1,
                GainOutcome::Blocked(_) => blocked += 1,
                _ => {}
            }
            if let Some(stat) = report.stat_gain {
                println!("  {} stat gain: {} -> {}", now.format("%H:%M"), stat.stat, stat.value);
            }
        }
        if (minute + 1) % 60 == 0 {
            let value = player.skills.value(sim.skill);
            println!(
                "  {} {}: {} (+{})",
                now.format("%d.%m %H:%M"),
                sim.skill,
                value,
                SkillValue(value.tenths().saturating_sub(hour_start_value.tenths()))
            );
            hour_start_value = value;
        }
        clock.advance(Duration::minutes(1));
    }

    println!("- attempts: {}", attempts);
    println!("- gains: {}", gains);
    println!("- blocked: {}", blocked);
    println!("- final value: {}", player.skills.value(sim.skill));
    for category in [
        RotLogCategory::CycleReset,
        RotLogCategory::CreditsIssued,
        RotLogCategory::CreditsApplied,
        RotLogCategory::MaxSkillGain,
        RotLogCategory::StatGain,
    ] {
        println!("- log {}: {}", category.name(), log.count(category));
    }
}
