//! fleet-runner: headless runner for the window cleaning fleet.
//!
//! Usage:
//!   fleet-runner --seed 12345 --steps 200 --units 2 --targets 5
//!   fleet-runner --mode stepping --dt 0.5 --steps 2000 --sleep-ms 20
//!   fleet-runner --config engine.json --events > run.jsonl

use anyhow::Result;
use std::env;
use std::thread;
use std::time::Duration;
use windowfleet_core::{
    controller::PriorityPolicy,
    event::EventLog,
    rng::{SimRng, StreamSlot},
    scenario::random_scenario,
    Engine, EngineConfig, RunOutcome, ScenarioConfig, SnapshotSimulation, SteppingSimulation, World,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Snapshot,
    Stepping,
}

#[derive(serde::Serialize)]
struct RunSummary {
    seed:            u64,
    mode:            &'static str,
    outcome:         RunOutcome,
    steps:           u64,
    sim_time:        f64,
    targets_clean:   usize,
    targets_total:   usize,
    carrier_battery: f64,
    unit_batteries:  Vec<f64>,
    events:          usize,
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let seed = parse_arg(&args, "--seed", 42u64);
    let steps = parse_arg(&args, "--steps", 200u64);
    let units = parse_arg(&args, "--units", 2usize);
    let targets = parse_arg(&args, "--targets", 5usize);
    let dt = parse_time_step(&args)?;
    let sleep_ms = parse_arg(&args, "--sleep-ms", 0u64);
    let print_events = args.iter().any(|a| a == "--events");
    let summary_json = args.iter().any(|a| a == "--summary-json");
    let mode = match flag_value(&args, "--mode") {
        None | Some("snapshot") => Mode::Snapshot,
        Some("stepping") => Mode::Stepping,
        Some(other) => anyhow::bail!("unknown --mode '{other}' (expected snapshot|stepping)"),
    };

    let config = match flag_value(&args, "--config") {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    log::info!("seed={seed} mode={mode:?} units={units} targets={targets} dt={dt}");

    let scenario = ScenarioConfig { num_units: units, num_targets: targets, ..ScenarioConfig::default() };
    let world = random_scenario(seed, &scenario);
    let engine = Engine::new(config);
    let policy = PriorityPolicy::new(SimRng::new(seed, StreamSlot::Policy), engine.config());

    if !print_events && !summary_json {
        println!("windowfleet fleet-runner");
        println!("  seed:      {seed}");
        println!("  mode:      {mode:?}");
        println!("  steps:     {steps}");
        println!("  units:     {units}");
        println!("  targets:   {targets} ({} dirty)", world.dirty_target_count());
        println!();
    }

    let (outcome, world, events, executed) = match mode {
        Mode::Snapshot => {
            let mut sim = SnapshotSimulation::new(engine, world, policy);
            let outcome = loop {
                if sim.steps() >= steps {
                    break sim.run(steps)?;
                }
                if let Some(outcome) = sim.step()? {
                    break outcome;
                }
                pace(sleep_ms);
            };
            let executed = sim.steps();
            (outcome, sim.world().clone(), sim.events().clone(), executed)
        }
        Mode::Stepping => {
            let mut sim = SteppingSimulation::new(engine, world, policy);
            let outcome = loop {
                if sim.ticks() >= steps {
                    let now = sim.world().time();
                    break sim.run_until(now, dt)?;
                }
                if let Some(outcome) = sim.tick(dt)? {
                    break outcome;
                }
                pace(sleep_ms);
            };
            let executed = sim.ticks();
            (outcome, sim.world().clone(), sim.events().clone(), executed)
        }
    };

    if print_events {
        print!("{}", events.to_json_lines()?);
        return Ok(());
    }

    let summary = summarize(seed, mode, outcome, executed, &world, &events);
    if summary_json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary(&summary);
    }
    Ok(())
}

fn summarize(seed: u64, mode: Mode, outcome: RunOutcome, steps: u64, world: &World, events: &EventLog) -> RunSummary {
    RunSummary {
        seed,
        mode: match mode {
            Mode::Snapshot => "snapshot",
            Mode::Stepping => "stepping",
        },
        outcome,
        steps,
        sim_time: world.time(),
        targets_clean: world.targets.len() - world.dirty_target_count(),
        targets_total: world.targets.len(),
        carrier_battery: world.carrier.battery.level,
        unit_batteries: world.units.iter().map(|u| u.battery.level).collect(),
        events: events.len(),
    }
}

fn print_summary(summary: &RunSummary) {
    println!("=== RUN SUMMARY ===");
    println!("  outcome:         {}", summary.outcome);
    println!("  steps run:       {}", summary.steps);
    println!("  sim time:        {:.1}s", summary.sim_time);
    println!("  targets clean:   {}/{}", summary.targets_clean, summary.targets_total);
    println!("  carrier battery: {:.1}%", summary.carrier_battery);
    for (i, level) in summary.unit_batteries.iter().enumerate() {
        println!("  unit {i} battery:  {level:.1}%");
    }
    println!("  events logged:   {}", summary.events);
}

fn pace(sleep_ms: u64) {
    if sleep_ms > 0 {
        thread::sleep(Duration::from_millis(sleep_ms));
    }
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2).find(|w| w[0] == flag).map(|w| w[1].as_str())
}

fn parse_time_step(args: &[String]) -> Result<f64> {
    let dt = parse_arg(args, "--dt", 0.5f64);
    if !(dt.is_finite() && dt > 0.0) {
        anyhow::bail!("--dt must be a positive number of seconds, got {dt}");
    }
    Ok(dt)
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    match flag_value(args, flag) {
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            log::warn!("Ignoring {flag} '{raw}': not a valid value, using the default");
            default
        }),
        None => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        std::iter::once("fleet-runner").chain(list.iter().copied()).map(String::from).collect()
    }

    #[test]
    fn time_step_must_be_positive() {
        assert_eq!(parse_time_step(&args(&[])).unwrap(), 0.5);
        assert_eq!(parse_time_step(&args(&["--dt", "0.25"])).unwrap(), 0.25);
        for bad in ["-1", "0", "NaN", "inf"] {
            assert!(parse_time_step(&args(&["--dt", bad])).is_err(), "--dt {bad}");
        }
    }

    #[test]
    fn unparsable_flag_falls_back_to_default() {
        assert_eq!(parse_arg(&args(&["--seed", "abc"]), "--seed", 42u64), 42);
        assert_eq!(parse_arg(&args(&["--seed", "7"]), "--seed", 42u64), 7);
    }
}
