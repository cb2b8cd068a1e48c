//! Reference simulation loops over the engine.
//!
//! SNAPSHOT LOOP (one decision per step):
//!   1. Regenerate the carrier catalogue
//!   2. Narrow it with the lookahead filter
//!   3. Let the policy choose
//!   4. Re-check the precondition, then apply (units co-simulated)
//!
//! STEPPING LOOP (one slice per tick):
//!   1. Idle units: clean, else charge
//!   2. Idle carrier: filter, choose, re-check, start
//!   3. Advance every in-flight action by `dt`
//!
//! RULES:
//!   - No effect runs without its precondition re-checked immediately before.
//!   - Every applied, started or completed action is recorded in the log.
//!   - A finished run stays finished.

use crate::{
    action::{Action, Actor},
    controller::{choose_unit_action, Policy},
    engine::Engine,
    entity::TargetState,
    error::EngineResult,
    event::{EventLog, SimEvent},
    stepping::{check_time_step, Stepper},
    types::{SimTime, UnitId, TIME_EPSILON},
    world::World,
};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    AllClean,
    UnitDepleted { unit: UnitId },
    /// No safe carrier move, or every agent below the safety floor.
    Stranded,
    /// Step or time budget used up.
    StepLimit,
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunOutcome::AllClean => write!(f, "all targets clean"),
            RunOutcome::UnitDepleted { unit } => write!(f, "unit {unit} ran out of battery"),
            RunOutcome::Stranded => write!(f, "carrier stranded"),
            RunOutcome::StepLimit => write!(f, "limit reached"),
        }
    }
}

/// Outcome shared by both loops, checked after every transition.
fn terminal_outcome(world: &World, safety_floor: f64) -> Option<RunOutcome> {
    if world.all_targets_clean() {
        return Some(RunOutcome::AllClean);
    }
    if let Some(unit) = world.units.iter().position(|u| u.battery.is_depleted()) {
        return Some(RunOutcome::UnitDepleted { unit });
    }
    let all_below = world.carrier.battery.level < safety_floor
        && world.units.iter().all(|u| u.battery.level < safety_floor);
    if all_below {
        return Some(RunOutcome::Stranded);
    }
    None
}

/// Log a `TargetCleaned` for every target that flipped since `before`.
fn record_cleaned(before: &[TargetState], world: &World, events: &mut EventLog) {
    for (target, (was, now)) in before.iter().zip(&world.targets).enumerate() {
        if *was == TargetState::Dirty && now.state == TargetState::Clean {
            let unit = world.units.iter().position(|u| u.on_target == Some(target));
            events.push(SimEvent::TargetCleaned { time: world.time(), target, unit });
        }
    }
}

fn target_states(world: &World) -> Vec<TargetState> {
    world.targets.iter().map(|t| t.state).collect()
}

fn has_carrier_move(safe: &[Action]) -> bool {
    safe.iter().any(|a| a.actor() == Actor::Carrier && !a.is_null())
}

// ── Snapshot loop ────────────────────────────────────────────────────────────

pub struct SnapshotSimulation<P> {
    engine:              Engine,
    world:               World,
    policy:              P,
    events:              EventLog,
    steps:               u64,
    precondition_checks: u64,
    outcome:             Option<RunOutcome>,
}

impl<P: Policy> SnapshotSimulation<P> {
    pub fn new(engine: Engine, world: World, policy: P) -> Self {
        Self {
            engine,
            world,
            policy,
            events: EventLog::new(),
            steps: 0,
            precondition_checks: 0,
            outcome: None,
        }
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn events(&self) -> &EventLog {
        &self.events
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// How many times a chosen action's precondition was re-checked before
    /// its effect ran. Equals `steps` in a correct run.
    pub fn precondition_checks(&self) -> u64 {
        self.precondition_checks
    }

    pub fn outcome(&self) -> Option<RunOutcome> {
        self.outcome
    }

    pub fn policy(&self) -> &P {
        &self.policy
    }

    fn finish(&mut self, outcome: RunOutcome) -> RunOutcome {
        if self.outcome.is_none() {
            log::info!(
                "snapshot run finished after {} steps at t={:.2}: {outcome}",
                self.steps,
                self.world.time()
            );
            self.events.push(SimEvent::RunFinished {
                time: self.world.time(),
                outcome,
                steps: self.steps,
            });
            self.outcome = Some(outcome);
        }
        outcome
    }

    /// One decision. Returns the outcome once the run has ended.
    pub fn step(&mut self) -> EngineResult<Option<RunOutcome>> {
        if let Some(outcome) = self.outcome {
            return Ok(Some(outcome));
        }
        if let Some(outcome) = terminal_outcome(&self.world, self.engine.config().safety_floor_pct) {
            return Ok(Some(self.finish(outcome)));
        }

        let catalogue = self.engine.carrier_actions(&self.world);
        let safe = self.engine.safe_allowed(&catalogue, &self.world);
        if !has_carrier_move(&safe) {
            return Ok(Some(self.finish(RunOutcome::Stranded)));
        }

        let action = self.policy.choose(&self.world, &safe);
        log::debug!(
            "step={} t={:.2} {} chose {action} from {} safe",
            self.steps,
            self.world.time(),
            self.policy.name(),
            safe.len()
        );

        self.precondition_checks += 1;
        let before = target_states(&self.world);
        let started_at = self.world.time();
        let (next, plan) = self.engine.try_apply(&action, &self.world, false)?;

        self.events.push(SimEvent::ActionApplied {
            time: started_at,
            action,
            duration: plan.duration,
            energy_cost: plan.energy_cost,
        });
        record_cleaned(&before, &next, &mut self.events);
        self.world = next;
        self.steps += 1;

        Ok(terminal_outcome(&self.world, self.engine.config().safety_floor_pct)
            .map(|outcome| self.finish(outcome)))
    }

    pub fn run(&mut self, max_steps: u64) -> EngineResult<RunOutcome> {
        while self.steps < max_steps {
            if let Some(outcome) = self.step()? {
                return Ok(outcome);
            }
        }
        Ok(self.finish(RunOutcome::StepLimit))
    }
}

// ── Stepping loop ────────────────────────────────────────────────────────────

pub struct SteppingSimulation<P> {
    engine:              Engine,
    world:               World,
    stepper:             Stepper,
    policy:              P,
    events:              EventLog,
    ticks:               u64,
    precondition_checks: u64,
    outcome:             Option<RunOutcome>,
}

impl<P: Policy> SteppingSimulation<P> {
    pub fn new(engine: Engine, world: World, policy: P) -> Self {
        Self {
            engine,
            world,
            stepper: Stepper::new(),
            policy,
            events: EventLog::new(),
            ticks: 0,
            precondition_checks: 0,
            outcome: None,
        }
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn stepper(&self) -> &Stepper {
        &self.stepper
    }

    pub fn events(&self) -> &EventLog {
        &self.events
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Number of actions started; each was re-checked right before.
    pub fn precondition_checks(&self) -> u64 {
        self.precondition_checks
    }

    pub fn outcome(&self) -> Option<RunOutcome> {
        self.outcome
    }

    fn finish(&mut self, outcome: RunOutcome) -> RunOutcome {
        if self.outcome.is_none() {
            log::info!(
                "stepping run finished after {} ticks at t={:.2}: {outcome}",
                self.ticks,
                self.world.time()
            );
            self.events.push(SimEvent::RunFinished {
                time: self.world.time(),
                outcome,
                steps: self.ticks,
            });
            self.outcome = Some(outcome);
        }
        outcome
    }

    fn start(&mut self, action: Action) -> EngineResult<()> {
        self.precondition_checks += 1;
        self.engine.start(&mut self.stepper, &self.world, action)?;
        self.events.push(SimEvent::ActionStarted {
            time: self.world.time(),
            actor: action.actor(),
            action,
        });
        Ok(())
    }

    /// Units first (clean, else charge), then the carrier, which may not
    /// take hold of a unit that has an action in flight.
    /// Returns false when the carrier is idle with no safe move.
    fn start_idle_agents(&mut self) -> EngineResult<bool> {
        for unit in 0..self.world.units.len() {
            if !self.stepper.is_idle(Actor::Unit(unit))
                || self.stepper.is_reserved(unit)
                || self.world.is_carried(unit)
            {
                continue;
            }
            let candidates = self.engine.unit_actions(&self.world, unit)?;
            let allowed = self.engine.allowed(&candidates, &self.world);
            if let Some(action) = choose_unit_action(&allowed) {
                self.start(action)?;
            }
        }

        if !self.stepper.is_idle(Actor::Carrier) {
            return Ok(true);
        }
        let catalogue = self.engine.carrier_actions(&self.world);
        let mut safe = self.engine.safe_allowed(&catalogue, &self.world);
        let units = self.world.units.len();
        let stepper = &self.stepper;
        safe.retain(|a| (0..units).all(|u| stepper.is_idle(Actor::Unit(u)) || !a.involves_unit(u)));

        let action = self.policy.choose(&self.world, &safe);
        if !action.is_null() {
            self.start(action)?;
        }
        Ok(has_carrier_move(&safe))
    }

    /// Start what can start, then advance everything by `dt`.
    pub fn tick(&mut self, dt: SimTime) -> EngineResult<Option<RunOutcome>> {
        check_time_step(dt)?;
        if let Some(outcome) = self.outcome {
            return Ok(Some(outcome));
        }
        let floor = self.engine.config().safety_floor_pct;
        if let Some(outcome) = terminal_outcome(&self.world, floor) {
            return Ok(Some(self.finish(outcome)));
        }

        let carrier_ok = self.start_idle_agents()?;
        if !carrier_ok && self.stepper.is_empty() {
            return Ok(Some(self.finish(RunOutcome::Stranded)));
        }

        let before = target_states(&self.world);
        let reports = self.engine.tick(&mut self.stepper, &mut self.world, dt)?;
        for report in reports.iter().filter(|r| r.completed) {
            self.events.push(SimEvent::ActionCompleted {
                time: self.world.time(),
                actor: report.actor,
                action: report.action,
            });
        }
        record_cleaned(&before, &self.world, &mut self.events);
        self.ticks += 1;

        Ok(terminal_outcome(&self.world, floor).map(|outcome| self.finish(outcome)))
    }

    pub fn run_until(&mut self, end_time: SimTime, dt: SimTime) -> EngineResult<RunOutcome> {
        check_time_step(dt)?;
        while self.world.time() + TIME_EPSILON < end_time {
            if let Some(outcome) = self.tick(dt)? {
                return Ok(outcome);
            }
        }
        Ok(self.finish(RunOutcome::StepLimit))
    }
}
