//! Incremental execution: in-flight actions advanced by fixed time slices.
//!
//! Each actor has at most one in-flight action (`ActionSlot`), moving through
//! `Pending → Running → Done`. One tick advances the shared clock once and
//! then every slot in start order; there is no real concurrency, only
//! ordered sequential mutation of the one world.
//!
//! RULE: Started actions always run to completion. There is no cancel.

use crate::{
    action::{Action, Actor},
    config::EngineConfig,
    effect::EffectPlan,
    energy,
    error::{EngineError, EngineResult},
    types::{SimTime, UnitId, TIME_EPSILON},
    world::World,
};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Pending,
    Running,
    Done,
}

#[derive(Debug, Clone)]
pub struct ActionSlot {
    action:       Action,
    /// Primitive steps still to run; the front one is current.
    steps:        VecDeque<Action>,
    /// Plan of the current step, fixed when that step starts.
    plan:         Option<EffectPlan>,
    phase:        Phase,
    step_elapsed: SimTime,
    started_at:   SimTime,
}

impl ActionSlot {
    fn new(action: Action, world: &World) -> Self {
        Self {
            action,
            steps: action.constituents(world).into(),
            plan: None,
            phase: Phase::Pending,
            step_elapsed: 0.0,
            started_at: world.time(),
        }
    }

    pub fn action(&self) -> Action {
        self.action
    }

    pub fn actor(&self) -> Actor {
        self.action.actor()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn started_at(&self) -> SimTime {
        self.started_at
    }

    /// The primitive currently running (or about to start).
    pub fn current_step(&self) -> Option<Action> {
        self.steps.front().copied()
    }

    /// Advance by `dt`. Returns true once the last step has finished.
    fn advance(&mut self, world: &mut World, config: &EngineConfig, dt: SimTime) -> EngineResult<bool> {
        let mut budget = dt;
        loop {
            let Some(step) = self.steps.front().copied() else {
                self.phase = Phase::Done;
                return Ok(true);
            };

            let plan = match self.plan {
                Some(plan) => plan,
                None => {
                    let plan = step.plan(world, config)?;
                    step.on_start(world)?;
                    self.plan = Some(plan);
                    self.step_elapsed = 0.0;
                    self.phase = Phase::Running;
                    log::debug!("t={:.2} {} started step {step}", world.time(), self.actor());
                    plan
                }
            };

            let slice = budget.min(plan.duration - self.step_elapsed).max(0.0);
            if slice > 0.0 {
                let energy_cost = energy::slice_energy(plan.energy_cost, plan.duration, slice);
                world.battery_mut(plan.actor)?.apply_energy(energy_cost);
                step.advance_motion(world, config, slice)?;
                self.step_elapsed += slice;
                budget -= slice;
            }

            if self.step_elapsed + TIME_EPSILON < plan.duration {
                return Ok(false);
            }

            step.on_done(world)?;
            self.steps.pop_front();
            self.plan = None;

            if self.steps.is_empty() {
                self.phase = Phase::Done;
                return Ok(true);
            }
            if budget <= TIME_EPSILON {
                return Ok(false);
            }
        }
    }
}

/// Outcome of one slot for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StepReport {
    pub actor:     Actor,
    pub action:    Action,
    pub completed: bool,
}

#[derive(Debug, Clone, Default)]
pub struct Stepper {
    slots: Vec<ActionSlot>,
}

impl Stepper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn in_flight(&self) -> impl Iterator<Item = &ActionSlot> {
        self.slots.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_idle(&self, actor: Actor) -> bool {
        self.slots.iter().all(|s| s.actor() != actor)
    }

    /// True while an in-flight carrier action is about to take hold of `unit`.
    pub fn is_reserved(&self, unit: UnitId) -> bool {
        self.slots
            .iter()
            .any(|s| s.actor() == Actor::Carrier && s.action.involves_unit(unit))
    }

    /// Schedule `action`, starting on the next tick.
    ///
    /// The precondition is re-checked here against `world`.
    pub fn start(&mut self, world: &World, action: Action, config: &EngineConfig) -> EngineResult<()> {
        if !action.is_allowed(world, config) {
            log::warn!("t={:.2} refused to start {action}: precondition false", world.time());
            return Err(EngineError::InvalidPrecondition { action: action.name() });
        }

        let actor = action.actor();
        if !self.is_idle(actor) {
            return Err(EngineError::AgentBusy { actor: actor.to_string() });
        }
        match actor {
            Actor::Unit(unit) if self.is_reserved(unit) => {
                return Err(EngineError::UnitReserved { unit });
            }
            Actor::Carrier => {
                let busy_unit = self.slots.iter().map(|s| s.actor()).find(|a| match a {
                    Actor::Unit(unit) => action.involves_unit(*unit),
                    Actor::Carrier => false,
                });
                if let Some(unit) = busy_unit {
                    return Err(EngineError::AgentBusy { actor: unit.to_string() });
                }
            }
            Actor::Unit(_) => {}
        }

        self.slots.push(ActionSlot::new(action, world));
        Ok(())
    }

    /// Advance the clock by `dt` and every in-flight action by the same slice.
    /// Completed actions are reported once and then dropped.
    pub fn tick(&mut self, world: &mut World, dt: SimTime, config: &EngineConfig) -> EngineResult<Vec<StepReport>> {
        check_time_step(dt)?;
        world.clock.advance(dt);

        let mut reports = Vec::with_capacity(self.slots.len());
        for slot in &mut self.slots {
            let completed = slot.advance(world, config, dt)?;
            if completed {
                log::debug!("t={:.2} {} completed {}", world.time(), slot.actor(), slot.action);
            }
            reports.push(StepReport { actor: slot.actor(), action: slot.action, completed });
        }

        self.slots.retain(|s| s.phase != Phase::Done);
        Ok(reports)
    }
}

/// `dt` must be a finite, positive number of seconds.
pub fn check_time_step(dt: SimTime) -> EngineResult<()> {
    if dt.is_finite() && dt > 0.0 {
        Ok(())
    } else {
        Err(EngineError::InvalidTimeStep { dt })
    }
}
