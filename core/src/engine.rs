//! The engine facade: one configuration, every feasibility and effect query.
//!
//! EXECUTION MODELS:
//!   1. Snapshot  (`apply`)  one action, whole duration, new owned world
//!   2. Stepping  (`tick`)   in-flight actions advanced by a fixed slice
//!
//! RULES:
//!   - Preconditions are queries; they never mutate.
//!   - Effects run only on actions whose precondition held when they started.
//!   - All tunables come from the `EngineConfig` owned here.
//!   - The engine never retries and never picks actions. Recovery is the
//!     caller's next choice.

use crate::{
    action::Action,
    catalogue,
    config::EngineConfig,
    effect::EffectPlan,
    error::{EngineError, EngineResult},
    lookahead::{self, SafetyVerdict},
    snapshot,
    stepping::{StepReport, Stepper},
    types::{SimTime, UnitId},
    world::World,
};

#[derive(Debug, Clone, Default)]
pub struct Engine {
    config: EngineConfig,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // ── Catalogue ────────────────────────────────────────────────────────────

    /// Every action bound to the current entities, per the configured mode.
    pub fn build_action_catalogue(&self, world: &World) -> Vec<Action> {
        catalogue::build_action_catalogue(world, self.config.catalogue)
    }

    pub fn carrier_actions(&self, world: &World) -> Vec<Action> {
        catalogue::carrier_actions(world, self.config.catalogue)
    }

    pub fn unit_actions(&self, world: &World, unit: UnitId) -> EngineResult<Vec<Action>> {
        world.unit(unit)?;
        Ok(catalogue::unit_actions(unit).to_vec())
    }

    // ── Feasibility ──────────────────────────────────────────────────────────

    pub fn is_allowed(&self, action: &Action, world: &World) -> bool {
        action.is_allowed(world, &self.config)
    }

    pub fn allowed(&self, actions: &[Action], world: &World) -> Vec<Action> {
        catalogue::allowed(actions, world, &self.config)
    }

    pub fn safe_allowed(&self, actions: &[Action], world: &World) -> Vec<Action> {
        lookahead::safe_allowed(actions, world, &self.config)
    }

    pub fn assess(&self, action: &Action, world: &World) -> EngineResult<SafetyVerdict> {
        lookahead::assess(action, world, &self.config)
    }

    // ── Effects ──────────────────────────────────────────────────────────────

    pub fn plan(&self, action: &Action, world: &World) -> EngineResult<EffectPlan> {
        action.plan(world, &self.config)
    }

    /// Run-to-completion application. The precondition must hold.
    /// Co-simulated unit actions always finish, whatever the carrier's
    /// duration; see `snapshot::apply`.
    pub fn apply(&self, action: &Action, world: &World, drone_only: bool) -> EngineResult<World> {
        snapshot::apply(action, world, &self.config, drone_only)
    }

    /// `apply` that re-checks the precondition and reports the realised plan.
    pub fn try_apply(
        &self,
        action: &Action,
        world: &World,
        drone_only: bool,
    ) -> EngineResult<(World, EffectPlan)> {
        if !self.is_allowed(action, world) {
            log::warn!("t={:.2} refused to apply {action}: precondition false", world.time());
            return Err(EngineError::InvalidPrecondition { action: action.name() });
        }
        snapshot::apply_with_plan(action, world, &self.config, drone_only)
    }

    /// Schedule `action` on `stepper`. Precondition re-checked.
    pub fn start(&self, stepper: &mut Stepper, world: &World, action: Action) -> EngineResult<()> {
        stepper.start(world, action, &self.config)
    }

    pub fn tick(&self, stepper: &mut Stepper, world: &mut World, dt: SimTime) -> EngineResult<Vec<StepReport>> {
        stepper.tick(world, dt, &self.config)
    }
}
