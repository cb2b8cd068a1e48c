//! Action effects: what an action costs and what it changes.
//!
//! Each primitive has three hooks shared by both execution models:
//!   - `on_start`       flag toggles (`moving`, `occupied`, `cleaning`, `charging`)
//!   - `advance_motion` moves the carrier (and its cargo) for a time slice
//!   - `on_done`        attach/detach cargo, flip target state, refill, reset flags
//!
//! Energy is not a hook: the execution models apply `EffectPlan::energy_cost`
//! either in one piece (snapshot) or proportionally per slice (stepping).

use crate::{
    action::{Action, Actor},
    config::EngineConfig,
    energy,
    entity::TargetState,
    error::{EngineError, EngineResult},
    types::{SimTime, Vec3},
    world::World,
};
use serde::{Deserialize, Serialize};

/// Duration and energy of one action, fixed when it starts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EffectPlan {
    pub actor:       Actor,
    pub duration:    SimTime,
    /// Joules; negative for charging.
    pub energy_cost: f64,
}

impl EffectPlan {
    pub fn idle(actor: Actor) -> Self {
        Self { actor, duration: 0.0, energy_cost: 0.0 }
    }

    /// Average power over the action (J/s). Zero for instantaneous actions.
    pub fn average_power(&self) -> f64 {
        if self.duration > 0.0 {
            self.energy_cost / self.duration
        } else {
            0.0
        }
    }
}

fn missing_attachment(action: &Action) -> EngineError {
    EngineError::InvalidPrecondition { action: action.name() }
}

impl Action {
    /// Duration and energy cost of this action if started in `world`.
    /// Composites are dry-run on a copy and report the sum of their steps.
    pub fn plan(&self, world: &World, config: &EngineConfig) -> EngineResult<EffectPlan> {
        if self.is_composite() {
            let mut scratch = world.clone();
            return self.run_to_completion(&mut scratch, config);
        }

        let actor = self.actor();
        let carrier = &world.carrier;
        let plan = match *self {
            Action::FlyToTarget { .. } | Action::ReturnToBase => {
                let dest = self.destination(world)?;
                let duration = energy::travel_duration(carrier.position, dest, config.carrier_speed);
                EffectPlan { actor, duration, energy_cost: energy::draw(duration, config.carrier_fly_power) }
            }
            Action::PickupUnit { .. } | Action::DropoffUnit { .. } => {
                let duration = config.handling_duration;
                EffectPlan { actor, duration, energy_cost: energy::draw(duration, config.handling_power) }
            }
            Action::PickupUnitAtBase { .. } | Action::DropoffUnitAtBase => {
                let duration = config.base_handling_duration;
                EffectPlan { actor, duration, energy_cost: energy::draw(duration, config.handling_power) }
            }
            Action::ChargeCarrier => {
                let duration = energy::charge_duration(
                    carrier.battery.energy_needed(),
                    config.carrier_charge_rate,
                    config.carrier_charge_min_duration,
                );
                EffectPlan { actor, duration, energy_cost: energy::charge_energy(duration, config.carrier_charge_rate) }
            }
            Action::ChargeUnit { unit } => {
                let needed = world.unit(unit)?.battery.energy_needed();
                let duration = energy::charge_duration(needed, config.unit_charge_rate, 0.0);
                EffectPlan { actor, duration, energy_cost: energy::charge_energy(duration, config.unit_charge_rate) }
            }
            Action::CleanTarget { unit } => {
                let target = world.unit(unit)?.on_target.ok_or_else(|| missing_attachment(self))?;
                let duration = world.target(target)?.cleaning_duration;
                EffectPlan { actor, duration, energy_cost: energy::draw(duration, config.cleaning_power) }
            }
            Action::Null { actor } => EffectPlan::idle(actor),
            Action::FlyAndDropoff { .. }
            | Action::FlyAndPickup { .. }
            | Action::FlyToBaseAndDropoff
            | Action::FlyToBaseAndCharge => unreachable!("composites are planned above"),
        };
        Ok(plan)
    }

    /// Where a flight ends. Errors for actions that do not fly.
    pub fn destination(&self, world: &World) -> EngineResult<Vec3> {
        match *self {
            Action::FlyToTarget { target } => Ok(world.target(target)?.position),
            Action::ReturnToBase => Ok(world.base.position),
            _ => Err(EngineError::InvalidPrecondition { action: self.name() }),
        }
    }

    pub(crate) fn on_start(&self, world: &mut World) -> EngineResult<()> {
        debug_assert!(!self.is_composite(), "hooks run on primitives only");
        match *self {
            Action::FlyToTarget { .. } | Action::ReturnToBase => {
                let dest = self.destination(world)?;
                let heading = dest - world.carrier.position;
                let length = heading.norm();
                if length > 0.0 {
                    world.carrier.orientation = heading * (1.0 / length);
                }
                world.carrier.moving = true;
            }
            Action::PickupUnit { .. }
            | Action::PickupUnitAtBase { .. }
            | Action::DropoffUnit { .. }
            | Action::DropoffUnitAtBase
            | Action::ChargeCarrier => world.carrier.occupied = true,
            Action::ChargeUnit { unit } => world.unit_mut(unit)?.charging = true,
            Action::CleanTarget { unit } => world.unit_mut(unit)?.cleaning = true,
            Action::Null { .. }
            | Action::FlyAndDropoff { .. }
            | Action::FlyAndPickup { .. }
            | Action::FlyToBaseAndDropoff
            | Action::FlyToBaseAndCharge => {}
        }
        Ok(())
    }

    /// Move the carrier for `dt` seconds of a flight. No-op for everything else.
    pub(crate) fn advance_motion(&self, world: &mut World, config: &EngineConfig, dt: SimTime) -> EngineResult<()> {
        if let Action::FlyToTarget { .. } | Action::ReturnToBase = self {
            let dest = self.destination(world)?;
            world.carrier.position = world.carrier.position.step_toward(dest, config.carrier_speed * dt);
            world.sync_cargo();
        }
        Ok(())
    }

    pub(crate) fn on_done(&self, world: &mut World) -> EngineResult<()> {
        debug_assert!(!self.is_composite(), "hooks run on primitives only");
        match *self {
            Action::FlyToTarget { .. } | Action::ReturnToBase => {
                world.carrier.position = self.destination(world)?;
                world.carrier.moving = false;
                world.sync_cargo();
            }
            Action::PickupUnit { unit } | Action::PickupUnitAtBase { unit } => {
                let position = world.carrier.position;
                let u = world.unit_mut(unit)?;
                u.cleaning = false;
                u.on_target = None;
                u.position = position;
                world.carrier.cargo = Some(unit);
                world.carrier.occupied = false;
            }
            Action::DropoffUnit { target } => {
                let position = world.target(target)?.position;
                if let Some(unit) = world.carrier.cargo.take() {
                    let u = world.unit_mut(unit)?;
                    u.position = position;
                    u.on_target = Some(target);
                }
                world.carrier.occupied = false;
            }
            Action::DropoffUnitAtBase => {
                let position = world.base.position;
                if let Some(unit) = world.carrier.cargo.take() {
                    let u = world.unit_mut(unit)?;
                    u.position = position;
                    u.on_target = None;
                }
                world.carrier.occupied = false;
            }
            Action::ChargeCarrier => {
                world.carrier.battery.set_full();
                world.carrier.occupied = false;
            }
            Action::ChargeUnit { unit } => {
                let u = world.unit_mut(unit)?;
                u.battery.set_full();
                u.charging = false;
            }
            Action::CleanTarget { unit } => {
                let u = world.unit_mut(unit)?;
                u.cleaning = false;
                let target = u.on_target.ok_or_else(|| missing_attachment(self))?;
                world.target_mut(target)?.state = TargetState::Clean;
            }
            Action::Null { .. }
            | Action::FlyAndDropoff { .. }
            | Action::FlyAndPickup { .. }
            | Action::FlyToBaseAndDropoff
            | Action::FlyToBaseAndCharge => {}
        }
        Ok(())
    }

    /// Run every step of this action in one transition, without touching the
    /// clock. Returns the realised plan (durations and energy summed over steps).
    pub(crate) fn run_to_completion(&self, world: &mut World, config: &EngineConfig) -> EngineResult<EffectPlan> {
        let mut total = EffectPlan::idle(self.actor());
        for step in self.constituents(world) {
            let plan = step.run_primitive(world, config)?;
            total.duration += plan.duration;
            total.energy_cost += plan.energy_cost;
        }
        Ok(total)
    }

    fn run_primitive(&self, world: &mut World, config: &EngineConfig) -> EngineResult<EffectPlan> {
        let plan = self.plan(world, config)?;
        self.on_start(world)?;
        if plan.duration > 0.0 {
            world.battery_mut(plan.actor)?.apply_energy(plan.energy_cost);
        }
        self.advance_motion(world, config, plan.duration)?;
        self.on_done(world)?;
        log::debug!(
            "t={:.2} {} ran: duration={:.2}s energy={:.2}J",
            world.time(),
            self,
            plan.duration,
            plan.energy_cost
        );
        Ok(plan)
    }
}
