//! World state container: every entity plus the simulation clock.
//!
//! RULE: Entities refer to each other by index only (`cargo`, `on_target`).
//! A `World` therefore clones into a fully independent snapshot, which is
//! what lets the lookahead evaluate candidates against one base state.

use crate::{
    action::Actor,
    clock::SimClock,
    entity::{Base, Battery, Carrier, CleaningUnit, Target, TargetState},
    error::{EngineError, EngineResult},
    types::{SimTime, TargetId, UnitId},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct World {
    pub carrier: Carrier,
    pub base:    Base,
    pub units:   Vec<CleaningUnit>,
    pub targets: Vec<Target>,
    pub clock:   SimClock,
}

impl World {
    pub fn new(base: Base, carrier: Carrier, units: Vec<CleaningUnit>, targets: Vec<Target>) -> Self {
        Self { carrier, base, units, targets, clock: SimClock::new() }
    }

    pub fn time(&self) -> SimTime {
        self.clock.elapsed()
    }

    // ── Checked accessors ────────────────────────────────────────────────────

    pub fn unit(&self, id: UnitId) -> EngineResult<&CleaningUnit> {
        let len = self.units.len();
        self.units
            .get(id)
            .ok_or(EngineError::IndexOutOfRange { entity: "unit", index: id, len })
    }

    pub fn unit_mut(&mut self, id: UnitId) -> EngineResult<&mut CleaningUnit> {
        let len = self.units.len();
        self.units
            .get_mut(id)
            .ok_or(EngineError::IndexOutOfRange { entity: "unit", index: id, len })
    }

    pub fn target(&self, id: TargetId) -> EngineResult<&Target> {
        let len = self.targets.len();
        self.targets
            .get(id)
            .ok_or(EngineError::IndexOutOfRange { entity: "target", index: id, len })
    }

    pub fn target_mut(&mut self, id: TargetId) -> EngineResult<&mut Target> {
        let len = self.targets.len();
        self.targets
            .get_mut(id)
            .ok_or(EngineError::IndexOutOfRange { entity: "target", index: id, len })
    }

    pub fn battery(&self, actor: Actor) -> EngineResult<&Battery> {
        match actor {
            Actor::Carrier => Ok(&self.carrier.battery),
            Actor::Unit(id) => Ok(&self.unit(id)?.battery),
        }
    }

    pub fn battery_mut(&mut self, actor: Actor) -> EngineResult<&mut Battery> {
        match actor {
            Actor::Carrier => Ok(&mut self.carrier.battery),
            Actor::Unit(id) => Ok(&mut self.unit_mut(id)?.battery),
        }
    }

    // ── Queries ──────────────────────────────────────────────────────────────

    pub fn is_carried(&self, unit: UnitId) -> bool {
        self.carrier.cargo == Some(unit)
    }

    pub fn carrier_at_base(&self) -> bool {
        self.carrier.is_at(self.base.position)
    }

    /// True when the unit rests at the base (being carried there does not count).
    pub fn unit_at_base(&self, unit: UnitId) -> bool {
        !self.is_carried(unit)
            && self
                .units
                .get(unit)
                .is_some_and(|u| u.position.approx_eq(self.base.position))
    }

    pub fn all_targets_clean(&self) -> bool {
        self.targets.iter().all(|t| t.state == TargetState::Clean)
    }

    pub fn dirty_target_count(&self) -> usize {
        self.targets.iter().filter(|t| t.is_dirty()).count()
    }

    /// Lowest battery level across carrier and units.
    pub fn lowest_battery(&self) -> f64 {
        self.units
            .iter()
            .map(|u| u.battery.level)
            .fold(self.carrier.battery.level, f64::min)
    }

    // ── Position-follows rule ────────────────────────────────────────────────

    /// Snap the carried unit onto the carrier. Called after every carrier move.
    pub fn sync_cargo(&mut self) {
        if let Some(id) = self.carrier.cargo {
            let position = self.carrier.position;
            if let Some(unit) = self.units.get_mut(id) {
                unit.position = position;
            }
        }
    }

    pub fn check_invariants(&self) -> EngineResult<()> {
        let in_range = |level: f64| (0.0..=100.0).contains(&level);

        if !in_range(self.carrier.battery.level) {
            return Err(EngineError::InvariantViolated(format!(
                "carrier battery {} outside [0, 100]",
                self.carrier.battery.level
            )));
        }

        if let Some(cargo) = self.carrier.cargo {
            let unit = self.unit(cargo)?;
            if unit.on_target.is_some() {
                return Err(EngineError::InvariantViolated(format!(
                    "carried unit '{}' is still attached to a target",
                    unit.name
                )));
            }
            if !unit.position.approx_eq(self.carrier.position) {
                return Err(EngineError::InvariantViolated(format!(
                    "carried unit '{}' at {} but carrier at {}",
                    unit.name, unit.position, self.carrier.position
                )));
            }
        }

        for unit in &self.units {
            if !in_range(unit.battery.level) {
                return Err(EngineError::InvariantViolated(format!(
                    "unit '{}' battery {} outside [0, 100]",
                    unit.name, unit.battery.level
                )));
            }
            if let Some(target) = unit.on_target {
                let t = self.target(target)?;
                if !unit.position.approx_eq(t.position) {
                    return Err(EngineError::InvariantViolated(format!(
                        "unit '{}' attached to target '{}' at {} but sits at {}",
                        unit.name, t.name, t.position, unit.position
                    )));
                }
            }
        }
        Ok(())
    }

    /// Flat numeric view for learning controllers:
    /// `[carrier xyz, battery, has_cargo, (unit xyz, battery, cleaning)*, (target xyz, clean)*]`.
    pub fn observation(&self) -> Vec<f32> {
        let mut state = Vec::with_capacity(5 + self.units.len() * 5 + self.targets.len() * 4);
        let flag = |b: bool| if b { 1.0 } else { 0.0 };

        state.extend(self.carrier.position.to_array().iter().map(|v| *v as f32));
        state.push(self.carrier.battery.level as f32);
        state.push(flag(self.carrier.cargo.is_some()));

        for unit in &self.units {
            state.extend(unit.position.to_array().iter().map(|v| *v as f32));
            state.push(unit.battery.level as f32);
            state.push(flag(unit.cleaning));
        }
        for target in &self.targets {
            state.extend(target.position.to_array().iter().map(|v| *v as f32));
            state.push(flag(target.state == TargetState::Clean));
        }
        state
    }
}
