//! The action catalogue: every thing an agent can do, and when it may do it.
//!
//! RULE: `Action` is a closed tagged union. Every capability (actor, name,
//! precondition, plan, hooks) is a total `match`, so a new variant does not
//! compile until each table handles it.
//!
//! RULE: `is_allowed` is a query. It never errors and never panics;
//! out-of-range indices simply make the action disallowed.

use crate::{
    config::EngineConfig,
    entity::TargetState,
    types::{TargetId, UnitId},
    world::World,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The agent whose battery an action draws from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Actor {
    Carrier,
    Unit(UnitId),
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Actor::Carrier => write!(f, "carrier"),
            Actor::Unit(id) => write!(f, "unit_{id}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    // ── Carrier primitives ─────────────────────────
    FlyToTarget { target: TargetId },
    ReturnToBase,
    PickupUnit { unit: UnitId },
    PickupUnitAtBase { unit: UnitId },
    DropoffUnit { target: TargetId },
    DropoffUnitAtBase,
    ChargeCarrier,

    // ── Cleaning unit primitives ───────────────────
    ChargeUnit { unit: UnitId },
    CleanTarget { unit: UnitId },

    // ── Any agent ──────────────────────────────────
    Null { actor: Actor },

    // ── Carrier composites ─────────────────────────
    FlyAndDropoff { target: TargetId },
    FlyAndPickup { unit: UnitId },
    FlyToBaseAndDropoff,
    FlyToBaseAndCharge,
}

/// Payload-free discriminant, for priority tables and counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    FlyToTarget,
    ReturnToBase,
    PickupUnit,
    PickupUnitAtBase,
    DropoffUnit,
    DropoffUnitAtBase,
    ChargeCarrier,
    ChargeUnit,
    CleanTarget,
    Null,
    FlyAndDropoff,
    FlyAndPickup,
    FlyToBaseAndDropoff,
    FlyToBaseAndCharge,
}

impl Action {
    pub fn kind(&self) -> ActionKind {
        match self {
            Action::FlyToTarget { .. }      => ActionKind::FlyToTarget,
            Action::ReturnToBase            => ActionKind::ReturnToBase,
            Action::PickupUnit { .. }       => ActionKind::PickupUnit,
            Action::PickupUnitAtBase { .. } => ActionKind::PickupUnitAtBase,
            Action::DropoffUnit { .. }      => ActionKind::DropoffUnit,
            Action::DropoffUnitAtBase       => ActionKind::DropoffUnitAtBase,
            Action::ChargeCarrier           => ActionKind::ChargeCarrier,
            Action::ChargeUnit { .. }       => ActionKind::ChargeUnit,
            Action::CleanTarget { .. }      => ActionKind::CleanTarget,
            Action::Null { .. }             => ActionKind::Null,
            Action::FlyAndDropoff { .. }    => ActionKind::FlyAndDropoff,
            Action::FlyAndPickup { .. }     => ActionKind::FlyAndPickup,
            Action::FlyToBaseAndDropoff     => ActionKind::FlyToBaseAndDropoff,
            Action::FlyToBaseAndCharge      => ActionKind::FlyToBaseAndCharge,
        }
    }

    pub fn actor(&self) -> Actor {
        match self {
            Action::ChargeUnit { unit } | Action::CleanTarget { unit } => Actor::Unit(*unit),
            Action::Null { actor } => *actor,
            Action::FlyToTarget { .. }
            | Action::ReturnToBase
            | Action::PickupUnit { .. }
            | Action::PickupUnitAtBase { .. }
            | Action::DropoffUnit { .. }
            | Action::DropoffUnitAtBase
            | Action::ChargeCarrier
            | Action::FlyAndDropoff { .. }
            | Action::FlyAndPickup { .. }
            | Action::FlyToBaseAndDropoff
            | Action::FlyToBaseAndCharge => Actor::Carrier,
        }
    }

    /// Stable snake_case label, e.g. `fly_to_target_3`.
    pub fn name(&self) -> String {
        match self {
            Action::FlyToTarget { target }     => format!("fly_to_target_{target}"),
            Action::ReturnToBase               => "return_to_base".into(),
            Action::PickupUnit { unit }        => format!("pickup_unit_{unit}"),
            Action::PickupUnitAtBase { unit }  => format!("pickup_unit_at_base_{unit}"),
            Action::DropoffUnit { target }     => format!("dropoff_unit_at_target_{target}"),
            Action::DropoffUnitAtBase          => "dropoff_unit_at_base".into(),
            Action::ChargeCarrier              => "charge_carrier".into(),
            Action::ChargeUnit { unit }        => format!("charge_unit_{unit}"),
            Action::CleanTarget { unit }       => format!("clean_target_{unit}"),
            Action::Null { actor }             => format!("null_{actor}"),
            Action::FlyAndDropoff { target }   => format!("fly_and_dropoff_{target}"),
            Action::FlyAndPickup { unit }      => format!("fly_and_pickup_{unit}"),
            Action::FlyToBaseAndDropoff        => "fly_to_base_and_dropoff".into(),
            Action::FlyToBaseAndCharge         => "fly_to_base_and_charge".into(),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Action::Null { .. })
    }

    pub fn is_composite(&self) -> bool {
        match self {
            Action::FlyAndDropoff { .. }
            | Action::FlyAndPickup { .. }
            | Action::FlyToBaseAndDropoff
            | Action::FlyToBaseAndCharge => true,
            Action::FlyToTarget { .. }
            | Action::ReturnToBase
            | Action::PickupUnit { .. }
            | Action::PickupUnitAtBase { .. }
            | Action::DropoffUnit { .. }
            | Action::DropoffUnitAtBase
            | Action::ChargeCarrier
            | Action::ChargeUnit { .. }
            | Action::CleanTarget { .. }
            | Action::Null { .. } => false,
        }
    }

    /// Actions that bring the carrier home and/or recharge it.
    pub fn is_recovery(&self) -> bool {
        matches!(
            self,
            Action::FlyToBaseAndCharge | Action::ReturnToBase | Action::ChargeCarrier
        )
    }

    /// True when applying this action in `world` relocates a cleaning unit.
    pub fn moves_unit(&self, world: &World) -> bool {
        match self {
            Action::PickupUnit { .. }
            | Action::PickupUnitAtBase { .. }
            | Action::DropoffUnit { .. }
            | Action::DropoffUnitAtBase
            | Action::FlyAndDropoff { .. }
            | Action::FlyAndPickup { .. }
            | Action::FlyToBaseAndDropoff => true,
            Action::FlyToTarget { .. } | Action::ReturnToBase | Action::FlyToBaseAndCharge => {
                world.carrier.cargo.is_some()
            }
            Action::ChargeCarrier
            | Action::ChargeUnit { .. }
            | Action::CleanTarget { .. }
            | Action::Null { .. } => false,
        }
    }

    /// True when the carrier is about to take hold of `unit`.
    pub fn involves_unit(&self, unit: UnitId) -> bool {
        match self {
            Action::PickupUnit { unit: u }
            | Action::PickupUnitAtBase { unit: u }
            | Action::FlyAndPickup { unit: u } => *u == unit,
            _ => false,
        }
    }

    // ── Preconditions ────────────────────────────────────────────────────────

    pub fn is_allowed(&self, world: &World, config: &EngineConfig) -> bool {
        let carrier = &world.carrier;
        match *self {
            Action::FlyToTarget { target } => {
                let Some(t) = world.targets.get(target) else { return false };
                !carrier.occupied && !carrier.is_at(t.position)
            }
            Action::ReturnToBase => !carrier.occupied && !world.carrier_at_base(),
            Action::PickupUnit { unit } => {
                let Some(u) = world.units.get(unit) else { return false };
                !carrier.occupied
                    && carrier.cargo.is_none()
                    && carrier.is_at(u.position)
                    && !u.cleaning
                    && !u.charging
                    && u.on_target.is_some()
            }
            Action::PickupUnitAtBase { unit } => {
                let Some(u) = world.units.get(unit) else { return false };
                !carrier.occupied
                    && carrier.cargo.is_none()
                    && world.carrier_at_base()
                    && u.position.approx_eq(world.base.position)
                    && !u.charging
            }
            Action::DropoffUnit { target } => {
                let Some(t) = world.targets.get(target) else { return false };
                !carrier.occupied
                    && carrier.cargo.is_some()
                    && carrier.is_at(t.position)
                    && t.state == TargetState::Dirty
            }
            Action::DropoffUnitAtBase => {
                !carrier.occupied && carrier.cargo.is_some() && world.carrier_at_base()
            }
            Action::ChargeCarrier => {
                !carrier.occupied
                    && carrier.cargo.is_none()
                    && world.carrier_at_base()
                    && carrier.battery.level < config.full_battery_pct
            }
            Action::ChargeUnit { unit } => {
                let Some(u) = world.units.get(unit) else { return false };
                world.unit_at_base(unit)
                    && !u.is_busy()
                    && u.battery.level < config.full_battery_pct
            }
            Action::CleanTarget { unit } => {
                let Some(u) = world.units.get(unit) else { return false };
                let Some(t) = u.on_target.and_then(|id| world.targets.get(id)) else {
                    return false;
                };
                !world.is_carried(unit)
                    && u.position.approx_eq(t.position)
                    && t.state == TargetState::Dirty
                    && u.battery.level > config.cleaning_min_battery_pct
                    && !u.is_busy()
            }
            Action::Null { actor } => match actor {
                Actor::Carrier => true,
                Actor::Unit(id) => id < world.units.len(),
            },
            Action::FlyAndDropoff { target } => {
                let Some(t) = world.targets.get(target) else { return false };
                !carrier.occupied && carrier.cargo.is_some() && t.state == TargetState::Dirty
            }
            Action::FlyAndPickup { unit } => {
                let Some(u) = world.units.get(unit) else { return false };
                let resting = u.on_target.is_some() || u.position.approx_eq(world.base.position);
                !carrier.occupied && carrier.cargo.is_none() && !u.is_busy() && resting
            }
            Action::FlyToBaseAndDropoff => !carrier.occupied && carrier.cargo.is_some(),
            Action::FlyToBaseAndCharge => {
                !carrier.occupied && carrier.battery.level < config.full_battery_pct
            }
        }
    }

    /// The primitive steps this action performs from `world`, in order.
    ///
    /// Composites are expanded against the current state once; a flight that
    /// would start at its own destination is dropped. Primitives expand to
    /// themselves.
    pub fn constituents(&self, world: &World) -> Vec<Action> {
        let carrier = &world.carrier;
        match *self {
            Action::FlyAndDropoff { target } => {
                let mut steps = Vec::with_capacity(2);
                if let Some(t) = world.targets.get(target) {
                    if !carrier.is_at(t.position) {
                        steps.push(Action::FlyToTarget { target });
                    }
                }
                steps.push(Action::DropoffUnit { target });
                steps
            }
            Action::FlyAndPickup { unit } => {
                let Some(u) = world.units.get(unit) else { return Vec::new() };
                let mut steps = Vec::with_capacity(2);
                match u.on_target {
                    Some(target) => {
                        if !carrier.is_at(u.position) {
                            steps.push(Action::FlyToTarget { target });
                        }
                        steps.push(Action::PickupUnit { unit });
                    }
                    None => {
                        if !world.carrier_at_base() {
                            steps.push(Action::ReturnToBase);
                        }
                        steps.push(Action::PickupUnitAtBase { unit });
                    }
                }
                steps
            }
            Action::FlyToBaseAndDropoff => {
                let mut steps = Vec::with_capacity(2);
                if !world.carrier_at_base() {
                    steps.push(Action::ReturnToBase);
                }
                steps.push(Action::DropoffUnitAtBase);
                steps
            }
            Action::FlyToBaseAndCharge => {
                let mut steps = Vec::with_capacity(3);
                if !world.carrier_at_base() {
                    steps.push(Action::ReturnToBase);
                }
                if carrier.cargo.is_some() {
                    steps.push(Action::DropoffUnitAtBase);
                }
                steps.push(Action::ChargeCarrier);
                steps
            }
            Action::FlyToTarget { .. }
            | Action::ReturnToBase
            | Action::PickupUnit { .. }
            | Action::PickupUnitAtBase { .. }
            | Action::DropoffUnit { .. }
            | Action::DropoffUnitAtBase
            | Action::ChargeCarrier
            | Action::ChargeUnit { .. }
            | Action::CleanTarget { .. }
            | Action::Null { .. } => vec![*self],
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}
