//! Catalogue construction and precondition filtering.
//!
//! The catalogue is regenerated from the current world every decision:
//! fixed carrier/base actions first, then one action per target, then one
//! per unit, then the unit actions. Order is stable so controllers that pick
//! "the first matching action" stay deterministic.

use crate::{
    action::{Action, Actor},
    config::{CatalogueMode, EngineConfig},
    types::UnitId,
    world::World,
};

fn primitive_carrier_actions(world: &World, actions: &mut Vec<Action>) {
    actions.push(Action::ReturnToBase);
    actions.push(Action::ChargeCarrier);
    actions.push(Action::DropoffUnitAtBase);
    for target in 0..world.targets.len() {
        actions.push(Action::FlyToTarget { target });
        actions.push(Action::DropoffUnit { target });
    }
    for unit in 0..world.units.len() {
        actions.push(Action::PickupUnit { unit });
        actions.push(Action::PickupUnitAtBase { unit });
    }
}

fn composite_carrier_actions(world: &World, actions: &mut Vec<Action>) {
    actions.push(Action::FlyToBaseAndCharge);
    actions.push(Action::FlyToBaseAndDropoff);
    for target in 0..world.targets.len() {
        actions.push(Action::FlyAndDropoff { target });
    }
    for unit in 0..world.units.len() {
        actions.push(Action::FlyAndPickup { unit });
    }
}

/// Every carrier action for `mode`, led by the carrier's null action.
pub fn carrier_actions(world: &World, mode: CatalogueMode) -> Vec<Action> {
    let mut actions = vec![Action::Null { actor: Actor::Carrier }];
    match mode {
        CatalogueMode::Primitive => primitive_carrier_actions(world, &mut actions),
        CatalogueMode::Composite => composite_carrier_actions(world, &mut actions),
        CatalogueMode::Full => {
            primitive_carrier_actions(world, &mut actions);
            composite_carrier_actions(world, &mut actions);
        }
    }
    actions
}

/// A unit's actions in preference order: clean, then charge.
pub fn unit_actions(unit: UnitId) -> [Action; 2] {
    [Action::CleanTarget { unit }, Action::ChargeUnit { unit }]
}

pub fn build_action_catalogue(world: &World, mode: CatalogueMode) -> Vec<Action> {
    let mut actions = carrier_actions(world, mode);
    for unit in 0..world.units.len() {
        actions.extend(unit_actions(unit));
    }
    actions
}

pub fn allowed(actions: &[Action], world: &World, config: &EngineConfig) -> Vec<Action> {
    actions
        .iter()
        .filter(|a| a.is_allowed(world, config))
        .copied()
        .collect()
}
