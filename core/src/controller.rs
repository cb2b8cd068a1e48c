//! Action selection policies.
//!
//! RULE: Policies only choose among the actions they are handed. They never
//! apply effects and never widen the set past what the filter allowed.
//! Randomness comes from the policy's own `SimRng` stream.

use crate::{
    action::{Action, ActionKind, Actor},
    config::EngineConfig,
    rng::SimRng,
    world::World,
};

/// The contract every carrier controller fulfills.
pub trait Policy {
    /// Unique stable name for this policy.
    fn name(&self) -> &'static str;

    /// Pick one of `safe` for the carrier. `Null{Carrier}` when nothing fits.
    fn choose(&mut self, world: &World, safe: &[Action]) -> Action;
}

fn idle_carrier() -> Action {
    Action::Null { actor: Actor::Carrier }
}

fn carrier_moves(safe: &[Action]) -> Vec<Action> {
    safe.iter()
        .filter(|a| a.actor() == Actor::Carrier && !a.is_null())
        .copied()
        .collect()
}

// ── Priority ─────────────────────────────────────────────────────────────────

/// Ranked tiers, first match wins.
const PRIORITY_TIERS: [&[ActionKind]; 3] = [
    &[ActionKind::PickupUnitAtBase],
    &[ActionKind::DropoffUnit, ActionKind::FlyAndDropoff],
    &[ActionKind::PickupUnit, ActionKind::FlyAndPickup],
];

/// Keeps units moving between dirty targets: load at base, drop at a dirty
/// target, collect finished units. A carried unit too weak to clean is taken
/// home first. Falls back to a random move.
pub struct PriorityPolicy {
    rng:                SimRng,
    cleaning_threshold: f64,
}

impl PriorityPolicy {
    pub fn new(rng: SimRng, config: &EngineConfig) -> Self {
        Self { rng, cleaning_threshold: config.cleaning_min_battery_pct }
    }

    fn cargo_needs_charge(&self, world: &World) -> bool {
        world
            .carrier
            .cargo
            .and_then(|id| world.units.get(id))
            .is_some_and(|u| u.battery.level <= self.cleaning_threshold)
    }
}

impl Policy for PriorityPolicy {
    fn name(&self) -> &'static str {
        "priority"
    }

    fn choose(&mut self, world: &World, safe: &[Action]) -> Action {
        let moves = carrier_moves(safe);

        if self.cargo_needs_charge(world) {
            let home = moves
                .iter()
                .find(|a| matches!(a.kind(), ActionKind::DropoffUnitAtBase | ActionKind::FlyToBaseAndDropoff));
            if let Some(action) = home {
                return *action;
            }
        }

        for tier in PRIORITY_TIERS {
            if let Some(action) = moves.iter().find(|a| tier.contains(&a.kind())) {
                return *action;
            }
        }

        self.rng.choose(&moves).copied().unwrap_or_else(idle_carrier)
    }
}

// ── Random ───────────────────────────────────────────────────────────────────

/// Uniform over the non-null carrier moves.
pub struct RandomPolicy {
    rng: SimRng,
}

impl RandomPolicy {
    pub fn new(rng: SimRng) -> Self {
        Self { rng }
    }
}

impl Policy for RandomPolicy {
    fn name(&self) -> &'static str {
        "random"
    }

    fn choose(&mut self, _world: &World, safe: &[Action]) -> Action {
        let moves = carrier_moves(safe);
        self.rng.choose(&moves).copied().unwrap_or_else(idle_carrier)
    }
}

/// Unit rule: clean if possible, else charge, else idle (`None`).
/// `allowed` holds one unit's allowed actions.
pub fn choose_unit_action(allowed: &[Action]) -> Option<Action> {
    allowed
        .iter()
        .find(|a| matches!(a, Action::CleanTarget { .. }))
        .or_else(|| allowed.iter().find(|a| matches!(a, Action::ChargeUnit { .. })))
        .copied()
}
