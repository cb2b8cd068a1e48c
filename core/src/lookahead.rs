//! One-step lookahead safety filter.
//!
//! For each allowed carrier action: apply it (with unit co-simulation) on a
//! copy, look for a recovery action in the regenerated catalogue, replay that
//! recovery step by step and reject the action if the carrier dips below
//! `safety_floor_pct` before it can charge. The action's own legs are held
//! to the same rule. Actions that relocate a
//! unit are also rejected when a unit's battery falls below the floor.
//!
//! Only legs the carrier flies, or work it does away from base, count
//! against the floor. Handling at base is always reachable from base.
//!
//! RULE: The filter only ever evaluates copies. The caller's world is
//! borrowed immutably throughout.

use crate::{
    action::{Action, Actor},
    catalogue,
    config::{CatalogueMode, EngineConfig},
    error::{EngineError, EngineResult},
    snapshot,
    types::UnitId,
    world::World,
};
use serde::{Deserialize, Serialize};

/// Recovery candidates, most complete first.
const RECOVERY_ORDER: [Action; 3] = [
    Action::FlyToBaseAndCharge,
    Action::ReturnToBase,
    Action::ChargeCarrier,
];

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum SafetyVerdict {
    Safe,
    /// Lowest carrier battery on the way home was below the floor.
    CarrierStranded { battery: f64 },
    UnitDepleted { unit: UnitId, battery: f64 },
    /// Away from base and nothing in the catalogue brings the carrier back.
    NoRecovery,
}

impl SafetyVerdict {
    pub fn is_safe(&self) -> bool {
        matches!(self, SafetyVerdict::Safe)
    }
}

/// The recovery the carrier would take from `world`, if any.
pub fn recovery_action(world: &World, config: &EngineConfig) -> Option<Action> {
    let candidates = catalogue::allowed(
        &catalogue::build_action_catalogue(world, CatalogueMode::Full),
        world,
        config,
    );
    RECOVERY_ORDER
        .into_iter()
        .find(|recovery| candidates.contains(recovery))
}

/// Replay `action` on a copy of `world` one primitive at a time and return
/// the lowest carrier battery reached before a charging step begins.
/// Steps that start and end at base without moving are not counted.
/// `None` when nothing counted.
fn lowest_before_charge(action: &Action, world: &World, config: &EngineConfig) -> EngineResult<Option<f64>> {
    let mut scratch = world.clone();
    let mut lowest: Option<f64> = None;

    for step in action.constituents(world) {
        if step == Action::ChargeCarrier {
            break;
        }
        if !step.is_allowed(&scratch, config) {
            return Err(EngineError::InvalidPrecondition { action: step.name() });
        }
        let from = scratch.carrier.position;
        scratch = snapshot::apply(&step, &scratch, config, true)?;

        let flew = !scratch.carrier.position.approx_eq(from);
        if flew || !scratch.carrier_at_base() {
            let level = scratch.carrier.battery.level;
            lowest = Some(lowest.map_or(level, |l| l.min(level)));
        }
    }
    Ok(lowest)
}

/// Lowest carrier battery on the way home once `recovery` starts from
/// `world`. `None` when the recovery never flies or works away from base.
pub fn recovery_low_point(recovery: &Action, world: &World, config: &EngineConfig) -> EngineResult<Option<f64>> {
    lowest_before_charge(recovery, world, config)
}

/// Verdict for one action in `world`. The action must already be allowed.
pub fn assess(action: &Action, world: &World, config: &EngineConfig) -> EngineResult<SafetyVerdict> {
    if action.actor() != Actor::Carrier {
        return Ok(SafetyVerdict::Safe);
    }

    let floor = config.safety_floor_pct;

    if let Some(en_route) = lowest_before_charge(action, world, config)? {
        if en_route < floor {
            return Ok(SafetyVerdict::CarrierStranded { battery: en_route });
        }
    }

    let after = snapshot::apply(action, world, config, false)?;

    let Some(recovery) = recovery_action(&after, config) else {
        return Ok(if after.carrier_at_base() {
            SafetyVerdict::Safe
        } else {
            SafetyVerdict::NoRecovery
        });
    };

    if let Some(lowest) = recovery_low_point(&recovery, &after, config)? {
        if lowest < floor {
            return Ok(SafetyVerdict::CarrierStranded { battery: lowest });
        }
    }

    if action.moves_unit(world) {
        for (id, unit) in after.units.iter().enumerate() {
            let before = world.unit(id)?.battery.level;
            let level = unit.battery.level;
            if level < floor && level < before {
                return Ok(SafetyVerdict::UnitDepleted { unit: id, battery: level });
            }
        }
    }

    Ok(SafetyVerdict::Safe)
}

/// Precondition filter, then the lookahead. Errors count as unsafe.
pub fn safe_allowed(actions: &[Action], world: &World, config: &EngineConfig) -> Vec<Action> {
    catalogue::allowed(actions, world, config)
        .into_iter()
        .filter(|action| match assess(action, world, config) {
            Ok(verdict) => {
                if !verdict.is_safe() {
                    log::debug!("t={:.2} lookahead rejected {action}: {verdict:?}", world.time());
                }
                verdict.is_safe()
            }
            Err(e) => {
                log::warn!("t={:.2} lookahead failed for {action}: {e}", world.time());
                false
            }
        })
        .collect()
}
