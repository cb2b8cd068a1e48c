//! Run-to-completion execution: one action, one new world.
//!
//! The input world is never touched. The returned world is an owned deep
//! copy with the action's whole duration elapsed, so a controller can
//! evaluate any number of candidates against the same starting state.

use crate::{
    action::{Action, Actor},
    catalogue::unit_actions,
    config::EngineConfig,
    effect::EffectPlan,
    error::EngineResult,
    world::World,
};

/// Apply `action` to a copy of `world` and return it.
///
/// After a carrier action, unless `drone_only`, each cleaning unit starts its
/// first allowed action (clean, else charge) and runs it to completion
/// alongside the carrier. The clock advances by the carrier action only.
///
/// Unit actions are not cut off at the end of the carrier action: a 10 s
/// clean still finishes inside a 2 s dropoff. Use the stepping model when
/// unit and carrier timing must line up.
///
/// The caller must have checked `action.is_allowed` against `world`.
pub fn apply(
    action: &Action,
    world: &World,
    config: &EngineConfig,
    drone_only: bool,
) -> EngineResult<World> {
    apply_with_plan(action, world, config, drone_only).map(|(next, _)| next)
}

/// `apply`, also returning the realised duration and energy cost.
pub fn apply_with_plan(
    action: &Action,
    world: &World,
    config: &EngineConfig,
    drone_only: bool,
) -> EngineResult<(World, EffectPlan)> {
    debug_assert!(
        action.is_allowed(world, config),
        "apply() called with disallowed action {action}"
    );

    let mut next = world.clone();
    let plan = action.run_to_completion(&mut next, config)?;
    next.clock.advance(plan.duration);

    if !drone_only && action.actor() == Actor::Carrier {
        co_simulate_units(&mut next, config)?;
    }
    Ok((next, plan))
}

fn co_simulate_units(world: &mut World, config: &EngineConfig) -> EngineResult<()> {
    for unit in 0..world.units.len() {
        let chosen = unit_actions(unit)
            .into_iter()
            .find(|a| a.is_allowed(world, config));
        if let Some(action) = chosen {
            let plan = action.run_to_completion(world, config)?;
            log::debug!(
                "t={:.2} co-simulated {action} for {:.2}s",
                world.time(),
                plan.duration
            );
        }
    }
    Ok(())
}
