//! Incremental model: slot lifecycle, concurrency, refusals and agreement
//! with the run-to-completion model.

use windowfleet_core::{
    action::{Action, Actor},
    engine::Engine,
    error::EngineError,
    scenario::ScenarioBuilder,
    stepping::{Phase, Stepper},
    types::Vec3,
    world::World,
};

const EPS: f64 = 1e-9;
const TARGET: Vec3 = Vec3::new(10.0, 0.0, 0.0);

fn simple_world() -> World {
    ScenarioBuilder::new()
        .target("1", TARGET, 6.0)
        .unit_at_base("A", 50.0, 100.0)
        .build()
        .unwrap()
}

/// Tick until nothing is in flight. Returns the number of ticks.
fn drain(engine: &Engine, stepper: &mut Stepper, world: &mut World, dt: f64) -> usize {
    let mut ticks = 0;
    while !stepper.is_empty() {
        engine.tick(stepper, world, dt).unwrap();
        ticks += 1;
        assert!(ticks < 10_000, "stepper never drained");
    }
    ticks
}

#[test]
fn flight_completes_exactly_at_its_end_time() {
    let engine = Engine::default();
    let mut world = simple_world();
    let mut stepper = Stepper::new();
    engine.start(&mut stepper, &world, Action::FlyToTarget { target: 0 }).unwrap();
    assert_eq!(stepper.in_flight().next().map(|s| s.phase()), Some(Phase::Pending));

    // 10 units at speed 5: 2 s, four ticks of 0.5 s.
    for _ in 0..3 {
        let reports = engine.tick(&mut stepper, &mut world, 0.5).unwrap();
        assert_eq!(reports.len(), 1);
        assert!(!reports[0].completed);
        assert!(world.carrier.moving);
    }
    assert!(world.carrier.position.approx_eq(Vec3::new(7.5, 0.0, 0.0)));
    assert_eq!(stepper.in_flight().next().map(|s| s.phase()), Some(Phase::Running));

    let reports = engine.tick(&mut stepper, &mut world, 0.5).unwrap();
    assert!(reports[0].completed);
    assert!(stepper.is_empty());
    assert_eq!(world.carrier.position, TARGET);
    assert!(!world.carrier.moving);
    assert!((world.time() - 2.0).abs() < EPS);
    // 2 s at 0.5 W on a 100 J battery.
    assert!((world.carrier.battery.level - 99.0).abs() < 1e-9);
}

#[test]
fn carried_unit_follows_mid_flight() {
    let engine = Engine::default();
    let mut world = ScenarioBuilder::new()
        .target("1", TARGET, 6.0)
        .unit_carried("A", 100.0, 100.0)
        .build()
        .unwrap();
    let mut stepper = Stepper::new();
    engine.start(&mut stepper, &world, Action::FlyToTarget { target: 0 }).unwrap();

    engine.tick(&mut stepper, &mut world, 0.7).unwrap();
    assert!(!world.carrier.position.approx_eq(TARGET));
    assert_eq!(world.units[0].position, world.carrier.position);
    world.check_invariants().unwrap();
}

#[test]
fn carrier_and_unit_advance_in_the_same_tick() {
    let engine = Engine::default();
    let mut world = simple_world();
    let mut stepper = Stepper::new();
    engine.start(&mut stepper, &world, Action::FlyToTarget { target: 0 }).unwrap();
    engine.start(&mut stepper, &world, Action::ChargeUnit { unit: 0 }).unwrap();
    assert_eq!(stepper.len(), 2);

    let reports = engine.tick(&mut stepper, &mut world, 1.0).unwrap();
    assert_eq!(reports.len(), 2);
    assert_eq!(reports[0].actor, Actor::Carrier);
    assert_eq!(reports[1].actor, Actor::Unit(0));
    assert!(world.units[0].charging);
    // 1 s at 10 J/s on a 100 J battery.
    assert!((world.units[0].battery.level - 60.0).abs() < 1e-9);
    assert!(!world.carrier.position.approx_eq(Vec3::ZERO));

    // Flight ends after 2 s, charging after 5 s.
    let reports = engine.tick(&mut stepper, &mut world, 1.0).unwrap();
    assert!(reports[0].completed && !reports[1].completed);
    assert_eq!(stepper.len(), 1);

    drain(&engine, &mut stepper, &mut world, 1.0);
    assert_eq!(world.units[0].battery.level, 100.0);
    assert!(!world.units[0].charging);
    assert!((world.time() - 5.0).abs() < EPS);
}

#[test]
fn one_action_per_actor() {
    let engine = Engine::default();
    let world = simple_world();
    let mut stepper = Stepper::new();
    engine.start(&mut stepper, &world, Action::FlyToTarget { target: 0 }).unwrap();

    let err = engine.start(&mut stepper, &world, Action::FlyToTarget { target: 0 }).unwrap_err();
    assert!(matches!(err, EngineError::AgentBusy { .. }));
    assert!(!stepper.is_idle(Actor::Carrier));
    assert!(stepper.is_idle(Actor::Unit(0)));
}

#[test]
fn unit_actions_wait_while_the_carrier_handles_the_unit() {
    let engine = Engine::default();
    let world = simple_world();
    let mut stepper = Stepper::new();
    engine.start(&mut stepper, &world, Action::PickupUnitAtBase { unit: 0 }).unwrap();
    assert!(stepper.is_reserved(0));

    let err = engine.start(&mut stepper, &world, Action::ChargeUnit { unit: 0 }).unwrap_err();
    assert!(matches!(err, EngineError::UnitReserved { unit: 0 }));
}

#[test]
fn carrier_cannot_grab_a_busy_unit() {
    let engine = Engine::default();
    let world = simple_world();
    let mut stepper = Stepper::new();
    engine.start(&mut stepper, &world, Action::ChargeUnit { unit: 0 }).unwrap();

    let err = engine.start(&mut stepper, &world, Action::PickupUnitAtBase { unit: 0 }).unwrap_err();
    assert!(matches!(err, EngineError::AgentBusy { .. }));
}

#[test]
fn start_rechecks_the_precondition() {
    let engine = Engine::default();
    let world = simple_world();
    let mut stepper = Stepper::new();
    let err = engine.start(&mut stepper, &world, Action::ReturnToBase).unwrap_err();
    assert!(matches!(err, EngineError::InvalidPrecondition { .. }));
    assert!(stepper.is_empty());
}

#[test]
fn null_action_completes_on_the_first_tick() {
    let engine = Engine::default();
    let mut world = simple_world();
    let mut stepper = Stepper::new();
    engine.start(&mut stepper, &world, Action::Null { actor: Actor::Carrier }).unwrap();

    let reports = engine.tick(&mut stepper, &mut world, 0.5).unwrap();
    assert!(reports[0].completed);
    assert_eq!(world.carrier.battery.level, 100.0);
}

#[test]
fn composite_runs_its_steps_back_to_back() {
    let engine = Engine::default();
    let mut world = ScenarioBuilder::new()
        .target("1", TARGET, 6.0)
        .unit_carried("A", 100.0, 100.0)
        .build()
        .unwrap();
    let mut stepper = Stepper::new();
    engine.start(&mut stepper, &world, Action::FlyAndDropoff { target: 0 }).unwrap();

    // 2 s flight, then 2 s dropoff.
    engine.tick(&mut stepper, &mut world, 2.5).unwrap();
    let slot = stepper.in_flight().next().unwrap();
    assert_eq!(slot.current_step(), Some(Action::DropoffUnit { target: 0 }));
    assert!(world.carrier.occupied);
    assert_eq!(world.carrier.position, TARGET);

    let reports = engine.tick(&mut stepper, &mut world, 1.5).unwrap();
    assert!(reports[0].completed);
    assert_eq!(world.units[0].on_target, Some(0));
    assert_eq!(world.carrier.cargo, None);
    assert!(!world.carrier.occupied);
}

#[test]
fn stepping_and_snapshot_agree() {
    let engine = Engine::default();
    let at_target = ScenarioBuilder::new()
        .carrier_at(TARGET)
        .carrier_battery(70.0, 100.0)
        .target("1", TARGET, 6.0)
        .unit_on_target("A", 0, 80.0, 100.0)
        .build()
        .unwrap();
    let at_base = ScenarioBuilder::new()
        .carrier_battery(70.0, 100.0)
        .target("1", TARGET, 6.0)
        .unit_at_base("A", 30.0, 100.0)
        .build()
        .unwrap();

    let cases = [
        (Action::FlyToTarget { target: 0 }, at_base.clone()),
        (Action::ReturnToBase, at_target.clone()),
        (Action::PickupUnit { unit: 0 }, at_target.clone()),
        (Action::PickupUnitAtBase { unit: 0 }, at_base.clone()),
        (Action::ChargeCarrier, at_base.clone()),
        (Action::ChargeUnit { unit: 0 }, at_base.clone()),
        (Action::CleanTarget { unit: 0 }, at_target.clone()),
        (Action::FlyAndPickup { unit: 0 }, at_base.clone()),
    ];

    for (action, world) in cases {
        let expected = engine.apply(&action, &world, true).unwrap();

        let mut stepped = world.clone();
        let mut stepper = Stepper::new();
        engine.start(&mut stepper, &stepped, action).unwrap();
        drain(&engine, &mut stepper, &mut stepped, 0.3);

        assert!(
            stepped.carrier.position.approx_eq(expected.carrier.position),
            "{action}: position {} vs {}",
            stepped.carrier.position,
            expected.carrier.position
        );
        assert_eq!(stepped.carrier.cargo, expected.carrier.cargo, "{action}: cargo");
        assert!(
            (stepped.carrier.battery.level - expected.carrier.battery.level).abs() < 1e-6,
            "{action}: carrier battery"
        );
        assert!(
            (stepped.units[0].battery.level - expected.units[0].battery.level).abs() < 1e-6,
            "{action}: unit battery"
        );
        assert_eq!(stepped.units[0].on_target, expected.units[0].on_target, "{action}: attachment");
        assert_eq!(stepped.targets, expected.targets, "{action}: targets");
        // The stepped clock overshoots by at most one slice.
        assert!(stepped.time() + EPS >= expected.time(), "{action}: clock");
        assert!(stepped.time() < expected.time() + 0.3 + EPS, "{action}: clock");
    }
}

#[test]
fn tick_refuses_bad_time_steps() {
    let engine = Engine::default();
    let mut world = simple_world();
    let mut stepper = Stepper::new();
    engine.start(&mut stepper, &world, Action::FlyToTarget { target: 0 }).unwrap();

    for dt in [-0.5, 0.0, f64::NAN, f64::INFINITY] {
        let err = engine.tick(&mut stepper, &mut world, dt).unwrap_err();
        assert!(matches!(err, EngineError::InvalidTimeStep { .. }), "dt={dt}");
    }
    assert_eq!(world.time(), 0.0);
    assert_eq!(stepper.in_flight().next().map(|s| s.phase()), Some(Phase::Pending));
}
