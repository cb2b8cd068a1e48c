//! Scenario construction: hand-built worlds and the random generator.

use crate::{
    config::ScenarioConfig,
    entity::{Base, Battery, Carrier, CleaningUnit, Target, TargetState},
    error::{EngineError, EngineResult},
    rng::{SimRng, StreamSlot},
    types::{TargetId, Vec3},
    world::World,
};

#[derive(Debug, Clone, Copy, PartialEq)]
enum Placement {
    Base,
    Target(TargetId),
    Carried,
}

#[derive(Debug, Clone)]
struct UnitSpec {
    name:      String,
    placement: Placement,
    battery:   Battery,
}

/// Builder for worlds with an exact layout.
#[derive(Debug, Clone)]
pub struct ScenarioBuilder {
    base:             Vec3,
    carrier_position: Option<Vec3>,
    carrier_battery:  Battery,
    units:            Vec<UnitSpec>,
    targets:          Vec<Target>,
}

impl Default for ScenarioBuilder {
    fn default() -> Self {
        Self {
            base:             Vec3::ZERO,
            carrier_position: None,
            carrier_battery:  Battery::full(100.0),
            units:            Vec::new(),
            targets:          Vec::new(),
        }
    }
}

impl ScenarioBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn base(mut self, position: Vec3) -> Self {
        self.base = position;
        self
    }

    /// Carrier start position. Defaults to the base.
    pub fn carrier_at(mut self, position: Vec3) -> Self {
        self.carrier_position = Some(position);
        self
    }

    pub fn carrier_battery(mut self, level: f64, capacity: f64) -> Self {
        self.carrier_battery = Battery::at(level, capacity);
        self
    }

    pub fn target(mut self, name: impl Into<String>, position: Vec3, cleaning_duration: f64) -> Self {
        self.targets.push(Target::new(name, position, cleaning_duration));
        self
    }

    pub fn clean_target(mut self, name: impl Into<String>, position: Vec3, cleaning_duration: f64) -> Self {
        let mut target = Target::new(name, position, cleaning_duration);
        target.state = TargetState::Clean;
        self.targets.push(target);
        self
    }

    pub fn unit_at_base(mut self, name: impl Into<String>, level: f64, capacity: f64) -> Self {
        self.units.push(UnitSpec {
            name:      name.into(),
            placement: Placement::Base,
            battery:   Battery::at(level, capacity),
        });
        self
    }

    pub fn unit_on_target(mut self, name: impl Into<String>, target: TargetId, level: f64, capacity: f64) -> Self {
        self.units.push(UnitSpec {
            name:      name.into(),
            placement: Placement::Target(target),
            battery:   Battery::at(level, capacity),
        });
        self
    }

    pub fn unit_carried(mut self, name: impl Into<String>, level: f64, capacity: f64) -> Self {
        self.units.push(UnitSpec {
            name:      name.into(),
            placement: Placement::Carried,
            battery:   Battery::at(level, capacity),
        });
        self
    }

    pub fn build(self) -> EngineResult<World> {
        let mut carrier = Carrier::new(self.carrier_position.unwrap_or(self.base), self.carrier_battery.capacity);
        carrier.battery = self.carrier_battery;

        let mut units = Vec::with_capacity(self.units.len());
        for (id, entry) in self.units.into_iter().enumerate() {
            let mut unit = CleaningUnit::new(entry.name, self.base, entry.battery.capacity);
            unit.battery = entry.battery;
            match entry.placement {
                Placement::Base => {}
                Placement::Target(target) => {
                    let len = self.targets.len();
                    let t = self
                        .targets
                        .get(target)
                        .ok_or(EngineError::IndexOutOfRange { entity: "target", index: target, len })?;
                    unit.position = t.position;
                    unit.on_target = Some(target);
                }
                Placement::Carried => {
                    if carrier.cargo.is_some() {
                        return Err(EngineError::InvariantViolated(format!(
                            "unit '{}' cannot be carried: carrier already has cargo",
                            unit.name
                        )));
                    }
                    unit.position = carrier.position;
                    carrier.cargo = Some(id);
                }
            }
            units.push(unit);
        }

        let world = World::new(Base { position: self.base }, carrier, units, self.targets);
        world.check_invariants()?;
        Ok(world)
    }
}

/// Random world: base, carrier and all units at the origin with full
/// batteries; targets spread above the ground plane.
pub fn random_scenario(seed: u64, config: &ScenarioConfig) -> World {
    let mut rng = SimRng::new(seed, StreamSlot::Scenario);

    let carrier = Carrier::new(Vec3::ZERO, config.carrier_capacity);
    let units = (0..config.num_units)
        .map(|i| CleaningUnit::new(unit_name(i), Vec3::ZERO, config.unit_capacity))
        .collect();

    let extent = config.horizontal_extent;
    let targets = (1..=config.num_targets)
        .map(|i| {
            let position = Vec3::new(
                rng.uniform(-extent, extent),
                rng.uniform(-extent, extent),
                rng.uniform(config.min_height, config.max_height),
            );
            let mut target = Target::new(
                i.to_string(),
                position,
                rng.uniform(config.min_cleaning_time, config.max_cleaning_time),
            );
            target.width = rng.uniform(config.min_size, config.max_size);
            target.height = rng.uniform(config.min_size, config.max_size);
            if !rng.chance(config.dirty_probability) {
                target.state = TargetState::Clean;
            }
            target
        })
        .collect();

    log::debug!("seed={seed} scenario: {} units, {} targets", config.num_units, config.num_targets);
    World::new(Base { position: Vec3::ZERO }, carrier, units, targets)
}

/// "A", "B", ... "Z", then "A1", "B1", ...
fn unit_name(index: usize) -> String {
    let letter = (b'A' + (index % 26) as u8) as char;
    match index / 26 {
        0 => letter.to_string(),
        round => format!("{letter}{round}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_places_units() {
        let world = ScenarioBuilder::new()
            .target("1", Vec3::new(10.0, 0.0, 20.0), 5.0)
            .unit_at_base("A", 100.0, 100.0)
            .unit_on_target("B", 0, 80.0, 100.0)
            .build()
            .unwrap();
        assert!(world.unit_at_base(0));
        assert_eq!(world.units[1].on_target, Some(0));
        assert!(world.units[1].position.approx_eq(Vec3::new(10.0, 0.0, 20.0)));
        assert!(world.carrier_at_base());
    }

    #[test]
    fn builder_rejects_two_carried_units() {
        let result = ScenarioBuilder::new()
            .unit_carried("A", 100.0, 100.0)
            .unit_carried("B", 100.0, 100.0)
            .build();
        assert!(matches!(result, Err(EngineError::InvariantViolated(_))));
    }

    #[test]
    fn builder_rejects_unknown_target() {
        let result = ScenarioBuilder::new().unit_on_target("A", 3, 100.0, 100.0).build();
        assert!(matches!(result, Err(EngineError::IndexOutOfRange { entity: "target", .. })));
    }

    #[test]
    fn random_scenario_respects_ranges() {
        let config = ScenarioConfig { num_targets: 40, ..ScenarioConfig::default() };
        let world = random_scenario(9, &config);
        assert_eq!(world.units.len(), config.num_units);
        assert_eq!(world.targets.len(), 40);
        assert_eq!(world.targets[0].name, "1");
        for t in &world.targets {
            assert!(t.position.x.abs() <= 50.0 && t.position.y.abs() <= 50.0);
            assert!((10.0..=100.0).contains(&t.position.z));
            assert!((1.0..=5.0).contains(&t.width));
            assert!((5.0..=20.0).contains(&t.cleaning_duration));
        }
        assert!(world.units.iter().all(|u| u.battery.level == 100.0));
    }

    #[test]
    fn random_scenario_is_deterministic() {
        let config = ScenarioConfig::default();
        assert_eq!(random_scenario(3, &config), random_scenario(3, &config));
    }

    #[test]
    fn unit_names_wrap() {
        assert_eq!(unit_name(0), "A");
        assert_eq!(unit_name(27), "B1");
    }
}
