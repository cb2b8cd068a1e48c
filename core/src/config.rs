//! Engine and scenario configuration.
//!
//! RULE: No module keeps its own speed, power or threshold constants.
//! Every tunable lives here and reaches the engine through `Engine::new`.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Which actions `build_action_catalogue` emits for the carrier.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum CatalogueMode {
    /// Single-step actions only (fly, pickup, dropoff, charge).
    Primitive,
    /// Fly-and-do composites plus null.
    Composite,
    /// Everything.
    #[default]
    Full,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    /// Carrier cruise speed (units per second).
    pub carrier_speed:               f64,
    /// Carrier power draw while flying (J/s).
    pub carrier_fly_power:           f64,
    /// Carrier power draw while picking up / dropping off (J/s).
    pub handling_power:              f64,
    /// Pickup / dropoff duration at a target (s).
    pub handling_duration:           f64,
    /// Pickup / dropoff duration at the base (s).
    pub base_handling_duration:      f64,
    pub carrier_charge_rate:         f64,
    /// Floor on any carrier charging session (s).
    pub carrier_charge_min_duration: f64,
    pub unit_charge_rate:            f64,
    /// Cleaning unit power draw while cleaning (J/s).
    pub cleaning_power:              f64,
    /// A unit must be strictly above this to start cleaning (%).
    pub cleaning_min_battery_pct:    f64,
    /// At or above this a battery counts as full (%).
    pub full_battery_pct:            f64,
    /// Lookahead recovery must keep every agent at or above this (%).
    pub safety_floor_pct:            f64,
    pub catalogue:                   CatalogueMode,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            carrier_speed:               5.0,
            carrier_fly_power:           0.5,
            handling_power:              1.0,
            handling_duration:           2.0,
            base_handling_duration:      2.0,
            carrier_charge_rate:         20.0,
            carrier_charge_min_duration: 2.0,
            unit_charge_rate:            10.0,
            cleaning_power:              0.2,
            cleaning_min_battery_pct:    40.0,
            full_battery_pct:            99.9,
            safety_floor_pct:            10.0,
            catalogue:                   CatalogueMode::Full,
        }
    }
}

impl EngineConfig {
    /// Load from a JSON file. Missing fields fall back to defaults.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {}: {e}", path.display()))?;
        let config: EngineConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        let positive = [
            ("carrier_speed", self.carrier_speed),
            ("carrier_charge_rate", self.carrier_charge_rate),
            ("unit_charge_rate", self.unit_charge_rate),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                anyhow::bail!("{name} must be > 0, got {value}");
            }
        }

        let non_negative = [
            ("carrier_fly_power", self.carrier_fly_power),
            ("handling_power", self.handling_power),
            ("handling_duration", self.handling_duration),
            ("base_handling_duration", self.base_handling_duration),
            ("carrier_charge_min_duration", self.carrier_charge_min_duration),
            ("cleaning_power", self.cleaning_power),
        ];
        for (name, value) in non_negative {
            if !(value.is_finite() && value >= 0.0) {
                anyhow::bail!("{name} must be >= 0, got {value}");
            }
        }

        let percentages = [
            ("cleaning_min_battery_pct", self.cleaning_min_battery_pct),
            ("full_battery_pct", self.full_battery_pct),
            ("safety_floor_pct", self.safety_floor_pct),
        ];
        for (name, value) in percentages {
            if !(0.0..=100.0).contains(&value) {
                anyhow::bail!("{name} must be within [0, 100], got {value}");
            }
        }
        Ok(())
    }
}

/// Parameters for `scenario::random_scenario`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ScenarioConfig {
    pub num_units:           usize,
    pub num_targets:         usize,
    /// Absolute carrier battery capacity (J).
    pub carrier_capacity:    f64,
    /// Absolute unit battery capacity (J).
    pub unit_capacity:       f64,
    /// Targets spawn with x and y uniform in [-horizontal_extent, horizontal_extent].
    pub horizontal_extent:   f64,
    pub min_height:          f64,
    pub max_height:          f64,
    pub min_size:            f64,
    pub max_size:            f64,
    pub min_cleaning_time:   f64,
    pub max_cleaning_time:   f64,
    /// Probability that a spawned target starts Dirty.
    pub dirty_probability:   f64,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            num_units:         2,
            num_targets:       5,
            carrier_capacity:  100.0,
            unit_capacity:     100.0,
            horizontal_extent: 50.0,
            min_height:        10.0,
            max_height:        100.0,
            min_size:          1.0,
            max_size:          5.0,
            min_cleaning_time: 5.0,
            max_cleaning_time: 20.0,
            dirty_probability: 0.5,
        }
    }
}
