//! Passive entity records. Mutated only through action effects.

use crate::{
    energy,
    types::{SimTime, TargetId, UnitId, Vec3},
};
use serde::{Deserialize, Serialize};

/// Battery state: `level` in percent, `capacity` in joules.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Battery {
    pub level:    f64,
    pub capacity: f64,
}

impl Battery {
    pub fn full(capacity: f64) -> Self {
        Self { level: 100.0, capacity }
    }

    pub fn at(level: f64, capacity: f64) -> Self {
        Self { level: level.clamp(0.0, 100.0), capacity }
    }

    /// Stored energy in joules.
    pub fn absolute(&self) -> f64 {
        self.level / 100.0 * self.capacity
    }

    /// Joules missing to a full charge.
    pub fn energy_needed(&self) -> f64 {
        (self.capacity - self.absolute()).max(0.0)
    }

    /// Apply an energy cost (negative = charge) and clamp into [0, 100].
    pub fn apply_energy(&mut self, energy_cost: f64) {
        if self.capacity <= 0.0 {
            return;
        }
        self.level = (self.level - energy::percent_of(energy_cost, self.capacity)).clamp(0.0, 100.0);
    }

    pub fn set_full(&mut self) {
        self.level = 100.0;
    }

    pub fn is_depleted(&self) -> bool {
        self.level <= 0.0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Carrier {
    pub position:    Vec3,
    pub orientation: Vec3,
    pub battery:     Battery,
    /// Mid pickup / dropoff / charge.
    pub occupied:    bool,
    pub cargo:       Option<UnitId>,
    pub moving:      bool,
}

impl Carrier {
    pub fn new(position: Vec3, capacity: f64) -> Self {
        Self {
            position,
            orientation: Vec3::ZERO,
            battery: Battery::full(capacity),
            occupied: false,
            cargo: None,
            moving: false,
        }
    }

    pub fn is_at(&self, position: Vec3) -> bool {
        self.position.approx_eq(position)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CleaningUnit {
    pub name:      String,
    pub position:  Vec3,
    pub battery:   Battery,
    pub cleaning:  bool,
    pub charging:  bool,
    pub on_target: Option<TargetId>,
}

impl CleaningUnit {
    pub fn new(name: impl Into<String>, position: Vec3, capacity: f64) -> Self {
        Self {
            name: name.into(),
            position,
            battery: Battery::full(capacity),
            cleaning: false,
            charging: false,
            on_target: None,
        }
    }

    pub fn is_busy(&self) -> bool {
        self.cleaning || self.charging
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TargetState {
    Dirty,
    Clean,
}

/// A cleanable window.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Target {
    pub name:              String,
    pub position:          Vec3,
    pub width:             f64,
    pub height:            f64,
    pub cleaning_duration: SimTime,
    pub state:             TargetState,
}

impl Target {
    pub fn new(name: impl Into<String>, position: Vec3, cleaning_duration: SimTime) -> Self {
        Self {
            name: name.into(),
            position,
            width: 1.0,
            height: 1.0,
            cleaning_duration,
            state: TargetState::Dirty,
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.state == TargetState::Dirty
    }
}

/// Fixed charging and exchange point.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Base {
    pub position: Vec3,
}
