//! Shared primitive types used across the entire engine.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Mul, Sub};

/// Simulation time in seconds since scenario start.
pub type SimTime = f64;

/// Index of a cleaning unit in `World::units`.
pub type UnitId = usize;

/// Index of a target in `World::targets`.
pub type TargetId = usize;

/// Two positions closer than this are the same place.
pub const POSITION_EPSILON: f64 = 1e-6;

/// Accumulated action time within this of the duration counts as finished.
pub const TIME_EPSILON: f64 = 1e-9;

/// A point (or direction) in 3D space.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3 { x: 0.0, y: 0.0, z: 0.0 };

    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn norm(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    pub fn distance_to(&self, other: Vec3) -> f64 {
        (other - *self).norm()
    }

    pub fn approx_eq(&self, other: Vec3) -> bool {
        self.distance_to(other) <= POSITION_EPSILON
    }

    /// Move at most `max_distance` toward `dest`.
    /// Lands exactly on `dest` once it is within reach.
    pub fn step_toward(&self, dest: Vec3, max_distance: f64) -> Vec3 {
        let direction = dest - *self;
        let remaining = direction.norm();
        if max_distance >= remaining || remaining <= POSITION_EPSILON {
            return dest;
        }
        *self + direction * (max_distance / remaining)
    }

    pub fn to_array(&self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }
}

impl From<[f64; 3]> for Vec3 {
    fn from(v: [f64; 3]) -> Self {
        Self::new(v[0], v[1], v[2])
    }
}

impl Add for Vec3 {
    type Output = Vec3;
    fn add(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Vec3 {
    type Output = Vec3;
    fn sub(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f64> for Vec3 {
    type Output = Vec3;
    fn mul(self, rhs: f64) -> Vec3 {
        Vec3::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

impl fmt::Display for Vec3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.2}, {:.2}, {:.2})", self.x, self.y, self.z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_toward_snaps_when_in_reach() {
        let a = Vec3::new(0.0, 0.0, 0.0);
        let b = Vec3::new(3.0, 4.0, 0.0);
        assert_eq!(a.step_toward(b, 5.0), b);
        assert_eq!(a.step_toward(b, 7.5), b);
    }

    #[test]
    fn step_toward_moves_partially() {
        let a = Vec3::new(0.0, 0.0, 0.0);
        let b = Vec3::new(10.0, 0.0, 0.0);
        let p = a.step_toward(b, 2.5);
        assert!((p.x - 2.5).abs() < 1e-12);
        assert!((a.distance_to(b) - 10.0).abs() < 1e-12);
    }

    #[test]
    fn approx_eq_tolerates_rounding() {
        let a = Vec3::new(1.0, 2.0, 3.0);
        assert!(a.approx_eq(Vec3::new(1.0 + 1e-9, 2.0, 3.0)));
        assert!(!a.approx_eq(Vec3::new(1.1, 2.0, 3.0)));
    }
}
