//! Duration, energy and percentage arithmetic shared by every action.
//!
//! Sign convention: a positive energy cost drains a battery, a negative one
//! (charging) fills it. Costs are absolute joules; batteries store percent.

use crate::types::{SimTime, Vec3};

/// Seconds to cover the straight line `from → to` at `speed`.
pub fn travel_duration(from: Vec3, to: Vec3, speed: f64) -> SimTime {
    if speed <= 0.0 {
        return 0.0;
    }
    from.distance_to(to) / speed
}

/// Energy drawn by running at `power` J/s for `duration` seconds.
pub fn draw(duration: SimTime, power: f64) -> f64 {
    duration * power
}

/// Seconds to refill `energy_needed` joules at `rate` J/s, never below `min_duration`.
pub fn charge_duration(energy_needed: f64, rate: f64, min_duration: SimTime) -> SimTime {
    let duration = if rate > 0.0 { energy_needed.max(0.0) / rate } else { 0.0 };
    duration.max(min_duration)
}

/// Charging uses the negative cost convention.
pub fn charge_energy(duration: SimTime, rate: f64) -> f64 {
    -(duration * rate)
}

/// Battery percentage represented by `energy` joules of a `capacity` joule battery.
pub fn percent_of(energy: f64, capacity: f64) -> f64 {
    if capacity <= 0.0 {
        return 0.0;
    }
    energy / capacity * 100.0
}

/// The share of `energy_cost` that falls inside a `slice` of a `duration`-long action.
/// Zero-duration actions never draw energy.
pub fn slice_energy(energy_cost: f64, duration: SimTime, slice: SimTime) -> f64 {
    if duration <= 0.0 {
        return 0.0;
    }
    energy_cost / duration * slice
}
