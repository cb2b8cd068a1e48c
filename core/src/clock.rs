//! Simulation clock: elapsed seconds since scenario start.

use crate::types::SimTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct SimClock {
    elapsed: SimTime,
}

impl SimClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn starting_at(elapsed: SimTime) -> Self {
        Self { elapsed }
    }

    pub fn elapsed(&self) -> SimTime {
        self.elapsed
    }

    /// Advance by `dt` seconds. Returns the new elapsed time.
    /// A negative or non-finite step leaves the clock where it is.
    pub fn advance(&mut self, dt: SimTime) -> SimTime {
        if dt.is_finite() && dt >= 0.0 {
            self.elapsed += dt;
        }
        self.elapsed
    }
}
