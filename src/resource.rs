//! Resource reservation types (spec §3).

use serde::{Deserialize, Serialize};

/// A `{min, max}` pair for one resource dimension.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Range {
    pub min: u64,
    pub max: u64,
}

impl Range {
    pub fn new(min: u64, max: u64) -> Self {
        Self { min, max }
    }

    pub fn zero() -> Self {
        Self { min: 0, max: 0 }
    }
}

/// Per-service resource reservation: memory is the primary, hard
/// dimension; cores are elastic and rebalanced after placement.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResourceReservation {
    pub cores: Range,
    pub memory: Range,
}

impl ResourceReservation {
    pub fn new(cores: Range, memory: Range) -> Self {
        Self { cores, memory }
    }

    pub fn zero() -> Self {
        Self {
            cores: Range::zero(),
            memory: Range::zero(),
        }
    }

    /// Adds another reservation's min/max into this one, in place.
    /// Used to build `Execution::total_reservations` from its services.
    pub fn accumulate(&mut self, other: &ResourceReservation) {
        self.cores.min += other.cores.min;
        self.cores.max += other.cores.max;
        self.memory.min += other.memory.min;
        self.memory.max += other.memory.max;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accumulate_sums_min_and_max() {
        let mut total = ResourceReservation::zero();
        total.accumulate(&ResourceReservation::new(Range::new(1, 2), Range::new(1024, 2048)));
        total.accumulate(&ResourceReservation::new(Range::new(2, 4), Range::new(512, 512)));
        assert_eq!(total.cores, Range::new(3, 6));
        assert_eq!(total.memory, Range::new(1536, 2560));
    }
}
