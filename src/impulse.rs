//! Warm-started scalar impulse accumulation.

use crate::math::Interval;

/// Running total of a 1D impulse, kept inside an allowed range
///
/// Each solver sweep asks for a correction; the accumulator adds it to the total, clamps the total
/// and hands back only the part of the change that survived the clamp. Applying exactly that
/// delta to the bodies keeps them consistent with the clamped total, so repeated sweeps refine the
/// same impulse instead of stacking independent ones.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScalarImpulseAccumulator {
    total: f32,
}

impl ScalarImpulseAccumulator {
    pub const fn new() -> Self {
        Self { total: 0.0 }
    }

    /// Impulse accumulated so far
    pub fn total(&self) -> f32 {
        self.total
    }

    /// Accumulates `target_delta_velocity × effective_mass`, clamps the total into `allowed`
    /// and returns the impulse to apply this call (clamped total minus previous total)
    pub fn update(&mut self, target_delta_velocity: f32, effective_mass: f32, allowed: Interval) -> f32 {
        let previous = self.total;
        let requested = previous + target_delta_velocity*effective_mass;
        self.total = allowed.clamp(requested);
        self.total - previous
    }

    pub fn reset(&mut self) {
        self.total = 0.0;
    }
}
