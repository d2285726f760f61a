//! Simulation settings handed to [`crate::World::new`].

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::collision::Material;
use crate::error::{Error, Result};
use crate::math::Vec2;
use crate::toi::RootFinderConfig;
use crate::{
    DEFAULT_COLLISION_ITERATIONS, DEFAULT_FIXED_TIME, DEFAULT_GRAVITY, DEFAULT_MAX_SUBSTEPS,
    DEFAULT_PENETRATION_ALLOWANCE, DEFAULT_PENETRATION_CORRECTION,
};

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SimulationConfig {
    /// Acceleration applied to every body each tick (y grows downward)
    pub gravity: Vec2,
    /// Step used by [`crate::World::advance`]
    pub time_step: f32,
    /// Gauss-Seidel sweeps per tick
    pub solver_iterations: usize,
    pub penetration_allowance: f32,
    pub penetration_correction: f32,
    /// Material given to colliders and shapes that don't specify one
    pub material: Material,
    pub root_finder: RootFinderConfig,
    /// Impacts a continuous body may react to within one tick (at least 1)
    pub max_substeps: usize,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        SimulationConfig {
            gravity: DEFAULT_GRAVITY,
            time_step: DEFAULT_FIXED_TIME,
            solver_iterations: DEFAULT_COLLISION_ITERATIONS,
            penetration_allowance: DEFAULT_PENETRATION_ALLOWANCE,
            penetration_correction: DEFAULT_PENETRATION_CORRECTION,
            material: Material::default(),
            root_finder: RootFinderConfig::default(),
            max_substeps: DEFAULT_MAX_SUBSTEPS,
        }
    }
}

impl SimulationConfig {
    pub fn builder() -> SimulationConfigBuilder {
        SimulationConfigBuilder::default()
    }

    /// Checks the values the stepping code relies on
    pub fn validate(&self) -> Result<()> {
        if !(self.time_step > 0.0) {
            return Err(Error::InvalidConfig("time step must be positive"));
        }
        if self.root_finder.samples == 0 {
            return Err(Error::InvalidConfig("root finder needs at least one sample"));
        }
        if !(self.root_finder.tolerance > 0.0) {
            return Err(Error::InvalidConfig("root finder tolerance must be positive"));
        }
        if !(self.penetration_allowance >= 0.0) {
            return Err(Error::InvalidConfig("penetration allowance must be non-negative"));
        }
        if !(0.0..=1.0).contains(&self.penetration_correction) {
            return Err(Error::InvalidConfig("penetration correction must lie in [0, 1]"));
        }
        if self.max_substeps == 0 {
            return Err(Error::InvalidConfig("continuous bodies need at least one sub-step"));
        }
        if !self.gravity.is_finite() {
            return Err(Error::InvalidConfig("gravity must be finite"));
        }
        Ok(())
    }
}

/// Chained setters over [`SimulationConfig::default`]
#[derive(Debug, Clone, Default)]
pub struct SimulationConfigBuilder {
    config: SimulationConfig,
}

impl SimulationConfigBuilder {
    pub fn gravity(mut self, gravity: Vec2) -> Self {
        self.config.gravity = gravity;
        self
    }

    pub fn time_step(mut self, time_step: f32) -> Self {
        self.config.time_step = time_step;
        self
    }

    pub fn solver_iterations(mut self, iterations: usize) -> Self {
        self.config.solver_iterations = iterations;
        self
    }

    pub fn penetration(mut self, allowance: f32, correction: f32) -> Self {
        self.config.penetration_allowance = allowance;
        self.config.penetration_correction = correction;
        self
    }

    pub fn material(mut self, material: Material) -> Self {
        self.config.material = material;
        self
    }

    pub fn root_finder(mut self, root_finder: RootFinderConfig) -> Self {
        self.config.root_finder = root_finder;
        self
    }

    pub fn max_substeps(mut self, max_substeps: usize) -> Self {
        self.config.max_substeps = max_substeps;
        self
    }

    pub fn build(self) -> Result<SimulationConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
