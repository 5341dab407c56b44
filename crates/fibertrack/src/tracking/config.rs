//! Per-track propagation parameters.
use std::f32::consts::{FRAC_PI_2, PI};

use glam::Vec3;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub const DEFAULT_MAX_SEED_TRIALS: usize = 1000;

/// Configuration for a [`crate::tracking::Tracker`].
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TrackerConfig {
    /// Distance advanced per step in millimeters.
    pub step_size: f32,
    /// Minimum radius of curvature in millimeters. `0` disables the constraint.
    pub min_curvature_radius: f32,
    /// Maximum track length in millimeters, both directions combined.
    pub max_dist: f32,
    /// Tracks not longer than this (in millimeters) are discarded.
    pub min_dist: f32,
    /// Amplitude below which propagation stops.
    pub threshold: f32,
    /// Amplitude a seed must exceed.
    pub init_threshold: f32,
    /// Grow from the seed in one direction only.
    pub unidirectional: bool,
    /// Stop once every include region has been visited.
    pub stop_when_included: bool,
    /// Seed direction to use instead of a random one.
    pub init_direction: Option<Vec3>,
    /// Maximum angle in radians between `init_direction` and the field at the seed.
    pub init_tolerance: f32,
    /// Use the field's lookup-table evaluation path.
    pub precomputed: bool,
    /// Seed draws per attempt before giving up.
    pub max_seed_trials: usize,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            step_size: 0.2,
            min_curvature_radius: 1.0,
            max_dist: 200.0,
            min_dist: 10.0,
            threshold: 0.1,
            init_threshold: 0.2,
            unidirectional: false,
            stop_when_included: false,
            init_direction: None,
            init_tolerance: FRAC_PI_2,
            precomputed: true,
            max_seed_trials: DEFAULT_MAX_SEED_TRIALS,
        }
    }
}

impl TrackerConfig {
    /// Creates a new [`TrackerConfig`] with the specified step size.
    pub fn new(step_size: f32) -> Self {
        Self {
            step_size,
            ..Default::default()
        }
    }

    pub fn with_step_size(mut self, step_size: f32) -> Self {
        self.step_size = step_size;
        self
    }

    pub fn with_min_curvature_radius(mut self, radius: f32) -> Self {
        self.min_curvature_radius = radius;
        self
    }

    pub fn with_max_dist(mut self, max_dist: f32) -> Self {
        self.max_dist = max_dist;
        self
    }

    pub fn with_min_dist(mut self, min_dist: f32) -> Self {
        self.min_dist = min_dist;
        self
    }

    /// Sets the propagation and seeding thresholds.
    pub fn with_thresholds(mut self, threshold: f32, init_threshold: f32) -> Self {
        self.threshold = threshold;
        self.init_threshold = init_threshold;
        self
    }

    pub fn with_unidirectional(mut self, unidirectional: bool) -> Self {
        self.unidirectional = unidirectional;
        self
    }

    pub fn with_stop_when_included(mut self, stop: bool) -> Self {
        self.stop_when_included = stop;
        self
    }

    /// Sets a preferred seed direction and the angular tolerance around it.
    pub fn with_init_direction(mut self, direction: Vec3, tolerance: f32) -> Self {
        self.init_direction = Some(direction);
        self.init_tolerance = tolerance;
        self
    }

    pub fn with_precomputed(mut self, precomputed: bool) -> Self {
        self.precomputed = precomputed;
        self
    }

    pub fn with_max_seed_trials(mut self, trials: usize) -> Self {
        self.max_seed_trials = trials;
        self
    }

    /// Minimum dot product between consecutive directions.
    ///
    /// Consecutive directions may turn by at most `step_size / (2 * min_curvature_radius)`.
    pub fn min_dp(&self) -> f32 {
        if self.min_curvature_radius > 0.0 {
            (self.step_size / (2.0 * self.min_curvature_radius))
                .min(PI)
                .cos()
        } else {
            -1.0
        }
    }

    /// Largest angle in radians allowed between consecutive directions.
    pub fn max_angle(&self) -> f32 {
        self.min_dp().clamp(-1.0, 1.0).acos()
    }

    /// Tracks must have more points than this to be kept.
    pub fn min_size(&self) -> usize {
        (self.min_dist / self.step_size).round() as usize
    }

    /// Maximum number of steps over the whole track.
    pub fn max_steps(&self) -> usize {
        (self.max_dist / self.step_size).floor() as usize
    }

    /// Validates the configuration, returning an error if invalid.
    pub fn validate(&self) -> Result<()> {
        if !(self.step_size.is_finite() && self.step_size > 0.0) {
            return Err(Error::InvalidConfig("step size must be > 0".into()));
        }
        if !(self.min_curvature_radius.is_finite() && self.min_curvature_radius >= 0.0) {
            return Err(Error::InvalidConfig(
                "curvature radius must be >= 0".into(),
            ));
        }
        if !(self.max_dist.is_finite() && self.max_dist >= self.step_size) {
            return Err(Error::InvalidConfig(
                "maximum length must be at least one step".into(),
            ));
        }
        if !(self.min_dist.is_finite() && self.min_dist >= 0.0) {
            return Err(Error::InvalidConfig("minimum length must be >= 0".into()));
        }
        if self.min_dist > self.max_dist {
            return Err(Error::InvalidConfig(format!(
                "minimum length {} exceeds maximum length {}",
                self.min_dist, self.max_dist
            )));
        }
        if !(self.threshold.is_finite() && self.threshold >= 0.0) {
            return Err(Error::InvalidConfig("cutoff must be >= 0".into()));
        }
        if !(self.init_threshold.is_finite() && self.init_threshold >= 0.0) {
            return Err(Error::InvalidConfig("initial cutoff must be >= 0".into()));
        }
        if let Some(dir) = self.init_direction {
            if !dir.is_finite() || dir.length_squared() == 0.0 {
                return Err(Error::InvalidConfig(
                    "initial direction must be a non-zero vector".into(),
                ));
            }
            if !(self.init_tolerance.is_finite() && self.init_tolerance > 0.0) {
                return Err(Error::InvalidConfig(
                    "initial direction tolerance must be > 0".into(),
                ));
            }
        }
        if self.max_seed_trials == 0 {
            return Err(Error::InvalidConfig("max_seed_trials must be > 0".into()));
        }
        Ok(())
    }
}
