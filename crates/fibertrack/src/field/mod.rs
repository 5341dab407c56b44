//! Orientation-field sampling.
//!
//! The tracker only needs a local fiber direction and its amplitude at arbitrary
//! positions. [`FieldSampler`] is that capability; [`FieldSource`] hands out one
//! sampler per worker thread so each thread owns a private cursor into shared,
//! read-only field data.
//!
//! [`PeakField`] is the bundled source: a per-voxel principal-direction image.
use std::fmt;
use std::str::FromStr;

use glam::Vec3;
use rand::Rng as RngCore;

use crate::error::{Error, Result};
use crate::geometry::Point;

pub mod peaks;

pub use peaks::{PeakField, PeakSampler};

/// Local direction and amplitude returned by a [`FieldSampler`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FieldSample {
    /// Unit fiber direction, sign-aligned with the hint where meaningful.
    pub direction: Vec3,
    /// Field amplitude along `direction`. `NaN` means outside the data support.
    pub amplitude: f32,
}

impl FieldSample {
    pub fn new(direction: Vec3, amplitude: f32) -> Self {
        Self {
            direction,
            amplitude,
        }
    }

    /// Sample reported for positions outside the data.
    pub fn outside() -> Self {
        Self {
            direction: Vec3::ZERO,
            amplitude: f32::NAN,
        }
    }

    pub fn is_outside(&self) -> bool {
        !self.amplitude.is_finite()
    }
}

/// Evaluates the orientation field at a point.
///
/// `previous_direction` is a continuity hint: implementations return the local
/// direction closest to it. `precomputed` selects a lookup-table evaluation path
/// where the implementation has one.
pub trait FieldSampler {
    fn sample(
        &mut self,
        position: Point,
        previous_direction: Vec3,
        precomputed: bool,
        rng: &mut dyn RngCore,
    ) -> FieldSample;
}

impl<F> FieldSampler for F
where
    F: FnMut(Point, Vec3) -> FieldSample,
{
    #[inline]
    fn sample(
        &mut self,
        position: Point,
        previous_direction: Vec3,
        _precomputed: bool,
        _rng: &mut dyn RngCore,
    ) -> FieldSample {
        self(position, previous_direction)
    }
}

/// Shared field data that can create per-thread samplers.
pub trait FieldSource: Sync {
    type Sampler: FieldSampler + Send;

    fn sampler(&self) -> Self::Sampler;
}

impl<F, S> FieldSource for F
where
    F: Fn() -> S + Sync,
    S: FieldSampler + Send,
{
    type Sampler = S;

    fn sampler(&self) -> S {
        self()
    }
}

/// Tracking algorithm requested on the command line.
///
/// Tensor (`Dt*`) and spherical-deconvolution (`Sd*`) methods differ in the field
/// they are run on and in their default step and curvature; `*Stream` methods follow
/// the local peak deterministically while `*Prob` methods draw directions around it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TrackingMethod {
    DtStream,
    DtProb,
    SdStream,
    SdProb,
}

impl TrackingMethod {
    pub fn is_probabilistic(&self) -> bool {
        matches!(self, TrackingMethod::DtProb | TrackingMethod::SdProb)
    }

    /// Default step size as a fraction of the smallest voxel edge.
    pub fn default_step_fraction(&self) -> f32 {
        match self {
            TrackingMethod::DtStream | TrackingMethod::DtProb => 0.1,
            TrackingMethod::SdStream | TrackingMethod::SdProb => 0.2,
        }
    }

    /// Default minimum radius of curvature in millimeters.
    pub fn default_curvature(&self) -> f32 {
        match self {
            TrackingMethod::DtStream | TrackingMethod::DtProb => 2.0,
            TrackingMethod::SdStream | TrackingMethod::SdProb => 1.0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TrackingMethod::DtStream => "DT_STREAM",
            TrackingMethod::DtProb => "DT_PROB",
            TrackingMethod::SdStream => "SD_STREAM",
            TrackingMethod::SdProb => "SD_PROB",
        }
    }
}

impl fmt::Display for TrackingMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TrackingMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "DT_STREAM" => Ok(TrackingMethod::DtStream),
            "DT_PROB" => Ok(TrackingMethod::DtProb),
            "SD_STREAM" => Ok(TrackingMethod::SdStream),
            "SD_PROB" => Ok(TrackingMethod::SdProb),
            other => Err(Error::InvalidConfig(format!(
                "unknown tracking type '{other}' (expected DT_STREAM, DT_PROB, SD_STREAM or SD_PROB)"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;

    #[test]
    fn closures_are_samplers() {
        let mut s = |p: Point, _d: Vec3| FieldSample::new(Vec3::X, p.x);
        let mut rng = StdRng::seed_from_u64(0);
        let out = s.sample(Vec3::new(3.0, 0.0, 0.0), Vec3::Z, true, &mut rng);
        assert_eq!(out, FieldSample::new(Vec3::X, 3.0));
    }

    #[test]
    fn outside_sample_is_not_finite() {
        assert!(FieldSample::outside().is_outside());
        assert!(!FieldSample::new(Vec3::X, 0.0).is_outside());
    }

    #[test]
    fn method_names_parse_case_insensitively() {
        assert_eq!(
            "sd_prob".parse::<TrackingMethod>().unwrap(),
            TrackingMethod::SdProb
        );
        assert_eq!(
            TrackingMethod::DtStream.to_string().parse::<TrackingMethod>().unwrap(),
            TrackingMethod::DtStream
        );
        assert!("CSD".parse::<TrackingMethod>().is_err());
        assert!(TrackingMethod::DtProb.is_probabilistic());
        assert!(!TrackingMethod::SdStream.is_probabilistic());
    }
}
