//! Orientation field backed by a per-voxel principal-direction image.
//!
//! Each voxel holds a 3-vector whose direction is the dominant fiber orientation and
//! whose norm is its amplitude. Peak directions are sign-ambiguous; every lookup is
//! aligned with the caller's previous direction.
use std::f32::consts::FRAC_PI_4;
use std::sync::Arc;

use glam::Vec3;
use rand::Rng as RngCore;

use crate::error::{Error, Result};
use crate::field::{FieldSample, FieldSampler, FieldSource, TrackingMethod};
use crate::geometry::{rand01, random_in_cone, Point, Volume};

pub const DEFAULT_TRIALS: usize = 50;
pub const DEFAULT_LOBE_POWER: f32 = 8.0;

#[derive(Debug)]
struct PeakData {
    image: Volume,
    // unit direction and amplitude per voxel
    table: Vec<(Vec3, f32)>,
}

/// Shared, read-only peak image plus the sampling parameters of one tracking method.
#[derive(Clone, Debug)]
pub struct PeakField {
    data: Arc<PeakData>,
    method: TrackingMethod,
    trials: usize,
    max_angle: f32,
    lobe_power: f32,
}

impl PeakField {
    /// Wrap a three-component peak image.
    pub fn new(image: Volume, method: TrackingMethod) -> Result<Self> {
        image.validate()?;
        if image.components() != 3 {
            return Err(Error::DimensionMismatch {
                expected: "3 components for a peak image".into(),
                found: format!("{} components", image.components()),
            });
        }
        let table = image
            .data()
            .chunks_exact(3)
            .map(|c| {
                let v = Vec3::new(c[0], c[1], c[2]);
                let amplitude = v.length();
                if amplitude > 0.0 && amplitude.is_finite() {
                    (v / amplitude, amplitude)
                } else {
                    (Vec3::ZERO, 0.0)
                }
            })
            .collect();
        Ok(Self {
            data: Arc::new(PeakData { image, table }),
            method,
            trials: DEFAULT_TRIALS,
            max_angle: FRAC_PI_4,
            lobe_power: DEFAULT_LOBE_POWER,
        })
    }

    /// Number of candidate directions drawn per probabilistic step.
    pub fn with_trials(mut self, trials: usize) -> Self {
        self.trials = trials.max(1);
        self
    }

    /// Half-angle in radians of the cone probabilistic candidates are drawn from.
    pub fn with_max_angle(mut self, max_angle: f32) -> Self {
        self.max_angle = max_angle;
        self
    }

    /// Sharpness of the angular falloff of a peak's amplitude.
    pub fn with_lobe_power(mut self, lobe_power: f32) -> Self {
        self.lobe_power = lobe_power;
        self
    }

    pub fn image(&self) -> &Volume {
        &self.data.image
    }

    pub fn method(&self) -> TrackingMethod {
        self.method
    }
}

impl FieldSource for PeakField {
    type Sampler = PeakSampler;

    fn sampler(&self) -> PeakSampler {
        PeakSampler {
            field: self.clone(),
        }
    }
}

/// Per-thread cursor into a [`PeakField`].
#[derive(Debug)]
pub struct PeakSampler {
    field: PeakField,
}

impl PeakSampler {
    /// Local peak aligned with `hint`, or `None` outside the image.
    fn peak(&self, p: Point, hint: Vec3, precomputed: bool) -> Option<(Vec3, f32)> {
        let data = &self.field.data;
        let (dir, amplitude) = if precomputed {
            let i = data.image.nearest_index(p)?;
            data.table[i]
        } else {
            let corners = data.image.trilinear_neighbours(p)?;
            let raw = data.image.data();
            let mut v = Vec3::ZERO;
            for (offset, w) in corners {
                if w == 0.0 {
                    continue;
                }
                let c = Vec3::new(raw[offset], raw[offset + 1], raw[offset + 2]);
                let aligned = if c.dot(hint) < 0.0 { -c } else { c };
                v += aligned * w;
            }
            let amplitude = v.length();
            if amplitude > 0.0 && amplitude.is_finite() {
                (v / amplitude, amplitude)
            } else {
                (Vec3::ZERO, 0.0)
            }
        };
        let dir = if dir.dot(hint) < 0.0 { -dir } else { dir };
        Some((dir, amplitude))
    }
}

impl FieldSampler for PeakSampler {
    fn sample(
        &mut self,
        position: Point,
        previous_direction: Vec3,
        precomputed: bool,
        rng: &mut dyn RngCore,
    ) -> FieldSample {
        let Some((peak, amplitude)) = self.peak(position, previous_direction, precomputed) else {
            return FieldSample::outside();
        };

        if !self.field.method.is_probabilistic() {
            return FieldSample::new(peak, amplitude);
        }

        if amplitude <= 0.0 {
            return FieldSample::new(previous_direction, 0.0);
        }
        // Rejection sampling of a lobe around the peak, restricted to a cone around
        // the previous direction.
        for _ in 0..self.field.trials {
            let candidate = random_in_cone(previous_direction, self.field.max_angle, rng);
            let value = amplitude * candidate.dot(peak).abs().powf(self.field.lobe_power);
            if rand01(rng) * amplitude < value {
                return FieldSample::new(candidate, value);
            }
        }
        FieldSample::new(previous_direction, 0.0)
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;

    fn uniform_field(v: Vec3) -> Volume {
        let mut image = Volume::new([5, 5, 5], 3, Vec3::ONE, Vec3::ZERO);
        for z in 0..5 {
            for y in 0..5 {
                for x in 0..5 {
                    image.set(x, y, z, 0, v.x);
                    image.set(x, y, z, 1, v.y);
                    image.set(x, y, z, 2, v.z);
                }
            }
        }
        image
    }

    #[test]
    fn rejects_scalar_images() {
        let err = PeakField::new(
            Volume::new([2, 2, 2], 1, Vec3::ONE, Vec3::ZERO),
            TrackingMethod::SdStream,
        )
        .unwrap_err();
        assert!(matches!(err, Error::DimensionMismatch { .. }));
    }

    #[test]
    fn streamline_sampler_aligns_with_hint() {
        let field =
            PeakField::new(uniform_field(Vec3::new(0.0, 0.0, 2.0)), TrackingMethod::DtStream)
                .unwrap();
        let mut s = field.sampler();
        let mut rng = StdRng::seed_from_u64(1);
        for precomputed in [true, false] {
            let up = s.sample(Vec3::splat(2.0), Vec3::Z, precomputed, &mut rng);
            assert_eq!(up.direction, Vec3::Z);
            assert!((up.amplitude - 2.0).abs() < 1e-6);

            let down = s.sample(Vec3::splat(2.0), -Vec3::Z, precomputed, &mut rng);
            assert_eq!(down.direction, -Vec3::Z);
        }
    }

    #[test]
    fn interpolation_does_not_cancel_flipped_neighbours() {
        let mut image = uniform_field(Vec3::X);
        // flip the sign of every other x-slice
        for z in 0..5 {
            for y in 0..5 {
                for x in (1..5).step_by(2) {
                    image.set(x, y, z, 0, -1.0);
                }
            }
        }
        let field = PeakField::new(image, TrackingMethod::SdStream).unwrap();
        let mut s = field.sampler();
        let mut rng = StdRng::seed_from_u64(1);
        let out = s.sample(Vec3::new(1.5, 2.0, 2.0), Vec3::X, false, &mut rng);
        assert!((out.amplitude - 1.0).abs() < 1e-5);
        assert!((out.direction - Vec3::X).length() < 1e-5);
    }

    #[test]
    fn outside_the_image_is_nan() {
        let field = PeakField::new(uniform_field(Vec3::X), TrackingMethod::SdProb).unwrap();
        let mut s = field.sampler();
        let mut rng = StdRng::seed_from_u64(1);
        for precomputed in [true, false] {
            let out = s.sample(Vec3::splat(-10.0), Vec3::X, precomputed, &mut rng);
            assert!(out.is_outside());
        }
    }

    #[test]
    fn probabilistic_draws_stay_in_cone_and_near_peak() {
        let field = PeakField::new(uniform_field(Vec3::X), TrackingMethod::SdProb)
            .unwrap()
            .with_max_angle(0.5)
            .with_trials(200);
        let mut s = field.sampler();
        let mut rng = StdRng::seed_from_u64(8);
        let hint = Vec3::new(1.0, 0.2, 0.0).normalize();
        for _ in 0..200 {
            let out = s.sample(Vec3::splat(2.0), hint, true, &mut rng);
            assert!(out.amplitude > 0.0);
            assert!(out.amplitude <= 1.0 + 1e-6);
            assert!(out.direction.dot(hint) >= 0.5f32.cos() - 1e-4);
        }
    }

    #[test]
    fn probabilistic_gives_up_after_trials() {
        // peak perpendicular to the only allowed cone
        let field = PeakField::new(uniform_field(Vec3::Z), TrackingMethod::DtProb)
            .unwrap()
            .with_max_angle(0.01)
            .with_trials(5);
        let mut s = field.sampler();
        let mut rng = StdRng::seed_from_u64(2);
        let out = s.sample(Vec3::splat(2.0), Vec3::X, true, &mut rng);
        assert_eq!(out.amplitude, 0.0);
    }
}
