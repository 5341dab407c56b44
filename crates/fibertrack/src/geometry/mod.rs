//! Shared geometry primitives: points, tracks, voxel volumes and random directions.
//!
//! All coordinates are real-world millimeters. Random helpers take `&mut dyn RngCore`
//! so trackers, seed samplers and probabilistic field samplers share one per-worker RNG.
use glam::Vec3;
use rand::Rng as RngCore;

pub mod track;
pub mod volume;

pub use track::Track;
pub use volume::Volume;

/// A 3-D real-world coordinate in millimeters.
pub type Point = Vec3;

/// Generate a random float in the range [0, 1).
#[inline]
pub(crate) fn rand01(rng: &mut dyn RngCore) -> f32 {
    (rng.next_u32() as f32) / ((u32::MAX as f32) + 1.0)
}

/// Generate a random index in `0..len`. `len` must be non-zero.
#[inline]
pub(crate) fn rand_index(rng: &mut dyn RngCore, len: usize) -> usize {
    debug_assert!(len > 0);
    ((rng.next_u64() % len as u64) as usize).min(len - 1)
}

/// Two independent standard-normal samples (Box-Muller).
pub(crate) fn box_muller_pair(rng: &mut dyn RngCore) -> (f32, f32) {
    let u1 = (1.0 - rand01(rng)).clamp(f32::MIN_POSITIVE, 1.0);
    let u2 = rand01(rng);

    let r = (-2.0 * u1.ln()).sqrt();
    let theta = 2.0 * core::f32::consts::PI * u2;

    (r * theta.cos(), r * theta.sin())
}

/// Draw an isotropically distributed unit vector.
///
/// Three independent standard-normal components are normalized; the (vanishingly
/// rare) zero-length draw is retried.
pub fn random_unit_vector(rng: &mut dyn RngCore) -> Vec3 {
    loop {
        let (x, y) = box_muller_pair(rng);
        let (z, _) = box_muller_pair(rng);
        let v = Vec3::new(x, y, z);
        let len = v.length();
        if len > 1e-6 {
            return v / len;
        }
    }
}

/// Draw a unit vector uniformly from the spherical cap of half-angle `max_angle`
/// around `axis`.
pub fn random_in_cone(axis: Vec3, max_angle: f32, rng: &mut dyn RngCore) -> Vec3 {
    let Some(axis) = axis.try_normalize() else {
        return random_unit_vector(rng);
    };
    let cos_max = max_angle.clamp(0.0, core::f32::consts::PI).cos();
    let cos_t = 1.0 - rand01(rng) * (1.0 - cos_max);
    let sin_t = (1.0 - cos_t * cos_t).max(0.0).sqrt();
    let phi = 2.0 * core::f32::consts::PI * rand01(rng);
    let (u, v) = axis.any_orthonormal_pair();
    (axis * cos_t + (u * phi.cos() + v * phi.sin()) * sin_t).normalize()
}

/// Unit direction from azimuth and elevation in radians.
///
/// Elevation is the polar angle from +z; azimuth is measured in the xy-plane from +x.
pub fn direction_from_angles(azimuth: f32, elevation: f32) -> Vec3 {
    Vec3::new(
        elevation.sin() * azimuth.cos(),
        elevation.sin() * azimuth.sin(),
        elevation.cos(),
    )
}
