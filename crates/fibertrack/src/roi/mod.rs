//! Regions of interest: containment predicates used for seeding, selection and stopping.
//!
//! An [`Roi`] pairs a [`Role`] with a [`Shape`]. Shapes are either a sphere in world
//! coordinates or a mask image. ROIs are built from their textual specification with
//! [`Roi::parse`]; mask images are resolved through a [`VolumeLoader`].
//!
//! Per-role collections and the track acceptance algorithm live in [`set`].
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use glam::Vec3;
use rand::Rng as RngCore;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::geometry::{rand01, rand_index, Point, Volume};
use crate::io::VolumeLoader;

pub mod set;

pub use set::RoiSet;

/// Threshold applied to mask samples.
pub const MASK_THRESHOLD: f32 = 0.5;

/// What an ROI is used for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Role {
    /// Seed points are drawn from these regions (generation only).
    Seed,
    /// Accepted tracks must visit every include region.
    Include,
    /// Accepted tracks must not touch any exclude region.
    Exclude,
    /// Propagation stops when leaving any mask region (generation only).
    Mask,
}

impl Role {
    pub const ALL: [Role; 4] = [Role::Seed, Role::Include, Role::Exclude, Role::Mask];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Seed => "seed",
            Role::Include => "include",
            Role::Exclude => "exclude",
            Role::Mask => "mask",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "seed" => Ok(Role::Seed),
            "include" => Ok(Role::Include),
            "exclude" => Ok(Role::Exclude),
            "mask" => Ok(Role::Mask),
            other => Err(Error::Format(format!("unknown ROI role '{other}'"))),
        }
    }
}

/// A binary region defined by a single-component image.
#[derive(Clone, Debug)]
pub struct MaskRegion {
    image: Arc<Volume>,
    interpolate: bool,
    inside: Arc<[[isize; 3]]>,
}

impl MaskRegion {
    /// Wrap a mask image. Fails if the image has more than one component.
    pub fn new(image: Arc<Volume>, interpolate: bool) -> Result<Self> {
        if image.components() != 1 {
            return Err(Error::DimensionMismatch {
                expected: "1 component for a mask image".into(),
                found: format!("{} components", image.components()),
            });
        }
        let [nx, ny, nz] = image.dims();
        let mut inside = Vec::new();
        for z in 0..nz as isize {
            for y in 0..ny as isize {
                for x in 0..nx as isize {
                    if image.get(x, y, z, 0).is_some_and(|v| v > MASK_THRESHOLD) {
                        inside.push([x, y, z]);
                    }
                }
            }
        }
        Ok(Self {
            image,
            interpolate,
            inside: inside.into(),
        })
    }

    pub fn image(&self) -> &Arc<Volume> {
        &self.image
    }

    pub fn interpolate(&self) -> bool {
        self.interpolate
    }

    /// Number of voxels above threshold.
    pub fn voxel_count(&self) -> usize {
        self.inside.len()
    }

    pub fn contains(&self, p: Point) -> bool {
        self.image
            .sample_scalar(p, self.interpolate)
            .is_some_and(|v| v > MASK_THRESHOLD)
    }

    fn sample_point(&self, rng: &mut dyn RngCore) -> Option<Point> {
        if self.inside.is_empty() {
            return None;
        }
        let [x, y, z] = self.inside[rand_index(rng, self.inside.len())];
        let jitter = Vec3::new(rand01(rng), rand01(rng), rand01(rng)) - Vec3::splat(0.5);
        Some(self.image.voxel_to_world(x, y, z) + jitter * self.image.voxel_size())
    }
}

/// Geometric or raster extent of an ROI.
#[derive(Clone, Debug)]
pub enum Shape {
    Sphere { center: Point, radius: f32 },
    Mask(MaskRegion),
}

impl Shape {
    pub fn contains(&self, p: Point) -> bool {
        match self {
            Shape::Sphere { center, radius } => p.distance_squared(*center) <= radius * radius,
            Shape::Mask(mask) => mask.contains(p),
        }
    }
}

/// A region of interest with its role and the specification it was built from.
#[derive(Clone, Debug)]
pub struct Roi {
    pub role: Role,
    pub shape: Shape,
    spec: String,
}

impl Roi {
    pub fn sphere(role: Role, center: Point, radius: f32) -> Self {
        Self {
            role,
            shape: Shape::Sphere { center, radius },
            spec: format!("{},{},{},{}", center.x, center.y, center.z, radius),
        }
    }

    pub fn mask(role: Role, mask: MaskRegion, spec: impl Into<String>) -> Self {
        Self {
            role,
            shape: Shape::Mask(mask),
            spec: spec.into(),
        }
    }

    /// Build an ROI from `x,y,z,radius` or a mask image path.
    ///
    /// A spec whose comma-separated fields are all numbers must be a sphere; anything
    /// else is loaded as an image through `loader`.
    pub fn parse(
        role: Role,
        spec: &str,
        loader: &dyn VolumeLoader,
        interpolate: bool,
    ) -> Result<Self> {
        let spec = spec.trim();
        if spec.is_empty() {
            return Err(Error::invalid_roi(spec, "empty specification"));
        }

        if let Some(values) = parse_numbers(spec) {
            if values.len() != 4 {
                return Err(Error::invalid_roi(
                    spec,
                    format!("expected x,y,z,radius, got {} values", values.len()),
                ));
            }
            if values.iter().any(|v| !v.is_finite()) {
                return Err(Error::invalid_roi(spec, "values must be finite"));
            }
            if values[3] <= 0.0 {
                return Err(Error::invalid_roi(spec, "radius must be > 0"));
            }
            let mut roi = Roi::sphere(role, Vec3::new(values[0], values[1], values[2]), values[3]);
            roi.spec = spec.to_owned();
            return Ok(roi);
        }

        let image = loader.load(spec)?;
        let mask = MaskRegion::new(Arc::new(image), interpolate)?;
        if role == Role::Seed && mask.voxel_count() == 0 {
            return Err(Error::invalid_roi(spec, "seed mask contains no voxels"));
        }
        Ok(Roi::mask(role, mask, spec))
    }

    /// Textual specification, as recorded in track file properties.
    pub fn spec(&self) -> &str {
        &self.spec
    }

    #[inline]
    pub fn contains(&self, p: Point) -> bool {
        self.shape.contains(p)
    }

    /// Draw a uniformly distributed point inside the region.
    ///
    /// Returns `None` only for an empty mask.
    pub fn sample_point(&self, rng: &mut dyn RngCore) -> Option<Point> {
        match &self.shape {
            Shape::Sphere { center, radius } => loop {
                let u = Vec3::new(rand01(rng), rand01(rng), rand01(rng)) * 2.0 - Vec3::ONE;
                if u.length_squared() <= 1.0 {
                    return Some(*center + u * *radius);
                }
            },
            Shape::Mask(mask) => mask.sample_point(rng),
        }
    }
}

fn parse_numbers(spec: &str) -> Option<Vec<f32>> {
    spec.split(',')
        .map(|s| s.trim().parse::<f32>().ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;
    use crate::io::VolumeStore;

    fn cube_mask() -> Volume {
        // 3x3x3 mask at 1mm, only the center voxel set
        let mut v = Volume::new([3, 3, 3], 1, Vec3::ONE, Vec3::ZERO);
        v.set(1, 1, 1, 0, 1.0);
        v
    }

    fn loader() -> VolumeStore {
        VolumeStore::new().with("center.mask", cube_mask())
    }

    #[test]
    fn sphere_contains_boundary() {
        let roi = Roi::sphere(Role::Include, Vec3::ZERO, 5.0);
        assert!(roi.contains(Vec3::new(5.0, 0.0, 0.0)));
        assert!(roi.contains(Vec3::new(1.0, 0.0, 0.0)));
        assert!(!roi.contains(Vec3::new(5.01, 0.0, 0.0)));
    }

    #[test]
    fn parses_sphere_spec() {
        let roi = Roi::parse(Role::Exclude, " 1, 2 ,3,4.5", &loader(), true).unwrap();
        assert_eq!(roi.role, Role::Exclude);
        assert_eq!(roi.spec(), "1, 2 ,3,4.5");
        match roi.shape {
            Shape::Sphere { center, radius } => {
                assert_eq!(center, Vec3::new(1.0, 2.0, 3.0));
                assert_eq!(radius, 4.5);
            }
            Shape::Mask(_) => panic!("expected sphere"),
        }
    }

    #[test]
    fn rejects_malformed_numeric_specs() {
        let l = loader();
        for spec in ["1,2,3", "1,2,3,4,5", "1,2,3,0", "1,2,3,-1", "1,2,inf,3", ""] {
            let err = Roi::parse(Role::Include, spec, &l, true).unwrap_err();
            assert!(
                matches!(err, Error::InvalidRoi { .. }),
                "spec {spec:?} gave {err:?}"
            );
        }
    }

    #[test]
    fn unknown_mask_path_is_missing_image() {
        let err = Roi::parse(Role::Include, "nowhere.mask", &loader(), true).unwrap_err();
        assert!(matches!(err, Error::MissingImage { .. }));
    }

    #[test]
    fn multi_component_mask_is_rejected() {
        let l = VolumeStore::new().with("vec", Volume::new([2, 2, 2], 3, Vec3::ONE, Vec3::ZERO));
        let err = Roi::parse(Role::Mask, "vec", &l, false).unwrap_err();
        assert!(matches!(err, Error::DimensionMismatch { .. }));
    }

    #[test]
    fn empty_seed_mask_is_rejected() {
        let l = VolumeStore::new().with("empty", Volume::new([2, 2, 2], 1, Vec3::ONE, Vec3::ZERO));
        assert!(Roi::parse(Role::Seed, "empty", &l, false).is_err());
        assert!(Roi::parse(Role::Include, "empty", &l, false).is_ok());
    }

    #[test]
    fn mask_nearest_and_interpolated_containment() {
        let nearest = Roi::parse(Role::Include, "center.mask", &loader(), false).unwrap();
        let interp = Roi::parse(Role::Include, "center.mask", &loader(), true).unwrap();

        assert!(nearest.contains(Vec3::new(1.0, 1.0, 1.0)));
        assert!(interp.contains(Vec3::new(1.0, 1.0, 1.0)));

        // 0.4 voxels off center: nearest still hits, trilinear drops to 0.6
        let p = Vec3::new(1.4, 1.0, 1.0);
        assert!(nearest.contains(p));
        assert!(interp.contains(p));

        // 0.45 along two axes: trilinear weight 0.55 * 0.55 < 0.5
        let q = Vec3::new(1.45, 1.45, 1.0);
        assert!(nearest.contains(q));
        assert!(!interp.contains(q));

        assert!(!nearest.contains(Vec3::new(10.0, 1.0, 1.0)));
    }

    #[test]
    fn sphere_samples_stay_inside() {
        let roi = Roi::sphere(Role::Seed, Vec3::new(10.0, -3.0, 2.0), 2.5);
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..500 {
            let p = roi.sample_point(&mut rng).unwrap();
            assert!(roi.contains(p));
        }
    }

    #[test]
    fn mask_samples_fall_in_set_voxels() {
        let roi = Roi::parse(Role::Seed, "center.mask", &loader(), false).unwrap();
        let mut rng = StdRng::seed_from_u64(5);
        for _ in 0..200 {
            let p = roi.sample_point(&mut rng).unwrap();
            assert!((p - Vec3::ONE).abs().max_element() <= 0.5);
        }
    }

    #[test]
    fn role_roundtrips_through_text() {
        for role in Role::ALL {
            assert_eq!(role.to_string().parse::<Role>().unwrap(), role);
        }
        assert!("bogus".parse::<Role>().is_err());
    }
}
