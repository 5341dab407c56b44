//! Voxel raster storage with a world-space transform.
//!
//! A [`Volume`] stores `components` values per voxel over a regular 3-D grid. Voxel
//! `(0, 0, 0)` is centered at `origin`; neighbouring voxel centers are `voxel_size`
//! apart along each axis. Data are laid out x-fastest with components innermost.
use glam::Vec3;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Volume {
    dims: [usize; 3],
    components: usize,
    voxel_size: Vec3,
    origin: Vec3,
    data: Vec<f32>,
}

/// Number of stored values, `None` on overflow.
fn value_count(dims: [usize; 3], components: usize) -> Option<usize> {
    dims.iter().try_fold(components, |n, &d| n.checked_mul(d))
}

impl Volume {
    /// Create a zero-filled volume.
    ///
    /// # Panics
    ///
    /// Panics if the number of values does not fit in memory.
    pub fn new(dims: [usize; 3], components: usize, voxel_size: Vec3, origin: Vec3) -> Self {
        let len = value_count(dims, components).unwrap_or(usize::MAX);
        Self {
            dims,
            components,
            voxel_size,
            origin,
            data: vec![0.0; len],
        }
    }

    /// Create a volume from existing data, checking the layout.
    pub fn from_data(
        dims: [usize; 3],
        components: usize,
        voxel_size: Vec3,
        origin: Vec3,
        data: Vec<f32>,
    ) -> Result<Self> {
        let volume = Self {
            dims,
            components,
            voxel_size,
            origin,
            data,
        };
        volume.validate()?;
        Ok(volume)
    }

    /// Check that the data length matches the grid and the voxel size is positive.
    pub fn validate(&self) -> Result<()> {
        if self.components == 0 {
            return Err(Error::InvalidConfig(
                "volume must have at least one component".into(),
            ));
        }
        let Some(expected) = value_count(self.dims, self.components) else {
            return Err(Error::DimensionMismatch {
                expected: format!(
                    "a grid of at most {} values ({}x{}x{}x{})",
                    usize::MAX,
                    self.dims[0],
                    self.dims[1],
                    self.dims[2],
                    self.components
                ),
                found: format!("{} values", self.data.len()),
            });
        };
        if self.data.len() != expected {
            return Err(Error::DimensionMismatch {
                expected: format!(
                    "{} values ({}x{}x{}x{})",
                    expected, self.dims[0], self.dims[1], self.dims[2], self.components
                ),
                found: format!("{} values", self.data.len()),
            });
        }
        if !(self.voxel_size.min_element() > 0.0) || !self.voxel_size.is_finite() {
            return Err(Error::InvalidConfig(format!(
                "voxel size must be finite and > 0, got {:?}",
                self.voxel_size
            )));
        }
        Ok(())
    }

    pub fn dims(&self) -> [usize; 3] {
        self.dims
    }

    pub fn components(&self) -> usize {
        self.components
    }

    pub fn voxel_size(&self) -> Vec3 {
        self.voxel_size
    }

    /// Smallest voxel edge in millimeters.
    pub fn min_voxel_size(&self) -> f32 {
        self.voxel_size.min_element()
    }

    pub fn origin(&self) -> Vec3 {
        self.origin
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn voxel_count(&self) -> usize {
        self.dims[0] * self.dims[1] * self.dims[2]
    }

    #[inline]
    fn offset(&self, ix: isize, iy: isize, iz: isize) -> Option<usize> {
        let [nx, ny, nz] = self.dims;
        if ix < 0 || iy < 0 || iz < 0 {
            return None;
        }
        let (x, y, z) = (ix as usize, iy as usize, iz as usize);
        if x >= nx || y >= ny || z >= nz {
            return None;
        }
        Some(((z * ny + y) * nx + x) * self.components)
    }

    /// All components of a voxel, or `None` out of bounds.
    pub fn voxel(&self, ix: isize, iy: isize, iz: isize) -> Option<&[f32]> {
        self.offset(ix, iy, iz)
            .map(|o| &self.data[o..o + self.components])
    }

    /// A single value, or `None` out of bounds.
    pub fn get(&self, ix: isize, iy: isize, iz: isize, component: usize) -> Option<f32> {
        if component >= self.components {
            return None;
        }
        self.offset(ix, iy, iz).map(|o| self.data[o + component])
    }

    /// Set a single value. Returns `false` if the index is out of bounds.
    pub fn set(&mut self, ix: isize, iy: isize, iz: isize, component: usize, value: f32) -> bool {
        if component >= self.components {
            return false;
        }
        match self.offset(ix, iy, iz) {
            Some(o) => {
                self.data[o + component] = value;
                true
            }
            None => false,
        }
    }

    /// Continuous voxel coordinates of a world position.
    #[inline]
    pub fn world_to_voxel(&self, p: Vec3) -> Vec3 {
        (p - self.origin) / self.voxel_size
    }

    /// World position of a voxel center.
    #[inline]
    pub fn voxel_to_world(&self, ix: isize, iy: isize, iz: isize) -> Vec3 {
        self.origin + Vec3::new(ix as f32, iy as f32, iz as f32) * self.voxel_size
    }

    /// Whether a world position lies within the half-voxel border of the grid.
    pub fn contains_world(&self, p: Vec3) -> bool {
        let v = self.world_to_voxel(p);
        v.is_finite()
            && (0..3).all(|axis| v[axis] >= -0.5 && v[axis] < self.dims[axis] as f32 - 0.5)
    }

    /// Linear index of the voxel nearest to `p`, or `None` outside the grid.
    pub fn nearest_index(&self, p: Vec3) -> Option<usize> {
        if !self.contains_world(p) {
            return None;
        }
        let v = self.world_to_voxel(p).round();
        self.offset(v.x as isize, v.y as isize, v.z as isize)
            .map(|o| o / self.components)
    }

    /// Components of the voxel nearest to `p`, or `None` outside the grid.
    pub fn sample_nearest(&self, p: Vec3) -> Option<&[f32]> {
        self.nearest_index(p).map(|i| {
            let o = i * self.components;
            &self.data[o..o + self.components]
        })
    }

    /// Data offsets and weights of the eight voxels surrounding `p`.
    ///
    /// Returns `None` outside the grid. Neighbours past the last voxel are clamped to
    /// the edge, so offsets may repeat.
    pub fn trilinear_neighbours(&self, p: Vec3) -> Option<[(usize, f32); 8]> {
        if !self.contains_world(p) {
            return None;
        }
        let [nx, ny, nz] = self.dims;
        let v = self.world_to_voxel(p);
        let x = v.x.clamp(0.0, (nx - 1) as f32);
        let y = v.y.clamp(0.0, (ny - 1) as f32);
        let z = v.z.clamp(0.0, (nz - 1) as f32);

        let x0 = x.floor() as usize;
        let y0 = y.floor() as usize;
        let z0 = z.floor() as usize;
        let x1 = (x0 + 1).min(nx - 1);
        let y1 = (y0 + 1).min(ny - 1);
        let z1 = (z0 + 1).min(nz - 1);

        let xd = x - x0 as f32;
        let yd = y - y0 as f32;
        let zd = z - z0 as f32;

        let c = self.components;
        let idx = |i: usize, j: usize, k: usize| ((k * ny + j) * nx + i) * c;
        Some([
            (idx(x0, y0, z0), (1.0 - xd) * (1.0 - yd) * (1.0 - zd)),
            (idx(x1, y0, z0), xd * (1.0 - yd) * (1.0 - zd)),
            (idx(x0, y1, z0), (1.0 - xd) * yd * (1.0 - zd)),
            (idx(x1, y1, z0), xd * yd * (1.0 - zd)),
            (idx(x0, y0, z1), (1.0 - xd) * (1.0 - yd) * zd),
            (idx(x1, y0, z1), xd * (1.0 - yd) * zd),
            (idx(x0, y1, z1), (1.0 - xd) * yd * zd),
            (idx(x1, y1, z1), xd * yd * zd),
        ])
    }

    /// Trilinear interpolation of every component into `out`.
    ///
    /// Returns `false` (leaving `out` untouched) outside the grid.
    pub fn sample_trilinear(&self, p: Vec3, out: &mut [f32]) -> bool {
        debug_assert_eq!(out.len(), self.components);
        let Some(corners) = self.trilinear_neighbours(p) else {
            return false;
        };
        out.fill(0.0);
        for (base, w) in corners {
            if w == 0.0 {
                continue;
            }
            for (k, o) in out.iter_mut().enumerate() {
                *o += w * self.data[base + k];
            }
        }
        true
    }

    /// Scalar convenience for single-component volumes.
    pub fn sample_scalar(&self, p: Vec3, interpolate: bool) -> Option<f32> {
        if interpolate {
            let mut out = [0.0f32; 1];
            self.sample_trilinear(p, &mut out).then_some(out[0])
        } else {
            self.sample_nearest(p).map(|v| v[0])
        }
    }
}
