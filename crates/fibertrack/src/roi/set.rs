//! Per-role ROI collections and the track acceptance algorithm.
//!
//! The same [`RoiSet`] drives generation (seeding, stop masks, optional early
//! inclusion/exclusion stops) and offline filtering ([`crate::filter`]). Acceptance keeps
//! one transient flag per include region, so each thread owns its own set; cloning is
//! cheap because mask images are shared.
use rand::Rng as RngCore;

use crate::error::{Error, Result};
use crate::geometry::{rand_index, Point};
use crate::roi::{Role, Roi};

#[derive(Clone, Debug, Default)]
pub struct RoiSet {
    seed: Vec<Roi>,
    include: Vec<Roi>,
    exclude: Vec<Roi>,
    mask: Vec<Roi>,
    included: Vec<bool>,
}

impl RoiSet {
    /// Creates a new, empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a set from ROIs of any role.
    pub fn from_rois(rois: impl IntoIterator<Item = Roi>) -> Self {
        let mut set = Self::new();
        for roi in rois {
            set.add(roi);
        }
        set
    }

    /// Add an ROI to the collection for its role.
    pub fn add(&mut self, roi: Roi) {
        match roi.role {
            Role::Seed => self.seed.push(roi),
            Role::Include => {
                self.include.push(roi);
                self.included.push(false);
            }
            Role::Exclude => self.exclude.push(roi),
            Role::Mask => self.mask.push(roi),
        }
    }

    pub fn with_roi(mut self, roi: Roi) -> Self {
        self.add(roi);
        self
    }

    /// ROIs registered for `role`.
    pub fn get(&self, role: Role) -> &[Roi] {
        match role {
            Role::Seed => &self.seed,
            Role::Include => &self.include,
            Role::Exclude => &self.exclude,
            Role::Mask => &self.mask,
        }
    }

    /// Remove every ROI of `role`.
    pub fn clear_role(&mut self, role: Role) {
        match role {
            Role::Seed => self.seed.clear(),
            Role::Include => {
                self.include.clear();
                self.included.clear();
            }
            Role::Exclude => self.exclude.clear(),
            Role::Mask => self.mask.clear(),
        }
    }

    /// All ROIs in role order.
    pub fn iter(&self) -> impl Iterator<Item = &Roi> {
        self.seed
            .iter()
            .chain(&self.include)
            .chain(&self.exclude)
            .chain(&self.mask)
    }

    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }

    /// Generation needs somewhere to start.
    pub fn validate_for_generation(&self) -> Result<()> {
        if self.seed.is_empty() {
            return Err(Error::InvalidConfig("no seed region specified".into()));
        }
        Ok(())
    }

    /// Whether the track passes every include/exclude region.
    ///
    /// Points are scanned in order; the first point inside any exclude region rejects
    /// the track without looking further. Otherwise the track is accepted iff every
    /// include region contains at least one point. With no include or exclude regions
    /// every track is accepted.
    pub fn accept_track(&mut self, points: &[Point]) -> bool {
        self.reset_included();
        for &p in points {
            if self.excludes(p) {
                return false;
            }
            self.mark_included(p);
        }
        self.all_included()
    }

    /// Whether `p` lies in any exclude region.
    #[inline]
    pub fn excludes(&self, p: Point) -> bool {
        self.exclude.iter().any(|roi| roi.contains(p))
    }

    pub fn reset_included(&mut self) {
        self.included.fill(false);
    }

    /// Flag every include region containing `p`.
    pub fn mark_included(&mut self, p: Point) {
        for (flag, roi) in self.included.iter_mut().zip(&self.include) {
            if !*flag && roi.contains(p) {
                *flag = true;
            }
        }
    }

    /// Whether every include region has been flagged since the last reset.
    #[inline]
    pub fn all_included(&self) -> bool {
        self.included.iter().all(|&f| f)
    }

    /// Whether `p` lies inside every stop mask. True when no masks are configured.
    #[inline]
    pub fn within_masks(&self, p: Point) -> bool {
        self.mask.iter().all(|roi| roi.contains(p))
    }

    /// Draw a seed point from a uniformly chosen seed region.
    pub fn sample_seed(&self, rng: &mut dyn RngCore) -> Option<Point> {
        if self.seed.is_empty() {
            return None;
        }
        self.seed[rand_index(rng, self.seed.len())].sample_point(rng)
    }
}
