//! Single-streamline propagation.
//!
//! A [`Tracker`] owns one field cursor, one [`RoiSet`] and the points of the track
//! being grown. Each attempt goes `Seeding → Propagating → Terminated`; the caller
//! drives it with [`Tracker::new_seed`] and [`Tracker::step`], or runs a whole
//! attempt (reseeding, both growth directions, acceptance) with
//! [`Tracker::generate`].
use glam::Vec3;
use rand::Rng as RngCore;

use crate::error::Result;
use crate::field::FieldSampler;
use crate::geometry::{random_unit_vector, Point, Track};
use crate::roi::{Role, RoiSet};
use crate::tracking::TrackerConfig;

/// Why propagation of the current pass stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Termination {
    /// The field reported no data at the current position.
    OutOfBounds,
    /// The next position lies outside a stop mask.
    OutOfMask,
    /// Amplitude fell below the cutoff.
    LowAmplitude,
    /// The turn to the new direction was too sharp.
    Curvature,
    /// The track reached its maximum length.
    MaxLength,
    /// The last point entered an exclude region.
    Excluded,
    /// Every include region has been visited and early stopping is enabled.
    Included,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TrackerState {
    Seeding,
    Propagating,
    Terminated(Termination),
}

/// Why an attempt produced no track.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Rejection {
    /// No seed above the initial cutoff was found. The engine does not count these
    /// as attempts.
    NoSeed,
    /// The track entered an exclude region.
    Excluded,
    /// The track missed at least one include region.
    NotIncluded,
    /// The track was not longer than the minimum length.
    TooShort,
}

/// Outcome of one generation attempt.
#[derive(Clone, Debug, PartialEq)]
pub enum Attempt {
    Accepted(Track),
    Rejected(Rejection),
}

impl Attempt {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Attempt::Accepted(_))
    }
}

pub struct Tracker<S: FieldSampler> {
    sampler: S,
    rois: RoiSet,
    config: TrackerConfig,
    min_dp: f32,
    min_size: usize,
    max_steps: usize,
    state: TrackerState,
    position: Point,
    direction: Vec3,
    seed_position: Point,
    seed_direction: Vec3,
    steps: usize,
    points: Track,
}

impl<S: FieldSampler> Tracker<S> {
    /// Create a tracker, validating the configuration and seed regions.
    pub fn new(sampler: S, rois: RoiSet, config: TrackerConfig) -> Result<Self> {
        config.validate()?;
        rois.validate_for_generation()?;
        Ok(Self {
            sampler,
            rois,
            min_dp: config.min_dp(),
            min_size: config.min_size(),
            max_steps: config.max_steps(),
            config,
            state: TrackerState::Seeding,
            position: Vec3::ZERO,
            direction: Vec3::ZERO,
            seed_position: Vec3::ZERO,
            seed_direction: Vec3::ZERO,
            steps: 0,
            points: Track::new(),
        })
    }

    pub fn state(&self) -> TrackerState {
        self.state
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    pub fn position(&self) -> Point {
        self.position
    }

    pub fn direction(&self) -> Vec3 {
        self.direction
    }

    /// Points accumulated by the current attempt.
    pub fn points(&self) -> &[Point] {
        self.points.points()
    }

    /// Start a new track from a seed drawn from the seed regions.
    ///
    /// Without `preferred` the initial direction is drawn isotropically. The seed is
    /// kept only if the field amplitude there exceeds the initial cutoff and, with a
    /// preferred direction, the field direction is within `tolerance` radians of it
    /// (either sign). Returns `false` when the caller should draw again.
    pub fn new_seed(
        &mut self,
        preferred: Option<Vec3>,
        tolerance: f32,
        rng: &mut dyn RngCore,
    ) -> bool {
        self.state = TrackerState::Seeding;
        self.points.clear();
        self.steps = 0;
        self.rois.reset_included();

        let Some(seed) = self.rois.sample_seed(rng) else {
            return false;
        };
        let preferred = preferred.and_then(Vec3::try_normalize);
        let hint = preferred.unwrap_or_else(|| random_unit_vector(rng));

        let sample = self
            .sampler
            .sample(seed, hint, self.config.precomputed, rng);
        if !(sample.amplitude > self.config.init_threshold) {
            return false;
        }
        let Some(direction) = sample.direction.try_normalize() else {
            return false;
        };
        if let Some(p) = preferred {
            if direction.dot(p).abs() < tolerance.cos() {
                return false;
            }
        }

        self.position = seed;
        self.direction = direction;
        self.seed_position = seed;
        self.seed_direction = direction;
        self.state = TrackerState::Propagating;
        self.points.push(seed);
        self.record(seed);
        true
    }

    /// Advance by one step. Returns `true` while propagation continues.
    ///
    /// On termination the rejected position is not appended.
    pub fn step(&mut self, rng: &mut dyn RngCore) -> bool {
        if self.state != TrackerState::Propagating {
            return false;
        }
        if self.steps >= self.max_steps {
            return self.terminate(Termination::MaxLength);
        }

        let sample = self
            .sampler
            .sample(self.position, self.direction, self.config.precomputed, rng);
        if !sample.amplitude.is_finite() {
            return self.terminate(Termination::OutOfBounds);
        }
        if sample.amplitude < self.config.threshold {
            return self.terminate(Termination::LowAmplitude);
        }
        let Some(direction) = sample.direction.try_normalize() else {
            return self.terminate(Termination::LowAmplitude);
        };
        if direction.dot(self.direction) < self.min_dp {
            return self.terminate(Termination::Curvature);
        }

        let next = self.position + direction * self.config.step_size;
        if !self.rois.within_masks(next) {
            return self.terminate(Termination::OutOfMask);
        }

        self.position = next;
        self.direction = direction;
        self.steps += 1;
        self.points.push(next);
        self.record(next)
    }

    fn record(&mut self, p: Point) -> bool {
        if self.rois.excludes(p) {
            return self.terminate(Termination::Excluded);
        }
        if self.config.stop_when_included && !self.rois.get(Role::Include).is_empty() {
            self.rois.mark_included(p);
            if self.rois.all_included() {
                return self.terminate(Termination::Included);
            }
        }
        true
    }

    fn terminate(&mut self, reason: Termination) -> bool {
        self.state = TrackerState::Terminated(reason);
        false
    }

    /// Step until the current pass terminates.
    pub fn propagate(&mut self, rng: &mut dyn RngCore) -> Termination {
        while self.step(rng) {}
        match self.state {
            TrackerState::Terminated(reason) => reason,
            // step() only returns false once terminated or before seeding
            _ => Termination::OutOfBounds,
        }
    }

    /// Whether any accumulated point lies in an exclude region.
    pub fn track_excluded(&self) -> bool {
        self.points.points().iter().any(|&p| self.rois.excludes(p))
    }

    /// Whether every include region contains an accumulated point.
    pub fn track_included(&mut self) -> bool {
        self.rois.reset_included();
        for &p in self.points.points() {
            self.rois.mark_included(p);
        }
        self.rois.all_included()
    }

    /// Restart from the seed in the opposite direction, keeping the points so far.
    ///
    /// The point list is reversed so the seed is last; the second pass then appends
    /// after it and the seed appears exactly once in the joined track.
    fn reverse_from_seed(&mut self) {
        self.points.reverse();
        self.position = self.seed_position;
        self.direction = -self.seed_direction;
        self.state = TrackerState::Propagating;
    }

    /// Run one complete attempt.
    pub fn generate(&mut self, rng: &mut dyn RngCore) -> Attempt {
        let preferred = self.config.init_direction;
        let tolerance = self.config.init_tolerance;
        let mut seeded = false;
        for _ in 0..self.config.max_seed_trials {
            if self.new_seed(preferred, tolerance, rng) {
                seeded = true;
                break;
            }
        }
        if !seeded {
            return Attempt::Rejected(Rejection::NoSeed);
        }

        let mut end = self.propagate(rng);
        if end == Termination::Excluded {
            return Attempt::Rejected(Rejection::Excluded);
        }
        if !self.config.unidirectional && end != Termination::Included {
            self.reverse_from_seed();
            end = self.propagate(rng);
            if end == Termination::Excluded {
                return Attempt::Rejected(Rejection::Excluded);
            }
        }

        if self.points.len() <= self.min_size {
            return Attempt::Rejected(Rejection::TooShort);
        }
        if !self.rois.accept_track(self.points.points()) {
            return Attempt::Rejected(Rejection::NotIncluded);
        }
        self.state = TrackerState::Seeding;
        Attempt::Accepted(std::mem::take(&mut self.points))
    }
}

impl<S: FieldSampler> std::fmt::Debug for Tracker<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tracker")
            .field("state", &self.state)
            .field("position", &self.position)
            .field("direction", &self.direction)
            .field("points", &self.points.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;
    use crate::field::FieldSample;
    use crate::roi::Roi;

    /// Field along ±x inside |x| <= half, no data outside.
    fn line_field(half: f32) -> impl FnMut(Point, Vec3) -> FieldSample {
        move |p: Point, d: Vec3| {
            if p.x.abs() > half {
                return FieldSample::outside();
            }
            let dir = if d.dot(Vec3::X) >= 0.0 { Vec3::X } else { -Vec3::X };
            FieldSample::new(dir, 1.0)
        }
    }

    fn seed_at_origin() -> RoiSet {
        RoiSet::new().with_roi(Roi::sphere(Role::Seed, Vec3::ZERO, 1e-3))
    }

    fn unit_steps() -> TrackerConfig {
        TrackerConfig::new(1.0)
            .with_min_curvature_radius(0.0)
            .with_min_dist(0.0)
            .with_max_dist(100.0)
            .with_thresholds(0.1, 0.2)
    }

    fn accepted(attempt: Attempt) -> Track {
        match attempt {
            Attempt::Accepted(t) => t,
            Attempt::Rejected(r) => panic!("expected a track, rejected: {r:?}"),
        }
    }

    #[test]
    fn requires_seed_regions_and_valid_config() {
        assert!(Tracker::new(line_field(10.0), RoiSet::new(), unit_steps()).is_err());
        assert!(Tracker::new(line_field(10.0), seed_at_origin(), TrackerConfig::new(-1.0)).is_err());
    }

    #[test]
    fn bidirectional_halves_join_at_seed_once() {
        let mut tracker = Tracker::new(line_field(10.5), seed_at_origin(), unit_steps()).unwrap();
        let mut rng = StdRng::seed_from_u64(3);
        let track = accepted(tracker.generate(&mut rng));

        assert_eq!(track.len(), 23);
        let seeds = track.points().iter().filter(|p| p.length() < 0.01).count();
        assert_eq!(seeds, 1);
        assert!(track.points()[11].length() < 0.01);
        for w in track.points().windows(2) {
            assert!((w[0].distance(w[1]) - 1.0).abs() < 1e-4);
        }
        // Monotonic along x: the halves run in one continuous sense.
        let first = track.first().unwrap().x;
        let last = track.last().unwrap().x;
        assert!((first.abs() - 11.0).abs() < 0.01 && (last.abs() - 11.0).abs() < 0.01);
        assert!(first.signum() != last.signum());
    }

    #[test]
    fn unidirectional_grows_one_side() {
        let config = unit_steps().with_unidirectional(true);
        let mut tracker = Tracker::new(line_field(10.5), seed_at_origin(), config).unwrap();
        let mut rng = StdRng::seed_from_u64(4);
        let track = accepted(tracker.generate(&mut rng));
        assert_eq!(track.len(), 12);
        assert!(track.first().unwrap().length() < 0.01);
    }

    #[test]
    fn leaving_the_data_terminates_out_of_bounds() {
        let mut tracker = Tracker::new(line_field(2.5), seed_at_origin(), unit_steps()).unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        assert!(tracker.new_seed(Some(Vec3::X), 0.1, &mut rng));
        assert_eq!(tracker.propagate(&mut rng), Termination::OutOfBounds);
        assert_eq!(tracker.points().len(), 4);
    }

    #[test]
    fn sharp_turn_terminates_on_curvature() {
        let field = |p: Point, _d: Vec3| {
            let dir = if p.x < 2.5 { Vec3::X } else { Vec3::Y };
            FieldSample::new(dir, 1.0)
        };
        let config = unit_steps().with_min_curvature_radius(1.0);
        let mut tracker = Tracker::new(field, seed_at_origin(), config).unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        assert!(tracker.new_seed(Some(Vec3::X), 0.1, &mut rng));
        assert_eq!(tracker.propagate(&mut rng), Termination::Curvature);
        assert_eq!(tracker.state(), TrackerState::Terminated(Termination::Curvature));
        assert_eq!(tracker.points().len(), 4);
    }

    #[test]
    fn gentle_turn_is_within_curvature_limit() {
        // 0.4 rad per step against a limit of 0.5 rad
        let field = |p: Point, d: Vec3| {
            let angle: f32 = if p.x < 0.5 { 0.0 } else { 0.4 };
            let dir = Vec3::new(angle.cos(), angle.sin(), 0.0);
            FieldSample::new(if dir.dot(d) < 0.0 { -dir } else { dir }, 1.0)
        };
        let config = unit_steps()
            .with_min_curvature_radius(1.0)
            .with_max_dist(3.0)
            .with_unidirectional(true);
        let mut tracker = Tracker::new(field, seed_at_origin(), config).unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        assert!(tracker.new_seed(Some(Vec3::X), 0.1, &mut rng));
        assert_eq!(tracker.propagate(&mut rng), Termination::MaxLength);
    }

    #[test]
    fn low_amplitude_terminates() {
        let field = |p: Point, _d: Vec3| FieldSample::new(Vec3::X, if p.x < 3.5 { 1.0 } else { 0.05 });
        let mut tracker = Tracker::new(field, seed_at_origin(), unit_steps()).unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        assert!(tracker.new_seed(Some(Vec3::X), 0.1, &mut rng));
        assert_eq!(tracker.propagate(&mut rng), Termination::LowAmplitude);
        assert_eq!(tracker.points().len(), 5);
    }

    #[test]
    fn max_length_caps_steps() {
        let config = unit_steps().with_max_dist(5.0).with_unidirectional(true);
        let mut tracker = Tracker::new(line_field(100.0), seed_at_origin(), config).unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        let track = accepted(tracker.generate(&mut rng));
        assert_eq!(track.len(), 6);
        assert!(track.path_length() <= 5.0 + 1e-4);
    }

    #[test]
    fn stop_mask_keeps_track_inside() {
        let rois = seed_at_origin().with_roi(Roi::sphere(Role::Mask, Vec3::ZERO, 3.5));
        let mut tracker = Tracker::new(line_field(100.0), rois, unit_steps()).unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        assert!(tracker.new_seed(Some(Vec3::X), 0.1, &mut rng));
        assert_eq!(tracker.propagate(&mut rng), Termination::OutOfMask);
        assert_eq!(tracker.points().len(), 4);
        assert!(tracker.points().iter().all(|p| p.length() <= 3.5));
    }

    #[test]
    fn weak_seed_is_rejected() {
        let field = |_p: Point, _d: Vec3| FieldSample::new(Vec3::X, 0.15);
        let config = unit_steps().with_max_seed_trials(10);
        let mut tracker = Tracker::new(field, seed_at_origin(), config).unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        assert!(!tracker.new_seed(None, 0.0, &mut rng));
        assert_eq!(tracker.state(), TrackerState::Seeding);
        assert_eq!(tracker.generate(&mut rng), Attempt::Rejected(Rejection::NoSeed));
    }

    #[test]
    fn preferred_direction_tolerance_is_sign_insensitive() {
        let mut tracker = Tracker::new(line_field(10.0), seed_at_origin(), unit_steps()).unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        assert!(!tracker.new_seed(Some(Vec3::Z), 0.1, &mut rng));
        assert!(tracker.new_seed(Some(-Vec3::X), 0.1, &mut rng));
        assert_eq!(tracker.direction(), -Vec3::X);
        assert!(tracker.new_seed(Some(Vec3::new(1.0, 0.05, 0.0)), 0.1, &mut rng));
    }

    #[test]
    fn exclusion_stops_and_rejects() {
        let rois = seed_at_origin().with_roi(Roi::sphere(Role::Exclude, Vec3::new(5.0, 0.0, 0.0), 0.5));
        let config = unit_steps().with_init_direction(Vec3::X, 0.1);
        let mut tracker = Tracker::new(line_field(100.0), rois, config).unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(tracker.generate(&mut rng), Attempt::Rejected(Rejection::Excluded));
        assert_eq!(tracker.state(), TrackerState::Terminated(Termination::Excluded));
        assert_eq!(tracker.points().len(), 6);
        assert!(tracker.track_excluded());
    }

    #[test]
    fn missing_include_rejects() {
        let rois = seed_at_origin().with_roi(Roi::sphere(Role::Include, Vec3::new(0.0, 5.0, 0.0), 0.5));
        let mut tracker = Tracker::new(line_field(10.5), rois, unit_steps()).unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(tracker.generate(&mut rng), Attempt::Rejected(Rejection::NotIncluded));
        assert!(!tracker.track_included());
    }

    #[test]
    fn stop_when_included_halts_both_passes() {
        let rois = seed_at_origin().with_roi(Roi::sphere(Role::Include, Vec3::new(3.0, 0.0, 0.0), 0.5));
        let config = unit_steps()
            .with_init_direction(Vec3::X, 0.1)
            .with_stop_when_included(true);
        let mut tracker = Tracker::new(line_field(100.0), rois, config).unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        let track = accepted(tracker.generate(&mut rng));
        assert_eq!(track.len(), 4);
        assert!(track.last().unwrap().distance(Vec3::new(3.0, 0.0, 0.0)) < 0.01);
    }

    #[test]
    fn inclusion_carries_from_forward_to_backward_pass() {
        let rois = seed_at_origin()
            .with_roi(Roi::sphere(Role::Include, Vec3::new(3.0, 0.0, 0.0), 0.5))
            .with_roi(Roi::sphere(Role::Include, Vec3::new(-3.0, 0.0, 0.0), 0.5));
        let config = unit_steps()
            .with_init_direction(Vec3::X, 0.1)
            .with_stop_when_included(true);
        let mut tracker = Tracker::new(line_field(10.5), rois, config).unwrap();
        let mut rng = StdRng::seed_from_u64(2);
        let track = accepted(tracker.generate(&mut rng));

        // Forward runs to the edge of the data, backward stops at the second region.
        assert_eq!(track.len(), 15);
        assert!((track.first().unwrap().x - 11.0).abs() < 0.01);
        assert!(track.last().unwrap().distance(Vec3::new(-3.0, 0.0, 0.0)) < 0.01);
    }

    #[test]
    fn short_tracks_are_rejected() {
        let config = unit_steps().with_min_dist(23.0);
        let mut tracker = Tracker::new(line_field(10.5), seed_at_origin(), config).unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        // 23 points is not more than round(23 / 1)
        assert_eq!(tracker.generate(&mut rng), Attempt::Rejected(Rejection::TooShort));

        let config = unit_steps().with_min_dist(22.0);
        let mut tracker = Tracker::new(line_field(10.5), seed_at_origin(), config).unwrap();
        assert!(tracker.generate(&mut rng).is_accepted());
    }

    #[test]
    fn same_seed_same_track() {
        let make = || Tracker::new(line_field(10.5), seed_at_origin(), unit_steps()).unwrap();
        let a = make().generate(&mut StdRng::seed_from_u64(77));
        let b = make().generate(&mut StdRng::seed_from_u64(77));
        assert_eq!(a, b);
    }
}
