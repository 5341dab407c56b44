//! Streamline storage.
use glam::Vec3;

use super::Point;

/// An ordered, append-only sequence of points approximating a fiber pathway.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Track {
    points: Vec<Point>,
}

impl Track {
    pub fn new() -> Self {
        Self { points: Vec::new() }
    }

    pub fn with_capacity(n: usize) -> Self {
        Self {
            points: Vec::with_capacity(n),
        }
    }

    /// Number of points in the track.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn push(&mut self, p: Point) {
        self.points.push(p);
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn first(&self) -> Option<Point> {
        self.points.first().copied()
    }

    pub fn last(&self) -> Option<Point> {
        self.points.last().copied()
    }

    /// Reverse the point order in place.
    pub fn reverse(&mut self) {
        self.points.reverse();
    }

    /// Remove all points, keeping the allocation.
    pub fn clear(&mut self) {
        self.points.clear();
    }

    /// Sum of segment lengths in millimeters.
    pub fn path_length(&self) -> f32 {
        self.points
            .windows(2)
            .map(|w| w[0].distance(w[1]))
            .sum()
    }

    pub fn into_points(self) -> Vec<Point> {
        self.points
    }
}

impl From<Vec<Vec3>> for Track {
    fn from(points: Vec<Vec3>) -> Self {
        Self { points }
    }
}

impl FromIterator<Vec3> for Track {
    fn from_iter<I: IntoIterator<Item = Vec3>>(iter: I) -> Self {
        Self {
            points: iter.into_iter().collect(),
        }
    }
}

impl AsRef<[Point]> for Track {
    fn as_ref(&self) -> &[Point] {
        &self.points
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_length_sums_segments() {
        let t: Track = vec![
            Vec3::ZERO,
            Vec3::new(3.0, 4.0, 0.0),
            Vec3::new(3.0, 4.0, 2.0),
        ]
        .into();
        assert_eq!(t.len(), 3);
        assert!((t.path_length() - 7.0).abs() < 1e-6);
    }

    #[test]
    fn empty_and_single_point_tracks_have_zero_length() {
        assert_eq!(Track::new().path_length(), 0.0);
        let t: Track = std::iter::once(Vec3::ONE).collect();
        assert_eq!(t.path_length(), 0.0);
        assert_eq!(t.first(), Some(Vec3::ONE));
        assert_eq!(t.last(), Some(Vec3::ONE));
    }

    #[test]
    fn reverse_flips_order() {
        let mut t: Track = (0..4).map(|i| Vec3::splat(i as f32)).collect();
        t.reverse();
        assert_eq!(t.first(), Some(Vec3::splat(3.0)));
        assert_eq!(t.last(), Some(Vec3::ZERO));
    }
}
