//! Track file metadata carried from source to output.
//!
//! [`Properties`] holds free-form key/value pairs, the ROI specifications a track set
//! was generated or filtered with, and comment lines.
use std::collections::BTreeMap;
use std::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::roi::{Role, RoiSet};

/// Key holding the number of tracks written.
pub const COUNT_KEY: &str = "count";
/// Key holding the number of attempts (generation) or tracks read (filtering).
pub const TOTAL_COUNT_KEY: &str = "total_count";

#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Properties {
    entries: BTreeMap<String, String>,
    rois: Vec<(Role, String)>,
    comments: Vec<String>,
}

impl Properties {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl ToString) {
        self.entries.insert(key.into(), value.to_string());
    }

    pub fn with(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.set(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Parse a value, returning `None` if missing or unparsable.
    pub fn get_parsed<T: FromStr>(&self, key: &str) -> Option<T> {
        self.get(key).and_then(|v| v.trim().parse().ok())
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.entries.remove(key)
    }

    /// Key/value pairs in key order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn rois(&self) -> &[(Role, String)] {
        &self.rois
    }

    pub fn add_roi(&mut self, role: Role, spec: impl Into<String>) {
        self.rois.push((role, spec.into()));
    }

    /// Replace the recorded ROIs of `role` with `specs`.
    pub fn replace_rois<I, S>(&mut self, role: Role, specs: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rois.retain(|(r, _)| *r != role);
        self.rois.extend(specs.into_iter().map(|s| (role, s.into())));
    }

    /// Replace the recorded ROIs of each role in `roles` with those of `set`.
    pub fn record_rois(&mut self, set: &RoiSet, roles: &[Role]) {
        for &role in roles {
            self.replace_rois(role, set.get(role).iter().map(|roi| roi.spec().to_owned()));
        }
    }

    pub fn comments(&self) -> &[String] {
        &self.comments
    }

    pub fn add_comment(&mut self, comment: impl Into<String>) {
        self.comments.push(comment.into());
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;
    use crate::roi::Roi;

    #[test]
    fn parsed_values() {
        let p = Properties::new().with(COUNT_KEY, 42).with("step", "0.5");
        assert_eq!(p.get_parsed::<usize>(COUNT_KEY), Some(42));
        assert_eq!(p.get_parsed::<f32>("step"), Some(0.5));
        assert_eq!(p.get_parsed::<usize>("step"), None);
        assert_eq!(p.get_parsed::<usize>("missing"), None);
    }

    #[test]
    fn replace_rois_only_touches_one_role() {
        let mut p = Properties::new();
        p.add_roi(Role::Seed, "0,0,0,1");
        p.add_roi(Role::Include, "old.mask");
        p.add_roi(Role::Exclude, "5,5,5,1");
        p.replace_rois(Role::Include, ["1,1,1,2", "2,2,2,2"]);

        let includes: Vec<_> = p
            .rois()
            .iter()
            .filter(|(r, _)| *r == Role::Include)
            .map(|(_, s)| s.as_str())
            .collect();
        assert_eq!(includes, ["1,1,1,2", "2,2,2,2"]);
        assert_eq!(p.rois().len(), 4);
    }

    #[test]
    fn record_rois_copies_specs_from_set() {
        let set = RoiSet::new()
            .with_roi(Roi::sphere(Role::Include, Vec3::ZERO, 5.0))
            .with_roi(Roi::sphere(Role::Seed, Vec3::ONE, 1.0));
        let mut p = Properties::new();
        p.add_roi(Role::Include, "stale");
        p.record_rois(&set, &[Role::Include, Role::Exclude]);
        assert_eq!(p.rois(), &[(Role::Include, "0,0,0,5".to_owned())]);
    }
}
