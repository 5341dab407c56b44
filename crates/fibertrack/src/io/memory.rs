//! In-memory track storage.
use std::collections::VecDeque;

use crate::error::Result;
use crate::geometry::Track;
use crate::io::{TrackReader, TrackWriter};
use crate::properties::Properties;

/// Reader over tracks held in memory.
#[derive(Debug, Default)]
pub struct VecTrackReader {
    properties: Properties,
    tracks: VecDeque<Track>,
}

impl VecTrackReader {
    pub fn new(properties: Properties, tracks: impl IntoIterator<Item = Track>) -> Self {
        Self {
            properties,
            tracks: tracks.into_iter().collect(),
        }
    }
}

impl TrackReader for VecTrackReader {
    fn properties(&self) -> &Properties {
        &self.properties
    }

    fn next_track(&mut self) -> Result<Option<Track>> {
        Ok(self.tracks.pop_front())
    }
}

/// Writer that collects tracks in a `Vec`.
#[derive(Debug, Default)]
pub struct VecTrackWriter {
    tracks: Vec<Track>,
    counts: Option<(usize, usize)>,
}

impl VecTrackWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn into_tracks(self) -> Vec<Track> {
        self.tracks
    }

    /// `(count, total_count)` passed to `finalize`, if it has been called.
    pub fn final_counts(&self) -> Option<(usize, usize)> {
        self.counts
    }

    pub fn is_finalized(&self) -> bool {
        self.counts.is_some()
    }
}

impl TrackWriter for VecTrackWriter {
    fn append(&mut self, track: &Track) -> Result<()> {
        self.tracks.push(track.clone());
        Ok(())
    }

    fn finalize(&mut self, count: usize, total_count: usize) -> Result<()> {
        self.counts = Some((count, total_count));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;

    #[test]
    fn reader_yields_in_order_then_none() {
        let a: Track = vec![Vec3::ZERO].into();
        let b: Track = vec![Vec3::ONE, Vec3::X].into();
        let mut r = VecTrackReader::new(Properties::new(), [a.clone(), b.clone()]);
        assert_eq!(r.next_track().unwrap(), Some(a));
        assert_eq!(r.next_track().unwrap(), Some(b));
        assert_eq!(r.next_track().unwrap(), None);
        assert_eq!(r.next_track().unwrap(), None);
    }

    #[test]
    fn writer_records_final_counts() {
        let mut w = VecTrackWriter::new();
        assert!(!w.is_finalized());
        w.append(&vec![Vec3::ZERO].into()).unwrap();
        w.finalize(1, 3).unwrap();
        assert_eq!(w.tracks().len(), 1);
        assert_eq!(w.final_counts(), Some((1, 3)));
    }
}
