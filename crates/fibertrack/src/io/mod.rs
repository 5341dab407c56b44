//! Collaborator interfaces for track storage and image loading.
//!
//! Generation and filtering only talk to storage through [`TrackReader`],
//! [`TrackWriter`] and [`VolumeLoader`]. In-memory implementations live in
//! [`memory`]; [`text`] provides a line-oriented track file.
use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::geometry::{Track, Volume};
use crate::properties::Properties;

pub mod memory;
pub mod text;

pub use memory::{VecTrackReader, VecTrackWriter};
pub use text::{TextTrackReader, TextTrackWriter};

/// Forward-only source of tracks.
pub trait TrackReader {
    /// Properties recorded with the track set.
    fn properties(&self) -> &Properties;

    /// Next track, or `None` once the source is exhausted.
    fn next_track(&mut self) -> Result<Option<Track>>;
}

/// Sink for tracks. Each `append` writes one whole track.
pub trait TrackWriter {
    fn append(&mut self, track: &Track) -> Result<()>;

    /// Record the final counters and flush. Called once, after the last `append`.
    fn finalize(&mut self, count: usize, total_count: usize) -> Result<()>;
}

impl<W: TrackWriter + ?Sized> TrackWriter for &mut W {
    fn append(&mut self, track: &Track) -> Result<()> {
        (**self).append(track)
    }

    fn finalize(&mut self, count: usize, total_count: usize) -> Result<()> {
        (**self).finalize(count, total_count)
    }
}

/// Resolves image paths used in ROI specifications.
pub trait VolumeLoader {
    fn load(&self, path: &str) -> Result<Volume>;
}

/// Loader over images registered in memory under string identifiers.
#[derive(Clone, Debug, Default)]
pub struct VolumeStore {
    volumes: HashMap<String, Volume>,
}

impl VolumeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: impl Into<String>, volume: Volume) {
        self.volumes.insert(id.into(), volume);
    }

    pub fn with(mut self, id: impl Into<String>, volume: Volume) -> Self {
        self.insert(id, volume);
        self
    }

    pub fn len(&self) -> usize {
        self.volumes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.volumes.is_empty()
    }
}

impl VolumeLoader for VolumeStore {
    fn load(&self, path: &str) -> Result<Volume> {
        self.volumes
            .get(path)
            .cloned()
            .ok_or_else(|| Error::MissingImage {
                path: path.to_owned(),
            })
    }
}
