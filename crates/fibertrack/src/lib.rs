#![forbid(unsafe_code)]
//! fibertrack: streamline tractography through orientation fields.
//!
//! Modules:
//! - geometry: points, tracks, voxel volumes with nearest and trilinear sampling
//! - roi: seed, include, exclude and mask regions, and track acceptance
//! - field: orientation field sampling (deterministic and probabilistic)
//! - tracking: per-track state machine and the multi-threaded generation engine
//! - filter: re-selection of existing tracks against new regions
//! - io: track readers and writers, text track files, image loading
pub mod error;
pub mod field;
pub mod filter;
pub mod geometry;
pub mod io;
pub mod properties;
pub mod roi;
pub mod tracking;

/// Convenient re-exports for common types. Import with `use fibertrack::prelude::*;`.
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::field::{
        FieldSample, FieldSampler, FieldSource, PeakField, PeakSampler, TrackingMethod,
    };
    pub use crate::filter::{FilterCounters, TrackFilter};
    pub use crate::geometry::{Point, Track, Volume};
    pub use crate::io::{
        TextTrackReader, TextTrackWriter, TrackReader, TrackWriter, VecTrackReader,
        VecTrackWriter, VolumeLoader, VolumeStore,
    };
    pub use crate::properties::Properties;
    pub use crate::roi::{MaskRegion, Role, Roi, RoiSet, Shape};
    pub use crate::tracking::{
        Attempt, EngineConfig, EventSink, FnSink, GenerationCounters, GenerationEngine,
        Rejection, Termination, Tracker, TrackerConfig, TrackerState, TrackingEvent, VecSink,
    };
}
