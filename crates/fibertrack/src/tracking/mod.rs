//! Streamline propagation and multi-threaded generation.
pub mod config;
pub mod engine;
pub mod events;
pub mod tracker;

pub use config::TrackerConfig;
pub use engine::{EngineConfig, GenerationCounters, GenerationEngine};
pub use events::{EventSink, FnSink, TrackingEvent, VecSink};
pub use tracker::{Attempt, Rejection, Termination, Tracker, TrackerState};
