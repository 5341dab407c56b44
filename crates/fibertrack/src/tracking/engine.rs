//! Multi-threaded track generation.
//!
//! [`GenerationEngine`] runs one [`Tracker`] per worker thread. Workers send every
//! attempt, accepted or not, over a bounded channel to a single writer running on the
//! calling thread. The writer alone owns the counters, appends accepted tracks to the
//! [`TrackWriter`], and raises a stop flag once a limit is reached; workers check the
//! flag before each new attempt.
//!
//! Attempts that found no seed are not counted. A run in which
//! [`EngineConfig::max_seedless_attempts`] consecutive attempts find no seed ends
//! early with whatever was written so far.
//!
//! Output order is the order in which attempts reach the writer and is not
//! reproducible with more than one thread.
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use crossbeam_channel::Receiver;
use rand::rngs::StdRng;
use rand::SeedableRng;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::field::FieldSource;
use crate::io::TrackWriter;
use crate::roi::RoiSet;
use crate::tracking::events::{EventSink, TrackingEvent};
use crate::tracking::{Attempt, Rejection, Tracker, TrackerConfig};

/// Configuration for a generation run.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EngineConfig {
    /// Number of worker threads.
    pub threads: usize,
    /// Stop after writing this many tracks.
    pub max_num_tracks: usize,
    /// Stop after this many attempts; `0` means unbounded.
    pub max_num_attempts: usize,
    /// Worker `i` seeds its RNG with `base_seed + i`.
    pub base_seed: u64,
    /// Stop after this many consecutive attempts found no seed.
    pub max_seedless_attempts: usize,
}

pub const DEFAULT_MAX_SEEDLESS_ATTEMPTS: usize = 100;

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            threads: 1,
            max_num_tracks: 100,
            max_num_attempts: 0,
            base_seed: 0,
            max_seedless_attempts: DEFAULT_MAX_SEEDLESS_ATTEMPTS,
        }
    }
}

impl EngineConfig {
    /// Creates a new [`EngineConfig`] requesting `max_num_tracks` tracks.
    pub fn new(max_num_tracks: usize) -> Self {
        Self {
            max_num_tracks,
            ..Default::default()
        }
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    pub fn with_max_num_attempts(mut self, max_num_attempts: usize) -> Self {
        self.max_num_attempts = max_num_attempts;
        self
    }

    pub fn with_base_seed(mut self, base_seed: u64) -> Self {
        self.base_seed = base_seed;
        self
    }

    pub fn with_max_seedless_attempts(mut self, attempts: usize) -> Self {
        self.max_seedless_attempts = attempts;
        self
    }

    /// RNG seed of worker `index`.
    pub fn worker_seed(&self, index: usize) -> u64 {
        self.base_seed.wrapping_add(index as u64)
    }

    /// Validates the configuration, returning an error if invalid.
    pub fn validate(&self) -> Result<()> {
        if self.threads == 0 {
            return Err(Error::InvalidConfig("threads must be > 0".into()));
        }
        if self.max_num_tracks == 0 {
            return Err(Error::InvalidConfig("number of tracks must be > 0".into()));
        }
        if self.max_seedless_attempts == 0 {
            return Err(Error::InvalidConfig(
                "max seedless attempts must be > 0".into(),
            ));
        }
        Ok(())
    }

    fn limits_reached(&self, counters: &GenerationCounters) -> bool {
        counters.count >= self.max_num_tracks
            || (self.max_num_attempts > 0 && counters.total_count >= self.max_num_attempts)
    }

    /// Progress towards whichever limit is closer, in [0, 1].
    fn progress(&self, counters: &GenerationCounters) -> f32 {
        let tracks = counters.count as f32 / self.max_num_tracks as f32;
        let attempts = if self.max_num_attempts > 0 {
            counters.total_count as f32 / self.max_num_attempts as f32
        } else {
            0.0
        };
        tracks.max(attempts).min(1.0)
    }
}

/// Counters maintained by the writer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GenerationCounters {
    /// Attempts counted, accepted or not.
    pub total_count: usize,
    /// Tracks written.
    pub count: usize,
}

/// Orchestrates worker trackers and the single writer.
pub struct GenerationEngine<'a, F: FieldSource> {
    config: EngineConfig,
    tracker_config: TrackerConfig,
    field: &'a F,
    rois: &'a RoiSet,
}

impl<'a, F: FieldSource> GenerationEngine<'a, F> {
    pub fn try_new(
        config: EngineConfig,
        tracker_config: TrackerConfig,
        field: &'a F,
        rois: &'a RoiSet,
    ) -> Result<Self> {
        config.validate()?;
        tracker_config.validate()?;
        rois.validate_for_generation()?;
        Ok(Self {
            config,
            tracker_config,
            field,
            rois,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn tracker_config(&self) -> &TrackerConfig {
        &self.tracker_config
    }

    /// Generate tracks into `writer` until a limit is reached.
    ///
    /// The writer is finalized with the counters on success. On a write error the
    /// workers are stopped and the error is returned without finalizing.
    pub fn run<W: TrackWriter>(
        &self,
        writer: &mut W,
        sink: &mut dyn EventSink,
    ) -> Result<GenerationCounters> {
        let threads = self.config.threads;
        let trackers = (0..threads)
            .map(|_| {
                Tracker::new(
                    self.field.sampler(),
                    self.rois.clone(),
                    self.tracker_config.clone(),
                )
            })
            .collect::<Result<Vec<_>>>()?;

        info!(
            "Generating up to {} tracks with {} thread(s) (attempt limit: {}).",
            self.config.max_num_tracks,
            threads,
            if self.config.max_num_attempts > 0 {
                self.config.max_num_attempts.to_string()
            } else {
                "none".to_owned()
            }
        );
        sink.send(TrackingEvent::GenerationStarted {
            threads,
            max_num_tracks: self.config.max_num_tracks,
            max_num_attempts: self.config.max_num_attempts,
        });

        let (tx, rx) = crossbeam_channel::bounded::<Attempt>(threads);
        let stop = AtomicBool::new(false);

        let outcome = thread::scope(|scope| {
            for (index, mut tracker) in trackers.into_iter().enumerate() {
                let tx = tx.clone();
                let stop = &stop;
                let seed = self.config.worker_seed(index);
                scope.spawn(move || {
                    let mut rng = StdRng::seed_from_u64(seed);
                    let mut attempts = 0usize;
                    while !stop.load(Ordering::Acquire) {
                        let attempt = tracker.generate(&mut rng);
                        if tx.send(attempt).is_err() {
                            break;
                        }
                        attempts += 1;
                    }
                    debug!(worker = index, attempts, "Worker finished.");
                });
            }
            drop(tx);

            let outcome = self.write_attempts(&rx, writer, sink);
            // Unblock workers waiting on a full channel and stop new attempts.
            stop.store(true, Ordering::Release);
            drop(rx);
            outcome
        });

        let counters = outcome?;
        writer.finalize(counters.count, counters.total_count)?;

        if counters.count < self.config.max_num_tracks {
            warn!(
                "Stopped after {} of {} requested tracks.",
                counters.count, self.config.max_num_tracks
            );
        }
        info!(
            "Generated {} attempts, selected {} tracks.",
            counters.total_count, counters.count
        );
        sink.send(TrackingEvent::Finished {
            count: counters.count,
            total_count: counters.total_count,
        });
        Ok(counters)
    }

    fn write_attempts<W: TrackWriter>(
        &self,
        rx: &Receiver<Attempt>,
        writer: &mut W,
        sink: &mut dyn EventSink,
    ) -> Result<GenerationCounters> {
        let mut counters = GenerationCounters::default();
        let mut seedless = 0usize;
        for attempt in rx.iter() {
            match attempt {
                Attempt::Rejected(Rejection::NoSeed) => {
                    seedless += 1;
                    if seedless >= self.config.max_seedless_attempts {
                        warn!(
                            "No seed above the initial cutoff in {} consecutive attempts, stopping.",
                            seedless
                        );
                        break;
                    }
                    continue;
                }
                Attempt::Accepted(track) => {
                    writer.append(&track)?;
                    counters.count += 1;
                }
                Attempt::Rejected(_) => {}
            }
            seedless = 0;
            counters.total_count += 1;
            sink.send(TrackingEvent::GenerationProgress {
                generated: counters.total_count,
                selected: counters.count,
                fraction: self.config.progress(&counters),
            });
            if self.config.limits_reached(&counters) {
                break;
            }
        }
        Ok(counters)
    }
}
