//! Event types and sinks for observing generation and filtering runs.
//!
//! This module defines [`TrackingEvent`] and a set of sinks to emit, collect, or
//! forward events while running [`crate::tracking::GenerationEngine`] or
//! [`crate::filter::TrackFilter`]. Progress lines shown by the command-line tools are
//! rendered from these events.

/// Describes events emitted while producing a track set.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq)]
pub enum TrackingEvent {
    /// Emitted when generation starts.
    GenerationStarted {
        /// Number of worker threads.
        threads: usize,
        /// Number of tracks requested.
        max_num_tracks: usize,
        /// Attempt limit, `0` when unbounded.
        max_num_attempts: usize,
    },

    /// Emitted by the writer after each counted attempt.
    GenerationProgress {
        /// Attempts so far.
        generated: usize,
        /// Tracks written so far.
        selected: usize,
        /// Progress towards the nearest limit, in [0, 1].
        fraction: f32,
    },

    /// Emitted after each track read by a filter.
    FilterProgress {
        /// Tracks read so far.
        read: usize,
        /// Tracks written so far.
        selected: usize,
        /// Progress relative to the source track count, if it is known.
        fraction: Option<f32>,
    },

    /// Emitted once the output has been finalized.
    Finished {
        /// Tracks written.
        count: usize,
        /// Attempts (generation) or tracks read (filtering).
        total_count: usize,
    },
}

impl TrackingEvent {
    /// One-line progress text, e.g. `"120 generated, 10 selected [10%]"`.
    ///
    /// Returns `None` for events that are not progress reports.
    pub fn progress_line(&self) -> Option<String> {
        match self {
            TrackingEvent::GenerationProgress {
                generated,
                selected,
                fraction,
            } => Some(format!(
                "{generated} generated, {selected} selected [{:.0}%]",
                fraction * 100.0
            )),
            TrackingEvent::FilterProgress {
                read,
                selected,
                fraction,
            } => Some(match fraction {
                Some(f) => format!("{read} read, {selected} selected [{:.0}%]", f * 100.0),
                None => format!("{read} read, {selected} selected"),
            }),
            _ => None,
        }
    }
}

/// A generic event sink that accepts [`TrackingEvent`]s.
pub trait EventSink {
    fn send(&mut self, event: TrackingEvent);

    fn send_many<I>(&mut self, events: I)
    where
        Self: Sized,
        I: IntoIterator<Item = TrackingEvent>,
    {
        for e in events {
            self.send(e);
        }
    }
}

/// A no-op event sink.
impl EventSink for () {
    #[inline]
    fn send(&mut self, _event: TrackingEvent) {}
}

impl<S: EventSink + ?Sized> EventSink for &mut S {
    #[inline]
    fn send(&mut self, event: TrackingEvent) {
        (**self).send(event);
    }
}

/// An event sink that forwards to a user-provided closure.
pub struct FnSink<F>
where
    F: FnMut(TrackingEvent),
{
    f: F,
}

impl<F> FnSink<F>
where
    F: FnMut(TrackingEvent),
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> EventSink for FnSink<F>
where
    F: FnMut(TrackingEvent),
{
    #[inline]
    fn send(&mut self, event: TrackingEvent) {
        (self.f)(event);
    }
}

/// An event sink that collects all events in a `Vec`.
#[derive(Default)]
pub struct VecSink {
    events: Vec<TrackingEvent>,
}

impl VecSink {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn into_inner(self) -> Vec<TrackingEvent> {
        self.events
    }

    pub fn as_slice(&self) -> &[TrackingEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl EventSink for VecSink {
    #[inline]
    fn send(&mut self, event: TrackingEvent) {
        self.events.push(event);
    }
}
