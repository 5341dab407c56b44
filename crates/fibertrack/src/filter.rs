//! Re-selection of existing tracks against include and exclude regions.
use tracing::{info, warn};

use crate::error::Result;
use crate::io::{TrackReader, TrackWriter};
use crate::properties::{Properties, COUNT_KEY, TOTAL_COUNT_KEY};
use crate::roi::{Role, RoiSet};
use crate::tracking::events::{EventSink, TrackingEvent};

/// Counters of a filter run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterCounters {
    /// Tracks read.
    pub total_count: usize,
    /// Tracks written.
    pub count: usize,
}

/// Single-threaded filter over a track source.
#[derive(Debug, Clone)]
pub struct TrackFilter {
    rois: RoiSet,
}

impl TrackFilter {
    /// Seed and mask regions in `rois` play no part in filtering and are ignored.
    pub fn new(rois: RoiSet) -> Self {
        let ignored = rois.get(Role::Seed).len() + rois.get(Role::Mask).len();
        if ignored > 0 {
            warn!("Ignoring {} seed/mask region(s) while filtering.", ignored);
        }
        Self { rois }
    }

    pub fn rois(&self) -> &RoiSet {
        &self.rois
    }

    /// Properties for the output: those of `source` with the include and exclude
    /// lists replaced by this filter's and the counters cleared.
    pub fn output_properties(&self, source: &Properties) -> Properties {
        let mut properties = source.clone();
        properties.remove(COUNT_KEY);
        properties.remove(TOTAL_COUNT_KEY);
        properties.record_rois(&self.rois, &[Role::Include, Role::Exclude]);
        properties
    }

    /// Copy every track of `reader` accepted by the regions to `writer`.
    ///
    /// Tracks are written unchanged and in input order. The writer is finalized with
    /// the counters once the reader is exhausted.
    pub fn run<R, W>(
        &mut self,
        reader: &mut R,
        writer: &mut W,
        sink: &mut dyn EventSink,
    ) -> Result<FilterCounters>
    where
        R: TrackReader + ?Sized,
        W: TrackWriter + ?Sized,
    {
        let expected = reader
            .properties()
            .get_parsed::<usize>(COUNT_KEY)
            .filter(|&n| n > 0);
        match expected {
            Some(n) => info!("Filtering {} tracks.", n),
            None => info!("Filtering tracks (count unknown)."),
        }

        let mut counters = FilterCounters::default();
        while let Some(track) = reader.next_track()? {
            counters.total_count += 1;
            if self.rois.accept_track(track.points()) {
                writer.append(&track)?;
                counters.count += 1;
            }
            sink.send(TrackingEvent::FilterProgress {
                read: counters.total_count,
                selected: counters.count,
                fraction: expected.map(|n| (counters.total_count as f32 / n as f32).min(1.0)),
            });
        }
        writer.finalize(counters.count, counters.total_count)?;

        info!(
            "Read {} tracks, selected {}.",
            counters.total_count, counters.count
        );
        sink.send(TrackingEvent::Finished {
            count: counters.count,
            total_count: counters.total_count,
        });
        Ok(counters)
    }
}
