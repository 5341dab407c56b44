use std::time::{Duration, Instant};

use fibertrack::tracking::{EventSink, TrackingEvent};

/// Prints progress lines to stderr, overwriting the previous one.
///
/// Lines are rate limited; the latest line is always printed before the run ends.
#[derive(Debug)]
pub struct StderrProgress {
    interval: Duration,
    last: Option<Instant>,
    pending: Option<String>,
}

impl Default for StderrProgress {
    fn default() -> Self {
        Self::new(Duration::from_millis(100))
    }
}

impl StderrProgress {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: None,
            pending: None,
        }
    }

    /// Line to print for `event` at time `now`, if any.
    fn render(&mut self, event: &TrackingEvent, now: Instant) -> Option<String> {
        if let TrackingEvent::Finished { .. } = event {
            return self.pending.take();
        }
        let line = event.progress_line()?;
        if self
            .last
            .is_some_and(|t| now.duration_since(t) < self.interval)
        {
            self.pending = Some(line);
            return None;
        }
        self.last = Some(now);
        self.pending = None;
        Some(line)
    }
}

impl EventSink for StderrProgress {
    fn send(&mut self, event: TrackingEvent) {
        let finished = matches!(event, TrackingEvent::Finished { .. });
        if let Some(line) = self.render(&event, Instant::now()) {
            eprint!("\r{line}");
        }
        if finished && self.last.is_some() {
            eprintln!();
        }
    }
}
