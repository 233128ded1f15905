use crate::counters::Counters;
use std::{
    io::Write,
    time::{Duration, Instant},
};

/// Default cadence of the live progress line.
pub const DEFAULT_REPORT_INTERVAL: Duration = Duration::from_millis(500);

/// Renders a single, self-overwriting progress line.
///
/// The reporter reads counters but never changes them. Its cadence is a
/// floor: when the coordinator is busy a report is simply late, never
/// queued. Write errors are ignored since the display is advisory.
pub struct Reporter<W> {
    out: W,
    interval: Duration,
    last_report: Instant,
}

impl<W: Write> Reporter<W> {
    pub const fn new(out: W, interval: Duration, now: Instant) -> Self {
        Self {
            out,
            interval,
            last_report: now,
        }
    }

    pub const fn interval(&self) -> Duration {
        self.interval
    }

    /// Reports if at least one interval has passed since the last report.
    pub fn maybe_report(&mut self, counters: &Counters, now: Instant) -> bool {
        if now.saturating_duration_since(self.last_report) < self.interval {
            return false;
        }
        self.report(counters, now);
        true
    }

    /// Reports unconditionally.
    pub fn report(&mut self, counters: &Counters, now: Instant) {
        let progress = counters.progress(now);
        if let Err(e) = write!(self.out, "\r{progress}").and_then(|()| self.out.flush()) {
            tracing::trace!("progress display write failed: {e}");
        }
        self.last_report = now;
    }

    /// Ends the progress line so later output starts on a fresh line.
    pub fn finish(&mut self) {
        let _ = writeln!(self.out);
        let _ = self.out.flush();
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}
