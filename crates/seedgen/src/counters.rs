use core::fmt;
use std::time::{Duration, Instant};

/// Progress counters owned by the coordinator.
///
/// Only the coordinator's control task mutates these, so they are plain
/// integers rather than atomics.
#[derive(Debug, Clone, Copy)]
pub struct Counters {
    /// Successful artifacts observed (primary and fallback).
    pub generated: u64,
    /// Artifacts durably written. Updated only at flush boundaries.
    pub persisted: u64,
    /// Jobs that produced no artifact.
    pub failures: u64,
    /// Artifacts produced by the derivation fallback.
    pub fallbacks: u64,
    /// Outcomes observed after shutdown began and thrown away.
    pub discarded: u64,
    pub started_at: Instant,
}

impl Counters {
    pub const fn new(now: Instant) -> Self {
        Self {
            generated: 0,
            persisted: 0,
            failures: 0,
            fallbacks: 0,
            discarded: 0,
            started_at: now,
        }
    }

    /// Artifacts per second since start. Zero until time has passed.
    pub fn throughput(&self, now: Instant) -> f64 {
        let elapsed = now.saturating_duration_since(self.started_at).as_secs_f64();
        if elapsed > 0.0 {
            self.generated as f64 / elapsed
        } else {
            0.0
        }
    }

    pub fn progress(&self, now: Instant) -> Progress {
        Progress {
            generated: self.generated,
            throughput: self.throughput(now),
            persisted: self.persisted,
        }
    }

    pub fn summary(&self, now: Instant) -> Summary {
        Summary {
            generated: self.generated,
            persisted: self.persisted,
            failures: self.failures,
            fallbacks: self.fallbacks,
            discarded: self.discarded,
            elapsed: now.saturating_duration_since(self.started_at),
        }
    }
}

/// A single progress sample as shown on the live display.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Progress {
    pub generated: u64,
    pub throughput: f64,
    pub persisted: u64,
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Generated: {} seed phrases | Speed: {:.2} phrases/sec | Saved: {}",
            self.generated, self.throughput, self.persisted
        )
    }
}

/// Final tally of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    pub generated: u64,
    pub persisted: u64,
    pub failures: u64,
    pub fallbacks: u64,
    pub discarded: u64,
    pub elapsed: Duration,
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Total generated: {} | Saved: {} | Failures: {} | Fallbacks: {} | Elapsed: {:.1}s",
            self.generated,
            self.persisted,
            self.failures,
            self.fallbacks,
            self.elapsed.as_secs_f64()
        )
    }
}
