//! In-memory batching and the flush policy.
//!
//! The [`Batcher`] only decides *when* a flush is due; the coordinator does
//! the write. A flush is two steps so a failed write never loses data:
//!
//! 1. the coordinator hands [`Batcher::pending`] to the sink;
//! 2. on success it calls [`Batcher::commit`], which clears the buffer and
//!    restarts the age timer.

use crate::status::Artifact;
use std::time::{Duration, Instant};

/// Default number of buffered artifacts that forces a flush.
pub const DEFAULT_BATCH_SIZE: usize = 25_000;

/// Default maximum age of unflushed data.
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(3);

/// Upper bound on the buffer allocated up front.
const MAX_PREALLOC: usize = 64 * 1024;

/// When a batch must be flushed. Both triggers are optional; `None` disables
/// that trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlushPolicy {
    /// Flush once the batch holds at least this many artifacts.
    pub max_batch: Option<usize>,
    /// Flush a non-empty batch once this long has passed since the last
    /// flush.
    pub max_age: Option<Duration>,
}

impl Default for FlushPolicy {
    fn default() -> Self {
        Self {
            max_batch: Some(DEFAULT_BATCH_SIZE),
            max_age: Some(DEFAULT_FLUSH_INTERVAL),
        }
    }
}

/// Ordered buffer of artifacts awaiting a durable write.
///
/// Append order is the order in which the coordinator observed the
/// artifacts, i.e. completion order, not submission order.
#[derive(Debug)]
pub struct Batcher {
    policy: FlushPolicy,
    buffer: Vec<Artifact>,
    last_flush: Instant,
}

impl Batcher {
    /// Creates an empty batcher whose age timer starts at `now`.
    pub fn new(policy: FlushPolicy, now: Instant) -> Self {
        let capacity = policy.max_batch.unwrap_or(0).min(MAX_PREALLOC);
        Self {
            policy,
            buffer: Vec::with_capacity(capacity),
            last_flush: now,
        }
    }

    pub const fn policy(&self) -> FlushPolicy {
        self.policy
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub const fn last_flush(&self) -> Instant {
        self.last_flush
    }

    /// Appends an artifact and reports whether a flush is now due.
    pub fn push(&mut self, artifact: Artifact, now: Instant) -> bool {
        self.buffer.push(artifact);
        self.is_due(now)
    }

    /// Evaluates both triggers. An empty batch is never due.
    pub fn is_due(&self, now: Instant) -> bool {
        if self.buffer.is_empty() {
            return false;
        }
        let full = self
            .policy
            .max_batch
            .is_some_and(|max| self.buffer.len() >= max);
        let stale = self
            .policy
            .max_age
            .is_some_and(|age| now.saturating_duration_since(self.last_flush) >= age);
        full || stale
    }

    /// The artifacts that the next flush must write, in order.
    pub fn pending(&self) -> &[Artifact] {
        &self.buffer
    }

    /// Marks the pending batch as written: clears it, restarts the age timer
    /// and returns how many artifacts were flushed.
    pub fn commit(&mut self, now: Instant) -> usize {
        let flushed = self.buffer.len();
        self.buffer.clear();
        self.last_flush = now;
        flushed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::Strength;

    fn artifact(name: &str) -> Artifact {
        Artifact::baseline(name.to_string(), Strength::Bits128)
    }

    fn phrases(batch: &[Artifact]) -> Vec<&str> {
        batch.iter().map(|a| a.phrase.as_str()).collect()
    }

    #[test]
    fn size_trigger_fires_at_threshold() {
        let t0 = Instant::now();
        let mut batcher = Batcher::new(
            FlushPolicy {
                max_batch: Some(3),
                max_age: None,
            },
            t0,
        );

        assert!(!batcher.push(artifact("A"), t0));
        assert!(!batcher.push(artifact("B"), t0));
        assert!(batcher.push(artifact("C"), t0));
        assert_eq!(phrases(batcher.pending()), ["A", "B", "C"]);
        assert_eq!(batcher.commit(t0), 3);

        assert!(!batcher.push(artifact("D"), t0));
        assert!(!batcher.push(artifact("E"), t0));
        assert_eq!(phrases(batcher.pending()), ["D", "E"]);
    }

    #[test]
    fn age_trigger_needs_data() {
        let t0 = Instant::now();
        let mut batcher = Batcher::new(
            FlushPolicy {
                max_batch: None,
                max_age: Some(Duration::from_secs(1)),
            },
            t0,
        );

        // Idle ticks never flush an empty batch.
        assert!(!batcher.is_due(t0 + Duration::from_secs(10)));

        assert!(!batcher.push(artifact("A"), t0));
        assert!(!batcher.is_due(t0 + Duration::from_millis(999)));
        assert!(batcher.is_due(t0 + Duration::from_millis(1_100)));
    }

    #[test]
    fn commit_restarts_the_age_timer() {
        let t0 = Instant::now();
        let mut batcher = Batcher::new(
            FlushPolicy {
                max_batch: None,
                max_age: Some(Duration::from_secs(1)),
            },
            t0,
        );
        batcher.push(artifact("A"), t0);
        let t1 = t0 + Duration::from_secs(2);
        assert!(batcher.is_due(t1));
        batcher.commit(t1);
        assert_eq!(batcher.last_flush(), t1);
        assert!(batcher.is_empty());

        batcher.push(artifact("B"), t1);
        assert!(!batcher.is_due(t1 + Duration::from_millis(500)));
    }

    #[test]
    fn disabled_triggers_never_fire() {
        let t0 = Instant::now();
        let mut batcher = Batcher::new(
            FlushPolicy {
                max_batch: None,
                max_age: None,
            },
            t0,
        );
        for i in 0..1_000 {
            assert!(!batcher.push(artifact(&i.to_string()), t0));
        }
        assert!(!batcher.is_due(t0 + Duration::from_secs(3_600)));
        assert_eq!(batcher.len(), 1_000);
    }
}
