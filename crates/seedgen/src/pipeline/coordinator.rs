//! The single control loop that owns counters, the batch and the sink.
//!
//! Outcomes are consumed in the order workers finish them. Every state change
//! happens on the coordinator's own task, so none of the persistence state is
//! behind a lock.

use super::{reporter::Reporter, shutdown::RunState};
use crate::{
    batch::{Batcher, FlushPolicy},
    counters::{Counters, Summary},
    error::PipelineError,
    sink::Sink,
    status::Outcome,
    telemetry::{increment_failures, increment_fallbacks, increment_generated, record_flush},
};
use std::{
    io::Write,
    time::{Duration, Instant},
};
use tokio::{
    sync::mpsc,
    time::{MissedTickBehavior, interval},
};
use tokio_util::sync::CancellationToken;

pub struct Coordinator<S, W> {
    batcher: Batcher,
    sink: S,
    reporter: Reporter<W>,
    counters: Counters,
    state: RunState,
}

impl<S: Sink, W: Write> Coordinator<S, W> {
    /// Creates a coordinator with an empty batch, so a shutdown flush is
    /// well defined even before the first outcome arrives.
    pub fn new(policy: FlushPolicy, sink: S, reporter: Reporter<W>, now: Instant) -> Self {
        Self {
            batcher: Batcher::new(policy, now),
            sink,
            reporter,
            counters: Counters::new(now),
            state: RunState::Running,
        }
    }

    pub const fn counters(&self) -> &Counters {
        &self.counters
    }

    /// Number of artifacts waiting for the next flush.
    pub fn pending(&self) -> usize {
        self.batcher.len()
    }

    pub const fn state(&self) -> RunState {
        self.state
    }

    /// `generated == persisted + pending`.
    pub fn is_consistent(&self) -> bool {
        self.counters.generated == self.counters.persisted + self.batcher.len() as u64
    }

    /// Applies one outcome.
    ///
    /// After shutdown began the outcome is counted as discarded and nothing
    /// else changes.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Sink`] if the flush this outcome triggered
    /// failed. The batch is left intact.
    pub fn on_outcome(&mut self, outcome: Outcome, now: Instant) -> Result<(), PipelineError> {
        if !self.state.is_running() {
            self.counters.discarded += 1;
            return Ok(());
        }

        let artifact = match outcome {
            Outcome::Primary(artifact) => artifact,
            Outcome::Fallback { artifact, cause } => {
                tracing::debug!("Fallback generation used: {cause}");
                self.counters.fallbacks += 1;
                increment_fallbacks();
                artifact
            }
            Outcome::Failure(e) => {
                tracing::warn!("Generation failed: {e}");
                self.counters.failures += 1;
                increment_failures();
                self.reporter.maybe_report(&self.counters, now);
                return Ok(());
            }
        };

        self.counters.generated += 1;
        increment_generated(1);

        let due = self.batcher.push(artifact, now);
        let flushed = if due { self.flush(now) } else { Ok(()) };
        debug_assert!(self.is_consistent());

        self.reporter.maybe_report(&self.counters, now);
        flushed
    }

    /// Periodic check of the age trigger and the report cadence.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Sink`] if a due flush failed.
    pub fn on_tick(&mut self, now: Instant) -> Result<(), PipelineError> {
        if !self.state.is_running() {
            return Ok(());
        }
        let flushed = if self.batcher.is_due(now) {
            self.flush(now)
        } else {
            Ok(())
        };
        self.reporter.maybe_report(&self.counters, now);
        flushed
    }

    fn flush(&mut self, now: Instant) -> Result<(), PipelineError> {
        if self.batcher.is_empty() {
            return Ok(());
        }

        let started = Instant::now();
        self.sink
            .write_batch(self.batcher.pending())
            .map_err(|source| PipelineError::Sink {
                target: self.sink.target(),
                source,
            })?;

        let flushed = self.batcher.commit(now);
        self.counters.persisted += flushed as u64;

        let elapsed = started.elapsed();
        tracing::info!(
            "Saved {flushed} seed phrases to {} (total saved: {})",
            self.sink.target(),
            self.counters.persisted
        );
        record_flush(flushed as u64, elapsed.as_secs_f64() * 1000.0);
        Ok(())
    }

    /// Moves to [`RunState::ShuttingDown`], flushes a non-empty batch, closes
    /// the sink and emits the final report.
    ///
    /// Calling this a second time does nothing.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Sink`] if the final flush or the close
    /// failed. The sink is closed in either case.
    pub fn begin_shutdown(&mut self, now: Instant) -> Result<(), PipelineError> {
        if !self.state.begin_shutdown() {
            return Ok(());
        }
        tracing::debug!("Coordinator shutting down with {} pending", self.pending());

        let flushed = self.flush(now);
        let closed = self.sink.close().map_err(|source| PipelineError::Sink {
            target: self.sink.target(),
            source,
        });

        self.reporter.report(&self.counters, now);
        self.reporter.finish();
        flushed.and(closed)
    }

    pub fn summary(&self, now: Instant) -> Summary {
        self.counters.summary(now)
    }

    /// Drives the coordinator until `cancel` fires, every worker has gone, or
    /// a sink write fails.
    ///
    /// On cancellation the completion channel is closed and whatever is still
    /// queued on it is drained and discarded, which also unblocks workers
    /// waiting to send.
    ///
    /// # Errors
    ///
    /// - [`PipelineError::Sink`] on the first failed write. Counters up to
    ///   that point are reported before returning.
    /// - [`PipelineError::ChannelError`] if the completion channel closed
    ///   before `cancel` fired. The pending batch is still flushed.
    pub async fn run(
        mut self,
        mut results: mpsc::Receiver<Outcome>,
        cancel: CancellationToken,
        tick: Duration,
    ) -> Result<Summary, PipelineError> {
        let mut ticker = interval(tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let step = loop {
            let step = tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    tracing::info!("Cancellation requested, flushing pending batch");
                    break Ok(Stop::Cancelled);
                }
                outcome = results.recv() => match outcome {
                    Some(outcome) => self.on_outcome(outcome, Instant::now()),
                    None => break Ok(Stop::WorkersGone),
                },
                _ = ticker.tick() => self.on_tick(Instant::now()),
            };
            if let Err(e) = step {
                break Err(e);
            }
        };

        let stop = match step {
            Ok(stop) => stop,
            Err(e) => {
                let now = Instant::now();
                self.state.begin_shutdown();
                if let Err(close) = self.sink.close() {
                    tracing::warn!("Closing {} after a failed write: {close}", self.sink.target());
                }
                self.reporter.report(&self.counters, now);
                self.reporter.finish();
                tracing::error!("Stopping after sink failure: {e} ({})", self.summary(now));
                return Err(e);
            }
        };

        let shutdown = self.begin_shutdown(Instant::now());

        results.close();
        while results.try_recv().is_ok() {
            self.counters.discarded += 1;
        }
        if self.counters.discarded > 0 {
            tracing::debug!("Discarded {} outcomes after shutdown", self.counters.discarded);
        }

        let summary = self.summary(Instant::now());
        shutdown?;
        if stop == Stop::WorkersGone {
            tracing::error!("Every worker stopped before cancellation ({summary})");
            return Err(PipelineError::ChannelError {
                context: "every worker stopped before cancellation".to_string(),
            });
        }
        tracing::info!("{summary}");
        Ok(summary)
    }
}

/// Why the coordinator loop ended without a sink failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stop {
    Cancelled,
    WorkersGone,
}
