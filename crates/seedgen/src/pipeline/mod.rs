//! The generation-and-persistence pipeline.
//!
//! ```text
//! JobSource ─▶ dispatcher ─▶ WorkerPool (N threads) ─▶ completion channel
//!                                                          │
//!                          Sink ◀─ Batcher ◀─ Coordinator ◀┘
//! ```
//!
//! The dispatcher and the coordinator are tokio tasks; workers are OS threads.
//! A single [`CancellationToken`] stops the whole graph.

mod coordinator;
mod dispatch;
mod pool;
mod processor;
mod reporter;
mod request;
mod shutdown;


pub use coordinator::Coordinator;
pub use dispatch::feed_jobs;
pub use pool::{PoolOptions, WorkerPool, default_worker_count};
pub use reporter::{DEFAULT_REPORT_INTERVAL, Reporter};
pub use request::WorkRequest;
pub use shutdown::{RunState, shutdown_signal, spawn_signal_listener};

use crate::{
    batch::FlushPolicy,
    counters::Summary,
    engine::Executor,
    error::{ConfigError, PipelineError},
    job::JobSource,
    sink::Sink,
};
use std::{
    io::Write,
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

pub const DEFAULT_JOBS_PER_REQUEST: usize = 250;
pub const DEFAULT_WORK_REQUEST_BUFFER_SIZE: usize = 2;
pub const DEFAULT_RESULT_BUFFER_SIZE: usize = 4_096;
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(3);

/// Shortest coordinator tick.
const MIN_TICK: Duration = Duration::from_millis(10);

/// Runtime parameters of [`run_pipeline`].
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub num_workers: usize,
    /// Jobs per [`WorkRequest::Jobs`] chunk.
    pub jobs_per_request: usize,
    /// Capacity of each worker's request queue, in chunks.
    pub work_request_buffer_size: usize,
    /// Capacity of the completion channel, in outcomes.
    pub result_buffer_size: usize,
    pub flush: FlushPolicy,
    pub report_interval: Duration,
    pub shutdown_timeout: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            num_workers: default_worker_count(0),
            jobs_per_request: DEFAULT_JOBS_PER_REQUEST,
            work_request_buffer_size: DEFAULT_WORK_REQUEST_BUFFER_SIZE,
            result_buffer_size: DEFAULT_RESULT_BUFFER_SIZE,
            flush: FlushPolicy::default(),
            report_interval: DEFAULT_REPORT_INTERVAL,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
        }
    }
}

impl PipelineConfig {
    /// # Errors
    ///
    /// Returns [`ConfigError::Zero`] naming the first size or interval that
    /// is zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let sizes = [
            ("num_workers", self.num_workers),
            ("jobs_per_request", self.jobs_per_request),
            ("work_request_buffer_size", self.work_request_buffer_size),
            ("result_buffer_size", self.result_buffer_size),
            ("batch_size", self.flush.max_batch.unwrap_or(1)),
        ];
        if let Some((name, _)) = sizes.into_iter().find(|&(_, v)| v == 0) {
            return Err(ConfigError::Zero { name });
        }
        if self.flush.max_age.is_some_and(|d| d.is_zero()) {
            return Err(ConfigError::Zero {
                name: "flush_interval",
            });
        }
        if self.report_interval.is_zero() {
            return Err(ConfigError::Zero {
                name: "report_interval",
            });
        }
        Ok(())
    }

    /// How often the coordinator wakes up without an outcome: fast enough
    /// for both the report cadence and the age trigger.
    pub fn tick_interval(&self) -> Duration {
        let tick = match self.flush.max_age {
            Some(age) => self.report_interval.min(age),
            None => self.report_interval,
        };
        tick.max(MIN_TICK)
    }

    pub const fn pool_options(&self) -> PoolOptions {
        PoolOptions {
            num_workers: self.num_workers,
            work_request_buffer_size: self.work_request_buffer_size,
            shutdown_timeout: self.shutdown_timeout,
        }
    }
}

/// Runs the pipeline until `cancel` fires or a fatal error occurs.
///
/// Jobs are pulled lazily from `jobs`, executed by `config.num_workers`
/// threads on `engine`, and every successful artifact is appended to `sink`
/// in completion order. Progress is written to `display`.
///
/// On cancellation the pending batch is flushed, the sink is closed, the
/// workers are stopped and the final [`Summary`] is returned.
///
/// # Errors
///
/// - [`PipelineError::Sink`] if a batch could not be written.
/// - [`PipelineError::Spawn`] if a worker thread could not be started.
/// - [`PipelineError::ChannelError`] if a worker queue closed unexpectedly or
///   every worker stopped before `cancel` fired.
/// - [`PipelineError::Config`] if `config` fails [`PipelineConfig::validate`].
pub async fn run_pipeline<E, S, W>(
    config: &PipelineConfig,
    jobs: JobSource,
    engine: Arc<E>,
    sink: S,
    display: W,
    cancel: CancellationToken,
) -> Result<Summary, PipelineError>
where
    E: Executor,
    S: Sink,
    W: Write,
{
    config.validate()?;

    let run_token = cancel.child_token();
    let (results_tx, results_rx) = mpsc::channel(config.result_buffer_size);

    let pool = Arc::new(WorkerPool::spawn(
        config.pool_options(),
        engine,
        results_tx,
        run_token.child_token(),
    )?);
    tracing::info!(
        "Started {} workers writing to {}",
        pool.len(),
        sink.target()
    );

    let dispatcher = {
        let pool = Arc::clone(&pool);
        let token = run_token.clone();
        let jobs_per_request = config.jobs_per_request;
        tokio::spawn(async move {
            let fed = feed_jobs(jobs, pool, jobs_per_request, token.clone()).await;
            if fed.is_err() {
                token.cancel();
            }
            fed
        })
    };

    let now = Instant::now();
    let coordinator = Coordinator::new(
        config.flush,
        sink,
        Reporter::new(display, config.report_interval, now),
        now,
    );
    let outcome = coordinator
        .run(results_rx, run_token.clone(), config.tick_interval())
        .await;

    run_token.cancel();
    let dispatched = match dispatcher.await {
        Ok(fed) => fed,
        Err(e) => Err(PipelineError::ChannelError {
            context: format!("dispatcher task failed: {e}"),
        }),
    };
    pool.shutdown().await;

    let summary = outcome?;
    dispatched?;
    Ok(summary)
}
