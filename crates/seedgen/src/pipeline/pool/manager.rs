//! Pool of OS worker threads fed over bounded queues.
//!
//! This module defines the [`WorkerPool`] struct, which owns one bounded
//! [`mpsc::Sender`] per worker thread. Work is distributed in round-robin
//! order and shutdown is coordinated through a shared [`CancellationToken`].
//!
//! Workers are real threads rather than tasks: mnemonic generation and key
//! derivation are CPU-bound and would otherwise starve the coordinator's
//! runtime.

use super::worker::worker_loop;
use crate::{
    engine::Executor,
    error::PipelineError,
    pipeline::request::WorkRequest,
    status::Outcome,
};
use core::time::Duration;
use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    thread,
};
use tokio::{
    sync::{mpsc, oneshot},
    time::timeout,
};
use tokio_util::sync::CancellationToken;

/// Sizing of a [`WorkerPool`].
#[derive(Debug, Clone, Copy)]
pub struct PoolOptions {
    pub num_workers: usize,
    /// Capacity of each worker's request queue.
    pub work_request_buffer_size: usize,
    /// How long to wait for each worker to acknowledge shutdown.
    pub shutdown_timeout: Duration,
}

/// A fixed set of worker threads that process [`WorkRequest`]s.
pub struct WorkerPool {
    workers: Vec<mpsc::Sender<WorkRequest>>,
    next_worker: AtomicUsize,
    shutdown_token: CancellationToken,
    shutdown_timeout: Duration,
}

impl WorkerPool {
    /// Spawns `options.num_workers` named threads, each with its own queue
    /// and a clone of `results`.
    ///
    /// The caller's `results` sender is consumed, so once every worker has
    /// exited the completion channel closes on its own.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Spawn`] if a thread cannot be created. Threads
    /// spawned before the failure exit once their queues are dropped.
    pub fn spawn<E: Executor>(
        options: PoolOptions,
        engine: Arc<E>,
        results: mpsc::Sender<Outcome>,
        shutdown_token: CancellationToken,
    ) -> Result<Self, PipelineError> {
        let mut workers = Vec::with_capacity(options.num_workers);

        for worker_id in 0..options.num_workers {
            // Queues stay short: a deep queue only holds jobs that will be
            // skipped at shutdown.
            let (tx, rx) = mpsc::channel(options.work_request_buffer_size);

            let engine = Arc::clone(&engine);
            let results = results.clone();
            let token = shutdown_token.clone();
            thread::Builder::new()
                .name(format!("seedgen-worker-{worker_id}"))
                .spawn(move || worker_loop(worker_id, rx, engine, results, token))
                .map_err(|source| PipelineError::Spawn { worker_id, source })?;

            workers.push(tx);
        }

        Ok(Self {
            workers,
            next_worker: AtomicUsize::new(0),
            shutdown_token,
            shutdown_timeout: options.shutdown_timeout,
        })
    }

    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    /// Returns the index of the next worker to receive work (round-robin).
    ///
    /// Uses a relaxed atomic increment to minimize contention.
    pub fn next_worker_index(&self) -> usize {
        self.next_worker.fetch_add(1, Ordering::Relaxed) % self.workers.len()
    }

    /// Sends a [`WorkRequest`] to the next worker in the pool, waiting for
    /// queue space if necessary.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The pipeline is shutting down (`shutdown_token` was cancelled).
    /// - The worker's queue is closed.
    pub async fn send_to_next_worker(&self, request: WorkRequest) -> Result<(), PipelineError> {
        if self.shutdown_token.is_cancelled() {
            return Err(PipelineError::ServiceShutdown);
        }

        let worker_idx = self.next_worker_index();
        let worker = &self.workers[worker_idx];

        match worker.send(request).await {
            Ok(()) => Ok(()),
            Err(_) => Err(PipelineError::ChannelError {
                context: format!("Worker {worker_idx} channel closed"),
            }),
        }
    }

    /// Gracefully shuts down all workers in the pool.
    ///
    /// - Cancels the shared [`CancellationToken`] so workers skip queued jobs.
    /// - Sends a [`WorkRequest::Shutdown`] to each worker.
    /// - Waits up to `shutdown_timeout` per worker for acknowledgements.
    ///
    /// A worker still inside a job when the timeout expires is abandoned; it
    /// exits on its own once that job returns.
    pub async fn shutdown(&self) {
        // === Phase 1: Cancel any remaining work ===
        tracing::debug!("Cancelling remaining work via shutdown token");
        self.shutdown_token.cancel();

        // === Phase 2: Notify workers to shut down ===
        tracing::debug!("Notifying {} workers to shut down", self.workers.len());
        let mut shutdown_handles = Vec::with_capacity(self.workers.len());

        for (i, worker) in self.workers.iter().enumerate() {
            let (tx, rx) = oneshot::channel();
            match timeout(
                self.shutdown_timeout,
                worker.send(WorkRequest::Shutdown { response: tx }),
            )
            .await
            {
                Ok(Ok(())) => shutdown_handles.push((i, rx)),
                // The worker already left because the completion channel
                // closed under it.
                Ok(Err(_)) => tracing::debug!("Worker {i} already stopped"),
                Err(_) => tracing::warn!("Worker {i} queue stayed full, abandoning it"),
            }
        }

        // === Phase 3: Wait for acknowledgements ===
        let shutdown_timeout = self.shutdown_timeout;
        let timeout_futures = shutdown_handles.into_iter().map(|(i, rx)| async move {
            match timeout(shutdown_timeout, rx).await {
                Ok(Ok(())) => tracing::trace!("Worker {i} shutdown acknowledged"),
                Ok(Err(_)) => tracing::debug!("Worker {i} exited before acknowledging"),
                Err(_) => tracing::warn!("Worker {i} shutdown timed out"),
            }
        });

        futures::future::join_all(timeout_futures).await;

        tracing::info!("Worker pool shutdown complete");
    }
}

/// Default pool size: every logical CPU minus `reserve`, never below one.
pub fn default_worker_count(reserve: usize) -> usize {
    num_cpus::get().saturating_sub(reserve).max(1)
}
