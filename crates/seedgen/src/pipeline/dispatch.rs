use super::{pool::WorkerPool, request::WorkRequest};
use crate::{error::PipelineError, job::JobSource};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Pulls jobs from the lazy source and hands them to workers.
///
/// Jobs are grouped into chunks of `jobs_per_request` and sent round-robin.
/// Sending waits for queue space, so dispatch runs at the pace of the
/// slowest queue rather than buffering an unbounded backlog.
///
/// Returns `Ok(())` once `cancel` fires. Jobs already queued stay queued; the
/// workers skip them after cancellation.
///
/// # Errors
///
/// Returns [`PipelineError::ChannelError`] if a worker's queue is closed,
/// i.e. the worker died.
pub async fn feed_jobs(
    mut jobs: JobSource,
    worker_pool: Arc<WorkerPool>,
    jobs_per_request: usize,
    cancel: CancellationToken,
) -> Result<(), PipelineError> {
    let mut dispatched: u64 = 0;

    loop {
        let chunk: Vec<_> = jobs.by_ref().take(jobs_per_request).collect();
        let len = chunk.len() as u64;

        let sent = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            sent = worker_pool.send_to_next_worker(WorkRequest::Jobs(chunk)) => sent,
        };

        match sent {
            Ok(()) => dispatched += len,
            Err(PipelineError::ServiceShutdown) => break,
            Err(e) => return Err(e),
        }
    }

    tracing::debug!("Dispatcher stopped after {dispatched} jobs");
    Ok(())
}
