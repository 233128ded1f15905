use crate::{
    engine::Executor,
    pipeline::{processor::process_jobs, request::WorkRequest},
    status::Outcome,
};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Worker thread body.
///
/// Each worker blocks on its own queue and runs every [`WorkRequest::Jobs`]
/// chunk through the shared engine. It exits when:
///
/// - a [`WorkRequest::Shutdown`] arrives (acknowledged before exiting),
/// - its queue is closed because the pool was dropped,
/// - the completion channel is closed by the coordinator.
///
/// The worker never touches the job source, the batch or the counters.
pub fn worker_loop<E: Executor + ?Sized>(
    worker_id: usize,
    mut rx: mpsc::Receiver<WorkRequest>,
    engine: Arc<E>,
    results: mpsc::Sender<Outcome>,
    shutdown_token: CancellationToken,
) {
    tracing::trace!("Worker {worker_id} started");

    while let Some(work) = rx.blocking_recv() {
        match work {
            WorkRequest::Jobs(jobs) => {
                if process_jobs(worker_id, &jobs, engine.as_ref(), &results, &shutdown_token)
                    .is_break()
                {
                    break;
                }
            }
            WorkRequest::Shutdown { response } => {
                tracing::debug!("Worker {worker_id} received shutdown signal");

                if response.send(()).is_err() {
                    tracing::error!("Worker {worker_id} failed to acknowledge shutdown");
                }
                break;
            }
        }
    }

    tracing::trace!("Worker {worker_id} stopped");
}
