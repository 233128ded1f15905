use crate::{engine::Executor, error::GenerationError, job::JobDescriptor, status::Outcome};
use core::ops::ControlFlow;
use std::{
    any::Any,
    panic::{self, AssertUnwindSafe},
};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Runs one chunk of jobs on a worker thread.
///
/// Each job's outcome, success or failure, is pushed to `results` as soon as
/// it completes. A job that panics is reported as
/// [`GenerationError::Panicked`] and the worker moves on to the next job.
/// Cancellation is checked before every job; the job already running is
/// allowed to finish.
///
/// Returns [`ControlFlow::Break`] when the completion channel is closed,
/// which means the coordinator has stopped listening and the worker should
/// exit.
pub fn process_jobs<E: Executor + ?Sized>(
    worker_id: usize,
    jobs: &[JobDescriptor],
    engine: &E,
    results: &mpsc::Sender<Outcome>,
    shutdown_token: &CancellationToken,
) -> ControlFlow<()> {
    for job in jobs {
        if shutdown_token.is_cancelled() {
            tracing::trace!("Worker {worker_id} skipping remaining jobs after cancellation");
            return ControlFlow::Continue(());
        }

        let outcome = execute_contained(engine, job);

        if let Outcome::Failure(ref e) = outcome {
            tracing::debug!("Worker {worker_id} job {job:?} failed: {e}");
        }

        if results.blocking_send(outcome).is_err() {
            tracing::debug!("Worker {worker_id} exiting, completion channel closed");
            return ControlFlow::Break(());
        }
    }
    ControlFlow::Continue(())
}

/// Runs `job`, turning a panic into a failed outcome.
///
/// The engine is shared and only read through `&self`, so a panic cannot
/// leave it half updated.
fn execute_contained<E: Executor + ?Sized>(engine: &E, job: &JobDescriptor) -> Outcome {
    panic::catch_unwind(AssertUnwindSafe(|| engine.execute(job))).unwrap_or_else(|payload| {
        Outcome::Failure(GenerationError::Panicked {
            reason: panic_message(payload.as_ref()),
        })
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic payload".to_string())
}
