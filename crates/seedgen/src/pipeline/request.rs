use crate::job::JobDescriptor;
use tokio::sync::oneshot;

/// Messages delivered to a worker's queue.
#[derive(Debug)]
pub enum WorkRequest {
    /// Run these jobs in order, pushing one outcome per job to the completion
    /// channel.
    Jobs(Vec<JobDescriptor>),
    /// Stop after acknowledging on `response`.
    Shutdown { response: oneshot::Sender<()> },
}
