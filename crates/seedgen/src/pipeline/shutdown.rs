//! Cancellation state and interrupt handling.

use tokio::signal;
use tokio_util::sync::CancellationToken;

/// Lifecycle of a run. `ShuttingDown` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunState {
    #[default]
    Running,
    ShuttingDown,
}

impl RunState {
    /// Moves to [`RunState::ShuttingDown`]. Returns `false` if already there.
    pub fn begin_shutdown(&mut self) -> bool {
        match self {
            Self::Running => {
                *self = Self::ShuttingDown;
                true
            }
            Self::ShuttingDown => false,
        }
    }

    pub const fn is_running(self) -> bool {
        matches!(self, Self::Running)
    }
}

/// Resolves on the first Ctrl+C, or SIGTERM on unix.
///
/// If a handler cannot be installed the error is logged and that branch
/// never resolves.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("Received Ctrl+C signal"),
        () = terminate => tracing::info!("Received SIGTERM signal"),
    }
}

/// Cancels `token` when an interrupt arrives. The listener ends quietly if
/// the token is cancelled for another reason first.
///
/// The task resolves to `true` only if it was the signal that cancelled
/// `token`.
pub fn spawn_signal_listener(token: CancellationToken) -> tokio::task::JoinHandle<bool> {
    tokio::spawn(async move {
        tokio::select! {
            () = shutdown_signal() => {
                tracing::info!("Shutdown signal received, stopping generation gracefully...");
                token.cancel();
                true
            }
            () = token.cancelled() => false,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shutdown_is_terminal() {
        let mut state = RunState::default();
        assert!(state.is_running());
        assert!(state.begin_shutdown());
        assert!(!state.is_running());
        assert!(!state.begin_shutdown());
        assert_eq!(state, RunState::ShuttingDown);
    }

    #[tokio::test]
    async fn listener_exits_when_token_is_cancelled_elsewhere() {
        let token = CancellationToken::new();
        let handle = spawn_signal_listener(token.clone());
        token.cancel();
        assert!(!handle.await.unwrap());
    }
}
