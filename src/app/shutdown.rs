use super::dispatcher::DispatcherState;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::signal;
#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal as unix_signal};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Stops the dispatcher and waits for its final flush.
///
/// Safe to call any number of times from any number of clones: the token
/// cancels once, the first caller joins the task, and later callers wait for
/// the dispatcher to report `Stopped`.
#[derive(Debug, Clone)]
pub struct ShutdownSequencer {
    token: CancellationToken,
    dispatcher: Arc<Mutex<Option<JoinHandle<()>>>>,
    state: watch::Receiver<DispatcherState>,
}

impl ShutdownSequencer {
    pub fn new(
        token: CancellationToken,
        dispatcher: JoinHandle<()>,
        state: watch::Receiver<DispatcherState>,
    ) -> Self {
        Self {
            token,
            dispatcher: Arc::new(Mutex::new(Some(dispatcher))),
            state,
        }
    }

    pub fn is_requested(&self) -> bool {
        self.token.is_cancelled()
    }

    pub async fn shutdown(&self) {
        self.token.cancel();

        let handle = self.dispatcher.lock().take();
        match handle {
            Some(handle) => {
                info!("Waiting for dispatcher to drain");
                if let Err(e) = handle.await {
                    error!("Dispatcher task failed: {}", e);
                }
            }
            None => {
                // Another caller owns the join; the sender side closes when
                // the task ends, which also releases this wait.
                let mut state = self.state.clone();
                let _ = state
                    .wait_for(|state| *state == DispatcherState::Stopped)
                    .await;
            }
        }
    }
}

/// Resolves on SIGINT (Ctrl+C) or, on unix, SIGTERM.
pub async fn wait_for_signal() -> std::io::Result<()> {
    #[cfg(unix)]
    {
        let mut sigterm = unix_signal(SignalKind::terminate())?;

        tokio::select! {
            result = signal::ctrl_c() => {
                result?;
                info!("Received SIGINT (Ctrl+C), initiating graceful shutdown");
            }
            _ = sigterm.recv() => {
                info!("Received SIGTERM, initiating graceful shutdown");
            }
        }
    }

    #[cfg(not(unix))]
    {
        signal::ctrl_c().await?;
        info!("Received SIGINT (Ctrl+C), initiating graceful shutdown");
    }

    Ok(())
}
