//! Signal handling for in-flight operations.
//!
//! SIGINT or SIGTERM trips a [`CancelToken`] shared with the running
//! operation, whose next deadline check then rolls its transaction back.

use ballot_election::CancelToken;
use tokio::signal;

pub struct ShutdownController {
    token: CancelToken,
}

impl ShutdownController {
    pub fn new() -> Self {
        Self {
            token: CancelToken::new(),
        }
    }

    /// Token that observes this controller's shutdown.
    pub fn token(&self) -> CancelToken {
        self.token.clone()
    }

    pub fn shutdown(&self) {
        self.token.cancel();
    }

    /// Wait for SIGTERM or SIGINT, then trigger shutdown.
    pub async fn wait_for_signal(&self) -> std::io::Result<()> {
        #[cfg(unix)]
        {
            let mut terminate = signal::unix::signal(signal::unix::SignalKind::terminate())?;
            tokio::select! {
                res = signal::ctrl_c() => {
                    res?;
                    tracing::info!("received SIGINT, cancelling operation");
                }
                _ = terminate.recv() => {
                    tracing::info!("received SIGTERM, cancelling operation");
                }
            }
        }

        #[cfg(not(unix))]
        {
            signal::ctrl_c().await?;
            tracing::info!("received SIGINT, cancelling operation");
        }

        self.shutdown();
        Ok(())
    }
}

impl Default for ShutdownController {
    fn default() -> Self {
        Self::new()
    }
}
