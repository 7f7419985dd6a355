//! Signal handling for graceful shutdown.

use std::io;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// SIGINT/SIGTERM listeners (Ctrl-C off Unix). The OS handlers are
/// registered by `install`, so a signal that arrives before the first
/// `recv` is still seen.
pub struct ShutdownSignal {
    #[cfg(unix)]
    sigint: tokio::signal::unix::Signal,
    #[cfg(unix)]
    sigterm: tokio::signal::unix::Signal,
    #[cfg(not(unix))]
    ctrl_c: tokio::signal::windows::CtrlC,
}

impl ShutdownSignal {
    /// Must be called from inside a tokio runtime.
    #[cfg(unix)]
    pub fn install() -> io::Result<Self> {
        use tokio::signal::unix::{signal, SignalKind};

        Ok(Self {
            sigint: signal(SignalKind::interrupt())?,
            sigterm: signal(SignalKind::terminate())?,
        })
    }

    #[cfg(not(unix))]
    pub fn install() -> io::Result<Self> {
        Ok(Self {
            ctrl_c: tokio::signal::windows::ctrl_c()?,
        })
    }

    #[cfg(unix)]
    pub async fn recv(&mut self) {
        tokio::select! {
            _ = self.sigint.recv() => {
                info!(message = "Signal received.", signal = "SIGINT");
            }
            _ = self.sigterm.recv() => {
                info!(message = "Signal received.", signal = "SIGTERM");
            }
        }
    }

    #[cfg(not(unix))]
    pub async fn recv(&mut self) {
        self.ctrl_c.recv().await;
        info!(message = "Signal received.", signal = "ctrl-c");
    }
}

/// Install the handlers now and cancel `token` on the first signal.
pub fn cancel_on_signal(token: CancellationToken) -> io::Result<JoinHandle<()>> {
    let mut signals = ShutdownSignal::install()?;
    Ok(tokio::spawn(async move {
        signals.recv().await;
        token.cancel();
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn token_stays_live_until_a_signal_arrives() {
        let token = CancellationToken::new();
        let handle = cancel_on_signal(token.clone()).unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!token.is_cancelled());
        handle.abort();
    }
}
