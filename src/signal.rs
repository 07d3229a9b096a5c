//! Signal handling for shutdown.

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Wait for a shutdown signal (SIGINT, SIGTERM, or SIGQUIT on Unix).
#[cfg(unix)]
pub async fn shutdown_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    let (Ok(mut sigint), Ok(mut sigterm), Ok(mut sigquit)) = (
        signal(SignalKind::interrupt()),
        signal(SignalKind::terminate()),
        signal(SignalKind::quit()),
    ) else {
        warn!("Failed to install signal handlers, falling back to ctrl-c");
        ctrl_c().await;
        return;
    };

    tokio::select! {
        _ = sigint.recv() => {
            info!(message = "Signal received.", signal = "SIGINT");
        }
        _ = sigterm.recv() => {
            info!(message = "Signal received.", signal = "SIGTERM");
        }
        _ = sigquit.recv() => {
            info!(message = "Signal received.", signal = "SIGQUIT");
        }
    }
}

/// Wait for ctrl-c.
#[cfg(not(unix))]
pub async fn shutdown_signal() {
    ctrl_c().await;
}

async fn ctrl_c() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!(message = "Signal received.", signal = "ctrl-c"),
        Err(e) => {
            warn!("Failed to listen for ctrl-c: {}", e);
            std::future::pending::<()>().await;
        }
    }
}

/// Cancel `shutdown` when a shutdown signal arrives.
///
/// The watcher also exits quietly if the token is cancelled by someone else.
pub fn cancel_on_signal(shutdown: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::select! {
            _ = shutdown.cancelled() => {}
            _ = shutdown_signal() => shutdown.cancel(),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_watcher_exits_when_token_cancelled_elsewhere() {
        let shutdown = CancellationToken::new();
        let watcher = cancel_on_signal(shutdown.clone());

        shutdown.cancel();

        tokio::time::timeout(Duration::from_millis(500), watcher)
            .await
            .expect("watcher should exit quickly")
            .expect("watcher should not panic");
    }

    #[tokio::test]
    async fn test_watcher_leaves_token_alone_without_signal() {
        let shutdown = CancellationToken::new();
        let watcher = cancel_on_signal(shutdown.clone());

        tokio::time::sleep(Duration::from_millis(50)).await;

        assert!(!shutdown.is_cancelled());
        assert!(!watcher.is_finished());
        watcher.abort();
    }
}
