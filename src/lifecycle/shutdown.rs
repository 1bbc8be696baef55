//! Shutdown signal handling.
//!
//! Signal listeners are opt-in: they consume process resources, so an
//! application must call `enable_shutdown_hooks()` explicitly before any
//! OS signal triggers a graceful shutdown. Platforms differ in which
//! signals can be intercepted at all; [`signal_capability`] reports the
//! host's support instead of assuming uniform behavior.

use tokio::signal;

/// Which shutdown signals the host platform lets us intercept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignalCapability {
    /// Signal names a listener can trap on this platform.
    pub interceptable: &'static [&'static str],
    /// Whether forceful termination can be intercepted. On Windows it
    /// cannot: a forced kill never reaches the hooks.
    pub forceful_termination_interceptable: bool,
}

/// The signal support of the current platform.
pub fn signal_capability() -> SignalCapability {
    #[cfg(unix)]
    {
        SignalCapability {
            interceptable: &["SIGINT", "SIGTERM"],
            forceful_termination_interceptable: false,
        }
    }
    #[cfg(not(unix))]
    {
        SignalCapability {
            interceptable: &["CTRL_C"],
            forceful_termination_interceptable: false,
        }
    }
}

/// Wait for a shutdown signal and return its name.
///
/// On unix this listens for SIGINT and SIGTERM; elsewhere only Ctrl+C is
/// available.
pub async fn shutdown_signal() -> &'static str {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal");
            "SIGINT"
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM signal");
            "SIGTERM"
        },
    }
}
