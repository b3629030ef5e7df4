//! Shutdown coordination
//!
//! The consume loop stops on its own in non-blocking mode; in blocking mode it
//! runs until the hosting process manager sends a signal. Both paths end up
//! as a broadcast on the coordinator so the loop can drain and close the
//! broker connection before the process exits.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;

/// Exit status used when a second signal forces an immediate exit
pub const FORCED_EXIT_CODE: i32 = 130;

/// Coordinates graceful shutdown across the session's tasks
#[derive(Clone)]
pub struct ShutdownCoordinator {
    shutdown_tx: broadcast::Sender<()>,
}

impl ShutdownCoordinator {
    pub fn new() -> (Self, broadcast::Receiver<()>) {
        let (shutdown_tx, shutdown_rx) = broadcast::channel(8);
        (Self { shutdown_tx }, shutdown_rx)
    }

    /// Broadcast to the receiver; it keeps the request until it is polled
    pub fn trigger_shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }

    /// Turn SIGINT/SIGTERM/SIGHUP/SIGQUIT into a shutdown broadcast
    ///
    /// A second signal exits the process immediately. Must be called from
    /// inside a tokio runtime.
    pub fn install_signal_handlers(&self) {
        let relay = SignalRelay {
            coordinator: self.clone(),
            received: Arc::new(AtomicUsize::new(0)),
        };

        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};

            // A closed downstream pipe should end us quietly, like any unix filter
            unsafe {
                libc::signal(libc::SIGPIPE, libc::SIG_DFL);
            }

            for kind in [
                SignalKind::interrupt(),
                SignalKind::terminate(),
                SignalKind::hangup(),
                SignalKind::quit(),
            ] {
                let relay = relay.clone();
                tokio::spawn(async move {
                    match signal(kind) {
                        Ok(mut stream) => {
                            while stream.recv().await.is_some() {
                                if relay.on_signal() == SignalAction::ForceExit {
                                    std::process::exit(FORCED_EXIT_CODE);
                                }
                            }
                        }
                        Err(e) => log::warn!("Cannot listen for {:?}: {}", kind, e),
                    }
                });
            }
        }

        #[cfg(not(unix))]
        tokio::spawn(async move {
            while tokio::signal::ctrl_c().await.is_ok() {
                if relay.on_signal() == SignalAction::ForceExit {
                    std::process::exit(FORCED_EXIT_CODE);
                }
            }
        });
    }
}

#[derive(Debug, PartialEq, Eq)]
enum SignalAction {
    Drain,
    ForceExit,
}

/// Shared by all signal listeners so a second signal of any kind forces exit
#[derive(Clone)]
struct SignalRelay {
    coordinator: ShutdownCoordinator,
    received: Arc<AtomicUsize>,
}

impl SignalRelay {
    fn on_signal(&self) -> SignalAction {
        if self.received.fetch_add(1, Ordering::AcqRel) > 0 {
            log::warn!("Second shutdown signal received; exiting immediately");
            return SignalAction::ForceExit;
        }
        log::info!("Shutdown signal received; stopping consumer");
        self.coordinator.trigger_shutdown();
        SignalAction::Drain
    }
}
