//! # Shutdown Coordination
//!
//! Bridges OS termination signals into the single cooperative cancellation
//! signal observed by the event loop and the refresh task.
//!
//! [`CancellationCoordinator`] is the only writer. Every other component holds
//! a read-only [`CancellationSignal`]. The first trigger wins; later triggers
//! are ignored without logging a second shutdown.

use std::sync::{Arc, OnceLock};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, Instrument};

/// What set the cancellation signal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancellationCause {
    /// SIGTERM
    Terminate,
    /// SIGINT
    Interrupt,
    /// The event loop reached its terminal state and the process is winding down
    EventLoopTerminated,
}

impl std::fmt::Display for CancellationCause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CancellationCause::Terminate => f.write_str("SIGTERM"),
            CancellationCause::Interrupt => f.write_str("SIGINT"),
            CancellationCause::EventLoopTerminated => f.write_str("event loop terminated"),
        }
    }
}

/// Read-only view of the shared cancellation state
///
/// Once set it is never unset.
#[derive(Debug, Clone)]
pub struct CancellationSignal {
    token: CancellationToken,
    cause: Arc<OnceLock<CancellationCause>>,
}

impl CancellationSignal {
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once cancellation has been triggered
    pub async fn cancelled(&self) {
        self.token.cancelled().await;
    }

    /// The cause recorded by the first trigger, if any
    pub fn cause(&self) -> Option<CancellationCause> {
        self.cause.get().copied()
    }
}

/// Sole writer of the cancellation signal
#[derive(Debug, Clone, Default)]
pub struct CancellationCoordinator {
    token: CancellationToken,
    cause: Arc<OnceLock<CancellationCause>>,
}

impl CancellationCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hand out a read-only observer
    pub fn signal(&self) -> CancellationSignal {
        CancellationSignal {
            token: self.token.clone(),
            cause: Arc::clone(&self.cause),
        }
    }

    /// Set the cancellation signal
    ///
    /// Returns `true` only for the call that performed the transition.
    pub fn trigger(&self, cause: CancellationCause) -> bool {
        let _span = info_span!("extension.shutdown").entered();

        if self.cause.set(cause).is_err() {
            debug!(
                cause = %cause,
                first_cause = ?self.cause.get(),
                "Cancellation already triggered, ignoring"
            );
            return false;
        }

        match cause {
            CancellationCause::Terminate | CancellationCause::Interrupt => {
                info!("Received {}", cause);
                info!("Exiting");
            }
            CancellationCause::EventLoopTerminated => {
                debug!("Event loop terminated, cancelling background work");
            }
        }
        self.token.cancel();
        true
    }

    /// Trigger from a stream of delivered interrupts until the sender closes
    pub async fn listen(&self, mut interrupts: mpsc::Receiver<CancellationCause>) {
        while let Some(cause) = interrupts.recv().await {
            self.trigger(cause);
        }
    }

    /// Trigger on SIGTERM / SIGINT for the lifetime of the process
    ///
    /// # Errors
    ///
    /// Returns an error if a signal handler cannot be installed.
    #[cfg(unix)]
    pub async fn listen_for_os_signals(&self) -> std::io::Result<()> {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;

        loop {
            let cause = tokio::select! {
                received = sigterm.recv() => match received {
                    Some(()) => CancellationCause::Terminate,
                    None => return Ok(()),
                },
                received = sigint.recv() => match received {
                    Some(()) => CancellationCause::Interrupt,
                    None => return Ok(()),
                },
            };
            self.trigger(cause);
        }
    }

    /// Trigger on Ctrl-C for the lifetime of the process
    ///
    /// # Errors
    ///
    /// Returns an error if the Ctrl-C handler cannot be installed.
    #[cfg(not(unix))]
    pub async fn listen_for_os_signals(&self) -> std::io::Result<()> {
        loop {
            tokio::signal::ctrl_c().await?;
            self.trigger(CancellationCause::Interrupt);
        }
    }

    /// Spawn the OS signal listener as a background task
    ///
    /// The task never finishes on its own; abort it once the process is done.
    pub fn spawn_os_signal_listener(&self) -> JoinHandle<()> {
        let coordinator = self.clone();
        tokio::spawn(
            async move {
                if let Err(e) = coordinator.listen_for_os_signals().await {
                    error!("Failed to install signal handlers: {}", e);
                }
            }
            .instrument(info_span!("extension.shutdown")),
        )
    }
}
