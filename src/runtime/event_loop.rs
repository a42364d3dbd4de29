//! # Event Loop
//!
//! Top-level control state machine:
//!
//! ```text
//! Registering -> Polling -> EventReceived -> (Polling | Draining) -> Terminated
//! ```
//!
//! Registration happens on [`EventLoop`]; only a successful registration
//! yields a [`RegisteredEventLoop`], so no poll can be issued before the host
//! has assigned an identifier. A poll failure ends the loop the same way a
//! `SHUTDOWN` event does; only the log line differs.

use std::sync::Arc;

use tracing::{debug, error, info, info_span, Instrument};

use crate::extension::{
    LifecycleApi, LifecycleEvent, RegistrationError, RegistrationResult, ShutdownReason,
};
use crate::runtime::shutdown::{CancellationCause, CancellationSignal};

/// Position in the lifecycle state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Registering,
    Polling,
    EventReceived,
    Draining,
    Terminated,
}

impl std::fmt::Display for LoopState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match self {
            LoopState::Registering => "registering",
            LoopState::Polling => "polling",
            LoopState::EventReceived => "event_received",
            LoopState::Draining => "draining",
            LoopState::Terminated => "terminated",
        };
        f.write_str(state)
    }
}

/// Why the loop reached `Terminated`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopExit {
    /// The host delivered a `SHUTDOWN` event
    Shutdown(ShutdownReason),
    /// The shared cancellation signal was set
    Cancelled(Option<CancellationCause>),
    /// `next_event` failed for a reason other than cancellation
    PollFailed(String),
}

/// Event loop before registration
pub struct EventLoop {
    lifecycle: Arc<dyn LifecycleApi>,
    signal: CancellationSignal,
}

impl std::fmt::Debug for EventLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventLoop")
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl EventLoop {
    pub fn new(lifecycle: Arc<dyn LifecycleApi>, signal: CancellationSignal) -> Self {
        Self { lifecycle, signal }
    }

    pub fn state(&self) -> LoopState {
        LoopState::Registering
    }

    /// Register with the host under `name`
    ///
    /// Called at most once; the loop is consumed either way.
    ///
    /// # Errors
    ///
    /// Returns the [`RegistrationError`]; the caller must treat it as fatal.
    pub async fn register(self, name: &str) -> Result<RegisteredEventLoop, RegistrationError> {
        match self.lifecycle.register(name, &self.signal).await {
            Ok(registration) => {
                info!("Register response: {}", registration.pretty());
                Ok(RegisteredEventLoop {
                    lifecycle: self.lifecycle,
                    signal: self.signal,
                    registration,
                    state: LoopState::Polling,
                    pending: None,
                    exit: None,
                    invocations: 0,
                })
            }
            Err(e) => {
                error!(extension.name = name, "Failed to register extension: {}", e);
                Err(e)
            }
        }
    }
}

/// Event loop after a successful registration
pub struct RegisteredEventLoop {
    lifecycle: Arc<dyn LifecycleApi>,
    signal: CancellationSignal,
    registration: RegistrationResult,
    state: LoopState,
    pending: Option<LifecycleEvent>,
    exit: Option<LoopExit>,
    invocations: u64,
}

impl std::fmt::Debug for RegisteredEventLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisteredEventLoop")
            .field("extension_id", &self.registration.extension_id)
            .field("state", &self.state)
            .field("invocations", &self.invocations)
            .finish_non_exhaustive()
    }
}

impl RegisteredEventLoop {
    pub fn registration(&self) -> &RegistrationResult {
        &self.registration
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    /// `INVOKE` events handled so far
    pub fn invocations(&self) -> u64 {
        self.invocations
    }

    /// Exit reason, once `Terminated`
    pub fn exit(&self) -> Option<&LoopExit> {
        self.exit.as_ref()
    }

    fn terminate(&mut self, exit: LoopExit) {
        self.exit = Some(exit);
        self.state = LoopState::Terminated;
    }

    /// Perform one transition and return the new state
    ///
    /// `Terminated` is absorbing: stepping it again does nothing.
    pub async fn step(&mut self) -> LoopState {
        let from = self.state;
        match self.state {
            // Registering belongs to EventLoop
            LoopState::Registering | LoopState::Terminated => {}
            LoopState::Polling => self.poll().await,
            LoopState::EventReceived => self.dispatch(),
            LoopState::Draining => {
                info!("Exiting");
                self.state = LoopState::Terminated;
            }
        }
        if from != self.state {
            debug!(from = %from, to = %self.state, "Event loop transition");
        }
        self.state
    }

    async fn poll(&mut self) {
        if self.signal.is_cancelled() {
            self.terminate(LoopExit::Cancelled(self.signal.cause()));
            return;
        }

        info!("Waiting for event...");
        match self
            .lifecycle
            .next_event(&self.registration.extension_id, &self.signal)
            .await
        {
            Ok(event) => {
                debug!(
                    event = %event.kind(),
                    request_id = ?event.request_id(),
                    shutdown_reason = ?event.shutdown_reason(),
                    "Event received"
                );
                self.pending = Some(event);
                self.state = LoopState::EventReceived;
            }
            Err(e) if e.is_cancelled() => {
                info!("Event poll interrupted by cancellation");
                self.terminate(LoopExit::Cancelled(self.signal.cause()));
            }
            Err(e) => {
                error!("Error polling for next event: {}", e);
                self.terminate(LoopExit::PollFailed(e.to_string()));
            }
        }
    }

    fn dispatch(&mut self) {
        let Some(event) = self.pending.take() else {
            self.state = LoopState::Polling;
            return;
        };
        let deadline = event
            .deadline()
            .map_or_else(|| event.deadline_ms().to_string(), |at| at.to_rfc3339());

        match event {
            LifecycleEvent::Invoke(event) => {
                self.invocations += 1;
                info!(
                    request_id = %event.request_id,
                    function_arn = %event.invoked_function_arn,
                    deadline = %deadline,
                    "Received event: INVOKE"
                );
                self.state = LoopState::Polling;
            }
            LifecycleEvent::Shutdown(event) => {
                info!(
                    reason = %event.shutdown_reason,
                    deadline = %deadline,
                    "Received SHUTDOWN event"
                );
                self.exit = Some(LoopExit::Shutdown(event.shutdown_reason));
                self.state = LoopState::Draining;
            }
        }
    }

    /// Step until `Terminated` and return why
    pub async fn run(&mut self) -> LoopExit {
        let span = info_span!(
            "extension.event_loop",
            extension.id = %self.registration.extension_id
        );

        async {
            while self.step().await != LoopState::Terminated {}
        }
        .instrument(span)
        .await;

        self.exit
            .clone()
            .unwrap_or(LoopExit::Cancelled(self.signal.cause()))
    }
}
