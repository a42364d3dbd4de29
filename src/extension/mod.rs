//! # Lifecycle Client
//!
//! Speaks the Lambda Extensions API: register once, then long-poll for
//! `INVOKE` / `SHUTDOWN` events.
//!
//! The protocol is push-via-long-poll, so `next_event` suspends the caller
//! until the host delivers an event, closes the connection, or the shared
//! cancellation signal fires.

mod client;
pub mod error;
pub mod types;

pub use client::ExtensionClient;
pub use error::{PollError, RegistrationError};
pub use types::{
    EventType, ExtensionId, InvokeEvent, LifecycleEvent, RegisterRequest, RegisterResponse,
    RegistrationResult, ShutdownEvent, ShutdownReason, TraceContext,
};

use async_trait::async_trait;

use crate::runtime::shutdown::CancellationSignal;

/// Registration and event polling against the host orchestrator
#[async_trait]
pub trait LifecycleApi: Send + Sync {
    /// Register this process with the host under `name`
    ///
    /// Called exactly once per process. Failure is fatal for the caller.
    async fn register(
        &self,
        name: &str,
        cancel: &CancellationSignal,
    ) -> Result<RegistrationResult, RegistrationError>;

    /// Block until the host delivers the next lifecycle event
    async fn next_event(
        &self,
        id: &ExtensionId,
        cancel: &CancellationSignal,
    ) -> Result<LifecycleEvent, PollError>;
}
