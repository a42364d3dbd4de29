//! # Extension Orchestration
//!
//! Wires the three concurrent flows together under one cancellation scope:
//!
//! 1. register with the host (fatal on failure, before anything else starts)
//! 2. run the first credential refresh inline, so the file exists before the
//!    first poll tells the host that initialization is done
//! 3. spawn the recurring refresh task
//! 4. run the event loop to `Terminated`
//! 5. cancel, then join the refresh task for at most the shutdown grace period
//!
//! A refresh still running when the grace period ends is aborted. The OS
//! signal listener is owned by the caller.

use std::sync::Arc;

use tracing::{info, warn};

use crate::config::ExtensionConfig;
use crate::extension::{LifecycleApi, RegistrationError, RegistrationResult};
use crate::materializer::CredentialMaterializer;
use crate::runtime::event_loop::{EventLoop, LoopExit};
use crate::runtime::shutdown::{CancellationCause, CancellationCoordinator};

/// Result of a full extension lifetime
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionOutcome {
    pub registration: RegistrationResult,
    pub exit: LoopExit,
    /// `INVOKE` events observed
    pub invocations: u64,
    /// Refresh cycles completed, the startup cycle included; `None` if a later
    /// cycle was abandoned at shutdown
    pub refresh_cycles: Option<u64>,
}

/// Run the extension until the event loop terminates
///
/// `materializer` is only started once registration has succeeded. Its first
/// cycle completes before the first poll.
///
/// # Errors
///
/// Returns the [`RegistrationError`] if registration fails. Nothing else is
/// started in that case.
pub async fn run_extension(
    config: &ExtensionConfig,
    lifecycle: Arc<dyn LifecycleApi>,
    materializer: CredentialMaterializer,
    coordinator: &CancellationCoordinator,
) -> Result<ExtensionOutcome, RegistrationError> {
    let mut event_loop = EventLoop::new(lifecycle, coordinator.signal())
        .register(&config.extension_name)
        .await?;

    materializer.run_cycle().await;
    let mut refresh = materializer.spawn(coordinator.signal());

    let exit = event_loop.run().await;
    coordinator.trigger(CancellationCause::EventLoopTerminated);

    let refresh_cycles = match tokio::time::timeout(config.shutdown_grace, &mut refresh).await {
        Ok(Ok(cycles)) => Some(cycles + 1),
        Ok(Err(e)) => {
            warn!("Refresh task ended abnormally: {}", e);
            None
        }
        Err(_) => {
            refresh.abort();
            warn!(
                grace_ms = u64::try_from(config.shutdown_grace.as_millis()).unwrap_or(u64::MAX),
                "In-flight refresh did not finish within the shutdown grace period, abandoning it"
            );
            None
        }
    };

    info!(exit = ?exit, invocations = event_loop.invocations(), "Extension stopped");

    Ok(ExtensionOutcome {
        registration: event_loop.registration().clone(),
        exit,
        invocations: event_loop.invocations(),
        refresh_cycles,
    })
}
