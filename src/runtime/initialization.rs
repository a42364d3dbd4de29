//! # Initialization
//!
//! Process startup: rustls provider, tracing, configuration, and the two
//! external clients. Everything here runs before registration.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, info, info_span, Instrument};

use crate::config::ExtensionConfig;
use crate::extension::ExtensionClient;
use crate::materializer::CredentialMaterializer;
use crate::observability;
use crate::provider::AwsSecretsManager;
use crate::runtime::extension::run_extension;
use crate::runtime::shutdown::CancellationCoordinator;

/// Components assembled at startup
#[derive(Debug)]
pub struct Initialized {
    pub config: ExtensionConfig,
    pub lifecycle: Arc<ExtensionClient>,
    pub secrets: Arc<AwsSecretsManager>,
    pub coordinator: CancellationCoordinator,
}

/// Install the ring crypto provider for rustls
///
/// Must run before any TLS client is built. A provider that is already
/// installed is kept.
pub fn install_crypto_provider() {
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        debug!("rustls crypto provider already installed");
    }
}

/// Initialize the extension runtime
///
/// # Errors
///
/// Returns an error if configuration is incomplete or the Extensions API
/// client cannot be built.
pub async fn initialize() -> Result<Initialized> {
    install_crypto_provider();
    observability::init_tracing();

    let config = ExtensionConfig::from_env().context("Failed to load extension configuration")?;

    info!(
        extension.name = %config.extension_name,
        version = env!("CARGO_PKG_VERSION"),
        "Starting Lambda secrets extension"
    );
    debug!(config = ?config, "Loaded configuration");

    let lifecycle = Arc::new(
        ExtensionClient::new(&config.runtime_api)
            .context("Failed to build Extensions API client")?,
    );
    let secrets = Arc::new(AwsSecretsManager::new(config.secrets_manager_endpoint.clone()));

    Ok(Initialized {
        config,
        lifecycle,
        secrets,
        coordinator: CancellationCoordinator::new(),
    })
}

/// Run an initialized extension to completion
///
/// # Errors
///
/// Returns an error if registration fails.
pub async fn run(init: Initialized) -> Result<()> {
    let Initialized {
        config,
        lifecycle,
        secrets,
        coordinator,
    } = init;

    let span = info_span!("extension", name = %config.extension_name);

    async move {
        let signals = coordinator.spawn_os_signal_listener();
        let materializer = CredentialMaterializer::new(secrets, config.materializer.clone());

        let outcome = run_extension(&config, lifecycle, materializer, &coordinator).await;
        signals.abort();

        let outcome = outcome.context("Extension registration failed")?;
        info!(
            exit = ?outcome.exit,
            refresh_cycles = ?outcome.refresh_cycles,
            "Exiting"
        );
        Ok(())
    }
    .instrument(span)
    .await
}
