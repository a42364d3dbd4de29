//! # Extension Configuration
//!
//! Extension-level configuration loaded from environment variables.
//!
//! The configuration is built once at startup and handed by reference to each
//! component. Every setting except the Extensions API address has a default.
//! Loading goes through a lookup function so tests never touch the process
//! environment.

use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

use crate::constants::{
    DEFAULT_OUTPUT_PATH, DEFAULT_REFRESH_INTERVAL_SECS, DEFAULT_REGION, DEFAULT_SECRET_ID,
    DEFAULT_SECRET_PREFIX, DEFAULT_SHUTDOWN_GRACE_MS, RUNTIME_API_ENV,
};

/// Errors raised while loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The host did not provide the Extensions API address
    #[error("AWS_LAMBDA_RUNTIME_API is not set; the extension must be started by the Lambda host")]
    MissingRuntimeApi,

    /// The extension name could not be derived from the executable path
    #[error("could not determine the extension name from the executable path")]
    MissingExtensionName,
}

/// Extension configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionConfig {
    /// Extension name sent at registration; must match the executable file name
    pub extension_name: String,
    /// host:port of the Extensions API
    pub runtime_api: String,
    /// Settings for the credential refresh task
    pub materializer: MaterializerConfig,
    /// Upper bound on waiting for an in-flight refresh during shutdown
    pub shutdown_grace: Duration,
    /// Endpoint override for Secrets Manager (local mocks)
    pub secrets_manager_endpoint: Option<String>,
}

/// Settings for the credential refresh task
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaterializerConfig {
    /// Environment variable prefix marking a secret declaration
    pub prefix: String,
    /// Secret identity the values are resolved from
    pub secret_id: String,
    /// Region of the secret store
    pub region: String,
    /// Destination of the key=value file
    pub output_path: PathBuf,
    /// Delay between the end of one refresh and the start of the next
    pub refresh_interval: Duration,
}

impl Default for MaterializerConfig {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_SECRET_PREFIX.to_string(),
            secret_id: DEFAULT_SECRET_ID.to_string(),
            region: DEFAULT_REGION.to_string(),
            output_path: PathBuf::from(DEFAULT_OUTPUT_PATH),
            refresh_interval: Duration::from_secs(DEFAULT_REFRESH_INTERVAL_SECS),
        }
    }
}

impl ExtensionConfig {
    /// Load configuration from the process environment
    ///
    /// # Errors
    ///
    /// Returns an error if `AWS_LAMBDA_RUNTIME_API` is unset or the extension
    /// name cannot be determined.
    pub fn from_env() -> Result<Self, ConfigError> {
        let executable = std::env::args_os().next().map(PathBuf::from);
        Self::from_lookup(|key| std::env::var(key).ok(), executable.as_deref())
    }

    /// Load configuration through an arbitrary variable lookup
    ///
    /// `executable` is the path the process was started from; its file name is
    /// the extension name unless `SECRETS_EXTENSION_NAME` overrides it.
    ///
    /// # Errors
    ///
    /// See [`ExtensionConfig::from_env`].
    pub fn from_lookup<F>(lookup: F, executable: Option<&Path>) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let runtime_api = lookup(RUNTIME_API_ENV)
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::MissingRuntimeApi)?;

        let extension_name = lookup("SECRETS_EXTENSION_NAME")
            .filter(|v| !v.is_empty())
            .or_else(|| {
                executable
                    .and_then(Path::file_name)
                    .map(|name| name.to_string_lossy().into_owned())
            })
            .filter(|v| !v.is_empty())
            .ok_or(ConfigError::MissingExtensionName)?;

        let defaults = MaterializerConfig::default();
        let region = lookup("SECRETS_EXTENSION_REGION")
            .or_else(|| lookup("AWS_REGION"))
            .filter(|v| !v.is_empty())
            .unwrap_or(defaults.region);

        let materializer = MaterializerConfig {
            prefix: lookup("SECRETS_EXTENSION_PREFIX")
                .filter(|v| !v.is_empty())
                .unwrap_or(defaults.prefix),
            secret_id: lookup("SECRETS_EXTENSION_SECRET_ID")
                .filter(|v| !v.is_empty())
                .unwrap_or(defaults.secret_id),
            region,
            output_path: lookup("SECRETS_EXTENSION_OUTPUT_PATH")
                .filter(|v| !v.is_empty())
                .map_or(defaults.output_path, PathBuf::from),
            refresh_interval: Duration::from_secs(env_var_or_default(
                &lookup,
                "SECRETS_EXTENSION_REFRESH_INTERVAL_SECS",
                DEFAULT_REFRESH_INTERVAL_SECS,
            )),
        };

        Ok(Self {
            extension_name,
            runtime_api,
            materializer,
            shutdown_grace: Duration::from_millis(env_var_or_default(
                &lookup,
                "SECRETS_EXTENSION_SHUTDOWN_GRACE_MS",
                DEFAULT_SHUTDOWN_GRACE_MS,
            )),
            secrets_manager_endpoint: lookup("SECRETS_MANAGER_ENDPOINT").filter(|v| !v.is_empty()),
        })
    }
}

/// Read variable through `lookup` or return default value
fn env_var_or_default<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    lookup(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}
