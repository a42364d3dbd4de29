//! # Credential Materializer
//!
//! Periodically resolves declared secrets and writes them to a key=value file.
//!
//! A variable `SECRET_FOO=<anything>` in the environment declares that the
//! value of key `FOO` in the configured secret should be written as
//! `FOO=<value>`. The secret is fetched once per cycle and every declared
//! name is read from that one response.
//!
//! The owner runs the first cycle with [`CredentialMaterializer::run_cycle`]
//! before anything depends on the file, then hands the materializer to
//! [`CredentialMaterializer::spawn`]. Each later cycle starts one interval
//! after the previous one finished. Cancellation is checked between cycles
//! only; a cycle that has started is allowed to finish.

pub mod file;

pub use file::{parse_materialized, CredentialRecord};

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{error, info, info_span, warn, Instrument};

use crate::config::MaterializerConfig;
use crate::provider::SecretStore;
use crate::runtime::shutdown::CancellationSignal;

/// Failure of a whole refresh cycle
#[derive(Debug, Error)]
pub enum MaterializeError {
    /// The destination file could not be written; the cycle's record is dropped
    #[error("failed to write {}: {source}", .path.display())]
    FileWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Where secret declarations are read from
#[derive(Debug, Clone, Default)]
pub enum EnvironmentSource {
    /// The live process environment, enumerated on every cycle
    #[default]
    Process,
    /// A fixed set of variables
    Fixed(Vec<(String, String)>),
}

impl EnvironmentSource {
    /// Enumerate the variables; entries that are not valid UTF-8 are skipped
    pub fn vars(&self) -> Vec<(String, String)> {
        match self {
            EnvironmentSource::Process => std::env::vars_os()
                .filter_map(|(name, value)| {
                    Some((name.into_string().ok()?, value.into_string().ok()?))
                })
                .collect(),
            EnvironmentSource::Fixed(vars) => vars.clone(),
        }
    }
}

/// Logical names declared by variables carrying `prefix`, in enumeration order
///
/// A variable named exactly `prefix` declares nothing.
pub fn declared_names<I>(vars: I, prefix: &str) -> Vec<String>
where
    I: IntoIterator<Item = (String, String)>,
{
    vars.into_iter()
        .filter_map(|(name, _)| {
            name.strip_prefix(prefix)
                .filter(|logical| !logical.is_empty())
                .map(str::to_string)
        })
        .collect()
}

/// Summary of one completed refresh cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshReport {
    pub path: PathBuf,
    /// Names written to the file, in file order
    pub written: Vec<String>,
    /// Names whose value could not be resolved this cycle
    pub failed: Vec<String>,
}

/// Periodic best-effort refresher of the materialized file
pub struct CredentialMaterializer {
    store: Arc<dyn SecretStore>,
    config: MaterializerConfig,
    environment: EnvironmentSource,
}

impl std::fmt::Debug for CredentialMaterializer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialMaterializer")
            .field("config", &self.config)
            .field("environment", &self.environment)
            .finish_non_exhaustive()
    }
}

impl CredentialMaterializer {
    pub fn new(store: Arc<dyn SecretStore>, config: MaterializerConfig) -> Self {
        Self {
            store,
            config,
            environment: EnvironmentSource::Process,
        }
    }

    /// Read declarations from `environment` instead of the process environment
    #[must_use]
    pub fn with_environment(mut self, environment: EnvironmentSource) -> Self {
        self.environment = environment;
        self
    }

    /// Resolve every declared name and rewrite the file
    ///
    /// Per-entry resolution failures are logged and the entry is omitted. If
    /// the secret itself cannot be fetched, every entry fails and the file is
    /// rewritten empty.
    ///
    /// # Errors
    ///
    /// Returns [`MaterializeError::FileWrite`] if the file cannot be written.
    pub async fn refresh(&self) -> Result<RefreshReport, MaterializeError> {
        info!("Storing secret environment variables...");

        let names = declared_names(self.environment.vars(), &self.config.prefix);
        for name in &names {
            info!(variable = %name, "Found env variable to convert");
        }

        let (record, failed) = self.resolve(names).await;

        let path = self.config.output_path.clone();
        if let Err(source) = record.write_to(&path).await {
            return Err(MaterializeError::FileWrite { path, source });
        }

        Ok(RefreshReport {
            path,
            written: record.names().map(str::to_string).collect(),
            failed,
        })
    }

    async fn resolve(&self, names: Vec<String>) -> (CredentialRecord, Vec<String>) {
        let mut record = CredentialRecord::new();
        if names.is_empty() {
            return (record, Vec::new());
        }

        let document = match self
            .store
            .get_secret(&self.config.secret_id, &self.config.region)
            .await
        {
            Ok(document) => document,
            Err(e) => {
                warn!(
                    secret = %self.config.secret_id,
                    error = %e,
                    "Failed to load secret, omitting all declared variables"
                );
                return (record, names);
            }
        };

        let mut failed = Vec::new();
        for name in names {
            match document.value(&name) {
                Ok(value) if value.contains(['\n', '\r']) => {
                    warn!(
                        variable = %name,
                        "Secret value spans multiple lines and cannot be written as NAME=value, omitting"
                    );
                    failed.push(name);
                }
                Ok(value) => record.insert(name, value),
                Err(e) => {
                    warn!(
                        variable = %name,
                        secret = document.secret(),
                        error = %e,
                        "Failed to resolve secret value, omitting"
                    );
                    failed.push(name);
                }
            }
        }
        (record, failed)
    }

    /// Run one refresh cycle and log its outcome
    ///
    /// A failed cycle leaves the previous file in place; the next cycle
    /// retries.
    pub async fn run_cycle(&self) {
        match self.refresh().await {
            Ok(report) => info!(
                written = report.written.len(),
                failed = report.failed.len(),
                "Secrets have been written to {}",
                report.path.display()
            ),
            Err(e) => error!("Error writing env variables to file: {}", e),
        }
    }

    /// Wait one interval, refresh, repeat until `signal` fires
    ///
    /// Returns the number of cycles run.
    pub async fn run(self, signal: CancellationSignal) -> u64 {
        let span = info_span!(
            "extension.materializer",
            output = %self.config.output_path.display()
        );

        async move {
            let mut cycles = 0u64;
            loop {
                tokio::select! {
                    biased;
                    () = signal.cancelled() => break,
                    () = tokio::time::sleep(self.config.refresh_interval) => {}
                }
                self.run_cycle().await;
                cycles += 1;
            }
            info!(cycles = cycles, "Refresh task stopped");
            cycles
        }
        .instrument(span)
        .await
    }

    /// Spawn [`CredentialMaterializer::run`] as a background task
    pub fn spawn(self, signal: CancellationSignal) -> JoinHandle<u64> {
        tokio::spawn(self.run(signal))
    }
}
