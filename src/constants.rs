//! # Constants
//!
//! Default values for extension configuration and the Extensions API wire contract.

/// Environment variable carrying the host:port of the Extensions API
pub const RUNTIME_API_ENV: &str = "AWS_LAMBDA_RUNTIME_API";

/// Version segment of the Extensions API path
pub const EXTENSION_API_VERSION: &str = "2020-01-01";

/// Request header naming the extension at registration
pub const EXTENSION_NAME_HEADER: &str = "Lambda-Extension-Name";

/// Response header carrying the identifier assigned at registration,
/// echoed back on every subsequent request
pub const EXTENSION_IDENTIFIER_HEADER: &str = "Lambda-Extension-Identifier";

/// Request header opting into extended registration fields (account id)
pub const EXTENSION_ACCEPT_FEATURE_HEADER: &str = "Lambda-Extension-Accept-Feature";

/// Default prefix marking an environment variable as a secret declaration
pub const DEFAULT_SECRET_PREFIX: &str = "SECRET_";

/// Default secret identity holding the materialized values
pub const DEFAULT_SECRET_ID: &str = "devops/keys/lambda-extensions-test";

/// Default secret store region when neither override nor `AWS_REGION` is set
pub const DEFAULT_REGION: &str = "us-east-1";

/// Default destination of the materialized key=value file
pub const DEFAULT_OUTPUT_PATH: &str = "/tmp/variables";

/// Default refresh interval (seconds)
pub const DEFAULT_REFRESH_INTERVAL_SECS: u64 = 60;

/// Default upper bound on waiting for an in-flight refresh at shutdown (milliseconds)
///
/// The host grants extensions roughly two seconds after SHUTDOWN.
pub const DEFAULT_SHUTDOWN_GRACE_MS: u64 = 1500;

/// Connect timeout for the Extensions API client (seconds)
///
/// Only the connect phase is bounded; `/event/next` is a long poll.
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 5;

/// Default tracing filter when `RUST_LOG` is unset
pub const DEFAULT_LOG_FILTER: &str = "lambda_secrets_extension=info";
