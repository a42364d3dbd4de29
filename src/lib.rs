//! # Lambda Secrets Extension
//!
//! An AWS Lambda extension that materializes Secrets Manager values into a
//! `KEY=VALUE` file for the function to read.
//!
//! ## Overview
//!
//! The extension runs alongside the function in the same execution
//! environment and:
//!
//! 1. **Registers** with the Lambda Extensions API for `INVOKE` and `SHUTDOWN`
//! 2. **Refreshes credentials** immediately and then once per minute: every
//!    `SECRET_<NAME>` environment variable declares a key `<NAME>` to resolve
//!    from the configured secret and write to `/tmp/variables`
//! 3. **Long-polls** for lifecycle events until `SHUTDOWN`, a poll failure,
//!    or SIGTERM/SIGINT
//!
//! All flows share one cooperative cancellation signal. See
//! [`config::ExtensionConfig`] for the environment variables that tune it.

pub mod config;
pub mod constants;
pub mod extension;
pub mod materializer;
pub mod observability;
pub mod provider;
pub mod runtime;
