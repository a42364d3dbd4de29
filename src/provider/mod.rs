//! # Secret Store Providers
//!
//! The secret store is an external collaborator: given a secret identity and
//! a region it returns the secret's key/value document or fails. Everything
//! that talks to a concrete store sits behind [`SecretStore`].
//!
//! - `aws`: AWS Secrets Manager

pub mod aws;

pub use aws::AwsSecretsManager;

use async_trait::async_trait;
use thiserror::Error;

/// Failure resolving one value from the secret store
///
/// Recoverable: the caller omits the entry and retries on the next cycle.
#[derive(Debug, Error)]
pub enum SecretStoreError {
    #[error("secret '{secret}' not found in {region}")]
    SecretNotFound { secret: String, region: String },

    #[error("access to secret '{secret}' denied: {message}")]
    AccessDenied { secret: String, message: String },

    #[error("key '{key}' is not present in secret '{secret}'")]
    KeyNotFound { secret: String, key: String },

    #[error("secret '{secret}' is not a flat JSON object: {reason}")]
    InvalidPayload { secret: String, reason: String },

    #[error("secret '{secret}' has no string value")]
    Unsupported { secret: String },

    #[error("secret store request failed: {0}")]
    Service(String),
}

/// Fetches secrets by `(secret name, region)`
///
/// One call returns the whole secret; callers pick individual keys out of the
/// returned [`SecretDocument`].
#[async_trait]
pub trait SecretStore: Send + Sync {
    async fn get_secret(
        &self,
        secret_name: &str,
        region: &str,
    ) -> Result<SecretDocument, SecretStoreError>;
}

/// A secret whose string value is a flat JSON object
///
/// String members are returned verbatim, other scalars as their JSON text.
/// A `null` member counts as missing.
#[derive(Clone)]
pub struct SecretDocument {
    secret: String,
    members: serde_json::Map<String, serde_json::Value>,
}

// Member values never appear in Debug output.
impl std::fmt::Debug for SecretDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretDocument")
            .field("secret", &self.secret)
            .field("keys", &self.members.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl SecretDocument {
    /// Parse the string value of `secret`
    ///
    /// # Errors
    ///
    /// Returns [`SecretStoreError::InvalidPayload`] if `payload` is not a JSON
    /// object.
    pub fn parse(secret: &str, payload: &str) -> Result<Self, SecretStoreError> {
        let members: serde_json::Map<String, serde_json::Value> = serde_json::from_str(payload)
            .map_err(|e| SecretStoreError::InvalidPayload {
                secret: secret.to_string(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            secret: secret.to_string(),
            members,
        })
    }

    pub fn secret(&self) -> &str {
        &self.secret
    }

    /// Value of `key`
    ///
    /// # Errors
    ///
    /// Returns [`SecretStoreError::KeyNotFound`] if `key` is absent or `null`.
    pub fn value(&self, key: &str) -> Result<String, SecretStoreError> {
        match self.members.get(key) {
            Some(serde_json::Value::String(value)) => Ok(value.clone()),
            Some(serde_json::Value::Null) | None => Err(SecretStoreError::KeyNotFound {
                secret: self.secret.clone(),
                key: key.to_string(),
            }),
            Some(other) => Ok(other.to_string()),
        }
    }
}
