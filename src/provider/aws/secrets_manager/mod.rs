//! # AWS Secrets Manager Client
//!
//! Client for reading values out of AWS Secrets Manager.
//!
//! A secret is expected to hold a flat JSON object in its `SecretString`;
//! each materialized variable is one member of that object. The secret is
//! fetched once and every member is read from that single response. One SDK client is
//! kept per region and created on first use.

mod auth;

use std::collections::HashMap;

use async_trait::async_trait;
use aws_sdk_secretsmanager::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_secretsmanager::operation::get_secret_value::GetSecretValueError;
use aws_sdk_secretsmanager::Client as SecretsManagerClient;
use tokio::sync::Mutex;
use tracing::{debug, info_span, Instrument};

use self::auth::create_sdk_config;
use crate::provider::{SecretDocument, SecretStore, SecretStoreError};

/// AWS Secrets Manager provider implementation
pub struct AwsSecretsManager {
    endpoint: Option<String>,
    clients: Mutex<HashMap<String, SecretsManagerClient>>,
}

impl std::fmt::Debug for AwsSecretsManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AwsSecretsManager")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

impl AwsSecretsManager {
    /// Create a new AWS Secrets Manager provider
    ///
    /// No SDK client is built until the first lookup in a region.
    pub fn new(endpoint: Option<String>) -> Self {
        Self {
            endpoint,
            clients: Mutex::new(HashMap::new()),
        }
    }

    async fn client_for(&self, region: &str) -> SecretsManagerClient {
        let mut clients = self.clients.lock().await;
        if let Some(client) = clients.get(region) {
            return client.clone();
        }

        debug!(region = region, "Creating Secrets Manager client");
        let sdk_config = create_sdk_config(region, self.endpoint.as_deref()).await;
        let client = SecretsManagerClient::new(&sdk_config);
        clients.insert(region.to_string(), client.clone());
        client
    }
}

/// Map an SDK failure onto the store's error taxonomy
fn classify_error<R>(
    error: &SdkError<GetSecretValueError, R>,
    secret: &str,
    region: &str,
) -> SecretStoreError
where
    R: std::fmt::Debug,
{
    match error.as_service_error() {
        Some(service) if service.is_resource_not_found_exception() => {
            SecretStoreError::SecretNotFound {
                secret: secret.to_string(),
                region: region.to_string(),
            }
        }
        Some(service) if service.code() == Some("AccessDeniedException") => {
            SecretStoreError::AccessDenied {
                secret: secret.to_string(),
                message: service.message().unwrap_or_default().to_string(),
            }
        }
        _ => SecretStoreError::Service(DisplayErrorContext(error).to_string()),
    }
}

#[async_trait]
impl SecretStore for AwsSecretsManager {
    async fn get_secret(
        &self,
        secret_name: &str,
        region: &str,
    ) -> Result<SecretDocument, SecretStoreError> {
        let span = info_span!(
            "aws.secretsmanager.secret.get",
            secret.name = secret_name,
            region = region
        );

        async move {
            let client = self.client_for(region).await;
            let output = client
                .get_secret_value()
                .secret_id(secret_name)
                .send()
                .await
                .map_err(|e| classify_error(&e, secret_name, region))?;

            let payload = output
                .secret_string()
                .ok_or_else(|| SecretStoreError::Unsupported {
                    secret: secret_name.to_string(),
                })?;

            SecretDocument::parse(secret_name, payload)
        }
        .instrument(span)
        .await
    }
}
