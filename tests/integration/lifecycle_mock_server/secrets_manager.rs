//! AWS Secrets Manager provider against the mock Secrets Manager

use std::sync::Arc;

use serde_json::json;

use lambda_secrets_extension::config::MaterializerConfig;
use lambda_secrets_extension::materializer::{CredentialMaterializer, EnvironmentSource};
use lambda_secrets_extension::provider::{AwsSecretsManager, SecretStore, SecretStoreError};

use super::common::{prepare_aws_sdk, MockSecretsManager};

const SECRET_ID: &str = "devops/keys/lambda-extensions-test";
const DENIED_ID: &str = "devops/keys/other-team";

async fn provider() -> (MockSecretsManager, AwsSecretsManager) {
    prepare_aws_sdk();
    let mock = MockSecretsManager::start_with_denied(
        &[(
            SECRET_ID,
            json!({
                "DB_PASSWORD": "s3cr3t=value",
                "PORT": 5432,
                "ENABLED": true
            }),
        )],
        &[DENIED_ID],
    )
    .await;
    let provider = AwsSecretsManager::new(Some(mock.endpoint()));
    (mock, provider)
}

#[tokio::test]
async fn test_reads_key_from_secret_string() {
    let (mock, provider) = provider().await;

    let document = provider.get_secret(SECRET_ID, "us-east-1").await.unwrap();

    assert_eq!(document.value("DB_PASSWORD").unwrap(), "s3cr3t=value");
    assert_eq!(mock.requests(), vec![SECRET_ID.to_string()]);
}

#[tokio::test]
async fn test_non_string_members_rendered_as_json() {
    let (_mock, provider) = provider().await;

    let document = provider.get_secret(SECRET_ID, "us-east-1").await.unwrap();

    assert_eq!(document.value("PORT").unwrap(), "5432");
    assert_eq!(document.value("ENABLED").unwrap(), "true");
}

#[tokio::test]
async fn test_missing_key() {
    let (_mock, provider) = provider().await;

    let document = provider.get_secret(SECRET_ID, "us-east-1").await.unwrap();

    assert!(matches!(
        document.value("NOPE"),
        Err(SecretStoreError::KeyNotFound { key, .. }) if key == "NOPE"
    ));
}

#[tokio::test]
async fn test_missing_secret() {
    let (_mock, provider) = provider().await;

    let result = provider
        .get_secret("devops/keys/does-not-exist", "us-east-1")
        .await;

    assert!(matches!(result, Err(SecretStoreError::SecretNotFound { .. })));
}

#[tokio::test]
async fn test_access_denied() {
    let (mock, provider) = provider().await;

    let result = provider.get_secret(DENIED_ID, "us-east-1").await;

    match result {
        Err(SecretStoreError::AccessDenied { secret, message }) => {
            assert_eq!(secret, DENIED_ID);
            assert!(message.contains("not authorized"));
        }
        other => panic!("Expected AccessDenied, got {other:?}"),
    }
    assert_eq!(mock.requests(), vec![DENIED_ID.to_string()]);
}

#[tokio::test]
async fn test_refresh_cycle_sends_one_request() {
    let (mock, provider) = provider().await;
    let dir = tempfile::tempdir().unwrap();
    let config = MaterializerConfig {
        secret_id: SECRET_ID.to_string(),
        output_path: dir.path().join("variables"),
        ..Default::default()
    };
    let declarations = ["DB_PASSWORD", "PORT", "ENABLED"]
        .iter()
        .map(|name| (format!("SECRET_{name}"), String::new()))
        .collect();

    let report = CredentialMaterializer::new(Arc::new(provider), config)
        .with_environment(EnvironmentSource::Fixed(declarations))
        .refresh()
        .await
        .unwrap();

    assert_eq!(report.written, vec!["DB_PASSWORD", "PORT", "ENABLED"]);
    assert_eq!(mock.requests(), vec![SECRET_ID.to_string()]);
}
