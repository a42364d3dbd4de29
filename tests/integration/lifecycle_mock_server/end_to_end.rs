//! Full extension lifetime against both mocks

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use lambda_secrets_extension::config::{ExtensionConfig, MaterializerConfig};
use lambda_secrets_extension::extension::{ExtensionClient, RegistrationError, ShutdownReason};
use lambda_secrets_extension::materializer::{
    parse_materialized, CredentialMaterializer, EnvironmentSource,
};
use lambda_secrets_extension::provider::AwsSecretsManager;
use lambda_secrets_extension::runtime::{
    run_extension, CancellationCause, CancellationCoordinator, LoopExit,
};

use super::common::{
    invoke_event, prepare_aws_sdk, shutdown_event, MockLifecycleApi, MockSecretsManager,
    RegisterBehaviour,
};

fn config(runtime_api: String, endpoint: String, dir: &tempfile::TempDir) -> ExtensionConfig {
    ExtensionConfig {
        extension_name: "secrets-extension".to_string(),
        runtime_api,
        materializer: MaterializerConfig {
            secret_id: "prod/app".to_string(),
            output_path: dir.path().join("variables"),
            ..Default::default()
        },
        shutdown_grace: Duration::from_secs(5),
        secrets_manager_endpoint: Some(endpoint),
    }
}

fn declarations(names: &[&str]) -> EnvironmentSource {
    EnvironmentSource::Fixed(
        names
            .iter()
            .map(|name| (format!("SECRET_{name}"), "ignored".to_string()))
            .chain([("HOME".to_string(), "/root".to_string())])
            .collect(),
    )
}

#[tokio::test]
async fn test_full_lifetime_materializes_and_exits_on_shutdown() {
    prepare_aws_sdk();
    let dir = tempfile::tempdir().unwrap();
    let secrets = MockSecretsManager::start(&[(
        "prod/app",
        json!({ "FOO": "foo-value", "API_TOKEN": "abc=123" }),
    )])
    .await;
    let lifecycle = MockLifecycleApi::start(
        RegisterBehaviour::accept("ext-e2e"),
        vec![
            invoke_event("req-1"),
            invoke_event("req-2"),
            shutdown_event("spindown"),
        ],
    )
    .await;

    let cfg = config(lifecycle.runtime_api(), secrets.endpoint(), &dir);
    let client = Arc::new(ExtensionClient::new(&cfg.runtime_api).unwrap());
    let store = Arc::new(AwsSecretsManager::new(cfg.secrets_manager_endpoint.clone()));
    let materializer = CredentialMaterializer::new(store, cfg.materializer.clone())
        .with_environment(declarations(&["FOO", "BAR", "API_TOKEN"]));
    let coordinator = CancellationCoordinator::new();

    let outcome = run_extension(&cfg, client, materializer, &coordinator)
        .await
        .unwrap();

    assert_eq!(outcome.exit, LoopExit::Shutdown(ShutdownReason::Spindown));
    assert_eq!(outcome.invocations, 2);
    assert_eq!(outcome.registration.extension_id.as_str(), "ext-e2e");
    assert_eq!(outcome.refresh_cycles, Some(1));
    assert_eq!(
        coordinator.signal().cause(),
        Some(CancellationCause::EventLoopTerminated)
    );

    // Every poll carried the assigned identifier
    assert_eq!(lifecycle.polls().len(), 3);
    assert!(lifecycle
        .polls()
        .iter()
        .all(|id| id.as_deref() == Some("ext-e2e")));

    let contents = std::fs::read_to_string(dir.path().join("variables")).unwrap();
    assert_eq!(
        parse_materialized(&contents),
        vec![
            ("FOO".to_string(), "foo-value".to_string()),
            ("API_TOKEN".to_string(), "abc=123".to_string()),
        ]
    );
    assert!(!contents.contains("BAR="));

    // One GetSecretValue for the startup cycle, however many names it declares
    assert_eq!(secrets.requests(), vec!["prod/app".to_string()]);
}

#[tokio::test]
async fn test_rejected_registration_never_polls_or_refreshes() {
    prepare_aws_sdk();
    let dir = tempfile::tempdir().unwrap();
    let secrets = MockSecretsManager::start(&[("prod/app", json!({ "FOO": "foo-value" }))]).await;
    let lifecycle = MockLifecycleApi::start(
        RegisterBehaviour::Reject {
            status: axum::http::StatusCode::INTERNAL_SERVER_ERROR,
            body: json!({ "errorType": "Extension.Unknown" }),
        },
        vec![invoke_event("req-1")],
    )
    .await;

    let cfg = config(lifecycle.runtime_api(), secrets.endpoint(), &dir);
    let client = Arc::new(ExtensionClient::new(&cfg.runtime_api).unwrap());
    let store = Arc::new(AwsSecretsManager::new(cfg.secrets_manager_endpoint.clone()));
    let materializer = CredentialMaterializer::new(store, cfg.materializer.clone())
        .with_environment(declarations(&["FOO"]));

    let result = run_extension(&cfg, client, materializer, &CancellationCoordinator::new()).await;

    assert!(matches!(result, Err(RegistrationError::Rejected { .. })));
    assert_eq!(lifecycle.registrations().len(), 1);
    assert!(lifecycle.polls().is_empty());
    assert!(secrets.requests().is_empty());
    assert!(!dir.path().join("variables").exists());
}

#[tokio::test]
async fn test_unreachable_host_fails_registration_without_refreshing() {
    prepare_aws_sdk();
    let dir = tempfile::tempdir().unwrap();
    let secrets = MockSecretsManager::start(&[("prod/app", json!({ "FOO": "foo-value" }))]).await;

    // Bind then drop a listener to get a local port nothing listens on
    let runtime_api = {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap().to_string()
    };

    let cfg = config(runtime_api, secrets.endpoint(), &dir);
    let client = Arc::new(ExtensionClient::new(&cfg.runtime_api).unwrap());
    let store = Arc::new(AwsSecretsManager::new(cfg.secrets_manager_endpoint.clone()));
    let materializer = CredentialMaterializer::new(store, cfg.materializer.clone())
        .with_environment(declarations(&["FOO"]));
    let coordinator = CancellationCoordinator::new();

    let result = run_extension(&cfg, client, materializer, &coordinator).await;

    assert!(matches!(result, Err(RegistrationError::Transport(_))));
    assert!(secrets.requests().is_empty());
    assert!(!dir.path().join("variables").exists());
    assert!(!coordinator.signal().is_cancelled());
}
