//! Extensions API client against the mock lifecycle API

use std::time::Duration;

use axum::http::StatusCode;
use serde_json::json;

use lambda_secrets_extension::extension::{
    EventType, ExtensionClient, ExtensionId, LifecycleApi, LifecycleEvent, PollError,
    RegistrationError, ShutdownReason,
};
use lambda_secrets_extension::runtime::{CancellationCause, CancellationCoordinator};

use super::common::{invoke_event, shutdown_event, MockLifecycleApi, RegisterBehaviour};

#[tokio::test]
async fn test_register_sends_name_and_subscriptions() {
    let mock = MockLifecycleApi::start(RegisterBehaviour::accept("ext-1234"), vec![]).await;
    let client = ExtensionClient::new(&mock.runtime_api()).unwrap();
    let coordinator = CancellationCoordinator::new();

    let registration = client
        .register("secrets-extension", &coordinator.signal())
        .await
        .unwrap();

    assert_eq!(registration.extension_id.as_str(), "ext-1234");
    assert_eq!(registration.function.function_name, "helloWorld");
    assert_eq!(registration.function.account_id.as_deref(), Some("123456789012"));

    let recorded = mock.registrations();
    assert_eq!(recorded.len(), 1);
    assert_eq!(recorded[0].name.as_deref(), Some("secrets-extension"));
    assert_eq!(recorded[0].accept_feature.as_deref(), Some("accountId"));
    assert_eq!(recorded[0].body, json!({ "events": ["INVOKE", "SHUTDOWN"] }));
}

#[tokio::test]
async fn test_register_rejected() {
    let mock = MockLifecycleApi::start(
        RegisterBehaviour::Reject {
            status: StatusCode::FORBIDDEN,
            body: json!({
                "errorMessage": "Extension.Forbidden: registration is closed",
                "errorType": "Extension.Forbidden"
            }),
        },
        vec![],
    )
    .await;
    let client = ExtensionClient::new(&mock.runtime_api()).unwrap();

    let result = client
        .register("secrets-extension", &CancellationCoordinator::new().signal())
        .await;

    match result {
        Err(RegistrationError::Rejected { status, body }) => {
            assert_eq!(status, StatusCode::FORBIDDEN);
            assert!(body.contains("Extension.Forbidden"));
        }
        other => panic!("Expected rejection, got {other:?}"),
    }
}

#[tokio::test]
async fn test_register_without_identifier_fails() {
    let mock = MockLifecycleApi::start(RegisterBehaviour::AcceptWithoutIdentifier, vec![]).await;
    let client = ExtensionClient::new(&mock.runtime_api()).unwrap();

    let result = client
        .register("secrets-extension", &CancellationCoordinator::new().signal())
        .await;

    assert!(matches!(result, Err(RegistrationError::MissingIdentifier)));
}

#[tokio::test]
async fn test_register_unreachable_host() {
    // Bind and drop to get a port nothing listens on
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = ExtensionClient::new(&addr.to_string()).unwrap();
    let result = client
        .register("secrets-extension", &CancellationCoordinator::new().signal())
        .await;

    assert!(matches!(result, Err(RegistrationError::Transport(_))));
}

#[tokio::test]
async fn test_next_event_decodes_invoke_and_shutdown() {
    let mock = MockLifecycleApi::start(
        RegisterBehaviour::accept("ext-1234"),
        vec![invoke_event("req-1"), shutdown_event("timeout")],
    )
    .await;
    let client = ExtensionClient::new(&mock.runtime_api()).unwrap();
    let signal = CancellationCoordinator::new().signal();
    let id = ExtensionId::new("ext-1234");

    let first = client.next_event(&id, &signal).await.unwrap();
    assert_eq!(first.kind(), EventType::Invoke);
    assert_eq!(first.request_id(), Some("req-1"));
    match &first {
        LifecycleEvent::Invoke(invoke) => {
            let tracing = invoke.tracing.as_ref().unwrap();
            assert_eq!(tracing.kind, "X-Amzn-Trace-Id");
        }
        LifecycleEvent::Shutdown(_) => panic!("Expected INVOKE"),
    }

    let second = client.next_event(&id, &signal).await.unwrap();
    assert_eq!(second.kind(), EventType::Shutdown);
    assert_eq!(second.shutdown_reason(), Some(ShutdownReason::Timeout));

    assert_eq!(
        mock.polls(),
        vec![Some("ext-1234".to_string()), Some("ext-1234".to_string())]
    );
}

#[tokio::test]
async fn test_cancel_releases_long_poll() {
    let mock = MockLifecycleApi::start(RegisterBehaviour::accept("ext-1234"), vec![]).await;
    let client = ExtensionClient::new(&mock.runtime_api()).unwrap();
    let coordinator = CancellationCoordinator::new();
    let signal = coordinator.signal();

    let poll = tokio::spawn(async move {
        client
            .next_event(&ExtensionId::new("ext-1234"), &signal)
            .await
    });

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(!poll.is_finished());
    coordinator.trigger(CancellationCause::Terminate);

    let result = tokio::time::timeout(Duration::from_secs(2), poll)
        .await
        .expect("long poll did not observe cancellation")
        .unwrap();
    assert!(matches!(result, Err(PollError::Cancelled)));
}
