//! # Extensions API Client
//!
//! reqwest-based client for the two-call handshake with the Lambda host:
//! `POST /register` once, then `GET /event/next` in a loop.
//!
//! Both calls race the shared cancellation signal, so an interrupt releases a
//! flow that is parked inside the long poll.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client as ReqwestClient;
use tracing::debug;

use super::error::{PollError, RegistrationError};
use super::types::{
    ExtensionId, LifecycleEvent, RegisterRequest, RegisterResponse, RegistrationResult,
};
use super::LifecycleApi;
use crate::constants::{
    DEFAULT_CONNECT_TIMEOUT_SECS, EXTENSION_ACCEPT_FEATURE_HEADER, EXTENSION_API_VERSION,
    EXTENSION_IDENTIFIER_HEADER, EXTENSION_NAME_HEADER,
};
use crate::runtime::shutdown::CancellationSignal;

/// HTTP client for the Lambda Extensions API
#[derive(Debug, Clone)]
pub struct ExtensionClient {
    http: ReqwestClient,
    base_url: String,
}

impl ExtensionClient {
    /// Create a client for the Extensions API at `runtime_api` (host:port)
    ///
    /// No request timeout is set: `/event/next` blocks until the host has an
    /// event, which can take as long as the environment stays frozen.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(runtime_api: &str) -> Result<Self, reqwest::Error> {
        let http = ReqwestClient::builder()
            .connect_timeout(Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            http,
            base_url: format!("http://{runtime_api}/{EXTENSION_API_VERSION}/extension"),
        })
    }

    /// Base URL all lifecycle endpoints hang off
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn send_register(&self, name: &str) -> Result<RegistrationResult, RegistrationError> {
        let response = self
            .http
            .post(format!("{}/register", self.base_url))
            .header(EXTENSION_NAME_HEADER, name)
            .header(EXTENSION_ACCEPT_FEATURE_HEADER, "accountId")
            .json(&RegisterRequest::all_events())
            .send()
            .await
            .map_err(RegistrationError::Transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RegistrationError::Rejected { status, body });
        }

        let extension_id = response
            .headers()
            .get(EXTENSION_IDENTIFIER_HEADER)
            .and_then(|value| value.to_str().ok())
            .filter(|value| !value.is_empty())
            .map(ExtensionId::new)
            .ok_or(RegistrationError::MissingIdentifier)?;

        let body = response
            .bytes()
            .await
            .map_err(RegistrationError::Transport)?;
        let function = if body.is_empty() {
            RegisterResponse::default()
        } else {
            serde_json::from_slice(&body)
                .map_err(|e| RegistrationError::InvalidResponse(e.to_string()))?
        };

        Ok(RegistrationResult {
            extension_id,
            function,
        })
    }

    async fn fetch_next_event(&self, id: &ExtensionId) -> Result<LifecycleEvent, PollError> {
        let response = self
            .http
            .get(format!("{}/event/next", self.base_url))
            .header(EXTENSION_IDENTIFIER_HEADER, id.as_str())
            .send()
            .await
            .map_err(PollError::Transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PollError::Status { status, body });
        }

        let body = response.bytes().await.map_err(PollError::Transport)?;
        serde_json::from_slice(&body).map_err(|e| PollError::InvalidEvent(e.to_string()))
    }
}

#[async_trait]
impl LifecycleApi for ExtensionClient {
    async fn register(
        &self,
        name: &str,
        cancel: &CancellationSignal,
    ) -> Result<RegistrationResult, RegistrationError> {
        debug!(extension.name = name, url = %self.base_url, "Registering extension");
        tokio::select! {
            biased;
            () = cancel.cancelled() => Err(RegistrationError::Cancelled),
            result = self.send_register(name) => result,
        }
    }

    async fn next_event(
        &self,
        id: &ExtensionId,
        cancel: &CancellationSignal,
    ) -> Result<LifecycleEvent, PollError> {
        tokio::select! {
            biased;
            () = cancel.cancelled() => Err(PollError::Cancelled),
            result = self.fetch_next_event(id) => result,
        }
    }
}
