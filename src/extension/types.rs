//! # Extensions API Types
//!
//! Request and response payloads of the Lambda Extensions API.
//!
//! API Reference: https://docs.aws.amazon.com/lambda/latest/dg/runtimes-extensions-api.html

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle event kinds an extension can subscribe to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    Invoke,
    Shutdown,
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventType::Invoke => f.write_str("INVOKE"),
            EventType::Shutdown => f.write_str("SHUTDOWN"),
        }
    }
}

/// Request body for `POST /register`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub events: Vec<EventType>,
}

impl RegisterRequest {
    /// Subscribe to every lifecycle event
    pub fn all_events() -> Self {
        Self {
            events: vec![EventType::Invoke, EventType::Shutdown],
        }
    }
}

/// Response body of `POST /register`
///
/// Every field is optional on the wire; missing fields decode as empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponse {
    #[serde(default)]
    pub function_name: String,
    #[serde(default)]
    pub function_version: String,
    #[serde(default)]
    pub handler: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_id: Option<String>,
    /// Names of other extensions registered in the same environment
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extensions: Vec<String>,
}

/// Opaque identifier assigned by the host at registration
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExtensionId(String);

impl ExtensionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ExtensionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Outcome of a successful registration
///
/// Created once per process lifetime and never modified afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationResult {
    pub extension_id: ExtensionId,
    #[serde(flatten)]
    pub function: RegisterResponse,
}

impl RegistrationResult {
    /// Names of other extensions registered alongside this one
    pub fn co_registered_extensions(&self) -> &[String] {
        &self.function.extensions
    }

    /// Pretty JSON rendering for logs; empty if serialization fails
    pub fn pretty(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }
}

/// Tracing header forwarded with an invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceContext {
    #[serde(rename = "type")]
    pub kind: String,
    pub value: String,
}

/// Payload of an `INVOKE` event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvokeEvent {
    pub deadline_ms: i64,
    #[serde(default)]
    pub request_id: String,
    #[serde(default)]
    pub invoked_function_arn: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tracing: Option<TraceContext>,
}

/// Payload of a `SHUTDOWN` event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShutdownEvent {
    pub deadline_ms: i64,
    #[serde(default)]
    pub shutdown_reason: ShutdownReason,
}

/// Why the host is shutting the execution environment down
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShutdownReason {
    Spindown,
    Timeout,
    Failure,
    #[default]
    #[serde(other)]
    Unknown,
}

impl std::fmt::Display for ShutdownReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let reason = match self {
            ShutdownReason::Spindown => "spindown",
            ShutdownReason::Timeout => "timeout",
            ShutdownReason::Failure => "failure",
            ShutdownReason::Unknown => "unknown",
        };
        f.write_str(reason)
    }
}

/// Event returned by `GET /event/next`, discriminated by `eventType`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "eventType", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LifecycleEvent {
    Invoke(InvokeEvent),
    Shutdown(ShutdownEvent),
}

impl LifecycleEvent {
    pub fn kind(&self) -> EventType {
        match self {
            LifecycleEvent::Invoke(_) => EventType::Invoke,
            LifecycleEvent::Shutdown(_) => EventType::Shutdown,
        }
    }

    /// Deadline in epoch milliseconds
    pub fn deadline_ms(&self) -> i64 {
        match self {
            LifecycleEvent::Invoke(event) => event.deadline_ms,
            LifecycleEvent::Shutdown(event) => event.deadline_ms,
        }
    }

    pub fn deadline(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.deadline_ms())
    }

    pub fn request_id(&self) -> Option<&str> {
        match self {
            LifecycleEvent::Invoke(event) => Some(event.request_id.as_str()),
            LifecycleEvent::Shutdown(_) => None,
        }
    }

    pub fn shutdown_reason(&self) -> Option<ShutdownReason> {
        match self {
            LifecycleEvent::Invoke(_) => None,
            LifecycleEvent::Shutdown(event) => Some(event.shutdown_reason),
        }
    }
}
