//! # Extensions API Error Types
//!
//! Registration failures are fatal for the process. Poll failures end the
//! event loop but are not propagated further.

use reqwest::StatusCode;
use thiserror::Error;

/// Failure of `POST /register`
#[derive(Debug, Error)]
pub enum RegistrationError {
    /// The Extensions API could not be reached
    #[error("Extensions API unreachable: {0}")]
    Transport(#[source] reqwest::Error),

    /// The host answered with a non-success status
    #[error("registration rejected with status {status}: {body}")]
    Rejected { status: StatusCode, body: String },

    /// The host did not assign an identifier
    #[error("registration response is missing the Lambda-Extension-Identifier header")]
    MissingIdentifier,

    /// The response body could not be decoded
    #[error("registration response could not be decoded: {0}")]
    InvalidResponse(String),

    /// Cancellation fired before registration completed
    #[error("registration cancelled before completion")]
    Cancelled,
}

/// Failure of `GET /event/next`
#[derive(Debug, Error)]
pub enum PollError {
    /// The connection failed or was closed by the host
    #[error("event poll transport failure: {0}")]
    Transport(#[source] reqwest::Error),

    /// The host answered with a non-success status
    #[error("event poll returned status {status}: {body}")]
    Status { status: StatusCode, body: String },

    /// The event body could not be decoded
    #[error("event could not be decoded: {0}")]
    InvalidEvent(String),

    /// Cancellation fired while waiting for the next event
    #[error("event poll cancelled")]
    Cancelled,
}

impl PollError {
    /// Whether the poll ended because of cancellation rather than a fault
    pub fn is_cancelled(&self) -> bool {
        matches!(self, PollError::Cancelled)
    }
}
