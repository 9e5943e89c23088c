//! Transport client: one request/response exchange with the backend.
//!
//! The client performs exactly one network call per invocation. It does not
//! cache, deduplicate, or retry; retry policy belongs to the caller.

use std::fmt;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::Value;
use tracing::debug;

use crate::api::{validate_envelope, MessageEnvelope, SchemaError};
use crate::core::session::ChatError;
use crate::utils::url::construct_api_url;

/// Path of the conversational endpoint, relative to the configured base URL.
pub const MESSAGES_ENDPOINT: &str = "api/messages";

/// Network or backend failure. Recoverable by user-initiated retry.
#[derive(Debug)]
pub enum TransportError {
    /// The request could not be completed (connection refused, timeout,
    /// interrupted body).
    Request(String),
    /// The backend answered with a non-success status.
    Status { status: StatusCode, detail: String },
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::Request(detail) => write!(f, "request failed: {detail}"),
            TransportError::Status { status, detail } => {
                write!(f, "backend returned {status}: {detail}")
            }
        }
    }
}

impl std::error::Error for TransportError {}

/// The seam between the session state machine and the network.
///
/// One call performs one full exchange: the envelope goes out, the validated
/// reply comes back, or the call fails as a whole.
#[async_trait]
pub trait Backend {
    async fn send(&self, envelope: &MessageEnvelope) -> Result<MessageEnvelope, ChatError>;
}

/// HTTP implementation of [`Backend`] over a single fixed endpoint URL.
pub struct HttpBackend {
    client: reqwest::Client,
    messages_url: String,
}

impl HttpBackend {
    pub fn new(base_url: &str) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            messages_url: construct_api_url(base_url, MESSAGES_ENDPOINT),
        }
    }

    pub fn messages_url(&self) -> &str {
        &self.messages_url
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn send(&self, envelope: &MessageEnvelope) -> Result<MessageEnvelope, ChatError> {
        debug!(url = %self.messages_url, "sending message envelope");
        let response = self
            .client
            .post(&self.messages_url)
            .header("Content-Type", "application/json")
            .json(envelope)
            .send()
            .await
            .map_err(|e| TransportError::Request(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| TransportError::Request(e.to_string()))?;
        decode_response(status, &body)
    }
}

/// Turn a raw status + body into a validated inbound envelope.
///
/// Factored out of the network path so error mapping is testable without a
/// socket.
pub(crate) fn decode_response(
    status: StatusCode,
    body: &str,
) -> Result<MessageEnvelope, ChatError> {
    if !status.is_success() {
        return Err(TransportError::Status {
            status,
            detail: summarize_error_body(body),
        }
        .into());
    }

    let value: Value =
        serde_json::from_str(body).map_err(|e| SchemaError::InvalidJson(e.to_string()))?;
    let envelope = validate_envelope(&value)?;
    envelope.ensure_inbound()?;
    Ok(envelope)
}

/// Pull a human-readable summary out of a backend error body.
///
/// FastAPI-style backends put it under `detail`; others use `message` or
/// `error.message`. Falls back to the whitespace-collapsed raw body.
fn summarize_error_body(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return "<no body>".to_string();
    }

    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        let summary = value
            .get("detail")
            .and_then(|v| v.as_str())
            .or_else(|| value.pointer("/error/message").and_then(|v| v.as_str()))
            .or_else(|| value.get("message").and_then(|v| v.as_str()));
        if let Some(summary) = summary {
            return summary.split_whitespace().collect::<Vec<_>>().join(" ");
        }
    }

    trimmed.split_whitespace().collect::<Vec<_>>().join(" ")
}
