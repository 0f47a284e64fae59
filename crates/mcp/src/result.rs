//! Per-call outcome of a tool invocation.

use std::fmt;

use serde::Serialize;

/// Why a tool call did not produce a payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// No token could be acquired from the identity chain.
    Credential,
    /// The server rejected the bearer token, including after one refresh.
    Unauthorized,
    /// The caller may not use this tool (HTTP 403 or a local allow-list denial).
    Forbidden,
    /// HTTP 404 or JSON-RPC "method not found".
    NotFound,
    /// Anything the client could not make sense of.
    ProtocolError,
    /// DNS, connect, TLS or timeout failure.
    TransportError,
    /// The tool ran and reported `isError`.
    ToolError,
}

impl FailureKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Credential => "credential",
            Self::Unauthorized => "unauthorized",
            Self::Forbidden => "forbidden",
            Self::NotFound => "not_found",
            Self::ProtocolError => "protocol_error",
            Self::TransportError => "transport_error",
            Self::ToolError => "tool_error",
        }
    }

    /// Only transport faults are worth retrying with backoff. The client
    /// itself never does; the 401 refresh is the single built-in retry.
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::TransportError)
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct ToolCallFailure {
    pub kind: FailureKind,
    pub message: String,
    /// HTTP status when the failure came from a response.
    pub raw_status: Option<u16>,
}

impl ToolCallFailure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            raw_status: None,
        }
    }

    #[must_use]
    pub fn with_status(mut self, status: u16) -> Self {
        self.raw_status = Some(status);
        self
    }

    pub fn credential(err: &tollgate_oauth::Error) -> Self {
        Self::new(FailureKind::Credential, err.to_string())
    }

    pub fn transport(err: &reqwest::Error) -> Self {
        let what = if err.is_timeout() {
            "request timed out"
        } else if err.is_connect() {
            "connection failed"
        } else {
            "request failed"
        };
        Self::new(FailureKind::TransportError, format!("{what}: {err}"))
    }

    pub fn protocol(message: impl Into<String>) -> Self {
        Self::new(FailureKind::ProtocolError, message)
    }
}

/// Outcome of one `tools/call`.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolCallResult {
    Success { payload: serde_json::Value },
    Failure(ToolCallFailure),
}

impl ToolCallResult {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn payload(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Success { payload } => Some(payload),
            Self::Failure(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&ToolCallFailure> {
        match self {
            Self::Success { .. } => None,
            Self::Failure(f) => Some(f),
        }
    }

    pub fn kind(&self) -> Option<FailureKind> {
        self.failure().map(|f| f.kind)
    }

    pub fn into_result(self) -> Result<serde_json::Value, ToolCallFailure> {
        match self {
            Self::Success { payload } => Ok(payload),
            Self::Failure(f) => Err(f),
        }
    }
}

impl From<Result<serde_json::Value, ToolCallFailure>> for ToolCallResult {
    fn from(value: Result<serde_json::Value, ToolCallFailure>) -> Self {
        match value {
            Ok(payload) => Self::Success { payload },
            Err(f) => Self::Failure(f),
        }
    }
}

/// First 200 characters of a response body, for failure messages.
pub(crate) fn excerpt(body: &str) -> String {
    body.chars().take(EXCERPT_CHARS).collect()
}

pub(crate) const EXCERPT_CHARS: usize = 200;
