//! Remote call error types

use serde::de::value::StringDeserializer;
use serde::de::{Deserializer, IntoDeserializer};
use serde::Deserialize;
use std::fmt;
use thiserror::Error;

/// Connect protocol error with its wire code
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{code}: {message}")]
pub struct RpcError {
    pub code: Code,
    pub message: String,
    /// Transport-level cause, kept for diagnostics only
    pub cause: Option<String>,
}

impl RpcError {
    pub fn new(code: Code, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            cause: None,
        }
    }

    pub fn with_cause(mut self, cause: impl fmt::Display) -> Self {
        self.cause = Some(cause.to_string());
        self
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(Code::Unavailable, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(Code::Internal, message)
    }

    /// Classify a reqwest failure. Everything that happens below the Connect
    /// framing is reported as `unavailable`.
    pub fn transport(err: &reqwest::Error) -> Self {
        let message = if err.is_connect() {
            "failed to connect to service"
        } else if err.is_body() || err.is_decode() {
            "failed to read response body"
        } else {
            "request failed"
        };
        Self::unavailable(message).with_cause(err)
    }

    /// Error for an HTTP status that carried no Connect error body
    pub fn from_http_status(status: reqwest::StatusCode) -> Self {
        Self::new(Code::from_http_status(status.as_u16()), format!("HTTP status {status}"))
    }
}

/// Error body used by unary responses and end-of-stream frames
#[derive(Debug, Deserialize)]
pub(crate) struct WireError {
    /// Codes this client does not know are treated as absent
    #[serde(default, deserialize_with = "known_code")]
    pub code: Option<Code>,
    #[serde(default)]
    pub message: Option<String>,
}

impl WireError {
    pub fn into_rpc_error(self, fallback: Code) -> RpcError {
        RpcError::new(self.code.unwrap_or(fallback), self.message.unwrap_or_default())
    }
}

fn known_code<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Code>, D::Error> {
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.and_then(|code| {
        let code: StringDeserializer<serde::de::value::Error> = code.into_deserializer();
        Code::deserialize(code).ok()
    }))
}

/// Connect error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Code {
    Canceled,
    Unknown,
    InvalidArgument,
    DeadlineExceeded,
    NotFound,
    AlreadyExists,
    PermissionDenied,
    ResourceExhausted,
    FailedPrecondition,
    Aborted,
    OutOfRange,
    Unimplemented,
    Internal,
    Unavailable,
    DataLoss,
    Unauthenticated,
}

impl Code {
    pub fn as_str(self) -> &'static str {
        match self {
            Code::Canceled => "canceled",
            Code::Unknown => "unknown",
            Code::InvalidArgument => "invalid_argument",
            Code::DeadlineExceeded => "deadline_exceeded",
            Code::NotFound => "not_found",
            Code::AlreadyExists => "already_exists",
            Code::PermissionDenied => "permission_denied",
            Code::ResourceExhausted => "resource_exhausted",
            Code::FailedPrecondition => "failed_precondition",
            Code::Aborted => "aborted",
            Code::OutOfRange => "out_of_range",
            Code::Unimplemented => "unimplemented",
            Code::Internal => "internal",
            Code::Unavailable => "unavailable",
            Code::DataLoss => "data_loss",
            Code::Unauthenticated => "unauthenticated",
        }
    }

    /// Connect's HTTP-to-code mapping for responses without an error body
    pub fn from_http_status(status: u16) -> Self {
        match status {
            400 => Code::Internal,
            401 => Code::Unauthenticated,
            403 => Code::PermissionDenied,
            404 => Code::Unimplemented,
            429 | 502 | 503 | 504 => Code::Unavailable,
            _ => Code::Unknown,
        }
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
