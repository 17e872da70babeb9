//! Error types for the backend protocol.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::status::OwnerKind;

/// Classification of a non-success HTTP response.
///
/// The backend answers errors with a bare status code and a plain-text body,
/// so the code is all there is to act on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// 404: the referenced image, job, script or schedule does not exist.
    NotFound,
    /// 409: the resource is in a state that does not allow the operation.
    Conflict,
    /// 422: the request was understood but its values were rejected.
    Unprocessable,
    /// Any other 4xx.
    BadRequest,
    /// 5xx.
    ServerError,
    /// Anything else (1xx/3xx leaking through).
    Unexpected,
}

impl ErrorCode {
    pub fn from_http_status(status: u16) -> Self {
        match status {
            404 => Self::NotFound,
            409 => Self::Conflict,
            422 => Self::Unprocessable,
            400..=499 => Self::BadRequest,
            500..=599 => Self::ServerError,
            _ => Self::Unexpected,
        }
    }

    /// Whether retrying the same request later may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ServerError | Self::Unexpected)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotFound => "NOT_FOUND",
            Self::Conflict => "CONFLICT",
            Self::Unprocessable => "UNPROCESSABLE",
            Self::BadRequest => "BAD_REQUEST",
            Self::ServerError => "SERVER_ERROR",
            Self::Unexpected => "UNEXPECTED",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A status value that is not part of the fixed tables.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StatusError {
    #[error("unknown {kind} status code {code}")]
    UnknownCode { kind: OwnerKind, code: u64 },

    #[error("unknown {kind} status name '{name}'")]
    UnknownName { kind: OwnerKind, name: String },
}
