//! Client error types.

use crate::descriptor::Method;
use crate::identity::IdentityError;
use crate::recovery::RecoveryKind;
use crate::transport::TransportError;
use reqwest::StatusCode;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// A completed HTTP exchange with a non-2xx status.
#[derive(Debug, Clone)]
pub struct HttpFailure {
    /// Method of the failed request.
    pub method: Method,
    /// Path of the failed request, as the caller supplied it.
    pub path: String,
    /// Response status.
    pub status: StatusCode,
    /// Response body decoded as UTF-8 (lossy).
    pub body: String,
}

impl HttpFailure {
    /// Best-effort human readable message from the response body.
    ///
    /// Looks for `error` or `message` string fields in a JSON body and
    /// falls back to the raw text.
    pub fn message(&self) -> String {
        if let Ok(value) = serde_json::from_str::<serde_json::Value>(&self.body) {
            for key in ["error", "message"] {
                if let Some(text) = value.get(key).and_then(|v| v.as_str()) {
                    return text.to_string();
                }
            }
        }
        self.body.clone()
    }
}

impl fmt::Display for HttpFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} returned {}", self.method, self.path, self.status)
    }
}

/// Error returned by the session-guarded client.
#[derive(Error, Debug)]
pub enum ClientError {
    /// Network-level failure; no response was received.
    #[error("{method} {path} failed: {source}")]
    Transport {
        method: Method,
        path: String,
        #[source]
        source: TransportError,
    },

    /// 403 whose error text mentions CSRF.
    #[error("CSRF token rejected: {0}")]
    CsrfRejected(HttpFailure),

    /// 401.
    #[error("Unauthorized: {0}")]
    Unauthorized(HttpFailure),

    /// Any other non-2xx response.
    #[error("HTTP error: {0}")]
    Http(HttpFailure),

    /// The request could not be built (bad header, bad URL).
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Response body did not have the expected shape.
    #[error("Unexpected payload: {0}")]
    UnexpectedPayload(String),

    /// JSON decode error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Identity cache error
    #[error("Identity cache error: {0}")]
    Identity(#[from] IdentityError),

    /// Invalid transition in the per-call state machine
    #[error("Invalid call state transition: {0}")]
    InvalidStateTransition(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] carebridge_config::CoreError),
}

impl ClientError {
    /// HTTP status of the failure, when a response was received.
    pub fn status(&self) -> Option<StatusCode> {
        self.http_failure().map(|failure| failure.status)
    }

    /// The failed exchange, when a response was received.
    pub fn http_failure(&self) -> Option<&HttpFailure> {
        match self {
            ClientError::CsrfRejected(failure)
            | ClientError::Unauthorized(failure)
            | ClientError::Http(failure) => Some(failure),
            _ => None,
        }
    }

    /// Returns true if retrying the same call later could succeed.
    ///
    /// Transient errors include:
    /// - Transport timeouts and connection failures
    /// - 5xx responses
    pub fn is_transient(&self) -> bool {
        match self {
            ClientError::Transport { source, .. } => source.is_transient(),
            ClientError::Http(failure) => failure.status.is_server_error(),
            _ => false,
        }
    }
}

/// Result type alias using ClientError.
pub type ClientResult<T> = Result<T, ClientError>;

/// Why a refresh or identity check did not re-establish the session.
///
/// Never surfaced to callers: a failed recovery terminates the session and
/// the caller receives the error that triggered the recovery.
#[derive(Error, Debug, Clone)]
pub enum RecoveryError {
    /// The recovery endpoint answered with a non-2xx status.
    #[error("{kind} rejected with HTTP {status}")]
    Rejected {
        kind: RecoveryKind,
        status: StatusCode,
    },

    /// The recovery call never got a response.
    #[error("{kind} failed: {source}")]
    Transport {
        kind: RecoveryKind,
        #[source]
        source: TransportError,
    },

    /// The recovery call did not settle in time.
    #[error("{kind} timed out after {}ms", .after.as_millis())]
    TimedOut { kind: RecoveryKind, after: Duration },
}
