//! Per-response outcome classification.

use crate::descriptor::RequestDescriptor;
use crate::error::HttpFailure;
use crate::response::Response;
use crate::{ClientError, ClientResult};
use reqwest::StatusCode;

/// What a settled call means for the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    Ok,
    /// 403 whose error text mentions CSRF.
    CsrfRejected,
    /// 401.
    Unauthorized,
    OtherFailure,
}

impl SessionOutcome {
    /// Classify a settled call.
    pub fn of(result: &ClientResult<Response>) -> Self {
        match result {
            Ok(_) => SessionOutcome::Ok,
            Err(error) => Self::of_error(error),
        }
    }

    pub fn of_error(error: &ClientError) -> Self {
        match error {
            ClientError::CsrfRejected(_) => SessionOutcome::CsrfRejected,
            ClientError::Unauthorized(_) => SessionOutcome::Unauthorized,
            _ => SessionOutcome::OtherFailure,
        }
    }

    /// Whether a refresh-and-replay cycle can help.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            SessionOutcome::CsrfRejected | SessionOutcome::Unauthorized
        )
    }
}

/// True for a 403 whose body mentions CSRF in any casing.
pub fn is_csrf_rejection(status: StatusCode, body: &str) -> bool {
    status == StatusCode::FORBIDDEN && body.to_ascii_lowercase().contains("csrf")
}

/// Turn a transport response into the caller-facing result: 2xx passes
/// through, anything else becomes a classified error.
pub(crate) fn into_result(request: &RequestDescriptor, response: Response) -> ClientResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let failure = HttpFailure {
        method: request.method(),
        path: request.path().to_string(),
        status,
        body: response.text(),
    };

    if status == StatusCode::UNAUTHORIZED {
        Err(ClientError::Unauthorized(failure))
    } else if is_csrf_rejection(status, &failure.body) {
        Err(ClientError::CsrfRejected(failure))
    } else {
        Err(ClientError::Http(failure))
    }
}
