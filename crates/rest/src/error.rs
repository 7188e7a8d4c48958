//! HTTP responses and client failures to [`RpcError`].

use std::time::Duration;

use gax::errors::{ErrorKind, RpcError};
use gax::wkt::{error_details, Any};
use serde::Deserialize;

/// Longest slice of a non-JSON error body kept in the message.
const MAX_BODY_IN_MESSAGE: usize = 512;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ErrorBody {
    code: u16,
    message: String,
    status: String,
    details: Vec<Any>,
}

/// Canonical kind for an HTTP status code without a status string.
pub fn kind_from_http(status: u16) -> ErrorKind {
    match status {
        400 => ErrorKind::InvalidArgument,
        401 => ErrorKind::Unauthenticated,
        403 => ErrorKind::PermissionDenied,
        404 => ErrorKind::NotFound,
        409 => ErrorKind::Aborted,
        412 => ErrorKind::FailedPrecondition,
        416 => ErrorKind::OutOfRange,
        429 => ErrorKind::ResourceExhausted,
        499 => ErrorKind::Cancelled,
        500 => ErrorKind::Internal,
        501 => ErrorKind::Unimplemented,
        503 => ErrorKind::Unavailable,
        504 => ErrorKind::DeadlineExceeded,
        _ => ErrorKind::Unknown,
    }
}

/// Builds the error for a non-success response.
///
/// The `error.status` string of a JSON payload wins over the HTTP code, so a
/// 409 is reported as `AlreadyExists` or `Aborted` as the server meant it.
pub fn error_from_response(status: u16, body: &[u8], retry_after: Option<Duration>) -> RpcError {
    let parsed = serde_json::from_slice::<ErrorEnvelope>(body)
        .ok()
        .filter(|envelope| envelope.error.code != 0 || !envelope.error.message.is_empty());

    let err = match parsed {
        Some(ErrorEnvelope { error }) => {
            let kind = ErrorKind::from_status_name(&error.status)
                .unwrap_or_else(|| kind_from_http(status));
            error_details(&error.details)
                .into_iter()
                .fold(RpcError::new(kind, error.message), RpcError::with_detail)
        }
        None => {
            let text = String::from_utf8_lossy(body);
            let message = if text.trim().is_empty() {
                format!("HTTP {status}")
            } else {
                text.chars().take(MAX_BODY_IN_MESSAGE).collect()
            };
            RpcError::new(kind_from_http(status), message)
        }
    };
    err.with_retry_after(retry_after)
}

/// Classifies a failure that produced no HTTP response.
pub fn error_from_client(err: &reqwest::Error) -> RpcError {
    let kind = if err.is_timeout() {
        ErrorKind::DeadlineExceeded
    } else if err.is_connect() || err.is_request() {
        ErrorKind::Unavailable
    } else if err.is_decode() {
        ErrorKind::Serialization
    } else {
        ErrorKind::Unknown
    };
    RpcError::new(kind, err.to_string())
}

/// Parses a `Retry-After` header given in seconds.
pub fn parse_retry_after(value: &str) -> Option<Duration> {
    value.trim().parse::<u64>().ok().map(Duration::from_secs)
}
