//! Error taxonomy for every call issued through the runtime.
//!
//! [`RpcError`] is what callers see from an RPC, a pager, or an operation
//! handle. Its [`ErrorKind`] is stable and meant to be matched on; the
//! message and details are for humans and diagnostics.
//!
//! [`ConfigError`] covers everything that can go wrong while *building* a
//! client: bad environment values, conflicting credential sources, an
//! unknown transport name. A client never starts with an invalid config.
//!
//! [`RetryDecision`] is the cross-cutting piece: every error can say whether
//! the transport may re-issue the call.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Retry semantics
// ---------------------------------------------------------------------------

/// Whether an error condition is safe to retry and, if so, after what delay.
///
/// Only the transient kinds ([`ErrorKind::DeadlineExceeded`],
/// [`ErrorKind::Unavailable`], [`ErrorKind::Aborted`]) ever produce
/// `Retryable`. Whether a retry actually happens is still up to the RPC's
/// [`crate::retry::RetryPolicy`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RetryDecision {
    /// The call may be retried.
    Retryable {
        /// Minimum back-off before the next attempt, when the server sent
        /// one (e.g. an HTTP `Retry-After` header). `None` means apply the
        /// policy's own back-off schedule.
        after: Option<Duration>,
    },
    /// The call must not be retried; the error is surfaced immediately.
    NonRetryable,
}

// ---------------------------------------------------------------------------
// Error kinds
// ---------------------------------------------------------------------------

/// Stable classification of an RPC failure.
///
/// The first seventeen variants follow the canonical RPC status codes; the
/// remaining ones are client-side conditions that never come off the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Cancelled,
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
    /// A message could not be encoded or decoded, or an `Any` payload held
    /// an unexpected type.
    Serialization,
    /// The credentials belong to a different universe domain than the client.
    UniverseMismatch,
}

impl ErrorKind {
    /// Maps a canonical numeric status code to a kind.
    ///
    /// `0` (OK) is not an error and maps to [`ErrorKind::Unknown`], as does
    /// any code outside the canonical range.
    pub fn from_code(code: i32) -> Self {
        match code {
            1 => Self::Cancelled,
            3 => Self::InvalidArgument,
            4 => Self::DeadlineExceeded,
            5 => Self::NotFound,
            6 => Self::AlreadyExists,
            7 => Self::PermissionDenied,
            8 => Self::ResourceExhausted,
            9 => Self::FailedPrecondition,
            10 => Self::Aborted,
            11 => Self::OutOfRange,
            12 => Self::Unimplemented,
            13 => Self::Internal,
            14 => Self::Unavailable,
            15 => Self::DataLoss,
            16 => Self::Unauthenticated,
            _ => Self::Unknown,
        }
    }

    /// Returns the canonical numeric status code for this kind.
    ///
    /// Client-side kinds report the code a server would use for the nearest
    /// equivalent condition.
    pub fn code(self) -> i32 {
        match self {
            Self::Cancelled => 1,
            Self::Unknown => 2,
            Self::InvalidArgument | Self::UniverseMismatch => 3,
            Self::DeadlineExceeded => 4,
            Self::NotFound => 5,
            Self::AlreadyExists => 6,
            Self::PermissionDenied => 7,
            Self::ResourceExhausted => 8,
            Self::FailedPrecondition => 9,
            Self::Aborted => 10,
            Self::OutOfRange => 11,
            Self::Unimplemented => 12,
            Self::Internal | Self::Serialization => 13,
            Self::Unavailable => 14,
            Self::DataLoss => 15,
            Self::Unauthenticated => 16,
        }
    }

    /// Parses the upper-snake status name used in JSON error payloads
    /// (e.g. `"NOT_FOUND"`).
    pub fn from_status_name(name: &str) -> Option<Self> {
        let kind = match name {
            "CANCELLED" => Self::Cancelled,
            "UNKNOWN" => Self::Unknown,
            "INVALID_ARGUMENT" => Self::InvalidArgument,
            "DEADLINE_EXCEEDED" => Self::DeadlineExceeded,
            "NOT_FOUND" => Self::NotFound,
            "ALREADY_EXISTS" => Self::AlreadyExists,
            "PERMISSION_DENIED" => Self::PermissionDenied,
            "RESOURCE_EXHAUSTED" => Self::ResourceExhausted,
            "FAILED_PRECONDITION" => Self::FailedPrecondition,
            "ABORTED" => Self::Aborted,
            "OUT_OF_RANGE" => Self::OutOfRange,
            "UNIMPLEMENTED" => Self::Unimplemented,
            "INTERNAL" => Self::Internal,
            "UNAVAILABLE" => Self::Unavailable,
            "DATA_LOSS" => Self::DataLoss,
            "UNAUTHENTICATED" => Self::Unauthenticated,
            _ => return None,
        };
        Some(kind)
    }

    /// Returns the upper-snake status name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cancelled => "CANCELLED",
            Self::Unknown => "UNKNOWN",
            Self::InvalidArgument => "INVALID_ARGUMENT",
            Self::DeadlineExceeded => "DEADLINE_EXCEEDED",
            Self::NotFound => "NOT_FOUND",
            Self::AlreadyExists => "ALREADY_EXISTS",
            Self::PermissionDenied => "PERMISSION_DENIED",
            Self::ResourceExhausted => "RESOURCE_EXHAUSTED",
            Self::FailedPrecondition => "FAILED_PRECONDITION",
            Self::Aborted => "ABORTED",
            Self::OutOfRange => "OUT_OF_RANGE",
            Self::Unimplemented => "UNIMPLEMENTED",
            Self::Internal => "INTERNAL",
            Self::Unavailable => "UNAVAILABLE",
            Self::DataLoss => "DATA_LOSS",
            Self::Unauthenticated => "UNAUTHENTICATED",
            Self::Serialization => "SERIALIZATION",
            Self::UniverseMismatch => "UNIVERSE_MISMATCH",
        }
    }

    /// Returns `true` for the kinds a retry policy is allowed to act on.
    pub fn is_transient(self) -> bool {
        matches!(
            self,
            Self::DeadlineExceeded | Self::Unavailable | Self::Aborted
        )
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// RPC errors
// ---------------------------------------------------------------------------

/// One structured detail attached to an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Request field the detail refers to (e.g. `"dataset.display_name"`).
    pub field: Option<String>,
    /// Human-readable description.
    pub description: String,
    /// Type URL of the payload the detail was extracted from, if any.
    pub type_url: Option<String>,
}

/// A failed RPC, as seen by the caller.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{kind}: {message}")]
pub struct RpcError {
    /// Stable classification; dispatch on this.
    pub kind: ErrorKind,
    /// Server- or client-supplied message.
    pub message: String,
    /// Per-field or typed details, when the server sent any.
    pub details: Vec<ErrorDetail>,
    /// Number of attempts made before giving up (0 when no attempt was made).
    pub attempts: u32,
    /// Fully-qualified RPC name, filled in by the executor.
    pub rpc: Option<String>,
    /// Server-requested back-off, when present.
    pub retry_after: Option<Duration>,
}

impl RpcError {
    /// Creates an error with no details and no attempt count.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            details: Vec::new(),
            attempts: 0,
            rpc: None,
            retry_after: None,
        }
    }

    pub fn cancelled(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Cancelled, message)
    }

    pub fn deadline_exceeded(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::DeadlineExceeded, message)
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidArgument, message)
    }

    pub fn serialization(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Serialization, message)
    }

    /// Attaches a detail.
    #[must_use]
    pub fn with_detail(mut self, detail: ErrorDetail) -> Self {
        self.details.push(detail);
        self
    }

    /// Records the attempt count.
    #[must_use]
    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts;
        self
    }

    /// Records the RPC name unless one is already set.
    #[must_use]
    pub fn with_rpc(mut self, rpc: impl Into<String>) -> Self {
        if self.rpc.is_none() {
            self.rpc = Some(rpc.into());
        }
        self
    }

    /// Records a server-requested back-off.
    #[must_use]
    pub fn with_retry_after(mut self, after: Option<Duration>) -> Self {
        self.retry_after = after;
        self
    }

    /// Whether this error is safe to retry.
    pub fn retry_decision(&self) -> RetryDecision {
        if self.kind.is_transient() {
            RetryDecision::Retryable {
                after: self.retry_after,
            }
        } else {
            RetryDecision::NonRetryable
        }
    }
}

// ---------------------------------------------------------------------------
// Construction-time errors
// ---------------------------------------------------------------------------

/// Errors raised while building a client or a transport.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An environment variable held a value outside its accepted set.
    #[error("Environment variable {variable} must be one of {expected}, got '{value}'")]
    InvalidEnvironment {
        variable: &'static str,
        value: String,
        expected: &'static str,
    },

    /// More than one of `credentials`, `credentials_file`, `api_key` was set.
    #[error("Only one of credentials, credentials_file or api_key may be provided")]
    MutuallyExclusiveCredentials,

    /// mTLS was requested together with a non-default universe domain.
    #[error("mTLS is not supported in any universe other than {default}, configured '{universe}'")]
    MtlsUniverseUnsupported {
        universe: String,
        default: &'static str,
    },

    /// The universe domain was configured as an empty string.
    #[error("Universe domain cannot be an empty string")]
    EmptyUniverseDomain,

    /// No transport is registered under the requested name.
    #[error("Unknown transport '{name}'")]
    UnknownTransport { name: String },

    /// The transport exists but cannot serve the requested concurrency regime.
    #[error("Transport '{name}' cannot be used by a {regime} client")]
    UnsupportedTransport { name: String, regime: &'static str },

    /// The endpoint could not be turned into a usable URI.
    #[error("Invalid endpoint '{endpoint}': {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    /// A credentials file could not be read or interpreted.
    #[error("Credentials file '{path}': {reason}")]
    CredentialsFile { path: String, reason: String },

    /// The client certificate source failed or returned unusable material.
    #[error("Client certificate: {reason}")]
    ClientCertificate { reason: String },

    /// The blocking runtime could not be started.
    #[error("Runtime error: {reason}")]
    Runtime { reason: String },
}
