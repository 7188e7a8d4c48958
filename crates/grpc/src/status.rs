//! Mapping from wire statuses to [`RpcError`].

use gax::errors::{ErrorKind, RpcError};
use gax::wkt::{self, error_details};
use prost::Message;
use tracing::debug;

/// Converts a status received from the server, keeping rich error details.
pub fn status_to_error(status: &tonic::Status) -> RpcError {
    let kind = ErrorKind::from_code(status.code() as i32);
    let mut err = RpcError::new(kind, status.message());

    let raw = status.details();
    if !raw.is_empty() {
        match wkt::Status::decode(raw) {
            Ok(rich) => {
                for detail in error_details(&rich.details) {
                    err = err.with_detail(detail);
                }
            }
            Err(e) => debug!(error = %e, "ignoring undecodable status details"),
        }
    }
    err
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use gax::wkt::{Any, BadRequest, FieldViolation};
    use tonic::Code;

    #[test]
    fn test_codes_map_to_kinds() {
        let cases = [
            (Code::InvalidArgument, ErrorKind::InvalidArgument),
            (Code::NotFound, ErrorKind::NotFound),
            (Code::AlreadyExists, ErrorKind::AlreadyExists),
            (Code::PermissionDenied, ErrorKind::PermissionDenied),
            (Code::Unauthenticated, ErrorKind::Unauthenticated),
            (Code::ResourceExhausted, ErrorKind::ResourceExhausted),
            (Code::FailedPrecondition, ErrorKind::FailedPrecondition),
            (Code::Aborted, ErrorKind::Aborted),
            (Code::OutOfRange, ErrorKind::OutOfRange),
            (Code::Unimplemented, ErrorKind::Unimplemented),
            (Code::Internal, ErrorKind::Internal),
            (Code::Unavailable, ErrorKind::Unavailable),
            (Code::DeadlineExceeded, ErrorKind::DeadlineExceeded),
            (Code::Cancelled, ErrorKind::Cancelled),
            (Code::Unknown, ErrorKind::Unknown),
        ];
        for (code, kind) in cases {
            let err = status_to_error(&tonic::Status::new(code, "boom"));
            assert_eq!(err.kind, kind, "{code:?}");
            assert_eq!(err.message, "boom");
        }
    }

    #[test]
    fn test_bad_request_details_are_kept() {
        let rich = wkt::Status {
            code: 3,
            message: "invalid dataset".into(),
            details: vec![Any::pack(&BadRequest {
                field_violations: vec![FieldViolation {
                    field: "dataset.display_name".into(),
                    description: "must not be empty".into(),
                }],
            })],
        };
        let status = tonic::Status::with_details(
            Code::InvalidArgument,
            "invalid dataset",
            Bytes::from(rich.encode_to_vec()),
        );

        let err = status_to_error(&status);
        assert_eq!(err.kind, ErrorKind::InvalidArgument);
        assert_eq!(err.details.len(), 1);
        assert_eq!(err.details[0].field.as_deref(), Some("dataset.display_name"));
        assert_eq!(err.details[0].description, "must not be empty");
    }

    #[test]
    fn test_garbage_details_are_ignored() {
        let status = tonic::Status::with_details(
            Code::Internal,
            "oops",
            Bytes::from_static(&[0xff, 0xff, 0xff]),
        );
        let err = status_to_error(&status);
        assert_eq!(err.kind, ErrorKind::Internal);
        assert!(err.details.is_empty());
    }
}
