//! Tests for Firestore error mapping.

use crate::error::FirestoreError;

#[test]
fn test_error_from_http_status_429() {
    let err = FirestoreError::from_http_status(429, "rate limited");
    assert!(matches!(err, FirestoreError::RateLimited(_)));
    assert!(err.is_retryable());
    assert_eq!(err.retry_after_ms(), Some(1000));
}

#[test]
fn test_error_from_http_status_5xx() {
    for status in [500u16, 503] {
        let err = FirestoreError::from_http_status(status, "server");
        assert!(matches!(err, FirestoreError::ServerError(s, _) if s == status));
        assert!(err.is_retryable());
    }
}

#[test]
fn test_error_from_http_status_client_errors() {
    for status in [400u16, 401, 403, 404, 409, 412] {
        let err = FirestoreError::from_http_status(status, "x");
        assert!(!err.is_retryable(), "{status} should not retry");
        assert_eq!(err.http_status(), Some(status));
    }
}

#[test]
fn test_failed_precondition_in_body_counts_as_conflict() {
    let err = FirestoreError::from_http_status(400, "FAILED_PRECONDITION: update time mismatch");
    assert!(err.is_precondition_failed());
    assert!(err.is_conflict());
}

#[test]
fn test_version_conflict_status() {
    let err = FirestoreError::VersionConflict {
        doc_id: "p".into(),
        expected: 1,
        found: 3,
    };
    assert_eq!(err.http_status(), Some(409));
    assert!(err.to_string().contains("expected 1"));
}
