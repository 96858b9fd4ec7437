//! Tests for domain error construction and serialisation.

use super::*;
use crate::domain::TraceId;
use rstest::{fixture, rstest};
use serde_json::json;

const TRACE_ID: &str = "00000000-0000-0000-0000-000000000000";

#[fixture]
fn expected_trace_id() -> String {
    TRACE_ID.to_owned()
}

#[rstest]
#[case(Error::invalid_request("bad"), ErrorCode::InvalidRequest)]
#[case(Error::unauthorized("no session"), ErrorCode::Unauthorized)]
#[case(Error::forbidden("denied"), ErrorCode::Forbidden)]
#[case(Error::not_found("missing"), ErrorCode::NotFound)]
#[case(Error::conflict("already approved"), ErrorCode::Conflict)]
#[case(Error::service_unavailable("pool down"), ErrorCode::ServiceUnavailable)]
#[case(Error::internal("boom"), ErrorCode::InternalError)]
fn constructors_set_code(#[case] error: Error, #[case] expected: ErrorCode) {
    assert_eq!(error.code(), expected);
}

#[rstest]
fn try_new_rejects_empty_messages() {
    let result = Error::try_new(ErrorCode::InvalidRequest, "   ");
    assert!(matches!(result, Err(ErrorValidationError::EmptyMessage)));
}

#[rstest]
fn new_replaces_blank_message() {
    let error = Error::new(ErrorCode::Conflict, "");
    assert_eq!(error.message(), "conflict");
}

#[rstest]
fn try_with_trace_id_rejects_empty_values() {
    let result = Error::invalid_request("bad").try_with_trace_id("   ");
    assert!(matches!(result, Err(ErrorValidationError::EmptyTraceId)));
}

#[rstest]
fn new_returns_none_when_trace_id_out_of_scope() {
    let error = Error::internal("boom");
    assert!(error.trace_id().is_none());
}

#[rstest]
#[tokio::test]
async fn new_captures_trace_id_in_scope(expected_trace_id: String) {
    let trace_id: TraceId = expected_trace_id
        .parse()
        .expect("fixtures provide a valid UUID");
    let error = TraceId::scope(trace_id, async move { Error::internal("boom") }).await;

    assert_eq!(error.trace_id(), Some(expected_trace_id.as_str()));
}

#[rstest]
#[tokio::test]
async fn deserialising_ignores_ambient_trace(expected_trace_id: String) {
    let trace_id: TraceId = expected_trace_id
        .parse()
        .expect("fixtures provide a valid UUID");
    let payload = json!({ "code": "not_found", "message": "missing" });

    let error = TraceId::scope(trace_id, async move {
        serde_json::from_value::<Error>(payload).expect("valid payload")
    })
    .await;

    assert!(error.trace_id().is_none());
}

#[rstest]
fn serialises_camel_case_and_skips_absent_fields() {
    let error = Error::conflict("request already approved")
        .with_trace_id("abc")
        .with_details(json!({ "code": "already_approved" }));

    let value = serde_json::to_value(&error).expect("serialise error");

    assert_eq!(
        value,
        json!({
            "code": "conflict",
            "message": "request already approved",
            "traceId": "abc",
            "details": { "code": "already_approved" },
        })
    );
    let bare = serde_json::to_value(Error::not_found("missing")).expect("serialise error");
    assert!(bare.get("traceId").is_none());
    assert!(bare.get("details").is_none());
}

#[rstest]
#[case(json!({ "code": "conflict", "message": "  " }))]
#[case(json!({ "code": "conflict", "message": "ok", "traceId": "" }))]
#[case(json!({ "code": "conflict", "message": "ok", "extra": true }))]
fn deserialising_rejects_invalid_payloads(#[case] payload: serde_json::Value) {
    assert!(serde_json::from_value::<Error>(payload).is_err());
}

#[rstest]
fn detail_code_reads_workflow_code() {
    let error = Error::invalid_request("same facility")
        .with_details(json!({ "code": "same_facility", "assetId": 4 }));
    assert_eq!(error.detail_code(), Some("same_facility"));
    assert_eq!(Error::internal("boom").detail_code(), None);
}
