//! End-to-end inventory flows driven purely through the public API.

use actix_web::http::Method;
use rstest::{fixture, rstest};
use serde_json::{Value, json};

mod support;

use support::logistics_http::{Harness, Snapshot};

const PASSWORD: &str = "s3cret";

fn id_of(snapshot: &Snapshot) -> i64 {
    snapshot
        .body
        .as_ref()
        .and_then(|body| body.get("id"))
        .and_then(Value::as_i64)
        .expect("created entity id")
}

fn register(harness: &mut Harness, username: &str, role: &str) {
    let created = harness.request(
        None,
        Method::POST,
        "/api/v1/users",
        Some(json!({ "username": username, "password": PASSWORD, "role": role })),
    );
    assert_eq!(created.status, 201, "register {username}: {:?}", created.body);
    assert_eq!(harness.login(username, PASSWORD).status, 200);
}

/// Two facilities created by a logistics officer; returns their ids.
struct Depots {
    harness: Harness,
    north: i64,
    south: i64,
}

#[fixture]
fn depots() -> Depots {
    let mut harness = Harness::default();
    register(&mut harness, "clerk", "logistics_officer");
    register(&mut harness, "warden", "facility_officer");
    register(&mut harness, "visitor", "guest");
    let north = harness.post(
        "clerk",
        "/api/v1/facilities",
        json!({ "code": "N1", "commonName": "North depot", "location": "Leeds" }),
    );
    let south = harness.post(
        "clerk",
        "/api/v1/facilities",
        json!({ "code": "S1", "commonName": "South depot", "location": "Bristol" }),
    );
    assert_eq!(north.status, 201);
    assert_eq!(south.status, 201);
    Depots {
        north: id_of(&north),
        south: id_of(&south),
        harness,
    }
}

fn create_asset(depots: &Depots, tag: &str, arrival: &str) -> i64 {
    let created = depots.harness.post(
        "clerk",
        "/api/v1/assets",
        json!({
            "tag": tag,
            "description": "Pallet jack",
            "facilityId": depots.north,
            "arrivalDate": arrival,
        }),
    );
    assert_eq!(created.status, 201, "{:?}", created.body);
    id_of(&created)
}

fn tags(snapshot: &Snapshot) -> Vec<String> {
    snapshot
        .body
        .as_ref()
        .and_then(Value::as_array)
        .expect("array body")
        .iter()
        .filter_map(|row| row.get("tag").and_then(Value::as_str))
        .map(ToOwned::to_owned)
        .collect()
}

#[rstest]
fn duplicate_facility_codes_conflict(depots: Depots) {
    let duplicate = depots.harness.post(
        "warden",
        "/api/v1/facilities",
        json!({ "code": "N1", "commonName": "Another", "location": "York" }),
    );
    assert_eq!(duplicate.status, 409);
    assert_eq!(duplicate.detail_code(), Some("duplicate_entity"));

    let listed = depots.harness.get("visitor", "/api/v1/facilities");
    assert_eq!(listed.status, 200);
    let codes: Vec<&str> = listed
        .body
        .as_ref()
        .and_then(Value::as_array)
        .expect("facility list")
        .iter()
        .filter_map(|row| row.get("code").and_then(Value::as_str))
        .collect();
    assert_eq!(codes, ["N1", "S1"]);
}

#[rstest]
fn guests_cannot_register_inventory(depots: Depots) {
    let denied = depots.harness.post(
        "visitor",
        "/api/v1/facilities",
        json!({ "code": "G1", "commonName": "Guest depot", "location": "Hull" }),
    );
    assert_eq!(denied.status, 403);
    assert_eq!(denied.detail_code(), Some("role_required"));
}

#[rstest]
fn malformed_bodies_return_the_error_payload(depots: Depots) {
    let rejected = depots.harness.post(
        "clerk",
        "/api/v1/facilities",
        json!({ "commonName": "Nameless", "location": "York" }),
    );
    assert_eq!(rejected.status, 400);
    assert_eq!(rejected.str_field("code"), Some("invalid_request"));
    assert_eq!(rejected.detail_code(), Some("missing_field"));
    assert!(rejected.trace_id.is_some());
    assert_eq!(rejected.str_field("traceId"), rejected.trace_id.as_deref());
}

#[rstest]
fn open_transfers_block_disposal_and_eligibility(depots: Depots) {
    let asset = create_asset(&depots, "PJ-1", "01/02/2024");
    assert_eq!(
        tags(&depots.harness.get("clerk", "/api/v1/assets/eligible")),
        ["PJ-1"]
    );

    let request = depots.harness.post(
        "clerk",
        "/api/v1/transfers",
        json!({
            "assetId": asset,
            "sourceFacilityId": depots.north,
            "destinationFacilityId": depots.south,
        }),
    );
    assert_eq!(request.status, 201);
    assert_eq!(request.str_field("stage"), Some("pending"));
    assert!(tags(&depots.harness.get("clerk", "/api/v1/assets/eligible")).is_empty());

    let blocked = depots.harness.post(
        "clerk",
        "/api/v1/assets/dispose",
        json!({ "tag": "PJ-1", "disposalDate": "02/01/2024" }),
    );
    assert_eq!(blocked.status, 409);
    assert_eq!(blocked.detail_code(), Some("transfer_already_open"));
}

#[rstest]
fn disposed_assets_leave_the_report(depots: Depots) {
    create_asset(&depots, "PJ-2", "01/02/2024");
    let disposed = depots.harness.post(
        "clerk",
        "/api/v1/assets/dispose",
        json!({ "tag": "PJ-2", "disposalDate": "02/01/2024" }),
    );
    assert_eq!(disposed.status, 200, "{:?}", disposed.body);
    assert!(tags(&depots.harness.get("clerk", "/api/v1/assets/eligible")).is_empty());

    let before = depots
        .harness
        .get("visitor", "/api/v1/reports/assets?date=01/15/2024&facility=All");
    assert_eq!(before.status, 200);
    assert_eq!(
        before
            .body
            .as_ref()
            .and_then(Value::as_array)
            .map(Vec::len),
        Some(1)
    );

    let after = depots
        .harness
        .get("visitor", "/api/v1/reports/assets?date=02/15/2024");
    assert_eq!(after.status, 200);
    assert_eq!(after.body, Some(json!([])));
}

#[rstest]
fn report_requires_a_valid_date(depots: Depots) {
    let malformed = depots
        .harness
        .get("visitor", "/api/v1/reports/assets?date=2024-01-15");
    assert_eq!(malformed.status, 400);
    assert_eq!(malformed.detail_code(), Some("invalid_date_format"));
}

#[rstest]
fn logout_ends_the_session(mut depots: Depots) {
    let me = depots.harness.get("clerk", "/api/v1/users/me");
    assert_eq!(me.str_field("role"), Some("logistics_officer"));

    let logout = depots
        .harness
        .request(Some("clerk"), Method::POST, "/api/v1/logout", None);
    assert_eq!(logout.status, 204);
    let cleared = logout.session_cookie.expect("removal cookie");
    assert!(cleared.value().is_empty());

    assert_eq!(depots.harness.login("clerk", "wrong").status, 401);
    let anonymous = depots
        .harness
        .request(None, Method::GET, "/api/v1/users/me", None);
    assert_eq!(anonymous.status, 401);
    assert!(anonymous.trace_id.is_some());
}
